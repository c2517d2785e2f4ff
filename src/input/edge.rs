//! Parser for EDGE Diagrammer files.
//!
//! An `.edg` file is a flat list of `Figure` and `Connector` blocks. Entity
//! figures become tables, attribute figures become fields, and connectors
//! decide which attribute belongs to which entity and which entities are
//! related. Nothing in the format carries column types.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::lines::{BLOCK_END, LineCursor};
use super::{FileParser, ParseError};
use crate::diagram::{FigureId, RawConnector, RawField, RawTable};
use crate::model::{DataType, Schema};

pub const EDGE_SIGNATURE: &str = "EDGE Diagram File";

/// Type given to every imported field until the user assigns a real one.
const PLACEHOLDER_TYPE: DataType = DataType::Varchar;

#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeParser;

impl FileParser for EdgeParser {
    fn product_name(&self) -> &'static str {
        EDGE_SIGNATURE
    }

    fn file_extension(&self) -> &'static str {
        "edg"
    }

    fn parse_str(&self, input: &str) -> Result<Schema, ParseError> {
        let mut scan = EdgeScan::new(input);
        scan.run()?;
        resolve_connectors(&scan.connectors, &mut scan.tables, &mut scan.fields)?;
        assemble(&scan.tables, &scan.fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FigureKind {
    Entity,
    Attribute,
}

struct EdgeScan<'a> {
    cursor: LineCursor<'a>,
    tables: Vec<RawTable>,
    fields: Vec<RawField>,
    connectors: Vec<RawConnector>,
}

impl<'a> EdgeScan<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            cursor: LineCursor::new(input),
            tables: Vec::new(),
            fields: Vec::new(),
            connectors: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        self.cursor.expect_signature(EDGE_SIGNATURE)?;

        while let Some(line) = self.cursor.next_line() {
            if line.starts_with("Figure ") {
                let id = self.cursor.labelled_id(line)?;
                self.parse_figure(id)?;
            } else if line.starts_with("Connector ") {
                let id = self.cursor.labelled_id(line)?;
                self.parse_connector(id)?;
            }
        }
        Ok(())
    }

    fn parse_figure(&mut self, id: FigureId) -> Result<(), ParseError> {
        let style_line = loop {
            let line = self.cursor.expect_line("figure block")?;
            if line.starts_with("Style") {
                break line;
            }
            if line == BLOCK_END {
                debug!(figure = id, "figure without style skipped");
                return Ok(());
            }
        };

        let style = self.cursor.quoted(style_line)?;
        if style.starts_with("Relation") {
            return Err(ParseError::ContainsRelations);
        }
        let kind = if style.starts_with("Entity") {
            FigureKind::Entity
        } else if style.starts_with("Attribute") {
            FigureKind::Attribute
        } else {
            debug!(figure = id, style, "figure skipped");
            return self.cursor.skip_block("figure block");
        };

        let text_line = self.cursor.expect_line("figure block")?;
        if !text_line.starts_with("Text") {
            return Err(self.cursor.malformed("expected a Text line after the figure style"));
        }
        let name = figure_name(self.cursor.quoted(text_line)?);
        if name.is_empty() {
            return Err(ParseError::BlankName);
        }

        let mut underlined = false;
        self.cursor.scan_block("figure block", |line| {
            if line.starts_with("TypeUnderl") {
                underlined = true;
            }
        })?;

        if self.is_known_figure(id) {
            return Err(self.cursor.malformed(format!("figure id {id} is used twice")));
        }

        match kind {
            FigureKind::Entity => {
                if self.tables.iter().any(|t| t.name == name) {
                    return Err(ParseError::DuplicateTable(name));
                }
                self.tables.push(RawTable::new(id, name));
            }
            FigureKind::Attribute => {
                let mut field = RawField::new(id, name);
                field.primary_key = underlined;
                self.fields.push(field);
            }
        }
        Ok(())
    }

    fn parse_connector(&mut self, id: FigureId) -> Result<(), ParseError> {
        let context = "connector block";
        let first = self.cursor.seek_in_block("Figure1", context)?;
        let first = self.cursor.labelled_id(first)?;
        let second = self.cursor.seek_in_block("Figure2", context)?;
        let second = self.cursor.labelled_id(second)?;

        let end1 = self.cursor.seek_in_block("End1", context)?;
        let end1 = self.cursor.quoted(end1)?.to_string();
        let end2 = self.cursor.seek_in_block("End2", context)?;
        let end2 = self.cursor.quoted(end2)?.to_string();

        self.cursor.skip_block(context)?;

        self.connectors.push(RawConnector {
            id,
            endpoints: [first, second],
            end_styles: [end1, end2],
        });
        Ok(())
    }

    fn is_known_figure(&self, id: FigureId) -> bool {
        self.tables.iter().any(|t| t.id == id) || self.fields.iter().any(|f| f.id == id)
    }
}

/// Spaces removed, then cut at the first escape character: the diagram
/// tool appends font-control codes after a backslash.
fn figure_name(text: &str) -> String {
    let name: String = text.chars().filter(|c| *c != ' ').collect();
    match name.find('\\') {
        Some(end) => name[..end].to_string(),
        None => name,
    }
}

/// Turn connectors into table relationships and field ownership.
///
/// Connectors are processed in file order; ownership recorded by earlier
/// connectors is what later ones are checked against.
fn resolve_connectors(
    connectors: &[RawConnector],
    tables: &mut [RawTable],
    fields: &mut [RawField],
) -> Result<(), ParseError> {
    for connector in connectors {
        let [ep1, ep2] = connector.endpoints;
        let field1 = fields.iter().position(|f| f.id == ep1);
        let field2 = fields.iter().position(|f| f.id == ep2);
        if field1.is_some() && field2.is_some() {
            return Err(ParseError::CompositeAttributes);
        }

        let table1 = tables.iter().position(|t| t.id == ep1);
        let table2 = tables.iter().position(|t| t.id == ep2);

        if let (Some(t1), Some(t2)) = (table1, table2) {
            if connector.is_many_to_many() {
                return Err(ParseError::ManyToMany {
                    first: tables[t1].name.clone(),
                    second: tables[t2].name.clone(),
                });
            }
            let (id1, id2) = (tables[t1].id, tables[t2].id);
            tables[t1].relate(id2);
            tables[t2].relate(id1);
            debug!(connector = connector.id, "related {} and {}", tables[t1].name, tables[t2].name);
            continue;
        }

        let (Some(field), Some(table)) = (field1.or(field2), table1.or(table2)) else {
            debug!(connector = connector.id, "connector has no table-field pair");
            continue;
        };

        let table_id = tables[table].id;
        match fields[field].table {
            None => {
                fields[field].table = Some(table_id);
                tables[table].add_native_field(fields[field].id);
            }
            Some(owner) if owner == table_id => {}
            Some(_) => return Err(ParseError::MultipleTables(fields[field].name.clone())),
        }
    }
    Ok(())
}

fn assemble(tables: &[RawTable], fields: &[RawField]) -> Result<Schema, ParseError> {
    let mut schema = Schema::new();
    let mut ids = HashMap::new();

    for raw in tables {
        ids.insert(raw.id, schema.add_table(&raw.name)?);
    }

    for raw in tables {
        let table = ids[&raw.id];
        for related in &raw.related_tables {
            if let Some(&other) = ids.get(related) {
                schema.add_related_table(table, other)?;
            }
        }

        for raw_field in fields.iter().filter(|f| f.table == Some(raw.id)) {
            let field = schema.add_field(table, &raw_field.name)?;
            schema.update_field(field, |f| {
                f.set_data_type(PLACEHOLDER_TYPE);
                f.set_allow_null(!raw_field.disallow_null);
                f.set_primary_key(raw_field.primary_key);
            })?;
        }
    }

    for orphan in fields.iter().filter(|f| f.table.is_none()) {
        warn!(attribute = %orphan.name, "attribute is not connected to any entity; dropped");
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32, name: &str) -> String {
        format!("Figure {id}\n{{\n Style \"Entity\"\n Text \"{name}\"\n Font \"Arial\"\n}}\n")
    }

    fn attribute(id: u32, name: &str, underlined: bool) -> String {
        let underline = if underlined { " TypeUnderl\n" } else { "" };
        format!("Figure {id}\n{{\n Style \"Attribute\"\n Text \"{name}\"\n{underline} Font \"Arial\"\n}}\n")
    }

    fn connector(id: u32, a: u32, b: u32, end1: &str, end2: &str) -> String {
        format!(
            "Connector {id}\n{{\n Style \"Relation\"\n Figure1 {a}\n Figure2 {b}\n EndPoint1 \"1,2\"\n EndPoint2 \"3,4\"\n SuppressEnd1 0\n SuppressEnd2 0\n End1 \"{end1}\"\n End2 \"{end2}\"\n Color 0\n}}\n"
        )
    }

    fn diagram(parts: &[String]) -> String {
        let mut out = String::from("EDGE Diagram File\nVersion 4\n");
        for part in parts {
            out.push_str(part);
        }
        out
    }

    fn parse(input: &str) -> Result<Schema, ParseError> {
        EdgeParser.parse_str(input)
    }

    fn field_names(schema: &Schema, table: &str) -> Vec<String> {
        let table = schema.table_by_name(table).unwrap();
        schema
            .table(table)
            .fields()
            .iter()
            .map(|f| schema.field(*f).name().to_string())
            .collect()
    }

    #[test]
    fn test_parse_entities_and_attributes() {
        let input = diagram(&[
            entity(1, "STUDENT"),
            attribute(2, "Student ID", true),
            attribute(3, "Name", false),
            entity(4, "COURSE"),
            attribute(5, "Code", true),
            connector(10, 1, 2, "None", "None"),
            connector(11, 3, 1, "None", "None"),
            connector(12, 4, 5, "None", "None"),
            connector(13, 1, 4, "Many", "many"),
        ]);
        // "Many" is not "many": the check is case-sensitive.
        let schema = parse(&input).unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(field_names(&schema, "STUDENT"), vec!["StudentID", "Name"]);
        assert_eq!(field_names(&schema, "COURSE"), vec!["Code"]);

        let student = schema.table_by_name("STUDENT").unwrap();
        let course = schema.table_by_name("COURSE").unwrap();
        assert_eq!(schema.table(student).related_tables(), &[course]);
        assert_eq!(schema.table(course).related_tables(), &[student]);

        let id = schema.field_by_name(student, "StudentID").unwrap();
        let field = schema.field(id);
        assert!(field.is_primary_key());
        assert!(field.allow_null());
        assert_eq!(field.data_type(), DataType::Varchar);
        assert!(!schema.field(schema.field_by_name(student, "Name").unwrap()).is_primary_key());
    }

    #[test]
    fn test_fields_keep_recording_order() {
        let input = diagram(&[
            attribute(2, "b", false),
            attribute(3, "a", false),
            entity(1, "T"),
            connector(10, 1, 3, "", ""),
            connector(11, 1, 2, "", ""),
        ]);
        let schema = parse(&input).unwrap();
        assert_eq!(field_names(&schema, "T"), vec!["b", "a"]);
    }

    #[test]
    fn test_wrong_signature() {
        let result = parse("Some other file\nFigure 1\n");
        assert_eq!(
            result.err(),
            Some(ParseError::WrongFileType { expected: EDGE_SIGNATURE })
        );
    }

    #[test]
    fn test_relation_figure_rejected() {
        let input = diagram(&[
            entity(1, "A"),
            "Figure 2\n{\n Style \"Relation\"\n Text \"has\"\n}\n".to_string(),
        ]);
        assert_eq!(parse(&input).err(), Some(ParseError::ContainsRelations));
    }

    #[test]
    fn test_irrelevant_figures_skipped() {
        let input = diagram(&[
            "Figure 7\n{\n Style \"Label\"\n Text \"note\"\n}\n".to_string(),
            "Figure 8\n{\n Font \"x\"\n}\n".to_string(),
            entity(1, "A"),
        ]);
        let schema = parse(&input).unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_names_strip_spaces_and_font_codes() {
        assert_eq!(figure_name("First Name"), "FirstName");
        assert_eq!(figure_name("Name\\f1\\b"), "Name");
        assert_eq!(figure_name(" \\f1"), "");
    }

    #[test]
    fn test_blank_name() {
        let input = diagram(&[entity(1, "  ")]);
        assert_eq!(parse(&input).err(), Some(ParseError::BlankName));
    }

    #[test]
    fn test_duplicate_table() {
        let input = diagram(&[entity(1, "A"), entity(2, "A")]);
        assert_eq!(parse(&input).err(), Some(ParseError::DuplicateTable("A".into())));
    }

    #[test]
    fn test_composite_attribute_in_any_position() {
        let linked = diagram(&[
            entity(1, "A"),
            attribute(2, "x", false),
            attribute(3, "y", false),
            connector(10, 1, 2, "", ""),
            connector(11, 2, 3, "", ""),
        ]);
        assert_eq!(parse(&linked).err(), Some(ParseError::CompositeAttributes));

        let first = diagram(&[
            entity(1, "A"),
            attribute(2, "x", false),
            attribute(3, "y", false),
            connector(11, 3, 2, "", ""),
            connector(10, 1, 2, "", ""),
        ]);
        assert_eq!(parse(&first).err(), Some(ParseError::CompositeAttributes));
    }

    #[test]
    fn test_many_to_many_names_tables_in_file_order() {
        let input = diagram(&[
            entity(1, "A"),
            entity(2, "B"),
            connector(10, 2, 1, "Crow's Foot (many)", "many"),
        ]);
        assert_eq!(
            parse(&input).err(),
            Some(ParseError::ManyToMany {
                first: "B".into(),
                second: "A".into()
            })
        );
    }

    #[test]
    fn test_attribute_on_two_tables_detected_across_connectors() {
        let input = diagram(&[
            entity(1, "A"),
            entity(2, "B"),
            attribute(3, "shared", false),
            connector(10, 3, 1, "", ""),
            connector(11, 1, 2, "", ""),
            connector(12, 2, 3, "", ""),
        ]);
        assert_eq!(
            parse(&input).err(),
            Some(ParseError::MultipleTables("shared".into()))
        );
    }

    #[test]
    fn test_repeated_connector_to_same_table_is_harmless() {
        let input = diagram(&[
            entity(1, "A"),
            attribute(2, "x", false),
            connector(10, 1, 2, "", ""),
            connector(11, 2, 1, "", ""),
        ]);
        let schema = parse(&input).unwrap();
        assert_eq!(field_names(&schema, "A"), vec!["x"]);
    }

    #[test]
    fn test_dangling_endpoints_are_inert() {
        let input = diagram(&[
            entity(1, "A"),
            attribute(2, "x", false),
            connector(10, 1, 99, "", ""),
            connector(11, 98, 2, "", ""),
        ]);
        let schema = parse(&input).unwrap();
        assert!(field_names(&schema, "A").is_empty());
    }

    #[test]
    fn test_eof_inside_block_fails() {
        let input = "EDGE Diagram File\nFigure 1\n{\n Style \"Entity\"\n Text \"A\"\n";
        assert_eq!(
            parse(input).err(),
            Some(ParseError::UnexpectedEof("figure block"))
        );

        let input = "EDGE Diagram File\nConnector 1\n{\n Figure1 1\n";
        assert_eq!(
            parse(input).err(),
            Some(ParseError::UnexpectedEof("connector block"))
        );
    }

    #[test]
    fn test_malformed_id() {
        let input = "EDGE Diagram File\nFigure x\n";
        assert!(matches!(parse(input), Err(ParseError::Malformed { line: 2, .. })));
    }

    #[test]
    fn test_every_attached_field_has_one_owner() {
        let input = diagram(&[
            entity(1, "A"),
            entity(2, "B"),
            attribute(3, "a1", true),
            attribute(4, "b1", true),
            attribute(5, "loose", false),
            connector(10, 1, 3, "", ""),
            connector(11, 4, 2, "", ""),
            connector(12, 1, 2, "one", "many"),
        ]);
        let schema = parse(&input).unwrap();
        for (id, table) in schema.tables() {
            for field in table.fields() {
                assert_eq!(schema.field(*field).table(), id);
            }
        }
        assert_eq!(field_names(&schema, "A"), vec!["a1"]);
        assert_eq!(field_names(&schema, "B"), vec!["b1"]);
    }
}
