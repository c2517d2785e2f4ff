//! Parser for XML diagram documents.
//!
//! ```xml
//! <diagram>
//!   <tables>
//!     <table>
//!       <name>Author</name>
//!       <fields>
//!         <field type="int" pkey="true" autoincrement="true">id</field>
//!         <field type="string" size="50" null="true">name</field>
//!       </fields>
//!     </table>
//!   </tables>
//!   <relationships>
//!     <relation>
//!       <name>writes</name>
//!       <parent cardinality="one"><tablename>Author</tablename></parent>
//!       <child cardinality="many">
//!         <tablename>Book</tablename>
//!         <foreignkey references="id">author_id</foreignkey>
//!       </child>
//!     </relation>
//!   </relationships>
//! </diagram>
//! ```

use roxmltree::{Document, Node};

use super::{FileParser, ParseError};
use crate::model::{DataType, Schema, TableId};

const ROOT_ELEMENT: &str = "diagram";
const MANY: &str = "many";

#[derive(Debug, Default, Clone, Copy)]
pub struct XmlParser;

impl FileParser for XmlParser {
    fn product_name(&self) -> &'static str {
        "XML Diagrammer File"
    }

    fn file_extension(&self) -> &'static str {
        "xml"
    }

    fn parse_str(&self, input: &str) -> Result<Schema, ParseError> {
        let doc = Document::parse(input).map_err(|e| ParseError::MalformedXml(e.to_string()))?;
        let root = doc.root_element();
        if root.tag_name().name() != ROOT_ELEMENT {
            return Err(structure(format!("Root element must be \"{ROOT_ELEMENT}\".")));
        }

        let mut schema = Schema::new();

        let tables = single_child(root, "tables", "There must be only one \"tables\" element.")?;
        let table_elements = children(tables, "table");
        if table_elements.is_empty() {
            return Err(structure("The file contains no table definitions."));
        }
        for table in table_elements {
            parse_table(&mut schema, table)?;
        }

        let relationships = single_child(
            root,
            "relationships",
            "There must be only one \"relationships\" element.",
        )?;
        for relation in children(relationships, "relation") {
            parse_relation(&mut schema, relation)?;
        }

        Ok(schema)
    }
}

fn structure(message: impl Into<String>) -> ParseError {
    ParseError::Structure(message.into())
}

/// Element children of `node` named `name`, in document order.
fn children<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    node.children()
        .filter(|child| child.is_element() && child.tag_name().name() == name)
        .collect()
}

fn single_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
    message: &str,
) -> Result<Node<'a, 'input>, ParseError> {
    match children(node, name).as_slice() {
        [only] => Ok(*only),
        _ => Err(structure(message)),
    }
}

/// All descendant text, trimmed.
fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

fn attribute<'a>(node: Node<'a, '_>, name: &str) -> &'a str {
    node.attribute(name).map(str::trim).unwrap_or("")
}

fn is_true(node: Node<'_, '_>, name: &str) -> bool {
    attribute(node, name) == "true"
}

fn parse_table(schema: &mut Schema, element: Node<'_, '_>) -> Result<(), ParseError> {
    let name_element = single_child(
        element,
        "name",
        "Each table must have exactly one \"name\" element.",
    )?;
    let name = text_content(name_element);
    if name.is_empty() {
        return Err(ParseError::BlankName);
    }
    if schema.table_by_name(&name).is_some() {
        return Err(ParseError::DuplicateTable(name));
    }

    let fields = single_child(
        element,
        "fields",
        "Each table must have exactly one \"fields\" element.",
    )?;
    let field_elements = children(fields, "field");
    if field_elements.is_empty() {
        return Err(structure(format!("Table \"{name}\" must have at least one field.")));
    }

    let table = schema.add_table(&name)?;
    for field in field_elements {
        parse_field(schema, table, field)?;
    }
    Ok(())
}

fn parse_field(schema: &mut Schema, table: TableId, element: Node<'_, '_>) -> Result<(), ParseError> {
    let name = text_content(element);
    if name.is_empty() {
        return Err(ParseError::BlankName);
    }
    let folded = name.to_lowercase();
    let duplicate = schema
        .table(table)
        .fields()
        .iter()
        .any(|f| schema.field(*f).name().to_lowercase() == folded);
    if duplicate {
        return Err(ParseError::DuplicateField {
            table: schema.table(table).name().to_string(),
            field: name,
        });
    }

    let (data_type, char_length, auto_increment) = match attribute(element, "type") {
        "string" => {
            let data_type = if is_true(element, "fixed") {
                DataType::Char
            } else {
                DataType::Varchar
            };
            let size = attribute(element, "size");
            let length = size.parse().map_err(|_| {
                structure(format!("The field \"{name}\" has an invalid size \"{size}\"."))
            })?;
            (data_type, Some(length), false)
        }
        "int" => (DataType::Integer, None, is_true(element, "autoincrement")),
        other => return Err(ParseError::UnsupportedDataType(other.to_string())),
    };

    let id = schema.add_field(table, &name)?;
    schema.update_field(id, |f| {
        f.set_data_type(data_type);
        if let Some(length) = char_length {
            f.set_char_length(length);
        }
        f.set_auto_increment(auto_increment);
        f.set_primary_key(is_true(element, "pkey"));
        f.set_allow_null(is_true(element, "null"));
    })?;
    Ok(())
}

fn lookup_table(schema: &Schema, relation: &str, name: &str) -> Result<TableId, ParseError> {
    schema
        .table_by_name(name)
        .ok_or_else(|| ParseError::NonexistentTable {
            relation: relation.to_string(),
            table: name.to_string(),
        })
}

fn parse_relation(schema: &mut Schema, element: Node<'_, '_>) -> Result<(), ParseError> {
    let name = text_content(single_child(
        element,
        "name",
        "Each relation must have exactly one \"name\" element.",
    )?);

    let parent = single_child(
        element,
        "parent",
        "Each relation must have exactly one \"parent\" element.",
    )?;
    let parent_cardinality = attribute(parent, "cardinality");
    let parent_name = text_content(single_child(
        parent,
        "tablename",
        "Each parent must have exactly one \"tablename\" element.",
    )?);
    let parent_table = lookup_table(schema, &name, &parent_name)?;

    let child = single_child(
        element,
        "child",
        "Each relation must have exactly one \"child\" element.",
    )?;
    let child_cardinality = attribute(child, "cardinality");
    let child_name = text_content(single_child(
        child,
        "tablename",
        "Each child must have exactly one \"tablename\" element.",
    )?);
    let child_table = lookup_table(schema, &name, &child_name)?;

    let foreign_key = single_child(
        child,
        "foreignkey",
        "Each child must have exactly one \"foreignkey\" element.",
    )?;
    let child_field_name = text_content(foreign_key);
    let parent_field_name = attribute(foreign_key, "references");

    let child_field = schema
        .field_by_name(child_table, &child_field_name)
        .ok_or_else(|| ParseError::NonexistentField {
            relation: name.clone(),
            table: child_name.clone(),
            field: child_field_name.clone(),
        })?;
    let parent_field = schema
        .field_by_name(parent_table, parent_field_name)
        .ok_or_else(|| ParseError::NonexistentField {
            relation: name.clone(),
            table: parent_name.clone(),
            field: parent_field_name.to_string(),
        })?;

    if parent_cardinality == MANY && child_cardinality == MANY {
        return Err(ParseError::ManyToManyRelation);
    }

    schema.add_related_table(child_table, parent_table)?;
    schema.bind_foreign(child_field, parent_field)?;
    tracing::debug!(relation = %name, "bound {child_name}.{child_field_name} to {parent_name}.{parent_field_name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Schema, ParseError> {
        XmlParser.parse_str(input)
    }

    fn document(tables: &str, relationships: &str) -> String {
        format!("<diagram><tables>{tables}</tables><relationships>{relationships}</relationships></diagram>")
    }

    const AUTHOR: &str = r#"<table><name> Author </name><fields>
        <field type="int" pkey="true" autoincrement="true">id</field>
        <field type="string" size="50">name</field>
    </fields></table>"#;

    const BOOK: &str = r#"<table><name>Book</name><fields>
        <field type="int" pkey="true" autoincrement="true">id</field>
        <field type="int">author_id</field>
        <field type="string" size="100" null="true">title</field>
    </fields></table>"#;

    fn relation(parent: &str, child: &str, fk: &str, references: &str, cards: (&str, &str)) -> String {
        format!(
            r#"<relation><name>writes</name>
                <parent cardinality="{}"><tablename>{parent}</tablename></parent>
                <child cardinality="{}"><tablename>{child}</tablename>
                    <foreignkey references="{references}">{fk}</foreignkey></child>
            </relation>"#,
            cards.0, cards.1
        )
    }

    #[test]
    fn test_author_book() {
        let rel = relation("Author", "Book", "author_id", "id", ("one", "many"));
        let schema = parse(&document(&format!("{AUTHOR}{BOOK}"), &rel)).unwrap();

        let author = schema.table_by_name("Author").unwrap();
        let book = schema.table_by_name("Book").unwrap();
        assert_eq!(schema.table(book).related_tables(), &[author]);

        let author_id = schema.field_by_name(book, "author_id").unwrap();
        let id = schema.field_by_name(author, "id").unwrap();
        assert_eq!(schema.field(author_id).foreign_field(), Some(id));
        assert_eq!(schema.table(book).related_field(author_id), Some(id));

        let id = schema.field(id);
        assert_eq!(id.data_type(), DataType::Integer);
        assert!(id.is_auto_increment());
        assert!(id.is_primary_key());
        assert!(!id.allow_null());

        let title = schema.field(schema.field_by_name(book, "title").unwrap());
        assert_eq!(title.data_type(), DataType::Varchar);
        assert_eq!(title.char_length(), 100);
        assert!(title.allow_null());
    }

    #[test]
    fn test_fixed_string_is_char() {
        let tables = r#"<table><name>T</name><fields>
            <field type="string" fixed="true" size="10">code</field>
        </fields></table>"#;
        let schema = parse(&document(tables, "")).unwrap();
        let t = schema.table_by_name("T").unwrap();
        let code = schema.field(schema.field_by_name(t, "code").unwrap());
        assert_eq!(code.data_type(), DataType::Char);
        assert_eq!(code.char_length(), 10);
    }

    #[test]
    fn test_wrong_root() {
        assert_eq!(
            parse("<schema/>").err(),
            Some(ParseError::Structure("Root element must be \"diagram\".".into()))
        );
    }

    #[test]
    fn test_not_xml() {
        assert!(matches!(parse("<diagram>"), Err(ParseError::MalformedXml(_))));
    }

    #[test]
    fn test_tables_required() {
        assert!(matches!(
            parse("<diagram><relationships/></diagram>"),
            Err(ParseError::Structure(_))
        ));
        assert!(matches!(
            parse(&document("", "")),
            Err(ParseError::Structure(m)) if m.contains("no table")
        ));
    }

    #[test]
    fn test_table_needs_fields() {
        let tables = "<table><name>T</name><fields></fields></table>";
        assert!(matches!(parse(&document(tables, "")), Err(ParseError::Structure(_))));
        let tables = "<table><name>T</name></table>";
        assert!(matches!(parse(&document(tables, "")), Err(ParseError::Structure(_))));
    }

    #[test]
    fn test_duplicate_table() {
        assert_eq!(
            parse(&document(&format!("{BOOK}{BOOK}"), "")).err(),
            Some(ParseError::DuplicateTable("Book".into()))
        );
    }

    #[test]
    fn test_duplicate_field_is_case_insensitive() {
        let tables = r#"<table><name>T</name><fields>
            <field type="int">Id</field><field type="int">ID</field>
        </fields></table>"#;
        assert!(matches!(
            parse(&document(tables, "")),
            Err(ParseError::DuplicateField { field, .. }) if field == "ID"
        ));
    }

    #[test]
    fn test_duplicate_field_folds_non_ascii() {
        let tables = r#"<table><name>T</name><fields>
            <field type="int">Äpfel</field><field type="int">äpfel</field>
        </fields></table>"#;
        assert!(matches!(
            parse(&document(tables, "")),
            Err(ParseError::DuplicateField { field, .. }) if field == "äpfel"
        ));
    }

    #[test]
    fn test_blank_table_name() {
        let tables = r#"<table><name>  </name><fields><field type="int">id</field></fields></table>"#;
        assert_eq!(parse(&document(tables, "")).err(), Some(ParseError::BlankName));
    }

    #[test]
    fn test_blank_field_name() {
        let tables = r#"<table><name>T</name><fields><field type="int"></field></fields></table>"#;
        assert_eq!(parse(&document(tables, "")).err(), Some(ParseError::BlankName));
    }

    #[test]
    fn test_unsupported_type() {
        let tables = r#"<table><name>T</name><fields><field type="date">d</field></fields></table>"#;
        assert_eq!(
            parse(&document(tables, "")).err(),
            Some(ParseError::UnsupportedDataType("date".into()))
        );
    }

    #[test]
    fn test_missing_relationships() {
        let input = format!("<diagram><tables>{AUTHOR}</tables></diagram>");
        assert!(matches!(parse(&input), Err(ParseError::Structure(m)) if m.contains("relationships")));
    }

    #[test]
    fn test_nonexistent_table_and_field() {
        let rel = relation("Publisher", "Book", "author_id", "id", ("one", "many"));
        assert_eq!(
            parse(&document(&format!("{AUTHOR}{BOOK}"), &rel)).err(),
            Some(ParseError::NonexistentTable {
                relation: "writes".into(),
                table: "Publisher".into()
            })
        );

        let rel = relation("Author", "Book", "writer_id", "id", ("one", "many"));
        assert_eq!(
            parse(&document(&format!("{AUTHOR}{BOOK}"), &rel)).err(),
            Some(ParseError::NonexistentField {
                relation: "writes".into(),
                table: "Book".into(),
                field: "writer_id".into()
            })
        );

        let rel = relation("Author", "Book", "author_id", "uid", ("one", "many"));
        assert!(matches!(
            parse(&document(&format!("{AUTHOR}{BOOK}"), &rel)),
            Err(ParseError::NonexistentField { table, .. }) if table == "Author"
        ));
    }

    #[test]
    fn test_many_to_many_checked_after_lookups() {
        let rel = relation("Author", "Book", "author_id", "id", ("many", "many"));
        assert_eq!(
            parse(&document(&format!("{AUTHOR}{BOOK}"), &rel)).err(),
            Some(ParseError::ManyToManyRelation)
        );

        let rel = relation("Author", "Book", "missing", "id", ("many", "many"));
        assert!(matches!(
            parse(&document(&format!("{AUTHOR}{BOOK}"), &rel)),
            Err(ParseError::NonexistentField { .. })
        ));
    }
}
