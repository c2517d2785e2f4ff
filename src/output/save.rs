//! Save-file builder; the output reads back through
//! [`SaveParser`](crate::input::SaveParser).

use std::collections::HashMap;

use super::{BuildError, DdlBuilder};
use crate::input::{SAVE_DELIMITER, SAVE_SIGNATURE};
use crate::model::{Field, FieldId, Schema, TableId};

#[derive(Debug, Default, Clone, Copy)]
pub struct SaveFileBuilder;

impl DdlBuilder for SaveFileBuilder {
    fn product_name(&self) -> &'static str {
        "Edge Convert Save"
    }

    fn file_extension(&self) -> &'static str {
        "sav"
    }

    fn requires_database_name(&self) -> bool {
        false
    }

    fn build(
        &self,
        schema: &Schema,
        tables: &[TableId],
        _database: Option<&str>,
    ) -> Result<String, BuildError> {
        let ids = SaveIds::assign(schema, tables)?;

        let mut output = String::new();
        output.push_str(SAVE_SIGNATURE);
        output.push_str("\n#Tables#\n");
        for table in tables {
            serialize_table(&mut output, schema, &ids, *table);
        }
        output.push_str("#Fields#\n");
        for table in tables {
            for field in schema.table(*table).fields() {
                serialize_field(&mut output, schema, &ids, *field);
            }
        }
        Ok(output)
    }
}

/// Sequential ids starting at 1, each table followed by its fields.
struct SaveIds {
    tables: HashMap<TableId, usize>,
    fields: HashMap<FieldId, usize>,
}

impl SaveIds {
    fn assign(schema: &Schema, tables: &[TableId]) -> Result<Self, BuildError> {
        let mut ids = Self {
            tables: HashMap::new(),
            fields: HashMap::new(),
        };
        let mut next = 1;
        for table in tables {
            let entry = schema.get_table(*table).ok_or(BuildError::UnknownTable(*table))?;
            check_table_name(entry.name())?;
            ids.tables.insert(*table, next);
            next += 1;
            for field in entry.fields() {
                let record = schema
                    .get_field(*field)
                    .ok_or(BuildError::DanglingField(*field))?;
                check_field(record)?;
                ids.fields.insert(*field, next);
                next += 1;
            }
        }
        Ok(ids)
    }

    /// Id of the field bound to `field`, when its table is being written too.
    fn foreign(&self, schema: &Schema, field: FieldId) -> Option<usize> {
        let foreign = schema.field(field).foreign_field()?;
        let id = self.fields.get(&foreign).copied();
        if id.is_none() {
            tracing::warn!(
                field = schema.field(field).name(),
                "dropping foreign key into a table outside the selection"
            );
        }
        id
    }
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// Table names are read back trimmed from a `TableName:` line.
fn check_table_name(name: &str) -> Result<(), BuildError> {
    if name.is_empty() || name.trim() != name || has_line_break(name) {
        return Err(BuildError::UnrepresentableName(name.to_string()));
    }
    Ok(())
}

/// Field names sit between delimiters; the default runs to the end of the row.
fn check_field(field: &Field) -> Result<(), BuildError> {
    let name = field.name();
    if name.is_empty() || name.contains(SAVE_DELIMITER) || has_line_break(name) {
        return Err(BuildError::UnrepresentableName(name.to_string()));
    }
    if has_line_break(field.default_value()) {
        return Err(BuildError::UnrepresentableDefault(name.to_string()));
    }
    Ok(())
}

fn join_ids(ids: impl Iterator<Item = usize>) -> String {
    ids.map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(&SAVE_DELIMITER.to_string())
}

fn serialize_table(output: &mut String, schema: &Schema, ids: &SaveIds, id: TableId) {
    let table = schema.table(id);
    output.push_str(&format!("Table: {}\n{{\n", ids.tables[&id]));
    output.push_str(&format!("TableName: {}\n", table.name()));

    let native = join_ids(table.fields().iter().map(|f| ids.fields[f]));
    output.push_str(&format!("NativeFields: {native}\n"));

    let related = join_ids(
        table
            .related_tables()
            .iter()
            .filter_map(|t| ids.tables.get(t).copied()),
    );
    output.push_str(&format!("RelatedTables: {related}\n"));

    let related_fields = join_ids(
        table
            .fields()
            .iter()
            .map(|f| ids.foreign(schema, *f).unwrap_or(0)),
    );
    output.push_str(&format!("RelatedFields: {related_fields}\n"));
    output.push_str("}\n");
}

fn serialize_field(output: &mut String, schema: &Schema, ids: &SaveIds, id: FieldId) {
    let field = schema.field(id);
    let foreign = match field.foreign_field() {
        Some(foreign) if ids.fields.contains_key(&foreign) => format!(
            "{}|{}",
            ids.fields[&foreign],
            ids.tables[&schema.field(foreign).table()]
        ),
        _ => "null|null".to_string(),
    };
    output.push_str(&format!(
        "{}|{}|{}|{foreign}|{}|{}|{}|{}|{}\n",
        ids.fields[&id],
        field.name(),
        ids.tables[&field.table()],
        field.data_type().ordinal(),
        field.char_length(),
        field.is_primary_key(),
        !field.allow_null(),
        field.default_value()
    ));
}
