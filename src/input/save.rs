//! Parser for EdgeConvert save files, the format written by
//! [`SaveFileBuilder`](crate::output::SaveFileBuilder).

use std::collections::HashMap;

use super::lines::{BLOCK_END, LineCursor, after_label};
use super::{FileParser, ParseError};
use crate::diagram::{FigureId, ForeignBinding, RawField, RawTable};
use crate::model::{DataType, FieldId, Schema};

pub const SAVE_SIGNATURE: &str = "EdgeConvert Save File";
pub const SAVE_DELIMITER: char = '|';

const TABLE_PREFIX: &str = "Table: ";
const FIELD_COLUMNS: usize = 9;

#[derive(Debug, Default, Clone, Copy)]
pub struct SaveParser;

impl FileParser for SaveParser {
    fn product_name(&self) -> &'static str {
        SAVE_SIGNATURE
    }

    fn file_extension(&self) -> &'static str {
        "sav"
    }

    fn parse_str(&self, input: &str) -> Result<Schema, ParseError> {
        let mut cursor = LineCursor::new(input);
        cursor.expect_signature(SAVE_SIGNATURE)?;
        cursor.expect_line("save file header")?;

        let mut tables = Vec::new();
        while let Some(line) = cursor.next_line() {
            if !line.starts_with(TABLE_PREFIX) {
                break;
            }
            tables.push(parse_table(&mut cursor, line)?);
        }

        let mut fields = Vec::new();
        while let Some(line) = cursor.next_raw_line() {
            if let Some(field) = parse_field(&cursor, line)? {
                fields.push(field);
            }
        }

        assemble(&tables, &fields)
    }
}

/// Non-empty tokens of a delimited row.
fn tokens(row: &str) -> Vec<&str> {
    row.split(SAVE_DELIMITER).filter(|t| !t.is_empty()).collect()
}

fn id_row(cursor: &mut LineCursor<'_>, label: &'static str) -> Result<Vec<FigureId>, ParseError> {
    let line = cursor.expect_line("table block")?;
    if !line.starts_with(label) {
        return Err(cursor.malformed(format!("expected a {label} row")));
    }
    tokens(after_label(line))
        .into_iter()
        .map(|t| {
            t.trim()
                .parse()
                .map_err(|_| cursor.malformed(format!("invalid id \"{t}\" in {label} row")))
        })
        .collect()
}

fn parse_table(cursor: &mut LineCursor<'_>, header: &str) -> Result<RawTable, ParseError> {
    let id = cursor.labelled_id(header)?;
    let open = cursor.expect_line("table block")?;
    if open != "{" {
        return Err(cursor.malformed("expected { after the table header"));
    }
    let name_line = cursor.expect_line("table block")?;
    let name = after_label(name_line);
    if name.is_empty() {
        return Err(ParseError::BlankName);
    }

    let mut table = RawTable::new(id, name);
    table.native_fields = id_row(cursor, "NativeFields")?;
    table.related_tables = id_row(cursor, "RelatedTables")?;
    table.related_fields = id_row(cursor, "RelatedFields")?;
    if table.related_fields.len() != table.native_fields.len() {
        return Err(cursor.malformed(format!(
            "table {} has {} native fields but {} related field entries",
            table.name,
            table.native_fields.len(),
            table.related_fields.len()
        )));
    }

    if cursor.expect_line("table block")? != BLOCK_END {
        return Err(cursor.malformed("expected } at the end of the table block"));
    }
    Ok(table)
}

/// One field row; `None` for a blank line.
///
/// The first nine columns are positional. Everything after the ninth
/// delimiter, untrimmed, is the default value.
fn parse_field(cursor: &LineCursor<'_>, line: &str) -> Result<Option<RawField>, ParseError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let columns: Vec<&str> = line.splitn(FIELD_COLUMNS + 1, SAVE_DELIMITER).collect();
    if columns.len() < FIELD_COLUMNS {
        return Err(cursor.malformed(format!(
            "field row has {} columns, expected at least {FIELD_COLUMNS}",
            columns.len()
        )));
    }

    let int = |value: &str, what: &str| -> Result<u32, ParseError> {
        value
            .trim()
            .parse()
            .map_err(|_| cursor.malformed(format!("invalid {what} \"{value}\"")))
    };

    let mut field = RawField::new(int(columns[0], "field id")?, columns[1]);
    field.table = Some(int(columns[2], "table id")?);
    field.foreign = match (columns[3].trim(), columns[4].trim()) {
        ("null", "null") => None,
        ("null", _) | (_, "null") => {
            return Err(cursor.malformed(format!(
                "field {} has a half-specified foreign key",
                field.name
            )));
        }
        (related_field, related_table) => Some(ForeignBinding {
            field: int(related_field, "related field id")?,
            table: int(related_table, "related table id")?,
        }),
    };
    field.data_type = int(columns[5], "data type")? as usize;
    field.char_length = int(columns[6], "character length")?;
    field.primary_key = columns[7].trim().eq_ignore_ascii_case("true");
    field.disallow_null = columns[8].trim().eq_ignore_ascii_case("true");
    if let Some(default) = columns.get(FIELD_COLUMNS) {
        field.default_value = default.to_string();
    }
    Ok(Some(field))
}

fn assemble(tables: &[RawTable], fields: &[RawField]) -> Result<Schema, ParseError> {
    let malformed = |message: String| ParseError::Malformed { line: 0, message };

    let mut schema = Schema::new();
    let mut table_ids = HashMap::new();
    for raw in tables {
        table_ids.insert(raw.id, schema.add_table(&raw.name)?);
    }

    for field in fields {
        let owner = field.table.unwrap_or_default();
        if !table_ids.contains_key(&owner) {
            return Err(malformed(format!(
                "field {} belongs to unknown table {owner}",
                field.name
            )));
        }
    }

    let mut field_ids: HashMap<FigureId, FieldId> = HashMap::new();
    for raw in tables {
        let table = table_ids[&raw.id];
        for related in &raw.related_tables {
            let other = table_ids.get(related).ok_or_else(|| {
                malformed(format!("table {} lists unknown related table {related}", raw.name))
            })?;
            schema.add_related_table(table, *other)?;
        }

        let mut ordered = Vec::with_capacity(raw.native_fields.len());
        for native in &raw.native_fields {
            let field = fields
                .iter()
                .find(|f| f.id == *native && f.table == Some(raw.id))
                .ok_or_else(|| {
                    malformed(format!("table {} lists unknown field {native}", raw.name))
                })?;
            ordered.push(field);
        }
        for field in fields.iter().filter(|f| f.table == Some(raw.id)) {
            if !raw.native_fields.contains(&field.id) {
                ordered.push(field);
            }
        }

        for raw_field in ordered {
            let data_type = DataType::from_ordinal(raw_field.data_type).ok_or_else(|| {
                malformed(format!(
                    "field {} has unknown data type {}",
                    raw_field.name, raw_field.data_type
                ))
            })?;
            let id = schema.add_field(table, &raw_field.name)?;
            schema.update_field(id, |f| {
                f.set_data_type(data_type);
                f.set_char_length(raw_field.char_length);
                f.set_allow_null(!raw_field.disallow_null);
                f.set_primary_key(raw_field.primary_key);
                f.set_default_value(raw_field.default_value.as_str());
            })?;
            field_ids.insert(raw_field.id, id);
        }
    }

    for raw_field in fields {
        let Some(binding) = raw_field.foreign else {
            continue;
        };
        let native = field_ids[&raw_field.id];
        let target = field_ids.get(&binding.field).copied().ok_or_else(|| {
            malformed(format!(
                "field {} references unknown field {}",
                raw_field.name, binding.field
            ))
        })?;
        let target_table = schema.field(target).table();
        if table_ids.get(&binding.table) != Some(&target_table) {
            return Err(malformed(format!(
                "field {} references field {} outside table {}",
                raw_field.name, binding.field, binding.table
            )));
        }
        schema.add_related_table(schema.field(native).table(), target_table)?;
        schema.bind_foreign(native, target)?;
    }

    Ok(schema)
}
