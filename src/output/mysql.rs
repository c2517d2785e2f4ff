//! MySQL DDL builder.

use super::{BuildError, DdlBuilder};
use crate::model::{DataType, Field, Schema, TableId};

const EOL: &str = "\r\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlBuilder;

impl DdlBuilder for MySqlBuilder {
    fn product_name(&self) -> &'static str {
        "MySQL"
    }

    fn file_extension(&self) -> &'static str {
        "sql"
    }

    fn requires_database_name(&self) -> bool {
        true
    }

    fn build(
        &self,
        schema: &Schema,
        tables: &[TableId],
        database: Option<&str>,
    ) -> Result<String, BuildError> {
        let database = database.ok_or(BuildError::MissingDatabaseName)?;

        // Referenced tables should come first. Ordering by binding count only
        // looks one hop ahead, so longer chains may still come out of order.
        let mut ordered = tables.to_vec();
        for id in &ordered {
            if schema.get_table(*id).is_none() {
                return Err(BuildError::UnknownTable(*id));
            }
        }
        ordered.sort_by_key(|id| schema.table(*id).foreign_key_count());

        let mut output = String::new();
        output.push_str(&format!("CREATE DATABASE {database};{EOL}"));
        output.push_str(&format!("USE {database};{EOL}"));
        for id in ordered {
            serialize_table(&mut output, schema, id)?;
        }
        Ok(output)
    }
}

fn serialize_table(output: &mut String, schema: &Schema, id: TableId) -> Result<(), BuildError> {
    let table = schema.table(id);
    let name = table.name();
    output.push_str(&format!("CREATE TABLE {name} ({EOL}"));

    let mut columns = Vec::with_capacity(table.fields().len());
    for field in table.fields() {
        let field = schema
            .get_field(*field)
            .ok_or(BuildError::DanglingField(*field))?;
        columns.push(column(field));
    }
    output.push_str(&columns.join(&format!(",{EOL}")));

    let primary_keys: Vec<&str> = schema
        .primary_key_fields(id)
        .into_iter()
        .map(|f| schema.field(f).name())
        .collect();
    if !primary_keys.is_empty() {
        output.push_str(&format!(
            ",{EOL}\tCONSTRAINT {name}_PK PRIMARY KEY ({})",
            primary_keys.join(", ")
        ));
    }

    let mut constraints = Vec::new();
    for native in table.fields() {
        let Some(foreign) = table.related_field(*native) else {
            continue;
        };
        let target = schema
            .get_field(foreign)
            .ok_or(BuildError::DanglingField(foreign))?;
        constraints.push(format!(
            "\tCONSTRAINT {name}_FK{} FOREIGN KEY({}) REFERENCES {}({})",
            constraints.len() + 1,
            schema.field(*native).name(),
            schema.table(target.table()).name(),
            target.name()
        ));
    }
    if !constraints.is_empty() {
        output.push_str(&format!(",{EOL}"));
        output.push_str(&constraints.join(&format!(",{EOL}")));
    }

    output.push_str(&format!("{EOL});{EOL}{EOL}"));
    Ok(())
}

fn column(field: &Field) -> String {
    let mut out = format!("\t{} {}", field.name(), field.data_type().sql_name());
    if field.data_type().has_length() {
        out.push_str(&format!("({})", field.char_length()));
    }
    if !field.allow_null() {
        out.push_str(" NOT NULL");
    }
    let default = field.default_value();
    if !default.is_empty() {
        if field.data_type() == DataType::Boolean {
            out.push_str(if default.eq_ignore_ascii_case("true") {
                " DEFAULT 1"
            } else {
                " DEFAULT 0"
            });
        } else {
            out.push_str(&format!(" DEFAULT {default}"));
        }
    }
    if field.is_auto_increment() {
        out.push_str(" AUTO_INCREMENT");
    }
    out
}
