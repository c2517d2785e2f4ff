//! Back-ends: a [`Schema`] rendered as DDL or another file format.

mod mysql;
mod save;

pub use mysql::MySqlBuilder;
pub use save::SaveFileBuilder;

use crate::model::{FieldId, Schema, TableId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("A database name is required for this output format")]
    MissingDatabaseName,
    #[error("Table {0:?} is not part of the schema")]
    UnknownTable(TableId),
    #[error("Field {0:?} is not part of the schema")]
    DanglingField(FieldId),
    #[error("The name \"{0}\" cannot be written to this output format")]
    UnrepresentableName(String),
    #[error("The default value of field \"{0}\" cannot be written to this output format")]
    UnrepresentableDefault(String),
}

/// An output format.
///
/// Builders are stateless; `tables` is the caller's selection and a builder
/// reorders only its own copy.
pub trait DdlBuilder {
    fn product_name(&self) -> &'static str;

    /// File extension, also used as the format identifier.
    fn file_extension(&self) -> &'static str;

    fn requires_database_name(&self) -> bool;

    fn build(
        &self,
        schema: &Schema,
        tables: &[TableId],
        database: Option<&str>,
    ) -> Result<String, BuildError>;
}

/// Pairs a builder with a schema, a table selection and a database name.
pub struct Exporter<'a> {
    builder: &'a dyn DdlBuilder,
    schema: &'a Schema,
    tables: Vec<TableId>,
    database_name: Option<String>,
}

impl<'a> Exporter<'a> {
    /// Starts with every table of `schema`, in schema order.
    pub fn new(builder: &'a dyn DdlBuilder, schema: &'a Schema) -> Self {
        Self {
            builder,
            schema,
            tables: schema.table_ids(),
            database_name: None,
        }
    }

    pub fn builder(&self) -> &'a dyn DdlBuilder {
        self.builder
    }

    pub fn set_tables(&mut self, tables: &[TableId]) {
        self.tables = tables.to_vec();
    }

    pub fn set_database_name(&mut self, name: impl Into<String>) {
        self.database_name = Some(name.into());
    }

    pub fn requires_database_name(&self) -> bool {
        self.builder.requires_database_name()
    }

    pub fn build(&self) -> Result<String, BuildError> {
        let database = self.database_name.as_deref().filter(|name| !name.is_empty());
        if self.requires_database_name() && database.is_none() {
            return Err(BuildError::MissingDatabaseName);
        }
        if let Some(unknown) = self
            .tables
            .iter()
            .find(|id| self.schema.get_table(**id).is_none())
        {
            return Err(BuildError::UnknownTable(*unknown));
        }

        let output = self.builder.build(self.schema, &self.tables, database)?;
        tracing::info!(
            format = self.builder.product_name(),
            tables = self.tables.len(),
            bytes = output.len(),
            "built output"
        );
        Ok(output)
    }
}
