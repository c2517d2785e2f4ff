//! In-memory relational schema: the representation every parser produces
//! and every builder consumes.

mod data_type;
mod events;
mod field;
mod schema;
mod table;

pub use data_type::DataType;
pub use events::{ChangeNotifier, SchemaEvent, SubscriptionId};
pub use field::{DEFAULT_CHAR_LENGTH, Field};
pub use schema::{FieldId, Schema, TableId};
pub use table::Table;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("There are multiple tables called {0}")]
    DuplicateTable(String),
    #[error("Table {table} already has a field called {field}")]
    DuplicateField { table: String, field: String },
    #[error("Unknown table id {0:?}")]
    UnknownTable(TableId),
    #[error("Unknown field id {0:?}")]
    UnknownField(FieldId),
    #[error("Field {field} does not belong to table {table}")]
    NotOwned { table: String, field: String },
    #[error("Table {table} is not related to table {related}")]
    UnrelatedTable { table: String, related: String },
}
