use super::{DataType, FieldId, TableId};

pub const DEFAULT_CHAR_LENGTH: u32 = 1;

/// A column of a table.
///
/// Fields are owned by a [`Schema`](super::Schema) and mutated through
/// [`Schema::update_field`](super::Schema::update_field), which notifies
/// subscribers after the closure returns. The setters keep the data type and
/// auto-increment flag consistent with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    table: TableId,
    data_type: DataType,
    char_length: u32,
    default_value: String,
    allow_null: bool,
    primary_key: bool,
    auto_increment: bool,
    pub(super) foreign_field: Option<FieldId>,
}

impl Field {
    pub(super) fn new(name: &str, table: TableId) -> Self {
        Self {
            name: name.to_string(),
            table,
            data_type: DataType::Varchar,
            char_length: DEFAULT_CHAR_LENGTH,
            default_value: String::new(),
            allow_null: true,
            primary_key: false,
            auto_increment: false,
            foreign_field: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table that owns this field.
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn char_length(&self) -> u32 {
        self.char_length
    }

    /// Default value text; empty when no default is set.
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn allow_null(&self) -> bool {
        self.allow_null
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Field this one references as a single-column foreign key.
    pub fn foreign_field(&self) -> Option<FieldId> {
        self.foreign_field
    }

    /// Changing away from INTEGER clears auto-increment.
    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
        if data_type != DataType::Integer {
            self.auto_increment = false;
        }
    }

    /// Enabling auto-increment forces the type to INTEGER.
    pub fn set_auto_increment(&mut self, auto_increment: bool) {
        self.auto_increment = auto_increment;
        if auto_increment {
            self.data_type = DataType::Integer;
        }
    }

    pub fn set_char_length(&mut self, length: u32) {
        self.char_length = length;
    }

    pub fn set_default_value(&mut self, value: impl Into<String>) {
        self.default_value = value.into();
    }

    pub fn set_allow_null(&mut self, allow_null: bool) {
        self.allow_null = allow_null;
    }

    pub fn set_primary_key(&mut self, primary_key: bool) {
        self.primary_key = primary_key;
    }
}
