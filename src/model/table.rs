use std::collections::BTreeMap;

use super::{FieldId, TableId};

/// A table: an ordered list of native fields plus its relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    pub(super) fields: Vec<FieldId>,
    pub(super) related_tables: Vec<TableId>,
    pub(super) related_fields: BTreeMap<FieldId, FieldId>,
    pub(super) indexes: BTreeMap<String, FieldId>,
}

impl Table {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            related_tables: Vec::new(),
            related_fields: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native fields in column order.
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn related_tables(&self) -> &[TableId] {
        &self.related_tables
    }

    pub fn is_related_to(&self, table: TableId) -> bool {
        self.related_tables.contains(&table)
    }

    /// Native field → foreign field, one entry per bound field.
    pub fn related_fields(&self) -> &BTreeMap<FieldId, FieldId> {
        &self.related_fields
    }

    /// Foreign field bound to `native`, if any.
    pub fn related_field(&self, native: FieldId) -> Option<FieldId> {
        self.related_fields.get(&native).copied()
    }

    /// Number of foreign-key bindings held by this table.
    pub fn foreign_key_count(&self) -> usize {
        self.related_fields.len()
    }

    pub fn indexes(&self) -> &BTreeMap<String, FieldId> {
        &self.indexes
    }

    pub fn contains_field(&self, field: FieldId) -> bool {
        self.fields.contains(&field)
    }

    pub(super) fn position_of(&self, field: FieldId) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }
}
