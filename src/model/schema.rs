use super::{ChangeNotifier, Field, SchemaError, SchemaEvent, SubscriptionId, Table};

/// Handle to a table inside a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

/// Handle to a field inside a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

/// A relational schema: tables with unique names and their fields.
///
/// The schema owns every table and field; ids handed out by one schema are
/// only meaningful for that schema. All mutation goes through methods on
/// this type so the invariants hold and subscribers hear about every change.
#[derive(Debug, Default)]
pub struct Schema {
    tables: Vec<Table>,
    fields: Vec<Field>,
    notifier: ChangeNotifier,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Table ids in insertion order.
    pub fn table_ids(&self) -> Vec<TableId> {
        (0..self.tables.len()).map(TableId).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = (TableId, &Table)> {
        self.tables.iter().enumerate().map(|(i, t)| (TableId(i), t))
    }

    pub fn get_table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0)
    }

    /// # Panics
    /// When `id` does not belong to this schema.
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn table_by_name(&self, name: &str) -> Option<TableId> {
        self.tables.iter().position(|t| t.name() == name).map(TableId)
    }

    pub fn get_field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    /// # Panics
    /// When `id` does not belong to this schema.
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    /// Native field of `table` with exactly this name.
    pub fn field_by_name(&self, table: TableId, name: &str) -> Option<FieldId> {
        self.get_table(table)?
            .fields()
            .iter()
            .copied()
            .find(|f| self.fields[f.0].name() == name)
    }

    /// Fields of `table` flagged primary key, in column order.
    pub fn primary_key_fields(&self, table: TableId) -> Vec<FieldId> {
        self.get_table(table)
            .map(|t| {
                t.fields()
                    .iter()
                    .copied()
                    .filter(|f| self.fields[f.0].is_primary_key())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn add_table(&mut self, name: &str) -> Result<TableId, SchemaError> {
        if self.table_by_name(name).is_some() {
            return Err(SchemaError::DuplicateTable(name.to_string()));
        }
        let id = TableId(self.tables.len());
        self.tables.push(Table::new(name));
        self.notifier.notify(&SchemaEvent::TableAdded(id));
        Ok(id)
    }

    /// Append a new field named `name` to `table`.
    pub fn add_field(&mut self, table: TableId, name: &str) -> Result<FieldId, SchemaError> {
        self.check_table(table)?;
        if self.field_by_name(table, name).is_some() {
            return Err(SchemaError::DuplicateField {
                table: self.tables[table.0].name().to_string(),
                field: name.to_string(),
            });
        }
        let id = FieldId(self.fields.len());
        self.fields.push(Field::new(name, table));
        self.tables[table.0].fields.push(id);
        self.notifier.notify(&SchemaEvent::TableChanged(table));
        Ok(id)
    }

    /// Mutate a field in place and notify subscribers afterwards.
    pub fn update_field<R>(
        &mut self,
        id: FieldId,
        update: impl FnOnce(&mut Field) -> R,
    ) -> Result<R, SchemaError> {
        let field = self.fields.get_mut(id.0).ok_or(SchemaError::UnknownField(id))?;
        let result = update(field);
        let table = field.table();
        self.notifier
            .notify(&SchemaEvent::FieldChanged { table, field: id });
        Ok(result)
    }

    /// Record `related` as a table that `table` holds foreign keys into.
    pub fn add_related_table(&mut self, table: TableId, related: TableId) -> Result<(), SchemaError> {
        self.check_table(table)?;
        self.check_table(related)?;
        let entry = &mut self.tables[table.0];
        if !entry.related_tables.contains(&related) {
            entry.related_tables.push(related);
            self.notifier.notify(&SchemaEvent::TableChanged(table));
        }
        Ok(())
    }

    /// Bind `native` to `foreign` as a single-column foreign key.
    ///
    /// The foreign field's table must already be related to the native
    /// field's table.
    pub fn bind_foreign(&mut self, native: FieldId, foreign: FieldId) -> Result<(), SchemaError> {
        let table = self.get_field(native).ok_or(SchemaError::UnknownField(native))?.table();
        let target_table = self
            .get_field(foreign)
            .ok_or(SchemaError::UnknownField(foreign))?
            .table();
        if !self.tables[table.0].is_related_to(target_table) {
            return Err(SchemaError::UnrelatedTable {
                table: self.tables[table.0].name().to_string(),
                related: self.tables[target_table.0].name().to_string(),
            });
        }

        self.tables[table.0].related_fields.insert(native, foreign);
        self.fields[native.0].foreign_field = Some(foreign);
        self.notifier
            .notify(&SchemaEvent::FieldChanged { table, field: native });
        Ok(())
    }

    /// Remove the foreign binding of `native`, if any.
    pub fn unbind_foreign(&mut self, native: FieldId) -> Result<(), SchemaError> {
        let table = self.get_field(native).ok_or(SchemaError::UnknownField(native))?.table();
        self.tables[table.0].related_fields.remove(&native);
        self.fields[native.0].foreign_field = None;
        self.notifier
            .notify(&SchemaEvent::FieldChanged { table, field: native });
        Ok(())
    }

    /// Name an index on one of the table's own fields.
    pub fn set_index(&mut self, table: TableId, index: &str, field: FieldId) -> Result<(), SchemaError> {
        self.check_owned(table, field)?;
        self.tables[table.0].indexes.insert(index.to_string(), field);
        self.notifier.notify(&SchemaEvent::TableChanged(table));
        Ok(())
    }

    /// Swap `field` with its predecessor. Returns false at the first position.
    pub fn move_field_up(&mut self, field: FieldId) -> Result<bool, SchemaError> {
        let table = self.get_field(field).ok_or(SchemaError::UnknownField(field))?.table();
        let Some(pos) = self.tables[table.0].position_of(field) else {
            return Ok(false);
        };
        if pos == 0 {
            return Ok(false);
        }
        Ok(self.swap_fields(table, pos, pos - 1))
    }

    /// Swap `field` with its successor. Returns false at the last position.
    pub fn move_field_down(&mut self, field: FieldId) -> Result<bool, SchemaError> {
        let table = self.get_field(field).ok_or(SchemaError::UnknownField(field))?.table();
        let Some(pos) = self.tables[table.0].position_of(field) else {
            return Ok(false);
        };
        Ok(self.swap_fields(table, pos, pos + 1))
    }

    fn swap_fields(&mut self, table: TableId, source: usize, dest: usize) -> bool {
        let fields = &mut self.tables[table.0].fields;
        if source >= fields.len() || dest >= fields.len() {
            return false;
        }
        fields.swap(source, dest);
        self.notifier.notify(&SchemaEvent::TableChanged(table));
        true
    }

    /// Register a change handler; see [`ChangeNotifier`].
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&SchemaEvent) + 'static,
    {
        self.notifier.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Shared handle to this schema's notifier.
    pub fn notifier(&self) -> ChangeNotifier {
        self.notifier.clone()
    }

    fn check_table(&self, table: TableId) -> Result<(), SchemaError> {
        if table.0 < self.tables.len() {
            Ok(())
        } else {
            Err(SchemaError::UnknownTable(table))
        }
    }

    fn check_owned(&self, table: TableId, field: FieldId) -> Result<(), SchemaError> {
        self.check_table(table)?;
        let owner = self.get_field(field).ok_or(SchemaError::UnknownField(field))?;
        if owner.table() != table {
            return Err(SchemaError::NotOwned {
                table: self.tables[table.0].name().to_string(),
                field: owner.name().to_string(),
            });
        }
        Ok(())
    }
}
