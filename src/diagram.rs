//! Pre-resolution records built while scanning a diagram or save file.
//!
//! These hold diagram-local integer ids instead of model handles. A parser
//! fills them during its scan and converts them into a [`Schema`] only once
//! every rule has passed, so a failed parse never leaves a half-built schema
//! behind.
//!
//! [`Schema`]: crate::model::Schema

/// Diagram-local figure id.
pub(crate) type FigureId = u32;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawTable {
    pub id: FigureId,
    pub name: String,
    pub related_tables: Vec<FigureId>,
    pub native_fields: Vec<FigureId>,
    /// Parallel to `native_fields`; 0 marks an unbound field.
    pub related_fields: Vec<FigureId>,
}

impl RawTable {
    pub fn new(id: FigureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            related_tables: Vec::new(),
            native_fields: Vec::new(),
            related_fields: Vec::new(),
        }
    }

    pub fn relate(&mut self, table: FigureId) {
        if !self.related_tables.contains(&table) {
            self.related_tables.push(table);
        }
    }

    pub fn add_native_field(&mut self, field: FigureId) {
        self.native_fields.push(field);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ForeignBinding {
    pub table: FigureId,
    pub field: FigureId,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawField {
    pub id: FigureId,
    pub name: String,
    pub table: Option<FigureId>,
    pub foreign: Option<ForeignBinding>,
    pub data_type: usize,
    pub char_length: u32,
    pub disallow_null: bool,
    pub primary_key: bool,
    pub default_value: String,
}

impl RawField {
    pub fn new(id: FigureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            table: None,
            foreign: None,
            data_type: 0,
            char_length: crate::model::DEFAULT_CHAR_LENGTH,
            disallow_null: false,
            primary_key: false,
            default_value: String::new(),
        }
    }
}

/// A link between two figures with the end style at each side.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawConnector {
    pub id: FigureId,
    pub endpoints: [FigureId; 2],
    pub end_styles: [String; 2],
}

impl RawConnector {
    pub fn is_many_to_many(&self) -> bool {
        self.end_styles.iter().all(|style| style.contains("many"))
    }
}
