//! Column data types understood by every builder.

/// Data type of a field.
///
/// The declaration order is significant: the ordinal of each variant is the
/// type code stored in save files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    Varchar,
    Char,
    Boolean,
    Integer,
    Double,
    Timestamp,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        Self::Varchar,
        Self::Char,
        Self::Boolean,
        Self::Integer,
        Self::Double,
        Self::Timestamp,
    ];

    /// Save-file type code.
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Canonical SQL type name.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Varchar => "VARCHAR",
            Self::Char => "CHAR",
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::Double => "DOUBLE",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Whether the type carries a character length.
    pub fn has_length(self) -> bool {
        matches!(self, Self::Varchar | Self::Char)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}
