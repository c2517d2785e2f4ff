//! Front-ends: diagram formats parsed into a [`Schema`].

mod edge;
mod lines;
mod save;
mod xml;

pub use edge::{EDGE_SIGNATURE, EdgeParser};
pub use save::{SAVE_DELIMITER, SAVE_SIGNATURE, SaveParser};
pub use xml::XmlParser;

use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

use crate::model::{Schema, SchemaError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("No input was selected")]
    NoSource,
    #[error("Unable to read the input file")]
    Unreadable,
    #[error("The input is not a {expected}")]
    WrongFileType { expected: &'static str },
    #[error("Unexpected end of input inside {0}")]
    UnexpectedEof(&'static str),
    #[error("Line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("The input is not well-formed XML: {0}")]
    MalformedXml(String),
    #[error("{0}")]
    Structure(String),

    #[error("The diagram contains relations. Please resolve them and try again.")]
    ContainsRelations,
    #[error("There are entities or attributes with blank names in this diagram. Please provide names for them and try again.")]
    BlankName,
    #[error("There are multiple tables called {0} in this diagram. Please rename all but one of them and try again.")]
    DuplicateTable(String),
    #[error("The diagram contains composite attributes. Please resolve them and try again.")]
    CompositeAttributes,
    #[error("There is a many-many relationship between tables \"{first}\" and \"{second}\". Please resolve this and try again.")]
    ManyToMany { first: String, second: String },
    #[error("The attribute {0} is connected to multiple tables. Please resolve this and try again.")]
    MultipleTables(String),
    #[error("No two fields in table \"{table}\" may have the same name \"{field}\"")]
    DuplicateField { table: String, field: String },
    #[error("The datatype \"{0}\" is not supported by this parser.")]
    UnsupportedDataType(String),
    #[error("The relation \"{relation}\" references nonexistent table \"{table}\"")]
    NonexistentTable { relation: String, table: String },
    #[error("The relation \"{relation}\" references nonexistent field \"{table}.{field}\"")]
    NonexistentField {
        relation: String,
        table: String,
        field: String,
    },
    #[error("Many-to-many relations are not supported by this software.")]
    ManyToManyRelation,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Where an importer reads its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Text(String),
}

impl Source {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Whole source text. A file is opened, read and closed within this call.
    fn read(&self) -> Result<Cow<'_, str>, ParseError> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text)),
            Self::File(path) => fs::read_to_string(path).map(Cow::Owned).map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "failed to read input");
                ParseError::Unreadable
            }),
        }
    }
}

/// A diagram format front-end.
///
/// Implementations keep no state between calls: every intermediate record
/// lives inside one `parse_str` call.
pub trait FileParser {
    /// Human-readable format name.
    fn product_name(&self) -> &'static str;

    /// File extension, also used as the format identifier.
    fn file_extension(&self) -> &'static str;

    /// Parse and validate a complete input, returning the schema only when
    /// every rule passed.
    fn parse_str(&self, input: &str) -> Result<Schema, ParseError>;
}

#[derive(Debug, Default)]
enum Outcome {
    #[default]
    Idle,
    Parsed(Schema),
    Failed(ParseError),
}

/// Drives one [`FileParser`] over a selected source and keeps the result.
pub struct Importer<'p> {
    parser: &'p dyn FileParser,
    source: Option<Source>,
    outcome: Outcome,
}

impl<'p> Importer<'p> {
    pub fn new(parser: &'p dyn FileParser) -> Self {
        Self {
            parser,
            source: None,
            outcome: Outcome::Idle,
        }
    }

    pub fn parser(&self) -> &'p dyn FileParser {
        self.parser
    }

    pub fn set_source(&mut self, source: Source) {
        self.source = Some(source);
    }

    /// Parse the current source, replacing any earlier result.
    pub fn parse(&mut self) -> Result<&Schema, ParseError> {
        self.outcome = Outcome::Idle;
        let result = self
            .source
            .as_ref()
            .ok_or(ParseError::NoSource)
            .and_then(|source| source.read().and_then(|text| self.parser.parse_str(&text)));

        self.outcome = match result {
            Ok(schema) => {
                tracing::info!(
                    format = self.parser.product_name(),
                    tables = schema.len(),
                    "parsed diagram"
                );
                Outcome::Parsed(schema)
            }
            Err(e) => {
                tracing::debug!(format = self.parser.product_name(), error = %e, "parse failed");
                Outcome::Failed(e)
            }
        };

        match &self.outcome {
            Outcome::Parsed(schema) => Ok(schema),
            Outcome::Failed(e) => Err(e.clone()),
            Outcome::Idle => Err(ParseError::NoSource),
        }
    }

    /// Schema from the last successful parse.
    pub fn schema(&self) -> Option<&Schema> {
        match &self.outcome {
            Outcome::Parsed(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn into_schema(self) -> Option<Schema> {
        match self.outcome {
            Outcome::Parsed(schema) => Some(schema),
            _ => None,
        }
    }

    /// Why the last parse failed.
    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Failed(e) => Some(e.to_string()),
            _ => None,
        }
    }
}
