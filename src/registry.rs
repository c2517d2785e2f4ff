//! Lookup of the available input and output formats.

use std::path::Path;

use crate::input::{EdgeParser, FileParser, Importer, ParseError, SaveParser, Source, XmlParser};
use crate::output::{BuildError, DdlBuilder, Exporter, MySqlBuilder, SaveFileBuilder};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("Unknown input format: {0}")]
    UnknownParser(String),
    #[error("Unknown output format: {0}")]
    UnknownBuilder(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// The parsers and builders a conversion can choose from.
///
/// Formats are identified by file extension or product name, compared
/// case-insensitively. Later registrations shadow earlier ones with the
/// same identifier.
pub struct Registry {
    parsers: Vec<Box<dyn FileParser>>,
    builders: Vec<Box<dyn DdlBuilder>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_parser(Box::new(EdgeParser));
        registry.register_parser(Box::new(SaveParser));
        registry.register_parser(Box::new(XmlParser));
        registry.register_builder(Box::new(MySqlBuilder));
        registry.register_builder(Box::new(SaveFileBuilder));
        registry
    }
}

fn matches_id(id: &str, extension: &str, product_name: &str) -> bool {
    let id = id.trim().trim_start_matches('.');
    id.eq_ignore_ascii_case(extension) || id.eq_ignore_ascii_case(product_name)
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
            builders: Vec::new(),
        }
    }

    pub fn register_parser(&mut self, parser: Box<dyn FileParser>) {
        tracing::debug!(format = parser.file_extension(), "registered parser");
        self.parsers.push(parser);
    }

    pub fn register_builder(&mut self, builder: Box<dyn DdlBuilder>) {
        tracing::debug!(format = builder.file_extension(), "registered builder");
        self.builders.push(builder);
    }

    pub fn parsers(&self) -> impl Iterator<Item = &dyn FileParser> {
        self.parsers.iter().map(|p| p.as_ref())
    }

    pub fn builders(&self) -> impl Iterator<Item = &dyn DdlBuilder> {
        self.builders.iter().map(|b| b.as_ref())
    }

    pub fn parser(&self, id: &str) -> Option<&dyn FileParser> {
        self.parsers
            .iter()
            .rev()
            .find(|p| matches_id(id, p.file_extension(), p.product_name()))
            .map(|p| p.as_ref())
    }

    pub fn builder(&self, id: &str) -> Option<&dyn DdlBuilder> {
        self.builders
            .iter()
            .rev()
            .find(|b| matches_id(id, b.file_extension(), b.product_name()))
            .map(|b| b.as_ref())
    }

    /// Parser chosen by the extension of `path`.
    pub fn parser_for_path(&self, path: &Path) -> Option<&dyn FileParser> {
        let extension = path.extension()?.to_str()?;
        self.parser(extension)
    }

    /// Parse `source` with the `from` format and render it with `to`.
    pub fn convert(
        &self,
        source: Source,
        from: &str,
        to: &str,
        database: Option<&str>,
    ) -> Result<String, ConvertError> {
        let parser = self
            .parser(from)
            .ok_or_else(|| ConvertError::UnknownParser(from.to_string()))?;
        let builder = self
            .builder(to)
            .ok_or_else(|| ConvertError::UnknownBuilder(to.to_string()))?;

        let mut importer = Importer::new(parser);
        importer.set_source(source);
        let schema = importer.parse()?;

        let mut exporter = Exporter::new(builder, schema);
        if let Some(database) = database {
            exporter.set_database_name(database);
        }
        Ok(exporter.build()?)
    }
}
