//! Line cursor shared by the line-oriented formats.

use super::ParseError;

pub(crate) const BLOCK_END: &str = "}";

/// Forward-only cursor over input lines, trimmed unless read raw.
pub(crate) struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().collect(),
            pos: 0,
        }
    }

    /// 1-based number of the line most recently returned.
    pub fn line_number(&self) -> usize {
        self.pos
    }

    pub fn next_line(&mut self) -> Option<&'a str> {
        self.next_raw_line().map(str::trim)
    }

    /// Next line with its surrounding whitespace kept.
    pub fn next_raw_line(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    /// Next line, or `UnexpectedEof` naming what was being read.
    pub fn expect_line(&mut self, context: &'static str) -> Result<&'a str, ParseError> {
        self.next_line().ok_or(ParseError::UnexpectedEof(context))
    }

    /// Check that the first non-empty line starts with `signature`.
    pub fn expect_signature(&mut self, signature: &'static str) -> Result<(), ParseError> {
        loop {
            match self.next_line() {
                Some("") => continue,
                Some(line) if line.starts_with(signature) => return Ok(()),
                _ => return Err(ParseError::WrongFileType { expected: signature }),
            }
        }
    }

    /// Advance to the next line starting with `prefix` inside the current
    /// block. Hitting the block end first is a structural error.
    pub fn seek_in_block(&mut self, prefix: &'static str, context: &'static str) -> Result<&'a str, ParseError> {
        loop {
            let line = self.expect_line(context)?;
            if line.starts_with(prefix) {
                return Ok(line);
            }
            if line == BLOCK_END {
                return Err(self.malformed(format!("{context} has no {prefix} line")));
            }
        }
    }

    /// Consume lines up to and including the block end.
    pub fn skip_block(&mut self, context: &'static str) -> Result<(), ParseError> {
        self.scan_block(context, |_| {})
    }

    /// Feed every remaining line of the block to `visit`, then consume the
    /// block end.
    pub fn scan_block(
        &mut self,
        context: &'static str,
        mut visit: impl FnMut(&'a str),
    ) -> Result<(), ParseError> {
        loop {
            let line = self.expect_line(context)?;
            if line == BLOCK_END {
                return Ok(());
            }
            visit(line);
        }
    }

    pub fn malformed(&self, message: impl Into<String>) -> ParseError {
        ParseError::Malformed {
            line: self.line_number(),
            message: message.into(),
        }
    }

    /// Integer after the first space of `line`, as in `Figure 12`.
    pub fn labelled_id(&self, line: &str) -> Result<u32, ParseError> {
        let value = after_label(line);
        value
            .parse()
            .map_err(|_| self.malformed(format!("expected an integer id, found \"{value}\"")))
    }

    /// Text between the first and last double quote of `line`.
    pub fn quoted<'l>(&self, line: &'l str) -> Result<&'l str, ParseError> {
        quoted_parameter(line)
            .ok_or_else(|| self.malformed(format!("expected a quoted value in \"{line}\"")))
    }
}

/// Text after the first space of `line`; empty when there is none.
pub(crate) fn after_label(line: &str) -> &str {
    line.split_once(' ').map(|(_, rest)| rest.trim()).unwrap_or("")
}

/// Text between the first and last double quote of `line`.
pub(crate) fn quoted_parameter(line: &str) -> Option<&str> {
    let start = line.find('"')?;
    let end = line.rfind('"')?;
    if end > start {
        Some(&line[start + 1..end])
    } else {
        None
    }
}
