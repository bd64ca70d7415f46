//! Descriptor table parsing.
//!
//! The table is a line-oriented `key = value` file bundled with the
//! package. A bare `<id>` key (or `<id>.display_name`) names a core,
//! `<id>.library` gives the full library name and `<id>.notes` carries
//! free text. Lines starting with `#` are comments.

use crate::error::DescriptorParseError;
use crate::plugin::DescriptorEntry;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    entries: HashMap<String, DescriptorEntry>,
}

impl DescriptorTable {
    /// Parses a raw descriptor table. Any malformed line rejects the whole table.
    pub fn parse(bytes: &[u8]) -> Result<Self, DescriptorParseError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DescriptorParseError::InvalidUtf8)?;
        let mut entries: HashMap<String, DescriptorEntry> = HashMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(DescriptorParseError::MissingSeparator { line: line_no })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(DescriptorParseError::EmptyKey { line: line_no });
            }
            let value = unquote(value.trim(), line_no)?;

            let (id, field) = match key.split_once('.') {
                Some((id, field)) => (id, field),
                None => (key, "display_name"),
            };

            if !matches!(field, "display_name" | "library" | "notes") {
                debug!(line = line_no, key = %key, "Ignoring unknown descriptor key");
                continue;
            }

            let entry = entries.entry(id.to_string()).or_default();
            match field {
                "library" => entry.library_name = Some(value),
                "notes" => entry.notes = Some(value),
                _ => entry.display_name = Some(value),
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&DescriptorEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unquote(value: &str, line: usize) -> Result<String, DescriptorParseError> {
    match value.strip_prefix('"') {
        Some(rest) => rest
            .strip_suffix('"')
            .map(str::to_string)
            .ok_or(DescriptorParseError::UnterminatedQuote { line }),
        None => Ok(value.to_string()),
    }
}
