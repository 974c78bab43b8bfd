//! Reader for `key = value` files with optional `[section]` headers.
//!

use std::{fs, io, path::Path};

use thiserror::Error;

/// A named group of entries. Entries before the first header land in a
/// section with an empty name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Section {
    /// The section name, without brackets.
    pub name: String,

    /// The entries in file order.
    pub entries: Vec<(String, String)>,
}

impl Section {
    /// The first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over the entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// A parsed key-value file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyValueFile {
    sections: Vec<Section>,
}

impl KeyValueFile {
    /// Reads and parses a file.
    pub fn load(path: &Path) -> Result<Self, KeyValueError> {
        let contents = fs::read_to_string(path).map_err(KeyValueError::Read)?;
        Ok(Self::parse(&contents))
    }

    /// Parses file contents.
    ///
    /// Blank lines and lines starting with `#` or `;` are skipped. Keys and
    /// values are trimmed and a value wrapped in single or double quotes is
    /// unwrapped.
    /// Lines without `=` are ignored.
    pub fn parse(contents: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();

        for line in contents.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                if let Some((name, _)) = header.split_once(']') {
                    sections.push(Section {
                        name: name.to_string(),
                        entries: Vec::new(),
                    });
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            let key = key.trim().to_string();
            let value = unquote(value.trim()).to_string();

            match sections.last_mut() {
                Some(section) => section.entries.push((key, value)),
                None => sections.push(Section {
                    name: String::new(),
                    entries: vec![(key, value)],
                }),
            }
        }

        Self { sections }
    }

    /// The first section called `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// The entries that appear before any header.
    pub fn root(&self) -> Option<&Section> {
        self.section("")
    }

    /// The value of `key` in section `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|section| section.get(key))
    }

    /// All sections in file order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

fn unquote(value: &str) -> &str {
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return value;
    };

    let rest = value.get(1..).unwrap_or_default();
    rest.split_once(quote).map_or(rest, |(inner, _)| inner)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("Failed to read the file: {0}")]
    Read(#[source] io::Error),
}
