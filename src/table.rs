//! Table-backed implementations.
//!
//! A [`TableImplementation`] is one installed version of the derivation library,
//! materialized as a JSON position table:
//!
//! ```json
//! {
//!   "name": "reference",
//!   "version": "0.13.2",
//!   "positions": [
//!     {
//!       "code": "Aaa",
//!       "representative": "東",
//!       "description": "端一東平",
//!       "attributes": { "initial": "端", "final": "東", "tone": "平" }
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DeriveError, TableError};
use crate::position::{Implementation, Position, PositionIter};

#[derive(Debug, Deserialize)]
struct TableDocument {
    name: String,
    #[serde(default)]
    version: String,
    positions: Vec<TableEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TableEntry {
    code: String,
    #[serde(default)]
    representative: Option<String>,
    description: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

/// A position owned by a [`TableImplementation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePosition {
    code: String,
    representative: Option<String>,
    description: String,
    attributes: BTreeMap<String, String>,
}

impl From<&TableEntry> for TablePosition {
    fn from(entry: &TableEntry) -> Self {
        Self {
            code: entry.code.clone(),
            representative: entry.representative.clone(),
            description: entry.description.clone(),
            attributes: entry.attributes.clone(),
        }
    }
}

impl Position for TablePosition {
    fn code(&self) -> &str {
        &self.code
    }

    fn representative(&self) -> Option<&str> {
        self.representative.as_deref()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Library instance read from a position table on disk.
#[derive(Debug)]
pub struct TableImplementation {
    name: String,
    version: String,
    entries: Vec<TableEntry>,
    by_code: HashMap<String, usize>,
}

impl TableImplementation {
    /// Open a dataset file.
    pub fn open(path: &Path) -> Result<Self, TableError> {
        let raw = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &raw)
    }

    /// Parse a dataset already in memory; `origin` is only used in error messages.
    pub fn from_json(origin: &Path, raw: &str) -> Result<Self, TableError> {
        let document: TableDocument =
            serde_json::from_str(raw).map_err(|source| TableError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        let mut by_code = HashMap::with_capacity(document.positions.len());
        for (index, entry) in document.positions.iter().enumerate() {
            if by_code.insert(entry.code.clone(), index).is_some() {
                return Err(TableError::DuplicateCode {
                    path: origin.to_path_buf(),
                    code: entry.code.clone(),
                });
            }
        }

        tracing::debug!(
            name = %document.name,
            version = %document.version,
            positions = document.positions.len(),
            "opened position table"
        );

        Ok(Self {
            name: document.name,
            version: document.version,
            entries: document.positions,
            by_code,
        })
    }

    /// Number of positions in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Implementation for TableImplementation {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn positions(&self) -> Result<PositionIter<'_>, DeriveError> {
        Ok(Box::new(self.entries.iter().map(|entry| {
            Box::new(TablePosition::from(entry)) as Box<dyn Position>
        })))
    }

    fn position_from_code(&self, code: &str) -> Result<Box<dyn Position>, DeriveError> {
        let index = self
            .by_code
            .get(code)
            .copied()
            .ok_or_else(|| DeriveError::UnknownCode {
                implementation: self.name.clone(),
                code: code.to_string(),
            })?;
        Ok(Box::new(TablePosition::from(&self.entries[index])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "name": "reference",
        "version": "1.2.0",
        "positions": [
            {"code": "A", "representative": "東", "description": "端一東平",
             "attributes": {"initial": "端", "tone": "平"}},
            {"code": "B", "description": "透一東平", "attributes": {"initial": "透"}}
        ]
    }"#;

    #[test]
    fn enumerates_in_file_order() {
        let table = TableImplementation::from_json(Path::new("sample.json"), SAMPLE).unwrap();
        assert_eq!(table.name(), "reference");
        assert_eq!(table.version(), "1.2.0");
        assert_eq!(table.len(), 2);

        let codes: Vec<String> = table
            .positions()
            .unwrap()
            .map(|p| p.code().to_string())
            .collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[test]
    fn rebuilds_positions_from_code() {
        let table = TableImplementation::from_json(Path::new("sample.json"), SAMPLE).unwrap();
        let position = table.position_from_code("A").unwrap();
        assert_eq!(position.representative(), Some("東"));
        assert_eq!(position.description(), "端一東平");
        assert_eq!(position.attribute("tone"), Some("平"));
        assert_eq!(position.attribute("final"), None);

        let missing = table.position_from_code("Z").unwrap_err();
        assert_eq!(
            missing,
            DeriveError::UnknownCode {
                implementation: "reference".into(),
                code: "Z".into(),
            }
        );
    }

    #[test]
    fn representative_may_be_absent() {
        let table = TableImplementation::from_json(Path::new("sample.json"), SAMPLE).unwrap();
        let position = table.position_from_code("B").unwrap();
        assert_eq!(position.representative(), None);
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let raw = r#"{"name": "x", "positions": [
            {"code": "A", "description": "a"},
            {"code": "A", "description": "b"}
        ]}"#;
        let err = TableImplementation::from_json(Path::new("dup.json"), raw).unwrap_err();
        assert!(matches!(err, TableError::DuplicateCode { ref code, .. } if code == "A"));
    }

    #[test]
    fn open_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let table = TableImplementation::open(file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let err = TableImplementation::open(Path::new("/nonexistent/derive-parity.json"))
            .unwrap_err();
        assert!(matches!(err, TableError::Read { .. }));
    }
}
