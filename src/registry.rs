//! Ordered schema registry.
//!
//! Registry files list one schema per line. `//name` keeps a disabled entry visible
//! in the file without running it; lines starting with `#` are comments.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Schemas run when no registry file is given. `taibu` is disabled.
const BUILTIN: &[(&str, bool)] = &[
    ("tshet", true),
    ("baxter", true),
    ("blankego", true),
    ("kyonh", true),
    ("zyepheng", true),
    ("panwuyun", true),
    ("unt", true),
    ("unt_j", true),
    ("msoeg_v8", true),
    ("mid_tang", true),
    ("chiangxhua", true),
    ("fanwan", true),
    ("putonghua", true),
    ("gwongzau", true),
    ("zaonhe", true),
    ("langjin", true),
    ("taibu", false),
    ("ayaka_v8", true),
];

const DISABLED_PREFIX: &str = "//";
const COMMENT_PREFIX: char = '#';

/// One registry line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Schema name.
    pub name: String,
    /// Whether the schema takes part in runs.
    pub enabled: bool,
}

/// Ordered list of schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    entries: Vec<RegistryEntry>,
}

impl SchemaRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in schema list.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|&(name, enabled)| RegistryEntry {
                    name: name.to_string(),
                    enabled,
                })
                .collect(),
        }
    }

    /// Parse registry text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_PREFIX))
            .filter_map(|line| match line.strip_prefix(DISABLED_PREFIX) {
                Some(rest) => {
                    let name = rest.trim();
                    (!name.is_empty()).then(|| RegistryEntry {
                        name: name.to_string(),
                        enabled: false,
                    })
                }
                None => Some(RegistryEntry {
                    name: line.to_string(),
                    enabled: true,
                }),
            })
            .collect();
        Self { entries }
    }

    /// Read and parse a registry file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::parse(&text);
        tracing::debug!(
            path = %path.display(),
            entries = registry.len(),
            enabled = registry.enabled().count(),
            "loaded registry"
        );
        Ok(registry)
    }

    /// Append an enabled entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.entries.push(RegistryEntry {
            name: name.into(),
            enabled: true,
        });
        self
    }

    /// Append a disabled entry.
    #[must_use]
    pub fn with_disabled(mut self, name: impl Into<String>) -> Self {
        self.entries.push(RegistryEntry {
            name: name.into(),
            enabled: false,
        });
        self
    }

    /// All entries, in order.
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Enabled schema names, in order.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.name.as_str())
    }

    /// Number of entries, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Narrow the registry to `names`, keeping registry order.
    ///
    /// An empty filter keeps everything. Naming an unknown or disabled schema is an
    /// error.
    pub fn retain_named(mut self, names: &[String]) -> Result<Self, RegistryError> {
        if names.is_empty() {
            return Ok(self);
        }
        for name in names {
            match self.entries.iter().find(|entry| entry.name == *name) {
                None => return Err(RegistryError::Unknown(name.clone())),
                Some(entry) if !entry.enabled => {
                    return Err(RegistryError::Disabled(name.clone()));
                }
                Some(_) => {}
            }
        }
        self.entries.retain(|entry| names.contains(&entry.name));
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    #[test]
    fn builtin_keeps_order_and_disables_taibu() {
        init_test_logging();
        crate::test_phase!("builtin_keeps_order_and_disables_taibu");
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.len(), 18);
        let enabled: Vec<&str> = registry.enabled().collect();
        assert_eq!(enabled.len(), 17);
        assert_eq!(enabled.first(), Some(&"tshet"));
        assert_eq!(enabled.last(), Some(&"ayaka_v8"));
        assert!(!enabled.contains(&"taibu"));
        crate::test_complete!("builtin_keeps_order_and_disables_taibu");
    }

    #[test]
    fn parse_handles_comments_and_disabled_lines() {
        let registry = SchemaRegistry::parse(
            "# schemas under test\n\ntshet\n  //taibu \nbaxter\n//\n# trailing\n",
        );
        assert_eq!(
            registry.entries(),
            &[
                RegistryEntry { name: "tshet".into(), enabled: true },
                RegistryEntry { name: "taibu".into(), enabled: false },
                RegistryEntry { name: "baxter".into(), enabled: true },
            ]
        );
        assert_eq!(registry.enabled().collect::<Vec<_>>(), vec!["tshet", "baxter"]);
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.txt");
        fs::write(&path, "a\n//b\nc\n").unwrap();
        let registry = SchemaRegistry::load(&path).unwrap();
        assert_eq!(registry.enabled().collect::<Vec<_>>(), vec!["a", "c"]);

        let missing = SchemaRegistry::load(&dir.path().join("absent.txt"));
        assert!(matches!(missing, Err(RegistryError::Read { .. })));
    }

    #[test]
    fn retain_named_filters_in_registry_order() {
        let registry = SchemaRegistry::new()
            .with("a")
            .with_disabled("b")
            .with("c")
            .with("d");

        let narrowed = registry
            .clone()
            .retain_named(&["d".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(narrowed.enabled().collect::<Vec<_>>(), vec!["a", "d"]);

        let all = registry.clone().retain_named(&[]).unwrap();
        assert_eq!(all, registry);

        assert!(matches!(
            registry.clone().retain_named(&["b".to_string()]),
            Err(RegistryError::Disabled(name)) if name == "b"
        ));
        assert!(matches!(
            registry.retain_named(&["zz".to_string()]),
            Err(RegistryError::Unknown(name)) if name == "zz"
        ));
    }
}
