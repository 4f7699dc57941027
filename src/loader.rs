//! Resolving schema names to routines.
//!
//! A [`SchemaLoader`] turns a schema name plus one implementation handle into a
//! freshly built routine. Loading the same name against the reference and the
//! candidate always yields two independent routines.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoadError;
use crate::position::Implementation;
use crate::routine::DerivationRoutine;
use crate::script::ScriptRoutine;

/// Source of derivation routines keyed by schema name.
pub trait SchemaLoader: Send + Sync {
    /// Build the routine for `name`, bound to `implementation`.
    fn load(
        &self,
        name: &str,
        implementation: Arc<dyn Implementation>,
    ) -> Result<Box<dyn DerivationRoutine>, LoadError>;
}

/// Loads script schemas from `<root>/<name>.json`.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    root: PathBuf,
}

impl ScriptLoader {
    /// File extension of schema sources.
    pub const EXTENSION: &'static str = "json";

    /// Loader reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the loader reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lookup path for `name`, or `None` if the name could escape the root.
    #[must_use]
    pub fn source_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        plain.then(|| self.root.join(format!("{name}.{}", Self::EXTENSION)))
    }
}

impl SchemaLoader for ScriptLoader {
    fn load(
        &self,
        name: &str,
        implementation: Arc<dyn Implementation>,
    ) -> Result<Box<dyn DerivationRoutine>, LoadError> {
        let path = self.source_path(name).ok_or_else(|| LoadError::UnknownSchema {
            name: name.to_string(),
        })?;
        let source = fs::read_to_string(&path).map_err(|source| LoadError::Read {
            name: name.to_string(),
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            schema = %name,
            implementation = %implementation.name(),
            path = %path.display(),
            "compiling schema"
        );
        let routine = ScriptRoutine::compile(name, &source, implementation)?;
        Ok(Box::new(routine))
    }
}

/// Builds a routine bound to one implementation.
pub type RoutineFactory =
    Arc<dyn Fn(Arc<dyn Implementation>) -> Box<dyn DerivationRoutine> + Send + Sync>;

/// Loader over explicitly registered routine factories.
#[derive(Clone, Default)]
pub struct StaticLoader {
    factories: BTreeMap<String, RoutineFactory>,
}

impl StaticLoader {
    /// An empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any earlier registration.
    #[must_use]
    pub fn with<F, R>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Arc<dyn Implementation>) -> R + Send + Sync + 'static,
        R: DerivationRoutine + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(
                move |implementation: Arc<dyn Implementation>| -> Box<dyn DerivationRoutine> {
                    Box::new(factory(implementation))
                },
            ),
        );
        self
    }

    /// Registered schema names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLoader")
            .field("schemas", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaLoader for StaticLoader {
    fn load(
        &self,
        name: &str,
        implementation: Arc<dyn Implementation>,
    ) -> Result<Box<dyn DerivationRoutine>, LoadError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LoadError::UnknownSchema {
                name: name.to_string(),
            })?;
        Ok(factory(implementation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionMapping;
    use crate::test_utils::{init_test_logging, FixtureImplementation, FnRoutine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn implementation(name: &str) -> Arc<dyn Implementation> {
        Arc::new(FixtureImplementation::new(name).with_position("A", Some("東"), "A", &[("initial", name)]))
    }

    #[test]
    fn script_loader_binds_each_implementation() {
        init_test("script_loader_binds_each_implementation");
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("initials.json"),
            r#"{"parts": [{"attribute": "initial"}]}"#,
        )
        .unwrap();
        let loader = ScriptLoader::new(dir.path());

        let reference = implementation("ref");
        let candidate = implementation("cand");
        let ref_routine = loader.load("initials", Arc::clone(&reference)).unwrap();
        let cand_routine = loader.load("initials", Arc::clone(&candidate)).unwrap();

        let ref_pos = reference.position_from_code("A").unwrap();
        let cand_pos = candidate.position_from_code("A").unwrap();
        let options = OptionMapping::new();
        assert_eq!(ref_routine.derive(ref_pos.as_ref(), None, &options).unwrap(), "ref");
        assert_eq!(cand_routine.derive(cand_pos.as_ref(), None, &options).unwrap(), "cand");
        crate::test_complete!("script_loader_binds_each_implementation");
    }

    #[test]
    fn script_loader_missing_source_is_a_read_error() {
        init_test("script_loader_missing_source_is_a_read_error");
        let dir = tempfile::tempdir().unwrap();
        let loader = ScriptLoader::new(dir.path());
        match loader.load("absent", implementation("ref")) {
            Err(LoadError::Read { name, path, .. }) => {
                assert_eq!(name, "absent");
                assert_eq!(path, dir.path().join("absent.json"));
            }
            Err(other) => panic!("expected read error, got {other:?}"),
            Ok(_) => panic!("expected read error, got a routine"),
        }
        crate::test_complete!("script_loader_missing_source_is_a_read_error");
    }

    #[test]
    fn script_loader_rejects_path_like_names() {
        let loader = ScriptLoader::new("schemas");
        for name in ["", "../etc/passwd", "a/b", "a\\b", ".hidden"] {
            assert!(loader.source_path(name).is_none(), "{name}");
            assert!(matches!(
                loader.load(name, implementation("ref")),
                Err(LoadError::UnknownSchema { .. })
            ));
        }
        assert_eq!(
            loader.source_path("unt_j"),
            Some(PathBuf::from("schemas").join("unt_j.json"))
        );
    }

    #[test]
    fn static_loader_builds_fresh_routines() {
        init_test("static_loader_builds_fresh_routines");
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let loader = StaticLoader::new().with("const", move |_implementation| {
            counter.fetch_add(1, Ordering::SeqCst);
            FnRoutine::constant("x")
        });

        assert_eq!(loader.names().collect::<Vec<_>>(), vec!["const"]);
        let _a = loader.load("const", implementation("ref")).unwrap();
        let _b = loader.load("const", implementation("cand")).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);

        assert!(matches!(
            loader.load("other", implementation("ref")),
            Err(LoadError::UnknownSchema { ref name }) if name == "other"
        ));
        crate::test_complete!("static_loader_builds_fresh_routines");
    }
}
