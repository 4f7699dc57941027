//! The library surface the harness drives.
//!
//! Both the reference and the candidate are seen through [`Implementation`]. The
//! reference supplies the input domain through [`Implementation::positions`]; the
//! candidate only ever receives serialization codes and rebuilds its own positions
//! with [`Implementation::position_from_code`].

use std::fmt;

use crate::error::DeriveError;

/// One point of the enumerable input domain, as one implementation models it.
pub trait Position: Send + fmt::Debug {
    /// Stable serialization code shared by both implementations.
    fn code(&self) -> &str;

    /// Representative head item, when the position has one.
    fn representative(&self) -> Option<&str>;

    /// Human-readable description used in diagnostics.
    fn description(&self) -> String;

    /// Named phonological attribute consumed by schemas.
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// Ordered enumeration of positions.
pub type PositionIter<'a> = Box<dyn Iterator<Item = Box<dyn Position>> + 'a>;

/// A versioned instance of the derivation library.
pub trait Implementation: Send + Sync {
    /// Short label ("reference", "candidate", a package name).
    fn name(&self) -> &str;

    /// Version string of this instance.
    fn version(&self) -> &str;

    /// Every position, in a deterministic order.
    fn positions(&self) -> Result<PositionIter<'_>, DeriveError>;

    /// Rebuild a position from its serialization code.
    fn position_from_code(&self, code: &str) -> Result<Box<dyn Position>, DeriveError>;
}

impl fmt::Debug for dyn Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("name", &self.name())
            .field("version", &self.version())
            .finish()
    }
}
