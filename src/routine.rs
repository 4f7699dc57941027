//! The derivation routine contract.

use crate::error::{DeriveError, OptionError};
use crate::options::{OptionDescriptor, OptionMapping};
use crate::position::Position;

/// Options a routine declares in introspection mode, in declaration order.
pub type OptionDeclarations = Vec<(String, OptionDescriptor)>;

/// One schema's derivation logic, bound to exactly one implementation.
///
/// A routine is a pure function of `(position, head item, options)`. Two routines
/// loaded for the same schema against different implementations are separate
/// values and never share state.
pub trait DerivationRoutine {
    /// Introspection mode: the knobs this routine understands and their defaults.
    fn describe_options(&self) -> Result<OptionDeclarations, OptionError>;

    /// Derive the output for one position.
    fn derive(
        &self,
        position: &dyn Position,
        head: Option<&str>,
        options: &OptionMapping,
    ) -> Result<String, DeriveError>;
}
