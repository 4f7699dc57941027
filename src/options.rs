//! Option declarations and default resolution.
//!
//! A routine describes its tunable knobs when asked in introspection mode. Each knob
//! is either a boolean flag or an indexed choice declared as
//! `[selected, choice1, choice2, ...]`, whose default is the array element at index
//! `selected`, the selector itself being slot 0. [`resolve_default_options`] turns those declarations into the
//! [`OptionMapping`] both implementations are run with.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{panic_message, OptionError};
use crate::routine::DerivationRoutine;

/// A resolved option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Flag(bool),
    /// Integer choice.
    Integer(i64),
    /// Text choice.
    Text(String),
    /// Any other declared element (floats, lists, objects, null).
    Json(Value),
}

impl OptionValue {
    /// Convert a declared JSON element.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(flag) => Self::Flag(*flag),
            Value::Number(number) => number
                .as_i64()
                .map_or_else(|| Self::Json(value.clone()), Self::Integer),
            Value::String(text) => Self::Text(text.clone()),
            other => Self::Json(other.clone()),
        }
    }

    /// The flag, if this is one.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// The text, if this is a text choice.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

/// A knob declared by a routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionDescriptor {
    /// Boolean flag with its default.
    Flag(bool),
    /// Indexed choice: the declared array as written. Slot 0 is the selector and
    /// indexes the array itself, so `[0, ..]` selects the selector.
    Choice(Vec<Value>),
}

impl OptionDescriptor {
    /// Choice whose selector is `selected` over `choices`, the first choice being
    /// slot 1.
    #[must_use]
    pub fn choice<I, V>(selected: usize, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let entries = std::iter::once(Value::from(selected))
            .chain(choices.into_iter().map(Into::into))
            .collect();
        Self::Choice(entries)
    }

    /// Classify a raw declaration.
    ///
    /// Booleans are flags and arrays are choices. Any other shape is
    /// [`OptionError::Unrecognized`].
    pub fn from_declaration(key: &str, value: &Value) -> Result<Self, OptionError> {
        match value {
            Value::Bool(flag) => Ok(Self::Flag(*flag)),
            Value::Array(entries) => Ok(Self::Choice(entries.clone())),
            _ => Err(OptionError::Unrecognized {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// The declared default: the flag itself, or `entries[entries[0]]`.
    ///
    /// `None` when the selector is not a valid index into the array (an empty array,
    /// a non-integer selector, or one past the end).
    #[must_use]
    pub fn default_value(&self) -> Option<OptionValue> {
        match self {
            Self::Flag(flag) => Some(OptionValue::Flag(*flag)),
            Self::Choice(entries) => entries
                .first()
                .and_then(Value::as_u64)
                .and_then(|index| usize::try_from(index).ok())
                .and_then(|index| entries.get(index))
                .map(OptionValue::from_json),
        }
    }
}

impl fmt::Display for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Choice(entries) => write!(f, "{}", Value::Array(entries.clone())),
        }
    }
}

/// Ordered `(key, value)` configuration handed to every derivation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionMapping {
    entries: Vec<(String, OptionValue)>,
}

impl OptionMapping {
    /// An empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Drop `key` if present.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Whether `key` is a flag set to `true`. Absent keys read as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(OptionValue::as_flag).unwrap_or(false)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve defaults, reporting why resolution failed.
///
/// A choice whose selector does not index its array leaves its key out of the
/// mapping, replacing any earlier declaration of the same key.
pub fn try_resolve_default_options(
    routine: &dyn DerivationRoutine,
) -> Result<OptionMapping, OptionError> {
    let mut mapping = OptionMapping::new();
    for (key, descriptor) in routine.describe_options()? {
        match descriptor.default_value() {
            Some(value) => mapping.insert(key, value),
            None => {
                tracing::debug!(%key, %descriptor, "choice selector out of range, option left unset");
                mapping.remove(&key);
            }
        }
    }
    Ok(mapping)
}

/// Resolve the default configuration of a routine.
///
/// Never fails: an introspection error, malformed introspection output, an
/// unrecognized declaration or a panic inside the routine all yield an empty mapping.
pub fn resolve_default_options(routine: &dyn DerivationRoutine) -> OptionMapping {
    match panic::catch_unwind(AssertUnwindSafe(|| try_resolve_default_options(routine))) {
        Ok(Ok(mapping)) => mapping,
        Ok(Err(error)) => {
            tracing::warn!(%error, "option resolution failed, using empty options");
            OptionMapping::new()
        }
        Err(payload) => {
            tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                "option introspection panicked, using empty options"
            );
            OptionMapping::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeriveError;
    use crate::test_utils::{init_test_logging, FnRoutine};
    use proptest::prelude::*;
    use serde_json::json;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn declared(value: &Value) -> Option<OptionValue> {
        OptionDescriptor::from_declaration("k", value)
            .unwrap()
            .default_value()
    }

    #[test]
    fn flags_keep_their_default() {
        init_test("flags_keep_their_default");
        let descriptor = OptionDescriptor::from_declaration("tone", &json!(true)).unwrap();
        assert_eq!(descriptor, OptionDescriptor::Flag(true));
        assert_eq!(descriptor.default_value(), Some(OptionValue::Flag(true)));
        crate::test_complete!("flags_keep_their_default");
    }

    #[test]
    fn choice_selects_by_its_own_first_element() {
        init_test("choice_selects_by_its_own_first_element");
        let value = declared(&json!([2, "latin", "ipa", "kana"]));
        crate::assert_with_log!(
            value == Some(OptionValue::Text("ipa".into())),
            "value[value[0]]",
            "ipa",
            value
        );
        assert_eq!(
            OptionDescriptor::choice(2, ["latin", "ipa", "kana"]),
            OptionDescriptor::from_declaration("k", &json!([2, "latin", "ipa", "kana"])).unwrap()
        );
        crate::test_complete!("choice_selects_by_its_own_first_element");
    }

    #[test]
    fn selector_zero_selects_itself() {
        init_test("selector_zero_selects_itself");
        assert_eq!(declared(&json!([0, "a"])), Some(OptionValue::Integer(0)));
        crate::test_complete!("selector_zero_selects_itself");
    }

    #[test]
    fn any_element_can_be_selected() {
        init_test("any_element_can_be_selected");
        assert_eq!(declared(&json!([1, 1.5])), Some(OptionValue::Json(json!(1.5))));
        assert_eq!(declared(&json!([1, [2, 3]])), Some(OptionValue::Json(json!([2, 3]))));
        assert_eq!(declared(&json!([2, "x", {"a": 1}])), Some(OptionValue::Json(json!({"a": 1}))));
        assert_eq!(declared(&json!([1, null])), Some(OptionValue::Json(Value::Null)));
        assert_eq!(declared(&json!([1, false])), Some(OptionValue::Flag(false)));
        crate::test_complete!("any_element_can_be_selected");
    }

    #[test]
    fn unusable_selector_leaves_the_value_unset() {
        init_test("unusable_selector_leaves_the_value_unset");
        for declaration in [json!([3, "a", "b"]), json!([]), json!(["x", "y"]), json!([-1, "a"]), json!([0.5, "a"])] {
            assert_eq!(declared(&declaration), None, "{declaration}");
        }
        crate::test_complete!("unusable_selector_leaves_the_value_unset");
    }

    #[test]
    fn other_shapes_are_unrecognized() {
        init_test("other_shapes_are_unrecognized");
        for declaration in [json!("ipa"), json!(3), json!(null), json!({"a": 1})] {
            let err = OptionDescriptor::from_declaration("k", &declaration).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("unrecognized option: k {declaration}")
            );
        }
        crate::test_complete!("other_shapes_are_unrecognized");
    }

    #[test]
    fn resolves_in_declaration_order() {
        init_test("resolves_in_declaration_order");
        let routine = FnRoutine::constant("x").with_options(vec![
            ("tone".into(), OptionDescriptor::Flag(false)),
            ("script".into(), OptionDescriptor::choice(1, ["latin"])),
        ]);
        let mapping = resolve_default_options(&routine);
        let keys: Vec<&str> = mapping.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["tone", "script"]);
        assert!(!mapping.flag("tone"));
        assert_eq!(
            mapping.get("script").and_then(OptionValue::as_text),
            Some("latin")
        );
        crate::test_complete!("resolves_in_declaration_order");
    }

    #[test]
    fn out_of_range_choice_drops_only_its_key() {
        init_test("out_of_range_choice_drops_only_its_key");
        let routine = FnRoutine::constant("x").with_options(vec![
            ("tone".into(), OptionDescriptor::Flag(true)),
            ("script".into(), OptionDescriptor::choice(9, Vec::<Value>::new())),
            ("style".into(), OptionDescriptor::choice(0, ["plain"])),
        ]);
        let mapping = resolve_default_options(&routine);
        assert!(mapping.flag("tone"));
        assert_eq!(mapping.get("script"), None);
        assert_eq!(mapping.get("style"), Some(&OptionValue::Integer(0)));
        assert_eq!(mapping.len(), 2);
        crate::test_complete!("out_of_range_choice_drops_only_its_key");
    }

    #[test]
    fn unrecognized_declaration_empties_the_mapping() {
        init_test("unrecognized_declaration_empties_the_mapping");
        let routine = FnRoutine::constant("x").with_introspection(|| {
            let tone = ("tone".to_string(), OptionDescriptor::Flag(true));
            let script = OptionDescriptor::from_declaration("script", &json!("ipa"))?;
            Ok(vec![tone, ("script".to_string(), script)])
        });
        assert!(resolve_default_options(&routine).is_empty());
        assert!(matches!(
            try_resolve_default_options(&routine),
            Err(OptionError::Unrecognized { ref key, .. }) if key == "script"
        ));
        crate::test_complete!("unrecognized_declaration_empties_the_mapping");
    }

    #[test]
    fn failing_or_panicking_introspection_yields_empty() {
        init_test("failing_or_panicking_introspection_yields_empty");
        let failing = FnRoutine::constant("x")
            .with_introspection(|| Err(DeriveError::custom("no introspection mode").into()));
        assert!(resolve_default_options(&failing).is_empty());

        let panicking = FnRoutine::constant("x").with_introspection(|| panic!("introspection"));
        assert!(resolve_default_options(&panicking).is_empty());
        crate::test_complete!("failing_or_panicking_introspection_yields_empty");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut mapping = OptionMapping::new()
            .with("a", OptionValue::Flag(true))
            .with("b", OptionValue::Integer(2))
            .with("a", OptionValue::Flag(false));
        let entries: Vec<(&str, &OptionValue)> = mapping.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("a", &OptionValue::Flag(false)),
                ("b", &OptionValue::Integer(2))
            ]
        );
        assert_eq!(mapping.remove("a"), Some(OptionValue::Flag(false)));
        assert_eq!(mapping.remove("a"), None);
        assert_eq!(mapping.len(), 1);
    }

    fn arb_descriptor() -> impl Strategy<Value = OptionDescriptor> {
        prop_oneof![
            any::<bool>().prop_map(OptionDescriptor::Flag),
            (0usize..5, proptest::collection::vec("[a-z]{1,4}", 0..4))
                .prop_map(|(selected, choices)| OptionDescriptor::choice(selected, choices)),
        ]
    }

    proptest! {
        #[test]
        fn resolution_is_total_and_idempotent(
            declared in proptest::collection::vec(("[a-z]{1,6}", arb_descriptor()), 0..6)
        ) {
            let routine = FnRoutine::constant("x").with_options(declared.clone());
            let first = resolve_default_options(&routine);
            let second = resolve_default_options(&routine);
            prop_assert_eq!(&first, &second);

            for (key, _) in &declared {
                let last = declared.iter().rev().find(|(k, _)| k == key).map(|(_, d)| d);
                let expected = last.and_then(OptionDescriptor::default_value);
                prop_assert_eq!(first.get(key), expected.as_ref());
            }
            prop_assert!(first.iter().all(|(key, _)| declared.iter().any(|(k, _)| k == key)));
        }
    }
}
