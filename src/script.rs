//! Script schemas: rule tables compiled into routines.
//!
//! A script is a JSON document listing the options the schema understands and the
//! parts its output is assembled from:
//!
//! ```json
//! {
//!   "options": [["tone_marks", true], ["script", [1, "latin", "ipa"]]],
//!   "separator": "",
//!   "parts": [
//!     { "attribute": "initial", "map": { "端": "t" }, "default": "?" },
//!     { "attribute": "final", "choose": { "option": "script", "maps": { "latin": {}, "ipa": {} } } },
//!     { "attribute": "tone", "when": "tone_marks", "map": { "平": "" } },
//!     { "literal": "-" },
//!     { "head": true }
//!   ]
//! }
//! ```
//!
//! Options are kept as raw JSON and checked at introspection time, so malformed
//! declarations degrade to empty options instead of failing the load.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DeriveError, LoadError, OptionError};
use crate::options::{OptionDescriptor, OptionMapping, OptionValue};
use crate::position::{Implementation, Position};
use crate::routine::{DerivationRoutine, OptionDeclarations};

type RuleTable = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptDocument {
    #[serde(default)]
    options: Value,
    #[serde(default)]
    separator: String,
    parts: Vec<PartDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartDocument {
    attribute: Option<String>,
    literal: Option<String>,
    #[serde(default)]
    head: bool,
    when: Option<String>,
    map: Option<RuleTable>,
    default: Option<String>,
    choose: Option<ChooseDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChooseDocument {
    option: String,
    maps: BTreeMap<String, RuleTable>,
}

#[derive(Debug)]
enum Source {
    Attribute(String),
    Literal(String),
    Head,
}

#[derive(Debug)]
enum Translation {
    Verbatim,
    Table {
        rules: RuleTable,
        default: Option<String>,
    },
    Choose {
        option: String,
        maps: BTreeMap<String, RuleTable>,
        default: Option<String>,
    },
}

#[derive(Debug)]
struct Part {
    source: Source,
    when: Option<String>,
    translation: Translation,
}

impl Part {
    fn compile(index: usize, document: PartDocument) -> Result<Self, String> {
        let source = match (document.attribute, document.literal, document.head) {
            (Some(name), None, false) => Source::Attribute(name),
            (None, Some(text), false) => Source::Literal(text),
            (None, None, true) => Source::Head,
            _ => {
                return Err(format!(
                    "part {index} must have exactly one of `attribute`, `literal`, `head`"
                ))
            }
        };

        let translation = match (document.map, document.choose) {
            (None, None) if document.default.is_some() => {
                return Err(format!("part {index} has a `default` but no rules"));
            }
            (None, None) => Translation::Verbatim,
            (Some(rules), None) => Translation::Table {
                rules,
                default: document.default,
            },
            (None, Some(choose)) => Translation::Choose {
                option: choose.option,
                maps: choose.maps,
                default: document.default,
            },
            (Some(_), Some(_)) => {
                return Err(format!("part {index} has both `map` and `choose`"));
            }
        };

        if !matches!(source, Source::Attribute(_)) && !matches!(translation, Translation::Verbatim)
        {
            return Err(format!("part {index} translates a value that is not an attribute"));
        }

        Ok(Self {
            source,
            when: document.when,
            translation,
        })
    }
}

/// A compiled script bound to one implementation.
pub struct ScriptRoutine {
    schema: String,
    implementation: Arc<dyn Implementation>,
    declarations: Value,
    separator: String,
    parts: Vec<Part>,
}

impl std::fmt::Debug for ScriptRoutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRoutine")
            .field("schema", &self.schema)
            .field("implementation", &self.implementation.name())
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl ScriptRoutine {
    /// Compile script source for `schema` against `implementation`.
    pub fn compile(
        schema: &str,
        source: &str,
        implementation: Arc<dyn Implementation>,
    ) -> Result<Self, LoadError> {
        let compile_error = |reason: String| LoadError::Compile {
            name: schema.to_string(),
            reason,
        };

        let document: ScriptDocument =
            serde_json::from_str(source).map_err(|e| compile_error(e.to_string()))?;
        let parts = document
            .parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| Part::compile(index, part))
            .collect::<Result<Vec<_>, _>>()
            .map_err(compile_error)?;

        Ok(Self {
            schema: schema.to_string(),
            implementation,
            declarations: document.options,
            separator: document.separator,
            parts,
        })
    }

    /// Schema this routine was compiled from.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Implementation this routine is bound to.
    #[must_use]
    pub fn implementation(&self) -> &dyn Implementation {
        self.implementation.as_ref()
    }

    fn translate(
        attribute: &str,
        value: &str,
        rules: &RuleTable,
        default: Option<&String>,
    ) -> Result<String, DeriveError> {
        rules
            .get(value)
            .or(default)
            .cloned()
            .ok_or_else(|| DeriveError::Unmapped {
                attribute: attribute.to_string(),
                value: value.to_string(),
            })
    }
}

impl DerivationRoutine for ScriptRoutine {
    fn describe_options(&self) -> Result<OptionDeclarations, OptionError> {
        let pairs = match &self.declarations {
            Value::Null => return Ok(Vec::new()),
            Value::Array(pairs) => pairs,
            other => {
                return Err(OptionError::Malformed {
                    reason: format!("expected a list of pairs, found {other}"),
                })
            }
        };
        pairs
            .iter()
            .map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(key), value]) => {
                    OptionDescriptor::from_declaration(key, value).map(|d| (key.clone(), d))
                }
                _ => Err(OptionError::Malformed {
                    reason: format!("expected a [key, value] pair, found {pair}"),
                }),
            })
            .collect()
    }

    fn derive(
        &self,
        position: &dyn Position,
        head: Option<&str>,
        options: &OptionMapping,
    ) -> Result<String, DeriveError> {
        let mut fragments = Vec::with_capacity(self.parts.len());

        for part in &self.parts {
            if let Some(flag) = &part.when {
                if !options.flag(flag) {
                    continue;
                }
            }

            let (attribute, value) = match &part.source {
                Source::Literal(text) => {
                    fragments.push(text.clone());
                    continue;
                }
                Source::Head => {
                    if let Some(head) = head {
                        fragments.push(head.to_string());
                    }
                    continue;
                }
                Source::Attribute(name) => {
                    let value =
                        position
                            .attribute(name)
                            .ok_or_else(|| DeriveError::MissingAttribute {
                                code: position.code().to_string(),
                                attribute: name.clone(),
                            })?;
                    (name, value)
                }
            };

            let fragment = match &part.translation {
                Translation::Verbatim => value.to_string(),
                Translation::Table { rules, default } => {
                    Self::translate(attribute, value, rules, default.as_ref())?
                }
                Translation::Choose {
                    option,
                    maps,
                    default,
                } => {
                    let rules = options
                        .get(option)
                        .and_then(OptionValue::as_text)
                        .and_then(|selected| maps.get(selected))
                        .ok_or_else(|| DeriveError::Unselected {
                            option: option.clone(),
                        })?;
                    Self::translate(attribute, value, rules, default.as_ref())?
                }
            };
            fragments.push(fragment);
        }

        tracing::trace!(
            schema = %self.schema,
            implementation = %self.implementation.name(),
            code = %position.code(),
            "derived"
        );
        Ok(fragments.join(&self.separator))
    }
}
