//! Declarative rule predicates.
//!
//! Simple attribute presence/equality rules are data, not code: they are
//! written as `Check` values in the built-in tables or in `[[rules]]`
//! entries of the config file.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::model::{
    AttributeType, AttributeValue, RelationshipKind, Resolver, Resource, ResourceKind,
};

/// What a value check concludes when its attribute was never set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMissing {
    /// Non-compliant. Presence-dependent rules fail closed unless they say otherwise.
    #[default]
    Fail,
    /// Compliant, for settings whose platform default is already safe.
    Pass,
    /// Indeterminate: the attribute is required for the rule to make sense.
    Error,
}

impl OnMissing {
    fn resolve(self, resource: &Resource, attribute: &str) -> Result<bool> {
        match self {
            Self::Fail => Ok(false),
            Self::Pass => Ok(true),
            Self::Error => Err(resource.missing(attribute)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Attribute is set, to any value.
    Present { attribute: String },
    /// Boolean attribute is `true`.
    IsTrue {
        attribute: String,
        #[serde(default)]
        on_missing: OnMissing,
    },
    Equals {
        attribute: String,
        value: AttributeValue,
        #[serde(default)]
        on_missing: OnMissing,
    },
    NotEquals {
        attribute: String,
        value: AttributeValue,
        #[serde(default)]
        on_missing: OnMissing,
    },
    OneOf {
        attribute: String,
        values: Vec<AttributeValue>,
        #[serde(default)]
        on_missing: OnMissing,
    },
    /// List, map or text attribute has at least one element/character.
    NonEmpty {
        attribute: String,
        #[serde(default)]
        on_missing: OnMissing,
    },
    /// Integer attribute is `>= min`.
    AtLeast {
        attribute: String,
        min: i64,
        #[serde(default)]
        on_missing: OnMissing,
    },
    /// Text attribute matches a regular expression.
    Matches {
        attribute: String,
        pattern: Pattern,
        #[serde(default)]
        on_missing: OnMissing,
    },
    /// Resource is the source of at least one relationship of this kind.
    Related {
        relationship: RelationshipKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ResourceKind>,
    },
    AllOf { checks: Vec<Check> },
    AnyOf { checks: Vec<Check> },
}

impl Check {
    pub fn present(attribute: &str) -> Self {
        Self::Present {
            attribute: attribute.into(),
        }
    }

    pub fn is_true(attribute: &str) -> Self {
        Self::IsTrue {
            attribute: attribute.into(),
            on_missing: OnMissing::Fail,
        }
    }

    pub fn non_empty(attribute: &str) -> Self {
        Self::NonEmpty {
            attribute: attribute.into(),
            on_missing: OnMissing::Fail,
        }
    }

    pub fn one_of(attribute: &str, values: &[&str]) -> Self {
        Self::OneOf {
            attribute: attribute.into(),
            values: values.iter().map(|v| AttributeValue::from(*v)).collect(),
            on_missing: OnMissing::Fail,
        }
    }

    pub fn related(relationship: RelationshipKind, target: Option<ResourceKind>) -> Self {
        Self::Related {
            relationship,
            target,
        }
    }

    /// Override what the check concludes when its attribute is unset.
    /// No effect on checks without a single attribute.
    pub fn on_missing(mut self, policy: OnMissing) -> Self {
        match &mut self {
            Self::IsTrue { on_missing, .. }
            | Self::Equals { on_missing, .. }
            | Self::NotEquals { on_missing, .. }
            | Self::OneOf { on_missing, .. }
            | Self::NonEmpty { on_missing, .. }
            | Self::AtLeast { on_missing, .. }
            | Self::Matches { on_missing, .. } => *on_missing = policy,
            Self::Present { .. }
            | Self::Related { .. }
            | Self::AllOf { .. }
            | Self::AnyOf { .. } => {}
        }
        self
    }

    /// Evaluate against a resource. `Ok(true)` means compliant.
    pub fn evaluate(&self, resource: &Resource, resolver: &Resolver<'_>) -> Result<bool> {
        match self {
            Self::Present { attribute } => Ok(resource.is_set(attribute)),
            Self::IsTrue {
                attribute,
                on_missing,
            } => match resource.opt_bool(attribute)? {
                Some(value) => Ok(value),
                None => on_missing.resolve(resource, attribute),
            },
            Self::Equals {
                attribute,
                value,
                on_missing,
            } => with_value(resource, attribute, *on_missing, |actual| {
                same_type(resource, attribute, value, actual)?;
                Ok(actual == value)
            }),
            Self::NotEquals {
                attribute,
                value,
                on_missing,
            } => with_value(resource, attribute, *on_missing, |actual| {
                same_type(resource, attribute, value, actual)?;
                Ok(actual != value)
            }),
            Self::OneOf {
                attribute,
                values,
                on_missing,
            } => with_value(resource, attribute, *on_missing, |actual| {
                Ok(values.iter().any(|v| v == actual))
            }),
            Self::NonEmpty {
                attribute,
                on_missing,
            } => with_value(resource, attribute, *on_missing, |actual| match actual {
                AttributeValue::List(items) => Ok(!items.is_empty()),
                AttributeValue::Map(entries) => Ok(!entries.is_empty()),
                AttributeValue::Text(s) => Ok(!s.is_empty()),
                other => Err(resource.type_error(attribute, AttributeType::List, other.kind())),
            }),
            Self::AtLeast {
                attribute,
                min,
                on_missing,
            } => match resource.opt_int(attribute)? {
                Some(value) => Ok(value >= *min),
                None => on_missing.resolve(resource, attribute),
            },
            Self::Matches {
                attribute,
                pattern,
                on_missing,
            } => match resource.opt_text(attribute)? {
                Some(value) => Ok(pattern.0.is_match(value)),
                None => on_missing.resolve(resource, attribute),
            },
            Self::Related {
                relationship,
                target,
            } => Ok(resolver.has_target(resource.id(), *relationship, *target)),
            Self::AllOf { checks } => {
                for check in checks {
                    if !check.evaluate(resource, resolver)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::AnyOf { checks } => {
                for check in checks {
                    if check.evaluate(resource, resolver)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Validate this check against the schema of the kind it will run on.
    /// `None` means the rule applies to every kind and only structural
    /// problems are reported.
    pub fn validate(&self, kind: Option<ResourceKind>) -> std::result::Result<(), String> {
        let expect = |attribute: &str, allowed: &[AttributeType]| {
            let Some(kind) = kind else { return Ok(()) };
            match kind.attribute_type(attribute) {
                None => Err(format!("{kind} has no attribute '{attribute}'")),
                Some(ty) if allowed.is_empty() || allowed.contains(&ty) => Ok(()),
                Some(ty) => Err(format!(
                    "attribute '{attribute}' on {kind} is {ty}, check needs {}",
                    allowed
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(" or ")
                )),
            }
        };

        match self {
            Self::Present { attribute } => expect(attribute, &[]),
            Self::IsTrue { attribute, .. } => expect(attribute, &[AttributeType::Bool]),
            Self::Equals {
                attribute, value, ..
            }
            | Self::NotEquals {
                attribute, value, ..
            } => expect(attribute, &[value.kind()]),
            Self::OneOf {
                attribute, values, ..
            } => {
                let Some(first) = values.first() else {
                    return Err(format!("one_of on '{attribute}' lists no values"));
                };
                if values.iter().any(|v| v.kind() != first.kind()) {
                    return Err(format!("one_of on '{attribute}' mixes value types"));
                }
                expect(attribute, &[first.kind()])
            }
            Self::NonEmpty { attribute, .. } => expect(
                attribute,
                &[AttributeType::List, AttributeType::Map, AttributeType::Text],
            ),
            Self::AtLeast { attribute, .. } => expect(attribute, &[AttributeType::Int]),
            Self::Matches { attribute, .. } => expect(attribute, &[AttributeType::Text]),
            Self::Related {
                relationship,
                target,
            } => {
                if let Some(kind) = kind {
                    if !relationship.sources().contains(&kind) {
                        return Err(format!("{kind} cannot be the source of {relationship}"));
                    }
                }
                match target {
                    Some(t) if !relationship.targets().contains(t) => {
                        Err(format!("{relationship} cannot target {t}"))
                    }
                    _ => Ok(()),
                }
            }
            Self::AllOf { checks } | Self::AnyOf { checks } => {
                if checks.is_empty() {
                    return Err("combinator lists no checks".into());
                }
                checks.iter().try_for_each(|c| c.validate(kind))
            }
        }
    }

    /// One-line description for listings.
    pub fn describe(&self) -> String {
        match self {
            Self::Present { attribute } => format!("{attribute} is set"),
            Self::IsTrue { attribute, .. } => format!("{attribute} == true"),
            Self::Equals {
                attribute, value, ..
            } => format!("{attribute} == {value}"),
            Self::NotEquals {
                attribute, value, ..
            } => format!("{attribute} != {value}"),
            Self::OneOf {
                attribute, values, ..
            } => format!(
                "{attribute} in [{}]",
                values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::NonEmpty { attribute, .. } => format!("{attribute} is non-empty"),
            Self::AtLeast { attribute, min, .. } => format!("{attribute} >= {min}"),
            Self::Matches {
                attribute, pattern, ..
            } => format!("{attribute} ~ /{}/", pattern.0.as_str()),
            Self::Related {
                relationship,
                target,
            } => match target {
                Some(t) => format!("has {relationship} to a {t}"),
                None => format!("has {relationship}"),
            },
            Self::AllOf { checks } => join_described(checks, " and "),
            Self::AnyOf { checks } => join_described(checks, " or "),
        }
    }
}

fn join_described(checks: &[Check], sep: &str) -> String {
    let parts: Vec<String> = checks.iter().map(|c| format!("({})", c.describe())).collect();
    parts.join(sep)
}

fn with_value(
    resource: &Resource,
    attribute: &str,
    on_missing: OnMissing,
    test: impl FnOnce(&AttributeValue) -> Result<bool>,
) -> Result<bool> {
    match resource.attribute(attribute) {
        Some(value) => test(value),
        None => on_missing.resolve(resource, attribute),
    }
}

fn same_type(
    resource: &Resource,
    attribute: &str,
    expected: &AttributeValue,
    actual: &AttributeValue,
) -> Result<()> {
    if expected.kind() == actual.kind() {
        Ok(())
    } else {
        Err(resource.type_error(attribute, expected.kind(), actual.kind()))
    }
}

/// A compiled regular expression that (de)serializes as its source text.
#[derive(Debug, Clone)]
pub struct Pattern(pub Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self(Regex::new(source)?))
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Pattern)
            .map_err(serde::de::Error::custom)
    }
}
