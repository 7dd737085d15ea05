use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A typed attribute value as declared on a resource.
///
/// Values mirror what infrastructure-as-code constructs accept: flags,
/// counts, enum-like strings, and nested lists/maps such as web-firewall
/// rule entries or autoscaling ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

/// The shape of an attribute value, used in schemas and type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Bool,
    Int,
    Text,
    List,
    Map,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Text => write!(f, "text"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeType {
        match self {
            Self::Bool(_) => AttributeType::Bool,
            Self::Int(_) => AttributeType::Int,
            Self::Text(_) => AttributeType::Text,
            Self::List(_) => AttributeType::List,
            Self::Map(_) => AttributeType::Map,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
            Self::List(items) => write!(f, "[{} item(s)]", items.len()),
            Self::Map(entries) => write!(f, "{{{} key(s)}}", entries.len()),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, AttributeValue>> for AttributeValue {
    fn from(value: BTreeMap<String, AttributeValue>) -> Self {
        Self::Map(value)
    }
}

/// An inclusive numeric range read from a `{ min, max }` map attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRange {
    pub min: i64,
    pub max: i64,
}

impl CapacityRange {
    pub fn is_valid(&self) -> bool {
        self.min >= 0 && self.max >= self.min
    }
}
