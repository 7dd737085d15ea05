//! Resource model for compliance evaluation.
//!
//! Input adapters produce a `ResourceGraph`. All rules consume `Resource`s
//! from that graph, plus a `Resolver` for cross-resource context. This
//! decouples how a stack was declared from how it is evaluated.

pub mod attribute;
pub mod graph;
pub mod relationship;
pub mod resolver;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

pub use attribute::{AttributeType, AttributeValue, CapacityRange};
pub use graph::{GraphBuilder, GraphDocument, ResourceGraph};
pub use relationship::{Relationship, RelationshipKind};
pub use resolver::Resolver;

/// Kind of cloud resource. Closed set: every kind carries its own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Function,
    Bucket,
    Topic,
    Queue,
    Table,
    Distribution,
    RestApi,
    WebAcl,
    Key,
    LogGroup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        Self::Function,
        Self::Bucket,
        Self::Topic,
        Self::Queue,
        Self::Table,
        Self::Distribution,
        Self::RestApi,
        Self::WebAcl,
        Self::Key,
        Self::LogGroup,
    ];

    pub fn from_str_lenient(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "function" | "lambda" => Some(Self::Function),
            "bucket" | "s3" => Some(Self::Bucket),
            "topic" | "sns" => Some(Self::Topic),
            "queue" | "sqs" => Some(Self::Queue),
            "table" | "dynamodb" => Some(Self::Table),
            "distribution" | "cloudfront" => Some(Self::Distribution),
            "restapi" | "apigateway" => Some(Self::RestApi),
            "webacl" | "waf" => Some(Self::WebAcl),
            "key" | "kms" => Some(Self::Key),
            "loggroup" | "logs" => Some(Self::LogGroup),
            _ => None,
        }
    }

    /// Known attributes for this kind and the type each must hold.
    pub fn schema(self) -> &'static [(&'static str, AttributeType)] {
        use AttributeType::*;
        match self {
            Self::Function => &[
                ("runtime", Text),
                ("tracing", Text),
                ("reservedConcurrentExecutions", Int),
                ("inVpc", Bool),
                ("memorySize", Int),
            ],
            Self::Bucket => &[
                ("enforceSSL", Bool),
                ("serverAccessLogsPrefix", Text),
                ("lifecycleRules", List),
                ("versioned", Bool),
                ("encryption", Text),
                ("blockPublicAccess", Bool),
            ],
            Self::Topic => &[
                ("masterKey", Text),
                ("loggingConfigs", List),
                ("enforceSSL", Bool),
                ("fifo", Bool),
            ],
            Self::Queue => &[
                ("encryption", Text),
                ("enforceSSL", Bool),
                ("retentionPeriodSeconds", Int),
                ("fifo", Bool),
            ],
            Self::Table => &[
                ("partitionKey", Map),
                ("billingMode", Text),
                ("pointInTimeRecovery", Bool),
                ("deletionProtection", Bool),
                ("readAutoScaling", Map),
                ("writeAutoScaling", Map),
                ("encryption", Text),
            ],
            Self::Distribution => &[
                ("enableLogging", Bool),
                ("certificate", Text),
                ("minimumProtocolVersion", Text),
                ("viewerProtocolPolicy", Text),
                ("originAccessControl", Bool),
                ("failoverCriteriaStatusCodes", List),
                ("defaultRootObject", Text),
            ],
            Self::RestApi => &[
                ("tracingEnabled", Bool),
                ("loggingLevel", Text),
                ("dataTraceEnabled", Bool),
                ("cachingEnabled", Bool),
                ("cacheDataEncrypted", Bool),
                ("stageName", Text),
            ],
            Self::WebAcl => &[
                ("scope", Text),
                ("defaultAction", Text),
                ("rules", List),
                ("cloudWatchMetricsEnabled", Bool),
                ("sampledRequestsEnabled", Bool),
                ("metricName", Text),
            ],
            Self::Key => &[
                ("alias", Text),
                ("managedBy", Text),
                ("enableKeyRotation", Bool),
            ],
            Self::LogGroup => &[("retentionDays", Int)],
        }
    }

    /// Declared type of `attribute` for this kind, if it is part of the schema.
    pub fn attribute_type(self, attribute: &str) -> Option<AttributeType> {
        self.schema()
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, ty)| *ty)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "Function"),
            Self::Bucket => write!(f, "Bucket"),
            Self::Topic => write!(f, "Topic"),
            Self::Queue => write!(f, "Queue"),
            Self::Table => write!(f, "Table"),
            Self::Distribution => write!(f, "Distribution"),
            Self::RestApi => write!(f, "RestApi"),
            Self::WebAcl => write!(f, "WebAcl"),
            Self::Key => write!(f, "Key"),
            Self::LogGroup => write!(f, "LogGroup"),
        }
    }
}

/// A declared cloud resource: an id unique within its graph, a kind, and
/// the attributes that were explicitly set.
///
/// An attribute that was never set is absent from the map. That is a
/// different state from an attribute set to `false` or `""`, and the typed
/// accessors keep the two apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    id: String,
    kind: ResourceKind,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.opt_bool(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>> {
        self.typed(name, AttributeType::Bool, AttributeValue::as_bool)
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.opt_int(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_int(&self, name: &str) -> Result<Option<i64>> {
        self.typed(name, AttributeType::Int, AttributeValue::as_int)
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        self.opt_text(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<&str>> {
        self.typed(name, AttributeType::Text, AttributeValue::as_text)
    }

    pub fn list(&self, name: &str) -> Result<&[AttributeValue]> {
        self.opt_list(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_list(&self, name: &str) -> Result<Option<&[AttributeValue]>> {
        self.typed(name, AttributeType::List, AttributeValue::as_list)
    }

    pub fn map(&self, name: &str) -> Result<&BTreeMap<String, AttributeValue>> {
        self.opt_map(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_map(&self, name: &str) -> Result<Option<&BTreeMap<String, AttributeValue>>> {
        self.typed(name, AttributeType::Map, AttributeValue::as_map)
    }

    pub fn range(&self, name: &str) -> Result<CapacityRange> {
        self.opt_range(name)?.ok_or_else(|| self.missing(name))
    }

    /// Read a `{ min, max }` map attribute. Both bounds must be integers.
    pub fn opt_range(&self, name: &str) -> Result<Option<CapacityRange>> {
        let Some(entries) = self.opt_map(name)? else {
            return Ok(None);
        };
        let bound = |key: &str| -> Result<i64> {
            let path = format!("{name}.{key}");
            match entries.get(key) {
                Some(AttributeValue::Int(n)) => Ok(*n),
                Some(other) => Err(self.type_error(&path, AttributeType::Int, other.kind())),
                None => Err(self.missing(&path)),
            }
        };
        Ok(Some(CapacityRange {
            min: bound("min")?,
            max: bound("max")?,
        }))
    }

    /// Build an `AttributeMissing` error for `attribute` on this resource.
    pub fn missing(&self, attribute: &str) -> AuditError {
        AuditError::AttributeMissing {
            resource: self.id.clone(),
            attribute: attribute.to_string(),
        }
    }

    /// Build an `AttributeType` error for `attribute` on this resource.
    pub fn type_error(
        &self,
        attribute: &str,
        expected: AttributeType,
        found: AttributeType,
    ) -> AuditError {
        AuditError::AttributeType {
            resource: self.id.clone(),
            attribute: attribute.to_string(),
            expected,
            found,
        }
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: AttributeType,
        extract: impl FnOnce(&'a AttributeValue) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(value) => extract(value)
                .map(Some)
                .ok_or_else(|| self.type_error(name, expected, value.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_false_are_distinct() {
        let unset = Resource::new("a", ResourceKind::Bucket);
        let off = Resource::new("b", ResourceKind::Bucket).with("enforceSSL", false);

        assert_eq!(unset.opt_bool("enforceSSL").unwrap(), None);
        assert_eq!(off.opt_bool("enforceSSL").unwrap(), Some(false));
        assert!(matches!(
            unset.bool("enforceSSL"),
            Err(AuditError::AttributeMissing { .. })
        ));
        assert!(!off.bool("enforceSSL").unwrap());
    }

    #[test]
    fn empty_prefix_is_set() {
        let bucket = Resource::new("b", ResourceKind::Bucket).with("serverAccessLogsPrefix", "");
        assert!(bucket.is_set("serverAccessLogsPrefix"));
        assert_eq!(bucket.text("serverAccessLogsPrefix").unwrap(), "");
    }

    #[test]
    fn wrong_type_is_reported() {
        let bucket = Resource::new("b", ResourceKind::Bucket).with("enforceSSL", "yes");
        match bucket.bool("enforceSSL") {
            Err(AuditError::AttributeType {
                expected, found, ..
            }) => {
                assert_eq!(expected, AttributeType::Bool);
                assert_eq!(found, AttributeType::Text);
            }
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn range_requires_both_bounds() {
        let mut bounds = BTreeMap::new();
        bounds.insert("min".to_string(), AttributeValue::Int(1));
        let table = Resource::new("t", ResourceKind::Table).with("readAutoScaling", bounds.clone());
        match table.opt_range("readAutoScaling") {
            Err(AuditError::AttributeMissing { attribute, .. }) => {
                assert_eq!(attribute, "readAutoScaling.max")
            }
            other => panic!("expected missing max bound, got {other:?}"),
        }

        bounds.insert("max".to_string(), AttributeValue::Int(2));
        let table = Resource::new("t", ResourceKind::Table).with("readAutoScaling", bounds);
        assert_eq!(
            table.opt_range("readAutoScaling").unwrap(),
            Some(CapacityRange { min: 1, max: 2 })
        );
        assert!(matches!(
            table.range("writeAutoScaling"),
            Err(AuditError::AttributeMissing { attribute, .. }) if attribute == "writeAutoScaling"
        ));
    }

    #[test]
    fn lenient_kind_names() {
        assert_eq!(ResourceKind::from_str_lenient("rest_api"), Some(ResourceKind::RestApi));
        assert_eq!(ResourceKind::from_str_lenient("S3"), Some(ResourceKind::Bucket));
        assert_eq!(ResourceKind::from_str_lenient("WebACL"), Some(ResourceKind::WebAcl));
        assert_eq!(ResourceKind::from_str_lenient("vpc"), None);
    }
}
