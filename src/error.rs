use thiserror::Error;

use crate::model::{AttributeType, RelationshipKind, ResourceKind};
use crate::rules::Baseline;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Attribute '{attribute}' is not set on resource '{resource}'")]
    AttributeMissing { resource: String, attribute: String },

    #[error("Attribute '{attribute}' on resource '{resource}' is {found}, expected {expected}")]
    AttributeType {
        resource: String,
        attribute: String,
        expected: AttributeType,
        found: AttributeType,
    },

    #[error("Duplicate rule {rule_id} in baseline {baseline}")]
    DuplicateRule { baseline: Baseline, rule_id: String },

    #[error("Rule definition error ({rule_id}): {message}")]
    RuleDefinition { rule_id: String, message: String },

    #[error("Duplicate resource id '{0}'")]
    DuplicateResource(String),

    #[error("Relationship {kind} from '{from}' to '{to}' references unknown resource '{missing}'")]
    UnresolvedRelationship {
        from: String,
        to: String,
        kind: RelationshipKind,
        missing: String,
    },

    #[error("Relationship {kind} cannot connect {from_kind} '{from}' to {to_kind} '{to}'")]
    InvalidRelationship {
        from: String,
        to: String,
        kind: RelationshipKind,
        from_kind: ResourceKind,
        to_kind: ResourceKind,
    },

    #[error("Rule {baseline}/{rule_id} could not be evaluated on '{resource_id}': {cause}")]
    RulePredicate {
        baseline: Baseline,
        rule_id: String,
        resource_id: String,
        #[source]
        cause: Box<AuditError>,
    },

    #[error("Graph document error in {file}: {message}")]
    Document { file: String, message: String },

    #[error("No resource graph found at: {0}")]
    NoGraph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AuditError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}
