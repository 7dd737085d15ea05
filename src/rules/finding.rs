use serde::{Deserialize, Serialize};

use super::{Baseline, Rule};
use crate::error::AuditError;
use crate::model::{Resource, ResourceKind};

/// The result of evaluating one rule against one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Resource the rule was evaluated against.
    pub resource_id: String,
    pub resource_kind: ResourceKind,
    /// Rule identifier within its baseline (e.g., "S3.5").
    pub rule_id: String,
    /// Human-readable rule title.
    pub rule_title: String,
    pub baseline: Baseline,
    pub severity: Severity,
    pub status: FindingStatus,
    /// Suggested remediation.
    pub remediation: String,
    /// Why the rule could not be evaluated (indeterminate findings only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Finding {
    /// Build a finding from a predicate outcome. Errors never collapse into
    /// Pass or Fail; they become `Indeterminate` and keep their message.
    pub fn from_outcome(
        rule: &Rule,
        resource: &Resource,
        outcome: Result<bool, AuditError>,
    ) -> Self {
        let (status, error) = match outcome {
            Ok(true) => (FindingStatus::Pass, None),
            Ok(false) => (FindingStatus::Fail, None),
            Err(cause) => {
                let err = AuditError::RulePredicate {
                    baseline: rule.baseline.clone(),
                    rule_id: rule.id.clone(),
                    resource_id: resource.id().to_string(),
                    cause: Box::new(cause),
                };
                (FindingStatus::Indeterminate, Some(err.to_string()))
            }
        };

        Self {
            resource_id: resource.id().to_string(),
            resource_kind: resource.kind(),
            rule_id: rule.id.clone(),
            rule_title: rule.title.clone(),
            baseline: rule.baseline.clone(),
            severity: rule.severity,
            status,
            remediation: rule.remediation.clone(),
            error,
        }
    }

    /// `baseline/RULE` identifier.
    pub fn qualified_rule_id(&self) -> String {
        self.baseline.qualify(&self.rule_id)
    }

    pub fn is_fail(&self) -> bool {
        self.status == FindingStatus::Fail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Pass,
    Fail,
    /// The predicate raised an error; neither pass nor fail.
    Indeterminate,
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Metadata about a catalog rule, used for `list-rules` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub id: String,
    pub baseline: Baseline,
    /// `None` when the rule applies to every resource kind.
    pub kind: Option<ResourceKind>,
    pub severity: Severity,
    pub title: String,
    pub remediation: String,
    /// Whether the predicate is a declarative check rather than code.
    pub declarative: bool,
}
