pub mod baseline;
pub mod builtin;
pub mod catalog;
pub mod check;
pub mod engine;
pub mod finding;
pub mod policy;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::model::{Resolver, Resource, ResourceKind};

pub use baseline::Baseline;
pub use catalog::RuleCatalog;
pub use check::{Check, OnMissing, Pattern};
pub use engine::RuleEngine;
pub use finding::{Finding, FindingStatus, RuleMetadata, Severity};

/// Code predicate for checks that need more than attribute comparisons.
pub type PredicateFn = fn(&Resource, &Resolver<'_>) -> Result<bool>;

/// How a rule decides compliance.
#[derive(Clone)]
pub enum Predicate {
    Check(Check),
    Code(PredicateFn),
}

impl Predicate {
    pub fn evaluate(&self, resource: &Resource, resolver: &Resolver<'_>) -> Result<bool> {
        match self {
            Self::Check(check) => check.evaluate(resource, resolver),
            Self::Code(f) => f(resource, resolver),
        }
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Check(check) => f.debug_tuple("Check").field(check).finish(),
            Self::Code(_) => f.write_str("Code(..)"),
        }
    }
}

impl From<Check> for Predicate {
    fn from(check: Check) -> Self {
        Self::Check(check)
    }
}

/// Which resource kinds a rule runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Any,
    Kind(ResourceKind),
}

impl Applicability {
    pub fn matches(self, kind: ResourceKind) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(k) => k == kind,
        }
    }

    pub fn kind(self) -> Option<ResourceKind> {
        match self {
            Self::Any => None,
            Self::Kind(k) => Some(k),
        }
    }
}

impl From<ResourceKind> for Applicability {
    fn from(kind: ResourceKind) -> Self {
        Self::Kind(kind)
    }
}

/// A compliance rule, scoped to one baseline and one resource kind (or any).
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub baseline: Baseline,
    pub applies_to: Applicability,
    pub severity: Severity,
    pub title: String,
    pub remediation: String,
    pub predicate: Predicate,
}

impl Rule {
    pub fn evaluate(&self, resource: &Resource, resolver: &Resolver<'_>) -> Result<bool> {
        self.predicate.evaluate(resource, resolver)
    }

    /// Check that a declarative predicate fits the schema of the kind it targets.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AuditError::RuleDefinition {
                rule_id: self.id.clone(),
                message: "rule id is empty".into(),
            });
        }
        match &self.predicate {
            Predicate::Check(check) => {
                check
                    .validate(self.applies_to.kind())
                    .map_err(|message| AuditError::RuleDefinition {
                        rule_id: self.baseline.qualify(&self.id),
                        message,
                    })
            }
            Predicate::Code(_) => Ok(()),
        }
    }

    pub fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: self.id.clone(),
            baseline: self.baseline.clone(),
            kind: self.applies_to.kind(),
            severity: self.severity,
            title: self.title.clone(),
            remediation: self.remediation.clone(),
            declarative: matches!(self.predicate, Predicate::Check(_)),
        }
    }
}

/// Baseline-independent part of a rule. Many controls appear under the same
/// id in more than one baseline; a template stamps out one `Rule` per baseline.
#[derive(Debug, Clone)]
pub struct RuleTemplate {
    id: String,
    applies_to: Applicability,
    severity: Severity,
    title: String,
    remediation: String,
    predicate: Predicate,
}

impl RuleTemplate {
    pub fn new(
        id: &str,
        applies_to: impl Into<Applicability>,
        severity: Severity,
        predicate: impl Into<Predicate>,
    ) -> Self {
        Self {
            id: id.to_string(),
            applies_to: applies_to.into(),
            severity,
            title: String::new(),
            remediation: String::new(),
            predicate: predicate.into(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn remediation(mut self, remediation: &str) -> Self {
        self.remediation = remediation.to_string();
        self
    }

    pub fn baseline(self, baseline: Baseline) -> Rule {
        Rule {
            id: self.id,
            baseline,
            applies_to: self.applies_to,
            severity: self.severity,
            title: self.title,
            remediation: self.remediation,
            predicate: self.predicate,
        }
    }

    pub fn baselines(self, baselines: &[Baseline]) -> Vec<Rule> {
        baselines
            .iter()
            .map(|b| self.clone().baseline(b.clone()))
            .collect()
    }
}

/// Data-only rule definition, as written in `[[rules]]` config entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub baseline: Baseline,
    /// Resource kind the rule runs on; omitted means every kind.
    #[serde(default)]
    pub kind: Option<ResourceKind>,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub remediation: String,
    pub check: Check,
}

impl From<RuleSpec> for Rule {
    fn from(spec: RuleSpec) -> Self {
        Rule {
            id: spec.id,
            baseline: spec.baseline,
            applies_to: spec.kind.map_or(Applicability::Any, Applicability::Kind),
            severity: spec.severity,
            title: spec.title,
            remediation: spec.remediation,
            predicate: Predicate::Check(spec.check),
        }
    }
}
