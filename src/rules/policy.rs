use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Finding, FindingStatus, Severity};

/// Pass/fail status of one baseline (or a whole report).
///
/// Ordered from best to worst so the status of a group is the max of its parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStatus {
    #[default]
    Pass,
    /// No qualifying failure, but at least one rule could not be evaluated.
    Indeterminate,
    Fail,
}

impl std::fmt::Display for BaselineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Indeterminate => write!(f, "INDETERMINATE"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Policy configuration loaded from `.stackaudit.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Minimum severity of a failing finding that fails its baseline.
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    /// Rule ids to ignore entirely, as `RULE` or `baseline/RULE`.
    #[serde(default)]
    pub ignore_rules: BTreeSet<String>,
    /// Per-rule severity overrides, keyed like `ignore_rules`.
    #[serde(default)]
    pub overrides: BTreeMap<String, Severity>,
}

fn default_fail_on() -> Severity {
    Severity::Medium
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            ignore_rules: BTreeSet::new(),
            overrides: BTreeMap::new(),
        }
    }
}

impl Policy {
    /// Status of a set of findings from a single baseline.
    pub fn status(&self, findings: &[Finding]) -> BaselineStatus {
        let failed = findings
            .iter()
            .any(|f| f.status == FindingStatus::Fail && f.severity >= self.fail_on);
        if failed {
            return BaselineStatus::Fail;
        }
        if findings
            .iter()
            .any(|f| f.status == FindingStatus::Indeterminate)
        {
            return BaselineStatus::Indeterminate;
        }
        BaselineStatus::Pass
    }

    /// Filter findings: remove ignored rules, apply overrides.
    pub fn apply(&self, findings: &[Finding]) -> Vec<Finding> {
        findings
            .iter()
            .filter(|f| !self.is_ignored(f))
            .map(|f| {
                let mut f = f.clone();
                if let Some(severity) = self.override_for(&f) {
                    f.severity = severity;
                }
                f
            })
            .collect()
    }

    fn is_ignored(&self, finding: &Finding) -> bool {
        self.ignore_rules.contains(&finding.rule_id)
            || self.ignore_rules.contains(&finding.qualified_rule_id())
    }

    // A qualified key wins over a bare rule id.
    fn override_for(&self, finding: &Finding) -> Option<Severity> {
        self.overrides
            .get(&finding.qualified_rule_id())
            .or_else(|| self.overrides.get(&finding.rule_id))
            .copied()
    }
}
