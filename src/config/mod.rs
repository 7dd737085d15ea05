use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::rules::policy::Policy;
use crate::rules::{Baseline, Rule, RuleCatalog, RuleSpec};

/// Top-level configuration from `.stackaudit.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Baselines to evaluate. Empty means every baseline in the catalog.
    #[serde(default)]
    pub baselines: Vec<Baseline>,
    /// Evaluate resources on a worker pool (needs the `parallel` feature).
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub policy: Policy,
    /// Organization-specific rules, added to the built-in catalog.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_parallel() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baselines: Vec::new(),
            parallel: default_parallel(),
            policy: Policy::default(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            custom_rules = config.rules.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// The built-in catalog extended with `[[rules]]` entries.
    ///
    /// Custom rules go through the same registration checks as built-in
    /// ones, so a duplicate `(baseline, id)` or a check that does not fit
    /// its kind's schema is rejected here rather than at evaluation time.
    pub fn catalog(&self) -> Result<RuleCatalog> {
        let mut catalog = RuleCatalog::builtin().clone();
        for spec in &self.rules {
            catalog.register(Rule::from(spec.clone()))?;
        }
        Ok(catalog)
    }

    /// Baselines to evaluate against `catalog`.
    pub fn active_baselines(&self, catalog: &RuleCatalog) -> Result<BTreeSet<Baseline>> {
        let known = catalog.baselines();
        if self.baselines.is_empty() {
            return Ok(known);
        }
        let mut active = BTreeSet::new();
        for baseline in &self.baselines {
            if !known.contains(baseline) {
                return Err(AuditError::Config(format!(
                    "baseline '{}' has no rules in the catalog",
                    baseline.key()
                )));
            }
            active.insert(baseline.clone());
        }
        Ok(active)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# stack-audit configuration

# Baselines to evaluate: cis, fsbp, nist, or the name of a custom baseline.
# Leave empty to evaluate every baseline.
baselines = ["cis", "fsbp", "nist"]

# Evaluate resources in parallel.
parallel = true

[policy]
# Minimum severity of a failing rule that fails its baseline (low, medium, high, critical).
fail_on = "medium"

# Rules to ignore entirely, as "RULE" or "baseline/RULE".
# ignore_rules = ["S3.13", "nist/Lambda.3"]

# Per-rule severity overrides, keyed like ignore_rules.
# [policy.overrides]
# "CloudFront.4" = "low"

# Organization rules. Checks: present, is_true, equals, not_equals, one_of,
# non_empty, at_least, matches, related, all_of, any_of.
# [[rules]]
# id = "ORG-1"
# baseline = "acme"
# kind = "bucket"
# severity = "high"
# title = "Buckets must be versioned"
# remediation = "Set `versioned: true`."
# check = { check = "is_true", attribute = "versioned" }
"#
    }
}
