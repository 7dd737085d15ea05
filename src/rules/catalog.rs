use std::cmp::Ordering;
use std::collections::BTreeSet;

use once_cell::sync::Lazy;

use super::{builtin, Baseline, Rule, RuleMetadata};
use crate::error::{AuditError, Result};
use crate::model::ResourceKind;

static BUILTIN: Lazy<RuleCatalog> = Lazy::new(|| {
    RuleCatalog::from_rules(builtin::all_rules()).expect("built-in rule table is consistent")
});

/// Registry of compliance rules.
///
/// Rules are kept sorted by `(baseline, severity descending, id)`, so every
/// query returns them in report order. Build a catalog, then share it by
/// reference: evaluation only ever needs `&RuleCatalog`.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide built-in catalog, initialized on first use.
    pub fn builtin() -> &'static RuleCatalog {
        &BUILTIN
    }

    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self> {
        let mut catalog = Self::new();
        for rule in rules {
            catalog.register(rule)?;
        }
        Ok(catalog)
    }

    /// Add a rule. `(baseline, id)` must be unique and declarative predicates
    /// must fit the schema of the kind they target.
    pub fn register(&mut self, rule: Rule) -> Result<()> {
        if self.get(&rule.baseline, &rule.id).is_some() {
            return Err(AuditError::DuplicateRule {
                baseline: rule.baseline,
                rule_id: rule.id,
            });
        }
        rule.validate()?;

        let position = self
            .rules
            .partition_point(|existing| report_order(existing, &rule) == Ordering::Less);
        self.rules.insert(position, rule);
        Ok(())
    }

    pub fn get(&self, baseline: &Baseline, id: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| &r.baseline == baseline && r.id == id)
    }

    /// Rules that run on `kind` within the active baselines, in report order.
    pub fn rules_for(&self, kind: ResourceKind, baselines: &BTreeSet<Baseline>) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.applies_to.matches(kind) && baselines.contains(&r.baseline))
            .collect()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every baseline with at least one registered rule.
    pub fn baselines(&self) -> BTreeSet<Baseline> {
        self.rules.iter().map(|r| r.baseline.clone()).collect()
    }

    pub fn list_rules(&self) -> Vec<RuleMetadata> {
        self.rules.iter().map(Rule::metadata).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn report_order(a: &Rule, b: &Rule) -> Ordering {
    a.baseline
        .cmp(&b.baseline)
        .then_with(|| b.severity.cmp(&a.severity))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;
    use crate::rules::{Applicability, Check, RuleTemplate, Severity};

    fn rule(id: &str, baseline: Baseline, severity: Severity, applies_to: Applicability) -> Rule {
        Rule {
            applies_to,
            ..RuleTemplate::new(id, ResourceKind::Bucket, severity, Check::present("versioned"))
                .baseline(baseline)
        }
    }

    #[test]
    fn duplicate_rule_rejected() {
        let mut catalog = RuleCatalog::new();
        catalog
            .register(rule("S3.5", Baseline::Fsbp, Severity::Medium, ResourceKind::Bucket.into()))
            .unwrap();
        // Same id in another baseline is fine.
        catalog
            .register(rule("S3.5", Baseline::Nist, Severity::Medium, ResourceKind::Bucket.into()))
            .unwrap();
        let err = catalog
            .register(rule("S3.5", Baseline::Fsbp, Severity::Low, ResourceKind::Bucket.into()))
            .unwrap_err();
        assert!(matches!(err, AuditError::DuplicateRule { .. }));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn rules_for_orders_by_baseline_severity_id() {
        let catalog = RuleCatalog::from_rules(vec![
            rule("B", Baseline::Nist, Severity::Low, ResourceKind::Bucket.into()),
            rule("C", Baseline::Fsbp, Severity::Low, ResourceKind::Bucket.into()),
            rule("A", Baseline::Nist, Severity::High, ResourceKind::Bucket.into()),
            rule("Z", Baseline::Nist, Severity::Low, Applicability::Any),
            rule("Q", Baseline::Cis, Severity::Medium, ResourceKind::Bucket.into()),
        ])
        .unwrap();

        let active: BTreeSet<Baseline> = [Baseline::Fsbp, Baseline::Nist].into_iter().collect();
        let ids: Vec<String> = catalog
            .rules_for(ResourceKind::Bucket, &active)
            .iter()
            .map(|r| r.baseline.qualify(&r.id))
            .collect();
        assert_eq!(ids, vec!["fsbp/C", "nist/A", "nist/B", "nist/Z"]);
    }

    #[test]
    fn any_kind_rules_apply_everywhere() {
        let catalog = RuleCatalog::from_rules(vec![rule(
            "TAG",
            Baseline::Custom("acme".into()),
            Severity::Low,
            Applicability::Any,
        )])
        .unwrap();
        let active: BTreeSet<Baseline> = catalog.baselines();
        assert_eq!(catalog.rules_for(ResourceKind::Queue, &active).len(), 1);
        assert_eq!(catalog.rules_for(ResourceKind::Key, &active).len(), 1);
    }

    #[test]
    fn builtin_catalog_initializes() {
        let catalog = RuleCatalog::builtin();
        assert!(!catalog.is_empty());
        assert_eq!(
            catalog.baselines(),
            Baseline::BUILTIN.iter().cloned().collect::<BTreeSet<_>>()
        );
    }
}
