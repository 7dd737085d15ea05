use std::collections::BTreeSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{Baseline, Finding, FindingStatus, RuleCatalog};
use crate::model::{Resolver, Resource, ResourceGraph};

/// The rule engine runs every applicable catalog rule against every resource
/// of a graph.
///
/// Neither the graph nor the catalog is mutated, so resources can be
/// evaluated on a worker pool. Output order is the same either way: graph
/// insertion order, then catalog order.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'c> {
    catalog: &'c RuleCatalog,
    parallel: bool,
}

impl<'c> RuleEngine<'c> {
    pub fn new(catalog: &'c RuleCatalog) -> Self {
        Self {
            catalog,
            parallel: false,
        }
    }

    /// Spread resources over the rayon pool. Ignored without the `parallel` feature.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn catalog(&self) -> &'c RuleCatalog {
        self.catalog
    }

    /// Evaluate a graph against the active baselines: one finding per
    /// `(resource, applicable rule)` pair.
    pub fn evaluate(&self, graph: &ResourceGraph, baselines: &BTreeSet<Baseline>) -> Vec<Finding> {
        let resolver = graph.resolver();

        tracing::debug!(
            graph = %graph.name(),
            resources = graph.len(),
            baselines = ?baselines,
            parallel = self.parallel,
            "evaluating resource graph"
        );

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return graph
                    .resources()
                    .par_iter()
                    .flat_map_iter(|resource| {
                        self.evaluate_resource(resource, &resolver, baselines)
                    })
                    .collect();
            }
        }

        graph
            .resources()
            .iter()
            .flat_map(|resource| self.evaluate_resource(resource, &resolver, baselines))
            .collect()
    }

    fn evaluate_resource(
        &self,
        resource: &Resource,
        resolver: &Resolver<'_>,
        baselines: &BTreeSet<Baseline>,
    ) -> Vec<Finding> {
        let rules = self.catalog.rules_for(resource.kind(), baselines);
        tracing::trace!(
            resource = %resource.id(),
            kind = %resource.kind(),
            rules = rules.len(),
            "evaluating resource"
        );

        rules
            .into_iter()
            .map(|rule| {
                let outcome = rule.evaluate(resource, resolver);
                let finding = Finding::from_outcome(rule, resource, outcome);
                if finding.status == FindingStatus::Indeterminate {
                    tracing::warn!(
                        rule = %finding.qualified_rule_id(),
                        resource = %resource.id(),
                        error = finding.error.as_deref().unwrap_or_default(),
                        "rule predicate failed"
                    );
                }
                finding
            })
            .collect()
    }
}

impl Default for RuleEngine<'static> {
    fn default() -> Self {
        Self::new(RuleCatalog::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::model::{GraphBuilder, RelationshipKind, ResourceKind};
    use crate::rules::{Check, Predicate, Rule, RuleTemplate, Severity};
    use proptest::prelude::*;

    fn acme() -> Baseline {
        Baseline::Custom("acme".into())
    }

    fn exploding(_: &Resource, _: &Resolver<'_>) -> Result<bool> {
        Err(crate::error::AuditError::Config("boom".into()))
    }

    fn catalog() -> RuleCatalog {
        let mut rules: Vec<Rule> = vec![
            RuleTemplate::new(
                "SSL",
                ResourceKind::Bucket,
                Severity::Medium,
                Check::is_true("enforceSSL"),
            )
            .baseline(acme()),
            RuleTemplate::new(
                "NOTIFY",
                ResourceKind::Bucket,
                Severity::Medium,
                Check::related(RelationshipKind::EventNotification, None),
            )
            .baseline(acme()),
            RuleTemplate::new(
                "KMS",
                ResourceKind::Topic,
                Severity::Medium,
                Check::present("masterKey"),
            )
            .baseline(acme()),
        ];
        rules.push(
            RuleTemplate::new(
                "ERR",
                ResourceKind::Queue,
                Severity::High,
                Predicate::Code(exploding),
            )
            .baseline(acme()),
        );
        RuleCatalog::from_rules(rules).unwrap()
    }

    fn graph() -> ResourceGraph {
        let mut builder = GraphBuilder::new("engine");
        builder
            .add_resource(Resource::new("bucket", ResourceKind::Bucket).with("enforceSSL", true))
            .unwrap()
            .add_resource(Resource::new("topic", ResourceKind::Topic))
            .unwrap()
            .add_resource(Resource::new("queue", ResourceKind::Queue))
            .unwrap();
        builder.relate("bucket", "topic", RelationshipKind::EventNotification);
        builder.build().unwrap()
    }

    fn active() -> BTreeSet<Baseline> {
        [acme()].into_iter().collect()
    }

    #[test]
    fn one_finding_per_resource_rule_pair() {
        let catalog = catalog();
        let findings = RuleEngine::new(&catalog).evaluate(&graph(), &active());
        let pairs: Vec<(&str, &str, FindingStatus)> = findings
            .iter()
            .map(|f| (f.resource_id.as_str(), f.rule_id.as_str(), f.status))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("bucket", "NOTIFY", FindingStatus::Pass),
                ("bucket", "SSL", FindingStatus::Pass),
                ("topic", "KMS", FindingStatus::Fail),
                ("queue", "ERR", FindingStatus::Indeterminate),
            ]
        );
    }

    #[test]
    fn predicate_error_is_not_a_fail() {
        let catalog = catalog();
        let findings = RuleEngine::new(&catalog).evaluate(&graph(), &active());
        let err = findings.iter().find(|f| f.rule_id == "ERR").unwrap();
        assert_eq!(err.status, FindingStatus::Indeterminate);
        assert!(err.error.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn inactive_baseline_produces_nothing() {
        let catalog = catalog();
        let only_nist: BTreeSet<Baseline> = [Baseline::Nist].into_iter().collect();
        assert!(RuleEngine::new(&catalog).evaluate(&graph(), &only_nist).is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let catalog = catalog();
        let graph = graph();
        let sequential = RuleEngine::new(&catalog).evaluate(&graph, &active());
        let parallel = RuleEngine::new(&catalog).parallel(true).evaluate(&graph, &active());
        assert_eq!(sequential, parallel);
    }

    proptest! {
        #[test]
        fn exactly_once_and_idempotent(
            buckets in prop::collection::vec((any::<Option<bool>>(), any::<bool>()), 0..12)
        ) {
            let mut builder = GraphBuilder::new("prop");
            for (i, (ssl, versioned)) in buckets.iter().enumerate() {
                let mut bucket = Resource::new(format!("bucket-{i}"), ResourceKind::Bucket)
                    .with("versioned", *versioned);
                if let Some(ssl) = ssl {
                    bucket = bucket.with("enforceSSL", *ssl);
                }
                builder.add_resource(bucket).unwrap();
            }
            let graph = builder.build().unwrap();
            let catalog = catalog();
            let engine = RuleEngine::new(&catalog).parallel(true);

            let first = engine.evaluate(&graph, &active());
            let second = engine.evaluate(&graph, &active());
            prop_assert_eq!(&first, &second);

            // Two bucket rules per bucket, each pair exactly once.
            prop_assert_eq!(first.len(), buckets.len() * 2);
            let mut pairs: Vec<(String, String)> = first
                .iter()
                .map(|f| (f.resource_id.clone(), f.rule_id.clone()))
                .collect();
            pairs.sort();
            pairs.dedup();
            prop_assert_eq!(pairs.len(), first.len());
        }
    }
}
