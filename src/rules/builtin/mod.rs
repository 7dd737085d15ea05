mod api_gateway;
mod bucket;
mod distribution;
mod function;
mod key;
mod queue;
mod table;
mod topic;
mod web_acl;

use super::Rule;

/// Returns every built-in rule, one entry per (baseline, control).
///
/// Controls follow the AWS Security Hub standards: CIS AWS Foundations
/// v1.2.0, Foundational Security Best Practices v1.0.0 and NIST SP 800-53
/// Rev. 5. Treat the table as a starting policy rather than ground truth.
pub fn all_rules() -> Vec<Rule> {
    [
        function::rules(),
        bucket::rules(),
        topic::rules(),
        queue::rules(),
        table::rules(),
        distribution::rules(),
        api_gateway::rules(),
        web_acl::rules(),
        key::rules(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::Result;
    use crate::model::{GraphBuilder, Relationship, Resource, ResourceGraph};
    use crate::rules::{Baseline, RuleCatalog};

    pub fn graph(resources: Vec<Resource>, relationships: Vec<Relationship>) -> ResourceGraph {
        let mut builder = GraphBuilder::new("test");
        for resource in resources {
            builder.add_resource(resource).unwrap();
        }
        for rel in relationships {
            builder.relate(rel.source, rel.target, rel.kind);
        }
        builder.build().unwrap()
    }

    /// Run one built-in rule against one resource of `graph`.
    pub fn run(
        baseline: Baseline,
        rule_id: &str,
        graph: &ResourceGraph,
        resource_id: &str,
    ) -> Result<bool> {
        let rule = RuleCatalog::builtin()
            .get(&baseline, rule_id)
            .unwrap_or_else(|| panic!("no built-in rule {}", baseline.qualify(rule_id)));
        let resource = graph.resource(resource_id).unwrap();
        rule.evaluate(resource, &graph.resolver())
    }
}
