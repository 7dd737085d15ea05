use crate::error::Result;
use crate::model::{
    AttributeType, AttributeValue, RelationshipKind, Resolver, Resource, ResourceKind,
};
use crate::rules::{Baseline, Check, Predicate, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "WAF.10",
            ResourceKind::WebAcl,
            Severity::Medium,
            Check::non_empty("rules"),
        )
        .title("AWS WAF web ACLs should have at least one rule or rule group")
        .remediation(
            "Add a rule or managed rule group, e.g. `AWSManagedRulesAmazonIpReputationList`.",
        )
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "WAF.11",
            ResourceKind::WebAcl,
            Severity::Low,
            Check::related(RelationshipKind::LoggingDestination, None),
        )
        .title("AWS WAF web ACL logging should be enabled")
        .remediation("Add a `CfnLoggingConfiguration` sending logs to CloudWatch Logs or S3.")
        .baselines(&[Nist]),
        RuleTemplate::new(
            "WAF.12",
            ResourceKind::WebAcl,
            Severity::Medium,
            Predicate::Code(metrics_enabled),
        )
        .title("AWS WAF rules should have CloudWatch metrics enabled")
        .remediation(
            "Set `visibilityConfig.cloudWatchMetricsEnabled: true` on the web ACL and every rule.",
        )
        .baselines(&[Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// The web ACL and each rule entry must publish metrics. Entries are maps
/// carrying their own `cloudWatchMetricsEnabled` flag.
fn metrics_enabled(resource: &Resource, _resolver: &Resolver<'_>) -> Result<bool> {
    if !resource.opt_bool("cloudWatchMetricsEnabled")?.unwrap_or(false) {
        return Ok(false);
    }
    let Some(entries) = resource.opt_list("rules")? else {
        return Ok(true);
    };

    for (i, entry) in entries.iter().enumerate() {
        let path = format!("rules[{i}]");
        let fields = entry
            .as_map()
            .ok_or_else(|| resource.type_error(&path, AttributeType::Map, entry.kind()))?;
        match fields.get("cloudWatchMetricsEnabled") {
            Some(AttributeValue::Bool(true)) => {}
            Some(AttributeValue::Bool(false)) | None => return Ok(false),
            Some(other) => {
                return Err(resource.type_error(
                    &format!("{path}.cloudWatchMetricsEnabled"),
                    AttributeType::Bool,
                    other.kind(),
                ))
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{graph, run};
    use crate::error::AuditError;
    use crate::model::{AttributeValue, Relationship, RelationshipKind, Resource, ResourceKind};
    use crate::rules::Baseline;
    use std::collections::BTreeMap;

    fn managed_rule(metrics: AttributeValue) -> AttributeValue {
        let mut group = BTreeMap::new();
        group.insert(
            "name".to_string(),
            AttributeValue::from("AWSManagedRulesAmazonIpReputationList"),
        );
        group.insert("vendorName".to_string(), AttributeValue::from("AWS"));

        let mut rule = BTreeMap::new();
        rule.insert(
            "name".to_string(),
            AttributeValue::from("AWS-AWSManagedRulesAmazonIpReputationList"),
        );
        rule.insert("priority".to_string(), AttributeValue::Int(0));
        rule.insert("managedRuleGroup".to_string(), AttributeValue::Map(group));
        rule.insert("cloudWatchMetricsEnabled".to_string(), metrics);
        AttributeValue::Map(rule)
    }

    #[test]
    fn empty_rules_fail_and_one_managed_group_passes() {
        let g = graph(
            vec![
                Resource::new("empty", ResourceKind::WebAcl)
                    .with("rules", Vec::<AttributeValue>::new()),
                Resource::new("managed", ResourceKind::WebAcl)
                    .with("rules", vec![managed_rule(AttributeValue::Bool(true))]),
            ],
            vec![],
        );
        assert!(!run(Baseline::Fsbp, "WAF.10", &g, "empty").unwrap());
        assert!(run(Baseline::Fsbp, "WAF.10", &g, "managed").unwrap());
    }

    #[test]
    fn metrics_required_on_every_rule() {
        let g = graph(
            vec![
                Resource::new("on", ResourceKind::WebAcl)
                    .with("cloudWatchMetricsEnabled", true)
                    .with("rules", vec![managed_rule(AttributeValue::Bool(true))]),
                Resource::new("rule-off", ResourceKind::WebAcl)
                    .with("cloudWatchMetricsEnabled", true)
                    .with("rules", vec![managed_rule(AttributeValue::Bool(false))]),
                Resource::new("acl-off", ResourceKind::WebAcl)
                    .with("cloudWatchMetricsEnabled", false),
            ],
            vec![],
        );
        assert!(run(Baseline::Nist, "WAF.12", &g, "on").unwrap());
        assert!(!run(Baseline::Nist, "WAF.12", &g, "rule-off").unwrap());
        assert!(!run(Baseline::Nist, "WAF.12", &g, "acl-off").unwrap());
    }

    #[test]
    fn malformed_rule_entry_is_an_error() {
        let g = graph(
            vec![Resource::new("acl", ResourceKind::WebAcl)
                .with("cloudWatchMetricsEnabled", true)
                .with("rules", vec![managed_rule(AttributeValue::from("yes"))])],
            vec![],
        );
        match run(Baseline::Nist, "WAF.12", &g, "acl") {
            Err(AuditError::AttributeType { attribute, .. }) => {
                assert_eq!(attribute, "rules[0].cloudWatchMetricsEnabled")
            }
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn logging_destination_enables_logging() {
        let g = graph(
            vec![
                Resource::new("acl", ResourceKind::WebAcl),
                Resource::new("logs", ResourceKind::LogGroup),
            ],
            vec![Relationship::new("acl", "logs", RelationshipKind::LoggingDestination)],
        );
        assert!(run(Baseline::Nist, "WAF.11", &g, "acl").unwrap());
    }
}
