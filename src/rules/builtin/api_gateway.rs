use crate::error::Result;
use crate::model::{RelationshipKind, Resolver, Resource, ResourceKind};
use crate::rules::{Baseline, Check, Predicate, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "APIGateway.1",
            ResourceKind::RestApi,
            Severity::Medium,
            Check::one_of("loggingLevel", &["ERROR", "INFO"]),
        )
        .title("API Gateway REST and WebSocket API execution logging should be enabled")
        .remediation("Set `deployOptions.loggingLevel` to `MethodLoggingLevel.ERROR` or `INFO`.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "APIGateway.3",
            ResourceKind::RestApi,
            Severity::Low,
            Check::is_true("tracingEnabled"),
        )
        .title("API Gateway REST API stages should have AWS X-Ray tracing enabled")
        .remediation("Set `deployOptions.tracingEnabled: true`.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "APIGateway.4",
            ResourceKind::RestApi,
            Severity::Medium,
            Check::related(RelationshipKind::WebAclAssociation, Some(ResourceKind::WebAcl)),
        )
        .title("API Gateway should be associated with a WAF Web ACL")
        .remediation(
            "Associate the deployment stage with a REGIONAL web ACL (`CfnWebACLAssociation`).",
        )
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "APIGateway.5",
            ResourceKind::RestApi,
            Severity::Medium,
            Predicate::Code(cache_encrypted),
        )
        .title("API Gateway REST API cache data should be encrypted at rest")
        .remediation("Set `deployOptions.cacheDataEncrypted: true` whenever caching is enabled.")
        .baselines(&[Fsbp, Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Only applies when stage caching is on; no cache means nothing to encrypt.
fn cache_encrypted(resource: &Resource, _resolver: &Resolver<'_>) -> Result<bool> {
    if !resource.opt_bool("cachingEnabled")?.unwrap_or(false) {
        return Ok(true);
    }
    Ok(resource.opt_bool("cacheDataEncrypted")?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{graph, run};
    use crate::model::{Relationship, RelationshipKind, Resource, ResourceKind};
    use crate::rules::Baseline;

    #[test]
    fn waf_association_required() {
        let without = graph(vec![Resource::new("api", ResourceKind::RestApi)], vec![]);
        assert!(!run(Baseline::Fsbp, "APIGateway.4", &without, "api").unwrap());

        let with = graph(
            vec![
                Resource::new("api", ResourceKind::RestApi),
                Resource::new("acl", ResourceKind::WebAcl).with("scope", "REGIONAL"),
            ],
            vec![Relationship::new("api", "acl", RelationshipKind::WebAclAssociation)],
        );
        assert!(run(Baseline::Fsbp, "APIGateway.4", &with, "api").unwrap());
    }

    #[test]
    fn error_level_logging_and_tracing() {
        let g = graph(
            vec![Resource::new("api", ResourceKind::RestApi)
                .with("loggingLevel", "ERROR")
                .with("tracingEnabled", true)],
            vec![],
        );
        assert!(run(Baseline::Nist, "APIGateway.1", &g, "api").unwrap());
        assert!(run(Baseline::Nist, "APIGateway.3", &g, "api").unwrap());
    }

    #[test]
    fn logging_off_fails() {
        let g = graph(
            vec![Resource::new("api", ResourceKind::RestApi).with("loggingLevel", "OFF")],
            vec![],
        );
        assert!(!run(Baseline::Nist, "APIGateway.1", &g, "api").unwrap());
    }

    #[test]
    fn cache_encryption_only_when_caching() {
        let no_cache = graph(vec![Resource::new("api", ResourceKind::RestApi)], vec![]);
        assert!(run(Baseline::Fsbp, "APIGateway.5", &no_cache, "api").unwrap());

        let cached = graph(
            vec![Resource::new("api", ResourceKind::RestApi).with("cachingEnabled", true)],
            vec![],
        );
        assert!(!run(Baseline::Fsbp, "APIGateway.5", &cached, "api").unwrap());
    }
}
