use crate::error::Result;
use crate::model::{RelationshipKind, Resolver, Resource, ResourceKind};
use crate::rules::{Baseline, Check, Predicate, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "CloudFront.3",
            ResourceKind::Distribution,
            Severity::Low,
            Check::one_of("viewerProtocolPolicy", &["redirect-to-https", "https-only"]),
        )
        .title("CloudFront distributions should require encryption in transit")
        .remediation(
            "Set `viewerProtocolPolicy` to `REDIRECT_TO_HTTPS` or `HTTPS_ONLY` on every behavior.",
        )
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "CloudFront.4",
            ResourceKind::Distribution,
            Severity::Low,
            Predicate::Code(origin_failover),
        )
        .title("CloudFront distributions should have origin failover configured")
        .remediation(
            "Add a `failoverS3OriginSource` (or custom failover origin) and \
             `failoverCriteriaStatusCodes` to the origin config.",
        )
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "CloudFront.5",
            ResourceKind::Distribution,
            Severity::Medium,
            Check::AnyOf {
                checks: vec![
                    Check::is_true("enableLogging"),
                    Check::related(
                        RelationshipKind::LoggingDestination,
                        Some(ResourceKind::Bucket),
                    ),
                ],
            },
        )
        .title("CloudFront distributions should have logging enabled")
        .remediation("Set `enableLogging: true` or point `loggingConfig` at a log bucket.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "CloudFront.6",
            ResourceKind::Distribution,
            Severity::Medium,
            Check::related(RelationshipKind::WebAclAssociation, Some(ResourceKind::WebAcl)),
        )
        .title("CloudFront distributions should have WAF enabled")
        .remediation("Set `webACLId` to the ARN of a CLOUDFRONT-scoped web ACL.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "CloudFront.7",
            ResourceKind::Distribution,
            Severity::Medium,
            Check::non_empty("certificate"),
        )
        .title("CloudFront distributions should use custom SSL/TLS certificates")
        .remediation("Attach an ACM certificate through `viewerCertificate`.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "CloudFront.13",
            ResourceKind::Distribution,
            Severity::Medium,
            Check::is_true("originAccessControl"),
        )
        .title("CloudFront distributions should use origin access control")
        .remediation(
            "Use an S3 origin with origin access control instead of a public bucket or OAI.",
        )
        .baselines(&[Fsbp, Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Needs both a failover origin and at least one status code that triggers it.
fn origin_failover(resource: &Resource, resolver: &Resolver<'_>) -> Result<bool> {
    let has_origin = resolver.has_target(resource.id(), RelationshipKind::FailoverOrigin, None);
    let has_criteria = resource
        .opt_list("failoverCriteriaStatusCodes")?
        .is_some_and(|codes| !codes.is_empty());
    Ok(has_origin && has_criteria)
}
