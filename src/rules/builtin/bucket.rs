use crate::error::Result;
use crate::model::{RelationshipKind, Resolver, Resource, ResourceKind};
use crate::rules::{Baseline, Check, OnMissing, Predicate, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "S3.5",
            ResourceKind::Bucket,
            Severity::Medium,
            Check::is_true("enforceSSL"),
        )
        .title("S3 buckets should require requests to use SSL")
        .remediation("Set `enforceSSL: true` so the bucket policy denies requests over plain HTTP.")
        .baselines(&[Fsbp, Nist]),
        // New buckets block public access unless told otherwise.
        RuleTemplate::new(
            "S3.8",
            ResourceKind::Bucket,
            Severity::High,
            Check::is_true("blockPublicAccess").on_missing(OnMissing::Pass),
        )
        .title("S3 Block Public Access setting should be enabled at the bucket level")
        .remediation("Do not disable `blockPublicAccess`; use `BlockPublicAccess.BLOCK_ALL`.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "S3.9",
            ResourceKind::Bucket,
            Severity::Medium,
            Predicate::Code(server_access_logging),
        )
        .title("S3 bucket server access logging should be enabled")
        .remediation("Set `serverAccessLogsPrefix` or `serverAccessLogsBucket` on the bucket.")
        .baselines(&[Nist]),
        RuleTemplate::new(
            "S3.11",
            ResourceKind::Bucket,
            Severity::Medium,
            Check::related(RelationshipKind::EventNotification, None),
        )
        .title("S3 buckets should have event notifications enabled")
        .remediation("Wire an event notification to an SNS topic, SQS queue or Lambda function.")
        .baselines(&[Nist]),
        RuleTemplate::new(
            "S3.13",
            ResourceKind::Bucket,
            Severity::Low,
            Check::non_empty("lifecycleRules"),
        )
        .title("S3 buckets should have lifecycle configurations")
        .remediation("Add at least one entry to `lifecycleRules`.")
        .baselines(&[Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// A prefix counts even when empty: logs then land at the target bucket root.
fn server_access_logging(resource: &Resource, resolver: &Resolver<'_>) -> Result<bool> {
    if resource.opt_text("serverAccessLogsPrefix")?.is_some() {
        return Ok(true);
    }
    Ok(resolver.has_target(
        resource.id(),
        RelationshipKind::LoggingDestination,
        Some(ResourceKind::Bucket),
    ))
}
