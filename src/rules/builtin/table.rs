use crate::error::Result;
use crate::model::{Resolver, Resource, ResourceKind};
use crate::rules::{Baseline, Check, Predicate, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "DynamoDB.1",
            ResourceKind::Table,
            Severity::Medium,
            Predicate::Code(scales_with_demand),
        )
        .title("DynamoDB tables should automatically scale capacity with demand")
        .remediation(
            "Use on-demand billing, or configure read and write autoscaling with \
             `autoScaleReadCapacity` / `autoScaleWriteCapacity`.",
        )
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "DynamoDB.2",
            ResourceKind::Table,
            Severity::Medium,
            Check::is_true("pointInTimeRecovery"),
        )
        .title("DynamoDB tables should have point-in-time recovery enabled")
        .remediation("Set `pointInTimeRecovery: true`.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "DynamoDB.6",
            ResourceKind::Table,
            Severity::Medium,
            Check::is_true("deletionProtection"),
        )
        .title("DynamoDB tables should have deletion protection enabled")
        .remediation("Set `deletionProtection: true`.")
        .baselines(&[Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Provisioned tables (the default billing mode) need valid autoscaling
/// ranges for both reads and writes.
fn scales_with_demand(resource: &Resource, _resolver: &Resolver<'_>) -> Result<bool> {
    if resource.opt_text("billingMode")? == Some("PAY_PER_REQUEST") {
        return Ok(true);
    }
    let read = resource.opt_range("readAutoScaling")?;
    let write = resource.opt_range("writeAutoScaling")?;
    Ok(match (read, write) {
        (Some(read), Some(write)) => {
            read.is_valid() && write.is_valid() && read.min >= 1 && write.min >= 1
        }
        _ => false,
    })
}
