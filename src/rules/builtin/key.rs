use crate::error::Result;
use crate::model::{Resolver, Resource, ResourceKind};
use crate::rules::{Baseline, Predicate, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    let rotation = RuleTemplate::new(
        "2.8",
        ResourceKind::Key,
        Severity::Medium,
        Predicate::Code(rotation_enabled),
    )
    .title("Ensure rotation for customer created CMKs is enabled")
    .remediation("Set `enableKeyRotation: true` on customer managed keys.");

    let mut rules = vec![rotation.baseline(Baseline::Cis)];
    rules.extend(
        RuleTemplate::new(
            "KMS.4",
            ResourceKind::Key,
            Severity::Medium,
            Predicate::Code(rotation_enabled),
        )
        .title("AWS KMS key rotation should be enabled")
        .remediation("Set `enableKeyRotation: true` on customer managed keys.")
        .baselines(&[Baseline::Fsbp, Baseline::Nist]),
    );
    rules
}

/// AWS managed keys rotate on their own; customer keys must opt in.
fn rotation_enabled(resource: &Resource, _resolver: &Resolver<'_>) -> Result<bool> {
    if resource.opt_text("managedBy")? == Some("AWS") {
        return Ok(true);
    }
    Ok(resource.opt_bool("enableKeyRotation")?.unwrap_or(false))
}
