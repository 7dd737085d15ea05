use crate::model::ResourceKind;
use crate::rules::{Baseline, Check, Rule, RuleTemplate, Severity};

/// Runtimes Lambda still accepts for create and update.
const SUPPORTED_RUNTIMES: &[&str] = &[
    "nodejs18.x",
    "nodejs20.x",
    "nodejs22.x",
    "python3.9",
    "python3.10",
    "python3.11",
    "python3.12",
    "python3.13",
    "java11",
    "java17",
    "java21",
    "dotnet8",
    "ruby3.3",
    "ruby3.4",
    "provided.al2",
    "provided.al2023",
];

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "Lambda.2",
            ResourceKind::Function,
            Severity::Medium,
            Check::one_of("runtime", SUPPORTED_RUNTIMES),
        )
        .title("Lambda functions should use supported runtimes")
        .remediation("Move the function to a runtime that is not deprecated.")
        .baselines(&[Fsbp, Nist]),
        RuleTemplate::new(
            "Lambda.3",
            ResourceKind::Function,
            Severity::Low,
            Check::is_true("inVpc"),
        )
        .title("Lambda functions should be in a VPC")
        .remediation("Set `vpc` (and subnets) on the function.")
        .baselines(&[Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}
