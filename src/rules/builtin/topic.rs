use crate::model::{RelationshipKind, ResourceKind};
use crate::rules::{Baseline, Check, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    [
        RuleTemplate::new(
            "SNS.1",
            ResourceKind::Topic,
            Severity::Medium,
            Check::AnyOf {
                checks: vec![
                    Check::non_empty("masterKey"),
                    Check::related(RelationshipKind::EncryptionKey, Some(ResourceKind::Key)),
                ],
            },
        )
        .title("SNS topics should be encrypted at-rest using AWS KMS")
        .remediation("Set `masterKey` to a customer managed key or the `alias/aws/sns` key.")
        .baselines(&[Nist]),
        RuleTemplate::new(
            "SNS.2",
            ResourceKind::Topic,
            Severity::Medium,
            Check::non_empty("loggingConfigs"),
        )
        .title(
            "Logging of delivery status should be enabled for notification messages sent to a topic",
        )
        .remediation("Add a `loggingConfigs` entry with success and failure feedback roles.")
        .baselines(&[Nist]),
    ]
    .into_iter()
    .flatten()
    .collect()
}
