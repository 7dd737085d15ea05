use crate::model::{AttributeValue, ResourceKind};
use crate::rules::{Baseline, Check, OnMissing, Rule, RuleTemplate, Severity};

pub(super) fn rules() -> Vec<Rule> {
    use Baseline::*;

    // SQS-managed server-side encryption is on unless explicitly disabled.
    RuleTemplate::new(
        "SQS.1",
        ResourceKind::Queue,
        Severity::Medium,
        Check::NotEquals {
            attribute: "encryption".into(),
            value: AttributeValue::from("UNENCRYPTED"),
            on_missing: OnMissing::Pass,
        },
    )
    .title("Amazon SQS queues should be encrypted at rest")
    .remediation("Leave `encryption` at its default or use `QueueEncryption.KMS`.")
    .baselines(&[Fsbp, Nist])
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{graph, run};
    use crate::model::{Resource, ResourceKind};
    use crate::rules::Baseline;

    #[test]
    fn default_queue_is_compliant() {
        let g = graph(vec![Resource::new("queue", ResourceKind::Queue)], vec![]);
        assert!(run(Baseline::Fsbp, "SQS.1", &g, "queue").unwrap());
    }

    #[test]
    fn unencrypted_queue_fails() {
        let g = graph(
            vec![Resource::new("queue", ResourceKind::Queue).with("encryption", "UNENCRYPTED")],
            vec![],
        );
        assert!(!run(Baseline::Nist, "SQS.1", &g, "queue").unwrap());
    }
}
