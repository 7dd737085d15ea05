use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::rules::policy::{BaselineStatus, Policy};
use crate::rules::{Baseline, Finding, FindingStatus, Severity};

/// Reports for every stack in one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub stacks: Vec<ComplianceReport>,
    /// True only when every baseline of every stack passed.
    pub pass: bool,
}

impl AuditReport {
    pub fn new(stacks: Vec<ComplianceReport>) -> Self {
        let pass = stacks.iter().all(ComplianceReport::passed);
        Self { stacks, pass }
    }

    /// Worst status over all stacks.
    pub fn status(&self) -> BaselineStatus {
        self.stacks
            .iter()
            .map(|s| s.status)
            .max()
            .unwrap_or(BaselineStatus::Pass)
    }

    /// Process exit code: 0 when everything passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.pass {
            0
        } else {
            1
        }
    }
}

/// Compliance report for one stack (one resource graph).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub stack: String,
    /// sha256 of the document the graph was loaded from, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_digest: Option<String>,
    /// Worst status over all baselines.
    pub status: BaselineStatus,
    pub fail_threshold: Severity,
    pub totals: StatusCounts,
    pub baselines: BTreeMap<Baseline, BaselineReport>,
    /// Every finding whose rule could not be evaluated, across baselines.
    pub indeterminate: Vec<Finding>,
}

impl ComplianceReport {
    /// Status of one baseline. A baseline with no findings passes.
    pub fn baseline_status(&self, baseline: &Baseline) -> BaselineStatus {
        self.baselines
            .get(baseline)
            .map_or(BaselineStatus::Pass, |b| b.status)
    }

    pub fn passed(&self) -> bool {
        self.status == BaselineStatus::Pass
    }

    /// Iterate findings of every baseline, in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.baselines
            .values()
            .flat_map(|b| b.resources.values().flatten())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineReport {
    pub status: BaselineStatus,
    pub counts: StatusCounts,
    /// Failing findings per severity, including those under the threshold.
    pub failing_by_severity: BTreeMap<Severity, usize>,
    /// Findings grouped by resource id, worst severity first.
    pub resources: BTreeMap<String, Vec<Finding>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub fail: usize,
    pub indeterminate: usize,
}

impl StatusCounts {
    fn record(&mut self, status: FindingStatus) {
        match status {
            FindingStatus::Pass => self.pass += 1,
            FindingStatus::Fail => self.fail += 1,
            FindingStatus::Indeterminate => self.indeterminate += 1,
        }
    }

    fn add(&mut self, other: StatusCounts) {
        self.pass += other.pass;
        self.fail += other.fail;
        self.indeterminate += other.indeterminate;
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.indeterminate
    }
}

/// Apply `policy` to raw engine findings and group them into a report.
///
/// Every baseline in `active` gets an entry, so a baseline with no
/// applicable rules shows up as a pass with zero counts.
pub fn summarize(
    stack: &str,
    findings: &[Finding],
    active: &BTreeSet<Baseline>,
    policy: &Policy,
) -> ComplianceReport {
    let findings = policy.apply(findings);

    let mut grouped: BTreeMap<Baseline, Vec<Finding>> =
        active.iter().map(|b| (b.clone(), Vec::new())).collect();
    for finding in &findings {
        grouped
            .entry(finding.baseline.clone())
            .or_default()
            .push(finding.clone());
    }

    let mut totals = StatusCounts::default();
    let mut baselines = BTreeMap::new();
    for (baseline, findings) in grouped {
        let report = baseline_report(findings, policy);
        totals.add(report.counts);
        baselines.insert(baseline, report);
    }

    let status = baselines
        .values()
        .map(|b: &BaselineReport| b.status)
        .max()
        .unwrap_or(BaselineStatus::Pass);

    let indeterminate = findings
        .into_iter()
        .filter(|f| f.status == FindingStatus::Indeterminate)
        .collect();

    ComplianceReport {
        stack: stack.to_string(),
        graph_digest: None,
        status,
        fail_threshold: policy.fail_on,
        totals,
        baselines,
        indeterminate,
    }
}

fn baseline_report(findings: Vec<Finding>, policy: &Policy) -> BaselineReport {
    let status = policy.status(&findings);

    let mut counts = StatusCounts::default();
    let mut failing_by_severity = BTreeMap::new();
    let mut resources: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        counts.record(finding.status);
        if finding.is_fail() {
            *failing_by_severity.entry(finding.severity).or_insert(0) += 1;
        }
        resources
            .entry(finding.resource_id.clone())
            .or_default()
            .push(finding);
    }
    for list in resources.values_mut() {
        list.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
    }

    BaselineReport {
        status,
        counts,
        failing_by_severity,
        resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;
    use pretty_assertions::assert_eq;

    fn nist() -> BTreeSet<Baseline> {
        [Baseline::Nist].into()
    }

    fn finding(
        baseline: Baseline,
        resource: &str,
        rule: &str,
        severity: Severity,
        status: FindingStatus,
    ) -> Finding {
        Finding {
            resource_id: resource.into(),
            resource_kind: ResourceKind::Bucket,
            rule_id: rule.into(),
            rule_title: rule.into(),
            baseline,
            severity,
            status,
            remediation: String::new(),
            error: None,
        }
    }

    #[test]
    fn groups_by_baseline_then_resource() {
        let findings = vec![
            finding(Baseline::Nist, "b", "S3.13", Severity::Low, FindingStatus::Fail),
            finding(Baseline::Nist, "b", "S3.5", Severity::Medium, FindingStatus::Pass),
            finding(Baseline::Nist, "a", "S3.9", Severity::Medium, FindingStatus::Pass),
            finding(Baseline::Fsbp, "b", "S3.5", Severity::Medium, FindingStatus::Pass),
        ];
        let active = [Baseline::Fsbp, Baseline::Nist].into();
        let report = summarize("stack", &findings, &active, &Policy::default());

        assert_eq!(report.baselines.len(), 2);
        let nist = &report.baselines[&Baseline::Nist];
        assert_eq!(nist.resources.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
        let ids: Vec<_> = nist.resources["b"].iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["S3.5", "S3.13"]);
        assert_eq!(
            nist.counts,
            StatusCounts {
                pass: 2,
                fail: 1,
                indeterminate: 0
            }
        );
        assert_eq!(nist.failing_by_severity.get(&Severity::Low), Some(&1));
        // Low failure is under the default threshold.
        assert_eq!(report.status, BaselineStatus::Pass);
        assert_eq!(report.totals.total(), 4);
    }

    #[test]
    fn worst_baseline_decides_report_status() {
        let findings = vec![
            finding(Baseline::Cis, "k", "2.8", Severity::Medium, FindingStatus::Pass),
            finding(Baseline::Nist, "t", "SNS.1", Severity::Medium, FindingStatus::Fail),
        ];
        let active = [Baseline::Cis, Baseline::Nist].into();
        let report = summarize("stack", &findings, &active, &Policy::default());
        assert_eq!(report.baseline_status(&Baseline::Cis), BaselineStatus::Pass);
        assert_eq!(report.baseline_status(&Baseline::Nist), BaselineStatus::Fail);
        assert_eq!(report.status, BaselineStatus::Fail);
        assert!(!report.passed());
    }

    #[test]
    fn indeterminate_findings_are_surfaced() {
        let mut broken = finding(
            Baseline::Nist,
            "acl",
            "WAF.12",
            Severity::Medium,
            FindingStatus::Indeterminate,
        );
        broken.error = Some("bad entry".into());
        let report = summarize("stack", &[broken.clone()], &nist(), &Policy::default());
        assert_eq!(report.status, BaselineStatus::Indeterminate);
        assert_eq!(report.indeterminate, vec![broken]);
    }

    #[test]
    fn audit_fails_if_any_stack_is_indeterminate() {
        let ok = summarize(
            "ok",
            &[finding(Baseline::Nist, "b", "S3.5", Severity::Medium, FindingStatus::Pass)],
            &nist(),
            &Policy::default(),
        );
        let unsure = summarize(
            "unsure",
            &[finding(
                Baseline::Nist,
                "acl",
                "WAF.12",
                Severity::Low,
                FindingStatus::Indeterminate,
            )],
            &nist(),
            &Policy::default(),
        );
        let audit = AuditReport::new(vec![ok, unsure]);
        assert!(!audit.pass);
        assert_eq!(audit.status(), BaselineStatus::Indeterminate);
        assert_eq!(audit.exit_code(), 1);
    }

    #[test]
    fn ignored_rules_leave_the_report() {
        let mut policy = Policy::default();
        policy.ignore_rules.insert("SNS.1".into());
        let findings = vec![finding(
            Baseline::Nist,
            "t",
            "SNS.1",
            Severity::Medium,
            FindingStatus::Fail,
        )];
        let report = summarize("stack", &findings, &nist(), &policy);
        assert!(report.passed());
        assert_eq!(report.baseline_status(&Baseline::Nist), BaselineStatus::Pass);
        assert_eq!(report.baselines[&Baseline::Nist].counts.total(), 0);
    }

    #[test]
    fn active_baseline_without_findings_is_listed() {
        let active = [Baseline::Cis, Baseline::Nist].into();
        let findings = vec![finding(
            Baseline::Nist,
            "b",
            "S3.5",
            Severity::Medium,
            FindingStatus::Pass,
        )];
        let report = summarize("stack", &findings, &active, &Policy::default());

        let listed: Vec<_> = report.baselines.keys().cloned().collect();
        assert_eq!(listed, vec![Baseline::Cis, Baseline::Nist]);
        let cis = &report.baselines[&Baseline::Cis];
        assert_eq!(cis.status, BaselineStatus::Pass);
        assert_eq!(cis.counts, StatusCounts::default());
        assert!(cis.resources.is_empty());
    }
}
