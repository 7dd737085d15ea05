use crate::report::{AuditReport, ComplianceReport};
use crate::rules::policy::BaselineStatus;
use crate::rules::{Finding, Severity};

/// Render the report as plain console text.
///
/// Per stack: one status line per baseline, then failing findings grouped
/// by resource. Indeterminate findings get their own section so they are
/// never mistaken for passes.
pub fn render(report: &AuditReport) -> String {
    let mut output = String::new();

    if report.stacks.is_empty() {
        output.push_str("\n  No stacks evaluated.\n\n");
        return output;
    }

    for stack in &report.stacks {
        render_stack(&mut output, stack);
    }

    let overall = if report.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "  Result: {} ({} stack(s), worst: {})\n\n",
        overall,
        report.stacks.len(),
        report.status(),
    ));

    output
}

fn render_stack(output: &mut String, stack: &ComplianceReport) {
    output.push_str(&format!(
        "\n  Stack {} [{}] (threshold: {})\n",
        stack.stack, stack.status, stack.fail_threshold
    ));
    if let Some(digest) = &stack.graph_digest {
        output.push_str(&format!("  sha256 {}\n", digest));
    }
    output.push('\n');

    if stack.baselines.is_empty() {
        output.push_str("    No baselines active.\n\n");
        return;
    }

    for (baseline, summary) in &stack.baselines {
        if summary.counts.total() == 0 {
            output.push_str(&format!(
                "    {:<14} {:<13} no applicable rules\n",
                baseline.to_string(),
                summary.status.to_string(),
            ));
            continue;
        }
        output.push_str(&format!(
            "    {:<14} {:<13} {} pass, {} fail, {} indeterminate\n",
            baseline.to_string(),
            summary.status.to_string(),
            summary.counts.pass,
            summary.counts.fail,
            summary.counts.indeterminate,
        ));
    }
    output.push('\n');

    for (baseline, summary) in &stack.baselines {
        let failing: Vec<(&String, Vec<&Finding>)> = summary
            .resources
            .iter()
            .map(|(id, findings)| {
                let failing: Vec<&Finding> = findings.iter().filter(|f| f.is_fail()).collect();
                (id, failing)
            })
            .filter(|(_, findings)| !findings.is_empty())
            .collect();
        if failing.is_empty() {
            continue;
        }

        output.push_str(&format!("    {} failures:\n", baseline));
        for (resource_id, findings) in failing {
            output.push_str(&format!("      {}\n", resource_id));
            for finding in findings {
                output.push_str(&format!(
                    "        {} {} {}\n",
                    severity_tag(finding.severity),
                    finding.rule_id,
                    finding.rule_title
                ));
                if !finding.remediation.is_empty() {
                    output.push_str(&format!("                   fix: {}\n", finding.remediation));
                }
            }
        }
        output.push('\n');
    }

    if !stack.indeterminate.is_empty() {
        output.push_str(&format!(
            "    {} rule(s) could not be evaluated:\n",
            stack.indeterminate.len()
        ));
        for finding in &stack.indeterminate {
            output.push_str(&format!(
                "      [??]       {} on {}: {}\n",
                finding.qualified_rule_id(),
                finding.resource_id,
                finding.error.as_deref().unwrap_or("unknown error"),
            ));
        }
        output.push('\n');
    }

    if stack.status == BaselineStatus::Pass && stack.totals.fail > 0 {
        output.push_str(&format!(
            "    {} failure(s) below the {} threshold.\n\n",
            stack.totals.fail, stack.fail_threshold
        ));
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "[CRITICAL]",
        Severity::High => "[HIGH]    ",
        Severity::Medium => "[MEDIUM]  ",
        Severity::Low => "[LOW]     ",
    }
}
