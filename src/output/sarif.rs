use std::collections::BTreeMap;

use crate::error::Result;
use crate::report::AuditReport;
use crate::rules::{Finding, FindingStatus, Severity};

use serde_json::{json, Value};

/// Render failing and indeterminate findings as SARIF 2.1.0.
///
/// One run per stack. Failures are `fail` results at a severity-derived
/// level; findings whose rule could not be evaluated are `review` results,
/// so code-scanning consumers surface them instead of dropping them.
pub fn render(report: &AuditReport) -> Result<String> {
    let runs: Vec<Value> = report
        .stacks
        .iter()
        .map(|stack| {
            let reported: Vec<&Finding> = stack
                .findings()
                .filter(|f| f.status != FindingStatus::Pass)
                .collect();

            // One descriptor per qualified rule id, in id order.
            let mut descriptors: BTreeMap<String, &Finding> = BTreeMap::new();
            for f in &reported {
                descriptors.entry(f.qualified_rule_id()).or_insert(f);
            }
            let rules: Vec<Value> = descriptors
                .iter()
                .map(|(id, f)| {
                    json!({
                        "id": id,
                        "name": f.rule_id,
                        "shortDescription": { "text": f.rule_title },
                        "help": { "text": f.remediation },
                        "defaultConfiguration": {
                            "level": severity_to_sarif_level(f.severity),
                        },
                        "properties": {
                            "baseline": f.baseline.to_string(),
                            "severity": f.severity.to_string(),
                        },
                    })
                })
                .collect();

            let results: Vec<Value> = reported.iter().map(|f| result_for(f)).collect();

            let mut run = json!({
                "tool": {
                    "driver": {
                        "name": "stack-audit",
                        "version": env!("CARGO_PKG_VERSION"),
                        "semanticVersion": env!("CARGO_PKG_VERSION"),
                        "rules": rules,
                    },
                },
                "results": results,
                "automationDetails": {
                    "id": format!("stackaudit/{}", stack.stack),
                },
            });
            if let Some(digest) = &stack.graph_digest {
                run["properties"] = json!({ "graphDigest": digest });
            }
            run
        })
        .collect();

    let sarif = json!({
        "$schema": "https://docs.oasis-open.org/sarif/sarif/v2.1.0/errata01/os/schemas/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": runs,
    });

    let output = serde_json::to_string_pretty(&sarif)?;
    Ok(output)
}

fn result_for(f: &Finding) -> Value {
    let (kind, level, text) = match f.status {
        FindingStatus::Indeterminate => (
            "review",
            "none",
            format!(
                "{} could not be evaluated: {}",
                f.rule_title,
                f.error.as_deref().unwrap_or("unknown error")
            ),
        ),
        _ => (
            "fail",
            severity_to_sarif_level(f.severity),
            format!("{} ({})", f.rule_title, f.resource_id),
        ),
    };

    let mut result = json!({
        "ruleId": f.qualified_rule_id(),
        "kind": kind,
        "level": level,
        "message": { "text": text },
        "locations": [{
            "logicalLocations": [{
                "name": f.resource_id,
                "kind": f.resource_kind.to_string(),
            }],
        }],
    });
    if f.status == FindingStatus::Fail && !f.remediation.is_empty() {
        result["fixes"] = json!([{
            "description": { "text": f.remediation },
        }]);
    }
    result
}

fn severity_to_sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low => "note",
    }
}
