//! stack-audit: static compliance evaluation for declared cloud resource graphs.
//!
//! Offline, declarative, SARIF output. Loads a synthesized resource graph,
//! runs the CIS, FSBP and NIST rule baselines (plus any organization rules
//! from config) against every resource, and reports pass/fail per baseline.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use stackaudit::{audit, AuditOptions};
//!
//! let options = AuditOptions::default();
//! let report = audit(Path::new("./cdk.out/graph.json"), &options).unwrap();
//! for stack in &report.stacks {
//!     println!("{}: {}", stack.stack, stack.status);
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod report;
pub mod rules;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use config::Config;
use error::Result;
use model::ResourceGraph;
use output::OutputFormat;
use rules::policy::Policy;
use rules::{Baseline, RuleCatalog, RuleEngine};

pub use report::{AuditReport, ComplianceReport};

/// Options for an audit invocation.
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Path to config file (defaults to `.stackaudit.toml` next to the input).
    pub config_path: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// CLI override for fail_on threshold.
    pub fail_on_override: Option<rules::Severity>,
    /// CLI override for the active baselines.
    pub baselines_override: Vec<Baseline>,
    /// CLI override for parallel evaluation.
    pub parallel_override: Option<bool>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            format: OutputFormat::Console,
            fail_on_override: None,
            baselines_override: Vec::new(),
            parallel_override: None,
        }
    }
}

/// Default config location for an input path: inside a directory, or next
/// to a single document.
pub fn default_config_path(path: &Path) -> PathBuf {
    let dir = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(Path::new("."))
    };
    dir.join(adapter::CONFIG_FILE)
}

/// Run a complete audit: load config, load graphs, evaluate, summarize.
pub fn audit(path: &Path, options: &AuditOptions) -> Result<AuditReport> {
    // Load config
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| default_config_path(path));
    let mut config = Config::load(&config_path)?;

    // Apply CLI overrides
    if let Some(fail_on) = options.fail_on_override {
        config.policy.fail_on = fail_on;
    }
    if !options.baselines_override.is_empty() {
        config.baselines = options.baselines_override.clone();
    }
    if let Some(parallel) = options.parallel_override {
        config.parallel = parallel;
    }

    let catalog = config.catalog()?;
    let baselines = config.active_baselines(&catalog)?;

    let graphs = adapter::auto_detect_and_load(path)?;

    let stacks = graphs
        .iter()
        .map(|loaded| {
            let mut report = evaluate_graph(
                &loaded.graph,
                &catalog,
                &baselines,
                &config.policy,
                config.parallel,
            );
            report.graph_digest = Some(loaded.digest.clone());
            report
        })
        .collect();

    Ok(AuditReport::new(stacks))
}

/// Evaluate one already-built graph and summarize the findings.
pub fn evaluate_graph(
    graph: &ResourceGraph,
    catalog: &RuleCatalog,
    baselines: &BTreeSet<Baseline>,
    policy: &Policy,
    parallel: bool,
) -> ComplianceReport {
    let findings = RuleEngine::new(catalog)
        .parallel(parallel)
        .evaluate(graph, baselines);
    let report = report::summarize(graph.name(), &findings, baselines, policy);
    tracing::info!(
        stack = %report.stack,
        status = %report.status,
        findings = findings.len(),
        "stack evaluated"
    );
    report
}

/// Render an audit report in the specified format.
pub fn render_report(report: &AuditReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}
