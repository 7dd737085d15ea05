use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stackaudit::adapter::CONFIG_FILE;
use stackaudit::config::Config;
use stackaudit::error::AuditError;
use stackaudit::model::ResourceKind;
use stackaudit::output::OutputFormat;
use stackaudit::rules::{Baseline, Severity};
use stackaudit::AuditOptions;

#[derive(Parser)]
#[command(
    name = "stackaudit",
    about = "Compliance evaluator for declared cloud resource graphs",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a resource graph document (or a directory of them)
    Scan {
        /// Graph document, or a directory of .json/.toml documents
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json, sarif)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Minimum severity of a failing rule that fails its baseline (low, medium, high, critical)
        #[arg(long)]
        fail_on: Option<String>,

        /// Baselines to evaluate; repeat for several (cis, fsbp, nist, or a custom name)
        #[arg(long = "baseline", short = 'b')]
        baselines: Vec<String>,

        /// Evaluate resources one at a time
        #[arg(long)]
        sequential: bool,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the rules in the catalog
    ListRules {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,

        /// Only rules from this baseline
        #[arg(long)]
        baseline: Option<String>,

        /// Only rules for this resource kind
        #[arg(long)]
        kind: Option<String>,

        /// Config file whose custom rules are listed too
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Generate a starter .stackaudit.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STACKAUDIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            path,
            config,
            format,
            fail_on,
            baselines,
            sequential,
            output,
        } => cmd_scan(path, config, format, fail_on, baselines, sequential, output),
        Commands::ListRules {
            format,
            baseline,
            kind,
            config,
        } => cmd_list_rules(format, baseline, kind, config),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn cmd_scan(
    path: PathBuf,
    config: Option<PathBuf>,
    format_str: String,
    fail_on_str: Option<String>,
    baselines: Vec<String>,
    sequential: bool,
    output_path: Option<PathBuf>,
) -> Result<i32, AuditError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let fail_on = fail_on_str.and_then(|s| {
        let sev = Severity::from_str_lenient(&s);
        if sev.is_none() {
            eprintln!("Warning: unknown severity '{}', using config default", s);
        }
        sev
    });

    let options = AuditOptions {
        config_path: config,
        format,
        fail_on_override: fail_on,
        baselines_override: baselines.iter().map(|b| Baseline::from(b.as_str())).collect(),
        parallel_override: sequential.then_some(false),
    };

    let report = stackaudit::audit(&path, &options)?;
    let rendered = stackaudit::render_report(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = every baseline passed, 1 = a failure or an indeterminate rule
    Ok(report.exit_code())
}

fn cmd_list_rules(
    format_str: String,
    baseline: Option<String>,
    kind: Option<String>,
    config: Option<PathBuf>,
) -> Result<i32, AuditError> {
    let config = Config::load(&config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE)))?;
    let catalog = config.catalog()?;

    let baseline = baseline.map(|b| Baseline::from(b.as_str()));
    let kind = match kind {
        Some(k) => Some(
            ResourceKind::from_str_lenient(&k)
                .ok_or_else(|| AuditError::Config(format!("unknown resource kind '{k}'")))?,
        ),
        None => None,
    };

    let rules: Vec<_> = catalog
        .list_rules()
        .into_iter()
        .filter(|r| baseline.as_ref().map_or(true, |b| &r.baseline == b))
        .filter(|r| kind.map_or(true, |k| r.kind.map_or(true, |rk| rk == k)))
        .collect();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<8} {:<14} {:<13} {:<9} TITLE",
                "BASELINE", "ID", "KIND", "SEVERITY"
            );
            println!("{}", "-".repeat(90));
            for rule in &rules {
                println!(
                    "{:<8} {:<14} {:<13} {:<9} {}",
                    rule.baseline.to_string(),
                    rule.id,
                    rule.kind.map(|k| k.to_string()).unwrap_or_else(|| "*".into()),
                    rule.severity.to_string(),
                    rule.title,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, AuditError> {
    let path = PathBuf::from(CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", CONFIG_FILE);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", CONFIG_FILE);

    Ok(0)
}
