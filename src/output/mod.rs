pub mod console;
pub mod json;
pub mod sarif;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::report::AuditReport;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
    Sarif,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            "sarif" => Some(Self::Sarif),
            _ => None,
        }
    }
}

/// Render an audit report into the specified format.
pub fn render(report: &AuditReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(report)),
        OutputFormat::Json => json::render(report),
        OutputFormat::Sarif => sarif::render(report),
    }
}
