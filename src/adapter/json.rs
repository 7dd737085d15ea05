use std::path::Path;

use crate::error::{AuditError, Result};
use crate::model::GraphDocument;

/// JSON graph documents, e.g. produced by a synth step.
pub struct JsonAdapter;

impl super::GraphAdapter for JsonAdapter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn detect(&self, path: &Path) -> bool {
        super::has_extension(path, "json")
    }

    fn recognizes(&self, content: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(content)
            .ok()
            .and_then(|v| v.as_object().map(|o| o.contains_key("resources")))
            .unwrap_or(false)
    }

    fn parse(&self, path: &Path, content: &str) -> Result<GraphDocument> {
        serde_json::from_str(content).map_err(|e| AuditError::Document {
            file: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
