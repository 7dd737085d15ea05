use std::path::Path;

use crate::error::{AuditError, Result};
use crate::model::GraphDocument;

/// Hand-written TOML graph documents.
pub struct TomlAdapter;

impl super::GraphAdapter for TomlAdapter {
    fn format(&self) -> &'static str {
        "toml"
    }

    fn detect(&self, path: &Path) -> bool {
        super::has_extension(path, "toml")
    }

    fn recognizes(&self, content: &str) -> bool {
        ::toml::from_str::<::toml::Table>(content).is_ok_and(|t| t.contains_key("resources"))
    }

    fn parse(&self, path: &Path, content: &str) -> Result<GraphDocument> {
        ::toml::from_str(content).map_err(|e| AuditError::Document {
            file: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
