pub mod json;
pub mod toml;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{AuditError, Result};
use crate::model::{GraphDocument, ResourceGraph};

/// File name of the project config; never loaded as a graph document.
pub const CONFIG_FILE: &str = ".stackaudit.toml";

/// Documents larger than this are skipped when scanning a directory.
const MAX_DOCUMENT_BYTES: u64 = 16 * 1_048_576;

/// A graph plus the digest of the bytes it was read from.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub graph: ResourceGraph,
    pub path: PathBuf,
    /// Hex-encoded sha256 of the source document.
    pub digest: String,
}

/// An adapter recognizes one document format and loads it into a
/// validated resource graph.
pub trait GraphAdapter: Send + Sync {
    /// Short format name, used in logs.
    fn format(&self) -> &'static str;

    /// Check if this adapter can handle the given file.
    fn detect(&self, path: &Path) -> bool;

    /// Whether `content` has the shape of a graph document: a top-level
    /// table with a `resources` key. Unparseable content is not one.
    fn recognizes(&self, content: &str) -> bool;

    /// Parse raw document bytes. `path` is only used for error messages.
    fn parse(&self, path: &Path, content: &str) -> Result<GraphDocument>;

    /// Read, parse and validate one document.
    fn load(&self, path: &Path) -> Result<LoadedGraph> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(path, &content)
    }

    /// Parse and validate a document already read from `path`.
    fn load_str(&self, path: &Path, content: &str) -> Result<LoadedGraph> {
        let document = self.parse(path, content)?;
        let graph = document.into_graph(&stack_name(path))?;
        tracing::debug!(
            format = self.format(),
            path = %path.display(),
            resources = graph.len(),
            relationships = graph.relationships().len(),
            "loaded resource graph"
        );
        Ok(LoadedGraph {
            graph,
            path: path.to_path_buf(),
            digest: digest(content.as_bytes()),
        })
    }
}

/// All registered adapters.
pub fn all_adapters() -> Vec<Box<dyn GraphAdapter>> {
    vec![Box::new(json::JsonAdapter), Box::new(toml::TomlAdapter)]
}

fn adapter_for(path: &Path, adapters: &[Box<dyn GraphAdapter>]) -> Option<usize> {
    adapters.iter().position(|a| a.detect(path))
}

/// Load every graph document at `path`.
///
/// A file is loaded with the adapter that recognizes its extension; any
/// error is returned. A directory is scanned one level deep in file name
/// order. Files that are not graph documents (other JSON or TOML, or
/// content that does not parse) are skipped. A graph document that fails
/// to parse or build aborts the whole load.
pub fn auto_detect_and_load(path: &Path) -> Result<Vec<LoadedGraph>> {
    let adapters = all_adapters();

    if path.is_file() {
        let index = adapter_for(path, &adapters)
            .ok_or_else(|| AuditError::NoGraph(path.display().to_string()))?;
        return Ok(vec![adapters[index].load(path)?]);
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| p.file_name().is_some_and(|n| n != CONFIG_FILE))
        .collect();
    entries.sort();

    let mut graphs = Vec::new();
    for entry in &entries {
        let Some(index) = adapter_for(entry, &adapters) else {
            continue;
        };
        let adapter = &adapters[index];

        let size = std::fs::metadata(entry)?.len();
        if size > MAX_DOCUMENT_BYTES {
            tracing::warn!(path = %entry.display(), size, "file too large, skipping");
            continue;
        }

        let content = std::fs::read_to_string(entry)?;
        if !adapter.recognizes(&content) {
            tracing::debug!(
                format = adapter.format(),
                path = %entry.display(),
                "not a graph document, skipping"
            );
            continue;
        }

        graphs.push(adapter.load_str(entry, &content)?);
    }

    if graphs.is_empty() {
        return Err(AuditError::NoGraph(path.display().to_string()));
    }

    Ok(graphs)
}

/// Stack name fallback: the file stem.
fn stack_name(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "stack".into())
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::new().chain_update(bytes).finalize())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
