use serde::{Deserialize, Serialize};

/// A named compliance standard.
///
/// Built-in baselines order before custom ones; custom baselines order by
/// name. This ordering is what the catalog and reports sort on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Baseline {
    /// CIS AWS Foundations Benchmark v1.2.0
    Cis,
    /// AWS Foundational Security Best Practices v1.0.0
    Fsbp,
    /// NIST SP 800-53 Rev. 5
    Nist,
    Custom(String),
}

impl Baseline {
    pub const BUILTIN: [Baseline; 3] = [Baseline::Cis, Baseline::Fsbp, Baseline::Nist];

    /// Stable lowercase key, used in config files and qualified rule ids.
    pub fn key(&self) -> &str {
        match self {
            Self::Cis => "cis",
            Self::Fsbp => "fsbp",
            Self::Nist => "nist",
            Self::Custom(name) => name,
        }
    }

    /// `baseline/RULE`, unique across the catalog.
    pub fn qualify(&self, rule_id: &str) -> String {
        format!("{}/{}", self.key(), rule_id)
    }
}

impl From<String> for Baseline {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "cis" => Self::Cis,
            "fsbp" => Self::Fsbp,
            "nist" => Self::Nist,
            _ => Self::Custom(value.trim().to_string()),
        }
    }
}

impl From<&str> for Baseline {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Baseline> for String {
    fn from(value: Baseline) -> Self {
        value.key().to_string()
    }
}

impl std::fmt::Display for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cis => write!(f, "CIS"),
            Self::Fsbp => write!(f, "FSBP"),
            Self::Nist => write!(f, "NIST"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}
