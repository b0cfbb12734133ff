use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use flow_documents::RecentConfig;
use flow_query::QueryLimits;
use flow_sequence::SequenceConfig;

use crate::error::{FlowError, FlowResult};

/// Where documents are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process memory; lost on exit.
    #[default]
    InMemory,
    /// A redb database file, created on first open.
    Path(PathBuf),
}

/// Engine configuration. Every field has a default, so an empty file is a
/// valid configuration.
///
/// ```toml
/// storage = { path = "/var/lib/flowdb/flow.redb" }
///
/// [sequence]
/// lease_size = 1000
/// scope = "per_stream"
///
/// [query]
/// default_max_results = 100
/// max_results_cap = 10000
/// scan_budget = 100000
///
/// [recent]
/// default_limit = 100
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub storage: StorageConfig,
    pub sequence: SequenceConfig,
    pub query: QueryLimits,
    pub recent: RecentConfig,
}

impl FlowConfig {
    pub fn from_toml(text: &str) -> FlowResult<Self> {
        toml::from_str(text)
            .map_err(|e| FlowError::InvalidRequest(format!("invalid configuration: {e}")))
    }

    /// Read a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FlowError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageConfig::Path(path.into());
        self
    }
}
