use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use flow_sdk::{FlowConfig, StorageConfig};
use flow_server::ServerConfig;

use crate::cli::Cli;

/// Contents of a `--config` file: engine settings at the top level and an
/// optional `[server]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub flow: FlowConfig,
    pub server: ServerConfig,
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Configuration file first, then command-line overrides.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(data) = &cli.data {
            settings.flow.storage = StorageConfig::Path(data.clone());
        }
        Ok(settings)
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.flow.storage, StorageConfig::Path(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn file_with_server_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowdb.toml");
        std::fs::write(
            &path,
            r#"
            storage = { path = "/srv/flow.redb" }

            [query]
            scan_budget = 500

            [server]
            bind_addr = "0.0.0.0:9000"
            "#,
        )
        .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert!(settings.is_persistent());
        assert_eq!(settings.flow.query.scan_budget, 500);
        assert_eq!(settings.server.bind_addr.port(), 9000);
        assert_eq!(settings.server.max_body_bytes, ServerConfig::default().max_body_bytes);
    }

    #[test]
    fn data_flag_overrides_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowdb.toml");
        std::fs::write(&path, "storage = \"in_memory\"\n").unwrap();
        let cli = Cli::try_parse_from([
            "flowdb",
            "--config",
            path.to_str().unwrap(),
            "--data",
            "local.redb",
            "streams",
        ])
        .unwrap();
        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(
            settings.flow.storage,
            StorageConfig::Path(PathBuf::from("local.redb"))
        );
    }

    #[test]
    fn defaults_without_a_file() {
        let cli = Cli::try_parse_from(["flowdb", "streams"]).unwrap();
        let settings = Settings::resolve(&cli).unwrap();
        assert!(!settings.is_persistent());
        assert_eq!(settings.server, ServerConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load(Path::new("/definitely/not/here.toml")).is_err());
    }
}
