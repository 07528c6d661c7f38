use std::fs;
use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::SeqpackError;

pub const CONFIG_FILE: &str = "seqpack.json";

pub const DEFAULT_NAMESPACE: &str = "https://seqpack.dev/packages";
pub const DEFAULT_NCBI_EMAIL: &str = "tooling@seqpack.dev";
const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub ncbi_email: Option<String>,
    #[serde(default)]
    pub registry_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub namespace: String,
    pub ncbi_email: String,
    pub registry_timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(package_root: &Utf8Path) -> Result<ResolvedConfig, SeqpackError> {
        let config_path = package_root.join(CONFIG_FILE);
        if !config_path.as_std_path().exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| SeqpackError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SeqpackError::ConfigParse(err.to_string()))?;
        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            namespace: config
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            ncbi_email: config
                .ncbi_email
                .unwrap_or_else(|| DEFAULT_NCBI_EMAIL.to_string()),
            registry_timeout: Duration::from_secs(
                config
                    .registry_timeout_secs
                    .unwrap_or(DEFAULT_REGISTRY_TIMEOUT_SECS),
            ),
        }
    }
}
