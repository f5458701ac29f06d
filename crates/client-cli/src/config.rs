use anyhow::{bail, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "http://localhost:3333";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    pub server: Option<String>,
    pub token: Option<String>,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "scholarhub", "scholar")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "server" => self.remote.server = Some(value.trim_end_matches('/').to_string()),
            "token" => self.remote.token = Some(value),
            _ => bail!("Unknown config key: {}. Valid keys: server, token", key),
        }
        Ok(())
    }

    /// Value for display. The token is masked.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "server" => self.remote.server.clone().unwrap_or_default(),
            "token" => self
                .remote
                .token
                .as_ref()
                .map(|_| "****")
                .unwrap_or_default()
                .to_string(),
            _ => bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }

    /// Command-line override first, then the stored server, then the default.
    pub fn server(&self, overridden: Option<String>) -> String {
        overridden
            .or_else(|| self.remote.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
    }

    pub fn token(&self, overridden: Option<String>) -> Option<String> {
        overridden.or_else(|| self.remote.token.clone())
    }
}
