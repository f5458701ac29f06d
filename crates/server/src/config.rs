use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub answer_service: AnswerServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an access token issued at login
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: i64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerServiceConfig {
    /// Full URL of the answer endpoint, e.g. http://localhost:8000/ask
    #[serde(default = "default_answer_url")]
    pub url: String,
    /// Upper bound on a single outbound call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Prior exchanges sent along with a student question
    #[serde(default = "default_history_window")]
    pub history_window: u32,
    /// Chats considered when refreshing a progress summary
    #[serde(default = "default_summary_window")]
    pub summary_window: u32,
}

fn default_token_expiry_days() -> i64 { 30 }
fn default_min_password_length() -> usize { 6 }
fn default_answer_url() -> String { "http://localhost:8000/ask".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_history_window() -> u32 { 5 }
fn default_summary_window() -> u32 { 10 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_expiry_days: default_token_expiry_days(),
            min_password_length: default_min_password_length(),
        }
    }
}

impl Default for AnswerServiceConfig {
    fn default() -> Self {
        Self {
            url: default_answer_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            summary_window: default_summary_window(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3333,
            },
            database: DatabaseConfig {
                path: "./data/scholar-hub.db".to_string(),
            },
            auth: AuthConfig::default(),
            answer_service: AnswerServiceConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Try to load from environment variable
        if let Ok(path) = std::env::var("SCHOLAR_HUB_CONFIG") {
            return Self::load_from_path(&PathBuf::from(path));
        }

        let default_paths = vec![
            PathBuf::from("scholar-hub-server.toml"),
            PathBuf::from("config/scholar-hub-server.toml"),
            PathBuf::from("/etc/scholar-hub/server.toml"),
        ];

        for path in default_paths {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // Return default config if no file found
        tracing::warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 4000

            [database]
            path = "/tmp/hub.db"

            [answer_service]
            url = "http://bot.internal/ask"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.answer_service.url, "http://bot.internal/ask");
        assert_eq!(config.answer_service.timeout_secs, 30);
        assert_eq!(config.auth.token_expiry_days, 30);
        assert_eq!(config.chat.history_window, 5);
        assert_eq!(config.chat.summary_window, 10);
    }

    #[test]
    fn test_negative_window_is_rejected() {
        let parsed = toml::from_str::<Config>(
            r#"
            [server]
            host = "127.0.0.1"
            port = 4000

            [database]
            path = "/tmp/hub.db"

            [chat]
            history_window = -1
            "#,
        );
        assert!(parsed.is_err());
    }
}
