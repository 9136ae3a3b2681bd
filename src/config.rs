use std::collections::HashMap;
use std::fs;

use anyhow::Result;
use serde::Deserialize;

use crate::auth::Role;

/// Server configuration, deserialized from a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: u16,
    pub database_path: String,
    pub cors_origin: Option<String>,
    pub narrative: NarrativeConfig,
    /// Bearer token -> principal map consumed by the token gate.
    pub tokens: HashMap<String, TokenEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NarrativeConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: "sheetpulse.db".to_string(),
            cors_origin: None,
            narrative: NarrativeConfig::default(),
            tokens: HashMap::new(),
        }
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 10,
            max_tokens: 150,
        }
    }
}

impl NarrativeConfig {
    /// Explicit key wins; otherwise fall back to the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("SHEETPULSE_API_KEY").ok())
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.narrative.model, "gpt-4o-mini");
        assert_eq!(config.narrative.timeout_secs, 10);
        assert!(config.tokens.is_empty());
    }

    #[test]
    fn parses_yaml_with_tokens() {
        let yaml = r#"
port: 8080
databasePath: data.db
tokens:
  abc123:
    id: user-1
    role: admin
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, "data.db");
        let entry = config.tokens.get("abc123").unwrap();
        assert_eq!(entry.id, "user-1");
        assert_eq!(entry.role, Role::Admin);
    }
}
