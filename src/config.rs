use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default)]
    pub api_token: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EditorConfig {
    #[serde(default = "default_confirm_delete")]
    pub confirm_delete: bool,
    #[serde(default = "default_deletion_grace_ms")]
    pub deletion_grace_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            confirm_delete: default_confirm_delete(),
            deletion_grace_ms: default_deletion_grace_ms(),
        }
    }
}

fn default_confirm_delete() -> bool {
    true
}

fn default_deletion_grace_ms() -> u64 {
    300
}

impl AppConfig {
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::defaults()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("OUTLINER_").split("_").lowercase(false))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.url.is_empty() {
            return Err(Error::Config("server.url is required".into()));
        }
        if self.server.api_token.is_empty() {
            return Err(Error::Config(
                "server.api_token is required (set in config or OUTLINER_API_TOKEN env var)".into(),
            ));
        }
        Ok(())
    }

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(|xdg| PathBuf::from(xdg).join("outliner"))
            .or_else(|| {
                directories::BaseDirs::new()
                    .map(|dirs| dirs.home_dir().join(".config").join("outliner"))
            })
    }

    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = r#"[server]
url = "https://notes.example.com/api"
api_token = ""  # or set OUTLINER_API_TOKEN env var

[editor]
confirm_delete = true
deletion_grace_ms = 300
"#;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn defaults() -> Self {
        Self {
            server: ServerConfig {
                url: String::new(),
                api_token: String::new(),
            },
            editor: EditorConfig::default(),
        }
    }
}
