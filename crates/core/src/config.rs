//! Agent configuration, constructed once at startup and passed down explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_LLM_ENDPOINT: &str = "DESK_AGENT_LLM_ENDPOINT";
pub const ENV_LLM_MODEL: &str = "DESK_AGENT_LLM_MODEL";
pub const ENV_SERVER_PORT: &str = "DESK_AGENT_PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmSettings,
    pub paths: PathSettings,
    pub limits: Limits,
    pub security: SecuritySettings,
    pub automation: AutomationSettings,
    pub server: ServerSettings,
}

/// OpenAI-compatible chat endpoint settings (LM Studio by default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            temperature: 0.7,
            max_tokens: 3000,
            timeout_secs: 90,
        }
    }
}

/// Data directories. Relative entries resolve against `base_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub base_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub knowledge_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    pub database: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            logs_dir: PathBuf::from("logs"),
            knowledge_dir: PathBuf::from("knowledge_base"),
            cache_dir: PathBuf::from("cache"),
            backup_dir: PathBuf::from("backups"),
            screenshots_dir: PathBuf::from("screenshots"),
            database: PathBuf::from("knowledge_base/agent_memory.db"),
        }
    }
}

impl PathSettings {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn logs(&self) -> PathBuf {
        self.resolve(&self.logs_dir)
    }

    pub fn knowledge(&self) -> PathBuf {
        self.resolve(&self.knowledge_dir)
    }

    pub fn cache(&self) -> PathBuf {
        self.resolve(&self.cache_dir)
    }

    pub fn backups(&self) -> PathBuf {
        self.resolve(&self.backup_dir)
    }

    pub fn screenshots(&self) -> PathBuf {
        self.resolve(&self.screenshots_dir)
    }

    pub fn database(&self) -> PathBuf {
        self.resolve(&self.database)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_file_size: u64,
    pub max_search_results: usize,
    pub max_history_messages: usize,
    pub file_preview_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_search_results: 100,
            max_history_messages: 50,
            file_preview_chars: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub forbidden_paths: Vec<String>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            forbidden_paths: vec![
                r"C:\Windows\System32".to_string(),
                r"C:\Windows\SysWOW64".to_string(),
                "/system".to_string(),
                "/sys".to_string(),
                "/proc".to_string(),
                r"C:\Program Files\WindowsApps".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    pub auto_cleanup_days: u32,
    pub log_retention_days: u32,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            auto_cleanup_days: 30,
            log_retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl AgentConfig {
    /// Load from a YAML file. A missing file yields the defaults.
    /// Environment overrides are applied in both cases.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            debug!("Loaded config from {}", path.display());
            serde_yaml::from_str(&content)?
        } else {
            info!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_LLM_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.llm.endpoint = endpoint.trim().to_string();
        }
        if let Some(model) = lookup(ENV_LLM_MODEL).filter(|v| !v.trim().is_empty()) {
            self.llm.model = model.trim().to_string();
        }
        if let Some(port) = lookup(ENV_SERVER_PORT).and_then(|v| v.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.endpoint cannot be empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model cannot be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within 0..=2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.timeout_secs must be > 0".into()));
        }
        if self.limits.max_file_size == 0
            || self.limits.max_search_results == 0
            || self.limits.max_history_messages == 0
        {
            return Err(ConfigError::Invalid("limits must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let dirs = [
            self.paths.logs(),
            self.paths.knowledge(),
            self.paths.cache(),
            self.paths.backups(),
            self.paths.screenshots(),
        ];
        for dir in dirs {
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        if let Some(parent) = self.paths.database().parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}
