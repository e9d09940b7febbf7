use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Sandbox root for every filesystem and process operation
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// How long captured command output stays retrievable
    #[serde(default = "default_ticket_ttl_secs")]
    pub ticket_ttl_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Environment variables the renderer may read through `get-env`
    #[serde(default = "default_exposed_env")]
    pub exposed_env: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Supports ${ENV_VAR} substitution; falls back to $GEMINI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Child program for AI queries. Defaults to this binary in `ai-query` mode.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_ticket_ttl_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_exposed_env() -> Vec<String> {
    vec!["GEMINI_API_KEY".to_string()]
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key() -> String {
    std::env::var("GEMINI_API_KEY").unwrap_or_default()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_entries() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ticket_ttl_secs: default_ticket_ttl_secs(),
            max_output_bytes: default_max_output_bytes(),
            exposed_env: default_exposed_env(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            command: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_entries: default_max_entries(),
        }
    }
}

impl Config {
    /// Loads the TOML config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        // Expand environment variables like ${GEMINI_API_KEY}; unset ones become empty
        let expanded = shellexpand::env_with_context_no_errors(content, |var| {
            Some(std::env::var(var).unwrap_or_default())
        });
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Whether `get-env` may reveal the given variable
    pub fn is_env_exposed(&self, key: &str) -> bool {
        self.gateway.exposed_env.iter().any(|k| k == key || k == "*")
    }

    /// Human-readable description of the AI backend
    pub fn ai_description(&self) -> String {
        match &self.ai.command {
            Some(cmd) => format!("custom command ({})", cmd.join(" ")),
            None => format!("gemini ({})", self.ai.model),
        }
    }
}
