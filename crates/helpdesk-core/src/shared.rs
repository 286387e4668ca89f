//! Configuration shared by the core and the gateway.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file consulted when `HELPDESK_CONFIG` is not set (extension optional).
pub const DEFAULT_CONFIG_PATH: &str = "config/helpdesk";

const ENV_CONFIG_PATH: &str = "HELPDESK_CONFIG";
const ENV_PREFIX: &str = "HELPDESK";

/// Optional pre-trained intent model served by an inference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// When false the keyword matcher is the only intent source.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the inference service (`/health` and `/predict` live below it).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// `label_mappings.json` exported alongside the model (`id2label`).
    #[serde(default)]
    pub label_mappings_path: Option<String>,
    /// Predictions below this confidence fall back to keyword matching.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_confidence_threshold() -> f64 {
    crate::engine::DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            label_mappings_path: None,
            confidence_threshold: default_confidence_threshold(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Global application configuration (gateway + chatbot). Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Display name used in logs and the startup banner.
    pub app_name: String,
    /// Interface the gateway binds to.
    pub host: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Turns on debug-level logging when `RUST_LOG` is unset.
    #[serde(default)]
    pub debug: bool,
    /// JSON file with `{ intent: { patterns, responses } }`.
    pub knowledge_base_path: String,
    /// JSON array every exchange is appended to.
    pub log_path: String,
    /// Directory holding `index.html` and its assets.
    pub static_dir: String,
    /// If true, the gateway serves the chat UI from `static_dir`.
    #[serde(default)]
    pub frontend_enabled: bool,
    /// Longest accepted chat message, in characters.
    pub max_message_chars: usize,
    /// Browser origins allowed to call the API. Empty disables CORS handling.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "Customer Service Chatbot".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            debug: false,
            knowledge_base_path: "data/knowledge_base.json".to_string(),
            log_path: "conversation_logs.json".to_string(),
            static_dir: "static".to_string(),
            frontend_enabled: true,
            max_message_chars: 500,
            cors_allowed_origins: Vec::new(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl CoreConfig {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load config from file and environment. Precedence: env `HELPDESK_*` > file
    /// (`HELPDESK_CONFIG` path, else `config/helpdesk.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_path(&config_path)
    }

    /// Same layering as [`CoreConfig::load`] with an explicit file path.
    /// A missing file is not an error; the defaults and environment still apply.
    pub fn load_path(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_layers(config_path, None)
    }

    /// `env` replaces the process environment when set (keys are full variable names,
    /// e.g. `HELPDESK__PORT`).
    fn load_layers(
        config_path: &str,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let defaults = CoreConfig::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name)?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("debug", defaults.debug)?
            .set_default("knowledge_base_path", defaults.knowledge_base_path)?
            .set_default("log_path", defaults.log_path)?
            .set_default("static_dir", defaults.static_dir)?
            .set_default("frontend_enabled", defaults.frontend_enabled)?
            .set_default("max_message_chars", defaults.max_message_chars as i64)?
            .set_default("classifier.enabled", defaults.classifier.enabled)?
            .set_default(
                "classifier.confidence_threshold",
                defaults.classifier.confidence_threshold,
            )?
            .set_default("classifier.timeout_ms", defaults.classifier.timeout_ms as i64)?;

        let path = Path::new(config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder.add_source(config::File::with_name(config_path).required(false))
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .source(env),
            )
            .build()?;

        built.try_deserialize()
    }
}
