//! Configuration management for docchat.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.docchat/config.yaml` in the workspace, or an explicit path)
//! - Environment variables
//! - Command-line flags
//!
//! Session-scoped state (conversation memory, result cache) is never persisted;
//! the workspace only holds configuration and prompt overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama"];

/// Retrieval backends the store factory knows how to build.
pub const KNOWN_BACKENDS: &[&str] = &["jsonl", "chroma"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider (e.g., "ollama")
    pub provider: String,

    /// Model identifier used for generation
    pub model: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Conversation session tuning
    pub session: SessionConfig,

    /// Vector store connection
    pub retrieval: RetrievalConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub endpoint: Option<String>,

    /// Model served by this provider
    pub model: String,

    /// Request timeout in seconds, enforced by the provider client
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Conversation session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Maximum exchanges kept in conversation memory
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Maximum retrieval results kept in the result cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Passages requested per retrieval
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Sampling temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_memory_capacity() -> usize {
    3
}

fn default_cache_capacity() -> usize {
    32
}

fn default_top_k() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            memory_capacity: default_memory_capacity(),
            cache_capacity: default_cache_capacity(),
            top_k: default_top_k(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Vector store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Backend name: "jsonl" or "chroma"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// JSONL corpus export, relative to the workspace unless absolute
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// Chroma server URL
    #[serde(default = "default_chroma_endpoint")]
    pub endpoint: String,

    /// Chroma collection holding the indexed documents
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Ollama URL used to embed queries for Chroma
    #[serde(default = "default_embedding_endpoint")]
    pub embedding_endpoint: String,

    /// Embedding model; must match the one the index was built with
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_backend() -> String {
    "jsonl".to_string()
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("corpus.jsonl")
}

fn default_chroma_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_collection() -> String {
    "pdf_documents".to_string()
}

fn default_embedding_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            corpus_path: default_corpus_path(),
            endpoint: default_chroma_endpoint(),
            collection: default_collection(),
            embedding_endpoint: default_embedding_endpoint(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl RetrievalConfig {
    /// Resolve the corpus path against the workspace.
    pub fn resolve_corpus_path(&self, workspace: &Path) -> PathBuf {
        if self.corpus_path.is_absolute() {
            self.corpus_path.clone()
        } else {
            workspace.join(&self.corpus_path)
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    session: Option<SessionConfig>,
    retrieval: Option<RetrievalConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            session: SessionConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file and defaults.
    ///
    /// Environment variables:
    /// - `DOCCHAT_WORKSPACE`: Override workspace path
    /// - `DOCCHAT_CONFIG`: Path to config file
    /// - `DOCCHAT_PROVIDER`: LLM provider
    /// - `DOCCHAT_MODEL`: Model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file.
    ///
    /// Explicit arguments win over `DOCCHAT_WORKSPACE` / `DOCCHAT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("DOCCHAT_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("DOCCHAT_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.docchat_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCCHAT_MODEL") {
            config.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(session) = config_file.session {
            result.session = session;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model.clone();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docchat directory.
    pub fn docchat_dir(&self) -> PathBuf {
        self.workspace.join(".docchat")
    }

    /// Get the configuration of a provider, if the config file declares one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint of the active provider, if configured.
    pub fn provider_endpoint(&self) -> Option<&str> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.endpoint.as_deref())
    }

    /// Timeout of the active provider, if configured.
    pub fn provider_timeout(&self) -> Option<u64> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.timeout)
    }

    /// Validate configuration before starting a session.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_BACKENDS.contains(&self.retrieval.backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown retrieval backend: {}. Supported: {}",
                self.retrieval.backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }

        if self.session.memory_capacity == 0 {
            return Err(AppError::Config(
                "session.memoryCapacity must be at least 1".to_string(),
            ));
        }

        if self.session.cache_capacity == 0 {
            return Err(AppError::Config(
                "session.cacheCapacity must be at least 1".to_string(),
            ));
        }

        if self.session.top_k == 0 {
            return Err(AppError::Config("session.topK must be at least 1".to_string()));
        }

        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}
