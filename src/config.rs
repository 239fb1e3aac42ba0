//! Configuration module for the debate search store.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DS_` and use double underscores
//! to separate nested levels:
//! - `DS_STORE__DIMENSION=1024` sets `store.dimension`
//! - `DS_SEARCH__VECTOR_K=20` sets `search.vector_k`
//! - `DS_LOGGING__JSON=true` sets `logging.json`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vector::VECTOR_DIMENSION_1024;

/// Directory holding the settings file, data and media.
pub const CONFIG_DIR: &str = ".debate-search";

const ENV_PREFIX: &str = "DS_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the database and the index snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root directory that canonical image paths are relative to
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Workspace root directory (where .debate-search is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Embedding dimension; fixed for the lifetime of a store
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Relational file name inside `data_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Index snapshot file name inside `data_dir`
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Number of image hits fetched for debate-level search
    #[serde(default = "default_vector_k")]
    pub vector_k: usize,

    /// Default number of results for image-level search
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Debates must score strictly above this to count as relevant
    #[serde(default)]
    pub minimum_score: f32,

    /// Return every debate with its score instead of only relevant ones
    #[serde(default)]
    pub include_all: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// fastembed model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded models are cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("data")
}
fn default_media_root() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("media")
}
fn default_dimension() -> usize {
    VECTOR_DIMENSION_1024
}
fn default_database_file() -> String {
    "vectors.db".to_string()
}
fn default_index_file() -> String {
    "vectors.vec".to_string()
}
fn default_vector_k() -> usize {
    20
}
fn default_k() -> usize {
    5
}
fn default_embedding_model() -> String {
    "BGELargeENV15".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            media_root: default_media_root(),
            workspace_root: None,
            debug: false,
            store: StoreConfig::default(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            database_file: default_database_file(),
            index_file: default_index_file(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_k: default_vector_k(),
            default_k: default_k(),
            minimum_score: 0.0,
            include_all: false,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::load_from(config_path).map(|mut settings| {
            if settings.workspace_root.is_none() {
                settings.workspace_root = Self::workspace_root();
            }
            settings
        })
    }

    /// Load configuration from a specific file, still honoring `DS_` variables
    ///
    /// A file inside a `.debate-search` directory makes that directory's
    /// parent the workspace root, so relative paths resolve the same way no
    /// matter where the command runs.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();
        let mut settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)?;

        if settings.workspace_root.is_none() {
            settings.workspace_root = path
                .parent()
                .filter(|dir| dir.file_name().is_some_and(|name| name == CONFIG_DIR))
                .and_then(Path::parent)
                .filter(|root| !root.as_os_str().is_empty())
                .map(Path::to_path_buf);
        }

        Ok(settings)
    }

    /// Find the settings file by walking up from the current directory
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .debate-search is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Cannot read configuration file: {e}"))?;
        toml::from_str::<Settings>(&content).map_err(|e| {
            format!(
                "Configuration file is corrupted: {e}\nRun 'debate-search init --force' to regenerate."
            )
        })?;

        Ok(())
    }

    /// Resolve a configured path against the workspace root
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Directory holding the database and index snapshot
    pub fn data_path(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_path().join(&self.store.database_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_path().join(&self.store.index_file)
    }

    pub fn media_path(&self) -> PathBuf {
        self.resolve(&self.media_root)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# Debate Search Configuration File

# Version of the configuration schema
version = 1

# Database and index snapshot live here (relative to workspace root)
data_dir = "{data_dir}"

# Image paths are stored relative to this directory
media_root = "{media_root}"

# Global debug mode
debug = false

[store]
# Embedding dimension. Changing it requires 'debate-search reset --yes'
dimension = {dimension}
database_file = "{database_file}"
index_file = "{index_file}"

[search]
# Image hits considered when ranking debates
vector_k = {vector_k}
# Default result count for 'debate-search search'
default_k = {default_k}
# Debates must score strictly above this value
minimum_score = 0.0
# Return all debates with their scores
include_all = false

[embedding]
# fastembed model with {dimension}-dimensional output
model = "{model}"
# cache_dir = "~/.cache/debate-search/models"

[logging]
# Overridden by RUST_LOG when set
filter = "{filter}"
json = false
"#,
            data_dir = default_data_dir().display(),
            media_root = default_media_root().display(),
            dimension = default_dimension(),
            database_file = default_database_file(),
            index_file = default_index_file(),
            vector_k = default_vector_k(),
            default_k = default_k(),
            model = default_embedding_model(),
            filter = default_log_filter(),
        );

        std::fs::write(&config_path, template)?;
        std::fs::create_dir_all(default_media_root())?;

        Ok(config_path)
    }
}
