//! Application configuration
//!
//! Loaded from `~/.scrutineer/config.toml`, created with defaults on first
//! run. The embedding API key is read from the environment at composition
//! time and never written to disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Embedding model identifier.
    pub embedding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: "text-embedding-004".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap carried between adjacent chunks.
    pub chunk_overlap: usize,
    /// Chunks shorter than this are dropped.
    pub min_chunk_size: usize,
    /// Pages grouped per chunking window.
    pub page_window: usize,
    /// Default number of results per query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
            min_chunk_size: 100,
            page_window: 5,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocumentsConfig {
    /// Source PDFs to ingest.
    pub sources: Vec<PathBuf>,
    /// Override for the data directory (chunks, embeddings, index snapshot).
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file, creating the default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".scrutineer").join("config.toml"))
    }

    /// Directory holding build artifacts: chunk records, embeddings, and the
    /// index snapshot.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.documents.data_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;
        Ok(home.join(".scrutineer").join("data"))
    }

    /// Read the embedding API key from the environment.
    pub fn api_key() -> Result<String> {
        env::var(API_KEY_VAR)
            .with_context(|| format!("{API_KEY_VAR} is not set"))
    }

    fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.chunk_size < 100 {
            anyhow::bail!("chunk_size too small (minimum 100)");
        }
        if r.chunk_size > 10_000 {
            anyhow::bail!("chunk_size too large (maximum 10000)");
        }
        if r.chunk_overlap >= r.chunk_size {
            anyhow::bail!("chunk_overlap must be smaller than chunk_size");
        }
        if r.page_window == 0 {
            anyhow::bail!("page_window must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            models: ModelsConfig::default(),
            retrieval: RetrievalConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }
}
