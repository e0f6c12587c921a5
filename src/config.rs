//! Configuration for clinflow paths and the inference backend.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CLINFLOW_HOME, CLINFLOW_MODEL, CLINFLOW_API_KEY,
//!    CLINFLOW_DRY_RUN)
//! 2. Config file (.clinflow/config.yaml)
//! 3. Defaults (~/.clinflow, default model, dry-run off)
//!
//! Config file discovery:
//! - Searches current directory and parents for .clinflow/config.yaml
//! - The home path in the config file is relative to the .clinflow directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
    #[serde(default)]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory holding audit logs (relative to config file)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to clinflow home (audit logs and state)
    pub home: PathBuf,
    /// Inference model identifier
    pub model: Option<String>,
    /// Inference API key
    pub api_key: Option<String>,
    /// Whether new sessions start in dry-run mode
    pub dry_run: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".clinflow").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "on" | "yes"))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".clinflow");

    let config_file = find_config_file();
    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let home = if let Ok(env_home) = std::env::var("CLINFLOW_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.paths.home.as_ref()) {
        // home is relative to the .clinflow directory
        let base = config_file
            .as_ref()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(base, home_path)
    } else {
        default_home
    };

    let model = std::env::var("CLINFLOW_MODEL").ok().or_else(|| {
        file.as_ref()
            .and_then(|f| f.inference.as_ref())
            .and_then(|i| i.model.clone())
    });

    let api_key = std::env::var("CLINFLOW_API_KEY").ok().or_else(|| {
        file.as_ref()
            .and_then(|f| f.inference.as_ref())
            .and_then(|i| i.api_key.clone())
    });

    let dry_run = env_flag("CLINFLOW_DRY_RUN")
        .or(file.as_ref().and_then(|f| f.dry_run))
        .unwrap_or(false);

    Ok(ResolvedConfig {
        home,
        model,
        api_key,
        dry_run,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the audit log directory ($CLINFLOW_HOME/logs)
pub fn logs_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("logs"))
}
