use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

use crate::store::DEFAULT_BATCH_SIZE;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "ocrvar";
const DEFAULT_LOG_FILE: &str = "ocr_training.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File the settings came from, if any.
    pub config_path: Option<PathBuf>,
    /// Directory scanned for `*.sqlite` files.
    pub search_dir: PathBuf,
    pub log_file: PathBuf,
    pub batch_size: usize,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        let search_dir = PathBuf::from(".");
        Self {
            config_path: None,
            log_file: search_dir.join(DEFAULT_LOG_FILE),
            search_dir,
            batch_size: DEFAULT_BATCH_SIZE,
            progress: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    search_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    batch_size: Option<usize>,
    progress: Option<bool>,
}

pub fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().ok_or_else(|| anyhow!("unable to determine config directory"))?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load `explicit` if given (it must exist), otherwise the default config
/// file if present, otherwise built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => match config_path() {
            Ok(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    let mut config = parse(&raw)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

fn parse(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("invalid TOML")?;
    warn_unknown_keys(&value);

    let file: ConfigFile = value.try_into().context("invalid configuration")?;

    let batch_size = file.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
    if batch_size == 0 {
        bail!("`batch_size` must be at least 1");
    }

    let search_dir = file.search_dir.unwrap_or_else(|| PathBuf::from("."));
    let log_file = file
        .log_file
        .unwrap_or_else(|| search_dir.join(DEFAULT_LOG_FILE));

    Ok(Config {
        config_path: None,
        search_dir,
        log_file,
        batch_size,
        progress: file.progress.unwrap_or(true),
    })
}

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["search_dir", "log_file", "batch_size", "progress"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            eprintln!("warning: unknown configuration key `{}`", key);
        }
    }
}
