//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TdrError};

/// Suffix that identifies directories created by this tool.
pub const DEFAULT_SUFFIX: &str = "TempDirCont";
/// Leading component of generated directory names.
pub const DEFAULT_PREFIX: &str = "tmp";
/// Directories retained per key before the oldest are purged.
pub const DEFAULT_KEEP_MAX: usize = 3;

/// Full TDR configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
    /// Where this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Naming, placement and retention policy for scoped directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionConfig {
    pub prefix: String,
    pub suffix: String,
    /// Parent directory; `None` means the platform temp root.
    pub root: Option<PathBuf>,
    pub keep_max: usize,
    /// When false, exits queue directories but never delete them.
    pub delete_historic: bool,
}

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSONL activity log path; `None` disables the log.
    pub jsonl_log: Option<PathBuf>,
    pub max_log_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            root: None,
            keep_max: DEFAULT_KEEP_MAX,
            delete_historic: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_log: None,
            max_log_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[TDR-CONFIG] WARNING: HOME not set, falling back to /tmp for config");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        home_dir.join(".config").join("tdr").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| TdrError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if is_explicit_path {
            return Err(TdrError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without touching env or validating.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("TDR_RETENTION_PREFIX") {
            self.retention.prefix = raw;
        }
        if let Some(raw) = lookup("TDR_RETENTION_SUFFIX") {
            self.retention.suffix = raw;
        }
        if let Some(raw) = lookup("TDR_RETENTION_ROOT") {
            self.retention.root = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("TDR_RETENTION_KEEP_MAX") {
            self.retention.keep_max = parse_env_usize("TDR_RETENTION_KEEP_MAX", &raw)?;
        }
        if let Some(raw) = lookup("TDR_RETENTION_DELETE_HISTORIC") {
            self.retention.delete_historic =
                parse_env_bool("TDR_RETENTION_DELETE_HISTORIC", &raw)?;
        }
        if let Some(raw) = lookup("TDR_LOGGING_JSONL_LOG") {
            self.logging.jsonl_log = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("prefix", &self.retention.prefix),
            ("suffix", &self.retention.suffix),
        ] {
            if val.contains('/') || val.contains(std::path::MAIN_SEPARATOR) {
                return Err(TdrError::InvalidConfig {
                    details: format!("retention.{name} must not contain a path separator: {val:?}"),
                });
            }
        }

        if let Some(root) = &self.retention.root
            && root.as_os_str().is_empty()
        {
            return Err(TdrError::InvalidConfig {
                details: "retention.root must not be empty when set".to_string(),
            });
        }

        if self.logging.max_log_bytes == 0 {
            return Err(TdrError::InvalidConfig {
                details: "logging.max_log_bytes must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|error| TdrError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| TdrError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
