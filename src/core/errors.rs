//! TDR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, TdrError>;

/// Top-level error type for tempdir_retention.
///
/// `Io` is the filesystem failure category: directory creation, listing
/// during the historic scan, timestamp lookup, and tree removal all map to it.
#[derive(Debug, Error)]
pub enum TdrError {
    #[error("[TDR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TDR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TDR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TDR-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TDR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TDR-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl TdrError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TDR-1001",
            Self::MissingConfig { .. } => "TDR-1002",
            Self::ConfigParse { .. } => "TDR-1003",
            Self::Serialization { .. } => "TDR-2101",
            Self::Io { .. } => "TDR-3002",
            Self::Runtime { .. } => "TDR-3900",
        }
    }

    /// Whether the failure came from the filesystem.
    #[must_use]
    pub const fn is_filesystem(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for TdrError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for TdrError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<TdrError> {
        vec![
            TdrError::InvalidConfig {
                details: String::new(),
            },
            TdrError::MissingConfig {
                path: PathBuf::new(),
            },
            TdrError::ConfigParse {
                context: "",
                details: String::new(),
            },
            TdrError::Serialization {
                context: "",
                details: String::new(),
            },
            TdrError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            TdrError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(TdrError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_starts_with_bracketed_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.starts_with(&format!("[{}]", err.code())),
                "display should lead with code: {msg}"
            );
        }
    }

    #[test]
    fn only_io_is_filesystem() {
        let fs_count = all_variants()
            .iter()
            .filter(|e| e.is_filesystem())
            .count();
        assert_eq!(fs_count, 1);
    }

    #[test]
    fn io_convenience_constructor() {
        let err = TdrError::io(
            "/tmp/tmpabcTempDirCont",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "TDR-3002");
        assert!(err.to_string().contains("/tmp/tmpabcTempDirCont"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: TdrError = json_err.into();
        assert_eq!(err.code(), "TDR-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: TdrError = toml_err.into();
        assert_eq!(err.code(), "TDR-1003");
    }
}
