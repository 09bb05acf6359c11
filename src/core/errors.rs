//! FQA-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, QaError>;

/// Top-level error type for the fraud QA pipeline.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("[FQA-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FQA-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FQA-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FQA-2001] test case source {source_name} failed: {details}")]
    SourceFailure {
        source_name: &'static str,
        details: String,
    },

    #[error("[FQA-2002] unusable LLM response: {details}")]
    LlmResponse { details: String },

    #[error("[FQA-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FQA-2201] QA cycle invariant violated: {details}")]
    CycleInvariant { details: String },

    #[error("[FQA-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FQA-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[FQA-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl QaError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FQA-1001",
            Self::MissingConfig { .. } => "FQA-1002",
            Self::ConfigParse { .. } => "FQA-1003",
            Self::SourceFailure { .. } => "FQA-2001",
            Self::LlmResponse { .. } => "FQA-2002",
            Self::Serialization { .. } => "FQA-2101",
            Self::CycleInvariant { .. } => "FQA-2201",
            Self::Io { .. } => "FQA-3002",
            Self::ChannelClosed { .. } => "FQA-3003",
            Self::Runtime { .. } => "FQA-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::SourceFailure { .. }
                | Self::Runtime { .. }
        )
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

impl From<serde_json::Error> for QaError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for QaError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
