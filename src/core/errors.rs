//! CTK-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Top-level error type for the coverage test kit.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("[CTK-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CTK-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CTK-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CTK-2001] malformed arc notation {token:?}: {details}")]
    ArcNotation { token: String, details: String },

    #[error("[CTK-2002] {class} does not run in a temp directory, cannot make {path}")]
    WorkspaceDisabled { class: String, path: PathBuf },

    #[error("[CTK-2003] unbalanced quoting in command line {line:?}")]
    ShellSyntax { line: String },

    #[error("[CTK-2101] {what}: expected {expected}, got {actual}")]
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("[CTK-2102] None of the {what} choices matched {actual}")]
    NoChoiceMatched { what: &'static str, actual: String },

    #[error("[CTK-2103] command line returned {actual}, expected {expected}")]
    StatusMismatch { expected: i32, actual: i32 },

    #[error("[CTK-2104] {details}")]
    UnexpectedOutput { details: String },

    #[error("[CTK-2105] File {path:?} should exist")]
    FileMissing { path: PathBuf },

    #[error("[CTK-2106] File {path:?} shouldn't exist")]
    FileExists { path: PathBuf },

    #[error("[CTK-2107] {what}\n--- expected\n{expected}--- actual\n{actual}")]
    ArcsDiffer {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("[CTK-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CTK-3002] module {name:?} not found on the import path {searched:?}")]
    ModuleNotFound { name: String, searched: Vec<PathBuf> },

    #[error("[CTK-3003] failed to run {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[CTK-3101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CTK-3900] measurement engine failure in {context}: {details}")]
    Engine {
        context: &'static str,
        details: String,
    },
}

impl HarnessError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CTK-1001",
            Self::MissingConfig { .. } => "CTK-1002",
            Self::ConfigParse { .. } => "CTK-1003",
            Self::ArcNotation { .. } => "CTK-2001",
            Self::WorkspaceDisabled { .. } => "CTK-2002",
            Self::ShellSyntax { .. } => "CTK-2003",
            Self::Mismatch { .. } => "CTK-2101",
            Self::NoChoiceMatched { .. } => "CTK-2102",
            Self::StatusMismatch { .. } => "CTK-2103",
            Self::UnexpectedOutput { .. } => "CTK-2104",
            Self::FileMissing { .. } => "CTK-2105",
            Self::FileExists { .. } => "CTK-2106",
            Self::ArcsDiffer { .. } => "CTK-2107",
            Self::Io { .. } => "CTK-3001",
            Self::ModuleNotFound { .. } => "CTK-3002",
            Self::Spawn { .. } => "CTK-3003",
            Self::Serialization { .. } => "CTK-3101",
            Self::Engine { .. } => "CTK-3900",
        }
    }

    /// Whether this is an expected-versus-actual failure of the system under
    /// test, as opposed to a defect in the test or its environment.
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::Mismatch { .. }
                | Self::NoChoiceMatched { .. }
                | Self::StatusMismatch { .. }
                | Self::UnexpectedOutput { .. }
                | Self::FileMissing { .. }
                | Self::FileExists { .. }
                | Self::ArcsDiffer { .. }
        )
    }

    /// Whether the test itself misused the harness.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::ArcNotation { .. }
                | Self::WorkspaceDisabled { .. }
                | Self::ShellSyntax { .. }
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

    /// Convenience constructor for an expected-versus-actual mismatch.
    #[must_use]
    pub fn mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::Mismatch {
            what: what.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for HarnessError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
