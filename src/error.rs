//! Error and warning types for the bundle pipeline.
//!
//! Fatal conditions stop the run and surface as [`BundleError`]. Per-module
//! problems never stop the run; they are collected as [`ModuleWarning`]s and
//! reported in the build summary.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::validate::ValidationFailure;

/// Errors that abort a bundle run.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Discovery found no candidate modules under the source root.
    #[error("no .js modules found under {}", root.display())]
    NoModules { root: PathBuf },

    /// Every discovered module was unreadable or empty.
    #[error("no modules survived assembly ({skipped} skipped)")]
    NoSurvivingModules { skipped: usize },

    /// The assembled artifact failed the parse-only check.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// An optional collaborator (lint, minify) reported a failure.
    #[error("{stage} stage failed: {message}")]
    ExternalStage { stage: &'static str, message: String },

    /// Reading or writing a pipeline file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl BundleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal per-module diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModuleWarning {
    Unreadable { identifier: String, reason: String },
    EmptyModule { identifier: String },
    ListedButMissing { identifier: String },
    Unlisted { identifier: String },
    DuplicateIdentifier { identifier: String, path: PathBuf },
    DuplicateListing { identifier: String },
    MalformedManifest { path: PathBuf, reason: String },
}

impl ModuleWarning {
    /// Whether the warning means a discovered module was left out of the artifact.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ModuleWarning::Unreadable { .. } | ModuleWarning::EmptyModule { .. }
        )
    }
}

impl fmt::Display for ModuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleWarning::Unreadable { identifier, reason } => {
                write!(f, "skipping unreadable module {}: {}", identifier, reason)
            }
            ModuleWarning::EmptyModule { identifier } => {
                write!(f, "skipping empty module {}", identifier)
            }
            ModuleWarning::ListedButMissing { identifier } => {
                write!(f, "manifest lists {} but no such module was found", identifier)
            }
            ModuleWarning::Unlisted { identifier } => {
                write!(f, "module {} is not listed in the manifest; appended", identifier)
            }
            ModuleWarning::DuplicateIdentifier { identifier, path } => write!(
                f,
                "ignoring {} because identifier {} is already taken",
                path.display(),
                identifier
            ),
            ModuleWarning::DuplicateListing { identifier } => {
                write!(f, "manifest lists {} more than once", identifier)
            }
            ModuleWarning::MalformedManifest { path, reason } => {
                write!(f, "ignoring malformed manifest {}: {}", path.display(), reason)
            }
        }
    }
}
