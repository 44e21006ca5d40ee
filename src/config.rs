//! Bundle configuration.
//!
//! Loaded from `bundle.toml` (snake_case keys) or handed in as JSON by the Node
//! binding (camelCase keys). Every field has a default, so an absent file is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BundleError;

pub const DEFAULT_CONFIG_FILE: &str = "bundle.toml";
pub const DEFAULT_OUTPUT: &str = "dist/bundle.user.js";
pub const DEFAULT_CACHE_FILE: &str = ".bundle-cache.json";

/// Which optional stage runs after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeMode {
    #[default]
    None,
    /// Comment stripping + whitespace normalization.
    Fast,
    /// Hand-off to a full minifier.
    Full,
}

/// How the validation gate and the minifier parse the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Script,
    Module,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(deserialize = "camelCase"), deny_unknown_fields)]
pub struct BundleConfig {
    #[serde(alias = "source_root")]
    pub source_root: PathBuf,
    pub output: PathBuf,
    #[serde(alias = "cache_file")]
    pub cache_file: Option<PathBuf>,
    pub optimize: OptimizeMode,
    pub pretty: bool,
    /// With `optimize = "full"`, also write `<output>.map`.
    #[serde(alias = "source_map")]
    pub source_map: bool,
    #[serde(alias = "debug_copy")]
    pub debug_copy: bool,
    #[serde(alias = "skip_lint")]
    pub skip_lint: bool,
    /// External lint command; the artifact path is appended as the last argument.
    #[serde(alias = "lint_command")]
    pub lint_command: Option<Vec<String>>,
    #[serde(alias = "source_kind")]
    pub source_kind: SourceKind,
    /// `@name` used when no metadata header is found.
    #[serde(alias = "default_name")]
    pub default_name: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        BundleConfig {
            source_root: PathBuf::from("src"),
            output: PathBuf::from(DEFAULT_OUTPUT),
            cache_file: None,
            optimize: OptimizeMode::None,
            pretty: false,
            source_map: false,
            debug_copy: false,
            skip_lint: false,
            lint_command: None,
            source_kind: SourceKind::Script,
            default_name: "bundle".to_string(),
        }
    }
}

impl BundleConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;
        Self::from_toml_str(&data).map_err(|reason| BundleError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml_str(data: &str) -> Result<Self, String> {
        toml::from_str(data).map_err(|e| e.to_string())
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.source_root.join(DEFAULT_CACHE_FILE))
    }

    /// `dist/bundle.user.js` maps to `dist/bundle.user.js.map`.
    pub fn source_map_path(&self) -> PathBuf {
        let mut name = self
            .output
            .file_name()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "bundle".into());
        name.push(".map");
        self.output.with_file_name(name)
    }

    /// Path of the unoptimized copy written when `debug_copy` is set:
    /// `dist/bundle.user.js` becomes `dist/bundle.user.debug.js`.
    pub fn debug_output_path(&self) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "bundle".to_string());
        let file_name = match self.output.extension() {
            Some(ext) => format!("{}.debug.{}", stem, ext.to_string_lossy()),
            None => format!("{}.debug", stem),
        };
        self.output.with_file_name(file_name)
    }
}
