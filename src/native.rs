//! Node binding for the bundle pipeline.

use napi_derive::napi;

use crate::config::BundleConfig;
use crate::pipeline::run_build;

/// Run a build from a JSON configuration and return the JSON summary.
#[napi]
pub fn bundle_native(config_json: serde_json::Value) -> napi::Result<serde_json::Value> {
    let config: BundleConfig = serde_json::from_value(config_json)
        .map_err(|e| napi::Error::from_reason(format!("Invalid config: {}", e)))?;

    let summary = run_build(config).map_err(|e| napi::Error::from_reason(e.to_string()))?;

    serde_json::to_value(summary)
        .map_err(|e| napi::Error::from_reason(format!("Invalid summary: {}", e)))
}

/// Strip comments and normalize whitespace without touching the filesystem.
#[napi]
pub fn strip_script_native(source: String) -> String {
    crate::whitespace::normalize(&crate::scanner::strip_comments(&source))
}
