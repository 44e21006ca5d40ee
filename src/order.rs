//! Module ordering.
//!
//! An ordering manifest, if one exists, decides the order; otherwise the entry
//! module goes first and the rest follow by identifier.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::discovery::{LocatedModule, ENTRY_IDENTIFIER};
use crate::error::ModuleWarning;

/// Declared module order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingManifest {
    pub source: PathBuf,
    pub identifiers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonManifest {
    List(Vec<String>),
    Object { modules: Vec<String> },
}

/// One way of finding a manifest. Candidates are tried in order; the first
/// that exists wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestCandidate {
    Json(&'static str),
    Lines(&'static str),
}

pub const MANIFEST_CANDIDATES: &[ManifestCandidate] = &[
    ManifestCandidate::Json("order.json"),
    ManifestCandidate::Lines("order.txt"),
];

impl ManifestCandidate {
    fn file_name(&self) -> &'static str {
        match self {
            ManifestCandidate::Json(name) | ManifestCandidate::Lines(name) => name,
        }
    }

    /// `None` when the file does not exist.
    fn resolve(&self, root: &Path) -> Option<Result<OrderingManifest, ModuleWarning>> {
        let path = root.join(self.file_name());
        if !path.is_file() {
            return None;
        }

        let malformed = |reason: String| ModuleWarning::MalformedManifest {
            path: path.clone(),
            reason,
        };

        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) => return Some(Err(malformed(e.to_string()))),
        };

        let identifiers = match self {
            ManifestCandidate::Json(_) => match serde_json::from_str::<JsonManifest>(&data) {
                Ok(JsonManifest::List(ids)) | Ok(JsonManifest::Object { modules: ids }) => ids,
                Err(e) => return Some(Err(malformed(e.to_string()))),
            },
            ManifestCandidate::Lines(_) => parse_line_manifest(&data),
        };

        Some(Ok(OrderingManifest {
            source: path,
            identifiers,
        }))
    }
}

fn parse_line_manifest(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Find the first manifest candidate under `root`. Malformed candidates are
/// reported and skipped.
pub fn find_manifest(
    root: &Path,
    candidates: &[ManifestCandidate],
    warnings: &mut Vec<ModuleWarning>,
) -> Option<OrderingManifest> {
    for candidate in candidates {
        match candidate.resolve(root) {
            Some(Ok(manifest)) => {
                debug!(path = %manifest.source.display(), "using ordering manifest");
                return Some(manifest);
            }
            Some(Err(warning)) => warnings.push(warning),
            None => {}
        }
    }
    None
}

/// Order discovered modules. Deterministic for a given manifest and module set.
pub fn order_modules(
    mut modules: Vec<LocatedModule>,
    manifest: Option<&OrderingManifest>,
    warnings: &mut Vec<ModuleWarning>,
) -> Vec<LocatedModule> {
    modules.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    let Some(manifest) = manifest else {
        if let Some(pos) = modules.iter().position(|m| m.identifier == ENTRY_IDENTIFIER) {
            let entry = modules.remove(pos);
            modules.insert(0, entry);
        }
        return modules;
    };

    let mut ordered = Vec::with_capacity(modules.len());
    let mut placed: HashSet<String> = HashSet::new();

    for listed in &manifest.identifiers {
        let found = modules
            .iter()
            .find(|m| &m.identifier == listed || &m.relative == listed);
        match found {
            Some(module) if placed.contains(&module.identifier) => {
                warnings.push(ModuleWarning::DuplicateListing {
                    identifier: listed.clone(),
                });
            }
            Some(module) => {
                placed.insert(module.identifier.clone());
                ordered.push(module.clone());
            }
            None => warnings.push(ModuleWarning::ListedButMissing {
                identifier: listed.clone(),
            }),
        }
    }

    for module in modules {
        if !placed.contains(&module.identifier) {
            warnings.push(ModuleWarning::Unlisted {
                identifier: module.identifier.clone(),
            });
            ordered.push(module);
        }
    }

    ordered
}
