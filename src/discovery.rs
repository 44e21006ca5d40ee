//! Discovery Module
//!
//! Recursively scans the source root for `.js` modules, skipping the build's
//! own files: the output artifacts, the header files and the build script.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::{BundleError, ModuleWarning};

pub const MODULE_EXTENSION: &str = "js";
pub const ENTRY_IDENTIFIER: &str = "main.js";
pub const METADATA_FILE: &str = "meta.js";
pub const BUILD_TOOL_FILE: &str = "build.js";
/// Optional header-only file, tried after the metadata file.
pub const HEADER_FILE: &str = "header.js";

/// A discovered module file, before its text is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedModule {
    /// File name, unique within one run.
    pub identifier: String,
    /// Path relative to the source root, `/`-separated.
    pub relative: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub modules: Vec<LocatedModule>,
    pub warnings: Vec<ModuleWarning>,
}

/// File names never treated as modules.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    /// The fixed set plus the file names of the build outputs.
    pub fn for_outputs(outputs: &[&Path]) -> Self {
        let mut names: HashSet<String> = [METADATA_FILE, HEADER_FILE, BUILD_TOOL_FILE]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for output in outputs {
            if let Some(name) = output.file_name() {
                names.insert(name.to_string_lossy().to_string());
            }
        }
        Self { names }
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.names.contains(file_name)
    }
}

/// Collect every module under `root`. Zero modules is fatal.
pub fn locate_modules(root: &Path, exclusions: &ExclusionSet) -> Result<Discovery, BundleError> {
    let mut discovery = Discovery::default();
    let mut seen: HashSet<String> = HashSet::new();

    for path in find_module_files(root) {
        let identifier = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if exclusions.contains(&identifier) {
            continue;
        }
        if !seen.insert(identifier.clone()) {
            discovery
                .warnings
                .push(ModuleWarning::DuplicateIdentifier { identifier, path });
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        discovery.modules.push(LocatedModule {
            identifier,
            relative,
            path,
        });
    }

    if discovery.modules.is_empty() {
        return Err(BundleError::NoModules {
            root: root.to_path_buf(),
        });
    }

    Ok(discovery)
}

/// Recursively find all .js files in a directory, in a stable order
fn find_module_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext == MODULE_EXTENSION {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "node_modules"
}
