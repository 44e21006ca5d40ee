//! Assembler
//!
//! Merges the ordered modules under a single metadata header:
//!
//! ```text
//! <header>
//!
//! // ---- module: a.js ----
//! <body of a.js>
//!
//! // ---- module: b.js ----
//! <body of b.js>
//! ```

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::discovery::LocatedModule;
use crate::error::{BundleError, ModuleWarning};
use crate::header::{strip_header, HeaderBlock};

lazy_static! {
    static ref SEPARATOR_RE: Regex = Regex::new(r"^// ---- module: (.+) ----$").unwrap();
}

/// One module file with its text. Immutable once read.
#[derive(Debug, Clone)]
pub struct SourceModule {
    pub identifier: String,
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct AssembledModule {
    pub identifier: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct AssembledArtifact {
    pub header: HeaderBlock,
    pub modules: Vec<AssembledModule>,
    pub text: String,
}

impl AssembledArtifact {
    /// Everything after the header.
    pub fn body(&self) -> String {
        self.modules
            .iter()
            .map(|m| format!("{}\n{}", separator_line(&m.identifier), m.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub fn separator_line(identifier: &str) -> String {
    format!("// ---- module: {} ----", identifier)
}

/// Read every module. Reads run in parallel; results keep the input order.
pub fn read_modules(
    located: &[LocatedModule],
) -> Vec<Result<SourceModule, ModuleWarning>> {
    located
        .par_iter()
        .map(|module| {
            fs::read_to_string(&module.path)
                .map(|text| SourceModule {
                    identifier: module.identifier.clone(),
                    path: module.path.clone(),
                    text,
                })
                .map_err(|e| ModuleWarning::Unreadable {
                    identifier: module.identifier.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Combine the header with the module bodies. Unreadable and empty modules
/// are skipped with a warning; if none survive the result is an error.
pub fn assemble(
    header: HeaderBlock,
    modules: Vec<Result<SourceModule, ModuleWarning>>,
    warnings: &mut Vec<ModuleWarning>,
) -> Result<AssembledArtifact, BundleError> {
    let mut assembled = Vec::with_capacity(modules.len());
    let mut skipped = 0;

    for module in modules {
        let module = match module {
            Ok(m) => m,
            Err(warning) => {
                skipped += 1;
                warnings.push(warning);
                continue;
            }
        };

        let body = strip_header(&module.text).trim().to_string();
        if body.is_empty() {
            skipped += 1;
            warnings.push(ModuleWarning::EmptyModule {
                identifier: module.identifier,
            });
            continue;
        }

        debug!(module = %module.identifier, bytes = body.len(), "assembled module");
        assembled.push(AssembledModule {
            identifier: module.identifier,
            body,
        });
    }

    if assembled.is_empty() {
        return Err(BundleError::NoSurvivingModules { skipped });
    }

    let mut artifact = AssembledArtifact {
        header,
        modules: assembled,
        text: String::new(),
    };
    artifact.text = format!("{}\n\n{}\n", artifact.header.text, artifact.body());
    Ok(artifact)
}

/// Identifier of the module section containing 1-based `line` of an
/// assembled artifact.
pub fn module_at_line(artifact: &str, line: u32) -> Option<String> {
    artifact
        .lines()
        .take(line as usize)
        .filter_map(|l| SEPARATOR_RE.captures(l.trim_end()))
        .last()
        .map(|caps| caps[1].to_string())
}
