//! Build orchestrator.
//!
//! load cache → locate & order → assemble → write → validate → lint →
//! optimize → persist cache → summary.
//!
//! A failed run leaves whatever was already written on disk; nothing is
//! rolled back. Exit codes and flag parsing belong to the caller.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::assemble::{assemble, module_at_line, read_modules, AssembledArtifact};
use crate::cache::{cache_key, ChangeCache, FileStamp};
use crate::config::{BundleConfig, OptimizeMode};
use crate::discovery::{
    locate_modules, ExclusionSet, LocatedModule, ENTRY_IDENTIFIER, HEADER_FILE, METADATA_FILE,
};
use crate::error::{BundleError, ModuleWarning};
use crate::header::{find_header, HeaderBlock};
use crate::lint::{BuiltinLinter, CommandLinter, Linter};
use crate::optimize::{
    optimize_fast, optimize_full, optimize_full_with_map, source_mapping_url, Minifier,
    OxcMinifier,
};
use crate::order::{find_manifest, order_modules, MANIFEST_CANDIDATES};
use crate::scanner::PatternContext;
use crate::validate::validate_source;

// ═══════════════════════════════════════════════════════════════════════════════
// SUMMARY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub merged: usize,
    pub skipped: usize,
    /// Modules whose (timestamp, size) differ from the previous run.
    pub changed: usize,
    pub warnings: Vec<ModuleWarning>,
    pub output: PathBuf,
    pub bytes_assembled: usize,
    pub bytes_final: usize,
    /// SHA-256 of the final artifact.
    pub digest: String,
    pub optimize: OptimizeMode,
    /// Written only on the full path with `source_map` set.
    pub source_map: Option<PathBuf>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Bundler {
    config: BundleConfig,
    pattern_context: PatternContext,
    minifier: Box<dyn Minifier>,
    linter: Option<Box<dyn Linter>>,
}

impl Bundler {
    pub fn new(config: BundleConfig) -> Self {
        let minifier = Box::new(OxcMinifier::new(config.source_kind, config.pretty));
        let linter: Box<dyn Linter> = match config
            .lint_command
            .as_deref()
            .and_then(CommandLinter::from_command)
        {
            Some(command) => Box::new(command),
            None => Box::new(BuiltinLinter {
                kind: config.source_kind,
            }),
        };
        Bundler {
            config,
            pattern_context: PatternContext::default(),
            minifier,
            linter: Some(linter),
        }
    }

    pub fn with_minifier(mut self, minifier: Box<dyn Minifier>) -> Self {
        self.minifier = minifier;
        self
    }

    pub fn with_linter(mut self, linter: Option<Box<dyn Linter>>) -> Self {
        self.linter = linter;
        self
    }

    pub fn with_pattern_context(mut self, context: PatternContext) -> Self {
        self.pattern_context = context;
        self
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn run(&self) -> Result<BuildSummary, BundleError> {
        let config = &self.config;
        let root = config.source_root.as_path();
        let cache_path = config.cache_path();
        let debug_path = config.debug_output_path();

        let mut cache = ChangeCache::load(&cache_path);

        let exclusions = ExclusionSet::for_outputs(&[config.output.as_path(), debug_path.as_path()]);
        let discovery = locate_modules(root, &exclusions)?;
        let mut warnings = discovery.warnings;
        info!(count = discovery.modules.len(), root = %root.display(), "discovered modules");

        let manifest = find_manifest(root, MANIFEST_CANDIDATES, &mut warnings);
        let ordered = order_modules(discovery.modules, manifest.as_ref(), &mut warnings);

        let observed = observe_changes(&cache, &ordered);
        let changed = observed.iter().filter(|(_, _, changed)| *changed).count();

        let header = find_header(&header_candidates(root, &ordered))
            .unwrap_or_else(|| HeaderBlock::synthesized(&config.default_name));
        debug!(origin = ?header.origin, "metadata header");

        let sources = read_modules(&ordered);
        let artifact = assemble(header, sources, &mut warnings)?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        write_file(&config.output, &artifact.text)?;
        if config.debug_copy {
            write_file(&debug_path, &artifact.text)?;
        }
        info!(
            output = %config.output.display(),
            modules = artifact.modules.len(),
            "wrote assembled artifact"
        );

        self.validate(&artifact)?;
        self.lint(&artifact)?;

        let (final_text, source_map) = self.optimize(&artifact)?;
        if final_text != artifact.text {
            write_file(&config.output, &final_text)?;
        }

        for (key, stamp, _) in observed {
            cache.record(key, stamp);
        }
        if let Err(e) = cache.persist(&cache_path) {
            warn!(error = %e, "could not persist change cache");
        }

        let summary = BuildSummary {
            merged: artifact.modules.len(),
            skipped: warnings.iter().filter(|w| w.is_skip()).count(),
            changed,
            warnings,
            output: config.output.clone(),
            bytes_assembled: artifact.text.len(),
            bytes_final: final_text.len(),
            digest: format!("{:x}", Sha256::digest(final_text.as_bytes())),
            optimize: config.optimize,
            source_map,
        };
        info!(
            merged = summary.merged,
            skipped = summary.skipped,
            changed = summary.changed,
            bytes = summary.bytes_final,
            "bundle complete"
        );
        Ok(summary)
    }

    fn validate(&self, artifact: &AssembledArtifact) -> Result<(), BundleError> {
        validate_source(&artifact.text, self.config.source_kind).map_err(|mut failure| {
            failure.module = failure
                .location
                .and_then(|loc| module_at_line(&artifact.text, loc.line));
            BundleError::Validation(failure)
        })?;
        debug!("artifact passed validation");
        Ok(())
    }

    fn lint(&self, artifact: &AssembledArtifact) -> Result<(), BundleError> {
        if self.config.skip_lint {
            debug!("lint skipped");
            return Ok(());
        }
        let Some(linter) = &self.linter else {
            return Ok(());
        };

        let findings = linter
            .lint(&self.config.output, &artifact.text)
            .map_err(|message| BundleError::ExternalStage {
                stage: "lint",
                message,
            })?;
        if findings.is_empty() {
            debug!(linter = linter.name(), "lint passed");
            return Ok(());
        }

        let message = findings
            .iter()
            .map(|f| {
                let module = module_at_line(&artifact.text, f.location.line)
                    .map(|m| format!(" in {}", m))
                    .unwrap_or_default();
                format!(
                    "{} at {}:{}{} ({})",
                    f.message, f.location.line, f.location.column, module, f.rule
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        Err(BundleError::ExternalStage {
            stage: "lint",
            message,
        })
    }

    /// Returns the final text and the map file, if one was written.
    fn optimize(
        &self,
        artifact: &AssembledArtifact,
    ) -> Result<(String, Option<PathBuf>), BundleError> {
        let config = &self.config;
        match config.optimize {
            OptimizeMode::None => Ok((artifact.text.clone(), None)),
            OptimizeMode::Fast => {
                if config.source_map {
                    debug!("source maps are only produced by the full minifier");
                }
                Ok((optimize_fast(&artifact.text, &self.pattern_context), None))
            }
            OptimizeMode::Full if config.source_map => self.minify_with_map(artifact),
            OptimizeMode::Full => {
                debug!(minifier = self.minifier.name(), "running full minifier");
                let text = optimize_full(&artifact.text, self.minifier.as_ref())
                    .map_err(minify_failed)?;
                Ok((text, None))
            }
        }
    }

    fn minify_with_map(
        &self,
        artifact: &AssembledArtifact,
    ) -> Result<(String, Option<PathBuf>), BundleError> {
        let config = &self.config;
        let map_path = config.source_map_path();
        let source_name = file_name(&config.debug_output_path());
        debug!(minifier = self.minifier.name(), "running full minifier with source map");

        let out = optimize_full_with_map(&artifact.text, self.minifier.as_ref(), &source_name)
            .map_err(minify_failed)?;
        let Some(map) = out.map else {
            warn!(minifier = self.minifier.name(), "minifier produced no source map");
            return Ok((out.code, None));
        };

        write_file(&map_path, &map)?;
        info!(map = %map_path.display(), "wrote source map");
        Ok((source_mapping_url(&out.code, &file_name(&map_path)), Some(map_path)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn minify_failed(message: String) -> BundleError {
    BundleError::ExternalStage {
        stage: "minify",
        message,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Staleness query for every module. Nothing is recorded here.
fn observe_changes(
    cache: &ChangeCache,
    modules: &[LocatedModule],
) -> Vec<(PathBuf, FileStamp, bool)> {
    modules
        .iter()
        .filter_map(|module| {
            let stamp = FileStamp::observe(&module.path).ok()?;
            let key = cache_key(&module.path);
            let changed = cache.is_changed(&key, &stamp);
            Some((key, stamp, changed))
        })
        .collect()
}

fn header_candidates(root: &Path, ordered: &[LocatedModule]) -> Vec<PathBuf> {
    let mut candidates = vec![
        root.join(METADATA_FILE),
        root.join(HEADER_FILE),
        root.join(ENTRY_IDENTIFIER),
    ];
    candidates.extend(ordered.iter().map(|m| m.path.clone()));
    candidates
}

fn write_file(path: &Path, contents: &str) -> Result<(), BundleError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BundleError::io(parent, e))?;
        }
    }
    fs::write(path, contents).map_err(|e| BundleError::io(path, e))
}

/// Run a build with the default collaborators.
pub fn run_build(config: BundleConfig) -> Result<BuildSummary, BundleError> {
    Bundler::new(config).run()
}
