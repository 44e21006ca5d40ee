//! # Zenith Script Bundler
//!
//! Merges independent userscript modules into one deployable file under a
//! single `==UserScript==` metadata header, checks that the result parses, and
//! optionally shrinks it.
//!
//! ## Pipeline Invariants
//!
//! 1. **One Copy per Module**: Every module identifier appears at most once in
//!    the artifact, in an order fixed by the manifest (or by the default rule).
//! 2. **Header Once**: The metadata header sits at the top of the artifact and
//!    is stripped from every module body.
//! 3. **Gate Before Transform**: Nothing destructive runs on an artifact that
//!    failed the parse-only check. The pre-optimization artifact stays on disk.
//! 4. **Literals Are Untouchable**: Comment stripping and whitespace
//!    normalization never change the contents of string or pattern literals.
//! 5. **Cache Is a Hint**: The change cache feeds the report only; it never
//!    decides what is bundled.

mod assemble;
mod cache;
mod config;
mod discovery;
mod error;
mod header;
mod lint;
mod optimize;
mod order;
mod pipeline;
mod scanner;
mod validate;
mod whitespace;

#[cfg(feature = "napi")]
mod native;

#[cfg(test)]
mod pipeline_tests;

#[cfg(feature = "napi")]
pub use native::{bundle_native, strip_script_native};

// Internal Rust-to-Rust API
pub use assemble::{
    assemble, module_at_line, read_modules, separator_line, AssembledArtifact, AssembledModule,
    SourceModule,
};
pub use cache::{cache_key, ChangeCache, FileStamp};
pub use config::{BundleConfig, OptimizeMode, SourceKind, DEFAULT_CONFIG_FILE};
pub use discovery::{
    locate_modules, Discovery, ExclusionSet, LocatedModule, BUILD_TOOL_FILE, ENTRY_IDENTIFIER,
    HEADER_FILE, METADATA_FILE, MODULE_EXTENSION,
};
pub use error::{BundleError, ModuleWarning};
pub use header::{extract_header, find_header, split_header, strip_header, HeaderBlock, HeaderOrigin};
pub use lint::{BuiltinLinter, CommandLinter, LintFinding, Linter};
pub use optimize::{
    optimize_fast, optimize_full, optimize_full_with_map, source_mapping_url, Minified, Minifier,
    OxcMinifier,
};
pub use order::{
    find_manifest, order_modules, ManifestCandidate, OrderingManifest, MANIFEST_CANDIDATES,
};
pub use pipeline::{run_build, BuildSummary, Bundler};
pub use scanner::{strip_comments, strip_comments_with, PatternContext, Scanner};
pub use validate::{validate_source, SourceLocation, ValidationFailure};
pub use whitespace::{normalize, MAX_INDENT};
