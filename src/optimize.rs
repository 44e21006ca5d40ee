//! Optional post-validation stages.
//!
//! Both paths keep the metadata header verbatim and only rewrite the body.
//! The full path can also emit a source map for the rewritten body.

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions, CodegenReturn};
use oxc_parser::Parser;
use std::path::PathBuf;

use crate::config::SourceKind;
use crate::header::split_header;
use crate::scanner::{strip_comments_with, PatternContext};
use crate::validate::source_type_for;
use crate::whitespace::normalize;

/// Minifier output, with the source map JSON when one was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minified {
    pub code: String,
    pub map: Option<String>,
}

/// A full minifier the orchestrator can hand the artifact body to.
pub trait Minifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the rewritten source, or a message describing the failure.
    fn minify(&self, source: &str) -> Result<String, String>;

    /// Like [`Minifier::minify`], plus a source map whose `sources` entry is
    /// `source_name`. Minifiers without map support return `map: None`.
    fn minify_with_map(&self, source: &str, source_name: &str) -> Result<Minified, String> {
        let _ = source_name;
        Ok(Minified {
            code: self.minify(source)?,
            map: None,
        })
    }
}

/// Re-parses with oxc and re-emits in minified (or pretty) form.
#[derive(Debug, Clone, Copy)]
pub struct OxcMinifier {
    pub kind: SourceKind,
    pub pretty: bool,
}

impl OxcMinifier {
    pub fn new(kind: SourceKind, pretty: bool) -> Self {
        Self { kind, pretty }
    }

    fn options(&self) -> CodegenOptions {
        if self.pretty {
            CodegenOptions::default()
        } else {
            CodegenOptions::minify()
        }
    }

    fn emit(&self, source: &str, options: CodegenOptions) -> Result<CodegenReturn, String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type_for(self.kind)).parse();
        if let Some(first) = ret.errors.first() {
            return Err(first.message.to_string());
        }
        Ok(Codegen::new().with_options(options).build(&ret.program))
    }
}

impl Minifier for OxcMinifier {
    fn name(&self) -> &'static str {
        "oxc"
    }

    fn minify(&self, source: &str) -> Result<String, String> {
        Ok(self.emit(source, self.options())?.code)
    }

    fn minify_with_map(&self, source: &str, source_name: &str) -> Result<Minified, String> {
        let options = CodegenOptions {
            source_map_path: Some(PathBuf::from(source_name)),
            ..self.options()
        };
        let ret = self.emit(source, options)?;
        Ok(Minified {
            code: ret.code,
            map: ret.map.map(|map| map.to_json_string()),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Comment stripping followed by whitespace normalization.
pub fn optimize_fast(artifact: &str, context: &PatternContext) -> String {
    let (header, body) = split_header(artifact);
    let body = normalize(&strip_comments_with(body, context));
    join_header(header, &body)
}

pub fn optimize_full(artifact: &str, minifier: &dyn Minifier) -> Result<String, String> {
    let (header, body) = split_header(artifact);
    let body = minifier.minify(body)?;
    Ok(join_header(header, &body))
}

/// Full path with a source map.
///
/// The body is handed over with the header lines blanked out, so original
/// positions in the map are lines of the unoptimized artifact. Generated
/// lines are shifted past the re-attached header.
pub fn optimize_full_with_map(
    artifact: &str,
    minifier: &dyn Minifier,
    source_name: &str,
) -> Result<Minified, String> {
    let (header, body) = split_header(artifact);
    let header_newlines = artifact[..artifact.len() - body.len()].matches('\n').count();
    let padded = format!("{}{}", "\n".repeat(header_newlines), body);

    let out = minifier.minify_with_map(&padded, source_name)?;
    let code = join_header(header, &out.code);
    let map = match out.map {
        Some(map) => Some(shift_generated_lines(&map, generated_offset(header))?),
        None => None,
    };
    Ok(Minified { code, map })
}

/// Lines [`join_header`] puts in front of the body.
fn generated_offset(header: Option<&str>) -> usize {
    header.map_or(0, |h| h.trim().lines().count() + 1)
}

/// Each `;` in `mappings` starts a new generated line.
fn shift_generated_lines(map_json: &str, lines: usize) -> Result<String, String> {
    if lines == 0 {
        return Ok(map_json.to_string());
    }
    let mut map: serde_json::Value =
        serde_json::from_str(map_json).map_err(|e| format!("invalid source map: {}", e))?;
    let mappings = map
        .get("mappings")
        .and_then(|m| m.as_str())
        .ok_or_else(|| "source map has no mappings".to_string())?;
    let shifted = format!("{}{}", ";".repeat(lines), mappings);
    map["mappings"] = serde_json::Value::String(shifted);
    Ok(map.to_string())
}

/// Trailing comment pointing a loader at the map file.
pub fn source_mapping_url(code: &str, map_file_name: &str) -> String {
    format!("{}//# sourceMappingURL={}\n", code, map_file_name)
}

fn join_header(header: Option<&str>, body: &str) -> String {
    match header {
        Some(header) => format!("{}\n\n{}\n", header.trim(), body.trim()),
        None => format!("{}\n", body.trim()),
    }
}
