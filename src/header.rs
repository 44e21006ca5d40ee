//! Metadata header discovery.
//!
//! The header is the `==UserScript==` directive block. It is located in the
//! first candidate file that carries one, kept verbatim at the top of the
//! artifact, and stripped from every module body so it appears once.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    /// `// ==UserScript==` ... `// ==/UserScript==`
    static ref LINE_HEADER_RE: Regex = Regex::new(
        r"(?ms)^[ \t]*//[ \t]*==UserScript==[ \t]*\r?$.*?^[ \t]*//[ \t]*==/UserScript==[^\n]*"
    )
    .unwrap();

    /// `/* ==UserScript==` ... `==/UserScript== */`
    static ref BLOCK_HEADER_RE: Regex =
        Regex::new(r"(?s)/\*+\s*==UserScript==.*?==/UserScript==\s*\*+/").unwrap();
}

/// Where the header was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOrigin {
    File(PathBuf),
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    pub text: String,
    pub origin: HeaderOrigin,
}

impl HeaderBlock {
    /// Minimal header used when no candidate carries one.
    pub fn synthesized(name: &str) -> Self {
        let text = [
            "// ==UserScript==".to_string(),
            format!("// @name         {}", name),
            "// @version      0.0.0".to_string(),
            "// @match        *://*/*".to_string(),
            "// @grant        none".to_string(),
            "// ==/UserScript==".to_string(),
        ]
        .join("\n");
        HeaderBlock {
            text,
            origin: HeaderOrigin::Synthesized,
        }
    }
}

/// Extract the first header block from `source`, whichever marker style
/// appears first.
pub fn extract_header(source: &str) -> Option<String> {
    let line = LINE_HEADER_RE.find(source);
    let block = BLOCK_HEADER_RE.find(source);
    let found = match (line, block) {
        (Some(l), Some(b)) => Some(if l.start() <= b.start() { l } else { b }),
        (l, b) => l.or(b),
    };
    found.map(|m| m.as_str().trim().to_string())
}

/// Remove every header block from a module body.
pub fn strip_header(source: &str) -> String {
    let without_line = LINE_HEADER_RE.replace_all(source, "");
    BLOCK_HEADER_RE.replace_all(&without_line, "").into_owned()
}

/// Try each candidate in order and return the first header found.
pub fn find_header(candidates: &[PathBuf]) -> Option<HeaderBlock> {
    candidates.iter().find_map(|path| header_from_file(path))
}

fn header_from_file(path: &Path) -> Option<HeaderBlock> {
    let source = fs::read_to_string(path).ok()?;
    extract_header(&source).map(|text| HeaderBlock {
        text,
        origin: HeaderOrigin::File(path.to_path_buf()),
    })
}

/// Split an artifact into its leading header block and the rest.
pub fn split_header(artifact: &str) -> (Option<&str>, &str) {
    let leading = artifact.trim_start();
    let offset = artifact.len() - leading.len();
    for re in [&*LINE_HEADER_RE, &*BLOCK_HEADER_RE] {
        if let Some(m) = re.find(leading) {
            if m.start() == 0 {
                let end = offset + m.end();
                return (Some(&artifact[offset..end]), &artifact[end..]);
            }
        }
    }
    (None, artifact)
}
