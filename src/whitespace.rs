//! Whitespace normalization for comment-free script text.
//!
//! Literals on a line are swapped for placeholder tokens before any spacing is
//! touched, then restored verbatim, so only inter-token spacing and blank-line
//! density change.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Leading indentation is capped at this many columns.
pub const MAX_INDENT: usize = 8;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

lazy_static! {
    /// Single-line string literals, or a pattern literal with its leading context.
    /// Independent of the comment scanner.
    static ref LITERAL_RE: Regex = Regex::new(concat!(
        r#"(?P<str>"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`)"#,
        r"|(?P<pre>^|[=+\-*%&|^!~?:;,<>(\[{]|\b(?:return|typeof|case|do|else|in|of|instanceof|new|delete|void|throw|yield|await)\b)",
        r"(?P<ws>[ \t]*)",
        r"(?P<pat>/(?:[^/*\\\[\n]|\\.|\[(?:[^\]\\\n]|\\.)*\])(?:[^/\\\[\n]|\\.|\[(?:[^\]\\\n]|\\.)*\])*/[A-Za-z]*)",
    ))
    .unwrap();

    static ref PLACEHOLDER_RE: Regex = Regex::new("\u{E000}(\\d+)\u{E001}").unwrap();

    static ref SPACE_RUN_RE: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Normalize spacing across a document. Idempotent.
pub fn normalize(source: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0usize;

    for raw in source.split('\n') {
        let line = normalize_line(raw);
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        flush_blank_run(&mut lines, blank_run);
        blank_run = 0;
        lines.push(line);
    }
    flush_blank_run(&mut lines, blank_run);

    lines.join("\n").trim().to_string()
}

/// Runs of three or more blank lines collapse to one.
fn flush_blank_run(lines: &mut Vec<String>, run: usize) {
    let keep = if run >= 3 { 1 } else { run };
    lines.extend(std::iter::repeat(String::new()).take(keep));
}

fn normalize_line(raw: &str) -> String {
    let mut literals: Vec<String> = Vec::new();
    let protected = protect_literals(raw, &mut literals);

    let trimmed = protected.trim_end();
    let body = trimmed.trim_start_matches([' ', '\t']);
    let indent = (trimmed.len() - body.len()).min(MAX_INDENT);

    let mut line = " ".repeat(indent);
    line.push_str(&SPACE_RUN_RE.replace_all(body, " "));

    restore_literals(&line, &literals)
}

fn protect_literals(line: &str, literals: &mut Vec<String>) -> String {
    LITERAL_RE
        .replace_all(line, |caps: &Captures| {
            if let Some(s) = caps.name("str") {
                return placeholder(s.as_str(), literals);
            }
            let pre = caps.name("pre").map_or("", |m| m.as_str());
            let ws = caps.name("ws").map_or("", |m| m.as_str());
            let pat = caps.name("pat").map_or("", |m| m.as_str());
            format!("{}{}{}", pre, ws, placeholder(pat, literals))
        })
        .into_owned()
}

fn placeholder(literal: &str, literals: &mut Vec<String>) -> String {
    literals.push(literal.to_string());
    format!(
        "{}{}{}",
        PLACEHOLDER_OPEN,
        literals.len() - 1,
        PLACEHOLDER_CLOSE
    )
}

fn restore_literals(line: &str, literals: &[String]) -> String {
    if literals.is_empty() {
        return line.to_string();
    }
    PLACEHOLDER_RE
        .replace_all(line, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| literals.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
