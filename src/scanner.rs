//! # Comment Scanner
//!
//! Removes line and block comments from script text while reproducing every
//! string and pattern (regex) literal byte for byte. This is a character-level
//! automaton, not a parser.
//!
//! ## Scanner Invariants
//!
//! 1. **Literal Preservation**: Characters inside an active string or pattern
//!    literal are emitted unchanged, including escapes and pattern flags.
//! 2. **Line-Scoped Literals**: String and pattern state ends at a line break.
//!    Only "inside a block comment" carries over to the next line.
//! 3. **Idempotence**: Scanning output that contains no comments returns it
//!    unchanged.
//!
//! ## Division vs. Pattern Literal
//!
//! A `/` in code opens a pattern literal only when the last non-space text
//! already emitted is an operator, an opening bracket, a comma, or one of a
//! small set of keywords (see [`PatternContext`]). Anything else, including a
//! closing parenthesis, reads as division. Template literals spanning several
//! lines are not tracked.

// ═══════════════════════════════════════════════════════════════════════════════
// PATTERN CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Quote characters that open a string literal.
const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Trailing context after which a `/` is read as the start of a pattern literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternContext {
    pub operators: Vec<char>,
    pub keywords: Vec<String>,
}

impl Default for PatternContext {
    fn default() -> Self {
        PatternContext {
            operators: "=+-*%&|^!~?:;,<>([{".chars().collect(),
            keywords: [
                "return",
                "typeof",
                "case",
                "do",
                "else",
                "in",
                "of",
                "instanceof",
                "new",
                "delete",
                "void",
                "throw",
                "yield",
                "await",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl PatternContext {
    /// Whether a `/` following `emitted` opens a pattern literal.
    pub fn allows_pattern(&self, emitted: &str) -> bool {
        let trimmed = emitted.trim_end();
        let Some(last) = trimmed.chars().last() else {
            return true;
        };
        if self.operators.contains(&last) {
            return true;
        }
        if !is_ident_char(last) {
            return false;
        }

        let start = trimmed
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_ident_char(*c))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        let word = &trimmed[start..];
        // `obj.return / x` is a property, not the keyword
        if trimmed[..start].ends_with('.') {
            return false;
        }
        self.keywords.iter().any(|k| k == word)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    String(char),
    Pattern { in_class: bool },
}

/// Per-call scanner state. Only `in_block_comment` survives a line break.
pub struct Scanner<'c> {
    context: &'c PatternContext,
    in_block_comment: bool,
    out: String,
}

impl<'c> Scanner<'c> {
    pub fn new(context: &'c PatternContext) -> Self {
        Scanner {
            context,
            in_block_comment: false,
            out: String::new(),
        }
    }

    /// Scan a whole document and return the comment-free text.
    pub fn scan(mut self, source: &str) -> String {
        self.out.reserve(source.len());
        let mut first_line = true;

        for line in source.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            let mut start = 0;

            if self.in_block_comment {
                match find_block_close(&chars, 0) {
                    Some(end) => {
                        self.in_block_comment = false;
                        start = end;
                    }
                    // Fully inside the comment: contributes nothing.
                    None => continue,
                }
            }

            if !first_line {
                self.out.push('\n');
            }
            first_line = false;
            self.scan_line(&chars, start);
        }

        self.out
    }

    fn scan_line(&mut self, chars: &[char], start: usize) {
        let mut mode = Mode::Code;
        let mut i = start;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            match mode {
                Mode::Code => {
                    if QUOTES.contains(&c) {
                        mode = Mode::String(c);
                        self.out.push(c);
                        i += 1;
                    } else if c == '/'
                        && next != Some('/')
                        && next != Some('*')
                        && self.context.allows_pattern(&self.out)
                    {
                        mode = Mode::Pattern { in_class: false };
                        self.out.push(c);
                        i += 1;
                    } else if c == '/' && next == Some('*') {
                        match find_block_close(chars, i + 2) {
                            Some(end) => {
                                self.out.push(' ');
                                i = end;
                            }
                            None => {
                                self.in_block_comment = true;
                                self.keep_carriage_return(chars);
                                return;
                            }
                        }
                    } else if c == '/' && next == Some('/') {
                        self.keep_carriage_return(chars);
                        return;
                    } else {
                        self.out.push(c);
                        i += 1;
                    }
                }
                Mode::String(delimiter) => {
                    i += self.emit_char_or_escape(c, next);
                    if c == delimiter {
                        mode = Mode::Code;
                    }
                }
                Mode::Pattern { in_class } => {
                    if c == '\\' {
                        i += self.emit_char_or_escape(c, next);
                        continue;
                    }
                    self.out.push(c);
                    i += 1;
                    if in_class {
                        if c == ']' {
                            mode = Mode::Pattern { in_class: false };
                        }
                    } else if c == '[' {
                        mode = Mode::Pattern { in_class: true };
                    } else if c == '/' {
                        while i < chars.len() && chars[i].is_ascii_alphabetic() {
                            self.out.push(chars[i]);
                            i += 1;
                        }
                        mode = Mode::Code;
                    }
                }
            }
        }
    }

    /// A comment running to the end of a CRLF line must not take the `\r`
    /// with it.
    fn keep_carriage_return(&mut self, chars: &[char]) {
        if chars.last() == Some(&'\r') {
            self.out.push('\r');
        }
    }

    /// Emit `c`, or `c` plus the escaped character as one unit. Returns the
    /// number of characters consumed.
    fn emit_char_or_escape(&mut self, c: char, next: Option<char>) -> usize {
        self.out.push(c);
        if c != '\\' {
            return 1;
        }
        match next {
            Some(n) => {
                self.out.push(n);
                2
            }
            None => 1,
        }
    }
}

/// Index just past the first `*/` at or after `from`.
fn find_block_close(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j + 1 < chars.len() {
        if chars[j] == '*' && chars[j + 1] == '/' {
            return Some(j + 2);
        }
        j += 1;
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Strip comments using the default pattern context.
pub fn strip_comments(source: &str) -> String {
    strip_comments_with(source, &PatternContext::default())
}

pub fn strip_comments_with(source: &str, context: &PatternContext) -> String {
    Scanner::new(context).scan(source)
}
