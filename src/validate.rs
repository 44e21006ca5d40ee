//! Validation gate.
//!
//! Parse-only syntax check of the assembled artifact: the oxc parser followed
//! by the semantic early-error checks. Nothing is executed.

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SourceKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// 1-based line/column of a byte offset. Offsets past the end clamp to it.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut end = offset.min(source.len());
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        let before = &source[..end];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        SourceLocation {
            line: line as u32,
            column: column as u32,
        }
    }
}

/// Why the artifact was rejected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Total diagnostics reported; only the first is carried in `message`.
    pub diagnostics: usize,
    /// Module whose section contains `location`, when known.
    pub module: Option<String>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error")?;
        if let Some(loc) = &self.location {
            write!(f, " at line {}, column {}", loc.line, loc.column)?;
        }
        if let Some(module) = &self.module {
            write!(f, " (module {})", module)?;
        }
        write!(f, ": {}", self.message)?;
        if self.diagnostics > 1 {
            write!(f, " (+{} more)", self.diagnostics - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

pub fn source_type_for(kind: SourceKind) -> SourceType {
    SourceType::default().with_module(kind == SourceKind::Module)
}

/// Check that `source` parses. Returns the first diagnostic on failure.
pub fn validate_source(source: &str, kind: SourceKind) -> Result<(), ValidationFailure> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(kind)).parse();

    let mut errors = ret.errors;
    if errors.is_empty() {
        let semantic = SemanticBuilder::new()
            .with_check_syntax_error(true)
            .build(&ret.program);
        errors = semantic.errors;
    }

    let Some(first) = errors.first() else {
        return Ok(());
    };

    let location = first
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| SourceLocation::from_offset(source, label.offset()));

    Err(ValidationFailure {
        message: first.message.to_string(),
        location,
        diagnostics: errors.len(),
        module: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script_passes() {
        let source = "(function () {\n  var re = /a\\/b/g;\n  console.log('ok', re);\n})();\n";
        assert!(validate_source(source, SourceKind::Script).is_ok());
    }

    #[test]
    fn test_unterminated_string_fails_with_location() {
        let source = "var a = 1;\nvar s = \"abc;\nvar t = 2;\n";
        let failure = validate_source(source, SourceKind::Script).unwrap_err();
        let location = failure.location.expect("parser reports a span");
        assert_eq!(location.line, 2);
        assert!(failure.diagnostics >= 1);
    }

    #[test]
    fn test_redeclaration_is_rejected() {
        let source = "let a = 1;\nlet a = 2;\n";
        assert!(validate_source(source, SourceKind::Script).is_err());
    }

    #[test]
    fn test_module_syntax_depends_on_kind() {
        let source = "export const x = 1;\n";
        assert!(validate_source(source, SourceKind::Module).is_ok());
        assert!(validate_source(source, SourceKind::Script).is_err());
    }

    #[test]
    fn test_location_from_offset() {
        let source = "ab\ncdé\nf";
        assert_eq!(
            SourceLocation::from_offset(source, 0),
            SourceLocation { line: 1, column: 1 }
        );
        assert_eq!(
            SourceLocation::from_offset(source, 5),
            SourceLocation { line: 2, column: 3 }
        );
        assert_eq!(
            SourceLocation::from_offset(source, 999),
            SourceLocation { line: 3, column: 2 }
        );
    }

    #[test]
    fn test_failure_display() {
        let failure = ValidationFailure {
            message: "Unterminated string".to_string(),
            location: Some(SourceLocation { line: 4, column: 9 }),
            diagnostics: 2,
            module: Some("util.js".to_string()),
        };
        assert_eq!(
            failure.to_string(),
            "syntax error at line 4, column 9 (module util.js): Unterminated string (+1 more)"
        );
    }
}
