//! Lint stage.
//!
//! Runs after validation and before optimization. The built-in linter walks
//! the oxc AST for statements that should never ship in a bundle; an external
//! command can be configured instead.

use oxc_allocator::Allocator;
use oxc_ast::ast::{DebuggerStatement, WithStatement};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use serde::Serialize;
use std::path::Path;
use std::process::Command;

use crate::config::SourceKind;
use crate::validate::{source_type_for, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintFinding {
    pub rule: &'static str,
    pub message: String,
    pub location: SourceLocation,
}

pub trait Linter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Err` means the linter itself could not run or rejected the artifact
    /// without structured findings.
    fn lint(&self, artifact_path: &Path, source: &str) -> Result<Vec<LintFinding>, String>;
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltinLinter {
    pub kind: SourceKind,
}

struct ForbiddenStatements {
    hits: Vec<(&'static str, &'static str, u32)>,
}

impl<'a> Visit<'a> for ForbiddenStatements {
    fn visit_debugger_statement(&mut self, stmt: &DebuggerStatement) {
        self.hits
            .push(("no-debugger", "`debugger` statement", stmt.span.start));
    }

    fn visit_with_statement(&mut self, stmt: &WithStatement<'a>) {
        self.hits.push(("no-with", "`with` statement", stmt.span.start));
        oxc_ast_visit::walk::walk_with_statement(self, stmt);
    }
}

impl Linter for BuiltinLinter {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn lint(&self, _artifact_path: &Path, source: &str) -> Result<Vec<LintFinding>, String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type_for(self.kind)).parse();
        if let Some(first) = ret.errors.first() {
            return Err(first.message.to_string());
        }

        let mut visitor = ForbiddenStatements { hits: Vec::new() };
        visitor.visit_program(&ret.program);

        Ok(visitor
            .hits
            .into_iter()
            .map(|(rule, message, offset)| LintFinding {
                rule,
                message: message.to_string(),
                location: SourceLocation::from_offset(source, offset as usize),
            })
            .collect())
    }
}

/// Runs `program args... <artifact>`; a non-zero exit fails the stage.
#[derive(Debug, Clone)]
pub struct CommandLinter {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLinter {
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(CommandLinter {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Linter for CommandLinter {
    fn name(&self) -> &'static str {
        "command"
    }

    fn lint(&self, artifact_path: &Path, _source: &str) -> Result<Vec<LintFinding>, String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(artifact_path)
            .output()
            .map_err(|e| format!("failed to launch {}: {}", self.program, e))?;

        if output.status.success() {
            return Ok(Vec::new());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(format!(
            "{} exited with {}{}{}",
            self.program,
            output.status,
            if detail.is_empty() { "" } else { ": " },
            detail
        ))
    }
}
