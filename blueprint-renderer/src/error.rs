//! Error types for blueprint-renderer.

use thiserror::Error;

use blueprint_core::{ConditionError, ErrorKind, VarType};

/// All errors that can arise from template parsing or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// `{{.VAR}}` (or `.` outside a loop) names nothing in scope.
    #[error("undefined variable '{name}' at line {line}")]
    UndefinedVariable { name: String, line: usize },

    /// Malformed template text; `snippet` is the offending tag.
    #[error("template syntax error at line {line}: {message} in `{snippet}`")]
    Syntax {
        line: usize,
        snippet: String,
        message: String,
    },

    /// An `{{if}}` condition failed to evaluate.
    #[error("condition error at line {line}: {source}")]
    Condition {
        line: usize,
        #[source]
        source: ConditionError,
    },

    /// `{{range}}` over a value that is not a list.
    #[error("cannot range over {found} '{name}' at line {line}: expected a list")]
    NotIterable {
        name: String,
        found: VarType,
        line: usize,
    },
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            RenderError::Condition {
                source: ConditionError::UnknownVariable { .. },
                ..
            } => ErrorKind::UndefinedVariable,
            RenderError::Syntax { .. }
            | RenderError::Condition { .. }
            | RenderError::NotIterable { .. } => ErrorKind::TemplateSyntaxError,
        }
    }

    /// 1-based line of the template the error points at.
    pub fn line(&self) -> usize {
        match self {
            RenderError::UndefinedVariable { line, .. }
            | RenderError::Syntax { line, .. }
            | RenderError::Condition { line, .. }
            | RenderError::NotIterable { line, .. } => *line,
        }
    }
}

pub(crate) fn syntax(line: usize, snippet: &str, message: impl Into<String>) -> RenderError {
    RenderError::Syntax {
        line,
        snippet: snippet.to_string(),
        message: message.into(),
    }
}
