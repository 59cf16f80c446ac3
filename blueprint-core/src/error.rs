//! Error types for blueprint-core.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::VarType;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Stable classification shared by every error the engine can produce.
///
/// Hosts surface the kind next to the human-readable message; tests match on
/// it instead of on concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MissingRequired,
    InvalidType,
    InvalidChoice,
    ValidationFailed,
    UnknownVariable,
    MalformedExpression,
    UndefinedVariable,
    TemplateSyntaxError,
    PathTraversalRejected,
    DestinationExists,
    WriteFailed,
    ManifestInvalid,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MissingRequired => "MissingRequired",
            ErrorKind::InvalidType => "InvalidType",
            ErrorKind::InvalidChoice => "InvalidChoice",
            ErrorKind::ValidationFailed => "ValidationFailed",
            ErrorKind::UnknownVariable => "UnknownVariable",
            ErrorKind::MalformedExpression => "MalformedExpression",
            ErrorKind::UndefinedVariable => "UndefinedVariable",
            ErrorKind::TemplateSyntaxError => "TemplateSyntaxError",
            ErrorKind::PathTraversalRejected => "PathTraversalRejected",
            ErrorKind::DestinationExists => "DestinationExists",
            ErrorKind::WriteFailed => "WriteFailed",
            ErrorKind::ManifestInvalid => "ManifestInvalid",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Variable resolution
// ---------------------------------------------------------------------------

/// Errors raised while resolving user input against variable declarations.
#[derive(Debug, Error)]
pub enum VariableError {
    /// A required variable had no input, no default, or an empty value.
    #[error("variable '{name}' is required but no value was supplied")]
    MissingRequired { name: String },

    /// The supplied value cannot be coerced to the declared type.
    #[error("variable '{name}' expects {expected}, got '{found}'")]
    InvalidType {
        name: String,
        expected: VarType,
        found: String,
    },

    /// The value is not a member of the declared `choices`.
    #[error("variable '{name}': '{value}' is not one of [{}]", .choices.join(", "))]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    /// The value does not match the declared `validation` regex.
    #[error("variable '{name}': '{value}' does not match /{pattern}/")]
    ValidationFailed {
        name: String,
        value: String,
        pattern: String,
    },

    /// The declared `validation` regex does not compile.
    #[error("variable '{name}': invalid validation pattern /{pattern}/: {source}")]
    BadPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl VariableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VariableError::MissingRequired { .. } => ErrorKind::MissingRequired,
            VariableError::InvalidType { .. } => ErrorKind::InvalidType,
            VariableError::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            VariableError::ValidationFailed { .. } | VariableError::BadPattern { .. } => {
                ErrorKind::ValidationFailed
            }
        }
    }

    /// Name of the variable the error concerns.
    pub fn variable(&self) -> &str {
        match self {
            VariableError::MissingRequired { name }
            | VariableError::InvalidType { name, .. }
            | VariableError::InvalidChoice { name, .. }
            | VariableError::ValidationFailed { name, .. }
            | VariableError::BadPattern { name, .. } => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Errors raised while parsing or evaluating a gating condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// The expression references a variable absent from the context.
    #[error("unknown variable '.{name}' in condition `{expr}`")]
    UnknownVariable { name: String, expr: String },

    /// The expression does not conform to the condition grammar.
    #[error("malformed condition `{expr}` at column {column}: {message}")]
    Malformed {
        expr: String,
        column: usize,
        message: String,
    },

    /// A boolean position received a non-boolean value.
    #[error("condition `{expr}`: {message}")]
    NotBoolean { expr: String, message: String },
}

impl ConditionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConditionError::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            ConditionError::Malformed { .. } | ConditionError::NotBoolean { .. } => {
                ErrorKind::MalformedExpression
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All errors that can arise from loading or querying blueprints.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, with the path it concerns.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON parse error on load.
    #[error("failed to parse manifest at {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest parsed but violates a structural invariant.
    #[error("blueprint '{id}' is invalid: {message}")]
    ManifestInvalid { id: String, message: String },

    /// Two manifests declared the same id.
    #[error("duplicate blueprint id '{id}' ({first} and {second})")]
    DuplicateBlueprint {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// No manifest file was found where one was expected.
    #[error("no blueprint manifest found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// Lookup of an id the registry does not hold.
    #[error("blueprint '{id}' not found")]
    NotFound { id: String },

    /// `dirs::home_dir()` returned `None`, so `~/.blueprint/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

impl RegistryError {
    /// Every registry failure classifies as an invalid or unavailable manifest.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ManifestInvalid
    }
}

/// Convenience constructor for [`RegistryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn invalid(id: &str, message: impl Into<String>) -> RegistryError {
    RegistryError::ManifestInvalid {
        id: id.to_string(),
        message: message.into(),
    }
}
