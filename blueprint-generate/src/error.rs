//! Error types for blueprint-generate.

use std::path::PathBuf;

use thiserror::Error;

use blueprint_core::{ConditionError, ErrorKind, RegistryError, VariableError};
use blueprint_renderer::RenderError;

/// All errors that can arise from a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Blueprint lookup or manifest failure.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Variable input failed resolution.
    #[error("{0}")]
    Variable(#[from] VariableError),

    /// A file, dependency or hook condition failed to evaluate.
    #[error("{entry}: {source}")]
    Condition {
        entry: String,
        #[source]
        source: ConditionError,
    },

    /// A destination, content or hook template failed to render.
    #[error("{entry}: {source}")]
    Render {
        entry: String,
        #[source]
        source: RenderError,
    },

    /// The rendered destination escapes the output directory.
    #[error("destination '{destination}' rejected: {reason}")]
    PathTraversalRejected { destination: String, reason: String },

    /// A file already exists at the destination and `force` is off, or two
    /// entries render to the same destination.
    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// A file entry reached generation without template content.
    #[error("file entry '{destination}' has no content; load it with load_manifest")]
    MissingContent { destination: String },

    /// Creating a directory or writing a file failed.
    #[error("write failed at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::Registry(e) => e.kind(),
            GenerateError::Variable(e) => e.kind(),
            GenerateError::Condition { source, .. } => source.kind(),
            GenerateError::Render { source, .. } => source.kind(),
            GenerateError::PathTraversalRejected { .. } => ErrorKind::PathTraversalRejected,
            GenerateError::DestinationExists { .. } => ErrorKind::DestinationExists,
            GenerateError::MissingContent { .. } => ErrorKind::ManifestInvalid,
            GenerateError::WriteFailed { .. } => ErrorKind::WriteFailed,
        }
    }
}

/// Convenience constructor for [`GenerateError::WriteFailed`].
pub(crate) fn write_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::WriteFailed {
        path: path.into(),
        source,
    }
}

pub(crate) fn rejected(destination: &str, reason: &str) -> GenerateError {
    GenerateError::PathTraversalRejected {
        destination: destination.to_string(),
        reason: reason.to_string(),
    }
}
