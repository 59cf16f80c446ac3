//! # blueprint-generate
//!
//! File tree materialization, dependency and post-hook selection, and the
//! [`generate`] entry point that ties the engine together.
//!
//! ```no_run
//! use std::path::Path;
//! use blueprint_core::{Registry, VariableInput};
//! use blueprint_generate::{generate, GenerateOptions};
//!
//! let registry = Registry::load_dir(Path::new("blueprints")).unwrap();
//! let mut input = VariableInput::new();
//! input.insert("Name".into(), "svc".into());
//! let opts = GenerateOptions::default();
//! let result = generate(&registry, "go-service", &input, Path::new("out"), &opts);
//! assert!(result.is_success());
//! ```

pub mod error;
pub mod materialize;
pub mod pipeline;
pub mod select;
pub mod writer;

pub use error::GenerateError;
pub use materialize::{
    check_destination, materialize, GenerateOptions, MaterializeError, MaterializedFile,
};
pub use pipeline::{
    check_templates, generate, generate_manifest, GenerationResult, GenerationStatus,
};
pub use select::{select_dependencies, select_hooks};
