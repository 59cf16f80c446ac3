//! Blueprint core library: manifest types, variable resolution, conditions,
//! and the blueprint registry.
//!
//! Public API surface:
//! - [`types`]: manifest structs, [`RawValue`] and typed [`Value`]
//! - [`context`]: [`GenerationContext`]
//! - [`variables`]: [`variables::resolve`]
//! - [`condition`]: [`Condition`] parse / evaluate
//! - [`registry`]: [`load_manifest`], [`Registry`]
//! - [`error`]: per-component errors and the shared [`ErrorKind`]

pub mod condition;
pub mod context;
pub mod error;
pub mod registry;
pub mod types;
pub mod variables;

pub use condition::{Condition, VariableLookup};
pub use context::GenerationContext;
pub use error::{ConditionError, ErrorKind, RegistryError, VariableError};
pub use registry::{load_manifest, Registry};
pub use types::{
    BlueprintManifest, Conditional, DependencyEntry, FileEntry, PostHook, RawValue, Value,
    VarType, VariableDef,
};
pub use variables::VariableInput;
