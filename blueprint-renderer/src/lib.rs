//! # blueprint-renderer
//!
//! Template engine that expands blueprint file contents and destination
//! paths against a resolved [`GenerationContext`](blueprint_core::GenerationContext).
//!
//! ## Usage
//!
//! ```rust
//! use blueprint_core::{GenerationContext, Value};
//! use blueprint_renderer::render;
//!
//! let ctx: GenerationContext = [("Name", Value::from("svc"))].into_iter().collect();
//! assert_eq!(render("{{.Name}}/main.go", &ctx).unwrap(), "svc/main.go");
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod funcs;
pub mod parser;

pub use context::Scope;
pub use engine::{render, Template};
pub use error::RenderError;
pub use funcs::PipeFunc;
