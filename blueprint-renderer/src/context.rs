//! Render-time variable scope.

use blueprint_core::{GenerationContext, Value, VariableLookup};

/// The generation context plus the current `{{range}}` element, if any.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    ctx: &'a GenerationContext,
    dot: Option<&'a Value>,
}

impl<'a> Scope<'a> {
    pub fn new(ctx: &'a GenerationContext) -> Self {
        Scope { ctx, dot: None }
    }

    /// A child scope where `.` is `value`.
    pub fn with_dot<'b>(&self, value: &'b Value) -> Scope<'b>
    where
        'a: 'b,
    {
        Scope {
            ctx: self.ctx,
            dot: Some(value),
        }
    }
}

impl VariableLookup for Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.ctx.get(name)
    }

    fn dot(&self) -> Option<&Value> {
        self.dot
    }
}
