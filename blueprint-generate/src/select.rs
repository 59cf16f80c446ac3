//! Dependency and post-hook selection.
//!
//! Filters declared entries by condition, keeping declaration order and
//! duplicates. Nothing here runs a package manager or a command.

use blueprint_core::condition::evaluate_optional;
use blueprint_core::{Conditional, DependencyEntry, GenerationContext, PostHook};
use blueprint_renderer::render;

use crate::error::GenerateError;

fn select<'a, T: Conditional>(
    entries: &'a [T],
    ctx: &GenerationContext,
    label: impl Fn(&T) -> String,
) -> Result<Vec<&'a T>, GenerateError> {
    let mut selected = Vec::new();
    for entry in entries {
        let included = evaluate_optional(entry.condition(), ctx).map_err(|source| {
            GenerateError::Condition {
                entry: label(entry),
                source,
            }
        })?;
        if included {
            selected.push(entry);
        } else {
            tracing::debug!("skipped: {} (condition is false)", label(entry));
        }
    }
    Ok(selected)
}

/// Dependencies whose condition holds, in declaration order.
pub fn select_dependencies(
    entries: &[DependencyEntry],
    ctx: &GenerationContext,
) -> Result<Vec<DependencyEntry>, GenerateError> {
    let selected = select(entries, ctx, |d| format!("dependency '{}'", d.module))?;
    Ok(selected.into_iter().cloned().collect())
}

/// Post-hooks whose condition holds, with `command` and `args` rendered.
pub fn select_hooks(
    hooks: &[PostHook],
    ctx: &GenerationContext,
) -> Result<Vec<PostHook>, GenerateError> {
    let label = |h: &PostHook| format!("post-hook '{}'", h.command);
    let mut out = Vec::new();
    for hook in select(hooks, ctx, label)? {
        let rendered = |text: &str| {
            render(text, ctx).map_err(|source| GenerateError::Render {
                entry: label(hook),
                source,
            })
        };
        out.push(PostHook {
            command: rendered(&hook.command)?,
            args: hook
                .args
                .iter()
                .map(|a| rendered(a))
                .collect::<Result<Vec<_>, _>>()?,
            description: hook.description.clone(),
            condition: hook.condition.clone(),
        });
    }
    Ok(out)
}
