pub mod generate;
pub mod list;
pub mod show;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use blueprint_core::Registry;

/// Load the registry from `dir`, or from `~/.blueprint/blueprints/`.
pub fn load_registry(dir: Option<&Path>) -> Result<Registry> {
    let registry = match dir {
        Some(dir) => {
            tracing::info!("loading blueprints from {}", dir.display());
            Registry::load_dir(dir)
                .with_context(|| format!("failed to load blueprints from {}", dir.display()))?
        }
        None => {
            tracing::info!("loading blueprints from ~/.blueprint/blueprints");
            Registry::load_default()
                .context("failed to load blueprints from ~/.blueprint/blueprints")?
        }
    };
    tracing::debug!("{} blueprint(s) loaded", registry.list().len());
    Ok(registry)
}
