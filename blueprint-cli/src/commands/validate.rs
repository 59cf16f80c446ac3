//! `blueprint validate`: load one manifest and parse all of its templates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use blueprint_core::load_manifest;
use blueprint_generate::check_templates;

/// Arguments for `blueprint validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Blueprint directory or manifest file.
    pub path: PathBuf,
}

impl ValidateArgs {
    pub fn run(self) -> Result<()> {
        let manifest = load_manifest(&self.path)
            .with_context(|| format!("invalid blueprint at {}", self.path.display()))?;
        check_templates(&manifest)
            .with_context(|| format!("invalid template in blueprint '{}'", manifest.id))?;

        println!(
            "{} '{}' is valid ({} variables, {} files, {} dependencies, {} post-hooks)",
            "✓".green(),
            manifest.id,
            manifest.variables.len(),
            manifest.files.len(),
            manifest.dependencies.len(),
            manifest.post_hooks.len()
        );
        Ok(())
    }
}
