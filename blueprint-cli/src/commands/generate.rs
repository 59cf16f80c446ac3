//! `blueprint generate`: render a blueprint into an output directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use blueprint_core::{RawValue, VariableInput};
use blueprint_generate::{generate, GenerateOptions, GenerationResult};

use super::load_registry;

/// Arguments for `blueprint generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Blueprint id.
    pub id: String,

    /// Output directory.
    #[arg(long, short)]
    pub out: PathBuf,

    /// Variable value; repeat for several. Overrides `--vars-file`.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// YAML or JSON file mapping variable names to values.
    #[arg(long, value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// Overwrite files that already exist in the output directory.
    #[arg(long)]
    pub force: bool,

    /// Show what would be written without writing any files.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the generation result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    pub fn run(self, dir: Option<&Path>) -> Result<()> {
        let registry = load_registry(dir)?;

        let mut input = match &self.vars_file {
            Some(path) => read_vars_file(path)?,
            None => VariableInput::new(),
        };
        for (key, value) in &self.set {
            input.insert(key.clone(), RawValue::String(value.clone()));
        }

        let opts = GenerateOptions {
            force: self.force,
            dry_run: self.dry_run,
        };
        let result = generate(&registry, &self.id, &input, &self.out, &opts);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result)
                    .context("failed to serialize generation result")?
            );
        } else {
            print_result(&result);
        }

        if let Some(err) = result.error() {
            bail!("generation of '{}' failed [{}]: {err}", self.id, err.kind());
        }
        Ok(())
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn read_vars_file(path: &Path) -> Result<VariableInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let input = if is_json {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))?
    };
    Ok(input)
}

fn print_result(result: &GenerationResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };
    let mark = if result.dry_run { "~" } else { "✎" };

    if result.is_success() {
        println!(
            "{prefix}{} '{}' generated into {} ({} files)",
            "✓".green(),
            result.blueprint,
            result.out_dir.display(),
            result.files.len()
        );
    } else if !result.files.is_empty() {
        println!(
            "{prefix}{} '{}' failed after writing {} files:",
            "✗".red(),
            result.blueprint,
            result.files.len()
        );
    }

    for f in &result.files {
        println!("  {mark}  {} ({} bytes)", f.destination, f.bytes);
    }

    if !result.dependencies.is_empty() {
        println!("{}", "Dependencies:".bold());
        for d in &result.dependencies {
            let version = d.version.as_deref().map(|v| format!("@{v}")).unwrap_or_default();
            let dev = if d.dev { " (dev)" } else { "" };
            println!("  +  {}{version}{dev}", d.module);
        }
    }
    if !result.post_hooks.is_empty() {
        println!("{}", "Post-generation hooks:".bold());
        for h in &result.post_hooks {
            let line = std::iter::once(h.command.as_str())
                .chain(h.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            println!("  $  {line}");
        }
    }
}
