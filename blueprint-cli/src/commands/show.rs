//! `blueprint show`: details of a single blueprint.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use blueprint_core::{BlueprintManifest, RawValue};

use super::load_registry;

/// Arguments for `blueprint show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Blueprint id.
    pub id: String,

    /// Emit the manifest as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct VariableRow {
    #[tabled(rename = "variable")]
    name: String,
    #[tabled(rename = "type")]
    var_type: String,
    #[tabled(rename = "required")]
    required: String,
    #[tabled(rename = "default")]
    default: String,
    #[tabled(rename = "choices")]
    choices: String,
    #[tabled(rename = "description")]
    description: String,
}

impl ShowArgs {
    pub fn run(self, dir: Option<&Path>) -> Result<()> {
        let registry = load_registry(dir)?;
        let manifest = registry.get(&self.id)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(manifest).context("failed to serialize manifest")?
            );
            return Ok(());
        }
        print_manifest(manifest);
        Ok(())
    }
}

fn join_raw(values: &[RawValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn when(condition: Option<&str>) -> String {
    condition
        .map(|c| format!("  {}", format!("[if {c}]").bright_black()))
        .unwrap_or_default()
}

fn print_manifest(m: &BlueprintManifest) {
    let version = m.version.as_deref().map(|v| format!(" v{v}")).unwrap_or_default();
    println!("{} ({}){version}", m.name.bold(), m.id);
    if !m.kind.is_empty() {
        println!("type: {}", m.kind);
    }
    if !m.description.is_empty() {
        println!("{}", m.description);
    }

    if !m.variables.is_empty() {
        println!("\n{}", "Variables".bold());
        let rows: Vec<VariableRow> = m
            .variables
            .iter()
            .map(|v| VariableRow {
                name: v.name.clone(),
                var_type: v.var_type.to_string(),
                required: if v.required { "yes" } else { "" }.to_string(),
                default: v.default.as_ref().map(ToString::to_string).unwrap_or_default(),
                choices: join_raw(&v.choices),
                description: v.description.clone().unwrap_or_default(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if !m.files.is_empty() {
        println!("\n{}", "Files".bold());
        for f in &m.files {
            println!("  {}{}", f.destination, when(f.condition.as_deref()));
        }
    }

    if !m.dependencies.is_empty() {
        println!("\n{}", "Dependencies".bold());
        for d in &m.dependencies {
            let version = d.version.as_deref().map(|v| format!("@{v}")).unwrap_or_default();
            let dev = if d.dev { " (dev)" } else { "" };
            println!("  {}{version}{dev}{}", d.module, when(d.condition.as_deref()));
        }
    }

    if !m.post_hooks.is_empty() {
        println!("\n{}", "Post-generation hooks".bold());
        for h in &m.post_hooks {
            println!(
                "  $ {} {}{}",
                h.command,
                h.args.join(" "),
                when(h.condition.as_deref())
            );
        }
    }
}
