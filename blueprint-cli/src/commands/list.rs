//! `blueprint list`: table of available blueprints.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::load_registry;

/// Arguments for `blueprint list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct BlueprintRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    kind: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "description")]
    description: String,
}

impl ListArgs {
    pub fn run(self, dir: Option<&Path>) -> Result<()> {
        let registry = load_registry(dir)?;
        let rows: Vec<BlueprintRow> = registry
            .list()
            .into_iter()
            .map(|m| BlueprintRow {
                id: m.id.clone(),
                kind: m.kind.clone(),
                version: m.version.clone().unwrap_or_default(),
                description: if m.description.is_empty() {
                    m.name.clone()
                } else {
                    m.description.clone()
                },
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize blueprint list")?
            );
            return Ok(());
        }

        if rows.is_empty() {
            println!("No blueprints found.");
            return Ok(());
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
