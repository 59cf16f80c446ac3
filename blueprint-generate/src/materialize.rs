//! File tree materializer.
//!
//! Runs in two phases. The plan phase evaluates every entry's condition,
//! renders its destination and content, and checks the destination, all in
//! manifest order and without touching the filesystem. The commit phase
//! writes the planned files in the same order with [`atomic_write`]. Only a
//! commit-phase failure can leave files behind; those are reported in
//! [`MaterializeError::committed`].

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use blueprint_core::condition::evaluate_optional;
use blueprint_core::{FileEntry, GenerationContext};
use blueprint_renderer::render;

use crate::error::{rejected, GenerateError};
use crate::writer::{atomic_write, sha256_hex};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Options a host passes through to the materializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Overwrite files that already exist under the output directory.
    pub force: bool,
    /// Plan and report without writing anything.
    pub dry_run: bool,
}

/// One file written (or, in a dry run, that would be written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedFile {
    /// Rendered destination, relative to the output directory.
    pub destination: String,
    pub bytes: u64,
    pub sha256: String,
}

/// A failed materialization and the files committed before the failure.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct MaterializeError {
    pub committed: Vec<MaterializedFile>,
    #[source]
    pub source: GenerateError,
}

impl From<GenerateError> for MaterializeError {
    fn from(source: GenerateError) -> Self {
        MaterializeError {
            committed: Vec::new(),
            source,
        }
    }
}

#[derive(Debug)]
struct PlannedFile {
    destination: String,
    target: PathBuf,
    content: String,
}

impl PlannedFile {
    fn report(&self) -> MaterializedFile {
        MaterializedFile {
            destination: self.destination.clone(),
            bytes: self.content.len() as u64,
            sha256: sha256_hex(self.content.as_bytes()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Materialize `files` under `out_dir`.
///
/// Must not run concurrently with another call on the same `out_dir`.
pub fn materialize(
    files: &[FileEntry],
    ctx: &GenerationContext,
    out_dir: &Path,
    opts: &GenerateOptions,
) -> Result<Vec<MaterializedFile>, MaterializeError> {
    let planned = plan(files, ctx, out_dir, opts)?;

    if opts.dry_run {
        for file in &planned {
            tracing::info!("[dry-run] would write: {}", file.target.display());
        }
        return Ok(planned.iter().map(PlannedFile::report).collect());
    }

    let mut committed = Vec::with_capacity(planned.len());
    for file in &planned {
        if let Err(source) = atomic_write(&file.target, file.content.as_bytes()) {
            return Err(MaterializeError { committed, source });
        }
        committed.push(file.report());
    }
    Ok(committed)
}

// ---------------------------------------------------------------------------
// Plan phase
// ---------------------------------------------------------------------------

fn plan(
    files: &[FileEntry],
    ctx: &GenerationContext,
    out_dir: &Path,
    opts: &GenerateOptions,
) -> Result<Vec<PlannedFile>, GenerateError> {
    let mut planned = Vec::new();
    let mut seen = HashSet::new();

    for entry in files {
        let label = format!("file '{}'", entry.destination);
        let included = evaluate_optional(entry.condition.as_deref(), ctx).map_err(|source| {
            GenerateError::Condition {
                entry: label.clone(),
                source,
            }
        })?;
        if !included {
            tracing::debug!("skipped: {label} (condition is false)");
            continue;
        }

        let destination = render(&entry.destination, ctx).map_err(|source| GenerateError::Render {
            entry: format!("{label} destination"),
            source,
        })?;
        let relative = check_destination(&destination)?;
        let target = out_dir.join(&relative);

        if !seen.insert(relative) {
            return Err(GenerateError::DestinationExists { path: target });
        }
        if !opts.force && target.symlink_metadata().is_ok() {
            return Err(GenerateError::DestinationExists { path: target });
        }

        let template = entry
            .content
            .as_deref()
            .ok_or_else(|| GenerateError::MissingContent {
                destination: entry.destination.clone(),
            })?;
        let content = render(template, ctx).map_err(|source| GenerateError::Render {
            entry: format!("{label} content"),
            source,
        })?;

        planned.push(PlannedFile {
            destination,
            target,
            content,
        });
    }
    Ok(planned)
}

/// Check a rendered destination and return it as a normalized relative path.
///
/// Rejects empty paths, absolute paths (including drive prefixes) and any
/// `..` segment. `\` counts as a separator so Windows-style traversal is
/// rejected on every platform.
pub fn check_destination(destination: &str) -> Result<PathBuf, GenerateError> {
    if destination.trim().is_empty() {
        return Err(rejected(destination, "empty path"));
    }
    if destination.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(rejected(destination, "contains a '..' segment"));
    }
    if destination.starts_with(['/', '\\']) {
        return Err(rejected(destination, "absolute path"));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(destination).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(rejected(destination, "contains a '..' segment")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(rejected(destination, "absolute path"))
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(rejected(destination, "does not name a file"));
    }
    Ok(relative)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
