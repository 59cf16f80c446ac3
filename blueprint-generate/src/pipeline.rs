//! The `generate` entry point shared by every host.
//!
//! `Registry::get` → `variables::resolve` → `materialize` →
//! `select_dependencies` / `select_hooks` → [`GenerationResult`].

use std::path::{Path, PathBuf};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use blueprint_core::{
    variables, BlueprintManifest, DependencyEntry, PostHook, Registry, VariableInput,
};
use blueprint_renderer::Template;

use crate::error::GenerateError;
use crate::materialize::{materialize, GenerateOptions, MaterializeError, MaterializedFile};
use crate::select::{select_dependencies, select_hooks};

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Terminal status of a generation run.
#[derive(Debug)]
pub enum GenerationStatus {
    Success,
    Failed(GenerateError),
}

impl Serialize for GenerationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GenerationStatus::Success => {
                let mut s = serializer.serialize_struct("GenerationStatus", 1)?;
                s.serialize_field("state", "success")?;
                s.end()
            }
            GenerationStatus::Failed(err) => {
                let mut s = serializer.serialize_struct("GenerationStatus", 3)?;
                s.serialize_field("state", "failed")?;
                s.serialize_field("kind", &err.kind())?;
                s.serialize_field("message", &err.to_string())?;
                s.end()
            }
        }
    }
}

/// Outcome of one `generate` call.
///
/// On failure `files` holds the files committed before the error.
#[derive(Debug, Serialize)]
pub struct GenerationResult {
    pub blueprint: String,
    pub out_dir: PathBuf,
    pub dry_run: bool,
    pub files: Vec<MaterializedFile>,
    pub dependencies: Vec<DependencyEntry>,
    pub post_hooks: Vec<PostHook>,
    pub status: GenerationStatus,
}

impl GenerationResult {
    fn new(blueprint: &str, out_dir: &Path, opts: &GenerateOptions) -> Self {
        GenerationResult {
            blueprint: blueprint.to_string(),
            out_dir: out_dir.to_path_buf(),
            dry_run: opts.dry_run,
            files: Vec::new(),
            dependencies: Vec::new(),
            post_hooks: Vec::new(),
            status: GenerationStatus::Success,
        }
    }

    fn failed(mut self, err: GenerateError) -> Self {
        tracing::warn!("generation of '{}' failed: {err}", self.blueprint);
        self.status = GenerationStatus::Failed(err);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, GenerationStatus::Success)
    }

    pub fn error(&self) -> Option<&GenerateError> {
        match &self.status {
            GenerationStatus::Success => None,
            GenerationStatus::Failed(err) => Some(err),
        }
    }

    /// Split off the failure, if any.
    pub fn into_result(mut self) -> Result<GenerationResult, GenerateError> {
        match std::mem::replace(&mut self.status, GenerationStatus::Success) {
            GenerationStatus::Success => Ok(self),
            GenerationStatus::Failed(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

/// Generate blueprint `id` from `registry` into `out_dir`.
pub fn generate(
    registry: &Registry,
    id: &str,
    input: &VariableInput,
    out_dir: &Path,
    opts: &GenerateOptions,
) -> GenerationResult {
    match registry.get(id) {
        Ok(manifest) => generate_manifest(manifest, input, out_dir, opts),
        Err(e) => GenerationResult::new(id, out_dir, opts).failed(e.into()),
    }
}

/// Generate an already-loaded manifest into `out_dir`.
pub fn generate_manifest(
    manifest: &BlueprintManifest,
    input: &VariableInput,
    out_dir: &Path,
    opts: &GenerateOptions,
) -> GenerationResult {
    let mut result = GenerationResult::new(&manifest.id, out_dir, opts);

    let ctx = match variables::resolve(&manifest.variables, input) {
        Ok(ctx) => ctx,
        Err(e) => return result.failed(e.into()),
    };
    tracing::debug!("resolved {} variable(s) for '{}'", ctx.len(), manifest.id);

    match materialize(&manifest.files, &ctx, out_dir, opts) {
        Ok(files) => result.files = files,
        Err(MaterializeError { committed, source }) => {
            result.files = committed;
            return result.failed(source);
        }
    }

    match select_dependencies(&manifest.dependencies, &ctx) {
        Ok(deps) => result.dependencies = deps,
        Err(e) => return result.failed(e),
    }
    match select_hooks(&manifest.post_hooks, &ctx) {
        Ok(hooks) => result.post_hooks = hooks,
        Err(e) => return result.failed(e),
    }

    tracing::info!(
        "generated '{}': {} file(s), {} dependency(ies), {} post-hook(s)",
        manifest.id,
        result.files.len(),
        result.dependencies.len(),
        result.post_hooks.len()
    );
    result
}

// ---------------------------------------------------------------------------
// check_templates
// ---------------------------------------------------------------------------

/// Parse every destination, content and hook template in `manifest`.
///
/// Complements load-time validation, which checks conditions only.
pub fn check_templates(manifest: &BlueprintManifest) -> Result<(), GenerateError> {
    let parse = |entry: String, text: &str| {
        Template::parse(text)
            .map(|_| ())
            .map_err(|source| GenerateError::Render { entry, source })
    };
    for file in &manifest.files {
        parse(format!("file '{}' destination", file.destination), &file.destination)?;
        if let Some(content) = &file.content {
            parse(format!("file '{}' content", file.destination), content)?;
        }
    }
    for hook in &manifest.post_hooks {
        let label = format!("post-hook '{}'", hook.command);
        parse(label.clone(), &hook.command)?;
        for arg in &hook.args {
            parse(label.clone(), arg)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{ErrorKind, FileEntry, RawValue, VarType, VariableDef};
    use tempfile::TempDir;

    fn manifest() -> BlueprintManifest {
        BlueprintManifest {
            id: "svc".into(),
            name: "Service".into(),
            description: String::new(),
            kind: "backend".into(),
            version: None,
            variables: vec![VariableDef::new("Name", VarType::String).required()],
            files: vec![FileEntry::inline("{{.Name}}/main.go", "package main\n")],
            dependencies: vec![],
            post_hooks: vec![PostHook {
                command: "go".into(),
                args: vec!["mod".into(), "init".into(), "{{.Name}}".into()],
                description: None,
                condition: None,
            }],
            root: PathBuf::new(),
        }
    }

    fn input(name: &str) -> VariableInput {
        [("Name".to_string(), RawValue::from(name))].into_iter().collect()
    }

    #[test]
    fn success_collects_files_and_hooks() {
        let out = TempDir::new().unwrap();
        let result = generate_manifest(&manifest(), &input("api"), out.path(), &Default::default());
        assert!(result.is_success(), "{:?}", result.error());
        assert_eq!(result.files[0].destination, "api/main.go");
        assert_eq!(result.post_hooks[0].args, ["mod", "init", "api"]);
    }

    #[test]
    fn unknown_blueprint_fails_as_manifest_invalid() {
        let out = TempDir::new().unwrap();
        let registry = Registry::from_manifests(vec![manifest()]).unwrap();
        let result = generate(&registry, "nope", &input("api"), out.path(), &Default::default());
        assert_eq!(result.error().map(GenerateError::kind), Some(ErrorKind::ManifestInvalid));
    }

    #[test]
    fn into_result_splits_failure() {
        let out = TempDir::new().unwrap();
        let result =
            generate_manifest(&manifest(), &VariableInput::new(), out.path(), &Default::default());
        let err = result.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequired);
    }

    #[test]
    fn status_serializes_kind_and_message() {
        let out = TempDir::new().unwrap();
        let result =
            generate_manifest(&manifest(), &VariableInput::new(), out.path(), &Default::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"]["state"], "failed");
        assert_eq!(json["status"]["kind"], "MissingRequired");
        assert!(json["status"]["message"].as_str().unwrap().contains("Name"));
    }

    #[test]
    fn check_templates_flags_bad_content() {
        let mut m = manifest();
        assert!(check_templates(&m).is_ok());
        m.files.push(FileEntry::inline("x.go", "{{if .A}}never closed"));
        let err = check_templates(&m).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateSyntaxError);
        assert!(err.to_string().contains("file 'x.go' content"));
    }
}
