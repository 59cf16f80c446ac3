//! Blueprint manifest loading and the read-only [`Registry`].
//!
//! # Storage layout
//!
//! ```text
//! ~/.blueprint/
//!   blueprints/
//!     <id>/
//!       blueprint.yaml        (or blueprint.yml / blueprint.json)
//!       templates/...         (files referenced by `source:`)
//!     <id>.yaml               (single-file blueprint, inline `content:` only)
//! ```
//!
//! # API pattern
//!
//! Directory-dependent functions have two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::condition::Condition;
use crate::error::{invalid, io_err, RegistryError};
use crate::types::BlueprintManifest;
use crate::variables;

/// File names recognised as a blueprint manifest inside a blueprint directory.
pub const MANIFEST_FILE_NAMES: &[&str] = &["blueprint.yaml", "blueprint.yml", "blueprint.json"];

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.blueprint/blueprints/`. Pure, no I/O.
pub fn blueprints_dir_at(home: &Path) -> PathBuf {
    home.join(".blueprint").join("blueprints")
}

/// `<home>/.blueprint/blueprints/` (uses `dirs::home_dir()`).
pub fn blueprints_dir() -> Result<PathBuf, RegistryError> {
    Ok(blueprints_dir_at(&home()?))
}

fn is_manifest_ext(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

fn find_manifest_in(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

// ---------------------------------------------------------------------------
// 2. Load a single manifest
// ---------------------------------------------------------------------------

/// Load and validate one blueprint.
///
/// `path` is either a manifest file or a directory containing one of
/// [`MANIFEST_FILE_NAMES`]. Template files named by `source:` are read
/// relative to the manifest's directory and stored in `content`.
///
/// Returns `RegistryError::Parse`/`ParseJson` (with path + line context) for
/// malformed files and `RegistryError::ManifestInvalid` for invariant breaches.
pub fn load_manifest(path: &Path) -> Result<BlueprintManifest, RegistryError> {
    let manifest_path = if path.is_dir() {
        find_manifest_in(path).ok_or_else(|| RegistryError::ManifestNotFound {
            path: path.to_path_buf(),
        })?
    } else if path.is_file() {
        path.to_path_buf()
    } else {
        return Err(RegistryError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    };

    let contents = std::fs::read_to_string(&manifest_path).map_err(|e| io_err(&manifest_path, e))?;
    let mut manifest = parse_manifest(&manifest_path, &contents)?;

    let root = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    if manifest.id.trim().is_empty() {
        manifest.id = default_id(&manifest_path, &root);
    }
    manifest.root = root;

    load_sources(&mut manifest)?;
    validate_manifest(&manifest)?;
    warn_undeclared_references(&manifest);

    tracing::debug!(
        "loaded blueprint '{}' from {}",
        manifest.id,
        manifest_path.display()
    );
    Ok(manifest)
}

fn parse_manifest(path: &Path, contents: &str) -> Result<BlueprintManifest, RegistryError> {
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(contents).map_err(|source| RegistryError::ParseJson {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(contents).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `blueprint.yaml` takes its directory's name; any other file its stem.
fn default_id(manifest_path: &Path, root: &Path) -> String {
    let named_by_dir = manifest_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| MANIFEST_FILE_NAMES.contains(&n));
    let source = if named_by_dir {
        root.file_name()
    } else {
        manifest_path.file_stem()
    };
    source
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_sources(manifest: &mut BlueprintManifest) -> Result<(), RegistryError> {
    let id = manifest.id.clone();
    let root = manifest.root.clone();
    for (index, file) in manifest.files.iter_mut().enumerate() {
        match (file.source.clone(), file.content.is_some()) {
            (Some(_), true) => {
                return Err(invalid(
                    &id,
                    format!(
                        "file #{index} ('{}') declares both `source` and `content`",
                        file.destination
                    ),
                ))
            }
            (None, false) => {
                return Err(invalid(
                    &id,
                    format!(
                        "file #{index} ('{}') declares neither `source` nor `content`",
                        file.destination
                    ),
                ))
            }
            (None, true) => {}
            (Some(source), false) => {
                if !is_contained(&source) {
                    return Err(invalid(
                        &id,
                        format!(
                            "file #{index} source '{}' must be relative to the blueprint directory",
                            source.display()
                        ),
                    ));
                }
                let path = root.join(&source);
                let text = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
                file.content = Some(text);
            }
        }
    }
    Ok(())
}

/// Relative and free of `..` segments.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ---------------------------------------------------------------------------
// 3. Validation
// ---------------------------------------------------------------------------

/// Check the structural invariants of a manifest.
///
/// - id and name are non-empty
/// - variable names are identifiers and unique
/// - each variable's `default`/`choices`/`validation` are consistent
/// - every file has template content and a non-empty `destination`
/// - every `condition` parses (variable existence is checked at generation time)
/// - dependencies name a module; post-hooks name a command
pub fn validate_manifest(manifest: &BlueprintManifest) -> Result<(), RegistryError> {
    let id = manifest.id.as_str();
    if id.trim().is_empty() {
        return Err(invalid(id, "blueprint id is empty"));
    }
    if manifest.name.trim().is_empty() {
        return Err(invalid(id, "blueprint name is empty"));
    }

    let mut seen = HashSet::new();
    for def in &manifest.variables {
        if !is_identifier(&def.name) {
            return Err(invalid(
                id,
                format!("variable name '{}' is not a valid identifier", def.name),
            ));
        }
        if !seen.insert(def.name.as_str()) {
            return Err(invalid(id, format!("variable '{}' is declared twice", def.name)));
        }
        variables::check_definition(def).map_err(|e| invalid(id, e.to_string()))?;
    }

    for (index, file) in manifest.files.iter().enumerate() {
        if file.destination.trim().is_empty() {
            return Err(invalid(id, format!("file #{index} has an empty destination")));
        }
        if file.content.is_none() {
            return Err(invalid(
                id,
                format!("file #{index} ('{}') has no template content", file.destination),
            ));
        }
        check_condition(id, &format!("file '{}'", file.destination), file.condition.as_deref())?;
    }

    for dep in &manifest.dependencies {
        if dep.module.trim().is_empty() {
            return Err(invalid(id, "dependency with empty module"));
        }
        check_condition(id, &format!("dependency '{}'", dep.module), dep.condition.as_deref())?;
    }

    for hook in &manifest.post_hooks {
        if hook.command.trim().is_empty() {
            return Err(invalid(id, "post-hook with empty command"));
        }
        check_condition(id, &format!("post-hook '{}'", hook.command), hook.condition.as_deref())?;
    }
    Ok(())
}

fn check_condition(id: &str, owner: &str, condition: Option<&str>) -> Result<(), RegistryError> {
    match condition {
        Some(expr) => Condition::parse(expr)
            .map(|_| ())
            .map_err(|e| invalid(id, format!("{owner}: {e}"))),
        None => Ok(()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Conditions naming undeclared variables will fail at generation time.
fn warn_undeclared_references(manifest: &BlueprintManifest) {
    let conditions = manifest
        .files
        .iter()
        .filter_map(|f| f.condition.as_deref())
        .chain(manifest.dependencies.iter().filter_map(|d| d.condition.as_deref()))
        .chain(manifest.post_hooks.iter().filter_map(|h| h.condition.as_deref()));

    for expr in conditions {
        let Ok(cond) = Condition::parse(expr) else {
            continue;
        };
        for name in cond.variables() {
            if manifest.variable(name).is_none() {
                tracing::warn!(
                    "blueprint '{}': condition `{}` references undeclared variable '{}'",
                    manifest.id,
                    expr,
                    name
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Registry
// ---------------------------------------------------------------------------

/// Read-only set of loaded blueprints, keyed by id.
///
/// Constructed once; there is no mutation after construction, so shared
/// references may be used from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    blueprints: BTreeMap<String, BlueprintManifest>,
}

impl Registry {
    /// Build a registry from already-loaded manifests.
    ///
    /// Each manifest is validated; duplicate ids are rejected.
    pub fn from_manifests(
        manifests: impl IntoIterator<Item = BlueprintManifest>,
    ) -> Result<Registry, RegistryError> {
        let mut blueprints: BTreeMap<String, BlueprintManifest> = BTreeMap::new();
        for manifest in manifests {
            validate_manifest(&manifest)?;
            if let Some(existing) = blueprints.get(&manifest.id) {
                return Err(RegistryError::DuplicateBlueprint {
                    id: manifest.id.clone(),
                    first: existing.root.clone(),
                    second: manifest.root.clone(),
                });
            }
            blueprints.insert(manifest.id.clone(), manifest);
        }
        Ok(Registry { blueprints })
    }

    /// Load every blueprint under `dir`.
    ///
    /// Sub-directories holding a manifest file and top-level `*.yaml`/`*.yml`/
    /// `*.json` files are loaded in file-name order. Sub-directories without a
    /// manifest are skipped. A missing `dir` yields an empty registry.
    pub fn load_dir(dir: &Path) -> Result<Registry, RegistryError> {
        if !dir.exists() {
            return Ok(Registry::default());
        }
        let mut entries = std::fs::read_dir(dir)
            .map_err(|e| io_err(dir, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io_err(dir, e))?;
        entries.sort_by_key(|e| e.file_name());

        let mut manifests = Vec::new();
        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                if find_manifest_in(&path).is_some() {
                    manifests.push(load_manifest(&path)?);
                }
            } else if is_manifest_ext(&path) {
                manifests.push(load_manifest(&path)?);
            }
        }
        Registry::from_manifests(manifests)
    }

    /// Load `<home>/.blueprint/blueprints/`.
    pub fn load_at(home: &Path) -> Result<Registry, RegistryError> {
        Registry::load_dir(&blueprints_dir_at(home))
    }

    /// `load_at` convenience wrapper.
    pub fn load_default() -> Result<Registry, RegistryError> {
        Registry::load_at(&home()?)
    }

    pub fn get(&self, id: &str) -> Result<&BlueprintManifest, RegistryError> {
        self.blueprints
            .get(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// All blueprints, ordered by id.
    pub fn list(&self) -> Vec<&BlueprintManifest> {
        self.blueprints.values().collect()
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileEntry, VarType, VariableDef};
    use tempfile::TempDir;

    fn manifest(id: &str) -> BlueprintManifest {
        BlueprintManifest {
            id: id.to_string(),
            name: format!("{id} blueprint"),
            description: String::new(),
            kind: "backend".into(),
            version: None,
            variables: vec![VariableDef::new("Name", VarType::String).required()],
            files: vec![FileEntry::inline("{{.Name}}/main.go", "package main\n")],
            dependencies: vec![],
            post_hooks: vec![],
            root: PathBuf::new(),
        }
    }

    #[test]
    fn blueprints_dir_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(blueprints_dir_at(home.path()).ends_with(".blueprint/blueprints"));
    }

    #[test]
    fn duplicate_variable_names_are_rejected() {
        let mut m = manifest("svc");
        m.variables.push(VariableDef::new("Name", VarType::String));
        let err = validate_manifest(&m).unwrap_err();
        assert!(err.to_string().contains("declared twice"), "got: {err}");
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let mut m = manifest("svc");
        m.variables.push(VariableDef::new("has-dash", VarType::String));
        assert!(validate_manifest(&m).is_err());
    }

    #[test]
    fn malformed_condition_is_rejected() {
        let mut m = manifest("svc");
        m.files[0].condition = Some("eq(.Name".into());
        let err = validate_manifest(&m).unwrap_err();
        assert!(matches!(err, RegistryError::ManifestInvalid { .. }));
        assert!(err.to_string().contains("{{.Name}}/main.go"), "got: {err}");
    }

    #[test]
    fn condition_on_undeclared_variable_passes_validation() {
        let mut m = manifest("svc");
        m.files[0].condition = Some("eq(.Undeclared, true)".into());
        validate_manifest(&m).expect("unknown variables are a generation-time error");
    }

    #[test]
    fn empty_destination_is_rejected() {
        let mut m = manifest("svc");
        m.files[0].destination = "  ".into();
        assert!(validate_manifest(&m).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Registry::from_manifests(vec![manifest("svc"), manifest("svc")]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateBlueprint { .. }));
    }

    #[test]
    fn get_and_list() {
        let reg = Registry::from_manifests(vec![manifest("web"), manifest("api")]).unwrap();
        assert_eq!(reg.get("api").unwrap().id, "api");
        let ids: Vec<&str> = reg.list().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["api", "web"]);
        assert!(matches!(reg.get("cli"), Err(RegistryError::NotFound { .. })));
    }

    #[test]
    fn load_dir_missing_is_empty() {
        let home = TempDir::new().expect("tempdir");
        let reg = Registry::load_at(home.path()).expect("load");
        assert!(reg.is_empty());
    }

    #[test]
    fn source_outside_blueprint_dir_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("blueprint.yaml"),
            "name: x\nfiles:\n  - source: ../secret.txt\n    destination: out.txt\n",
        )
        .unwrap();
        let err = load_manifest(dir.path()).unwrap_err();
        assert!(err.to_string().contains("relative"), "got: {err}");
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Registry>();
    }
}
