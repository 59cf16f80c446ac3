//! Manifest loading, validation, and registry lookup against real directories.

use assert_fs::prelude::*;
use blueprint_core::{
    load_manifest, registry, ErrorKind, RawValue, Registry, RegistryError, VarType,
};
use predicates::prelude::predicate;

const SERVICE_MANIFEST: &str = r#"
name: Go HTTP service
description: Minimal HTTP service
type: backend
version: "1.2.0"
variables:
  - name: Name
    type: string
    required: true
    validation: "^[a-z][a-z0-9-]*$"
  - name: Framework
    type: string
    default: gin
    choices: [gin, echo, chi]
  - name: UseAuth
    type: bool
    default: false
files:
  - source: templates/main.go.tmpl
    destination: "{{.Name}}/main.go"
  - content: "package auth\n"
    destination: "{{.Name}}/auth/auth.go"
    condition: "eq(.UseAuth, true)"
dependencies:
  - module: github.com/gin-gonic/gin
    version: v1.9.1
    condition: 'eq(.Framework, "gin")'
post_hooks:
  - command: go
    args: [mod, tidy]
"#;

fn write_service(dir: &assert_fs::fixture::ChildPath) {
    dir.child("blueprint.yaml").write_str(SERVICE_MANIFEST).unwrap();
    dir.child("templates/main.go.tmpl")
        .write_str("package main\n\n// {{.Name}}\n")
        .unwrap();
}

// ---------------------------------------------------------------------------
// 1. Single manifest
// ---------------------------------------------------------------------------

#[test]
fn load_directory_manifest_reads_sources_and_defaults_id() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let dir = tmp.child("go-service");
    write_service(&dir);

    let m = load_manifest(dir.path()).expect("load");
    assert_eq!(m.id, "go-service");
    assert_eq!(m.kind, "backend");
    assert_eq!(m.version.as_deref(), Some("1.2.0"));
    assert_eq!(m.variables.len(), 3);
    assert_eq!(m.variables[1].default, Some(RawValue::String("gin".into())));
    assert_eq!(m.variables[2].var_type, VarType::Bool);
    assert_eq!(
        m.files[0].content.as_deref(),
        Some("package main\n\n// {{.Name}}\n")
    );
    assert_eq!(m.post_hooks[0].args, vec!["mod", "tidy"]);
    assert!(m.root.ends_with("go-service"));
}

#[test]
fn load_json_manifest_uses_file_stem_as_id() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("readme-only.json");
    file.write_str(
        r#"{"name": "Readme", "files": [{"destination": "README.md", "content": "hi"}]}"#,
    )
    .unwrap();
    let m = load_manifest(file.path()).expect("load");
    assert_eq!(m.id, "readme-only");
    assert!(m.variables.is_empty());
}

#[test]
fn explicit_id_is_kept() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("x.yaml");
    file.write_str("id: custom\nname: X\n").unwrap();
    assert_eq!(load_manifest(file.path()).unwrap().id, "custom");
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("broken.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed").unwrap();

    let err = load_manifest(file.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.yaml"));
    assert_eq!(err.kind(), ErrorKind::ManifestInvalid);
}

#[test]
fn missing_source_file_is_io_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let dir = tmp.child("svc");
    dir.child("blueprint.yaml")
        .write_str("name: svc\nfiles:\n  - source: nope.tmpl\n    destination: a.txt\n")
        .unwrap();
    let err = load_manifest(dir.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("nope.tmpl"));
}

#[test]
fn source_and_content_together_are_invalid() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("both.yaml");
    file.write_str(
        "name: both\nfiles:\n  - source: a.tmpl\n    content: x\n    destination: a.txt\n",
    )
    .unwrap();
    let err = load_manifest(file.path()).unwrap_err();
    assert!(err.to_string().contains("both `source` and `content`"), "got: {err}");
}

#[test]
fn default_outside_choices_is_invalid() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("bad.yaml");
    file.write_str(
        "name: bad\nvariables:\n  - name: Db\n    default: sqlite\n    choices: [pg, mysql]\n",
    )
    .unwrap();
    let err = load_manifest(file.path()).unwrap_err();
    assert!(matches!(err, RegistryError::ManifestInvalid { .. }), "got: {err}");
    assert!(err.to_string().contains("sqlite"));
}

#[test]
fn malformed_dependency_condition_is_invalid() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("bad.yaml");
    file.write_str(
        "name: bad\ndependencies:\n  - module: x\n    condition: 'eq(.A, 1'\n",
    )
    .unwrap();
    let err = load_manifest(file.path()).unwrap_err();
    assert!(err.to_string().contains("dependency 'x'"), "got: {err}");
}

#[test]
fn deeply_nested_condition_is_rejected_on_load() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let depth = 100_000;
    let condition = format!("{}true{}", "not(".repeat(depth), ")".repeat(depth));
    tmp.child("deep.yaml")
        .write_str(&format!(
            "name: deep\nfiles:\n  - destination: a.txt\n    content: a\n    \
             condition: '{condition}'\n"
        ))
        .unwrap();
    let err = Registry::load_dir(tmp.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ManifestInvalid);
    assert!(err.to_string().contains("nested deeper"), "got: {err}");
}

#[test]
fn missing_path_is_not_found() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let err = load_manifest(&tmp.path().join("absent")).unwrap_err();
    assert!(matches!(err, RegistryError::ManifestNotFound { .. }));
}

// ---------------------------------------------------------------------------
// 2. Registry
// ---------------------------------------------------------------------------

#[test]
fn load_at_discovers_directories_and_single_files() {
    let home = assert_fs::TempDir::new().unwrap();
    let root = home.child(".blueprint/blueprints");
    write_service(&root.child("go-service"));
    root.child("readme.yaml")
        .write_str("name: Readme\nfiles:\n  - destination: README.md\n    content: hello\n")
        .unwrap();
    root.child("notes").create_dir_all().unwrap();
    root.child("notes/todo.txt").write_str("not a blueprint").unwrap();

    root.child("go-service/blueprint.yaml")
        .assert(predicate::path::exists());

    let reg = Registry::load_at(home.path()).expect("load");
    let ids: Vec<&str> = reg.list().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["go-service", "readme"]);
    assert_eq!(reg.get("readme").unwrap().files.len(), 1);
}

#[test]
#[cfg(unix)]
fn unreadable_directory_is_io_error() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = assert_fs::TempDir::new().unwrap();
    let dir = tmp.child("locked");
    dir.create_dir_all().unwrap();
    dir.child("a.yaml").write_str("name: A\n").unwrap();
    std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users ignore directory permissions.
    let readable = std::fs::read_dir(dir.path()).is_ok();
    let result = Registry::load_dir(dir.path());
    std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
    if readable {
        return;
    }

    let err = result.unwrap_err();
    assert!(matches!(err, RegistryError::Io { .. }), "got: {err}");
}

#[test]
fn duplicate_ids_across_files_are_rejected() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("a.yaml").write_str("id: same\nname: A\n").unwrap();
    tmp.child("b.yaml").write_str("id: same\nname: B\n").unwrap();
    let err = Registry::load_dir(tmp.path()).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateBlueprint { .. }), "got: {err}");
}

#[test]
fn concurrent_get_and_list_need_no_locking() {
    let tmp = assert_fs::TempDir::new().unwrap();
    write_service(&tmp.child("go-service"));
    let reg = Registry::load_dir(tmp.path()).unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    assert_eq!(reg.get("go-service").unwrap().variables.len(), 3);
                    assert_eq!(reg.list().len(), 1);
                }
            });
        }
    });
}

#[test]
fn blueprints_dir_at_layout() {
    let home = assert_fs::TempDir::new().unwrap();
    let dir = registry::blueprints_dir_at(home.path());
    assert!(dir.starts_with(home.path()));
    assert!(dir.ends_with(".blueprint/blueprints"));
}
