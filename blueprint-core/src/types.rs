//! Domain types for blueprint manifests and resolved variable values.
//!
//! Manifest types deserialize from YAML or JSON via serde. Field names match
//! the manifest keys except `type`, which becomes `kind` / `var_type`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Variable types and values
// ---------------------------------------------------------------------------

/// Declared type of a blueprint variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    #[default]
    String,
    Int,
    Bool,
    /// Sequence of strings, iterable with `{{range}}`.
    List,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::String => write!(f, "string"),
            VarType::Int => write!(f, "int"),
            VarType::Bool => write!(f, "bool"),
            VarType::List => write!(f, "list"),
        }
    }
}

/// Untyped value as supplied by a front-end or written in a manifest.
///
/// Resolved once into a typed [`Value`] by the variable resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<RawValue>),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::String(s) => f.write_str(s),
            RawValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::String(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(items: Vec<T>) -> Self {
        RawValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// A resolved, typed variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    /// The zero value used for optional variables that have neither input nor default.
    pub fn zero(var_type: VarType) -> Self {
        match var_type {
            VarType::String => Value::String(String::new()),
            VarType::Int => Value::Int(0),
            VarType::Bool => Value::Bool(false),
            VarType::List => Value::List(vec![]),
        }
    }

    pub fn var_type(&self) -> VarType {
        match self {
            Value::String(_) => VarType::String,
            Value::Int(_) => VarType::Int,
            Value::Bool(_) => VarType::Bool,
            Value::List(_) => VarType::List,
        }
    }

    /// `true` for an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Int(_) | Value::Bool(_) => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Lists render as their elements joined with `", "`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// Manifest entries
// ---------------------------------------------------------------------------

/// Declaration of a single blueprint variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub var_type: VarType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<RawValue>,
    /// Regex the resolved string (or every list element) must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    /// Prompt text for interactive front-ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariableDef {
    /// A non-required string variable with no default.
    pub fn new(name: impl Into<String>, var_type: VarType) -> Self {
        VariableDef {
            name: name.into(),
            var_type,
            required: false,
            default: None,
            choices: vec![],
            validation: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<RawValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_choices<T: Into<RawValue>>(mut self, choices: Vec<T>) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validation(mut self, pattern: impl Into<String>) -> Self {
        self.validation = Some(pattern.into());
        self
    }
}

/// A file the blueprint generates.
///
/// Exactly one of `source` or `content` is declared in a manifest. After
/// [`crate::registry::load_manifest`], `content` always holds the template text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Template file, relative to the manifest's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Inline template text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Destination path template, relative to the output directory.
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl FileEntry {
    /// An entry with inline template content and no condition.
    pub fn inline(destination: impl Into<String>, content: impl Into<String>) -> Self {
        FileEntry {
            source: None,
            content: Some(content.into()),
            destination: destination.into(),
            condition: None,
        }
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// An external package the generated project depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Development-only dependency.
    #[serde(default)]
    pub dev: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A command to run in the output directory after materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHook {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Anything gated by an optional condition string.
pub trait Conditional {
    fn condition(&self) -> Option<&str>;
}

impl Conditional for FileEntry {
    fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl Conditional for DependencyEntry {
    fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl Conditional for PostHook {
    fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

// ---------------------------------------------------------------------------
// BlueprintManifest
// ---------------------------------------------------------------------------

/// A loaded blueprint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintManifest {
    /// Defaults to the blueprint directory name (or the manifest file stem).
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub variables: Vec<VariableDef>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    pub post_hooks: Vec<PostHook>,
    /// Directory the manifest was loaded from.
    #[serde(skip)]
    pub root: PathBuf,
}

impl BlueprintManifest {
    pub fn variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables.iter().find(|v| v.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
