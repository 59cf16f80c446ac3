//! Variable resolution: raw user input to a typed [`GenerationContext`].
//!
//! Per declared variable, in declaration order:
//!
//! 1. Supplied input is coerced to the declared type, else the default is
//!    coerced, else a required variable fails with `MissingRequired`, else the
//!    type's zero value is used.
//! 2. Required string/list variables must be non-empty.
//! 3. `choices` membership, then `validation` regex.
//!
//! Input keys that no declaration names are ignored.

use std::collections::BTreeMap;

use regex::Regex;

use crate::context::GenerationContext;
use crate::error::VariableError;
use crate::types::{RawValue, Value, VarType, VariableDef};

/// Raw variable values keyed by variable name, as supplied by a front-end.
pub type VariableInput = BTreeMap<String, RawValue>;

/// Resolve `input` against `vars`, returning the first error encountered.
pub fn resolve(
    vars: &[VariableDef],
    input: &VariableInput,
) -> Result<GenerationContext, VariableError> {
    let mut resolved = Vec::with_capacity(vars.len());
    for def in vars {
        let value = resolve_one(def, input.get(&def.name))?;
        resolved.push((def.name.clone(), value));
    }
    Ok(resolved.into_iter().collect())
}

fn resolve_one(def: &VariableDef, supplied: Option<&RawValue>) -> Result<Value, VariableError> {
    let raw = match (supplied, &def.default) {
        (Some(raw), _) => raw,
        (None, Some(default)) => default,
        (None, None) if def.required => {
            return Err(VariableError::MissingRequired {
                name: def.name.clone(),
            })
        }
        (None, None) => {
            tracing::debug!("variable '{}' unset, using zero value", def.name);
            return Ok(Value::zero(def.var_type));
        }
    };

    let value = coerce(&def.name, def.var_type, raw)?;
    if def.required && value.is_empty() {
        return Err(VariableError::MissingRequired {
            name: def.name.clone(),
        });
    }
    check_choices(def, &value)?;
    check_validation(def, &value)?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Definition checks (used by the registry on load)
// ---------------------------------------------------------------------------

/// Check the declaration itself: `choices` and `default` coerce to the declared
/// type, the `validation` regex compiles, and the default satisfies both.
pub fn check_definition(def: &VariableDef) -> Result<(), VariableError> {
    for choice in &def.choices {
        coerce(&def.name, choice_type(def.var_type), choice)?;
    }
    if let Some(pattern) = &def.validation {
        compile(def, pattern)?;
    }
    if let Some(default) = &def.default {
        let value = coerce(&def.name, def.var_type, default)?;
        check_choices(def, &value)?;
        check_validation(def, &value)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce a raw value to `var_type`.
///
/// | target | accepts                                                   |
/// |--------|-----------------------------------------------------------|
/// | string | string, int, bool (display form)                          |
/// | int    | int, decimal string                                       |
/// | bool   | bool, `true/false/yes/no/1/0` (case-insensitive)          |
/// | list   | sequence of scalars, comma-separated string               |
pub fn coerce(name: &str, var_type: VarType, raw: &RawValue) -> Result<Value, VariableError> {
    let coerced = match (var_type, raw) {
        (VarType::String, RawValue::List(_)) => None,
        (VarType::String, scalar) => Some(Value::String(scalar.to_string())),
        (VarType::Int, RawValue::Int(i)) => Some(Value::Int(*i)),
        (VarType::Int, RawValue::String(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
        (VarType::Bool, RawValue::Bool(b)) => Some(Value::Bool(*b)),
        (VarType::Bool, RawValue::String(s)) => parse_bool(s).map(Value::Bool),
        (VarType::List, RawValue::List(items)) => items
            .iter()
            .map(|item| match item {
                RawValue::List(_) => None,
                scalar => Some(scalar.to_string()),
            })
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        (VarType::List, RawValue::String(s)) => Some(Value::List(split_list(s))),
        _ => None,
    };
    coerced.ok_or_else(|| VariableError::InvalidType {
        name: name.to_string(),
        expected: var_type,
        found: raw.to_string(),
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Choices of a list variable are its admissible elements.
fn choice_type(var_type: VarType) -> VarType {
    match var_type {
        VarType::List => VarType::String,
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Choices and validation
// ---------------------------------------------------------------------------

fn check_choices(def: &VariableDef, value: &Value) -> Result<(), VariableError> {
    if def.choices.is_empty() {
        return Ok(());
    }
    let allowed = def
        .choices
        .iter()
        .map(|c| coerce(&def.name, choice_type(def.var_type), c))
        .collect::<Result<Vec<_>, _>>()?;

    let rejected = match value {
        Value::List(items) => items
            .iter()
            .find(|item| !allowed.contains(&Value::String((*item).clone())))
            .cloned(),
        scalar if !allowed.contains(scalar) => Some(scalar.to_string()),
        _ => None,
    };
    match rejected {
        Some(value) => Err(VariableError::InvalidChoice {
            name: def.name.clone(),
            value,
            choices: allowed.iter().map(ToString::to_string).collect(),
        }),
        None => Ok(()),
    }
}

fn check_validation(def: &VariableDef, value: &Value) -> Result<(), VariableError> {
    let Some(pattern) = &def.validation else {
        return Ok(());
    };
    let candidates: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::List(items) => items.iter().map(String::as_str).collect(),
        Value::Int(_) | Value::Bool(_) => return Ok(()),
    };
    let re = compile(def, pattern)?;
    match candidates.into_iter().find(|c| !re.is_match(c)) {
        Some(bad) => Err(VariableError::ValidationFailed {
            name: def.name.clone(),
            value: bad.to_string(),
            pattern: pattern.clone(),
        }),
        None => Ok(()),
    }
}

fn compile(def: &VariableDef, pattern: &str) -> Result<Regex, VariableError> {
    Regex::new(pattern).map_err(|source| VariableError::BadPattern {
        name: def.name.clone(),
        pattern: pattern.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
