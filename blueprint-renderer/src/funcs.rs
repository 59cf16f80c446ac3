//! Pipeline functions: `{{.Name | replace "-" "_" | lower}}`.
//!
//! | function          | effect                                             |
//! |-------------------|----------------------------------------------------|
//! | `lower`           | lower-case                                         |
//! | `upper`           | upper-case                                         |
//! | `trim`            | strip surrounding whitespace                       |
//! | `replace OLD NEW` | replace every occurrence of OLD with NEW           |
//! | `default VALUE`   | VALUE when the input is an empty string or list    |
//! | `snake`           | `snake_case`                                       |
//! | `kebab`           | `kebab-case`                                       |
//! | `camel`           | `camelCase`                                        |
//! | `pascal`          | `PascalCase`                                       |
//!
//! String functions apply element-wise to lists.

use std::fmt;

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

use blueprint_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeFunc {
    Lower,
    Upper,
    Trim,
    Replace,
    Default,
    Snake,
    Kebab,
    Camel,
    Pascal,
}

impl PipeFunc {
    pub fn from_name(name: &str) -> Option<PipeFunc> {
        match name {
            "lower" => Some(PipeFunc::Lower),
            "upper" => Some(PipeFunc::Upper),
            "trim" => Some(PipeFunc::Trim),
            "replace" => Some(PipeFunc::Replace),
            "default" => Some(PipeFunc::Default),
            "snake" => Some(PipeFunc::Snake),
            "kebab" => Some(PipeFunc::Kebab),
            "camel" => Some(PipeFunc::Camel),
            "pascal" => Some(PipeFunc::Pascal),
            _ => None,
        }
    }

    /// Number of explicit arguments, not counting the piped-in value.
    pub fn arity(self) -> usize {
        match self {
            PipeFunc::Replace => 2,
            PipeFunc::Default => 1,
            _ => 0,
        }
    }

    /// Apply to `input`; `args.len()` equals [`PipeFunc::arity`].
    pub fn apply(self, input: Value, args: &[Value]) -> Value {
        match self {
            PipeFunc::Default => {
                if input.is_empty() {
                    args[0].clone()
                } else {
                    input
                }
            }
            PipeFunc::Replace => {
                let from = args[0].to_string();
                let to = args[1].to_string();
                map_text(input, |s| s.replace(&from, &to))
            }
            PipeFunc::Lower => map_text(input, |s| s.to_lowercase()),
            PipeFunc::Upper => map_text(input, |s| s.to_uppercase()),
            PipeFunc::Trim => map_text(input, |s| s.trim().to_string()),
            PipeFunc::Snake => map_text(input, |s| s.to_snake_case()),
            PipeFunc::Kebab => map_text(input, |s| s.to_kebab_case()),
            PipeFunc::Camel => map_text(input, |s| s.to_lower_camel_case()),
            PipeFunc::Pascal => map_text(input, |s| s.to_upper_camel_case()),
        }
    }
}

impl fmt::Display for PipeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipeFunc::Lower => "lower",
            PipeFunc::Upper => "upper",
            PipeFunc::Trim => "trim",
            PipeFunc::Replace => "replace",
            PipeFunc::Default => "default",
            PipeFunc::Snake => "snake",
            PipeFunc::Kebab => "kebab",
            PipeFunc::Camel => "camel",
            PipeFunc::Pascal => "pascal",
        };
        f.write_str(s)
    }
}

fn map_text(input: Value, f: impl Fn(&str) -> String) -> Value {
    match input {
        Value::List(items) => Value::List(items.iter().map(|s| f(s)).collect()),
        other => Value::String(f(&other.to_string())),
    }
}
