//! Template evaluation: [`Template`] and the one-shot [`render`].
//!
//! Rendering is a pure function of `(template text, context)`: no I/O, no
//! clock, no randomness. Unresolved references fail with
//! [`RenderError::UndefinedVariable`] rather than rendering as empty.

use blueprint_core::{GenerationContext, Value, VariableLookup};

use crate::context::Scope;
use crate::error::RenderError;
use crate::parser::{self, Node, Operand, Pipeline};

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A parsed template, reusable across contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `text`. Syntax errors carry the line and offending tag.
    pub fn parse(text: &str) -> Result<Template, RenderError> {
        Ok(Template {
            nodes: parser::parse(text)?,
        })
    }

    /// `true` when the template has no tags and renders to itself.
    pub fn is_literal(&self) -> bool {
        self.nodes.iter().all(|n| matches!(n, Node::Text(_)))
    }

    /// Render against `ctx`.
    pub fn render(&self, ctx: &GenerationContext) -> Result<String, RenderError> {
        let mut out = String::new();
        render_nodes(&self.nodes, &Scope::new(ctx), &mut out)?;
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render(text: &str, ctx: &GenerationContext) -> Result<String, RenderError> {
    Template::parse(text)?.render(ctx)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn render_nodes(nodes: &[Node], scope: &Scope<'_>, out: &mut String) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action { pipeline, line } => {
                let value = eval_pipeline(pipeline, scope, *line)?;
                out.push_str(&value.to_string());
            }
            Node::If {
                branches,
                otherwise,
            } => {
                let mut taken = None;
                for branch in branches {
                    let hit = branch
                        .condition
                        .evaluate(scope)
                        .map_err(|source| RenderError::Condition {
                            line: branch.line,
                            source,
                        })?;
                    if hit {
                        taken = Some(&branch.body);
                        break;
                    }
                }
                render_nodes(taken.unwrap_or(otherwise), scope, out)?;
            }
            Node::Range {
                operand,
                line,
                body,
                otherwise,
            } => {
                let items = match eval_operand(operand, scope, *line)? {
                    Value::List(items) => items,
                    other => {
                        return Err(RenderError::NotIterable {
                            name: operand_name(operand),
                            found: other.var_type(),
                            line: *line,
                        })
                    }
                };
                if items.is_empty() {
                    render_nodes(otherwise, scope, out)?;
                }
                for item in items {
                    let element = Value::String(item);
                    render_nodes(body, &scope.with_dot(&element), out)?;
                }
            }
        }
    }
    Ok(())
}

fn eval_pipeline(
    pipeline: &Pipeline,
    scope: &Scope<'_>,
    line: usize,
) -> Result<Value, RenderError> {
    let mut value = eval_operand(&pipeline.head, scope, line)?;
    for stage in &pipeline.stages {
        let args = stage
            .args
            .iter()
            .map(|a| eval_operand(a, scope, line))
            .collect::<Result<Vec<_>, _>>()?;
        value = stage.func.apply(value, &args);
    }
    Ok(value)
}

fn eval_operand(operand: &Operand, scope: &Scope<'_>, line: usize) -> Result<Value, RenderError> {
    let found = match operand {
        Operand::Literal(s) => return Ok(Value::String(s.clone())),
        Operand::Var(name) => scope.lookup(name),
        Operand::Dot => scope.dot(),
    };
    found.cloned().ok_or_else(|| RenderError::UndefinedVariable {
        name: operand_name(operand),
        line,
    })
}

fn operand_name(operand: &Operand) -> String {
    match operand {
        Operand::Var(name) => format!(".{name}"),
        Operand::Dot => ".".to_string(),
        Operand::Literal(s) => format!("{s:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::ErrorKind;

    fn ctx() -> GenerationContext {
        [
            ("Name", Value::from("user-service")),
            ("UseAuth", Value::Bool(true)),
            ("Port", Value::Int(8080)),
            ("Features", Value::List(vec!["auth".into(), "metrics".into()])),
            ("Empty", Value::List(vec![])),
            ("Blank", Value::from("")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn interpolates_typed_values() {
        let out = render("{{.Name}}:{{.Port}} auth={{.UseAuth}}", &ctx()).unwrap();
        assert_eq!(out, "user-service:8080 auth=true");
    }

    #[test]
    fn undefined_variable_fails() {
        let err = render("a\n{{.Missing}}", &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
        assert_eq!(err.line(), 2);
        assert!(err.to_string().contains(".Missing"));
    }

    #[test]
    fn conditional_blocks() {
        let tpl = r#"{{if eq(.Port, 80)}}http{{else if .UseAuth}}secure{{else}}plain{{end}}"#;
        assert_eq!(render(tpl, &ctx()).unwrap(), "secure");
    }

    #[test]
    fn unknown_variable_in_if_is_undefined() {
        let err = render("{{if .Nope}}x{{end}}", &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn range_binds_dot() {
        let tpl = "{{range .Features}}- {{. | upper}}\n{{end}}";
        assert_eq!(render(tpl, &ctx()).unwrap(), "- AUTH\n- METRICS\n");
    }

    #[test]
    fn range_else_on_empty_list() {
        let tpl = "{{range .Empty}}{{.}}{{else}}none{{end}}";
        assert_eq!(render(tpl, &ctx()).unwrap(), "none");
    }

    #[test]
    fn conditions_inside_range_see_dot() {
        let tpl = r#"{{range .Features}}{{if eq(., "auth")}}[{{.}}]{{end}}{{end}}"#;
        assert_eq!(render(tpl, &ctx()).unwrap(), "[auth]");
    }

    #[test]
    fn range_over_scalar_fails() {
        let err = render("{{range .Name}}x{{end}}", &ctx()).unwrap_err();
        assert!(matches!(err, RenderError::NotIterable { .. }));
        assert_eq!(err.kind(), ErrorKind::TemplateSyntaxError);
    }

    #[test]
    fn dot_outside_range_is_undefined() {
        let err = render("{{.}}", &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn default_applies_to_empty_value() {
        let src = r#"{{.Blank | default "n/a"}}/{{.Name | default "n/a"}}"#;
        let out = render(src, &ctx()).unwrap();
        assert_eq!(out, "n/a/user-service");
    }

    #[test]
    fn pipeline_args_can_reference_variables() {
        let out = render("{{.Blank | default .Name | snake}}", &ctx()).unwrap();
        assert_eq!(out, "user_service");
    }

    #[test]
    fn list_interpolation_joins() {
        assert_eq!(render("{{.Features}}", &ctx()).unwrap(), "auth, metrics");
    }

    #[test]
    fn literal_action_emits_delimiters() {
        assert_eq!(render(r#"{{"{{"}}x{{"}}"}}"#, &ctx()).unwrap(), "{{x}}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let tpl = Template::parse("{{range .Features}}{{.}},{{end}}{{.Name | pascal}}").unwrap();
        let c = ctx();
        let first = tpl.render(&c).unwrap();
        for _ in 0..5 {
            assert_eq!(tpl.render(&c).unwrap(), first);
        }
        assert_eq!(first, "auth,metrics,UserService");
    }

    #[test]
    fn is_literal_detects_plain_text() {
        assert!(Template::parse("main.go").unwrap().is_literal());
        assert!(!Template::parse("{{.Name}}/main.go").unwrap().is_literal());
    }
}
