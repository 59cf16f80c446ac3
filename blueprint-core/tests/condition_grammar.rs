//! Table-driven coverage of the condition grammar.

use blueprint_core::{condition, Condition, ErrorKind, GenerationContext, Value};
use rstest::rstest;

fn ctx() -> GenerationContext {
    [
        ("Framework", Value::from("echo")),
        ("UseAuth", Value::Bool(false)),
        ("Replicas", Value::Int(3)),
        ("Features", Value::List(vec!["metrics".into()])),
    ]
    .into_iter()
    .collect()
}

#[rstest]
#[case("true", true)]
#[case("false", false)]
#[case(r#"eq(.Framework, "echo")"#, true)]
#[case(r#"ne(.Framework, "echo")"#, false)]
#[case("eq(.Replicas, 3)", true)]
#[case("eq(.UseAuth, false)", true)]
#[case("not(.UseAuth)", true)]
#[case(r#"and(not(.UseAuth), eq(.Framework, "echo"))"#, true)]
#[case(r#"or(.UseAuth, eq(.Replicas, 4), eq(.Framework, "gin"))"#, false)]
#[case("and(true, true, true, false)", false)]
#[case(r#"eq(.Replicas, "3")"#, false)]
#[case("eq(eq(1, 1), true)", true)]
#[case("  eq( .Replicas ,3 )  ", true)]
fn evaluates(#[case] expr: &str, #[case] expected: bool) {
    assert_eq!(condition::evaluate(expr, &ctx()).unwrap(), expected, "{expr}");
}

#[rstest]
#[case("eq(.Nope, 1)", ErrorKind::UnknownVariable)]
#[case("not(.Nope)", ErrorKind::UnknownVariable)]
#[case("eq(", ErrorKind::MalformedExpression)]
#[case("eq .A 1", ErrorKind::MalformedExpression)]
#[case("len(.Features)", ErrorKind::MalformedExpression)]
#[case("and(.Replicas, true)", ErrorKind::MalformedExpression)]
#[case("42", ErrorKind::MalformedExpression)]
#[case("eq(.A, 1),", ErrorKind::MalformedExpression)]
#[case("eq(.A, @)", ErrorKind::MalformedExpression)]
fn fails(#[case] expr: &str, #[case] kind: ErrorKind) {
    let err = condition::evaluate(expr, &ctx()).unwrap_err();
    assert_eq!(err.kind(), kind, "{expr}: {err}");
}

#[test]
fn parsed_condition_keeps_source_for_messages() {
    let cond = Condition::parse(r#"eq(.Framework, "gin")"#).unwrap();
    assert_eq!(cond.source(), r#"eq(.Framework, "gin")"#);
    assert_eq!(cond.to_string(), cond.source());
}
