//! Parse tree fixtures shared by unit tests.

use serde_json::{Value, json};

use crate::compiler::syntax::Program;

/// Deserializes a parse tree fixture.
pub fn program(value: Value) -> Program {
    serde_json::from_value(value).expect("fixture should be a valid parse tree")
}

/// Program with global `decls` and a single `main` procedure running `body`.
pub fn main_program(decls: Value, body: Value) -> Program {
    program(json!({
        "ident": "test",
        "decls": decls,
        "funcs": [{ "ident": "main", "body": body }]
    }))
}

/// Expression from infix tokens, e.g. `["a", "+", "b", "*", "2"]`. A token
/// equal to `+` or `-` is an additive operator, `*` or `/` multiplicative.
pub fn expr(tokens: &[&str]) -> Value {
    let mut terms: Vec<(Option<&str>, Vec<&str>)> = vec![(None, vec![])];

    for tok in tokens {
        match *tok {
            "+" | "-" => terms.push((Some(*tok), vec![])),
            _ => terms.last_mut().expect("terms is never empty").1.push(*tok),
        }
    }

    let rest: Vec<Value> = terms[1..]
        .iter()
        .map(|(op, factor_tokens)| json!([op, factor(factor_tokens)]))
        .collect();

    json!({ "first": factor(&terms[0].1), "rest": rest })
}

fn factor(tokens: &[&str]) -> Value {
    let rest: Vec<Value> = tokens[1..]
        .chunks(2)
        .map(|pair| json!([pair[0], { "atom": pair[1] }]))
        .collect();

    json!({ "first": { "atom": tokens[0] }, "rest": rest })
}

/// `target := <tokens>` statement.
pub fn assign(target: &str, tokens: &[&str]) -> Value {
    json!({ "assign": { "target": target, "expr": expr(tokens) } })
}

/// `INT`/`FLOAT` declaration.
pub fn var(ty: &str, idents: &[&str]) -> Value {
    json!({ "var": { "ty": ty, "idents": idents } })
}

/// `STRING ident := literal` declaration.
pub fn string(ident: &str, literal: &str) -> Value {
    json!({ "string": { "ident": ident, "literal": literal } })
}

/// Comparison `lhs < rhs` between two single operands.
pub fn cond(lhs: &str, rhs: &str) -> Value {
    json!({ "lhs": expr(&[lhs]), "op": "<", "rhs": expr(&[rhs]) })
}
