//! Parse Tree
//!
//! Parse tree of a Little program, as handed over by the parser front end,
//! and the depth-first walk that turns it into traversal events.
//!
//! Every stage that consumes the program implements [`Listener`] and is driven
//! by [`walk`]. Events arrive in grammar order: declarations of a body before
//! its statements, expression operands and operators in infix order.

use std::fmt;

use serde::Deserialize;

use crate::compiler::Result;
use crate::compiler::types::VarType;

/// Root of the parse tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub ident: String,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub funcs: Vec<FuncDecl>,
}

/// Declaration inside a program, procedure or block body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decl {
    /// `INT a, b;` or `FLOAT x;`
    Var { ty: VarType, idents: Vec<String> },
    /// `STRING s := "text";` (`literal` keeps the quotes).
    String { ident: String, literal: String },
}

/// Procedure declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct FuncDecl {
    pub ident: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// Procedure parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct Param {
    pub ty: VarType,
    pub ident: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Assign {
        target: String,
        expr: Expr,
    },
    Read(Vec<String>),
    Write(Vec<String>),
    Return(Expr),
    If {
        cond: Cond,
        #[serde(default)]
        decls: Vec<Decl>,
        #[serde(default)]
        then: Vec<Stmt>,
        #[serde(rename = "else", default)]
        else_part: Option<ElsePart>,
    },
    While {
        cond: Cond,
        #[serde(default)]
        decls: Vec<Decl>,
        #[serde(default)]
        body: Vec<Stmt>,
    },
}

/// `ELSE` branch of an `IF` statement.
#[derive(Debug, Clone, Deserialize)]
pub struct ElsePart {
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// Comparison guarding an `IF` or `WHILE`.
#[derive(Debug, Clone, Deserialize)]
pub struct Cond {
    pub lhs: Expr,
    pub op: CompOp,
    pub rhs: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CompOp {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = ">=")]
    GreaterEq,
}

/// Additive tier: `factor (addop factor)*`.
#[derive(Debug, Clone, Deserialize)]
pub struct Expr {
    pub first: Factor,
    #[serde(default)]
    pub rest: Vec<(AddOp, Factor)>,
}

/// Multiplicative tier: `primary (mulop primary)*`.
#[derive(Debug, Clone, Deserialize)]
pub struct Factor {
    pub first: Primary,
    #[serde(default)]
    pub rest: Vec<(MulOp, Primary)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primary {
    /// Identifier or numeric literal, as source text.
    Atom(String),
    /// Parenthesized sub-expression.
    Group(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AddOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
}

impl fmt::Display for AddOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddOp::Add => write!(f, "+"),
            AddOp::Sub => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MulOp {
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl fmt::Display for MulOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MulOp::Mul => write!(f, "*"),
            MulOp::Div => write!(f, "/"),
        }
    }
}

/// Receiver of traversal events. Every method defaults to a no-op; returning
/// an error stops the walk immediately.
#[allow(unused_variables)]
pub trait Listener {
    fn enter_program(&mut self, ident: &str) -> Result<()> {
        Ok(())
    }

    fn exit_program(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_var_decl(&mut self, ty: VarType, idents: &[String]) -> Result<()> {
        Ok(())
    }

    fn enter_param_decl_list(&mut self, params: &[Param]) -> Result<()> {
        Ok(())
    }

    fn enter_string_decl(&mut self, ident: &str, literal: &str) -> Result<()> {
        Ok(())
    }

    fn enter_func_decl(&mut self, ident: &str) -> Result<()> {
        Ok(())
    }

    fn exit_func_decl(&mut self, ident: &str) -> Result<()> {
        Ok(())
    }

    fn enter_if(&mut self, has_else: bool) -> Result<()> {
        Ok(())
    }

    fn exit_if(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_else(&mut self) -> Result<()> {
        Ok(())
    }

    fn exit_else(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_while(&mut self) -> Result<()> {
        Ok(())
    }

    fn exit_while(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_assign(&mut self, target: &str) -> Result<()> {
        Ok(())
    }

    fn exit_assign(&mut self, target: &str) -> Result<()> {
        Ok(())
    }

    fn enter_read(&mut self, idents: &[String]) -> Result<()> {
        Ok(())
    }

    fn enter_write(&mut self, idents: &[String]) -> Result<()> {
        Ok(())
    }

    fn enter_add_op(&mut self, op: AddOp) -> Result<()> {
        Ok(())
    }

    fn enter_mul_op(&mut self, op: MulOp) -> Result<()> {
        Ok(())
    }

    fn enter_primary(&mut self, primary: &Primary) -> Result<()> {
        Ok(())
    }

    fn exit_primary(&mut self, primary: &Primary) -> Result<()> {
        Ok(())
    }
}

/// Walks the parse tree depth-first, raising events on `listener`.
///
/// # Errors
///
/// Returns the first error raised by the listener; no later events are
/// delivered.
pub fn walk<L: Listener + ?Sized>(listener: &mut L, program: &Program) -> Result<()> {
    listener.enter_program(&program.ident)?;

    walk_decls(listener, &program.decls)?;

    for func in &program.funcs {
        listener.enter_func_decl(&func.ident)?;

        if !func.params.is_empty() {
            listener.enter_param_decl_list(&func.params)?;
        }

        walk_decls(listener, &func.decls)?;
        walk_stmts(listener, &func.body)?;

        listener.exit_func_decl(&func.ident)?;
    }

    listener.exit_program()
}

fn walk_decls<L: Listener + ?Sized>(listener: &mut L, decls: &[Decl]) -> Result<()> {
    for decl in decls {
        match decl {
            Decl::Var { ty, idents } => listener.enter_var_decl(*ty, idents)?,
            Decl::String { ident, literal } => listener.enter_string_decl(ident, literal)?,
        }
    }

    Ok(())
}

fn walk_stmts<L: Listener + ?Sized>(listener: &mut L, stmts: &[Stmt]) -> Result<()> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { target, expr } => {
                listener.enter_assign(target)?;
                walk_expr(listener, expr)?;
                listener.exit_assign(target)?;
            }
            Stmt::Read(idents) => listener.enter_read(idents)?,
            Stmt::Write(idents) => listener.enter_write(idents)?,
            Stmt::Return(expr) => walk_expr(listener, expr)?,
            Stmt::If {
                cond,
                decls,
                then,
                else_part,
            } => {
                listener.enter_if(else_part.is_some())?;

                walk_cond(listener, cond)?;
                walk_decls(listener, decls)?;
                walk_stmts(listener, then)?;

                if let Some(else_part) = else_part {
                    listener.enter_else()?;
                    walk_decls(listener, &else_part.decls)?;
                    walk_stmts(listener, &else_part.body)?;
                    listener.exit_else()?;
                }

                listener.exit_if()?;
            }
            Stmt::While { cond, decls, body } => {
                listener.enter_while()?;

                walk_cond(listener, cond)?;
                walk_decls(listener, decls)?;
                walk_stmts(listener, body)?;

                listener.exit_while()?;
            }
        }
    }

    Ok(())
}

fn walk_cond<L: Listener + ?Sized>(listener: &mut L, cond: &Cond) -> Result<()> {
    walk_expr(listener, &cond.lhs)?;
    walk_expr(listener, &cond.rhs)
}

fn walk_expr<L: Listener + ?Sized>(listener: &mut L, expr: &Expr) -> Result<()> {
    walk_factor(listener, &expr.first)?;

    for (op, factor) in &expr.rest {
        listener.enter_add_op(*op)?;
        walk_factor(listener, factor)?;
    }

    Ok(())
}

fn walk_factor<L: Listener + ?Sized>(listener: &mut L, factor: &Factor) -> Result<()> {
    walk_primary(listener, &factor.first)?;

    for (op, primary) in &factor.rest {
        listener.enter_mul_op(*op)?;
        walk_primary(listener, primary)?;
    }

    Ok(())
}

fn walk_primary<L: Listener + ?Sized>(listener: &mut L, primary: &Primary) -> Result<()> {
    listener.enter_primary(primary)?;

    if let Primary::Group(expr) = primary {
        walk_expr(listener, expr)?;
    }

    listener.exit_primary(primary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::Error;

    /// Records every event as a short string.
    #[derive(Default)]
    struct EventLog(Vec<String>);

    impl Listener for EventLog {
        fn enter_program(&mut self, ident: &str) -> Result<()> {
            self.0.push(format!("program {ident}"));
            Ok(())
        }

        fn exit_program(&mut self) -> Result<()> {
            self.0.push("/program".into());
            Ok(())
        }

        fn enter_var_decl(&mut self, ty: VarType, idents: &[String]) -> Result<()> {
            self.0.push(format!("var {ty:?} {}", idents.join(",")));
            Ok(())
        }

        fn enter_param_decl_list(&mut self, params: &[Param]) -> Result<()> {
            self.0.push(format!("params {}", params.len()));
            Ok(())
        }

        fn enter_func_decl(&mut self, ident: &str) -> Result<()> {
            self.0.push(format!("func {ident}"));
            Ok(())
        }

        fn exit_func_decl(&mut self, ident: &str) -> Result<()> {
            self.0.push(format!("/func {ident}"));
            Ok(())
        }

        fn enter_if(&mut self, has_else: bool) -> Result<()> {
            self.0.push(format!("if {has_else}"));
            Ok(())
        }

        fn exit_if(&mut self) -> Result<()> {
            self.0.push("/if".into());
            Ok(())
        }

        fn enter_else(&mut self) -> Result<()> {
            self.0.push("else".into());
            Ok(())
        }

        fn enter_assign(&mut self, target: &str) -> Result<()> {
            self.0.push(format!("assign {target}"));
            Ok(())
        }

        fn exit_assign(&mut self, target: &str) -> Result<()> {
            self.0.push(format!("/assign {target}"));
            Ok(())
        }

        fn enter_add_op(&mut self, op: AddOp) -> Result<()> {
            self.0.push(format!("addop {op}"));
            Ok(())
        }

        fn enter_mul_op(&mut self, op: MulOp) -> Result<()> {
            self.0.push(format!("mulop {op}"));
            Ok(())
        }

        fn enter_primary(&mut self, primary: &Primary) -> Result<()> {
            match primary {
                Primary::Atom(text) => self.0.push(format!("primary {text}")),
                Primary::Group(_) => self.0.push("(".into()),
            }
            Ok(())
        }

        fn exit_primary(&mut self, primary: &Primary) -> Result<()> {
            if let Primary::Group(_) = primary {
                self.0.push(")".into());
            }
            Ok(())
        }
    }

    fn atom(text: &str) -> serde_json::Value {
        json!({ "first": { "first": { "atom": text } } })
    }

    #[test]
    fn walk_raises_events_in_grammar_order() {
        let program: Program = serde_json::from_value(json!({
            "ident": "demo",
            "decls": [{ "var": { "ty": "INT", "idents": ["a", "b"] } }],
            "funcs": [{
                "ident": "main",
                "params": [{ "ty": "FLOAT", "ident": "p" }],
                "body": [
                    { "assign": {
                        "target": "a",
                        "expr": {
                            "first": { "first": { "atom": "b" } },
                            "rest": [["+", {
                                "first": { "atom": "2" },
                                "rest": [["*", { "group": atom("a") }]]
                            }]]
                        }
                    }},
                    { "if": {
                        "cond": { "lhs": atom("a"), "op": "<", "rhs": atom("1") },
                        "then": [],
                        "else": { "body": [] }
                    }}
                ]
            }]
        }))
        .unwrap();

        let mut log = EventLog::default();
        walk(&mut log, &program).unwrap();

        assert_eq!(
            log.0,
            [
                "program demo",
                "var Int a,b",
                "func main",
                "params 1",
                "assign a",
                "primary b",
                "addop +",
                "primary 2",
                "mulop *",
                "(",
                "primary a",
                ")",
                "/assign a",
                "if true",
                "primary a",
                "primary 1",
                "else",
                "/if",
                "/func main",
                "/program",
            ]
        );
    }

    #[test]
    fn walk_stops_at_first_listener_error() {
        struct FailOnDecl(usize);

        impl Listener for FailOnDecl {
            fn enter_var_decl(&mut self, _: VarType, idents: &[String]) -> Result<()> {
                self.0 += 1;
                Err(Error::UndeclaredVariable {
                    ident: idents[0].clone(),
                })
            }
        }

        let program: Program = serde_json::from_value(json!({
            "ident": "demo",
            "decls": [
                { "var": { "ty": "INT", "idents": ["a"] } },
                { "var": { "ty": "INT", "idents": ["b"] } }
            ]
        }))
        .unwrap();

        let mut listener = FailOnDecl(0);

        assert!(walk(&mut listener, &program).is_err());
        assert_eq!(listener.0, 1);
    }

    #[test]
    fn parse_tree_rejects_unknown_operator() {
        let result = serde_json::from_value::<Expr>(json!({
            "first": { "first": { "atom": "a" } },
            "rest": [["%", { "first": { "atom": "b" } }]]
        }));

        assert!(result.is_err());
    }
}
