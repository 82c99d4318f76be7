//! Renders syntax trees as parenthesized prefix forms, e.g. `(* (- 123) (group 45.67))`.
//!
//! Only a debugging aid: the output makes precedence and associativity explicit but is not
//! meant to be parsed back.

use crate::ast::{Expr, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::token::Literal;

pub struct AstPrinter;

impl AstPrinter {
    pub fn print_expr(expr: &Expr) -> String {
        ensure_sufficient_stack(|| Self::render_expr(expr))
    }

    fn render_expr(expr: &Expr) -> String {
        match expr {
            Expr::Literal(Literal::String(value)) => format!("\"{}\"", value),
            Expr::Literal(literal) => literal.to_string(),
            Expr::Grouping(inner) => Self::parenthesize("group", &[&**inner]),
            Expr::Unary { operator, right } => Self::parenthesize(&operator.lexeme, &[&**right]),
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(&operator.lexeme, &[&**left, &**right]),
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => Self::parenthesize("?:", &[&**condition, &**then_branch, &**else_branch]),
            Expr::Variable(name) => name.lexeme.clone(),
            Expr::Assign { name, value } => format!("(= {} {})", name.lexeme, Self::print_expr(value)),
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", Self::print_expr(callee));
                for argument in arguments {
                    out.push(' ');
                    out.push_str(&Self::print_expr(argument));
                }
                out.push(')');
                out
            }
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        ensure_sufficient_stack(|| Self::render_stmt(stmt))
    }

    fn render_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print_expr(expr)),
            Stmt::Print(expr) => format!("(print {})", Self::print_expr(expr)),
            Stmt::Var { name, initializer } => match initializer {
                Some(initializer) => {
                    format!("(var {} {})", name.lexeme, Self::print_expr(initializer))
                }
                None => format!("(var {})", name.lexeme),
            },
            Stmt::Block(statements) => Self::print_block("block", statements),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch)
                ),
            },
            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print_expr(condition),
                Self::print_stmt(body)
            ),
            Stmt::Function(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
                let head = format!("fun {} ({})", decl.name.lexeme, params.join(" "));
                Self::print_block(&head, &decl.body)
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print_expr(value)),
                None => "(return)".to_string(),
            },
        }
    }

    fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
        let mut out = String::new();

        out.push('(');
        out.push_str(name);
        for expr in exprs {
            out.push(' ');
            out.push_str(&Self::print_expr(expr));
        }
        out.push(')');

        out
    }

    fn print_block(name: &str, statements: &[Stmt]) -> String {
        let mut out = format!("({}", name);
        for stmt in statements {
            out.push(' ');
            out.push_str(&Self::print_stmt(stmt));
        }
        out.push(')');
        out
    }
}
