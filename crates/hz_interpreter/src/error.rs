use hz_parser::token::Token;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    /// When attempting a prefix operation on a non-number (e.g. `-"abc"`)
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    /// When attempting arithmetic or a comparison with a non-number (e.g. `true < 1`)
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    /// When `+` gets anything other than numbers and strings (e.g. `"a" + true`)
    #[error("Operands must be two numbers or two strings.")]
    InvalidAdditionOperands,
    /// When reading or assigning a name that no enclosing environment defines
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    /// When a value that is not a function is used with call syntax
    #[error("Can only call functions and classes.")]
    NotCallable,
    /// When a call's argument count does not match the function's parameter count
    #[error("Expected {expected} arguments but got {got}.")]
    BadArity { expected: usize, got: usize },
    /// When calls nest deeper than the interpreter allows
    #[error("Stack overflow.")]
    StackOverflow,
}

/// A fault that aborts the running program, located at the token that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub token: Token,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(token: &Token, kind: RuntimeErrorKind) -> Self {
        RuntimeError {
            token: token.clone(),
            kind,
        }
    }

    pub fn line(&self) -> usize {
        self.token.line
    }
}
