use std::{cell::RefCell, fmt::Display, rc::Rc};

use hz_parser::{ast::FunctionDecl, token::Literal};

use crate::{
    environment::Environment,
    error::RuntimeError,
    interpreter::{Flow, Interpreter},
};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Rc<dyn Callable>),
}

impl Value {
    /// `nil` and `false` are falsy, everything else (including `0` and `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Converts the given value to a string (in the format of a code value).
    ///
    /// Use this anywhere a programmer expects to see the code-version of a value (e.g. in the REPL).
    /// # Examples
    /// ```rust
    /// use hz_interpreter::value::Value;
    ///
    /// let value = Value::String("hello world".into());
    ///
    /// assert_eq!(value.to_code_string(), "\"hello world\"");
    /// ```
    pub fn to_code_string(&self) -> String {
        match self {
            Value::String(value) => format!("\"{}\"", value),
            value => value.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Functions are only equal to themselves
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(value) => Value::Bool(value),
            Literal::Number(value) => Value::Number(value),
            Literal::String(value) => Value::String(value.into()),
        }
    }
}

impl Display for Value {
    /// toString() form at runtime
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Number(value) => write!(f, "{}", format_number(*value)),
            Value::String(value) => write!(f, "{}", value),
            Value::Callable(callable) => write!(f, "{}", callable),
        }
    }
}

/// Shortest round-trip representation, without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }

    let mut buffer = ryu::Buffer::new();
    let text = buffer.format_finite(value);
    text.strip_suffix(".0").unwrap_or(text).to_string()
}

/// Anything that can be invoked with call syntax.
pub trait Callable: std::fmt::Debug + Display {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// Invoke with exactly `arity()` arguments; the caller checks the count.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// A function declared in a program, together with the environment it was declared in.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Function {
            declaration,
            closure,
        }
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        // Parented to the closure, not the caller: this is what makes closures work
        let mut environment = Environment::new_enclosed(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(param.lexeme.clone(), argument);
        }

        let flow = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(environment)),
        )?;

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl std::fmt::Debug for Function {
    // The closure may contain this very function, so it is left out
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.arity())
            .finish()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}
