use std::{cell::RefCell, mem, rc::Rc};

use hz_parser::{
    ast::{Expr, Program, Stmt},
    token::{Token, TokenKind},
};
use tracing::{debug, trace};

use crate::{
    builtin::Builtin,
    environment::Environment,
    error::{RuntimeError, RuntimeErrorKind},
    print_handler::PrintHandler,
    stack::ensure_sufficient_stack,
    value::{Callable, Function, Value},
};

/// Nested call activations allowed before a program fails with a stack overflow.
pub const MAX_CALL_DEPTH: usize = 1024;

/// How control leaves a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    /// A `return` unwinding to the nearest enclosing call
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    output: PrintHandler,
    call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(PrintHandler::Stdout)
    }

    pub fn with_output(output: PrintHandler) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        for builtin in Builtin::ALL {
            globals
                .borrow_mut()
                .define(builtin.name().to_string(), Value::Callable(Rc::new(builtin)));
        }

        Interpreter {
            env: Rc::clone(&globals),
            globals,
            output,
            call_depth: 0,
        }
    }

    pub fn output(&self) -> &PrintHandler {
        &self.output
    }

    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.globals)
    }

    /// Run every statement of the program in order. The first runtime error stops the run.
    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.statements {
            // A top-level return cannot be parsed, but it would end the program all the same
            if let Flow::Return(_) = self.execute(stmt)? {
                break;
            }
        }

        Ok(())
    }

    /// Evaluate a single expression in the current environment.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.evaluate_expression(expr))
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        ensure_sufficient_stack(|| self.execute_statement(stmt))
    }

    /// Run statements in `env`, then put the previous environment back, whatever the outcome.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> Result<Flow, RuntimeError> {
        let previous = mem::replace(&mut self.env, env);
        let result = self.execute_statements(statements);
        self.env = previous;
        result
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_statement(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        trace!(depth = self.env.borrow().depth(), "{}", stmt);

        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.output.println(&value.to_string());
            }
            Stmt::Var { name, initializer } => {
                // The initializer sees the enclosing binding, not the one being declared
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.env.borrow_mut().define(name.lexeme.clone(), value);
            }
            Stmt::Block(statements) => {
                let env = Environment::new_enclosed(Rc::clone(&self.env));
                return self.execute_block(statements, Rc::new(RefCell::new(env)));
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Function(declaration) => {
                let function = Function::new(Rc::clone(declaration), Rc::clone(&self.env));
                self.env.borrow_mut().define(
                    declaration.name.lexeme.clone(),
                    Value::Callable(Rc::new(function)),
                );
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(literal.clone().into()),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                eval_unary(operator, right)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                eval_binary(operator, left, right)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = match operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                // Both branches run before one is picked
                let condition = self.evaluate(condition)?;
                let then_value = self.evaluate(then_branch)?;
                let else_value = self.evaluate(else_branch)?;

                Ok(if condition.is_truthy() {
                    then_value
                } else {
                    else_value
                })
            }
            Expr::Variable(name) => self.env.borrow().get(name),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env.borrow_mut().assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                match callee {
                    Value::Callable(callable) => self.call(&*callable, paren, values),
                    _ => Err(RuntimeError::new(paren, RuntimeErrorKind::NotCallable)),
                }
            }
        }
    }

    fn call(
        &mut self,
        callable: &dyn Callable,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                paren,
                RuntimeErrorKind::BadArity {
                    expected: callable.arity(),
                    got: arguments.len(),
                },
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(paren, RuntimeErrorKind::StackOverflow));
        }

        debug!(function = callable.name(), depth = self.call_depth, "call");

        self.call_depth += 1;
        let result = callable.call(self, arguments);
        self.call_depth -= 1;

        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_unary(operator: &Token, right: Value) -> Result<Value, RuntimeError> {
    match operator.kind {
        TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
        TokenKind::Minus => match right {
            Value::Number(value) => Ok(Value::Number(-value)),
            _ => Err(RuntimeError::new(operator, RuntimeErrorKind::OperandMustBeNumber)),
        },
        _ => unreachable!("the parser only builds unary `!` and `-`"),
    }
}

fn eval_binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator.kind {
        TokenKind::Comma => Ok(right),
        TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
        TokenKind::BangEqual => Ok(Value::Bool(left != right)),
        TokenKind::Plus => eval_addition(operator, left, right),
        _ => {
            let (a, b) = match (left, right) {
                (Value::Number(a), Value::Number(b)) => (a, b),
                _ => {
                    return Err(RuntimeError::new(
                        operator,
                        RuntimeErrorKind::OperandsMustBeNumbers,
                    ))
                }
            };

            let value = match operator.kind {
                TokenKind::Minus => Value::Number(a - b),
                TokenKind::Star => Value::Number(a * b),
                TokenKind::Slash => Value::Number(a / b),
                TokenKind::Greater => Value::Bool(a > b),
                TokenKind::GreaterEqual => Value::Bool(a >= b),
                TokenKind::Less => Value::Bool(a < b),
                TokenKind::LessEqual => Value::Bool(a <= b),
                _ => unreachable!("the parser only builds known binary operators"),
            };

            Ok(value)
        }
    }
}

fn eval_addition(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b).into())),
        (left @ Value::String(_), right @ Value::Number(_))
        | (left @ Value::Number(_), right @ Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left, right).into()))
        }
        _ => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::InvalidAdditionOperands,
        )),
    }
}

#[cfg(test)]
mod tests {
    use hz_parser::{ast::Program, Lexer, Parser};
    use pretty_assertions::assert_eq;

    use crate::{
        error::{RuntimeError, RuntimeErrorKind},
        interpreter::{Interpreter, MAX_CALL_DEPTH},
        print_handler::PrintHandler,
        value::Value,
    };

    fn parse(input: &str) -> Program {
        let (tokens, errors) = Lexer::new(input).scan_tokens();
        assert!(errors.is_empty(), "{:?}", errors);
        Parser::new(tokens).parse_program().expect("program parses")
    }

    fn run(input: &str) -> (String, Result<(), RuntimeError>) {
        let mut interpreter = Interpreter::with_output(PrintHandler::buffer());
        let result = interpreter.interpret(&parse(input));
        (interpreter.output().get_output(), result)
    }

    fn output_of(input: &str) -> String {
        let (output, result) = run(input);
        assert_eq!(result, Ok(()));
        output
    }

    fn error_of(input: &str) -> RuntimeError {
        run(input).1.expect_err("program fails")
    }

    #[test]
    fn test_arithmetic() {
        let tests = vec![
            ("print 1 + 2 * 3;", "7\n"),
            ("print (1 + 2) * 3;", "9\n"),
            ("print 10 / 4;", "2.5\n"),
            ("print -(3 - 5);", "2\n"),
            ("print 1 / 0;", "Infinity\n"),
            ("print 2 > 1;", "true\n"),
            ("print 2 <= 1;", "false\n"),
        ];

        for (input, expected) in tests {
            assert_eq!(output_of(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output_of("print \"foo\" + \"bar\";"), "foobar\n");
        assert_eq!(output_of("print 1 + \"a\";"), "1a\n");
        assert_eq!(output_of("print \"a\" + 2.5;"), "a2.5\n");
    }

    #[test]
    fn test_equality() {
        let tests = vec![
            ("print nil == nil;", "true\n"),
            ("print nil == false;", "false\n"),
            ("print 1 == 1;", "true\n"),
            ("print \"a\" != \"a\";", "false\n"),
            ("print 1 == \"1\";", "false\n"),
            ("print clock == clock;", "true\n"),
        ];

        for (input, expected) in tests {
            assert_eq!(output_of(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_unary() {
        assert_eq!(output_of("print !nil;"), "true\n");
        assert_eq!(output_of("print !0;"), "false\n");
        assert_eq!(output_of("print !!\"\";"), "true\n");
        assert_eq!(error_of("-\"a\";").kind, RuntimeErrorKind::OperandMustBeNumber);
    }

    #[test]
    fn test_operand_errors() {
        let error = error_of("\"a\" + true;");
        assert_eq!(error.kind, RuntimeErrorKind::InvalidAdditionOperands);

        let error = error_of("\n\ntrue < 1;");
        assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbers);
        assert_eq!(error.line(), 3);
        assert_eq!(error.token.lexeme, "<");
    }

    #[test]
    fn test_logical_operators() {
        let tests = vec![
            ("print nil or \"yes\";", "yes\n"),
            ("print 0 or \"no\";", "0\n"),
            ("print nil and undefined;", "nil\n"),
            ("print false and 1;", "false\n"),
            ("print 1 and 2;", "2\n"),
        ];

        for (input, expected) in tests {
            assert_eq!(output_of(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_ternary_runs_both_branches() {
        let input = "
            var log = \"\";
            fun mark(name) { log = log + name; return name; }
            print true ? mark(\"a\") : mark(\"b\");
            print log;
        ";
        assert_eq!(output_of(input), "a\nab\n");
        assert_eq!(output_of("print nil ? 1 : false ? 2 : 3;"), "3\n");
    }

    #[test]
    fn test_comma_operator() {
        assert_eq!(output_of("var a = 0; print (a = 1), a + 1;"), "2\n");
        assert_eq!(output_of("var a = 0; print (a = 5, a + 1); print a;"), "1\n1\n");
    }

    #[test]
    fn test_variables() {
        assert_eq!(output_of("var a; print a;"), "nil\n");
        assert_eq!(output_of("var a = 1; a = a + 1; print a;"), "2\n");
        assert_eq!(output_of("var a = 1; var a = 2; print a;"), "2\n");

        let error = error_of("b = 1;");
        assert_eq!(error.kind, RuntimeErrorKind::UndefinedVariable("b".to_string()));
    }

    #[test]
    fn test_block_restores_environment() {
        let input = "
            var a = \"global\";
            {
                var a = \"inner\";
                a = \"changed\";
                print a;
            }
            print a;
        ";
        assert_eq!(output_of(input), "changed\nglobal\n");

        let mut interpreter = Interpreter::with_output(PrintHandler::buffer());
        let result = interpreter.interpret(&parse("{ var a = 1; { missing; } }"));
        assert!(result.is_err());
        assert_eq!(interpreter.env.borrow().depth(), 1);
    }

    #[test]
    fn test_control_flow() {
        assert_eq!(output_of("if (0) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(output_of("if (nil) print \"yes\"; else print \"no\";"), "no\n");
        assert_eq!(
            output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("for (var i = 0; i < 2; i = i + 1) print i;"),
            "0\n1\n"
        );
    }

    #[test]
    fn test_functions() {
        let input = "
            fun add(a, b) { return a + b; }
            print add(1, 2);
            fun nothing() {}
            print nothing();
            print add;
        ";
        assert_eq!(output_of(input), "3\nnil\n<fn add>\n");
    }

    #[test]
    fn test_return_from_nested_loop() {
        let input = "
            fun find() {
                for (var i = 0; ; i = i + 1) {
                    while (true) {
                        if (i == 3) { return i; }
                        i = i + 1;
                    }
                }
            }
            print find();
        ";
        assert_eq!(output_of(input), "3\n");
    }

    #[test]
    fn test_closures() {
        let input = "
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        ";
        assert_eq!(output_of(input), "1\n2\n");
    }

    #[test]
    fn test_call_errors() {
        let error = error_of("\"not a function\"();");
        assert_eq!(error.kind, RuntimeErrorKind::NotCallable);
        assert_eq!(error.token.lexeme, ")");

        let error = error_of("fun f(a) {} f(1, 2);");
        assert_eq!(error.kind, RuntimeErrorKind::BadArity { expected: 1, got: 2 });
    }

    #[test]
    fn test_runtime_error_stops_program() {
        let (output, result) = run("print 1; print -nil; print 2;");
        assert_eq!(output, "1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_call_depth_limit() {
        let error = error_of("fun f() { f(); } f();");
        assert_eq!(error.kind, RuntimeErrorKind::StackOverflow);

        let input = format!(
            "fun down(n) {{ if (n > 0) return down(n - 1); return \"done\"; }} print down({});",
            MAX_CALL_DEPTH - 1
        );
        assert_eq!(output_of(&input), "done\n");
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let mut interpreter = Interpreter::with_output(PrintHandler::buffer());
        interpreter.interpret(&parse("var answer = 41;")).expect("runs");
        interpreter.interpret(&parse("answer = answer + 1;")).expect("runs");

        let globals = interpreter.globals();
        assert_eq!(globals.borrow().lookup("answer"), Some(Value::Number(42.0)));
        assert!(globals.borrow().lookup("clock").is_some());
    }
}
