//! Drives source text through lexing, parsing and evaluation, and reports what went wrong.

use hz_parser::{
    ast::{Program, Stmt},
    Lexer, Parser,
};
use tracing::info;

use crate::{error::RuntimeError, interpreter::Interpreter, print_handler::PrintHandler};

/// Command line usage error.
pub const EXIT_USAGE: i32 = 64;
/// The script has syntax errors.
pub const EXIT_DATA_ERROR: i32 = 65;
/// The script could not be read.
pub const EXIT_NO_INPUT: i32 = 66;
/// The script failed while running.
pub const EXIT_SOFTWARE: i32 = 70;

/// Receives every diagnostic produced while running source text.
pub trait Reporter {
    /// `location` is empty, ` at end` or ` at 'lexeme'`.
    fn syntax_error(&mut self, line: usize, location: &str, message: &str);

    fn runtime_error(&mut self, error: &RuntimeError);
}

/// Writes diagnostics to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn syntax_error(&mut self, line: usize, location: &str, message: &str) {
        eprintln!("[line {}] Error{}: {}", line, location, message);
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error, error.line());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    SyntaxError,
    RuntimeError,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::SyntaxError => EXIT_DATA_ERROR,
            Outcome::RuntimeError => EXIT_SOFTWARE,
        }
    }
}

/// One interpreter session. Globals persist across every `run` and `run_line` call.
pub struct Hezarfen<R: Reporter> {
    interpreter: Interpreter,
    reporter: R,
    had_error: bool,
    had_runtime_error: bool,
}

impl<R: Reporter> Hezarfen<R> {
    pub fn new(reporter: R) -> Self {
        Self::with_output(reporter, PrintHandler::Stdout)
    }

    pub fn with_output(reporter: R, output: PrintHandler) -> Self {
        Hezarfen {
            interpreter: Interpreter::with_output(output),
            reporter,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Run a whole script. Nothing executes if any syntax error was found.
    pub fn run(&mut self, source: &str) -> Outcome {
        let Some(program) = self.parse(source) else {
            return self.outcome();
        };

        info!(statements = program.statements.len(), "running program");
        if let Err(error) = self.interpreter.interpret(&program) {
            self.report_runtime_error(&error);
        }

        self.outcome()
    }

    /// Run one line of an interactive session.
    ///
    /// A line holding a single expression statement has its value echoed.
    pub fn run_line(&mut self, source: &str) -> Outcome {
        self.reset_errors();

        let Some(program) = self.parse(source) else {
            return self.outcome();
        };

        let result = match program.statements.as_slice() {
            [Stmt::Expression(expr)] => self.interpreter.evaluate(expr).map(|value| {
                self.interpreter.output().println(&value.to_code_string());
            }),
            _ => self.interpreter.interpret(&program),
        };

        if let Err(error) = result {
            self.report_runtime_error(&error);
        }

        self.outcome()
    }

    fn parse(&mut self, source: &str) -> Option<Program> {
        let (tokens, lex_errors) = Lexer::new(source).scan_tokens();
        for error in &lex_errors {
            self.had_error = true;
            self.reporter
                .syntax_error(error.line, "", &error.kind.to_string());
        }

        let program = match Parser::new(tokens).parse_program() {
            Ok(program) => program,
            Err(errors) => {
                for error in &errors {
                    self.had_error = true;
                    self.reporter
                        .syntax_error(error.line, &error.location, &error.message);
                }
                return None;
            }
        };

        if self.had_error {
            info!(errors = lex_errors.len(), "not running a program with syntax errors");
            return None;
        }

        Some(program)
    }

    fn report_runtime_error(&mut self, error: &RuntimeError) {
        self.had_runtime_error = true;
        self.reporter.runtime_error(error);
    }

    fn outcome(&self) -> Outcome {
        if self.had_error {
            Outcome::SyntaxError
        } else if self.had_runtime_error {
            Outcome::RuntimeError
        } else {
            Outcome::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::RuntimeError,
        print_handler::PrintHandler,
        runner::{Hezarfen, Outcome, Reporter},
    };

    #[derive(Default)]
    struct Collect {
        lines: Vec<String>,
    }

    impl Reporter for Collect {
        fn syntax_error(&mut self, line: usize, location: &str, message: &str) {
            self.lines
                .push(format!("[line {}] Error{}: {}", line, location, message));
        }

        fn runtime_error(&mut self, error: &RuntimeError) {
            self.lines.push(format!("{}\n[line {}]", error, error.line()));
        }
    }

    fn session() -> Hezarfen<Collect> {
        Hezarfen::with_output(Collect::default(), PrintHandler::buffer())
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Success.exit_code(), 0);
        assert_eq!(Outcome::SyntaxError.exit_code(), 65);
        assert_eq!(Outcome::RuntimeError.exit_code(), 70);
    }

    #[test]
    fn test_run_prints() {
        let mut hezarfen = session();
        assert_eq!(hezarfen.run("print \"hi\";"), Outcome::Success);
        assert_eq!(hezarfen.interpreter().output().get_output(), "hi\n");
        assert!(hezarfen.reporter().lines.is_empty());
    }

    #[test]
    fn test_lex_errors_prevent_execution() {
        let mut hezarfen = session();
        assert_eq!(hezarfen.run("print 1;\n@"), Outcome::SyntaxError);
        assert_eq!(hezarfen.interpreter().output().get_output(), "");
        assert_eq!(
            hezarfen.reporter().lines,
            vec!["[line 2] Error: Unexpected character.".to_string()]
        );
    }

    #[test]
    fn test_parse_errors_prevent_execution() {
        let mut hezarfen = session();
        assert_eq!(hezarfen.run("print 1;\nprint ;"), Outcome::SyntaxError);
        assert_eq!(hezarfen.interpreter().output().get_output(), "");
        assert_eq!(
            hezarfen.reporter().lines,
            vec!["[line 2] Error at ';': Expect expression.".to_string()]
        );
    }

    #[test]
    fn test_runtime_error_is_reported() {
        let mut hezarfen = session();
        assert_eq!(hezarfen.run("print 1;\nprint -\"a\";"), Outcome::RuntimeError);
        assert_eq!(hezarfen.interpreter().output().get_output(), "1\n");
        assert_eq!(
            hezarfen.reporter().lines,
            vec!["Operand must be a number.\n[line 2]".to_string()]
        );
        assert!(hezarfen.had_runtime_error());
    }

    #[test]
    fn test_run_line_echoes_expressions() {
        let mut hezarfen = session();
        assert_eq!(hezarfen.run_line("var a = \"x\";"), Outcome::Success);
        assert_eq!(hezarfen.run_line("a + \"y\";"), Outcome::Success);
        assert_eq!(hezarfen.run_line("1 + 2;"), Outcome::Success);
        assert_eq!(hezarfen.run_line("print a;"), Outcome::Success);
        assert_eq!(
            hezarfen.interpreter().output().get_output(),
            "\"xy\"\n3\nx\n"
        );
    }

    #[test]
    fn test_run_line_resets_errors() {
        let mut hezarfen = session();
        assert_eq!(hezarfen.run_line("missing;"), Outcome::RuntimeError);
        assert_eq!(hezarfen.run_line("var b = ;"), Outcome::SyntaxError);
        assert!(!hezarfen.had_runtime_error());

        assert_eq!(hezarfen.run_line("print 1;"), Outcome::Success);
        assert!(!hezarfen.had_error());
    }
}
