//! Tree-walking evaluation of Hezarfen programs.
//!
//! [`Interpreter`] runs parsed programs against a chain of [`Environment`]s, and
//! [`Hezarfen`] wraps the whole lex, parse and run pipeline for the command line.

pub mod builtin;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod print_handler;
pub mod runner;
mod stack;
pub mod value;

pub use environment::Environment;
pub use error::{RuntimeError, RuntimeErrorKind};
pub use interpreter::{Flow, Interpreter};
pub use print_handler::PrintHandler;
pub use runner::{ConsoleReporter, Hezarfen, Outcome, Reporter};
pub use value::Value;
