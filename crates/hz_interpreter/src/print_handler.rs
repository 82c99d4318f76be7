//! Destination for the output of `print` statements.
//!
//! Programs run from the command line write to stdout. Tests and embedders
//! capture the output in a shared buffer instead.

use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Clone, Default)]
pub enum PrintHandler {
    /// Writes each line to stdout (default).
    #[default]
    Stdout,
    /// Appends each line to a buffer shared by every clone of the handler.
    Buffer(Rc<RefCell<String>>),
}

impl PrintHandler {
    /// Create a handler that captures output.
    pub fn buffer() -> Self {
        PrintHandler::Buffer(Rc::new(RefCell::new(String::new())))
    }

    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            PrintHandler::Stdout => println!("{msg}"),
            PrintHandler::Buffer(buffer) => {
                let mut buffer = buffer.borrow_mut();
                buffer.push_str(msg);
                buffer.push('\n');
            }
        }
    }

    /// Get all captured output.
    ///
    /// Always empty for stdout.
    pub fn get_output(&self) -> String {
        match self {
            PrintHandler::Stdout => String::new(),
            PrintHandler::Buffer(buffer) => buffer.borrow().clone(),
        }
    }
}
