//! Front end of the Hezarfen language: source text to tokens to syntax tree.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
mod stack;
pub mod token;

pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
