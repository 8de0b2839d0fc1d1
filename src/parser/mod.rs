//! Parser for the constraint-set format

pub mod ast;
mod grammar;
pub mod lexer;
mod lower;

pub use ast::*;
pub use grammar::parse;
pub use lower::{load, lower};
