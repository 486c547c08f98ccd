//! `rcalc` — a small interpreter for a single-expression arithmetic and
//! procedural calculator language.
//!
//! The pipeline runs in nine stages, each its own module: lexer, operator
//! splitter and classifier (`lexer`/`token`), unary resolver / assignment
//! marker / function-body extractor / line splitter (`resolve`),
//! shunting-yard builder (`builder`), and finally the stack-machine
//! evaluator (`interpreter`/`value`/`frame`). [`Interpreter`] wires all of
//! it together behind one `interpret` call.

pub mod builder;
pub mod builtin;
pub mod error;
pub mod frame;
pub mod interpreter;
pub mod lexer;
pub mod resolve;
pub mod token;
pub mod value;

pub use error::{CalcError, Result};
pub use interpreter::Interpreter;
pub use value::Value;
