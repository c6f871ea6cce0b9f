//! A tree-walking interpreter for a small Scheme subset.
//!
//! One `run` call consumes a single S-expression and returns the textual
//! serialization of its value:
//!
//! ```
//! use schemer::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! assert_eq!(interp.run("(+ 1 2 3)").unwrap(), "6");
//! assert_eq!(interp.run("(define (square x) (* x x))").unwrap(), "()");
//! assert_eq!(interp.run("(square 5)").unwrap(), "25");
//! ```
//!
//! Definitions persist across calls: the interpreter owns a heap of tagged
//! objects addressed by index handles, with the top-level context as the
//! single root of a mark-and-sweep collector that runs after each
//! evaluation. Closures capture their defining environment by sharing
//! scope frames, so mutation through `set!` stays visible across calls.
//!
//! Arithmetic is 64-bit signed integers only. Only `#f` is false.
//!
//! ## Modules
//!
//! - `token`: classified token stream over a source string
//! - `reader`: recursive-descent reader building the cons-cell AST
//! - `value`: the tagged object union and its handles
//! - `heap`: allocation and the mark-and-sweep collector
//! - `env`: scope chains and name resolution
//! - `eval`: the evaluator, special forms, and lambda application
//! - `primitives`: regular built-ins over evaluated values
//! - `printer`: value serialization

pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod token;
pub mod value;

pub use error::{SchemeError, SchemeResult};
pub use eval::Interpreter;
