use thiserror::Error;

/// Errors surfaced by the interpreter at the Rust level.
/// No error is recovered below `run`; all of them unwind to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemeError {
    /// Reader failures: unmatched brackets, stray dots, a quote without a
    /// datum, leftover tokens, unclassifiable characters, malformed
    /// `define`/`set!`/`lambda` shapes.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Lookup of an unbound name, or `set!` on an undefined name.
    #[error("name error: {0}")]
    Name(String),

    /// Type mismatches, arity mismatches, division by zero, out-of-range
    /// list indexing, applying a non-callable, integer overflow.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl SchemeError {
    pub fn syntax(message: impl Into<String>) -> Self {
        SchemeError::Syntax(message.into())
    }

    pub fn name(message: impl Into<String>) -> Self {
        SchemeError::Name(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        SchemeError::Runtime(message.into())
    }
}

pub type SchemeResult<T> = Result<T, SchemeError>;
