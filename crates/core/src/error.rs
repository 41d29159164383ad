use thiserror::Error;

/// Errors arising from key construction, type canonicalization and schema
/// parsing/matching -- the pieces owned by this crate. Storage, catalogue
/// and dispatch crates define their own error types and wrap this one with
/// `#[from]` where a lower layer's mistake surfaces through them.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("keyword '{0}' appears in more than one level of a key chain")]
    KeywordCollision(String),

    #[error("invalid value for keyword '{keyword}': '{value}'")]
    InvalidValue { keyword: String, value: String },

    #[error("missing mandatory keyword '{0}'")]
    MissingKeyword(String),

    #[error("unknown keyword '{0}' not declared by any schema level")]
    UnknownKeyword(String),

    #[error("schema syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("schema rule nesting must be exactly 3 levels deep, found {0}")]
    WrongNesting(usize),

    #[error("failed to parse schema: {0}")]
    Parse(String),
}
