use thiserror::Error;

/// Errors produced by the document store layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A merge or lookup targeted a document that does not exist.
    #[error("Document not found")]
    NotFound,

    /// A document is missing a field the model requires.
    #[error("Missing field `{0}`")]
    MissingField(&'static str),

    /// A field exists but holds the wrong kind of value.
    #[error("Field `{field}` is not a {expected}")]
    Malformed {
        field: &'static str,
        expected: &'static str,
    },

    /// The backend could not service the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
