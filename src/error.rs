//! Error type shared by the record layer and all transforms.

use thiserror::Error;

/// Result type for qubo-ops operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a single invocation.
///
/// The first group covers malformed input (fatal before anything is
/// computed), the second one parameters that the given instance or
/// solution cannot satisfy.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory record field is absent.
    #[error("<{0}> is missing")]
    MissingField(&'static str),

    /// A record field is present but has the wrong shape.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Input file with an extension we cannot decode.
    #[error("unsupported input encoding: {0} (must be .json or .json.gz)")]
    UnsupportedEncoding(String),

    /// Requested counts exceed the bits available with the required value.
    #[error("infeasible parameters: {0}")]
    Infeasible(String),

    /// A parameter is outside of its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }

    pub(crate) fn infeasible(msg: impl Into<String>) -> Self {
        Error::Infeasible(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Returns `true` for errors caused by the input records themselves.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_) | Error::Malformed(_) | Error::UnsupportedEncoding(_) | Error::Json(_) | Error::Io(_)
        )
    }
}
