use graphlens_core::IdentityError;
use thiserror::Error;

/// Errors from compiling a request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("not an absolute IRI: '{0}'")]
    InvalidIri(String),
}
