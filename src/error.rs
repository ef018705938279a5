use thiserror::Error;

// Unified error type for ellsolve

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("preconditioner application failed: {0}")]
    PreconditionerError(String),
    #[error("assembly error: {0}")]
    AssemblyError(String),
}
