//! Service error taxonomy.
//!
//! Every variant except `Internal` carries a short message that is safe to
//! show to clients. `Internal` details are logged and replaced by a generic
//! message at the HTTP boundary.

use crate::domain::jobs::TransitionError;
use crate::domain::upload::RejectReason;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] RejectReason),

    #[error("{0}")]
    Trim(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Job not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Too many status requests for this job, slow down")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<TransitionError> for Error {
    fn from(err: TransitionError) -> Self {
        Error::Conflict(err.to_string())
    }
}
