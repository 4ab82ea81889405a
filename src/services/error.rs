use thiserror::Error;
use uuid::Uuid;

use crate::stores::StoreError;

/// Operation failures. All of these are recoverable by the caller; none
/// leaves a conversation's branch tree partially mutated.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Branch name cannot be empty")]
    InvalidName,

    #[error("Message {0} is not part of the active branch")]
    UnknownForkPoint(Uuid),

    #[error("Branch {0} does not exist")]
    UnknownBranch(Uuid),

    #[error("The root branch cannot be deleted")]
    CannotDeleteRoot,

    #[error("The active branch cannot be deleted; switch away from it first")]
    CannotDeleteActiveBranch,

    #[error("Branch limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
