//! Error types for the resource pool

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by user callbacks
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Pool is closed")]
    Closed,

    #[error("Pool exhausted - no resource became available within {0:?}")]
    Exhausted(Duration),

    #[error("Resource creation failed: {0}")]
    CreateFailed(#[source] Arc<dyn StdError + Send + Sync + 'static>),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Entry was not handed out by this pool")]
    ForeignEntry,

    #[error("Operation was cancelled")]
    Cancelled,
}

impl PoolError {
    pub(crate) fn create_failed(cause: BoxError) -> Self {
        PoolError::CreateFailed(Arc::from(cause))
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PoolError::InvalidConfiguration(message.into())
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
