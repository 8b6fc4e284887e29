//! # Errors
//!
//! All fallible operations of this crate return [`CacheError`]. The variants form a small
//! taxonomy which decides how a failure travels through the layers:
//!
//! - [`CacheError::Requirement`] - a programming error (e.g. touching an absent key). Always
//!   propagated, never swallowed.
//! - [`CacheError::Provider`] - a backend failure, as reported by a [`ProviderGuard`](crate::ProviderGuard).
//!   Whether callers see it is decided by the `propagate_provider_errors` setting.
//! - [`CacheError::Source`] - the data provider failed to compute a value. Always propagated.
//! - [`CacheError::Backend`] - a raw failure raised inside a backend. A guard translates it
//!   into [`CacheError::Provider`] before it reaches the cache.

use std::fmt;

use thiserror::Error;

/// Boxed error type used for causes coming from backends and data providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Names the provider operation which failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Put,
    Touch,
    Remove,
    Clear,
}

impl Operation {
    /// Returns the lowercase name of the operation as used in log and error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Put => "put",
            Operation::Touch => "touch",
            Operation::Remove => "remove",
            Operation::Clear => "clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The error type of all cache operations.
///
/// # Examples
///
/// ```
/// use selfload_core::{CacheError, Operation};
///
/// let err = CacheError::requirement("touch requires a present key");
/// assert!(err.is_requirement());
///
/// let err = CacheError::provider(Operation::Put, CacheError::backend("disk full"));
/// assert!(err.is_provider());
/// assert_eq!(err.operation(), Some(Operation::Put));
/// ```
#[derive(Debug, Error)]
pub enum CacheError {
    /// A precondition of the API was violated by the caller.
    #[error("requirement violated: {0}")]
    Requirement(String),

    /// The cache provider failed while performing `operation`.
    #[error("cache provider failed during {operation}: {source}")]
    Provider {
        operation: Operation,
        #[source]
        source: BoxError,
    },

    /// The data provider failed to compute the value for `key`.
    #[error("data source failed for {key}: {source}")]
    Source {
        key: String,
        #[source]
        source: BoxError,
    },

    /// A raw failure raised by a backend implementation.
    #[error("backend failure: {0}")]
    Backend(#[source] BoxError),
}

impl CacheError {
    /// Creates a [`CacheError::Requirement`] with the given message.
    pub fn requirement(message: impl Into<String>) -> Self {
        CacheError::Requirement(message.into())
    }

    /// Creates a [`CacheError::Backend`] from anything convertible into a boxed error.
    ///
    /// String slices and `String`s are accepted as well, which keeps backend code short.
    pub fn backend(cause: impl Into<BoxError>) -> Self {
        CacheError::Backend(cause.into())
    }

    /// Wraps `cause` as a [`CacheError::Provider`] for the given operation.
    ///
    /// An error which already is a provider error is returned as is, so that nested
    /// guards don't stack wrappers on top of each other.
    pub fn provider(operation: Operation, cause: CacheError) -> Self {
        match cause {
            err @ CacheError::Provider { .. } => err,
            other => CacheError::Provider {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// Wraps a failure of a data provider as [`CacheError::Source`].
    ///
    /// If the data provider itself returned a `CacheError::Source` (e.g. because it is
    /// backed by another self loading cache), that error is unwrapped and returned unchanged.
    pub fn source(key: impl fmt::Display, cause: BoxError) -> Self {
        match cause.downcast::<CacheError>() {
            Ok(err) => match *err {
                err @ CacheError::Source { .. } => err,
                other => CacheError::Source {
                    key: key.to_string(),
                    source: Box::new(other),
                },
            },
            Err(cause) => CacheError::Source {
                key: key.to_string(),
                source: cause,
            },
        }
    }

    pub fn is_requirement(&self) -> bool {
        matches!(self, CacheError::Requirement(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, CacheError::Provider { .. })
    }

    pub fn is_source(&self) -> bool {
        matches!(self, CacheError::Source { .. })
    }

    /// Returns the failed operation of a provider error.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            CacheError::Provider { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Returns a [`CacheError::Requirement`] unless `condition` holds.
pub(crate) fn require(condition: bool, message: impl FnOnce() -> String) -> Result<(), CacheError> {
    if condition {
        Ok(())
    } else {
        Err(CacheError::Requirement(message()))
    }
}
