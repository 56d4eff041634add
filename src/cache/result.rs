//! Cache Result Module
//!
//! The value/error pair returned by every cache operation.

use crate::error::CacheError;

// == Cache Result ==
/// Outcome of a cache operation.
///
/// Holds either a value or the error that prevented producing one, never
/// both. Single-key and batch operations share this wrapper so callers
/// handle them the same way.
#[derive(Debug)]
#[must_use]
pub struct CacheResult<T> {
    inner: Result<T, CacheError>,
}

impl<T> CacheResult<T> {
    pub fn ok(val: T) -> Self {
        Self { inner: Ok(val) }
    }

    pub fn err(err: CacheError) -> Self {
        Self { inner: Err(err) }
    }

    /// The value, if the operation succeeded.
    pub fn val(&self) -> Option<&T> {
        self.inner.as_ref().ok()
    }

    /// The error, if the operation failed.
    pub fn error(&self) -> Option<&CacheError> {
        self.inner.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.inner.is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.inner.is_err()
    }

    /// Unwraps into a standard `Result` for use with `?`.
    pub fn into_result(self) -> Result<T, CacheError> {
        self.inner
    }

    /// The value, or `T::default()` on error.
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.inner.unwrap_or_default()
    }
}

impl<T> From<Result<T, CacheError>> for CacheResult<T> {
    fn from(inner: Result<T, CacheError>) -> Self {
        Self { inner }
    }
}

impl<T> From<CacheResult<T>> for Result<T, CacheError> {
    fn from(result: CacheResult<T>) -> Self {
        result.inner
    }
}
