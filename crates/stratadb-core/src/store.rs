//! Consumed storage capabilities.
//!
//! The cores never touch a backing store directly; they are handed these
//! capabilities and map each call one-for-one onto a store operation.

use crate::codec::CodecError;
use std::error::Error;
use thiserror::Error as ThisError;

///
/// FetchError
///
/// Failure reported by a storage capability; may wrap an underlying cause.
///

#[derive(Debug, ThisError)]
#[error("fetch failed: {message}")]
pub struct FetchError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl FetchError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }
}

///
/// RawSupport
///
/// Key/value persistence capability consumed by codec-bound record
/// implementations. Each call maps to one backing-store operation.
///

pub trait RawSupport {
    /// Decoded record type this capability materializes.
    type Record;

    /// Load the value stored under `key`, if any.
    fn try_load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, FetchError>;

    /// Insert only if absent; reports whether the insert happened.
    fn try_insert(&mut self, key: &[u8], value: &[u8]) -> Result<bool, FetchError>;

    /// Insert or replace unconditionally.
    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<(), FetchError>;

    /// Delete if present; reports whether a value was removed.
    fn try_delete(&mut self, key: &[u8]) -> Result<bool, FetchError>;

    /// Decode a layout-evolved row into `dest` using the layout identified
    /// by `generation`.
    fn decode(
        &self,
        dest: &mut Self::Record,
        generation: u32,
        data: &[u8],
    ) -> Result<(), CodecError>;
}

///
/// CursorOps
///
/// Positioning capability over a sorted key space, consumed by `RawCursor`.
/// Every call is synchronous; positioning failures surface as errors.
///

pub trait CursorOps {
    /// Record type materialized by `instantiate_current`.
    type Record;

    /// Position at the first key; `false` when the space is empty.
    fn to_first(&mut self) -> Result<bool, FetchError>;

    /// Position at the first key at or after `key`.
    fn to_first_at(&mut self, key: &[u8]) -> Result<bool, FetchError>;

    /// Position at the last key; `false` when the space is empty.
    fn to_last(&mut self) -> Result<bool, FetchError>;

    /// Position at the last key at or before `key`.
    fn to_last_at(&mut self, key: &[u8]) -> Result<bool, FetchError>;

    /// Advance; `false` at the end of the space.
    fn to_next(&mut self) -> Result<bool, FetchError>;

    /// Retreat; `false` at the start of the space.
    fn to_previous(&mut self) -> Result<bool, FetchError>;

    /// Key at the current position.
    fn current_key(&self) -> Result<Vec<u8>, FetchError>;

    /// Value at the current position.
    fn current_value(&self) -> Result<Vec<u8>, FetchError>;

    /// Materialize the record at the current position.
    fn instantiate_current(&self) -> Result<Self::Record, FetchError>;

    /// Hint: skip-only traversal follows; keys/values need not materialize.
    fn disable_key_and_value(&mut self) {}

    /// Hint: traversal resumes normal materialization.
    fn enable_key_and_value(&mut self) {}
}
