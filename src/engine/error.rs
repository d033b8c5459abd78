//! Error type for the engine façade.

use thiserror::Error;

use crate::region::AccessError;
use crate::source::SourceError;

/// Errors surfaced by [`RangeEngine`](super::RangeEngine) operations.
///
/// Only failures of the *directly requested* operation appear here; a
/// failure inside bookkeeping expansions is recorded on the engine instead
/// (see [`RangeEngine::last_error`](super::RangeEngine::last_error)) and
/// never reaches `read`/`write` callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The access specification is invalid for the attached shape.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The backing source failed the requested read or write.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The engine has been destroyed; no further operations are accepted.
    #[error("range engine has been destroyed")]
    Destroyed,
}
