//! Error taxonomy for the conversion engine.

use chrono::{FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use thiserror::Error;

/// A transient failure in the persistence collaborator.
///
/// Store implementations convert their native errors into this type so
/// the engine stays decoupled from any particular backend. The engine
/// never retries; retry policy belongs to the collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage failure: {message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced by the engine.
///
/// Every variant is terminal for the single request that produced it
/// and maps to a user-facing message at the chat boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Registration supplied an unrecognized IANA timezone identifier.
    #[error("unrecognized timezone: {name}")]
    InvalidTimezone { name: String },

    /// Chat input did not match the supported time grammar.
    #[error("could not understand time expression: {input}")]
    UnparsableExpression { input: String },

    /// No timezone could be determined for the source time.
    #[error("no source timezone: the text named none and the requester has no registration")]
    AmbiguousSourceTimezone,

    /// The wall-clock time does not exist in the source zone
    /// (spring-forward gap).
    #[error("{wall} does not exist in {zone}: clocks skip forward over it")]
    InvalidLocalTime { wall: NaiveDateTime, zone: Tz },

    /// The wall-clock time occurs twice in the source zone
    /// (fall-back overlap) and no explicit UTC offset was supplied.
    #[error(
        "{wall} occurs twice in {zone} (at offsets {earlier_offset} and {later_offset}); \
         add an explicit offset to disambiguate"
    )]
    AmbiguousLocalTime {
        wall: NaiveDateTime,
        zone: Tz,
        earlier_offset: FixedOffset,
        later_offset: FixedOffset,
    },

    /// A registration link token was not found.
    #[error("unknown registration link")]
    UnknownLink,

    /// A registration link was claimed after its validity window.
    #[error("registration link expired")]
    LinkExpired,

    /// The persistence collaborator failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
