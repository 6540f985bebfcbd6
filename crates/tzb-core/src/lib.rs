//! Core domain logic for the timezone bot.
//!
//! This crate contains the fundamental types and logic for:
//! - Directory: durable member → timezone registrations
//! - Expression parsing: turning chat text into a normalized time
//! - Conversion: DST-aware wall-clock math across IANA zones
//! - Reports: the ordered multi-timezone answer for a community

pub mod convert;
pub mod directory;
mod error;
pub mod expr;
pub mod report;
mod types;

pub use convert::{LocalTime, ResolvedInstant, convert, resolve_instant};
pub use directory::{
    DirectoryStore, LinkClaim, LinkToken, MemberZone, PendingLink, TimezoneDirectory,
};
pub use error::{EngineError, StoreError};
pub use expr::{DateHint, TimeExpression, ZoneHint, parse};
pub use report::{Report, ReportEntry, build_report};
pub use types::{CommunityId, MemberId, ValidationError};
