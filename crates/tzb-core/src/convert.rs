//! Instant resolution and DST-aware timezone conversion.
//!
//! All offset math is delegated to the IANA tz database via
//! `chrono-tz`. Nonexistent and doubled wall-clock times around DST
//! transitions surface as typed errors; they are never silently
//! resolved to an arbitrary choice.

use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::EngineError;
use crate::expr::{DateHint, TimeExpression, ZoneHint};

/// A single unambiguous point in time, derived from a parsed
/// expression and a source timezone. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInstant {
    /// The instant in UTC.
    pub utc: DateTime<Utc>,
    /// The zone the wall clock was read in.
    pub source_zone: ZoneHint,
    /// The source wall clock (date and time as the requester wrote it).
    pub wall: NaiveDateTime,
}

impl ResolvedInstant {
    /// The calendar date in the source zone, used to flag day shifts.
    pub fn source_date(&self) -> NaiveDate {
        self.wall.date()
    }

    /// Human-readable name of the source zone.
    pub fn source_label(&self) -> String {
        match self.source_zone {
            ZoneHint::Named(tz) => tz.to_string(),
            ZoneHint::Utc => "UTC".to_string(),
            ZoneHint::Offset(offset) => offset.to_string(),
        }
    }
}

/// A wall-clock reading of an instant in one target zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub local: DateTime<Tz>,
}

impl LocalTime {
    /// The 24-hour wall clock, e.g. `08:00`.
    pub fn clock(&self) -> String {
        self.local.format("%H:%M").to_string()
    }

    pub fn date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    /// The UTC offset in effect at this instant, in seconds.
    pub fn offset_seconds(&self) -> i32 {
        self.local.offset().fix().local_minus_utc()
    }

    /// The offset rendered as `+HH:MM` / `-HH:MM`.
    pub fn offset_label(&self) -> String {
        self.local.offset().fix().to_string()
    }
}

/// Applies a source timezone to a parsed expression, producing one
/// unambiguous instant.
///
/// The effective zone is the expression's own hint if present, else
/// `source_zone`; with neither, resolution fails with
/// [`EngineError::AmbiguousSourceTimezone`]. The date comes from the
/// expression's date hint, anchored on `reference` read in the
/// effective zone (a bare time means "that time on the reference
/// date"; a weekday means its next occurrence, today included).
pub fn resolve_instant(
    expr: &TimeExpression,
    source_zone: Option<ZoneHint>,
    reference: DateTime<Utc>,
) -> Result<ResolvedInstant, EngineError> {
    let zone = expr
        .zone_hint
        .or(source_zone)
        .ok_or(EngineError::AmbiguousSourceTimezone)?;

    let anchor = match zone {
        ZoneHint::Named(tz) => reference.with_timezone(&tz).date_naive(),
        ZoneHint::Utc => reference.date_naive(),
        ZoneHint::Offset(offset) => reference.with_timezone(&offset).date_naive(),
    };
    let date = apply_date_hint(expr.date_hint, anchor);
    let wall = date.and_time(expr.time_of_day);

    let utc = match zone {
        ZoneHint::Named(tz) => localize(wall, tz)?,
        ZoneHint::Utc => Utc.from_utc_datetime(&wall),
        // A fixed offset maps every wall clock to exactly one instant.
        ZoneHint::Offset(offset) => {
            Utc.from_utc_datetime(&(wall - offset))
        }
    };

    Ok(ResolvedInstant {
        utc,
        source_zone: zone,
        wall,
    })
}

/// Converts an instant into the local wall clock of each target zone.
///
/// Deterministic for a fixed (instant, targets, tz database); applies
/// full historical and DST offset rules per zone.
pub fn convert(
    instant: &ResolvedInstant,
    targets: impl IntoIterator<Item = Tz>,
) -> HashMap<Tz, LocalTime> {
    targets
        .into_iter()
        .map(|tz| {
            (
                tz,
                LocalTime {
                    local: instant.utc.with_timezone(&tz),
                },
            )
        })
        .collect()
}

fn apply_date_hint(hint: Option<DateHint>, anchor: NaiveDate) -> NaiveDate {
    match hint {
        None | Some(DateHint::Today) => anchor,
        Some(DateHint::On(date)) => date,
        Some(DateHint::Tomorrow) => anchor + Days::new(1),
        Some(DateHint::Weekday(weekday)) => {
            let ahead = (i64::from(weekday.num_days_from_monday())
                - i64::from(anchor.weekday().num_days_from_monday()))
            .rem_euclid(7);
            anchor + Days::new(ahead.unsigned_abs())
        }
    }
}

fn localize(wall: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, EngineError> {
    match tz.from_local_datetime(&wall) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::None => Err(EngineError::InvalidLocalTime { wall, zone: tz }),
        LocalResult::Ambiguous(earlier, later) => Err(EngineError::AmbiguousLocalTime {
            wall,
            zone: tz,
            earlier_offset: earlier.offset().fix(),
            later_offset: later.offset().fix(),
        }),
    }
}
