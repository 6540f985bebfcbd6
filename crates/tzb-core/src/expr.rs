//! Parsing of free-form time expressions.
//!
//! The grammar is deliberately small and enumerable: explicit clock
//! times, a handful of date words, relative phrases ("now", "in N
//! hours"), and an optional trailing timezone. Anything else fails
//! fast with [`EngineError::UnparsableExpression`] instead of being
//! guessed at.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::EngineError;

/// An explicit date carried by the expression, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateHint {
    /// An exact calendar date (`2024-01-15`).
    On(NaiveDate),
    /// A named weekday, meaning its next occurrence (today included).
    Weekday(Weekday),
    Today,
    Tomorrow,
}

/// An explicit timezone carried by the expression, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneHint {
    /// A named IANA zone (`America/New_York`).
    Named(Tz),
    Utc,
    /// A fixed UTC offset (`+05:30`). Never ambiguous.
    Offset(FixedOffset),
}

/// A parsed, normalized time expression.
///
/// Relative inputs ("now", "in 2 hours") are normalized at parse time
/// into a UTC wall clock with `zone_hint = Some(ZoneHint::Utc)`, which
/// makes later resolution lossless: UTC has no DST transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeExpression {
    pub date_hint: Option<DateHint>,
    pub time_of_day: NaiveTime,
    pub zone_hint: Option<ZoneHint>,
    /// Whether the input referred to the present moment rather than a
    /// named wall-clock time.
    pub is_relative: bool,
}

/// Parses a single time expression.
///
/// `reference` anchors relative phrases; it plays no role for
/// wall-clock inputs, whose date is resolved later against the source
/// zone. A missing timezone leaves `zone_hint` empty for the caller to
/// fill; the parser never assumes one.
pub fn parse(raw: &str, reference: DateTime<Utc>) -> Result<TimeExpression, EngineError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(unparsable(raw));
    }

    let lowered = input.to_lowercase();
    if lowered == "now" {
        return Ok(at_instant(reference));
    }
    if let Some(expr) = parse_relative_offset(&lowered, reference) {
        return Ok(expr);
    }

    let mut date_hint: Option<DateHint> = None;
    let mut time: Option<NaiveTime> = None;
    let mut clock = Clock::Exact;
    let mut zone_hint: Option<ZoneHint> = None;

    for token in input.split_whitespace() {
        let keyword = token.to_lowercase();

        // Connectives carry no meaning of their own.
        if keyword == "at" || keyword == "on" {
            continue;
        }

        // A detached meridiem adjusts the preceding bare time ("3 pm").
        if clock != Clock::Exact && (keyword == "am" || keyword == "pm") {
            let bare = time.take().ok_or_else(|| unparsable(raw))?;
            time = Some(apply_meridiem(bare, keyword == "pm").ok_or_else(|| unparsable(raw))?);
            clock = Clock::Exact;
            continue;
        }

        if let Some(hint) = parse_date_word(&keyword) {
            if date_hint.replace(hint).is_some() {
                return Err(unparsable(raw));
            }
            continue;
        }

        // Zone tokens keep their original casing: IANA names are
        // case-sensitive.
        if let Some(hint) = parse_zone_token(token, &keyword) {
            if zone_hint.replace(hint?).is_some() {
                return Err(unparsable(raw));
            }
            continue;
        }

        if let Some((parsed, state)) = parse_clock(&keyword) {
            if time.replace(parsed).is_some() {
                return Err(unparsable(raw));
            }
            clock = state;
            continue;
        }

        return Err(unparsable(raw));
    }

    let time_of_day = time.ok_or_else(|| unparsable(raw))?;
    // A bare hour never confirmed by a meridiem is just a number.
    if clock == Clock::Provisional {
        return Err(unparsable(raw));
    }
    Ok(TimeExpression {
        date_hint,
        time_of_day,
        zone_hint,
        is_relative: false,
    })
}

fn unparsable(raw: &str) -> EngineError {
    EngineError::UnparsableExpression {
        input: raw.trim().to_string(),
    }
}

/// Normalizes an exact instant into a UTC wall-clock expression.
fn at_instant(instant: DateTime<Utc>) -> TimeExpression {
    TimeExpression {
        date_hint: Some(DateHint::On(instant.date_naive())),
        time_of_day: instant.time(),
        zone_hint: Some(ZoneHint::Utc),
        is_relative: true,
    }
}

/// Parses "in N hours" / "in N minutes" (and singular/short forms).
fn parse_relative_offset(lowered: &str, reference: DateTime<Utc>) -> Option<TimeExpression> {
    let mut tokens = lowered.split_whitespace();
    if tokens.next()? != "in" {
        return None;
    }
    let amount: i64 = tokens.next()?.parse().ok()?;
    let unit = tokens.next()?;
    if tokens.next().is_some() || amount < 0 {
        return None;
    }
    let delta = match unit {
        "hour" | "hours" | "hr" | "hrs" => Duration::hours(amount),
        "minute" | "minutes" | "min" | "mins" => Duration::minutes(amount),
        _ => return None,
    };
    Some(at_instant(reference + delta))
}

fn parse_date_word(keyword: &str) -> Option<DateHint> {
    if let Ok(date) = NaiveDate::parse_from_str(keyword, "%Y-%m-%d") {
        return Some(DateHint::On(date));
    }
    let hint = match keyword {
        "today" | "tonight" => DateHint::Today,
        "tomorrow" => DateHint::Tomorrow,
        "monday" | "mon" => DateHint::Weekday(Weekday::Mon),
        "tuesday" | "tue" | "tues" => DateHint::Weekday(Weekday::Tue),
        "wednesday" | "wed" => DateHint::Weekday(Weekday::Wed),
        "thursday" | "thu" | "thurs" => DateHint::Weekday(Weekday::Thu),
        "friday" | "fri" => DateHint::Weekday(Weekday::Fri),
        "saturday" | "sat" => DateHint::Weekday(Weekday::Sat),
        "sunday" | "sun" => DateHint::Weekday(Weekday::Sun),
        _ => return None,
    };
    Some(hint)
}

/// Recognizes a timezone token, or `None` if the token is not one.
///
/// Returns `Some(Err(..))` for a token that is clearly meant as a zone
/// (contains `/`) but does not name a known one.
fn parse_zone_token(
    original: &str,
    keyword: &str,
) -> Option<Result<ZoneHint, EngineError>> {
    if keyword == "utc" || keyword == "gmt" {
        return Some(Ok(ZoneHint::Utc));
    }
    if original.contains('/') && !original.contains(':') {
        return Some(
            original
                .parse::<Tz>()
                .map(ZoneHint::Named)
                .map_err(|_| EngineError::InvalidTimezone {
                    name: original.to_string(),
                }),
        );
    }
    if let Some(offset) = parse_fixed_offset(keyword) {
        return Some(Ok(ZoneHint::Offset(offset)));
    }
    None
}

/// Parses `±HH:MM` into a fixed offset.
fn parse_fixed_offset(keyword: &str) -> Option<FixedOffset> {
    let (sign, rest) = match keyword.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// How far a clock token pinned the time down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    /// Fully determined (`3pm`, `noon`, or meridiem already applied).
    Exact,
    /// `H:MM` without meridiem; a following `am`/`pm` may adjust it.
    Open,
    /// A bare hour; only a time if an `am`/`pm` token follows.
    Provisional,
}

/// Parses a clock token: `HH:MM`, `H:MMam`, `Hpm`, `noon`, `midnight`.
///
/// A bare hour (`3`) parses provisionally; the caller rejects it
/// unless a detached `am`/`pm` token confirms it.
fn parse_clock(keyword: &str) -> Option<(NaiveTime, Clock)> {
    match keyword {
        "noon" => return NaiveTime::from_hms_opt(12, 0, 0).map(|t| (t, Clock::Exact)),
        "midnight" => return NaiveTime::from_hms_opt(0, 0, 0).map(|t| (t, Clock::Exact)),
        _ => {}
    }

    let (body, meridiem) = if let Some(body) = keyword.strip_suffix("am") {
        (body, Some(false))
    } else if let Some(body) = keyword.strip_suffix("pm") {
        (body, Some(true))
    } else {
        (keyword, None)
    };
    if body.is_empty() {
        return None;
    }

    let (hour, minute, bare) = match body.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?, false),
        None => (body.parse::<u32>().ok()?, 0, true),
    };
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

    match meridiem {
        Some(is_pm) => apply_meridiem(time, is_pm).map(|t| (t, Clock::Exact)),
        None if bare => Some((time, Clock::Provisional)),
        None => Some((time, Clock::Open)),
    }
}

/// Converts a 12-hour reading to 24-hour time.
fn apply_meridiem(time: NaiveTime, is_pm: bool) -> Option<NaiveTime> {
    use chrono::Timelike;
    let hour = time.hour();
    if hour == 0 || hour > 12 {
        return None;
    }
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    time.with_hour(hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_twelve_hour_clock() {
        let expr = parse("3:30pm", reference()).unwrap();
        assert_eq!(expr.time_of_day, time(15, 30));
        assert_eq!(expr.date_hint, None);
        assert_eq!(expr.zone_hint, None);
        assert!(!expr.is_relative);
    }

    #[test]
    fn parses_twenty_four_hour_clock() {
        let expr = parse("15:30", reference()).unwrap();
        assert_eq!(expr.time_of_day, time(15, 30));
    }

    #[test]
    fn parses_detached_meridiem() {
        assert_eq!(parse("3 pm", reference()).unwrap().time_of_day, time(15, 0));
        assert_eq!(parse("12 am", reference()).unwrap().time_of_day, time(0, 0));
        assert_eq!(
            parse("at 9:15 AM", reference()).unwrap().time_of_day,
            time(9, 15)
        );
        let expr = parse("3 pm America/New_York", reference()).unwrap();
        assert_eq!(expr.time_of_day, time(15, 0));
        assert_eq!(
            expr.zone_hint,
            Some(ZoneHint::Named(chrono_tz::America::New_York))
        );
    }

    #[test]
    fn parses_noon_and_midnight() {
        assert_eq!(parse("noon", reference()).unwrap().time_of_day, time(12, 0));
        let expr = parse("midnight tomorrow", reference()).unwrap();
        assert_eq!(expr.time_of_day, time(0, 0));
        assert_eq!(expr.date_hint, Some(DateHint::Tomorrow));
    }

    #[test]
    fn twelve_handling_matches_convention() {
        assert_eq!(parse("12am", reference()).unwrap().time_of_day, time(0, 0));
        assert_eq!(parse("12pm", reference()).unwrap().time_of_day, time(12, 0));
    }

    #[test]
    fn parses_weekday_hint() {
        let expr = parse("friday 9am", reference()).unwrap();
        assert_eq!(expr.date_hint, Some(DateHint::Weekday(Weekday::Fri)));
        assert_eq!(expr.time_of_day, time(9, 0));
    }

    #[test]
    fn parses_explicit_date() {
        let expr = parse("2024-03-10 2:30am", reference()).unwrap();
        assert_eq!(
            expr.date_hint,
            Some(DateHint::On(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()))
        );
        assert_eq!(expr.time_of_day, time(2, 30));
    }

    #[test]
    fn parses_named_zone_hint() {
        let expr = parse("3:30pm America/New_York", reference()).unwrap();
        assert_eq!(
            expr.zone_hint,
            Some(ZoneHint::Named(chrono_tz::America::New_York))
        );
    }

    #[test]
    fn parses_utc_and_fixed_offset_hints() {
        assert_eq!(
            parse("14:00 UTC", reference()).unwrap().zone_hint,
            Some(ZoneHint::Utc)
        );
        let expr = parse("14:00 +05:30", reference()).unwrap();
        assert_eq!(
            expr.zone_hint,
            Some(ZoneHint::Offset(FixedOffset::east_opt(5 * 3600 + 1800).unwrap()))
        );
    }

    #[test]
    fn unknown_slash_token_is_invalid_timezone() {
        let err = parse("3:30pm Not/AZone", reference()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTimezone {
                name: "Not/AZone".to_string()
            }
        );
    }

    #[test]
    fn now_normalizes_to_utc_wall_clock() {
        let expr = parse("now", reference()).unwrap();
        assert!(expr.is_relative);
        assert_eq!(expr.zone_hint, Some(ZoneHint::Utc));
        assert_eq!(expr.time_of_day, time(20, 0));
        assert_eq!(
            expr.date_hint,
            Some(DateHint::On(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
    }

    #[test]
    fn relative_offsets_anchor_on_reference() {
        let expr = parse("in 2 hours", reference()).unwrap();
        assert!(expr.is_relative);
        assert_eq!(expr.time_of_day, time(22, 0));

        // Crossing midnight moves the date hint as well.
        let expr = parse("in 5 hours", reference()).unwrap();
        assert_eq!(expr.time_of_day, time(1, 0));
        assert_eq!(
            expr.date_hint,
            Some(DateHint::On(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()))
        );

        let expr = parse("in 45 minutes", reference()).unwrap();
        assert_eq!(expr.time_of_day, time(20, 45));
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "dinner time", "25:00", "13pm", "3:70pm", "in red hours", "3:30pm 4pm"] {
            assert!(parse(input, reference()).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn bare_hour_requires_meridiem() {
        assert!(parse("15", reference()).is_err());
        assert!(parse("3", reference()).is_err());
        // A later non-meridiem token does not rescue a bare hour.
        assert!(parse("3 tomorrow", reference()).is_err());
        assert!(parse("3 UTC", reference()).is_err());
    }
}
