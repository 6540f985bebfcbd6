//! Multi-timezone report assembly.
//!
//! Composes parser, directory, and conversion results into a single
//! immutable [`Report`]: resolved members ordered by ascending UTC
//! offset (registration insertion order breaks ties), unresolved
//! members listed separately by identifier.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::convert::{LocalTime, convert, resolve_instant};
use crate::directory::{DirectoryStore, TimezoneDirectory};
use crate::error::EngineError;
use crate::expr::{ZoneHint, parse};
use crate::types::{CommunityId, MemberId};

/// One resolved member's line in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub member: MemberId,
    pub zone: Tz,
    pub local: LocalTime,
}

/// The rendered answer to one "what time is X for everyone" query.
///
/// Immutable once built; rendering via `Display` is deterministic for
/// identical inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The source wall clock as the requester phrased it.
    pub source_wall: NaiveDateTime,
    /// Human-readable source zone name.
    pub source_label: String,
    /// The resolved instant in UTC.
    pub utc: DateTime<Utc>,
    /// Resolved members, ordered by (UTC offset, insertion order).
    pub entries: Vec<ReportEntry>,
    /// Members with no usable registration, ordered by identifier.
    pub unresolved: Vec<MemberId>,
}

/// Builds a report for a community query.
///
/// The source timezone is taken from the expression itself when
/// explicit, else from the requester's registration, else from
/// `fallback_zone` (a community-wide default); with none of the three
/// the build fails with [`EngineError::AmbiguousSourceTimezone`].
pub fn build_report<S: DirectoryStore>(
    directory: &TimezoneDirectory<S>,
    requester: &MemberId,
    community: &CommunityId,
    raw_text: &str,
    now: DateTime<Utc>,
    fallback_zone: Option<Tz>,
) -> Result<Report, EngineError> {
    let requester_zone = directory.lookup(requester, community)?;
    let source_zone = requester_zone.or(fallback_zone).map(ZoneHint::Named);

    let expr = parse(raw_text, now)?;
    let instant = resolve_instant(&expr, source_zone, now)?;

    // Audience: every registered member, plus the requester (who may
    // be asking with an explicit zone before registering).
    let mut audience = directory.members_of(community)?;
    if !audience.contains(requester) {
        audience.push(requester.clone());
    }
    let zones = directory.lookup_many(&audience, community)?;

    let unique_zones: Vec<Tz> = zones.iter().filter_map(|mz| mz.zone).collect();
    let locals: HashMap<Tz, LocalTime> = convert(&instant, unique_zones);

    let mut entries = Vec::new();
    let mut unresolved = Vec::new();
    for mz in zones {
        match mz.zone {
            Some(zone) => entries.push(ReportEntry {
                member: mz.member,
                zone,
                local: locals[&zone],
            }),
            None => unresolved.push(mz.member),
        }
    }
    // Stable sort: members sharing an offset keep insertion order.
    entries.sort_by_key(|entry| entry.local.offset_seconds());
    unresolved.sort();

    tracing::debug!(
        %community,
        resolved = entries.len(),
        unresolved = unresolved.len(),
        "built report"
    );

    Ok(Report {
        source_wall: instant.wall,
        source_label: instant.source_label(),
        utc: instant.utc,
        entries,
        unresolved,
    })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} on {} in {}:",
            self.source_wall.format("%H:%M"),
            self.source_wall.format("%Y-%m-%d"),
            self.source_label
        )?;
        if self.entries.is_empty() {
            writeln!(f, "  (no registered timezones)")?;
        }
        let source_date = self.source_wall.date();
        for entry in &self.entries {
            let shift = (entry.local.date() - source_date).num_days();
            let day_note = if shift == 0 {
                String::new()
            } else {
                format!(", {shift:+}d")
            };
            writeln!(
                f,
                "  {}: {} {} ({}{})",
                entry.member,
                entry.local.clock(),
                entry.zone,
                entry.local.offset_label(),
                day_note
            )?;
        }
        if !self.unresolved.is_empty() {
            let names: Vec<&str> = self.unresolved.iter().map(MemberId::as_str).collect();
            writeln!(f, "No timezone registered: {}", names.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::MemoryStore;
    use chrono::TimeZone;

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    fn community() -> CommunityId {
        CommunityId::new("guild-1").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn seeded_directory() -> TimezoneDirectory<MemoryStore> {
        let mut dir = TimezoneDirectory::new(MemoryStore::default());
        dir.register(&member("alice"), &community(), "Asia/Tokyo", now())
            .unwrap();
        dir.register(&member("bob"), &community(), "America/New_York", now())
            .unwrap();
        dir.register(&member("carol"), &community(), "Europe/London", now())
            .unwrap();
        dir
    }

    #[test]
    fn orders_by_ascending_utc_offset() {
        let dir = seeded_directory();
        let report =
            build_report(&dir, &member("bob"), &community(), "3:30pm", now(), None).unwrap();

        let order: Vec<&str> = report.entries.iter().map(|e| e.member.as_str()).collect();
        // New York -5, London +0, Tokyo +9.
        assert_eq!(order, ["bob", "carol", "alice"]);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn unregistered_members_are_reported_separately() {
        let mut dir = seeded_directory();
        // dave asked around but never registered.
        let report =
            build_report(&dir, &member("dave"), &community(), "15:30 UTC", now(), None).unwrap();
        assert_eq!(report.unresolved, vec![member("dave")]);
        assert_eq!(report.entries.len(), 3);

        dir.register(&member("dave"), &community(), "Europe/Berlin", now())
            .unwrap();
        let report =
            build_report(&dir, &member("dave"), &community(), "15:30 UTC", now(), None).unwrap();
        assert!(report.unresolved.is_empty());
        assert_eq!(report.entries.len(), 4);
    }

    #[test]
    fn requester_zone_is_the_default_source() {
        let dir = seeded_directory();
        // bob is in New York; "3:30pm" on 2024-01-15 is EST, UTC-5.
        let report =
            build_report(&dir, &member("bob"), &community(), "3:30pm", now(), None).unwrap();
        assert_eq!(report.source_label, "America/New_York");
        assert_eq!(report.utc, Utc.with_ymd_and_hms(2024, 1, 15, 20, 30, 0).unwrap());
    }

    #[test]
    fn fallback_zone_covers_unregistered_requesters() {
        let dir = seeded_directory();
        let report = build_report(
            &dir,
            &member("dave"),
            &community(),
            "3:30pm",
            now(),
            Some(chrono_tz::Europe::London),
        )
        .unwrap();
        assert_eq!(report.source_label, "Europe/London");
    }

    #[test]
    fn no_source_zone_anywhere_fails() {
        let dir = seeded_directory();
        let err = build_report(&dir, &member("dave"), &community(), "3:30pm", now(), None)
            .unwrap_err();
        assert_eq!(err, EngineError::AmbiguousSourceTimezone);
    }

    #[test]
    fn insertion_order_breaks_offset_ties() {
        let mut dir = TimezoneDirectory::new(MemoryStore::default());
        // Same offset, registered in this order.
        dir.register(&member("zoe"), &community(), "Europe/Paris", now())
            .unwrap();
        dir.register(&member("ann"), &community(), "Europe/Berlin", now())
            .unwrap();
        let report =
            build_report(&dir, &member("zoe"), &community(), "15:30 UTC", now(), None).unwrap();
        let order: Vec<&str> = report.entries.iter().map(|e| e.member.as_str()).collect();
        assert_eq!(order, ["zoe", "ann"]);
    }

    #[test]
    fn rendering_is_deterministic_and_flags_day_shifts() {
        let dir = seeded_directory();
        // 23:30 London time on Jan 15 is already Jan 16 in Tokyo.
        let report = build_report(
            &dir,
            &member("carol"),
            &community(),
            "11:30pm",
            now(),
            None,
        )
        .unwrap();
        let rendered = report.to_string();
        assert_eq!(
            rendered,
            "23:30 on 2024-01-15 in Europe/London:\n\
             \u{20}\u{20}bob: 18:30 America/New_York (-05:00)\n\
             \u{20}\u{20}carol: 23:30 Europe/London (+00:00)\n\
             \u{20}\u{20}alice: 08:30 Asia/Tokyo (+09:00, +1d)\n"
        );

        let again = build_report(
            &dir,
            &member("carol"),
            &community(),
            "11:30pm",
            now(),
            None,
        )
        .unwrap();
        assert_eq!(again.to_string(), rendered);
    }

    #[test]
    fn propagates_parse_failures() {
        let dir = seeded_directory();
        let err =
            build_report(&dir, &member("bob"), &community(), "teatime", now(), None).unwrap_err();
        assert!(matches!(err, EngineError::UnparsableExpression { .. }));
    }
}
