//! When command: one expression, one multi-timezone report.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;

use tzb_core::{
    CommunityId, DirectoryStore, EngineError, MemberId, Report, TimezoneDirectory, build_report,
};

pub fn run<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
    expression: &str,
    json: bool,
    now: DateTime<Utc>,
    fallback_zone: Option<Tz>,
) -> Result<()> {
    match build_report(directory, member, community, expression, now, fallback_zone) {
        Ok(report) => {
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&to_json(&report))?)?;
            } else {
                write!(writer, "{report}")?;
            }
        }
        // User-facing failures are part of normal operation, not
        // process errors.
        Err(err @ EngineError::Storage(_)) => return Err(err.into()),
        Err(err) => writeln!(writer, "{err}")?,
    }
    Ok(())
}

fn to_json(report: &Report) -> serde_json::Value {
    json!({
        "source": {
            "wall_clock": report.source_wall.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "zone": report.source_label,
            "utc": report.utc.to_rfc3339(),
        },
        "resolved": report
            .entries
            .iter()
            .map(|entry| {
                json!({
                    "member": entry.member.as_str(),
                    "zone": entry.zone.name(),
                    "local": entry.local.clock(),
                    "date": entry.local.date().to_string(),
                    "utc_offset_seconds": entry.local.offset_seconds(),
                })
            })
            .collect::<Vec<_>>(),
        "unresolved": report
            .unresolved
            .iter()
            .map(MemberId::as_str)
            .collect::<Vec<_>>(),
    })
}
