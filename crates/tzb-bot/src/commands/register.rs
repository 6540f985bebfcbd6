//! Register command: the web-form boundary without the form.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use tzb_core::{CommunityId, DirectoryStore, EngineError, MemberId, TimezoneDirectory};

pub fn run<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &mut TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
    zone: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    match directory.register(member, community, zone, now) {
        Ok(zone) => writeln!(writer, "Registered {member} in {zone}")?,
        Err(err @ EngineError::InvalidTimezone { .. }) => writeln!(writer, "{err}")?,
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tzb_db::Database;

    #[test]
    fn register_reports_success_and_rejection() {
        let mut dir = TimezoneDirectory::new(Database::open_in_memory().unwrap());
        let member = MemberId::new("alice").unwrap();
        let community = CommunityId::new("guild-1").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        let mut out = Vec::new();
        run(&mut out, &mut dir, &member, &community, "Asia/Tokyo", now).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Registered alice in Asia/Tokyo\n"
        );

        let mut out = Vec::new();
        run(&mut out, &mut dir, &member, &community, "Not/AZone", now).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "unrecognized timezone: Not/AZone\n"
        );
    }
}
