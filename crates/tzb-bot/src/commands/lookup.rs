//! Lookup command: show one member's registration.

use std::io::Write;

use anyhow::Result;

use tzb_core::{CommunityId, DirectoryStore, MemberId, TimezoneDirectory};

pub fn run<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
) -> Result<()> {
    match directory.lookup(member, community)? {
        Some(zone) => writeln!(writer, "{member}: {zone}")?,
        None => writeln!(writer, "{member}: unregistered")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tzb_db::Database;

    #[test]
    fn lookup_prints_zone_or_unregistered() {
        let mut dir = TimezoneDirectory::new(Database::open_in_memory().unwrap());
        let member = MemberId::new("alice").unwrap();
        let community = CommunityId::new("guild-1").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        let mut out = Vec::new();
        run(&mut out, &dir, &member, &community).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "alice: unregistered\n");

        dir.register(&member, &community, "Europe/Berlin", now).unwrap();
        let mut out = Vec::new();
        run(&mut out, &dir, &member, &community).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "alice: Europe/Berlin\n");
    }
}
