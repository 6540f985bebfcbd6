//! Message command: drive the full chat pipeline from the CLI.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use tzb_core::{CommunityId, DirectoryStore, MemberId, TimezoneDirectory};

use crate::message::handle_message;

pub fn run<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &mut TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
    text: &str,
    now: DateTime<Utc>,
    fallback_zone: Option<Tz>,
) -> Result<()> {
    match handle_message(directory, member, community, text, now, fallback_zone)? {
        Some(reply) => write!(writer, "{reply}")?,
        None => writeln!(writer, "(no time markers in message)")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tzb_db::Database;

    #[test]
    fn message_command_replies_or_stays_silent() {
        let mut dir = TimezoneDirectory::new(Database::open_in_memory().unwrap());
        let member = MemberId::new("bob").unwrap();
        let community = CommunityId::new("guild-1").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        dir.register(&member, &community, "America/New_York", now)
            .unwrap();

        let mut out = Vec::new();
        run(&mut out, &mut dir, &member, &community, "gm all", now, None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "(no time markers in message)\n"
        );

        let mut out = Vec::new();
        run(
            &mut out,
            &mut dir,
            &member,
            &community,
            "standup at <9:30am>",
            now,
            None,
        )
        .unwrap();
        assert!(
            String::from_utf8(out)
                .unwrap()
                .starts_with("09:30 on 2024-01-15 in America/New_York:")
        );
    }
}
