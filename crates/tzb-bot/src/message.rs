//! Chat-message boundary.
//!
//! Inbound messages arrive tagged with `(member, community, raw
//! text)`; time expressions are written in `<angle brackets>` so the
//! bot never has to mine arbitrary prose. Platform artifacts
//! (mentions, channels, custom emoji) use the same brackets and are
//! stripped first. The outbound side is a single rendered reply
//! string; the wire protocol around it is not this crate's concern.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use tzb_core::{
    CommunityId, DirectoryStore, EngineError, LinkToken, MemberId, TimezoneDirectory,
    build_report,
};

// Mentions <@123> / <@!123>, channels <#123>, custom emoji <a:name:123>.
static PLATFORM_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(@!?|#)[0-9]+>|<a?:[A-Za-z0-9_.]{2,32}:[0-9]+>").unwrap()
});

static MARKERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^<>]+)>").unwrap());

/// Pulls time-expression markers out of a chat message.
///
/// Links are ignored: `<https://…>` is how some clients suppress
/// embeds, not a time.
pub fn extract_markers(text: &str) -> Vec<String> {
    let cleaned = PLATFORM_ELEMENTS.replace_all(text, "");
    MARKERS
        .captures_iter(&cleaned)
        .map(|capture| capture[1].trim().to_string())
        .filter(|marker| !marker.is_empty() && !marker.starts_with("http"))
        .collect()
}

/// Handles one inbound chat message end to end.
///
/// Returns `Ok(None)` when the message contains no time markers (the
/// bot stays silent). Parse and resolution failures become user-facing
/// help text in the reply; only storage failures propagate as errors.
pub fn handle_message<S: DirectoryStore>(
    directory: &mut TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
    text: &str,
    now: DateTime<Utc>,
    fallback_zone: Option<Tz>,
) -> Result<Option<String>, EngineError> {
    let markers = extract_markers(text);
    if markers.is_empty() {
        return Ok(None);
    }
    tracing::debug!(%member, %community, markers = markers.len(), "handling time query");

    let mut replies = Vec::new();
    for marker in markers {
        match build_report(directory, member, community, &marker, now, fallback_zone) {
            Ok(report) => replies.push(report.to_string()),
            Err(EngineError::AmbiguousSourceTimezone) => {
                // The requester has no registration and nothing else
                // pins the zone down: offer a link. One prompt covers
                // the whole message.
                let token = directory.issue_link(member, community, now)?;
                replies.push(register_prompt(&token));
                break;
            }
            Err(err @ EngineError::Storage(_)) => return Err(err),
            Err(err) => replies.push(help_text(&err, &marker)),
        }
    }
    Ok(Some(replies.join("\n")))
}

/// The registration invitation sent to members without a timezone.
fn register_prompt(token: &LinkToken) -> String {
    format!(
        "You haven't registered a timezone yet. Claim this registration \
         link with your timezone to get converted times: {token}\n\
         Only your member ID and timezone are stored; you can remove \
         them any time with unregister."
    )
}

/// Maps an engine error to the §7-style user-facing message.
fn help_text(err: &EngineError, marker: &str) -> String {
    match err {
        EngineError::UnparsableExpression { .. } => format!(
            "I couldn't read \"{marker}\" as a time. Try forms like \
             <3:30pm>, <15:30 friday>, <noon tomorrow UTC> or <in 2 hours>."
        ),
        EngineError::InvalidTimezone { name } => {
            format!("\"{name}\" is not a timezone I know; use an IANA name like America/New_York.")
        }
        // DST gaps/overlaps and the rest carry their own explanation.
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tzb_db::Database;

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    fn community() -> CommunityId {
        CommunityId::new("guild-1").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn directory() -> TimezoneDirectory<Database> {
        let mut dir = TimezoneDirectory::new(Database::open_in_memory().unwrap());
        dir.register(&member("alice"), &community(), "Asia/Tokyo", now())
            .unwrap();
        dir.register(&member("bob"), &community(), "America/New_York", now())
            .unwrap();
        dir
    }

    #[test]
    fn extracts_markers_and_ignores_platform_noise() {
        let text = "hey <@123456789012345678> raid at <8pm> or <9pm>? \
                    <a:pog:123456789012345678> details in <#123456789012345678> \
                    <https://example.com/raid>";
        assert_eq!(extract_markers(text), vec!["8pm", "9pm"]);
    }

    #[test]
    fn plain_chatter_has_no_markers() {
        assert!(extract_markers("see you at 8pm maybe").is_empty());
        assert!(extract_markers("empty <> and blank < > brackets").is_empty());
    }

    #[test]
    fn silent_when_no_markers() {
        let mut dir = directory();
        let reply = handle_message(&mut dir, &member("bob"), &community(), "hello", now(), None)
            .unwrap();
        assert_eq!(reply, None);
    }

    #[test]
    fn answers_with_a_report() {
        let mut dir = directory();
        let reply = handle_message(
            &mut dir,
            &member("bob"),
            &community(),
            "raid at <3:30pm>?",
            now(),
            None,
        )
        .unwrap()
        .unwrap();
        assert!(reply.contains("15:30 on 2024-01-15 in America/New_York"));
        assert!(reply.contains("alice: 05:30 Asia/Tokyo (+09:00, +1d)"));
    }

    #[test]
    fn unregistered_requester_gets_a_link_prompt() {
        let mut dir = directory();
        let reply = handle_message(
            &mut dir,
            &member("carol"),
            &community(),
            "free at <9pm>?",
            now(),
            None,
        )
        .unwrap()
        .unwrap();
        assert!(reply.contains("haven't registered a timezone"));
    }

    #[test]
    fn unparsable_marker_gets_help_text() {
        let mut dir = directory();
        let reply = handle_message(
            &mut dir,
            &member("bob"),
            &community(),
            "meet at <teatime>",
            now(),
            None,
        )
        .unwrap()
        .unwrap();
        assert!(reply.contains("couldn't read \"teatime\""));
    }

    #[test]
    fn dst_gap_is_explained_not_guessed() {
        let mut dir = directory();
        let reply = handle_message(
            &mut dir,
            &member("bob"),
            &community(),
            "<2:30am 2024-03-10>",
            now(),
            None,
        )
        .unwrap()
        .unwrap();
        assert!(reply.contains("does not exist in America/New_York"));
    }
}
