//! Link commands: the registration web form's two halves.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use tzb_core::{
    CommunityId, DirectoryStore, EngineError, LinkToken, MemberId, TimezoneDirectory,
};

pub fn issue<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &mut TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
    now: DateTime<Utc>,
) -> Result<()> {
    let token = directory.issue_link(member, community, now)?;
    writeln!(writer, "Registration link for {member}: {token}")?;
    Ok(())
}

pub fn claim<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &mut TimezoneDirectory<S>,
    token: &str,
    zone: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    match directory.claim_link(&LinkToken::new(token), zone, now) {
        Ok(claim) => writeln!(
            writer,
            "Registered {} in {} for {}",
            claim.member, claim.zone, claim.community
        )?,
        Err(err @ EngineError::Storage(_)) => return Err(err.into()),
        Err(err) => writeln!(writer, "{err}")?,
    }
    Ok(())
}
