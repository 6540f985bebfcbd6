//! Unregister command: explicit member removal.

use std::io::Write;

use anyhow::Result;

use tzb_core::{CommunityId, DirectoryStore, MemberId, TimezoneDirectory};

pub fn run<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &mut TimezoneDirectory<S>,
    member: &MemberId,
    community: &CommunityId,
) -> Result<()> {
    if directory.unregister(member, community)? {
        writeln!(writer, "Removed registration for {member}")?;
    } else {
        writeln!(writer, "{member} has no registration in {community}")?;
    }
    Ok(())
}
