//! Members command: list a community's registrations.

use std::io::Write;

use anyhow::Result;

use tzb_core::{CommunityId, DirectoryStore, TimezoneDirectory};

pub fn run<W: Write, S: DirectoryStore>(
    writer: &mut W,
    directory: &TimezoneDirectory<S>,
    community: &CommunityId,
) -> Result<()> {
    let members = directory.members_of(community)?;
    if members.is_empty() {
        writeln!(writer, "No registered members in {community}")?;
        return Ok(());
    }
    let zones = directory.lookup_many(&members, community)?;
    writeln!(writer, "Members of {community}:")?;
    for mz in zones {
        match mz.zone {
            Some(zone) => writeln!(writer, "- {}: {zone}", mz.member)?,
            None => writeln!(writer, "- {}: (unresolvable zone)", mz.member)?,
        }
    }
    Ok(())
}
