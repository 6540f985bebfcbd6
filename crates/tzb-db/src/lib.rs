//! SQLite storage for the timezone directory.
//!
//! Implements [`tzb_core::DirectoryStore`] over `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`: an instance can move between threads but needs external
//! synchronization (a `Mutex`, a pool, or one instance per handler) to
//! be shared. The engine holds no state of its own, so per-handler
//! instances are the cheapest option.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 (e.g.
//! `2024-01-15T10:30:00Z`): lexicographic order matches chronological
//! order and values stay human-readable. Registrations are keyed by
//! `(member_id, community_id)`; `created_at` records the first
//! registration and survives re-registration, because report ordering
//! tie-breaks on registration insertion order. Upserts give the
//! last-write-wins semantics the directory relies on: SQLite serializes
//! writers, so concurrent registrations for one key leave the last
//! committed value.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use thiserror::Error;

use tzb_core::{CommunityId, DirectoryStore, LinkToken, MemberId, PendingLink, StoreError};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp failed to parse.
    #[error("invalid timestamp for link {token}: {timestamp}")]
    TimestampParse {
        token: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored identifier failed validation on the way out.
    #[error("corrupt identifier in row: {0}")]
    CorruptId(#[from] tzb_core::ValidationError),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::new(err.to_string())
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety notes.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the
    /// connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Registrations: one active row per (member, community).
            -- created_at is the first registration time and is kept
            -- across re-registrations.
            CREATE TABLE IF NOT EXISTS members (
                member_id TEXT NOT NULL,
                community_id TEXT NOT NULL,
                timezone TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (member_id, community_id)
            );

            CREATE INDEX IF NOT EXISTS idx_members_community
                ON members(community_id, created_at);

            -- Outstanding registration links; at most one per key.
            CREATE TABLE IF NOT EXISTS links (
                token TEXT PRIMARY KEY,
                member_id TEXT NOT NULL,
                community_id TEXT NOT NULL,
                issued_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_links_member
                ON links(member_id, community_id);
            ",
        )?;
        Ok(())
    }

    fn upsert_member(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
        zone_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let now = format_timestamp(now);
        self.conn.execute(
            "
            INSERT INTO members (member_id, community_id, timezone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(member_id, community_id) DO UPDATE SET
                timezone = excluded.timezone,
                updated_at = excluded.updated_at
            ",
            params![member.as_str(), community.as_str(), zone_name, now, now],
        )?;
        Ok(())
    }

    fn remove_member(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<bool, DbError> {
        let removed = self.conn.execute(
            "DELETE FROM members WHERE member_id = ? AND community_id = ?",
            params![member.as_str(), community.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn get_member(
        &self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<Option<String>, DbError> {
        let zone = self
            .conn
            .query_row(
                "SELECT timezone FROM members WHERE member_id = ? AND community_id = ?",
                params![member.as_str(), community.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(zone)
    }

    /// Batched lookup: one `IN (…)` query, results mapped back onto the
    /// input order with `None` for missing members.
    fn get_members(
        &self,
        members: &[MemberId],
        community: &CommunityId,
    ) -> Result<Vec<(MemberId, Option<String>)>, DbError> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; members.len()].join(", ");
        let sql = format!(
            "SELECT member_id, timezone FROM members
             WHERE community_id = ? AND member_id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let params = std::iter::once(community.as_str())
            .chain(members.iter().map(MemberId::as_str));
        let rows = stmt.query_map(params_from_iter(params), |row| {
            let member: String = row.get(0)?;
            let zone: String = row.get(1)?;
            Ok((member, zone))
        })?;
        let mut found: HashMap<String, String> = HashMap::new();
        for row in rows {
            let (member, zone) = row?;
            found.insert(member, zone);
        }
        Ok(members
            .iter()
            .map(|member| (member.clone(), found.remove(member.as_str())))
            .collect())
    }

    fn community_members(&self, community: &CommunityId) -> Result<Vec<MemberId>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT member_id FROM members
            WHERE community_id = ?
            ORDER BY created_at ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map(params![community.as_str()], |row| {
            row.get::<_, String>(0)
        })?;
        let mut members = Vec::new();
        for row in rows {
            members.push(MemberId::new(row?)?);
        }
        Ok(members)
    }

    fn insert_link(&mut self, link: &PendingLink) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM links WHERE member_id = ? AND community_id = ?",
            params![link.member.as_str(), link.community.as_str()],
        )?;
        tx.execute(
            "INSERT INTO links (token, member_id, community_id, issued_at) VALUES (?, ?, ?, ?)",
            params![
                link.token.as_str(),
                link.member.as_str(),
                link.community.as_str(),
                format_timestamp(link.issued_at),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_link(&mut self, token: &LinkToken) -> Result<Option<PendingLink>, DbError> {
        let tx = self.conn.transaction()?;
        let row = tx
            .query_row(
                "SELECT member_id, community_id, issued_at FROM links WHERE token = ?",
                params![token.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((member, community, issued_at)) = row else {
            return Ok(None);
        };
        tx.execute("DELETE FROM links WHERE token = ?", params![token.as_str()])?;
        tx.commit()?;

        let issued_at = DateTime::parse_from_rfc3339(&issued_at)
            .map_err(|source| DbError::TimestampParse {
                token: token.as_str().to_string(),
                timestamp: issued_at.clone(),
                source,
            })?
            .with_timezone(&Utc);
        Ok(Some(PendingLink {
            token: token.clone(),
            member: MemberId::new(member)?,
            community: CommunityId::new(community)?,
            issued_at,
        }))
    }
}

impl DirectoryStore for Database {
    fn upsert(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
        zone_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tracing::trace!(%member, %community, zone = zone_name, "upsert registration");
        Ok(self.upsert_member(member, community, zone_name, now)?)
    }

    fn remove(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<bool, StoreError> {
        Ok(self.remove_member(member, community)?)
    }

    fn get(
        &self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.get_member(member, community)?)
    }

    fn get_many(
        &self,
        members: &[MemberId],
        community: &CommunityId,
    ) -> Result<Vec<(MemberId, Option<String>)>, StoreError> {
        Ok(self.get_members(members, community)?)
    }

    fn members_of(&self, community: &CommunityId) -> Result<Vec<MemberId>, StoreError> {
        Ok(self.community_members(community)?)
    }

    fn put_link(&mut self, link: &PendingLink) -> Result<(), StoreError> {
        Ok(self.insert_link(link)?)
    }

    fn take_link(&mut self, token: &LinkToken) -> Result<Option<PendingLink>, StoreError> {
        Ok(self.delete_link(token)?)
    }
}

/// Formats a timestamp as ISO 8601 with UTC `Z` suffix.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
