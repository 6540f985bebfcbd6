//! The timezone directory: durable member → timezone registrations.
//!
//! The directory itself holds no mutable state and performs no
//! caching; every call is a round trip to the [`DirectoryStore`]
//! collaborator, which guarantees per-key last-write-wins ordering.
//! That keeps the component safe to instantiate per request or share
//! across any number of concurrent request handlers.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::{EngineError, StoreError};
use crate::types::{CommunityId, MemberId};

/// Default validity window for registration links.
pub const DEFAULT_LINK_TIMEOUT_MINUTES: i64 = 30;

/// An opaque registration-link token handed to the member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkToken(String);

impl LinkToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outstanding registration link awaiting a web-form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    pub token: LinkToken,
    pub member: MemberId,
    pub community: CommunityId,
    pub issued_at: DateTime<Utc>,
}

/// The outcome of a successful link claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClaim {
    pub member: MemberId,
    pub community: CommunityId,
    pub zone: Tz,
}

/// One member's lookup result. `zone` is `None` for unresolved
/// members, which is a normal partial-result state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberZone {
    pub member: MemberId,
    pub zone: Option<Tz>,
}

/// Persistence seam for the directory.
///
/// Implementations provide key-value style upserts and point/batch
/// lookups over `(member, community)` with last-write-wins semantics.
/// Timezone identifiers cross this boundary as raw strings; the
/// directory validates them on the way in and decodes them on the way
/// out.
pub trait DirectoryStore {
    /// Durably writes a registration, superseding any prior record for
    /// the same key. The first registration time must be preserved so
    /// insertion order stays stable across re-registrations.
    fn upsert(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
        zone_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Removes a registration; returns whether one existed.
    fn remove(&mut self, member: &MemberId, community: &CommunityId)
    -> Result<bool, StoreError>;

    /// Point lookup of the stored timezone identifier.
    fn get(
        &self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<Option<String>, StoreError>;

    /// Batched lookup, one round trip. Results come back in input
    /// order; missing members map to `None`.
    fn get_many(
        &self,
        members: &[MemberId],
        community: &CommunityId,
    ) -> Result<Vec<(MemberId, Option<String>)>, StoreError>;

    /// All registered members of a community, in registration
    /// insertion order.
    fn members_of(&self, community: &CommunityId) -> Result<Vec<MemberId>, StoreError>;

    /// Stores a pending link, superseding any outstanding link for the
    /// same `(member, community)`.
    fn put_link(&mut self, link: &PendingLink) -> Result<(), StoreError>;

    /// Removes and returns the link for a token, if any.
    fn take_link(&mut self, token: &LinkToken) -> Result<Option<PendingLink>, StoreError>;
}

/// Validates an IANA timezone identifier.
pub fn validate_zone(name: &str) -> Result<Tz, EngineError> {
    name.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone {
            name: name.to_string(),
        })
}

/// The directory component, layered over a [`DirectoryStore`].
#[derive(Debug)]
pub struct TimezoneDirectory<S> {
    store: S,
    link_timeout: Duration,
}

impl<S: DirectoryStore> TimezoneDirectory<S> {
    pub fn new(store: S) -> Self {
        Self::with_link_timeout(store, DEFAULT_LINK_TIMEOUT_MINUTES)
    }

    pub fn with_link_timeout(store: S, minutes: i64) -> Self {
        Self {
            store,
            link_timeout: Duration::minutes(minutes),
        }
    }

    /// Registers (or re-registers) a member's timezone.
    ///
    /// Fails with [`EngineError::InvalidTimezone`] before touching the
    /// store when the identifier is not a recognized IANA zone.
    pub fn register(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
        zone_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Tz, EngineError> {
        let zone = validate_zone(zone_name)?;
        self.store.upsert(member, community, zone.name(), now)?;
        tracing::debug!(%member, %community, zone = zone.name(), "registered timezone");
        Ok(zone)
    }

    /// Removes a member's registration; returns whether one existed.
    pub fn unregister(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<bool, EngineError> {
        let removed = self.store.remove(member, community)?;
        if removed {
            tracing::debug!(%member, %community, "unregistered timezone");
        }
        Ok(removed)
    }

    /// Looks up a member's registered timezone.
    ///
    /// A stored identifier that no longer parses (tz database drift)
    /// reads as unresolved rather than an error.
    pub fn lookup(
        &self,
        member: &MemberId,
        community: &CommunityId,
    ) -> Result<Option<Tz>, EngineError> {
        let stored = self.store.get(member, community)?;
        Ok(stored.as_deref().and_then(decode_zone))
    }

    /// Batched lookup for many members in one store round trip.
    pub fn lookup_many(
        &self,
        members: &[MemberId],
        community: &CommunityId,
    ) -> Result<Vec<MemberZone>, EngineError> {
        let rows = self.store.get_many(members, community)?;
        Ok(rows
            .into_iter()
            .map(|(member, stored)| MemberZone {
                member,
                zone: stored.as_deref().and_then(decode_zone),
            })
            .collect())
    }

    /// All registered members of a community, in registration
    /// insertion order.
    pub fn members_of(&self, community: &CommunityId) -> Result<Vec<MemberId>, EngineError> {
        Ok(self.store.members_of(community)?)
    }

    /// Issues a registration link for the member, superseding any
    /// outstanding one for the same key.
    pub fn issue_link(
        &mut self,
        member: &MemberId,
        community: &CommunityId,
        now: DateTime<Utc>,
    ) -> Result<LinkToken, EngineError> {
        let token = LinkToken(Uuid::new_v4().to_string());
        self.store.put_link(&PendingLink {
            token: token.clone(),
            member: member.clone(),
            community: community.clone(),
            issued_at: now,
        })?;
        tracing::debug!(%member, %community, "issued registration link");
        Ok(token)
    }

    /// Claims a registration link with a timezone submitted through
    /// the web form, consuming the link.
    pub fn claim_link(
        &mut self,
        token: &LinkToken,
        zone_name: &str,
        now: DateTime<Utc>,
    ) -> Result<LinkClaim, EngineError> {
        // Validate before consuming the link so a typo in the form
        // does not force reissuing it.
        let zone = validate_zone(zone_name)?;
        let link = self
            .store
            .take_link(token)?
            .ok_or(EngineError::UnknownLink)?;
        if now - link.issued_at > self.link_timeout {
            return Err(EngineError::LinkExpired);
        }
        self.store
            .upsert(&link.member, &link.community, zone.name(), now)?;
        tracing::debug!(member = %link.member, community = %link.community, "link claimed");
        Ok(LinkClaim {
            member: link.member,
            community: link.community,
            zone,
        })
    }
}

fn decode_zone(name: &str) -> Option<Tz> {
    match name.parse() {
        Ok(zone) => Some(zone),
        Err(_) => {
            tracing::warn!(zone = name, "stored timezone no longer parses; treating as unresolved");
            None
        }
    }
}
