//! Test rosters: mock `Roster` implementations for tests.

use std::collections::HashSet;

use async_trait::async_trait;
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::{MemberId, TenantId};
use gauntlet_core::repository::Roster;

/// A roster holding a fixed set of members, shared by every tenant.
#[derive(Debug, Default)]
pub struct StaticRoster {
    members: HashSet<MemberId>,
}

impl StaticRoster {
    /// Creates a roster containing `members`.
    #[must_use]
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(MemberId::new).collect(),
        }
    }
}

#[async_trait]
impl Roster for StaticRoster {
    async fn member_exists(
        &self,
        _tenant_id: &TenantId,
        member_id: &MemberId,
    ) -> Result<bool, DomainError> {
        Ok(self.members.contains(member_id))
    }
}

/// A roster whose lookups always fail with an infrastructure error.
#[derive(Debug)]
pub struct FailingRoster;

#[async_trait]
impl Roster for FailingRoster {
    async fn member_exists(
        &self,
        _tenant_id: &TenantId,
        _member_id: &MemberId,
    ) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("roster unavailable".into()))
    }
}
