//! Roster handlers.
//!
//! The roster only answers "is this member in the clan" for run submission.
//! Membership changes never touch the battle state or the ledger, so these
//! handlers do not take the tenant's update lock.

use gauntlet_core::error::DomainError;
use gauntlet_core::repository::MemberRecord;
use gauntlet_core::tenant::TenantRouter;
use tracing::{info, warn};

use crate::domain::commands::{JoinRoster, LeaveRoster};

/// Handles the `JoinRoster` command.
///
/// Returns `false` when the member was already on the roster; the existing
/// entry is kept as is.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the name is blank.
pub async fn handle_join_roster(
    command: &JoinRoster,
    router: &TenantRouter,
) -> Result<bool, DomainError> {
    let name = command.name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("member name must not be empty".into()));
    }
    let member = MemberRecord {
        member_id: command.member_id.clone(),
        name: name.to_owned(),
        nick: command
            .nick
            .as_deref()
            .map(str::trim)
            .filter(|nick| !nick.is_empty())
            .map(str::to_owned),
    };

    let handle = router.handle_for(&command.tenant_id).await?;
    let added = handle.store().add_member(&member).await?;
    if added {
        info!(
            correlation_id = %command.correlation_id,
            tenant_id = %command.tenant_id,
            member_id = %command.member_id,
            "member joined roster"
        );
    } else {
        warn!(
            correlation_id = %command.correlation_id,
            tenant_id = %command.tenant_id,
            member_id = %command.member_id,
            "member already on roster"
        );
    }
    Ok(added)
}

/// Handles the `LeaveRoster` command. Runs already recorded by the member
/// stay in the ledger.
///
/// # Errors
///
/// Returns `DomainError::NotAMember` if the member is not on the roster.
pub async fn handle_leave_roster(
    command: &LeaveRoster,
    router: &TenantRouter,
) -> Result<(), DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    if !handle.store().remove_member(&command.member_id).await? {
        return Err(DomainError::NotAMember(command.member_id.clone()));
    }
    info!(
        correlation_id = %command.correlation_id,
        tenant_id = %command.tenant_id,
        member_id = %command.member_id,
        "member left roster"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gauntlet_core::ids::{MemberId, TenantId};
    use gauntlet_core::repository::Roster;
    use gauntlet_test_support::InMemoryStoreOpener;
    use uuid::Uuid;

    use super::*;
    use crate::application::query_handlers::list_members;

    fn join(tenant_id: &TenantId, member: &str, name: &str, nick: Option<&str>) -> JoinRoster {
        JoinRoster {
            correlation_id: Uuid::new_v4(),
            tenant_id: tenant_id.clone(),
            member_id: MemberId::new(member),
            name: name.into(),
            nick: nick.map(Into::into),
        }
    }

    #[tokio::test]
    async fn test_join_then_router_reports_membership() {
        // Arrange
        let router = TenantRouter::new(Arc::new(InMemoryStoreOpener::new()));
        let tenant_id = TenantId::parse("guild-1").unwrap();

        // Act
        let added = handle_join_roster(&join(&tenant_id, "1001", "Pecorine", None), &router)
            .await
            .unwrap();

        // Assert
        assert!(added);
        let member = MemberId::new("1001");
        assert!(router.member_exists(&tenant_id, &member).await.unwrap());
        let other = TenantId::parse("guild-2").unwrap();
        assert!(!router.member_exists(&other, &member).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_join_is_not_an_error() {
        // Arrange
        let router = TenantRouter::new(Arc::new(InMemoryStoreOpener::new()));
        let tenant_id = TenantId::parse("guild-1").unwrap();
        handle_join_roster(&join(&tenant_id, "1001", "Pecorine", None), &router)
            .await
            .unwrap();

        // Act
        let added = handle_join_roster(&join(&tenant_id, "1001", "Someone", Some("x")), &router)
            .await
            .unwrap();

        // Assert
        assert!(!added);
        let members = list_members(&tenant_id, &router).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].display_name, "Pecorine");
    }

    #[tokio::test]
    async fn test_list_prefers_nickname() {
        // Arrange
        let router = TenantRouter::new(Arc::new(InMemoryStoreOpener::new()));
        let tenant_id = TenantId::parse("guild-1").unwrap();
        handle_join_roster(&join(&tenant_id, "1001", "Pecorine", Some("Peco")), &router)
            .await
            .unwrap();
        handle_join_roster(&join(&tenant_id, "1002", "Kokkoro", Some("  ")), &router)
            .await
            .unwrap();

        // Act
        let members = list_members(&tenant_id, &router).await.unwrap();

        // Assert
        let names: Vec<&str> = members.iter().map(|m| m.display_name.as_str()).collect();
        assert_eq!(names, ["Peco", "Kokkoro"]);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let router = TenantRouter::new(Arc::new(InMemoryStoreOpener::new()));
        let tenant_id = TenantId::parse("guild-1").unwrap();

        let result = handle_join_roster(&join(&tenant_id, "1001", "  ", None), &router).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_leave_removes_member_and_repeat_fails() {
        // Arrange
        let router = TenantRouter::new(Arc::new(InMemoryStoreOpener::new()));
        let tenant_id = TenantId::parse("guild-1").unwrap();
        handle_join_roster(&join(&tenant_id, "1001", "Pecorine", None), &router)
            .await
            .unwrap();
        let leave = LeaveRoster {
            correlation_id: Uuid::new_v4(),
            tenant_id: tenant_id.clone(),
            member_id: MemberId::new("1001"),
        };

        // Act
        let first = handle_leave_roster(&leave, &router).await;
        let second = handle_leave_roster(&leave, &router).await;

        // Assert
        assert!(first.is_ok());
        assert!(matches!(second, Err(DomainError::NotAMember(_))));
        assert!(list_members(&tenant_id, &router).await.unwrap().is_empty());
    }
}
