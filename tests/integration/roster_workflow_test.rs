//! Team roster workflow tests
//!
//! Drives the roster engine end to end over the in-memory store: team
//! founding, joining, solo team replacement, captaincy, disbanding,
//! moderation, guard rejections and rollback on store failures.

mod common;

use chrono::{Duration, Utc};
use ctfboard_teams::{
    CacheInvalidation, CompetitionMode, CompetitionPolicy, ConfirmationReason, RosterError,
    TeamAuditAction,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use crate::common::TestRoster;

mod test_create_and_join {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_create_then_join_puts_both_users_on_team() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;
        let bob = roster.user("bob").await;

        let team = assert_ok!(roster.engine.create("Alpha", alice.id, false, false).await);
        assert_eq!(team.name, "Alpha");
        assert_eq!(team.captain_id, alice.id);

        let joined = assert_ok!(
            roster
                .engine
                .join(&team.invite_token.to_string(), bob.id, false)
                .await
        );
        assert_eq!(joined.id, team.id);

        assert_eq!(roster.reload(&alice).await.team_id, Some(team.id));
        assert_eq!(roster.reload(&bob).await.team_id, Some(team.id));
        assert_eq!(roster.store.members(team.id).await.len(), 2);

        let actions: Vec<TeamAuditAction> = roster
            .store
            .audit_for(team.id)
            .await
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![TeamAuditAction::Created, TeamAuditAction::Joined]);

        assert_eq!(
            roster.cache.recorded(),
            vec![CacheInvalidation::All, CacheInvalidation::Team(team.id)]
        );
        roster.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;
        let bob = roster.user("bob").await;

        assert_ok!(roster.engine.create("Alpha", alice.id, false, false).await);
        let err = assert_err!(roster.engine.create("  Alpha ", bob.id, false, false).await);
        assert!(matches!(err, RosterError::TeamAlreadyExists));
        assert_eq!(roster.reload(&bob).await.team_id, None);
    }

    #[tokio::test]
    async fn test_invalid_name_touches_nothing() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;

        let err = assert_err!(roster.engine.create("   ", alice.id, false, false).await);
        assert!(matches!(err, RosterError::InvalidTeamName(_)));

        let err = assert_err!(
            roster
                .engine
                .create(&"x".repeat(65), alice.id, false, false)
                .await
        );
        assert!(matches!(err, RosterError::InvalidTeamName(_)));

        assert!(roster.store.all_teams().await.is_empty());
        assert!(roster.cache.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_cannot_create() {
        let roster = TestRoster::new();
        let err = assert_err!(
            roster
                .engine
                .create("Alpha", Uuid::new_v4(), false, false)
                .await
        );
        assert!(matches!(err, RosterError::UserNotFound));
    }

    #[tokio::test]
    async fn test_join_with_bad_or_stale_token() {
        let roster = TestRoster::new();
        let (team, captain, _) = roster.team_with_members("Alpha", 0).await;
        let bob = roster.user("bob").await;

        let err = assert_err!(roster.engine.join("not-a-token", bob.id, false).await);
        assert!(matches!(err, RosterError::TeamNotFound));

        let err = assert_err!(
            roster
                .engine
                .join(&Uuid::new_v4().to_string(), bob.id, false)
                .await
        );
        assert!(matches!(err, RosterError::TeamNotFound));

        let rotated = assert_ok!(roster.engine.regenerate_invite_token(captain.id).await);
        assert_ne!(rotated.invite_token, team.invite_token);

        let err = assert_err!(
            roster
                .engine
                .join(&team.invite_token.to_string(), bob.id, false)
                .await
        );
        assert!(matches!(err, RosterError::TeamNotFound));

        assert_ok!(
            roster
                .engine
                .join(&rotated.invite_token.to_string(), bob.id, false)
                .await
        );
        assert_eq!(roster.reload(&bob).await.team_id, Some(team.id));
    }

    #[tokio::test]
    async fn test_join_own_team_rejected() {
        let roster = TestRoster::new();
        let (team, _, members) = roster.team_with_members("Alpha", 1).await;

        let err = assert_err!(
            roster
                .engine
                .join(&team.invite_token.to_string(), members[0].id, true)
                .await
        );
        assert!(matches!(err, RosterError::UserAlreadyInTeam));
    }

    #[tokio::test]
    async fn test_member_of_regular_team_cannot_join_another() {
        let roster = TestRoster::new();
        let (_, _, alpha_members) = roster.team_with_members("Alpha", 1).await;
        let (beta, _, _) = roster.team_with_members("Beta", 0).await;

        let err = assert_err!(
            roster
                .engine
                .join(&beta.invite_token.to_string(), alpha_members[0].id, true)
                .await
        );
        assert!(matches!(err, RosterError::UserAlreadyInTeam));
        assert_eq!(roster.store.members(beta.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_team_capacity() {
        let roster = TestRoster::new();
        // Captain plus eight members: nine seats taken
        let (team, _, _) = roster.team_with_members("Alpha", 8).await;
        let token = team.invite_token.to_string();
        assert_eq!(roster.store.members(team.id).await.len(), 9);

        let tenth = roster.user("tenth").await;
        assert_ok!(roster.engine.join(&token, tenth.id, false).await);
        assert_eq!(roster.store.members(team.id).await.len(), 10);

        let eleventh = roster.user("eleventh").await;
        let err = assert_err!(roster.engine.join(&token, eleventh.id, false).await);
        assert!(matches!(err, RosterError::TeamFull { max: 10 }));
        assert_eq!(roster.reload(&eleventh).await.team_id, None);
        assert_eq!(roster.store.members(team.id).await.len(), 10);
    }

    #[tokio::test]
    async fn test_member_rejoining_full_team() {
        let roster = TestRoster::with_max_team_size(2);
        let (team, captain, members) = roster.team_with_members("Duo", 1).await;

        for user in [&captain, &members[0]] {
            let err = assert_err!(
                roster
                    .engine
                    .join(&team.invite_token.to_string(), user.id, false)
                    .await
            );
            assert!(matches!(err, RosterError::UserAlreadyInTeam));
        }
    }

    #[tokio::test]
    async fn test_configured_capacity() {
        let roster = TestRoster::with_max_team_size(2);
        let (team, _, _) = roster.team_with_members("Duo", 1).await;
        let carol = roster.user("carol").await;

        let err = assert_err!(
            roster
                .engine
                .join(&team.invite_token.to_string(), carol.id, false)
                .await
        );
        assert!(matches!(err, RosterError::TeamFull { max: 2 }));
    }
}

mod test_solo_reset {
    use super::*;

    #[tokio::test]
    async fn test_try_create_previews_without_writing() {
        let roster = TestRoster::new();
        let (alice, solo) = roster.solo_player("alice", &[100, 250]).await;
        let audit_before = roster.store.audit_log().await.len();
        roster.cache.reset();

        let outcome = assert_ok!(roster.engine.try_create("Alpha", alice.id, false).await);
        assert!(outcome.requires_confirm);
        assert!(outcome.team.is_none());
        assert_eq!(
            outcome.confirmation_reason,
            Some(ConfirmationReason::SoloTeamReset)
        );
        let affected = outcome.affected_data.expect("preview expected");
        assert_eq!(affected.solve_count, 2);
        assert_eq!(affected.points, 350);

        assert_eq!(roster.reload(&alice).await.team_id, Some(solo.id));
        assert_eq!(roster.store.score(solo.id).await.solve_count, 2);
        assert!(roster.store.active_team_by_name("Alpha").await.is_none());
        assert_eq!(roster.store.audit_log().await.len(), audit_before);
        assert!(roster.cache.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_create_discards_solo_team() {
        let roster = TestRoster::new();
        let (alice, solo) = roster.solo_player("alice", &[100, 250]).await;
        roster.cache.reset();

        let team = assert_ok!(roster.engine.confirm_create("Alpha", alice.id, false).await);
        assert_eq!(roster.reload(&alice).await.team_id, Some(team.id));

        let old = roster.store.team(solo.id).await.unwrap();
        assert!(!old.is_active());
        assert_eq!(roster.store.score(solo.id).await.solve_count, 0);

        let cleanup = roster.store.audit_for(solo.id).await;
        let deleted = cleanup
            .iter()
            .find(|e| e.action == TeamAuditAction::Deleted)
            .expect("cleanup audit entry");
        assert_eq!(deleted.detail("reason"), Some("solo_team_cleanup"));
        assert_eq!(deleted.user_id, alice.id);

        assert_eq!(roster.cache.recorded(), vec![CacheInvalidation::All]);
        roster.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_create_without_consent_requires_confirmation() {
        let roster = TestRoster::new();
        let (alice, solo) = roster.solo_player("alice", &[50]).await;

        let err = assert_err!(roster.engine.create("Alpha", alice.id, false, false).await);
        assert!(err.is_confirmation_required());
        assert_eq!(roster.reload(&alice).await.team_id, Some(solo.id));
    }

    #[tokio::test]
    async fn test_try_create_without_team_creates() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;

        let outcome = assert_ok!(roster.engine.try_create("Alpha", alice.id, false).await);
        assert!(!outcome.requires_confirm);
        let team = outcome.team.expect("team expected");
        assert_eq!(roster.reload(&alice).await.team_id, Some(team.id));
    }

    #[tokio::test]
    async fn test_try_create_on_regular_team_rejected() {
        let roster = TestRoster::new();
        let (_, captain, _) = roster.team_with_members("Alpha", 0).await;

        let err = assert_err!(roster.engine.try_create("Beta", captain.id, false).await);
        assert!(matches!(err, RosterError::UserAlreadyInTeam));
    }

    #[tokio::test]
    async fn test_join_from_solo_team() {
        let roster = TestRoster::new();
        let (team, _, _) = roster.team_with_members("Alpha", 0).await;
        let (bob, solo) = roster.solo_player("bob", &[300]).await;
        let token = team.invite_token.to_string();
        roster.cache.reset();

        let err = assert_err!(roster.engine.join(&token, bob.id, false).await);
        assert!(matches!(err, RosterError::ConfirmationRequired));
        assert_eq!(roster.reload(&bob).await.team_id, Some(solo.id));

        assert_ok!(roster.engine.join(&token, bob.id, true).await);
        assert_eq!(roster.reload(&bob).await.team_id, Some(team.id));
        assert!(!roster.store.team(solo.id).await.unwrap().is_active());
        assert_eq!(roster.store.score(solo.id).await.points, 0);
        assert_eq!(roster.cache.recorded(), vec![CacheInvalidation::All]);
        roster.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_solo_team_name_fallbacks() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;

        let first = roster.user("first").await;
        assert_ok!(roster.engine.create("alice", first.id, false, false).await);
        let solo = assert_ok!(roster.engine.create_solo_team(alice.id, false).await);
        assert_eq!(solo.name, "alice (Solo)");
        assert!(solo.is_solo);

        let created = roster
            .store
            .audit_for(solo.id)
            .await
            .into_iter()
            .find(|e| e.action == TeamAuditAction::Created)
            .expect("created entry");
        assert_eq!(created.detail("mode"), Some("solo"));

        let bob = roster.user("bob").await;
        let second = roster.user("second").await;
        assert_ok!(roster.engine.create("bob", second.id, false, false).await);
        let third = roster.user("third").await;
        assert_ok!(roster.engine.create("bob (Solo)", third.id, false, false).await);

        let solo = assert_ok!(roster.engine.create_solo_team(bob.id, false).await);
        let short_id: String = bob.id.simple().to_string().chars().take(8).collect();
        assert_eq!(solo.name, format!("bob (Solo {})", short_id));
    }

    #[tokio::test]
    async fn test_solo_team_all_names_taken() {
        let roster = TestRoster::new();
        let carol = roster.user("carol").await;
        let short_id: String = carol.id.simple().to_string().chars().take(8).collect();

        for (i, name) in [
            "carol".to_string(),
            "carol (Solo)".to_string(),
            format!("carol (Solo {})", short_id),
        ]
        .iter()
        .enumerate()
        {
            let owner = roster.user(&format!("owner-{}", i)).await;
            assert_ok!(roster.engine.create(name, owner.id, false, false).await);
        }

        let err = assert_err!(roster.engine.create_solo_team(carol.id, false).await);
        assert!(matches!(err, RosterError::TeamAlreadyExists));
        assert_eq!(roster.reload(&carol).await.team_id, None);
    }

    #[tokio::test]
    async fn test_solo_team_names_fit_length_limit() {
        let roster = TestRoster::new();

        let taken = "l".repeat(60);
        let owner = roster.user("owner").await;
        assert_ok!(roster.engine.create(&taken, owner.id, false, false).await);
        let collider = roster.user(&taken).await;
        let solo = assert_ok!(roster.engine.create_solo_team(collider.id, false).await);
        assert_eq!(solo.name, format!("{} (Solo)", "l".repeat(57)));

        let oversized = roster.user(&"m".repeat(70)).await;
        let solo = assert_ok!(roster.engine.create_solo_team(oversized.id, false).await);
        assert_eq!(solo.name, "m".repeat(64));
        assert_eq!(roster.reload(&oversized).await.team_id, Some(solo.id));
    }

    #[tokio::test]
    async fn test_join_replaces_auto_created_team() {
        let roster = TestRoster::new();
        let (team, _, _) = roster.team_with_members("Alpha", 0).await;
        let (dana, placeholder) = roster.auto_created_player("dana").await;
        let token = team.invite_token.to_string();

        let err = assert_err!(roster.engine.join(&token, dana.id, false).await);
        assert!(err.is_confirmation_required());
        assert_eq!(roster.reload(&dana).await.team_id, Some(placeholder.id));

        assert_ok!(roster.engine.join(&token, dana.id, true).await);
        assert_eq!(roster.reload(&dana).await.team_id, Some(team.id));
        assert!(!roster.store.team(placeholder.id).await.unwrap().is_active());

        let joined = roster
            .store
            .audit_for(team.id)
            .await
            .into_iter()
            .find(|e| e.action == TeamAuditAction::Joined && e.user_id == dana.id)
            .expect("join entry");
        assert_eq!(
            joined.detail("replaced_team_id"),
            Some(placeholder.id.to_string().as_str())
        );
        roster.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_confirm_create_replaces_auto_created_team() {
        let roster = TestRoster::new();
        let (erin, placeholder) = roster.auto_created_player("erin").await;

        let outcome = assert_ok!(roster.engine.try_create("Alpha", erin.id, false).await);
        assert!(outcome.requires_confirm);

        let team = assert_ok!(roster.engine.confirm_create("Alpha", erin.id, false).await);
        assert_eq!(roster.reload(&erin).await.team_id, Some(team.id));
        assert!(!roster.store.team(placeholder.id).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_solo_team_replaces_itself_after_confirmation() {
        let roster = TestRoster::new();
        let (alice, first) = roster.solo_player("alice", &[10]).await;

        let err = assert_err!(roster.engine.create_solo_team(alice.id, false).await);
        assert!(err.is_confirmation_required());

        let second = assert_ok!(roster.engine.create_solo_team(alice.id, true).await);
        assert_ne!(second.id, first.id);
        // The discarded team frees the plain username
        assert_eq!(second.name, "alice");
        assert_eq!(roster.reload(&alice).await.team_id, Some(second.id));
    }
}

mod test_leave_and_captaincy {
    use super::*;

    #[tokio::test]
    async fn test_leave_twice() {
        let roster = TestRoster::new();
        let (team, _, members) = roster.team_with_members("Alpha", 1).await;
        let bob = &members[0];
        roster.cache.reset();

        assert_ok!(roster.engine.leave(bob.id).await);
        assert_eq!(roster.reload(bob).await.team_id, None);
        assert_eq!(
            roster.cache.recorded(),
            vec![CacheInvalidation::Team(team.id)]
        );

        let audit_len = roster.store.audit_log().await.len();
        let err = assert_err!(roster.engine.leave(bob.id).await);
        assert!(matches!(err, RosterError::TeamNotFound));
        assert_eq!(roster.store.audit_log().await.len(), audit_len);
    }

    #[tokio::test]
    async fn test_only_member_cannot_leave() {
        let roster = TestRoster::new();
        let (team, captain, _) = roster.team_with_members("Alpha", 0).await;

        let err = assert_err!(roster.engine.leave(captain.id).await);
        assert!(matches!(err, RosterError::CannotLeaveAsOnlyMember));
        assert_eq!(roster.reload(&captain).await.team_id, Some(team.id));
    }

    #[tokio::test]
    async fn test_captain_hands_over_then_leaves() {
        let roster = TestRoster::new();
        let (team, alice, members) = roster.team_with_members("Alpha", 1).await;
        let bob = &members[0];

        let err = assert_err!(roster.engine.leave(alice.id).await);
        assert!(matches!(err, RosterError::NotCaptain));

        assert_ok!(roster.engine.transfer_captain(alice.id, bob.id).await);
        assert_ok!(roster.engine.leave(alice.id).await);

        let current = assert_ok!(roster.engine.get_team(team.id).await);
        assert_eq!(current.captain_id, bob.id);
        let remaining = roster.store.members(team.id).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, bob.id);

        let transfer = roster
            .store
            .audit_for(team.id)
            .await
            .into_iter()
            .find(|e| e.action == TeamAuditAction::CaptainTransferred)
            .expect("transfer entry");
        assert_eq!(transfer.detail("from"), Some(alice.id.to_string().as_str()));
        assert_eq!(transfer.detail("to"), Some(bob.id.to_string().as_str()));
        roster.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_transfer_rejections() {
        let roster = TestRoster::new();
        let (_, alice, members) = roster.team_with_members("Alpha", 1).await;
        let bob = &members[0];
        let outsider = roster.user("outsider").await;

        let err = assert_err!(roster.engine.transfer_captain(alice.id, alice.id).await);
        assert!(matches!(err, RosterError::CannotTransferToSelf));

        let err = assert_err!(roster.engine.transfer_captain(alice.id, outsider.id).await);
        assert!(matches!(err, RosterError::NewCaptainNotInTeam));

        let err = assert_err!(
            roster
                .engine
                .transfer_captain(alice.id, Uuid::new_v4())
                .await
        );
        assert!(matches!(err, RosterError::NewCaptainNotInTeam));

        let err = assert_err!(roster.engine.transfer_captain(bob.id, alice.id).await);
        assert!(matches!(err, RosterError::NotCaptain));

        let err = assert_err!(roster.engine.transfer_captain(outsider.id, bob.id).await);
        assert!(matches!(err, RosterError::TeamNotFound));
    }

    #[tokio::test]
    async fn test_kick_member() {
        let roster = TestRoster::new();
        let (team, alice, members) = roster.team_with_members("Alpha", 2).await;
        let (bob, carol) = (&members[0], &members[1]);
        roster.cache.reset();

        let err = assert_err!(roster.engine.kick_member(alice.id, alice.id).await);
        assert!(matches!(err, RosterError::CannotKickSelf));

        let err = assert_err!(roster.engine.kick_member(bob.id, carol.id).await);
        assert!(matches!(err, RosterError::NotCaptain));

        assert_ok!(roster.engine.kick_member(alice.id, bob.id).await);
        assert_eq!(roster.reload(bob).await.team_id, None);
        assert_eq!(roster.reload(carol).await.team_id, Some(team.id));

        let kicked = roster
            .store
            .audit_for(team.id)
            .await
            .into_iter()
            .find(|e| e.action == TeamAuditAction::MemberKicked)
            .expect("kick entry");
        assert_eq!(kicked.user_id, alice.id);
        assert_eq!(
            kicked.detail("target_user_id"),
            Some(bob.id.to_string().as_str())
        );

        // Already gone, and strangers were never members
        let err = assert_err!(roster.engine.kick_member(alice.id, bob.id).await);
        assert!(matches!(err, RosterError::UserNotFound));
        let err = assert_err!(roster.engine.kick_member(alice.id, Uuid::new_v4()).await);
        assert!(matches!(err, RosterError::UserNotFound));

        assert_eq!(
            roster.cache.recorded(),
            vec![CacheInvalidation::Team(team.id)]
        );
    }

    #[tokio::test]
    async fn test_disband_releases_everyone() {
        let roster = TestRoster::new();
        let (team, alice, members) = roster.team_with_members("Alpha", 2).await;
        roster.cache.reset();

        let err = assert_err!(roster.engine.disband_team(members[0].id).await);
        assert!(matches!(err, RosterError::NotCaptain));

        assert_ok!(roster.engine.disband_team(alice.id).await);

        assert_eq!(roster.reload(&alice).await.team_id, None);
        for member in &members {
            assert_eq!(roster.reload(member).await.team_id, None);
        }

        let err = assert_err!(roster.engine.get_team(team.id).await);
        assert!(matches!(err, RosterError::TeamNotFound));
        let err = assert_err!(
            roster
                .engine
                .join(&team.invite_token.to_string(), members[0].id, false)
                .await
        );
        assert!(matches!(err, RosterError::TeamNotFound));

        let history = assert_ok!(roster.engine.audit_history(team.id).await);
        let deleted = history.last().expect("history not empty");
        assert_eq!(deleted.action, TeamAuditAction::Deleted);
        assert_eq!(deleted.detail("reason"), Some("disbanded_by_captain"));

        assert_eq!(roster.cache.recorded(), vec![CacheInvalidation::All]);

        // The name is free again
        assert_ok!(roster.engine.create("Alpha", alice.id, false, false).await);
        roster.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_regenerate_invite_token_is_captain_only_and_silent() {
        let roster = TestRoster::new();
        let (team, alice, members) = roster.team_with_members("Alpha", 1).await;
        let audit_len = roster.store.audit_log().await.len();
        roster.cache.reset();

        let err = assert_err!(roster.engine.regenerate_invite_token(members[0].id).await);
        assert!(matches!(err, RosterError::NotCaptain));

        let loner = roster.user("loner").await;
        let err = assert_err!(roster.engine.regenerate_invite_token(loner.id).await);
        assert!(matches!(err, RosterError::TeamNotFound));

        let rotated = assert_ok!(roster.engine.regenerate_invite_token(alice.id).await);
        assert_ne!(rotated.invite_token, team.invite_token);
        assert_eq!(
            roster.store.team(team.id).await.unwrap().invite_token,
            rotated.invite_token
        );
        assert_eq!(roster.store.audit_log().await.len(), audit_len);
        assert!(roster.cache.recorded().is_empty());
    }
}

mod test_guard {
    use super::*;

    #[tokio::test]
    async fn test_frozen_roster_rejects_every_mutation_without_side_effects() {
        let roster = TestRoster::new();
        let (team, alice, members) = roster.team_with_members("Alpha", 1).await;
        let bob = &members[0];
        let carol = roster.user("carol").await;
        let audit_len = roster.store.audit_log().await.len();

        roster.set_policy(CompetitionPolicy {
            allow_team_switch: false,
            ..CompetitionPolicy::default()
        });
        roster.cache.reset();
        let token = team.invite_token.to_string();

        let results = vec![
            roster
                .engine
                .create("Beta", carol.id, false, false)
                .await
                .map(|_| ()),
            roster
                .engine
                .try_create("Beta", carol.id, false)
                .await
                .map(|_| ()),
            roster
                .engine
                .confirm_create("Beta", carol.id, false)
                .await
                .map(|_| ()),
            roster.engine.join(&token, carol.id, false).await.map(|_| ()),
            roster.engine.leave(bob.id).await,
            roster.engine.transfer_captain(alice.id, bob.id).await,
            roster.engine.kick_member(alice.id, bob.id).await,
            roster.engine.disband_team(alice.id).await,
            roster
                .engine
                .create_solo_team(carol.id, false)
                .await
                .map(|_| ()),
        ];
        for result in results {
            assert!(matches!(result, Err(RosterError::RosterFrozen)));
        }

        assert_eq!(roster.reload(&carol).await.team_id, None);
        assert_eq!(roster.reload(bob).await.team_id, Some(team.id));
        assert_eq!(roster.store.audit_log().await.len(), audit_len);
        assert!(roster.cache.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_moderation_and_token_rotation_ignore_freeze() {
        let roster = TestRoster::new();
        let (team, alice, _) = roster.team_with_members("Alpha", 0).await;
        roster.set_policy(CompetitionPolicy {
            allow_team_switch: false,
            ..CompetitionPolicy::default()
        });

        assert_ok!(roster.engine.regenerate_invite_token(alice.id).await);
        assert_ok!(roster.engine.set_hidden(team.id, true).await);
    }

    #[tokio::test]
    async fn test_self_checks_precede_guard() {
        let roster = TestRoster::new();
        let (_, alice, _) = roster.team_with_members("Alpha", 0).await;
        roster.set_policy(CompetitionPolicy {
            allow_team_switch: false,
            ..CompetitionPolicy::default()
        });

        let err = assert_err!(roster.engine.transfer_captain(alice.id, alice.id).await);
        assert!(matches!(err, RosterError::CannotTransferToSelf));
        let err = assert_err!(roster.engine.kick_member(alice.id, alice.id).await);
        assert!(matches!(err, RosterError::CannotKickSelf));
    }

    #[tokio::test]
    async fn test_ended_competition_freezes_roster() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;
        roster.set_policy(CompetitionPolicy {
            starts_at: Some(Utc::now() - Duration::days(2)),
            ends_at: Some(Utc::now() - Duration::days(1)),
            ..CompetitionPolicy::default()
        });

        let err = assert_err!(roster.engine.create("Alpha", alice.id, false, false).await);
        assert!(matches!(err, RosterError::RosterFrozen));
    }

    #[tokio::test]
    async fn test_upcoming_competition_allows_roster_changes() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;
        roster.set_policy(CompetitionPolicy {
            starts_at: Some(Utc::now() + Duration::days(1)),
            ends_at: Some(Utc::now() + Duration::days(2)),
            ..CompetitionPolicy::default()
        });

        assert_ok!(roster.engine.create("Alpha", alice.id, false, false).await);
    }

    #[tokio::test]
    async fn test_competition_mode_restrictions() {
        let roster = TestRoster::new();
        let (team, _, members) = roster.team_with_members("Alpha", 1).await;
        let carol = roster.user("carol").await;

        roster.set_policy(CompetitionPolicy {
            mode: CompetitionMode::SoloOnly,
            ..CompetitionPolicy::default()
        });
        let err = assert_err!(roster.engine.create("Beta", carol.id, false, false).await);
        assert!(matches!(
            err,
            RosterError::ModeNotAllowed {
                mode: CompetitionMode::SoloOnly
            }
        ));
        // Joining and leaving existing teams are plain roster changes
        let erin = roster.user("erin").await;
        assert_ok!(
            roster
                .engine
                .join(&team.invite_token.to_string(), erin.id, false)
                .await
        );
        assert_eq!(roster.reload(&erin).await.team_id, Some(team.id));
        assert_ok!(roster.engine.leave(members[0].id).await);
        assert_ok!(roster.engine.create_solo_team(carol.id, false).await);

        roster.set_policy(CompetitionPolicy {
            mode: CompetitionMode::TeamsOnly,
            ..CompetitionPolicy::default()
        });
        let dave = roster.user("dave").await;
        let err = assert_err!(roster.engine.create_solo_team(dave.id, false).await);
        assert!(matches!(
            err,
            RosterError::ModeNotAllowed {
                mode: CompetitionMode::TeamsOnly
            }
        ));
    }
}

mod test_failures {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_audit_failure_rolls_back_join() {
        let roster = TestRoster::new();
        let (team, _, _) = roster.team_with_members("Alpha", 0).await;
        let bob = roster.user("bob").await;
        let audit_len = roster.store.audit_log().await.len();
        roster.cache.reset();

        roster.store.fail_audit_writes(true);
        let err = assert_err!(
            roster
                .engine
                .join(&team.invite_token.to_string(), bob.id, false)
                .await
        );
        assert_eq!(err.failed_step(), Some("record audit entry"));

        assert_eq!(roster.reload(&bob).await.team_id, None);
        assert_eq!(roster.store.members(team.id).await.len(), 1);
        assert_eq!(roster.store.audit_log().await.len(), audit_len);
        assert!(roster.cache.recorded().is_empty());

        roster.store.fail_audit_writes(false);
        assert_ok!(
            roster
                .engine
                .join(&team.invite_token.to_string(), bob.id, false)
                .await
        );
    }

    #[tokio::test]
    async fn test_purge_failure_keeps_solo_team() {
        let roster = TestRoster::new();
        let (alice, solo) = roster.solo_player("alice", &[100]).await;

        roster.store.fail_solve_purge(true);
        let err = assert_err!(roster.engine.confirm_create("Alpha", alice.id, false).await);
        assert_eq!(err.failed_step(), Some("delete solo team solves"));

        assert!(roster.store.team(solo.id).await.unwrap().is_active());
        assert_eq!(roster.store.score(solo.id).await.points, 100);
        assert_eq!(roster.reload(&alice).await.team_id, Some(solo.id));
        assert!(roster.store.active_team_by_name("Alpha").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_failure_never_fails_operation() {
        let roster = TestRoster::new();
        let alice = roster.user("alice").await;
        roster.cache.set_failing(true);

        let team = assert_ok!(roster.engine.create("Alpha", alice.id, false, false).await);
        assert_eq!(roster.reload(&alice).await.team_id, Some(team.id));
        assert_eq!(roster.cache.recorded(), vec![CacheInvalidation::All]);
    }
}

mod test_moderation {
    use super::*;

    #[tokio::test]
    async fn test_ban_and_unban() {
        let roster = TestRoster::new();
        let (team, _, _) = roster.team_with_members("Alpha", 0).await;
        let audit_len = roster.store.audit_log().await.len();
        roster.cache.reset();

        let banned = assert_ok!(roster.engine.ban_team(team.id, "flag sharing").await);
        assert!(banned.is_banned);
        assert_eq!(banned.banned_reason.as_deref(), Some("flag sharing"));

        let unbanned = assert_ok!(roster.engine.unban_team(team.id).await);
        assert!(!unbanned.is_banned);
        assert!(unbanned.banned_at.is_none());

        assert_eq!(
            roster.cache.recorded(),
            vec![CacheInvalidation::All, CacheInvalidation::All]
        );
        assert_eq!(roster.store.audit_log().await.len(), audit_len);
    }

    #[tokio::test]
    async fn test_visibility_and_bracket() {
        let roster = TestRoster::new();
        let (team, _, _) = roster.team_with_members("Alpha", 0).await;
        let bracket = Uuid::new_v4();

        let hidden = assert_ok!(roster.engine.set_hidden(team.id, true).await);
        assert!(hidden.is_hidden);

        let placed = assert_ok!(roster.engine.set_bracket(team.id, Some(bracket)).await);
        assert_eq!(placed.bracket_id, Some(bracket));

        let cleared = assert_ok!(roster.engine.set_bracket(team.id, None).await);
        assert_eq!(cleared.bracket_id, None);
    }

    #[tokio::test]
    async fn test_unknown_team() {
        let roster = TestRoster::new();
        let missing = Uuid::new_v4();

        assert!(matches!(
            roster.engine.ban_team(missing, "spam").await,
            Err(RosterError::TeamNotFound)
        ));
        assert!(matches!(
            roster.engine.unban_team(missing).await,
            Err(RosterError::TeamNotFound)
        ));
        assert!(matches!(
            roster.engine.set_hidden(missing, true).await,
            Err(RosterError::TeamNotFound)
        ));
        assert!(matches!(
            roster.engine.set_bracket(missing, None).await,
            Err(RosterError::TeamNotFound)
        ));
        assert!(roster.cache.recorded().is_empty());
    }
}

mod test_reads {
    use super::*;

    #[tokio::test]
    async fn test_my_team_and_members() {
        let roster = TestRoster::new();
        let (team, alice, members) = roster.team_with_members("Alpha", 2).await;

        let (mine, roster_members) = assert_ok!(roster.engine.my_team(members[1].id).await);
        assert_eq!(mine.id, team.id);
        assert_eq!(roster_members.len(), 3);
        assert!(roster_members.iter().any(|m| m.id == alice.id));

        let listed = assert_ok!(roster.engine.team_members(team.id).await);
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn test_my_team_errors() {
        let roster = TestRoster::new();
        let loner = roster.user("loner").await;

        assert!(matches!(
            roster.engine.my_team(loner.id).await,
            Err(RosterError::TeamNotFound)
        ));
        assert!(matches!(
            roster.engine.my_team(Uuid::new_v4()).await,
            Err(RosterError::UserNotFound)
        ));
        assert!(matches!(
            roster.engine.team_members(Uuid::new_v4()).await,
            Err(RosterError::TeamNotFound)
        ));
    }
}
