use super::*;

use shared::models::{RefreshReason, UserProfileGroup};

use crate::center::service::CenterEvent;

fn refresh_done(
    service: &SafetyCenterService,
    source_id: &str,
    package: &str,
    cycle_id: &str,
) {
    service
        .set_source_data(
            source_id,
            0,
            package,
            Some(report(Some(ok_status(source_id)), vec![])),
            SourceEvent::RefreshResponse {
                cycle_id: cycle_id.to_string(),
            },
        )
        .expect("refresh reply failed");
}

fn issue_only_done(
    service: &SafetyCenterService,
    source_id: &str,
    package: &str,
    cycle_id: &str,
) {
    service
        .set_source_data(
            source_id,
            0,
            package,
            Some(report(None, vec![])),
            SourceEvent::RefreshResponse {
                cycle_id: cycle_id.to_string(),
            },
        )
        .expect("refresh reply failed");
}

#[test]
fn test_rescan_targets_all_refreshable_sources() {
    let service = create_service();
    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));

    let ids: Vec<&str> = request
        .targets
        .iter()
        .map(|t| t.key.source_id.as_str())
        .collect();
    // Every dynamic and issue-only source, untracked included; the static
    // source is never messaged.
    assert_eq!(ids, vec!["lockscreen", "biometrics", "accounts", "backup", "updates"]);
    assert!(service.refresh_in_progress());
}

#[test]
fn test_page_open_targets_only_opted_in_sources() {
    let service = create_service();
    let request = service.start_refresh(RefreshReason::PageOpen, &UserProfileGroup::single(0));

    let ids: Vec<&str> = request
        .targets
        .iter()
        .map(|t| t.key.source_id.as_str())
        .collect();
    assert_eq!(ids, vec!["lockscreen", "accounts"]);
}

#[test]
fn test_cycle_completes_when_all_tracked_sources_report() {
    let service = create_service();
    let mut events = service.subscribe();
    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));
    let cycle_id = request.cycle_id.as_str();
    assert_eq!(
        events.try_recv().unwrap(),
        CenterEvent::RefreshStarted {
            cycle_id: cycle_id.to_string()
        }
    );

    refresh_done(&service, "lockscreen", SETTINGS_PKG, cycle_id);
    assert!(service.refresh_in_progress());
    refresh_done(&service, "biometrics", SETTINGS_PKG, cycle_id);
    assert!(service.refresh_in_progress());
    refresh_done(&service, "accounts", ACCOUNTS_PKG, cycle_id);
    assert!(service.refresh_in_progress());

    // backup is issue-only; its reply is the last tracked one. updates is
    // untracked and must not be needed.
    service
        .set_source_data(
            "backup",
            0,
            BACKUP_PKG,
            Some(report(None, vec![])),
            SourceEvent::RefreshResponse {
                cycle_id: cycle_id.to_string(),
            },
        )
        .unwrap();
    assert!(!service.refresh_in_progress());

    let seen: Vec<CenterEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(seen.contains(&CenterEvent::RefreshCompleted {
        cycle_id: cycle_id.to_string()
    }));
}

#[test]
fn test_untracked_source_reply_never_completes_cycle() {
    let service = create_service();
    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));

    refresh_done(&service, "updates", UPDATES_PKG, &request.cycle_id);
    assert!(service.refresh_in_progress());
}

#[test]
fn test_source_error_frees_in_flight_slot() {
    let service = create_service();
    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));
    let cycle_id = request.cycle_id.as_str();

    refresh_done(&service, "lockscreen", SETTINGS_PKG, cycle_id);
    refresh_done(&service, "biometrics", SETTINGS_PKG, cycle_id);
    refresh_done(&service, "accounts", ACCOUNTS_PKG, cycle_id);

    // The failing source completes the cycle exactly as a success would.
    service
        .report_source_error(
            "backup",
            0,
            BACKUP_PKG,
            SourceEvent::RefreshResponse {
                cycle_id: cycle_id.to_string(),
            },
        )
        .unwrap();
    assert!(!service.refresh_in_progress());
}

#[test]
fn test_source_error_keeps_cached_data() {
    let service = create_service();
    let group = UserProfileGroup::single(0);
    set(
        &service,
        "lockscreen",
        SETTINGS_PKG,
        report(Some(ok_status("Screen lock")), vec![]),
    );

    service
        .report_source_error(
            "lockscreen",
            0,
            SETTINGS_PKG,
            SourceEvent::SourceStateChanged,
        )
        .unwrap();

    let view = service.aggregate(SETTINGS_PKG, &group);
    assert_eq!(view.status.severity, Severity::Ok);
}

// Scenario C: superseding cycles, stale replies ignored.
#[test]
fn test_superseded_cycle_replies_are_inert() {
    let service = create_service();
    let group = UserProfileGroup::single(0);

    let c1 = service.start_refresh(RefreshReason::RescanButtonClick, &group);
    refresh_done(&service, "lockscreen", SETTINGS_PKG, &c1.cycle_id);
    assert!(service.refresh_in_progress());

    // C2 supersedes C1; C1's tracking is discarded, not cancelled.
    let c2 = service.start_refresh(RefreshReason::RescanButtonClick, &group);
    assert_ne!(c1.cycle_id, c2.cycle_id);
    assert_eq!(service.current_cycle_id().as_deref(), Some(c2.cycle_id.as_str()));

    // Late replies referencing C1 do not touch C2's in-flight set.
    refresh_done(&service, "biometrics", SETTINGS_PKG, &c1.cycle_id);
    refresh_done(&service, "accounts", ACCOUNTS_PKG, &c1.cycle_id);
    issue_only_done(&service, "backup", BACKUP_PKG, &c1.cycle_id);
    assert!(service.refresh_in_progress());

    // ...but their data-store writes still applied.
    let view = service.aggregate(SETTINGS_PKG, &group);
    assert!(view.entries.iter().any(|e| e.severity() == Severity::Ok));

    // C2 completes only through its own replies.
    refresh_done(&service, "lockscreen", SETTINGS_PKG, &c2.cycle_id);
    refresh_done(&service, "biometrics", SETTINGS_PKG, &c2.cycle_id);
    refresh_done(&service, "accounts", ACCOUNTS_PKG, &c2.cycle_id);
    issue_only_done(&service, "backup", BACKUP_PKG, &c2.cycle_id);
    assert!(!service.refresh_in_progress());
}

#[test]
fn test_reply_with_no_cycle_tracked_is_ignored() {
    let service = create_service();
    refresh_done(&service, "lockscreen", SETTINGS_PKG, "bogus-1");
    assert!(!service.refresh_in_progress());
}

#[test]
fn test_duplicate_reply_is_harmless() {
    let service = create_service();
    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));

    refresh_done(&service, "lockscreen", SETTINGS_PKG, &request.cycle_id);
    // Same source reports again with fresh data for the same cycle.
    service
        .set_source_data(
            "lockscreen",
            0,
            SETTINGS_PKG,
            Some(report(Some(ok_status("Screen lock v2")), vec![])),
            SourceEvent::RefreshResponse {
                cycle_id: request.cycle_id.clone(),
            },
        )
        .unwrap();
    assert!(service.refresh_in_progress());
}

#[test]
fn test_cancel_for_user_completes_cycle() {
    let service = create_service();
    let mut events = service.subscribe();
    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));
    assert!(service.refresh_in_progress());

    service.clear_for_user(0);
    assert!(!service.refresh_in_progress());

    let seen: Vec<CenterEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(seen.contains(&CenterEvent::RefreshCompleted {
        cycle_id: request.cycle_id.clone()
    }));
}

#[test]
fn test_profile_sources_tracked_per_user() {
    let mut users = StaticUserContext::new();
    users.add_profile(0, 10, shared::models::ProfileKind::Managed);
    let service = create_service_with(test_config(), users);
    let group = UserProfileGroup::with_profiles(0, vec![10]);

    let request = service.start_refresh(RefreshReason::PageOpen, &group);
    // accounts supports profiles: one target per user.
    let account_users: Vec<_> = request
        .targets
        .iter()
        .filter(|t| t.key.source_id == "accounts")
        .map(|t| t.key.user_id)
        .collect();
    assert_eq!(account_users, vec![0, 10]);
    // lockscreen does not: parent only.
    let lockscreen_users: Vec<_> = request
        .targets
        .iter()
        .filter(|t| t.key.source_id == "lockscreen")
        .map(|t| t.key.user_id)
        .collect();
    assert_eq!(lockscreen_users, vec![0]);
}

#[test]
fn test_refresh_with_no_tracked_sources_completes_immediately() {
    let mut config = test_config();
    for group in &mut config.groups {
        for source in &mut group.sources {
            source.untracked = true;
        }
    }
    let service = create_service_with(config, StaticUserContext::single_user(0));
    let mut events = service.subscribe();

    let request =
        service.start_refresh(RefreshReason::RescanButtonClick, &UserProfileGroup::single(0));
    assert!(!service.refresh_in_progress());
    // Untracked sources are still messaged.
    assert!(!request.targets.is_empty());

    let seen: Vec<CenterEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(seen.contains(&CenterEvent::RefreshCompleted {
        cycle_id: request.cycle_id.clone()
    }));
}
