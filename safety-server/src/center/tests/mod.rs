use std::sync::Arc;

use parking_lot::Mutex;

use shared::ids::{IssueKey, UserId};
use shared::models::{
    Action, ErrorDetails, GroupKind, Issue, NavigationTarget, SafetyAggregate, SafetyCenterConfig,
    Severity, SourceDecl, SourceEvent, SourceGroup, SourceKind, SourceReport, SourceStatus,
    StaticUserContext,
};

use super::listeners::{AggregateObserver, DeliveryError};
use super::service::SafetyCenterService;

mod test_refresh;

pub(crate) const SETTINGS_PKG: &str = "com.android.settings";
pub(crate) const ACCOUNTS_PKG: &str = "com.android.gms";
pub(crate) const BACKUP_PKG: &str = "com.android.backup";
pub(crate) const UPDATES_PKG: &str = "com.android.updates";

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn decl(id: &str, package: &str, kind: SourceKind) -> SourceDecl {
    SourceDecl {
        id: id.to_string(),
        package_name: package.to_string(),
        kind,
        max_severity: Severity::CriticalWarning,
        supports_managed_profiles: false,
        refresh_on_page_open: false,
        untracked: false,
        visible_externally: true,
        default_title: None,
        default_summary: None,
        default_target: None,
    }
}

/// Config used by most tests:
///
/// - `device_security` (collapsible): `lockscreen` + `biometrics`, both
///   dynamic, owned by the settings package
/// - `accounts` (collapsible): `accounts` (dynamic, profile-aware) +
///   `backup` (issue-only)
/// - `system` (collapsible): `updates` (dynamic, untracked)
/// - `more_settings` (rigid): `advanced_privacy` (static)
pub(crate) fn test_config() -> SafetyCenterConfig {
    let mut lockscreen = decl("lockscreen", SETTINGS_PKG, SourceKind::Dynamic);
    lockscreen.refresh_on_page_open = true;
    lockscreen.default_title = Some("Screen lock".to_string());

    let mut biometrics = decl("biometrics", SETTINGS_PKG, SourceKind::Dynamic);
    biometrics.max_severity = Severity::Recommendation;

    let mut accounts = decl("accounts", ACCOUNTS_PKG, SourceKind::Dynamic);
    accounts.supports_managed_profiles = true;
    accounts.refresh_on_page_open = true;

    let backup = decl("backup", BACKUP_PKG, SourceKind::IssueOnly);

    let mut updates = decl("updates", UPDATES_PKG, SourceKind::Dynamic);
    updates.untracked = true;

    let mut advanced = decl("advanced_privacy", SETTINGS_PKG, SourceKind::Static);
    advanced.default_title = Some("Advanced privacy".to_string());
    advanced.default_summary = Some("More privacy controls".to_string());
    advanced.default_target = Some(NavigationTarget::new("android.settings.PRIVACY"));

    SafetyCenterConfig {
        groups: vec![
            SourceGroup {
                id: "device_security".to_string(),
                title: "Device security".to_string(),
                summary: None,
                kind: GroupKind::Collapsible,
                sources: vec![lockscreen, biometrics],
            },
            SourceGroup {
                id: "accounts".to_string(),
                title: "Accounts".to_string(),
                summary: None,
                kind: GroupKind::Collapsible,
                sources: vec![accounts, backup],
            },
            SourceGroup {
                id: "system".to_string(),
                title: "System".to_string(),
                summary: None,
                kind: GroupKind::Collapsible,
                sources: vec![updates],
            },
            SourceGroup {
                id: "more_settings".to_string(),
                title: "More settings".to_string(),
                summary: None,
                kind: GroupKind::Rigid,
                sources: vec![advanced],
            },
        ],
        dedup_enabled: false,
    }
}

pub(crate) fn create_service() -> SafetyCenterService {
    init_tracing();
    SafetyCenterService::new(test_config(), Arc::new(StaticUserContext::single_user(0)))
}

pub(crate) fn create_service_with(
    config: SafetyCenterConfig,
    users: StaticUserContext,
) -> SafetyCenterService {
    init_tracing();
    SafetyCenterService::new(config, Arc::new(users))
}

// ========================================================================
// Payload builders
// ========================================================================

pub(crate) fn status_with(title: &str, summary: &str, severity: Severity) -> SourceStatus {
    SourceStatus {
        title: title.to_string(),
        summary: summary.to_string(),
        severity,
        enabled: true,
        target: Some(NavigationTarget::new("android.settings.SECURITY")),
        icon_action: None,
    }
}

pub(crate) fn ok_status(title: &str) -> SourceStatus {
    status_with(title, "", Severity::Ok)
}

pub(crate) fn issue(id: &str, severity: Severity) -> Issue {
    Issue {
        source_issue_id: id.to_string(),
        issue_type_id: format!("{id}_type"),
        title: format!("Issue {id}"),
        summary: "Tap to review".to_string(),
        subtitle: None,
        severity,
        actions: Vec::new(),
        dedup_group: None,
    }
}

pub(crate) fn action(id: &str) -> Action {
    Action {
        source_action_id: id.to_string(),
        label: format!("Fix {id}"),
        target: NavigationTarget::new("android.settings.FIX"),
        will_resolve: true,
        success_message: None,
    }
}

pub(crate) fn report(status: Option<SourceStatus>, issues: Vec<Issue>) -> SourceReport {
    SourceReport { status, issues }
}

/// Push a report for user 0 as a spontaneous state change.
pub(crate) fn set(
    service: &SafetyCenterService,
    source_id: &str,
    package: &str,
    payload: SourceReport,
) {
    service
        .set_source_data(
            source_id,
            0,
            package,
            Some(payload),
            SourceEvent::SourceStateChanged,
        )
        .expect("set_source_data failed");
}

pub(crate) fn issue_key(source_id: &str, issue_id: &str, user_id: UserId) -> IssueKey {
    IssueKey::new(source_id, issue_id, user_id)
}

// ========================================================================
// Recording observer
// ========================================================================

#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub aggregates: Mutex<Vec<SafetyAggregate>>,
    pub errors: Mutex<Vec<ErrorDetails>>,
    pub fail_next: Mutex<Option<DeliveryError>>,
}

impl RecordingObserver {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_count(&self) -> usize {
        self.aggregates.lock().len()
    }

    pub(crate) fn last(&self) -> Option<SafetyAggregate> {
        self.aggregates.lock().last().cloned()
    }

    pub(crate) fn error_count(&self) -> usize {
        self.errors.lock().len()
    }
}

impl AggregateObserver for RecordingObserver {
    fn on_aggregate_changed(&self, aggregate: &SafetyAggregate) -> Result<(), DeliveryError> {
        if let Some(failure) = self.fail_next.lock().take() {
            return Err(failure);
        }
        self.aggregates.lock().push(aggregate.clone());
        Ok(())
    }

    fn on_error(&self, error: &ErrorDetails) -> Result<(), DeliveryError> {
        self.errors.lock().push(error.clone());
        Ok(())
    }
}
