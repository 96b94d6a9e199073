//! Users and profile groups
//!
//! The unit an aggregate is computed over is a profile group: a full user
//! plus its managed/private profiles. User topology and running state are
//! platform facts, supplied through the [`UserContext`] trait rather than
//! queried by the core itself.

use serde::{Deserialize, Serialize};

use super::config::SourceDecl;
use crate::ids::UserId;

/// Kind of a profile attached to a full user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileKind {
    Managed,
    Private,
}

/// A full user and its attached profiles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfileGroup {
    pub profile_parent: UserId,
    #[serde(default)]
    pub profiles: Vec<UserId>,
}

impl UserProfileGroup {
    pub fn single(profile_parent: UserId) -> Self {
        Self {
            profile_parent,
            profiles: Vec::new(),
        }
    }

    pub fn with_profiles(profile_parent: UserId, profiles: Vec<UserId>) -> Self {
        Self {
            profile_parent,
            profiles,
        }
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.profile_parent == user_id || self.profiles.contains(&user_id)
    }

    /// Users a source reports for within this group: the parent always,
    /// profiles only while running and only if the source declares profile
    /// support.
    pub fn users_for_source(&self, ctx: &dyn UserContext, decl: &SourceDecl) -> Vec<UserId> {
        let mut users = vec![self.profile_parent];
        if decl.supports_managed_profiles {
            users.extend(self.profiles.iter().copied().filter(|&p| ctx.is_running(p)));
        }
        users
    }
}

/// Platform user facts the core needs but does not own.
pub trait UserContext: Send + Sync {
    /// `None` for a full user, `Some` for a profile.
    fn profile_kind(&self, user_id: UserId) -> Option<ProfileKind>;

    /// Whether the user is currently running. Full users are always
    /// considered running.
    fn is_running(&self, user_id: UserId) -> bool;

    /// The profile group a user belongs to, as parent or profile.
    fn profile_group_of(&self, user_id: UserId) -> UserProfileGroup;
}

/// Fixed-topology [`UserContext`], for embedders with a known user set and
/// for tests.
#[derive(Debug, Default)]
pub struct StaticUserContext {
    groups: Vec<UserProfileGroup>,
    kinds: std::collections::HashMap<UserId, ProfileKind>,
    stopped: std::collections::HashSet<UserId>,
}

impl StaticUserContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single full user with no profiles.
    pub fn single_user(user_id: UserId) -> Self {
        let mut ctx = Self::new();
        ctx.add_user(user_id);
        ctx
    }

    pub fn add_user(&mut self, user_id: UserId) {
        self.groups.push(UserProfileGroup::single(user_id));
    }

    pub fn add_profile(&mut self, parent: UserId, profile: UserId, kind: ProfileKind) {
        self.kinds.insert(profile, kind);
        match self
            .groups
            .iter_mut()
            .find(|g| g.profile_parent == parent)
        {
            Some(group) => group.profiles.push(profile),
            None => self
                .groups
                .push(UserProfileGroup::with_profiles(parent, vec![profile])),
        }
    }

    pub fn set_stopped(&mut self, user_id: UserId, stopped: bool) {
        if stopped {
            self.stopped.insert(user_id);
        } else {
            self.stopped.remove(&user_id);
        }
    }
}

impl UserContext for StaticUserContext {
    fn profile_kind(&self, user_id: UserId) -> Option<ProfileKind> {
        self.kinds.get(&user_id).copied()
    }

    fn is_running(&self, user_id: UserId) -> bool {
        !self.stopped.contains(&user_id)
    }

    fn profile_group_of(&self, user_id: UserId) -> UserProfileGroup {
        self.groups
            .iter()
            .find(|g| g.contains(user_id))
            .cloned()
            .unwrap_or_else(|| UserProfileGroup::single(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{SourceKind, SourceDecl};
    use crate::models::severity::Severity;

    fn decl(supports_managed_profiles: bool) -> SourceDecl {
        SourceDecl {
            id: "src".to_string(),
            package_name: "com.example".to_string(),
            kind: SourceKind::Dynamic,
            max_severity: Severity::CriticalWarning,
            supports_managed_profiles,
            refresh_on_page_open: false,
            untracked: false,
            visible_externally: true,
            default_title: None,
            default_summary: None,
            default_target: None,
        }
    }

    #[test]
    fn test_profile_excluded_without_source_support() {
        let mut ctx = StaticUserContext::new();
        ctx.add_profile(0, 10, ProfileKind::Managed);
        let group = ctx.profile_group_of(0);

        assert_eq!(group.users_for_source(&ctx, &decl(false)), vec![0]);
        assert_eq!(group.users_for_source(&ctx, &decl(true)), vec![0, 10]);
    }

    #[test]
    fn test_stopped_profile_excluded() {
        let mut ctx = StaticUserContext::new();
        ctx.add_profile(0, 10, ProfileKind::Managed);
        ctx.set_stopped(10, true);
        let group = ctx.profile_group_of(10);

        assert_eq!(group.profile_parent, 0);
        assert_eq!(group.users_for_source(&ctx, &decl(true)), vec![0]);
    }
}
