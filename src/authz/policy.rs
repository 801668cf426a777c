use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::models::timesheet::{EntrySpan, Timesheet, TimesheetEntry};
use crate::models::user::{UserKey, UserProfile};

use super::approval::ApprovalConfig;
use super::decision::{Decision, DenialReason, EntryAction};
use super::directory::{IdentityDirectory, TeamDirectory};
use super::window::{Clock, EditWindow, SystemClock};

/// Decides who may view timesheets and edit or delete their entries.
///
/// Stateless: every call reads current facts from the directories and the
/// clock. Directory failures propagate unchanged.
#[derive(Clone)]
pub struct PermissionPolicy {
    teams: Arc<dyn TeamDirectory>,
    identity: Arc<dyn IdentityDirectory>,
    approval: Arc<ApprovalConfig>,
    clock: Arc<dyn Clock>,
}

impl PermissionPolicy {
    pub fn new(
        teams: Arc<dyn TeamDirectory>,
        identity: Arc<dyn IdentityDirectory>,
        approval: ApprovalConfig,
    ) -> Self {
        Self {
            teams,
            identity,
            approval: Arc::new(approval),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolves a username or fails with "User does not exist.".
    pub async fn require_username(&self, username: &str) -> AppResult<UserProfile> {
        self.identity
            .profile_by_username(username)
            .await?
            .ok_or(AppError::NotAuthorized(DenialReason::UserDoesNotExist))
    }

    /// Resolves a user key or fails with "User does not exist.".
    pub async fn require_user_key(&self, key: &UserKey) -> AppResult<UserProfile> {
        self.identity
            .profile_by_key(key)
            .await?
            .ok_or(AppError::NotAuthorized(DenialReason::UserDoesNotExist))
    }

    pub async fn user_exists(&self, username: &str) -> AppResult<bool> {
        Ok(self.identity.profile_by_username(username).await?.is_some())
    }

    pub async fn is_group_member(&self, user: &UserProfile, group: &str) -> AppResult<bool> {
        let groups = self.identity.group_names(&user.username).await?;
        Ok(groups.contains(group))
    }

    /// Administrator check for an already resolved user.
    pub async fn is_admin(&self, user: &UserProfile) -> AppResult<bool> {
        self.identity.is_admin(&user.key).await
    }

    pub async fn user_is_admin(&self, username: &str) -> AppResult<bool> {
        match self.identity.profile_by_username(username).await? {
            Some(profile) => self.identity.is_admin(&profile.key).await,
            None => Ok(false),
        }
    }

    /// Whether `user` may use the system at all: listed directly, or a
    /// member of an approved group. Nobody is approved when both lists are empty.
    pub async fn is_approved(&self, user: &UserProfile) -> AppResult<bool> {
        if self.approval.is_empty() {
            return Ok(false);
        }

        if self.approval.is_user_approved(&user.key) {
            return Ok(true);
        }

        let groups = self.identity.group_names(&user.username).await?;
        Ok(groups.iter().any(|group| self.approval.is_group_approved(group)))
    }

    pub async fn is_approved_username(&self, username: &str) -> AppResult<bool> {
        let profile = self.require_username(username).await?;
        self.is_approved(&profile).await
    }

    /// Fails with `NotApproved` unless [`Self::is_approved`] holds.
    pub async fn require_approved(&self, user: &UserProfile) -> AppResult<()> {
        if self.is_approved(user).await? {
            Ok(())
        } else {
            Err(AppError::NotAuthorized(DenialReason::NotApproved))
        }
    }

    /// Owner, administrator, or coordinator of a team the owner belongs to.
    /// A missing actor or sheet is never allowed.
    pub async fn user_can_view_timesheet(
        &self,
        user: Option<&UserProfile>,
        sheet: Option<&Timesheet>,
    ) -> AppResult<bool> {
        let (user, sheet) = match (user, sheet) {
            (Some(user), Some(sheet)) => (user, sheet),
            _ => return Ok(false),
        };

        if user_owns_sheet(user, sheet) {
            tracing::debug!(actor = %user.key, sheet = %sheet.id, "view allowed: owner");
            return Ok(true);
        }

        if self.identity.is_admin(&user.key).await? {
            tracing::debug!(actor = %user.key, sheet = %sheet.id, "view allowed: administrator");
            return Ok(true);
        }

        if self.user_coordinates_teams_of_sheet(user, sheet).await? {
            tracing::debug!(actor = %user.key, sheet = %sheet.id, "view allowed: coordinator");
            return Ok(true);
        }

        tracing::debug!(
            actor = %user.key,
            sheet = %sheet.id,
            sheet_owner = %sheet.user_key,
            "view denied"
        );
        Ok(false)
    }

    /// Fails with `NotAuthorized` when the entry may not be written with the given times.
    pub async fn user_can_edit_timesheet_entry(
        &self,
        user: &UserProfile,
        sheet: &Timesheet,
        entry: &EntrySpan,
    ) -> AppResult<()> {
        self.enforce(EntryAction::Edit, user, sheet, entry).await
    }

    /// Fails with `NotAuthorized` when the stored entry may not be removed.
    pub async fn user_can_delete_timesheet_entry(
        &self,
        user: &UserProfile,
        entry: &TimesheetEntry,
    ) -> AppResult<()> {
        self.enforce(EntryAction::Delete, user, &entry.timesheet, &entry.span()).await
    }

    /// Shared rule for edit and delete.
    ///
    /// Owners are bound by the window of the entry's provenance. Everyone
    /// else needs to be an administrator, and administrators who do not own
    /// the sheet are not bound by any window.
    pub async fn decide_entry_access(
        &self,
        action: EntryAction,
        user: &UserProfile,
        sheet: &Timesheet,
        entry: &EntrySpan,
    ) -> AppResult<Decision> {
        if user_owns_sheet(user, sheet) {
            let window = EditWindow::for_provenance(entry.is_imported);
            if window.excludes(entry.begin, entry.end, self.clock.now()) {
                tracing::debug!(
                    actor = %user.key,
                    sheet = %sheet.id,
                    action = %action,
                    window = %window,
                    "entry access denied: outside window"
                );
                return Ok(Decision::Denied(DenialReason::EntryTooOld { action, window }));
            }
            return Ok(Decision::Allowed);
        }

        if !self.identity.is_admin(&user.key).await? {
            tracing::debug!(
                actor = %user.key,
                sheet = %sheet.id,
                sheet_owner = %sheet.user_key,
                action = %action,
                "entry access denied: not owner, not administrator"
            );
            return Ok(Decision::Denied(DenialReason::NotAdministrator { action }));
        }

        tracing::debug!(actor = %user.key, sheet = %sheet.id, action = %action, "entry access allowed: administrator");
        Ok(Decision::Allowed)
    }

    async fn enforce(
        &self,
        action: EntryAction,
        user: &UserProfile,
        sheet: &Timesheet,
        entry: &EntrySpan,
    ) -> AppResult<()> {
        match self.decide_entry_access(action, user, sheet, entry).await? {
            Decision::Allowed => Ok(()),
            Decision::Denied(reason) => Err(AppError::NotAuthorized(reason)),
        }
    }

    async fn user_coordinates_teams_of_sheet(&self, user: &UserProfile, sheet: &Timesheet) -> AppResult<bool> {
        let owner = match self.identity.profile_by_key(&sheet.user_key).await? {
            Some(owner) => owner,
            None => return Ok(false),
        };

        let owner_teams = self.teams.teams_of_user(&owner.username).await?;
        if owner_teams.is_empty() {
            return Ok(false);
        }
        let coordinated = self.teams.coordinator_teams_of_user(&user.username).await?;

        Ok(!owner_teams.is_disjoint(&coordinated))
    }
}

fn user_owns_sheet(user: &UserProfile, sheet: &Timesheet) -> bool {
    sheet.owned_by(&user.key)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::authz::window::FixedClock;
    use crate::models::team::Team;

    #[derive(Default)]
    struct FakeDirectory {
        users: Vec<UserProfile>,
        admins: HashSet<UserKey>,
        groups: HashMap<String, HashSet<String>>,
        members: HashMap<String, HashSet<Team>>,
        coordinators: HashMap<String, HashSet<Team>>,
    }

    impl FakeDirectory {
        fn user(mut self, key: &str, username: &str) -> Self {
            self.users.push(UserProfile::new(key, username));
            self
        }

        fn admin(mut self, key: &str) -> Self {
            self.admins.insert(UserKey::from(key));
            self
        }

        fn group(mut self, username: &str, group: &str) -> Self {
            self.groups.entry(username.to_string()).or_default().insert(group.to_string());
            self
        }

        fn member(mut self, username: &str, team: &Team) -> Self {
            self.members.entry(username.to_string()).or_default().insert(team.clone());
            self
        }

        fn coordinator(mut self, username: &str, team: &Team) -> Self {
            self.coordinators.entry(username.to_string()).or_default().insert(team.clone());
            self
        }
    }

    #[async_trait]
    impl TeamDirectory for FakeDirectory {
        async fn teams_of_user(&self, username: &str) -> AppResult<HashSet<Team>> {
            Ok(self.members.get(username).cloned().unwrap_or_default())
        }

        async fn coordinator_teams_of_user(&self, username: &str) -> AppResult<HashSet<Team>> {
            Ok(self.coordinators.get(username).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl IdentityDirectory for FakeDirectory {
        async fn profile_by_key(&self, key: &UserKey) -> AppResult<Option<UserProfile>> {
            Ok(self.users.iter().find(|u| &u.key == key).cloned())
        }

        async fn profile_by_username(&self, username: &str) -> AppResult<Option<UserProfile>> {
            Ok(self.users.iter().find(|u| u.username == username).cloned())
        }

        async fn is_admin(&self, key: &UserKey) -> AppResult<bool> {
            Ok(self.admins.contains(key))
        }

        async fn group_names(&self, username: &str) -> AppResult<HashSet<String>> {
            Ok(self.groups.get(username).cloned().unwrap_or_default())
        }
    }

    struct FailingTeams;

    #[async_trait]
    impl TeamDirectory for FailingTeams {
        async fn teams_of_user(&self, _username: &str) -> AppResult<HashSet<Team>> {
            Err(AppError::internal("team lookup failed"))
        }

        async fn coordinator_teams_of_user(&self, _username: &str) -> AppResult<HashSet<Team>> {
            Err(AppError::internal("team lookup failed"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn team(id: i64, name: &str) -> Team {
        Team { id, name: name.to_string() }
    }

    fn policy(directory: FakeDirectory) -> PermissionPolicy {
        let directory = Arc::new(directory);
        PermissionPolicy::new(directory.clone(), directory, ApprovalConfig::new())
            .with_clock(Arc::new(FixedClock(now())))
    }

    fn sheet_of(key: &str) -> Timesheet {
        Timesheet {
            id: Uuid::new_v4(),
            user_key: UserKey::from(key),
            created_at: now() - Duration::days(400),
        }
    }

    fn span_aged(days: i64, imported: bool) -> EntrySpan {
        let begin = now() - Duration::days(days);
        EntrySpan::new(begin, begin + Duration::hours(2), imported)
    }

    fn base_directory() -> FakeDirectory {
        FakeDirectory::default()
            .user("k-owner", "owner")
            .user("k-admin", "admin")
            .user("k-other", "other")
            .admin("k-admin")
    }

    #[tokio::test]
    async fn view_requires_actor_and_sheet() {
        let policy = policy(base_directory());
        let owner = UserProfile::new("k-owner", "owner");
        let sheet = sheet_of("k-owner");

        assert!(!policy.user_can_view_timesheet(None, Some(&sheet)).await.unwrap());
        assert!(!policy.user_can_view_timesheet(Some(&owner), None).await.unwrap());
        assert!(policy.user_can_view_timesheet(Some(&owner), Some(&sheet)).await.unwrap());
    }

    #[tokio::test]
    async fn ownership_follows_key_not_username() {
        let policy = policy(base_directory());
        let sheet = sheet_of("k-owner");

        let renamed = UserProfile::new("k-owner", "owner-renamed");
        assert!(policy.user_can_view_timesheet(Some(&renamed), Some(&sheet)).await.unwrap());

        let impostor = UserProfile::new("k-other", "owner");
        assert!(!policy.user_can_view_timesheet(Some(&impostor), Some(&sheet)).await.unwrap());
    }

    #[tokio::test]
    async fn admin_can_view_any_sheet() {
        let policy = policy(base_directory());
        let admin = UserProfile::new("k-admin", "admin");
        assert!(policy.user_can_view_timesheet(Some(&admin), Some(&sheet_of("k-owner"))).await.unwrap());
    }

    #[tokio::test]
    async fn coordinator_views_members_of_coordinated_team() {
        let x = team(1, "X");
        let directory = base_directory().member("owner", &x).coordinator("other", &x);
        let policy = policy(directory);

        let other = UserProfile::new("k-other", "other");
        assert!(policy.user_can_view_timesheet(Some(&other), Some(&sheet_of("k-owner"))).await.unwrap());
    }

    #[tokio::test]
    async fn coordination_requires_overlapping_team() {
        let x = team(1, "X");
        let y = team(2, "Y");
        let directory = base_directory()
            .member("owner", &y)
            .coordinator("other", &x)
            .member("other", &y);
        let policy = policy(directory);

        let other = UserProfile::new("k-other", "other");
        assert!(!policy.user_can_view_timesheet(Some(&other), Some(&sheet_of("k-owner"))).await.unwrap());
    }

    #[tokio::test]
    async fn coordination_does_not_reach_through_shared_members() {
        let t = team(1, "T");
        let u = team(2, "U");
        let directory = base_directory()
            .user("k-bridge", "bridge")
            .coordinator("other", &t)
            .member("bridge", &t)
            .member("bridge", &u)
            .member("owner", &u);
        let policy = policy(directory);

        let other = UserProfile::new("k-other", "other");
        assert!(policy.user_can_view_timesheet(Some(&other), Some(&sheet_of("k-bridge"))).await.unwrap());
        assert!(!policy.user_can_view_timesheet(Some(&other), Some(&sheet_of("k-owner"))).await.unwrap());
    }

    #[tokio::test]
    async fn coordination_with_unknown_owner_is_denied() {
        let x = team(1, "X");
        let directory = base_directory().coordinator("other", &x);
        let policy = policy(directory);

        let other = UserProfile::new("k-other", "other");
        assert!(!policy.user_can_view_timesheet(Some(&other), Some(&sheet_of("k-ghost"))).await.unwrap());
    }

    #[tokio::test]
    async fn team_lookup_failures_propagate() {
        let directory = Arc::new(base_directory());
        let policy = PermissionPolicy::new(Arc::new(FailingTeams), directory, ApprovalConfig::new());

        let other = UserProfile::new("k-other", "other");
        let err = policy
            .user_can_view_timesheet(Some(&other), Some(&sheet_of("k-owner")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn owner_edit_respects_manual_window() {
        let policy = policy(base_directory());
        let owner = UserProfile::new("k-owner", "owner");
        let sheet = sheet_of("k-owner");

        assert!(policy.user_can_edit_timesheet_entry(&owner, &sheet, &span_aged(0, false)).await.is_ok());

        let boundary = EntrySpan::new(now() - Duration::days(30), now() - Duration::days(30), false);
        assert!(policy.user_can_edit_timesheet_entry(&owner, &sheet, &boundary).await.is_ok());

        let err = policy
            .user_can_edit_timesheet_entry(&owner, &sheet, &span_aged(31, false))
            .await
            .unwrap_err();
        assert_eq!(
            err.denial(),
            Some(DenialReason::EntryTooOld { action: EntryAction::Edit, window: EditWindow::Manual })
        );
        assert_eq!(err.to_string(), "You can not edit an entry that is older than 30 days.");
    }

    #[tokio::test]
    async fn stale_end_alone_denies() {
        let policy = policy(base_directory());
        let owner = UserProfile::new("k-owner", "owner");
        let span = EntrySpan::new(now() - Duration::days(1), now() - Duration::days(40), false);

        let decision = policy
            .decide_entry_access(EntryAction::Edit, &owner, &sheet_of("k-owner"), &span)
            .await
            .unwrap();
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn owner_edit_of_imported_entry_uses_five_years() {
        let policy = policy(base_directory());
        let owner = UserProfile::new("k-owner", "owner");
        let sheet = sheet_of("k-owner");

        assert!(policy.user_can_edit_timesheet_entry(&owner, &sheet, &span_aged(365 * 4, true)).await.is_ok());

        let at_cutoff = Utc.with_ymd_and_hms(2021, 6, 1, 9, 0, 0).unwrap();
        let boundary = EntrySpan::new(at_cutoff, at_cutoff + Duration::hours(1), true);
        assert!(policy.user_can_edit_timesheet_entry(&owner, &sheet, &boundary).await.is_ok());

        let past = EntrySpan::new(at_cutoff - Duration::days(1), at_cutoff + Duration::hours(1), true);
        let err = policy.user_can_edit_timesheet_entry(&owner, &sheet, &past).await.unwrap_err();
        assert_eq!(err.to_string(), "You can not edit an imported entry that is older than 5 years.");
    }

    #[tokio::test]
    async fn admin_non_owner_bypasses_window_but_admin_owner_does_not() {
        let policy = policy(base_directory());
        let admin = UserProfile::new("k-admin", "admin");
        let ten_years = span_aged(3653, true);

        assert!(policy
            .user_can_edit_timesheet_entry(&admin, &sheet_of("k-owner"), &ten_years)
            .await
            .is_ok());

        let err = policy
            .user_can_edit_timesheet_entry(&admin, &sheet_of("k-admin"), &ten_years)
            .await
            .unwrap_err();
        assert!(matches!(err.denial(), Some(DenialReason::EntryTooOld { .. })));
    }

    #[tokio::test]
    async fn non_owner_non_admin_is_always_denied() {
        let x = team(1, "X");
        let directory = base_directory().member("owner", &x).coordinator("other", &x);
        let policy = policy(directory);
        let other = UserProfile::new("k-other", "other");
        let sheet = sheet_of("k-owner");

        for days in [0, 31, 4000] {
            let err = policy
                .user_can_edit_timesheet_entry(&other, &sheet, &span_aged(days, false))
                .await
                .unwrap_err();
            assert_eq!(err.denial(), Some(DenialReason::NotAdministrator { action: EntryAction::Edit }));
            assert_eq!(err.to_string(), "You are not an administrator.");
        }
    }

    #[tokio::test]
    async fn delete_uses_the_entry_sheet_and_delete_wording() {
        let policy = policy(base_directory());
        let owner = UserProfile::new("k-owner", "owner");
        let admin = UserProfile::new("k-admin", "admin");
        let other = UserProfile::new("k-other", "other");
        let span = span_aged(31, false);
        let entry = TimesheetEntry {
            id: Uuid::new_v4(),
            timesheet: sheet_of("k-owner"),
            begin_date: span.begin,
            end_date: span.end,
            description: None,
            category_id: None,
            team_id: None,
            is_imported: false,
            created_at: span.begin,
            updated_at: span.begin,
        };

        let err = policy.user_can_delete_timesheet_entry(&owner, &entry).await.unwrap_err();
        assert_eq!(err.to_string(), "You can not delete an entry that is older than 30 days.");

        assert!(policy.user_can_delete_timesheet_entry(&admin, &entry).await.is_ok());

        let err = policy.user_can_delete_timesheet_entry(&other, &entry).await.unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::NotAdministrator { action: EntryAction::Delete }));
    }

    #[tokio::test]
    async fn owner_today_then_stale_then_admin() {
        let directory = Arc::new(base_directory());
        let owner = UserProfile::new("k-owner", "owner");
        let admin = UserProfile::new("k-admin", "admin");
        let sheet = sheet_of("k-owner");
        let created = now();
        let span = EntrySpan::new(created, created + Duration::hours(1), false);

        let today = PermissionPolicy::new(directory.clone(), directory.clone(), ApprovalConfig::new())
            .with_clock(Arc::new(FixedClock(created + Duration::hours(2))));
        assert!(today.user_can_edit_timesheet_entry(&owner, &sheet, &span).await.is_ok());

        let later = today.clone().with_clock(Arc::new(FixedClock(created + Duration::days(31) + Duration::hours(2))));
        assert!(later.user_can_edit_timesheet_entry(&owner, &sheet, &span).await.is_err());
        assert!(later.user_can_edit_timesheet_entry(&admin, &sheet, &span).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_users_are_not_authorized() {
        let policy = policy(base_directory());

        let err = policy.require_username("ghost").await.unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::UserDoesNotExist));
        assert_eq!(err.to_string(), "User does not exist.");

        assert!(policy.require_user_key(&UserKey::from("k-ghost")).await.is_err());
        assert!(!policy.user_exists("ghost").await.unwrap());
        assert!(policy.user_exists("owner").await.unwrap());
    }

    #[tokio::test]
    async fn admin_lookup_by_profile_uses_key() {
        let policy = policy(base_directory());
        assert!(policy.is_admin(&UserProfile::new("k-admin", "renamed-admin")).await.unwrap());
        assert!(!policy.is_admin(&UserProfile::new("k-owner", "admin")).await.unwrap());
    }

    #[tokio::test]
    async fn admin_lookup_by_username() {
        let policy = policy(base_directory());
        assert!(policy.user_is_admin("admin").await.unwrap());
        assert!(!policy.user_is_admin("owner").await.unwrap());
        assert!(!policy.user_is_admin("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn approval_by_key_or_group() {
        let directory = Arc::new(base_directory().group("other", "staff").group("owner", "guests"));
        let approval = ApprovalConfig::new().with_users(["k-admin"]).with_groups(["staff"]);
        let policy = PermissionPolicy::new(directory.clone(), directory, approval);

        assert!(policy.is_approved(&UserProfile::new("k-admin", "admin")).await.unwrap());
        assert!(policy.is_approved(&UserProfile::new("k-other", "other")).await.unwrap());
        assert!(!policy.is_approved(&UserProfile::new("k-owner", "owner")).await.unwrap());
        assert!(policy.is_approved_username("other").await.unwrap());
        assert!(policy.is_approved_username("ghost").await.is_err());

        let err = policy
            .require_approved(&UserProfile::new("k-owner", "owner"))
            .await
            .unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::NotApproved));
    }

    #[tokio::test]
    async fn empty_approval_lists_approve_nobody() {
        let policy = policy(base_directory().group("owner", "staff"));
        assert!(!policy.is_approved(&UserProfile::new("k-admin", "admin")).await.unwrap());
    }

    #[tokio::test]
    async fn group_membership_check() {
        let policy = policy(base_directory().group("owner", "staff"));
        let owner = UserProfile::new("k-owner", "owner");
        assert!(policy.is_group_member(&owner, "staff").await.unwrap());
        assert!(!policy.is_group_member(&owner, "admins").await.unwrap());
    }
}
