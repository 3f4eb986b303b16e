use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use coffee_bar_core::{
    CoreError, DomainAllowlistEntry, DomainId, Page, PageInfo, PreferenceMap, Principal, UserId,
    UserInvite, UserQuery, UserRecord, UserUpdate, WorkspaceDraft, WorkspaceId,
    WorkspacePreferencesRecord, WorkspaceSummary,
};
use serde_json::json;

use crate::backend::AdminBackend;

type Queue<T> = Mutex<VecDeque<Result<T, CoreError>>>;

fn next<T>(queue: &Queue<T>, operation: &str) -> Result<T, CoreError> {
    queue
        .lock()
        .expect("stub queue lock")
        .pop_front()
        .unwrap_or_else(|| {
            Err(CoreError::DependencyUnavailable(format!(
                "stub backend has no queued {operation} response"
            )))
        })
}

fn push<T>(queue: &Queue<T>, value: Result<T, CoreError>) {
    queue.lock().expect("stub queue lock").push_back(value);
}

#[derive(Default)]
pub(crate) struct StubBackend {
    calls: Mutex<Vec<String>>,
    principals: Queue<Principal>,
    domains: Queue<Vec<DomainAllowlistEntry>>,
    domain_writes: Queue<DomainAllowlistEntry>,
    deletes: Queue<()>,
    users: Queue<Page<UserRecord>>,
    user_writes: Queue<UserRecord>,
    workspaces: Queue<WorkspaceSummary>,
    preferences: Queue<Option<WorkspacePreferencesRecord>>,
    saves: Queue<()>,
    saved_blobs: Mutex<Vec<String>>,
}

impl StubBackend {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn saved_blobs(&self) -> Vec<String> {
        self.saved_blobs.lock().expect("saves lock").clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock").push(call.into());
    }

    pub(crate) fn push_principal(&self, value: Result<Principal, CoreError>) {
        push(&self.principals, value);
    }

    pub(crate) fn push_domains(&self, value: Result<Vec<DomainAllowlistEntry>, CoreError>) {
        push(&self.domains, value);
    }

    pub(crate) fn push_domain_write(&self, value: Result<DomainAllowlistEntry, CoreError>) {
        push(&self.domain_writes, value);
    }

    pub(crate) fn push_delete(&self, value: Result<(), CoreError>) {
        push(&self.deletes, value);
    }

    pub(crate) fn push_users(&self, value: Result<Page<UserRecord>, CoreError>) {
        push(&self.users, value);
    }

    pub(crate) fn push_user_write(&self, value: Result<UserRecord, CoreError>) {
        push(&self.user_writes, value);
    }

    pub(crate) fn push_workspace(&self, value: Result<WorkspaceSummary, CoreError>) {
        push(&self.workspaces, value);
    }

    pub(crate) fn push_preferences(
        &self,
        value: Result<Option<WorkspacePreferencesRecord>, CoreError>,
    ) {
        push(&self.preferences, value);
    }

    pub(crate) fn push_save(&self, value: Result<(), CoreError>) {
        push(&self.saves, value);
    }
}

#[async_trait]
impl AdminBackend for StubBackend {
    async fn current_principal(&self) -> Result<Principal, CoreError> {
        self.record("current_principal");
        next(&self.principals, "principal")
    }

    fn access_request_link(&self, principal: &Principal) -> Result<String, CoreError> {
        Ok(format!("mailto:support@coffee.ai?from={}", principal.email))
    }

    async fn sign_out(&self) -> Result<String, CoreError> {
        self.record("sign_out");
        Ok("https://id.example.com/v2/logout".to_owned())
    }

    async fn domain_allowlists(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<DomainAllowlistEntry>, CoreError> {
        self.record(format!("domain_allowlists {}", search.unwrap_or_default()));
        next(&self.domains, "domain list")
    }

    async fn create_domain(&self, domain: &str) -> Result<DomainAllowlistEntry, CoreError> {
        self.record(format!("create_domain {domain}"));
        next(&self.domain_writes, "create domain")
    }

    async fn update_domain(
        &self,
        id: &DomainId,
        domain: &str,
    ) -> Result<DomainAllowlistEntry, CoreError> {
        self.record(format!("update_domain {id} {domain}"));
        next(&self.domain_writes, "update domain")
    }

    async fn delete_domain(&self, id: &DomainId) -> Result<(), CoreError> {
        self.record(format!("delete_domain {id}"));
        next(&self.deletes, "delete domain")
    }

    async fn users(
        &self,
        workspace_id: &WorkspaceId,
        query: &UserQuery,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<UserRecord>, CoreError> {
        self.record(format!(
            "users {workspace_id} search={} role={} first={first} after={}",
            query.search.as_deref().unwrap_or_default(),
            query.role.as_query_value().unwrap_or("all"),
            after.unwrap_or("-"),
        ));
        next(&self.users, "users")
    }

    async fn invite_user(&self, invite: &UserInvite) -> Result<UserRecord, CoreError> {
        self.record(format!("invite_user {} {}", invite.email, invite.role));
        next(&self.user_writes, "invite user")
    }

    async fn update_user(&self, update: &UserUpdate) -> Result<UserRecord, CoreError> {
        self.record(format!(
            "update_user {} {} {} {}",
            update.user_id, update.given_name, update.surname, update.role
        ));
        next(&self.user_writes, "update user")
    }

    async fn remove_user(
        &self,
        user_id: &UserId,
        workspace_id: &WorkspaceId,
    ) -> Result<(), CoreError> {
        self.record(format!("remove_user {user_id} {workspace_id}"));
        next(&self.deletes, "remove user")
    }

    async fn workspaces(
        &self,
        search: &str,
        _first: u32,
        _after: Option<&str>,
    ) -> Result<Page<WorkspaceSummary>, CoreError> {
        self.record(format!("workspaces {search}"));
        Ok(Page::new(Vec::new(), PageInfo::default()))
    }

    async fn create_workspace(
        &self,
        draft: &WorkspaceDraft,
    ) -> Result<WorkspaceSummary, CoreError> {
        self.record(format!(
            "create_workspace {} domain={} logo={}",
            draft.name,
            draft.domain.as_deref().unwrap_or("-"),
            draft.logo_url.as_deref().unwrap_or("-"),
        ));
        next(&self.workspaces, "create workspace")
    }

    async fn workspace_preferences(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<WorkspacePreferencesRecord>, CoreError> {
        self.record(format!("workspace_preferences {workspace_id}"));
        next(&self.preferences, "preferences")
    }

    async fn save_preferences(
        &self,
        workspace_id: &WorkspaceId,
        preferences: &PreferenceMap,
    ) -> Result<(), CoreError> {
        self.record(format!("save_preferences {workspace_id}"));
        self.saved_blobs
            .lock()
            .expect("saves lock")
            .push(preferences.to_blob());
        next(&self.saves, "save preferences")
    }
}

pub(crate) fn principal(is_superuser: bool) -> Principal {
    serde_json::from_value(json!({
        "id": "1",
        "email": "ada@coffee.ai",
        "givenName": "Ada",
        "surname": "Lovelace",
        "isSuperuser": is_superuser,
    }))
    .expect("principal fixture")
}

pub(crate) fn user(id: &str, email: &str, role: Option<&str>) -> UserRecord {
    serde_json::from_value(json!({
        "id": id,
        "email": email,
        "givenName": "Given",
        "surname": id,
        "isOnboarded": role.is_some(),
        "role": role,
    }))
    .expect("user fixture")
}

pub(crate) fn domain(id: &str, name: &str) -> DomainAllowlistEntry {
    serde_json::from_value(json!({
        "id": id,
        "domain": name,
        "createdAt": "2024-03-01T10:00:00Z",
        "createdBy": { "id": "1", "email": "ada@coffee.ai", "givenName": "Ada", "surname": "Lovelace" }
    }))
    .expect("domain fixture")
}
