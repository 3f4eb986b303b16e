use std::sync::Arc;

use async_trait::async_trait;
use coffee_bar_core::{
    CoreError, DomainAllowlistEntry, DomainId, Page, PreferenceMap, Principal, UserId,
    UserInvite, UserQuery, UserRecord, UserUpdate, WorkspaceDraft, WorkspaceId,
    WorkspacePreferencesRecord, WorkspaceSummary,
};

use crate::search_tasks::PageSource;

/// Everything the admin screens need from the signed-in session and the
/// gateway. Implemented by the application; screens never reach the
/// transport directly.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn current_principal(&self) -> Result<Principal, CoreError>;
    /// Prefilled support mail link for principals without admin access.
    fn access_request_link(&self, principal: &Principal) -> Result<String, CoreError>;
    /// Clears the session and returns the provider's logout URL.
    async fn sign_out(&self) -> Result<String, CoreError>;

    async fn domain_allowlists(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<DomainAllowlistEntry>, CoreError>;
    async fn create_domain(&self, domain: &str) -> Result<DomainAllowlistEntry, CoreError>;
    async fn update_domain(
        &self,
        id: &DomainId,
        domain: &str,
    ) -> Result<DomainAllowlistEntry, CoreError>;
    async fn delete_domain(&self, id: &DomainId) -> Result<(), CoreError>;

    async fn users(
        &self,
        workspace_id: &WorkspaceId,
        query: &UserQuery,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<UserRecord>, CoreError>;
    async fn invite_user(&self, invite: &UserInvite) -> Result<UserRecord, CoreError>;
    async fn update_user(&self, update: &UserUpdate) -> Result<UserRecord, CoreError>;
    async fn remove_user(&self, user_id: &UserId, workspace_id: &WorkspaceId)
        -> Result<(), CoreError>;

    async fn workspaces(
        &self,
        search: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<WorkspaceSummary>, CoreError>;
    async fn create_workspace(&self, draft: &WorkspaceDraft)
        -> Result<WorkspaceSummary, CoreError>;

    async fn workspace_preferences(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<WorkspacePreferencesRecord>, CoreError>;
    async fn save_preferences(
        &self,
        workspace_id: &WorkspaceId,
        preferences: &PreferenceMap,
    ) -> Result<(), CoreError>;
}

/// Workspace search over [`AdminBackend::workspaces`].
#[derive(Clone)]
pub struct WorkspaceSource(pub Arc<dyn AdminBackend>);

#[async_trait]
impl PageSource<WorkspaceSummary> for WorkspaceSource {
    async fn fetch_page(
        &self,
        query: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<WorkspaceSummary>, CoreError> {
        self.0.workspaces(query, first, after).await
    }
}
