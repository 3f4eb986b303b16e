use std::sync::Arc;

use async_trait::async_trait;
use coffee_bar_core::{
    CoreError, DomainAllowlistEntry, DomainId, Page, PreferenceMap, Principal, UserId,
    UserInvite, UserQuery, UserRecord, UserUpdate, WorkspaceDraft, WorkspaceId,
    WorkspacePreferencesRecord, WorkspaceSummary,
};
use coffee_bar_gateway::{access_request_mailto, CoffeeGateway, Session};
use coffee_bar_ui::AdminBackend;

/// Screens' view of the gateway and the signed-in session.
pub struct GatewayBackend {
    gateway: Arc<CoffeeGateway>,
    session: Arc<Session>,
    support_email: String,
}

impl GatewayBackend {
    pub fn new(
        gateway: Arc<CoffeeGateway>,
        session: Arc<Session>,
        support_email: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            session,
            support_email: support_email.into(),
        }
    }

    pub fn gateway(&self) -> &Arc<CoffeeGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

#[async_trait]
impl AdminBackend for GatewayBackend {
    async fn current_principal(&self) -> Result<Principal, CoreError> {
        self.gateway.me(None).await
    }

    fn access_request_link(&self, principal: &Principal) -> Result<String, CoreError> {
        let name = principal.display_name();
        access_request_mailto(
            &self.support_email,
            Some(name.as_str()),
            Some(principal.email.as_str()),
        )
    }

    async fn sign_out(&self) -> Result<String, CoreError> {
        self.session.sign_out().await
    }

    async fn domain_allowlists(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<DomainAllowlistEntry>, CoreError> {
        self.gateway.domain_allowlists(search).await
    }

    async fn create_domain(&self, domain: &str) -> Result<DomainAllowlistEntry, CoreError> {
        self.gateway.create_domain(domain).await
    }

    async fn update_domain(
        &self,
        id: &DomainId,
        domain: &str,
    ) -> Result<DomainAllowlistEntry, CoreError> {
        self.gateway.update_domain(id, domain).await
    }

    async fn delete_domain(&self, id: &DomainId) -> Result<(), CoreError> {
        self.gateway.delete_domain(id).await
    }

    async fn users(
        &self,
        workspace_id: &WorkspaceId,
        query: &UserQuery,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<UserRecord>, CoreError> {
        self.gateway.users(workspace_id, query, first, after).await
    }

    async fn invite_user(&self, invite: &UserInvite) -> Result<UserRecord, CoreError> {
        self.gateway.invite_user(invite).await
    }

    async fn update_user(&self, update: &UserUpdate) -> Result<UserRecord, CoreError> {
        self.gateway.update_user(update).await
    }

    async fn remove_user(
        &self,
        user_id: &UserId,
        workspace_id: &WorkspaceId,
    ) -> Result<(), CoreError> {
        self.gateway.delete_user_role(user_id, workspace_id).await
    }

    async fn workspaces(
        &self,
        search: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<WorkspaceSummary>, CoreError> {
        self.gateway.workspaces(search, first, after).await
    }

    async fn create_workspace(
        &self,
        draft: &WorkspaceDraft,
    ) -> Result<WorkspaceSummary, CoreError> {
        self.gateway.create_workspace(draft).await
    }

    async fn workspace_preferences(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<WorkspacePreferencesRecord>, CoreError> {
        self.gateway.workspace_preferences(workspace_id).await
    }

    async fn save_preferences(
        &self,
        workspace_id: &WorkspaceId,
        preferences: &PreferenceMap,
    ) -> Result<(), CoreError> {
        self.gateway
            .update_preferences(workspace_id, preferences)
            .await
            .map(|_| ())
    }
}
