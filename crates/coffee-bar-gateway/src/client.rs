use std::sync::{Arc, Mutex, MutexGuard};

use coffee_bar_core::{
    CoreError, DomainAllowlistEntry, DomainId, Page, PageInfo, PreferenceMap, Principal, UserId,
    UserInvite, UserQuery, UserRecord, UserUpdate, WorkspaceDraft, WorkspaceId,
    WorkspacePreferencesRecord, WorkspaceSummary,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::cache::{CacheKey, QueryCache};
use crate::graphql::{GraphqlRequest, GraphqlTransport, ReqwestGraphqlTransport};
use crate::operations::*;
use crate::session::AccessTokenCell;

/// Typed client for the admin GraphQL gateway.
pub struct CoffeeGateway {
    transport: Arc<dyn GraphqlTransport>,
    cache: Mutex<QueryCache>,
}

impl std::fmt::Debug for CoffeeGateway {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CoffeeGateway")
            .field("cached_queries", &self.cache().len())
            .finish_non_exhaustive()
    }
}

impl CoffeeGateway {
    pub fn new(endpoint: impl Into<String>, tokens: AccessTokenCell) -> Result<Self, CoreError> {
        let transport = ReqwestGraphqlTransport::new(endpoint, tokens.clone())?;
        Ok(Self::with_transport(Arc::new(transport), &tokens))
    }

    pub fn with_transport(transport: Arc<dyn GraphqlTransport>, tokens: &AccessTokenCell) -> Self {
        Self {
            transport,
            cache: Mutex::new(QueryCache::new(tokens)),
        }
    }

    pub fn cached_query_count(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, QueryCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn query<T: DeserializeOwned>(
        &self,
        request: GraphqlRequest,
        payload: &str,
    ) -> Result<T, CoreError> {
        let key = CacheKey::for_request(&request);
        let operation = request.operation;
        let cached = self.cache().get(&key);
        let data = match cached {
            Some(data) => data,
            None => {
                let generation = self.cache().generation();
                let data = self
                    .transport
                    .execute(request)
                    .await
                    .map_err(|error| normalize_gateway_error(error, operation, false))?;
                self.cache().insert(key, data.clone(), generation);
                data
            }
        };
        decode(data, payload)
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        request: GraphqlRequest,
        payload: &str,
    ) -> Result<T, CoreError> {
        let operation = request.operation;
        let data = self
            .transport
            .execute(request)
            .await
            .map_err(|error| normalize_gateway_error(error, operation, true))?;
        self.cache().clear("mutation completed");
        info!(operation, "gateway mutation completed");
        decode(data, payload)
    }

    pub async fn domain_allowlists(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<DomainAllowlistEntry>, CoreError> {
        let variables = match search.map(str::trim).filter(|value| !value.is_empty()) {
            Some(search) => json!({ "filter": { "search": search } }),
            None => json!({}),
        };
        let response: DomainAllowlistsResponse = self
            .query(
                GraphqlRequest::new("GetDomainAllowlists", GET_DOMAIN_ALLOWLISTS, variables),
                "domain allowlist",
            )
            .await?;
        Ok(response.domain_allowlists)
    }

    pub async fn create_domain(&self, domain: &str) -> Result<DomainAllowlistEntry, CoreError> {
        let response: CreateDomainResponse = self
            .mutate(
                GraphqlRequest::new(
                    "CreateDomainAllowlist",
                    CREATE_DOMAIN_ALLOWLIST,
                    json!({ "input": { "domain": domain } }),
                ),
                "createDomainAllowlist",
            )
            .await?;
        required(response.create_domain_allowlist.domain_allowlist, "created domain")
    }

    pub async fn update_domain(
        &self,
        id: &DomainId,
        domain: &str,
    ) -> Result<DomainAllowlistEntry, CoreError> {
        let response: UpdateDomainResponse = self
            .mutate(
                GraphqlRequest::new(
                    "UpdateDomainAllowlist",
                    UPDATE_DOMAIN_ALLOWLIST,
                    json!({ "input": { "id": id.numeric()?, "domain": domain } }),
                ),
                "updateDomainAllowlist",
            )
            .await?;
        required(response.update_domain_allowlist.domain_allowlist, "updated domain")
    }

    pub async fn delete_domain(&self, id: &DomainId) -> Result<(), CoreError> {
        let response: DeleteDomainResponse = self
            .mutate(
                GraphqlRequest::new(
                    "DeleteDomainAllowlist",
                    DELETE_DOMAIN_ALLOWLIST,
                    json!({ "input": { "id": id.numeric()? } }),
                ),
                "deleteDomainAllowlist",
            )
            .await?;
        mutation_outcome(
            response.delete_domain_allowlist.success,
            None,
            "Failed to delete domain",
        )
    }

    pub async fn users(
        &self,
        workspace_id: &WorkspaceId,
        query: &UserQuery,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<UserRecord>, CoreError> {
        let mut filter = Map::new();
        if let Some(search) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            filter.insert("search".to_owned(), json!(search));
        }
        if let Some(role) = query.role.as_query_value() {
            filter.insert("role".to_owned(), json!(role));
        }

        let response: UsersResponse = self
            .query(
                GraphqlRequest::new(
                    "GetUsers",
                    GET_USERS,
                    json!({
                        "filter": Value::Object(filter),
                        "workspaceId": workspace_id,
                        "first": first,
                        "after": after,
                    }),
                ),
                "users",
            )
            .await?;
        Ok(response.users.into())
    }

    pub async fn me(&self, last_workspace_id: Option<&WorkspaceId>) -> Result<Principal, CoreError> {
        let response: MeResponse = self
            .query(
                GraphqlRequest::new(
                    "GetMe",
                    GET_ME,
                    json!({ "lastWorkspaceId": last_workspace_id }),
                ),
                "current principal",
            )
            .await?;
        response.me.ok_or_else(|| {
            CoreError::Identity("gateway did not return the signed-in principal".to_owned())
        })
    }

    pub async fn workspaces(
        &self,
        search: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<WorkspaceSummary>, CoreError> {
        let response: WorkspacesResponse = self
            .query(
                GraphqlRequest::new(
                    "GetWorkspaces",
                    GET_WORKSPACES,
                    json!({ "filter": search_filter(search), "first": first, "after": after }),
                ),
                "workspaces",
            )
            .await?;
        Ok(response.workspaces.into())
    }

    pub async fn workspace_preferences(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<WorkspacePreferencesRecord>, CoreError> {
        let response: PreferencesResponse = self
            .query(
                GraphqlRequest::new(
                    "GetWorkspacePreferences",
                    GET_WORKSPACE_PREFERENCES,
                    json!({ "workspaceId": workspace_id }),
                ),
                "workspace preferences",
            )
            .await?;
        Ok(response.workspace_preferences)
    }

    pub async fn invite_user(&self, invite: &UserInvite) -> Result<UserRecord, CoreError> {
        let response: InviteUserResponse = self
            .mutate(
                GraphqlRequest::new(
                    "InviteUser",
                    INVITE_USER,
                    json!({
                        "input": {
                            "workspaceId": invite.workspace_id,
                            "email": invite.email,
                            "role": invite.role,
                        }
                    }),
                ),
                "inviteUser",
            )
            .await?;
        required(response.invite_user.user, "invited user")
    }

    pub async fn update_user(&self, update: &UserUpdate) -> Result<UserRecord, CoreError> {
        let response: UpdateUserResponse = self
            .mutate(
                GraphqlRequest::new(
                    "UpdateUser",
                    UPDATE_USER,
                    json!({
                        "input": {
                            "id": update.user_id.numeric()?,
                            "givenName": update.given_name,
                            "surname": update.surname,
                            "workspaceRole": {
                                "workspaceId": update.workspace_id.numeric()?,
                                "role": update.role,
                            },
                            "workspaceId": update.workspace_id,
                        }
                    }),
                ),
                "updateUser",
            )
            .await?;
        required(response.update_user.user, "updated user")
    }

    pub async fn delete_user_role(
        &self,
        user_id: &UserId,
        workspace_id: &WorkspaceId,
    ) -> Result<(), CoreError> {
        let response: DeleteUserRoleResponse = self
            .mutate(
                GraphqlRequest::new(
                    "DeleteUserRole",
                    DELETE_USER_ROLE,
                    json!({
                        "input": {
                            "userId": user_id.numeric()?,
                            "workspaceId": workspace_id.numeric()?,
                        }
                    }),
                ),
                "deleteUserRole",
            )
            .await?;
        let outcome = response.delete_user_role;
        mutation_outcome(outcome.success, outcome.error, "Failed to remove user")
    }

    pub async fn create_workspace(
        &self,
        draft: &WorkspaceDraft,
    ) -> Result<WorkspaceSummary, CoreError> {
        let mut input = Map::new();
        input.insert("name".to_owned(), json!(draft.name));
        if let Some(domain) = &draft.domain {
            input.insert("domain".to_owned(), json!(domain));
        }
        if let Some(logo_url) = &draft.logo_url {
            input.insert("logoUrl".to_owned(), json!(logo_url));
        }
        if !draft.owners.is_empty() {
            input.insert("owners".to_owned(), id_list(&draft.owners)?);
        }
        if !draft.users.is_empty() {
            input.insert("users".to_owned(), id_list(&draft.users)?);
        }
        input.insert("addCreatorAsOwner".to_owned(), json!(false));

        let response: CreateWorkspaceResponse = self
            .mutate(
                GraphqlRequest::new(
                    "CreateWorkspace",
                    CREATE_WORKSPACE,
                    json!({ "input": Value::Object(input) }),
                ),
                "createWorkspace",
            )
            .await?;
        let outcome = response.create_workspace;
        mutation_outcome(outcome.success, outcome.error, "Failed to create workspace")?;
        required(outcome.workspace, "created workspace")
    }

    pub async fn update_preferences(
        &self,
        workspace_id: &WorkspaceId,
        preferences: &PreferenceMap,
    ) -> Result<Option<WorkspacePreferencesRecord>, CoreError> {
        let response: UpdatePreferencesResponse = self
            .mutate(
                GraphqlRequest::new(
                    "UpdateWorkspacePreferences",
                    UPDATE_WORKSPACE_PREFERENCES,
                    json!({
                        "input": {
                            "workspaceId": workspace_id,
                            "preferences": preferences.to_blob(),
                        }
                    }),
                ),
                "updatePreferences",
            )
            .await?;
        Ok(response.update_preferences.preferences)
    }
}

fn search_filter(search: &str) -> Value {
    let search = search.trim();
    if search.is_empty() {
        json!({})
    } else {
        json!({ "search": search })
    }
}

fn id_list(ids: &[UserId]) -> Result<Value, CoreError> {
    ids.iter()
        .map(|id| id.numeric().map(|id| json!({ "id": id })))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn decode<T: DeserializeOwned>(data: Value, payload: &str) -> Result<T, CoreError> {
    serde_json::from_value(data).map_err(|error| {
        CoreError::DependencyUnavailable(format!("failed to decode {payload} payload: {error}"))
    })
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::Mutation(format!("gateway did not return the {what}")))
}

fn mutation_outcome(success: bool, error: Option<String>, fallback: &str) -> Result<(), CoreError> {
    if success {
        return Ok(());
    }
    let message = error
        .map(|message| message.trim().to_owned())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| fallback.to_owned());
    Err(CoreError::Mutation(message))
}

fn gateway_error_is_auth(message: &str) -> bool {
    let value = message.to_ascii_lowercase();
    value.contains("unauthorized")
        || value.contains("unauthenticated")
        || value.contains("jwt")
        || value.contains("token expired")
}

/// Server-reported errors stay inline for mutations and become fetch
/// failures for queries; authentication failures always ask for a new sign-in.
fn normalize_gateway_error(error: CoreError, operation: &str, is_mutation: bool) -> CoreError {
    match error {
        CoreError::Mutation(message) | CoreError::DependencyUnavailable(message)
            if gateway_error_is_auth(&message) =>
        {
            warn!(operation, "gateway rejected credentials");
            CoreError::Identity(message)
        }
        CoreError::Mutation(message) if !is_mutation => {
            warn!(operation, error = %message, "gateway query failed");
            CoreError::DependencyUnavailable(format!("{operation} failed: {message}"))
        }
        CoreError::DependencyUnavailable(message) => {
            warn!(operation, error = %message, "gateway request failed");
            CoreError::DependencyUnavailable(message)
        }
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(connection: Connection<T>) -> Self {
        Page::new(
            connection.edges.into_iter().map(|edge| edge.node).collect(),
            connection.page_info,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainAllowlistsResponse {
    #[serde(default)]
    domain_allowlists: Vec<DomainAllowlistEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainPayload {
    domain_allowlist: Option<DomainAllowlistEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDomainResponse {
    create_domain_allowlist: DomainPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDomainResponse {
    update_domain_allowlist: DomainPayload,
}

#[derive(Debug, Deserialize)]
struct SuccessPayload {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteDomainResponse {
    delete_domain_allowlist: SuccessPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteUserRoleResponse {
    delete_user_role: SuccessPayload,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Connection<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct WorkspacesResponse {
    workspaces: Connection<WorkspaceSummary>,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    me: Option<Principal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesResponse {
    workspace_preferences: Option<WorkspacePreferencesRecord>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    user: Option<UserRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InviteUserResponse {
    invite_user: UserPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserResponse {
    update_user: UserPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateWorkspaceResponse {
    create_workspace: CreateWorkspacePayload,
}

#[derive(Debug, Deserialize)]
struct CreateWorkspacePayload {
    success: bool,
    #[serde(default)]
    workspace: Option<WorkspaceSummary>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePreferencesResponse {
    update_preferences: PreferencesPayload,
}

#[derive(Debug, Deserialize)]
struct PreferencesPayload {
    preferences: Option<WorkspacePreferencesRecord>,
}
