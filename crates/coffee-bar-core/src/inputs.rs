//! Mutation and query inputs shared by the gateway client and the screens.

use crate::identifiers::{UserId, WorkspaceId};
use crate::models::WorkspaceRole;
use crate::table::users::RoleFilter;

/// Server-side filter for the per-workspace user listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: RoleFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInvite {
    pub workspace_id: WorkspaceId,
    pub email: String,
    pub role: WorkspaceRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub given_name: String,
    pub surname: String,
    pub role: WorkspaceRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceDraft {
    pub name: String,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
    pub owners: Vec<UserId>,
    pub users: Vec<UserId>,
}
