use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::identifiers::{DomainId, UserId, WorkspaceId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    User,
    Unknown(String),
}

impl WorkspaceRole {
    pub const ASSIGNABLE: [WorkspaceRole; 3] = [Self::Owner, Self::Admin, Self::User];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Owner => "Owner",
            Self::Admin => "Admin",
            Self::User => "User",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn is_assignable(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Parses operator input against the closed set; free text is rejected.
    pub fn parse_assignable(value: &str) -> Result<Self, CoreError> {
        match Self::from(value.to_owned()) {
            Self::Unknown(raw) => Err(CoreError::Configuration(format!(
                "Unknown role `{raw}`. Expected one of: owner, admin, user."
            ))),
            role => Ok(role),
        }
    }
}

impl From<String> for WorkspaceRole {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::Unknown(value),
        }
    }
}

impl From<WorkspaceRole> for String {
    fn from(value: WorkspaceRole) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Unknown(String),
}

impl InviteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Unknown(raw) => raw.as_str(),
        }
    }
}

impl From<String> for InviteStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            _ => Self::Unknown(value),
        }
    }
}

impl From<InviteStatus> for String {
    fn from(value: InviteStatus) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: UserId,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub given_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub surname: String,
}

impl PersonRef {
    pub fn display_name(&self) -> String {
        join_name(&self.given_name, &self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAllowlistEntry {
    pub id: DomainId,
    pub domain: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub created_by: Option<PersonRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub given_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub surname: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub is_onboarded: bool,
    #[serde(default)]
    pub role: Option<WorkspaceRole>,
    #[serde(default)]
    pub invite_status: Option<InviteStatus>,
    #[serde(default)]
    pub last_login_ts: Option<String>,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        join_name(&self.given_name, &self.surname)
    }

    /// Users without an explicit workspace role are plain members.
    pub fn effective_role(&self) -> WorkspaceRole {
        self.role.clone().unwrap_or(WorkspaceRole::User)
    }

    pub fn status_label(&self) -> String {
        if self.is_onboarded {
            return "Active".to_owned();
        }
        self.invite_status
            .as_ref()
            .map(|status| status.as_str().to_owned())
            .unwrap_or_else(|| "Inactive".to_owned())
    }

    pub fn is_pending_invite(&self) -> bool {
        matches!(self.invite_status, Some(InviteStatus::Pending))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl WorkspaceSummary {
    pub fn subtitle(&self) -> &str {
        self.domain
            .as_deref()
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
            .unwrap_or("No domain")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub given_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub surname: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceSummary>,
}

impl Principal {
    pub fn display_name(&self) -> String {
        join_name(&self.given_name, &self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePreferencesRecord {
    pub id: String,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub create_ts: Option<String>,
    #[serde(default)]
    pub update_ts: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }
}

/// GraphQL sends `null` for unset names.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn join_name(given_name: &str, surname: &str) -> String {
    let given_name = given_name.trim();
    let surname = surname.trim();
    match (given_name.is_empty(), surname.is_empty()) {
        (false, false) => format!("{given_name} {surname}"),
        (false, true) => given_name.to_owned(),
        (true, false) => surname.to_owned(),
        (true, true) => String::new(),
    }
}
