pub mod error;
pub mod identifiers;
pub mod inputs;
pub mod models;
pub mod preferences;
pub mod table;
pub mod validation;

pub use error::CoreError;
pub use identifiers::{DomainId, UserId, WorkspaceId};
pub use inputs::{UserInvite, UserQuery, UserUpdate, WorkspaceDraft};
pub use models::{
    DomainAllowlistEntry, InviteStatus, Page, PageInfo, PersonRef, Principal, UserRecord,
    WorkspacePreferencesRecord, WorkspaceRole, WorkspaceSummary,
};
pub use preferences::{format_value, parse_preference_value, PreferenceMap};
pub use table::domains::DomainColumn;
pub use table::users::{RoleFilter, UserColumn, UserStats, UserTable};
pub use table::{EntityTable, SortDirection, SortKey, TableColumn, TableRow};
pub use validation::{FieldError, FormField};
