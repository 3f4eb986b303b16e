use super::{display_date, EntityTable, SortKey, TableColumn, TableRow};
use crate::error::CoreError;
use crate::models::{UserRecord, WorkspaceRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Email,
    GivenName,
    Surname,
    Role,
    Status,
    LastLogin,
}

impl TableColumn for UserColumn {
    fn header(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::GivenName => "First Name",
            Self::Surname => "Last Name",
            Self::Role => "Role",
            Self::Status => "Status",
            Self::LastLogin => "Last Login",
        }
    }
}

impl TableRow for UserRecord {
    type Column = UserColumn;
    const COLUMNS: &'static [UserColumn] = &[
        UserColumn::Email,
        UserColumn::GivenName,
        UserColumn::Surname,
        UserColumn::Role,
        UserColumn::Status,
        UserColumn::LastLogin,
    ];

    fn filter_fields(&self) -> Vec<String> {
        vec![
            self.email.clone(),
            self.given_name.clone(),
            self.surname.clone(),
        ]
    }

    fn sort_key(&self, column: UserColumn) -> SortKey {
        match column {
            UserColumn::Email => SortKey::text(&self.email),
            UserColumn::GivenName => SortKey::text(&self.given_name),
            UserColumn::Surname => SortKey::text(&self.surname),
            UserColumn::Role => SortKey::text(self.effective_role().as_str()),
            UserColumn::Status => SortKey::text(&self.status_label()),
            UserColumn::LastLogin => SortKey::timestamp(self.last_login_ts.as_deref()),
        }
    }

    fn cell(&self, column: UserColumn) -> String {
        match column {
            UserColumn::Email => self.email.clone(),
            UserColumn::GivenName => self.given_name.clone(),
            UserColumn::Surname => self.surname.clone(),
            UserColumn::Role => self.effective_role().as_str().to_owned(),
            UserColumn::Status => self
                .invite_status
                .as_ref()
                .map(|status| status.as_str().to_owned())
                .unwrap_or_else(|| "active".to_owned()),
            UserColumn::LastLogin => self
                .last_login_ts
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .map(display_date)
                .unwrap_or_else(|| "Never".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RoleFilter {
    #[default]
    All,
    Role(WorkspaceRole),
}

impl RoleFilter {
    /// `all` (or blank) disables the filter; anything else must be an assignable role.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        WorkspaceRole::parse_assignable(trimmed).map(Self::Role)
    }

    pub fn matches(&self, user: &UserRecord) -> bool {
        match self {
            Self::All => true,
            Self::Role(role) => user.effective_role() == *role,
        }
    }

    /// Value sent as the gateway's `role` filter; `None` for all roles.
    pub fn as_query_value(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Role(role) => Some(role.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub owners: usize,
    pub admins: usize,
    pub onboarded: usize,
    pub pending: usize,
}

impl UserStats {
    pub fn collect<'a>(users: impl IntoIterator<Item = &'a UserRecord>) -> Self {
        users.into_iter().fold(Self::default(), |mut stats, user| {
            stats.total += 1;
            match user.effective_role() {
                WorkspaceRole::Owner => stats.owners += 1,
                WorkspaceRole::Admin => stats.admins += 1,
                _ => {}
            }
            if user.is_onboarded {
                stats.onboarded += 1;
            }
            if user.is_pending_invite() {
                stats.pending += 1;
            }
            stats
        })
    }
}

/// Users of one workspace with the client-side role filter layered on the text filter.
#[derive(Debug, Clone)]
pub struct UserTable {
    table: EntityTable<UserRecord>,
    role_filter: RoleFilter,
}

impl UserTable {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            table: EntityTable::new(users),
            role_filter: RoleFilter::All,
        }
    }

    pub fn table(&self) -> &EntityTable<UserRecord> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut EntityTable<UserRecord> {
        &mut self.table
    }

    pub fn role_filter(&self) -> &RoleFilter {
        &self.role_filter
    }

    pub fn set_role_filter(&mut self, role_filter: RoleFilter) {
        self.role_filter = role_filter;
    }

    pub fn view(&self) -> Vec<&UserRecord> {
        self.table
            .view_where(|user| self.role_filter.matches(user))
    }

    /// Stats cover every loaded user, independent of the active filters.
    pub fn stats(&self) -> UserStats {
        UserStats::collect(self.table.rows())
    }

    pub fn can_export(&self) -> bool {
        !self.view().is_empty()
    }

    pub fn export_csv(&self) -> Option<String> {
        super::csv::render(&self.view())
    }
}
