use coffee_bar_core::{CoreError, PageInfo, RoleFilter, UserId, UserQuery, UserTable, WorkspaceId};
use tracing::warn;

use crate::backend::AdminBackend;
use crate::screens::{fetch_error_line, render_rows};

pub const USERS_PAGE_SIZE: u32 = 50;

/// Users of the selected workspace.
#[derive(Debug, Clone)]
pub struct UsersScreen {
    workspace_id: WorkspaceId,
    query: UserQuery,
    table: UserTable,
    page_info: PageInfo,
    page_size: u32,
    load_error: Option<CoreError>,
    action_error: Option<String>,
}

impl UsersScreen {
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            query: UserQuery::default(),
            table: UserTable::new(Vec::new()),
            page_info: PageInfo::default(),
            page_size: USERS_PAGE_SIZE,
            load_error: None,
            action_error: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    pub fn query(&self) -> &UserQuery {
        &self.query
    }

    /// Server-side search and role filter. The role also narrows the loaded rows.
    pub fn set_query(&mut self, search: Option<String>, role: RoleFilter) {
        self.query = UserQuery {
            search: search.filter(|value| !value.trim().is_empty()),
            role: role.clone(),
        };
        self.table.set_role_filter(role);
    }

    pub fn table(&self) -> &UserTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut UserTable {
        &mut self.table
    }

    pub fn has_more(&self) -> bool {
        self.page_info.has_next_page && self.page_info.end_cursor.is_some()
    }

    pub fn load_error(&self) -> Option<&CoreError> {
        self.load_error.as_ref()
    }

    pub fn action_error(&self) -> Option<&str> {
        self.action_error.as_deref()
    }

    /// Fetches the first page and replaces the loaded rows.
    pub async fn load(&mut self, backend: &dyn AdminBackend) -> bool {
        match backend
            .users(&self.workspace_id, &self.query, self.page_size, None)
            .await
        {
            Ok(page) => {
                self.table.table_mut().replace_rows(page.items);
                self.page_info = page.page_info;
                self.load_error = None;
                true
            }
            Err(error) => {
                warn!(workspace = %self.workspace_id, error = %error, "failed to load users");
                self.load_error = Some(error);
                false
            }
        }
    }

    /// Appends the next page. No-op once the server reports no further pages.
    pub async fn load_more(&mut self, backend: &dyn AdminBackend) -> bool {
        let Some(cursor) = self
            .page_info
            .end_cursor
            .clone()
            .filter(|_| self.page_info.has_next_page)
        else {
            return false;
        };
        match backend
            .users(&self.workspace_id, &self.query, self.page_size, Some(&cursor))
            .await
        {
            Ok(page) => {
                let mut rows = self.table.table().rows().to_vec();
                rows.extend(page.items);
                self.table.table_mut().replace_rows(rows);
                self.page_info = page.page_info;
                self.load_error = None;
                true
            }
            Err(error) => {
                warn!(workspace = %self.workspace_id, error = %error, "failed to load more users");
                self.load_error = Some(error);
                false
            }
        }
    }

    /// Loads every remaining page.
    pub async fn load_all(&mut self, backend: &dyn AdminBackend) -> bool {
        if !self.load(backend).await {
            return false;
        }
        while self.has_more() {
            if !self.load_more(backend).await {
                return false;
            }
        }
        true
    }

    pub async fn remove_user(&mut self, backend: &dyn AdminBackend, user_id: &UserId) -> bool {
        self.action_error = None;
        match backend.remove_user(user_id, &self.workspace_id).await {
            Ok(()) => {
                self.load(backend).await;
                true
            }
            Err(error) => {
                self.action_error = Some(error.to_string());
                false
            }
        }
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(error) = &self.load_error {
            lines.push(fetch_error_line(error));
        }
        if let Some(error) = &self.action_error {
            lines.push(error.clone());
        }
        let stats = self.table.stats();
        lines.push(format!(
            "{} users, {} owners, {} admins, {} onboarded, {} pending invites",
            stats.total, stats.owners, stats.admins, stats.onboarded, stats.pending
        ));
        let view = self.table.view();
        if view.is_empty() {
            lines.push("No users found".to_owned());
        } else {
            lines.extend(render_rows(&view));
        }
        if self.has_more() {
            lines.push("More users available".to_owned());
        }
        lines
    }
}
