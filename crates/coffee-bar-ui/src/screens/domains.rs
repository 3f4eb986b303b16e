use coffee_bar_core::{CoreError, DomainAllowlistEntry, DomainId, EntityTable};
use tracing::warn;

use crate::backend::AdminBackend;
use crate::screens::{fetch_error_line, render_rows};

/// Domain allowlist: server search plus the client-side table.
#[derive(Debug, Clone)]
pub struct DomainsScreen {
    search: Option<String>,
    table: EntityTable<DomainAllowlistEntry>,
    load_error: Option<CoreError>,
    action_error: Option<String>,
}

impl Default for DomainsScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainsScreen {
    pub fn new() -> Self {
        Self {
            search: None,
            table: EntityTable::new(Vec::new()),
            load_error: None,
            action_error: None,
        }
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.search = search.filter(|value| !value.trim().is_empty());
    }

    pub fn table(&self) -> &EntityTable<DomainAllowlistEntry> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut EntityTable<DomainAllowlistEntry> {
        &mut self.table
    }

    pub fn load_error(&self) -> Option<&CoreError> {
        self.load_error.as_ref()
    }

    pub fn action_error(&self) -> Option<&str> {
        self.action_error.as_deref()
    }

    /// Refetches the allowlist. Failures keep the rows already shown.
    pub async fn load(&mut self, backend: &dyn AdminBackend) -> bool {
        match backend.domain_allowlists(self.search.as_deref()).await {
            Ok(entries) => {
                self.table.replace_rows(entries);
                self.load_error = None;
                true
            }
            Err(error) => {
                warn!(error = %error, "failed to load the domain allowlist");
                self.load_error = Some(error);
                false
            }
        }
    }

    pub async fn delete(&mut self, backend: &dyn AdminBackend, id: &DomainId) -> bool {
        self.action_error = None;
        match backend.delete_domain(id).await {
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
        let view = self.table.view();
        if view.is_empty() {
            lines.push("No domains found".to_owned());
        } else {
            lines.extend(render_rows(&view));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{domain, StubBackend};
    use coffee_bar_core::{DomainColumn, SortDirection};

    #[tokio::test]
    async fn failed_refetch_keeps_the_loaded_rows() {
        let backend = StubBackend::default();
        backend.push_domains(Ok(vec![domain("1", "acme.io"), domain("2", "beta.io")]));
        backend.push_domains(Err(CoreError::DependencyUnavailable("offline".to_owned())));
        let mut screen = DomainsScreen::new();

        assert!(screen.load(&backend).await);
        assert!(!screen.load(&backend).await);
        assert_eq!(screen.table().rows().len(), 2);
        assert!(screen.render()[0].starts_with("Failed to load"));
    }

    #[tokio::test]
    async fn delete_refetches_and_rejections_stay_inline() {
        let backend = StubBackend::default();
        backend.push_delete(Ok(()));
        backend.push_domains(Ok(vec![domain("2", "beta.io")]));
        backend.push_delete(Err(CoreError::Mutation("Domain in use".to_owned())));
        let mut screen = DomainsScreen::new();
        screen.set_search(Some("  ".to_owned()));

        assert!(screen.delete(&backend, &DomainId::new("1")).await);
        assert!(!screen.delete(&backend, &DomainId::new("2")).await);
        assert_eq!(screen.action_error(), Some("Domain in use"));
        assert_eq!(
            backend.calls(),
            vec![
                "delete_domain 1".to_owned(),
                "domain_allowlists ".to_owned(),
                "delete_domain 2".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn view_respects_filter_and_sort() {
        let backend = StubBackend::default();
        backend.push_domains(Ok(vec![
            domain("1", "beta.io"),
            domain("2", "acme.io"),
            domain("3", "other.dev"),
        ]));
        let mut screen = DomainsScreen::new();
        screen.load(&backend).await;
        screen.table_mut().set_filter(".IO");
        screen
            .table_mut()
            .sort_by(DomainColumn::Domain, SortDirection::Ascending);

        let lines = screen.render();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("acme.io"));
        assert!(lines[2].starts_with("beta.io"));
    }
}
