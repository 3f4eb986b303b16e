use coffee_bar_core::{
    format_value, CoreError, FieldError, PreferenceMap, WorkspaceId, WorkspacePreferencesRecord,
};
use tracing::{info, warn};

use crate::backend::AdminBackend;
use crate::screens::fetch_error_line;

/// Preference entries of one workspace, edited locally and saved as a whole.
#[derive(Debug, Clone)]
pub struct PreferencesScreen {
    workspace_id: WorkspaceId,
    map: PreferenceMap,
    record: Option<WorkspacePreferencesRecord>,
    dirty: bool,
    load_error: Option<CoreError>,
    save_error: Option<String>,
}

impl PreferencesScreen {
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            map: PreferenceMap::new(),
            record: None,
            dirty: false,
            load_error: None,
            save_error: None,
        }
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    pub fn preferences(&self) -> &PreferenceMap {
        &self.map
    }

    pub fn record(&self) -> Option<&WorkspacePreferencesRecord> {
        self.record.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn load_error(&self) -> Option<&CoreError> {
        self.load_error.as_ref()
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    /// Replaces local entries with the stored blob. Unsaved edits are dropped.
    pub async fn load(&mut self, backend: &dyn AdminBackend) -> bool {
        match backend.workspace_preferences(&self.workspace_id).await {
            Ok(record) => {
                self.map = PreferenceMap::parse_blob(
                    record
                        .as_ref()
                        .and_then(|record| record.preferences.as_deref()),
                );
                self.record = record;
                self.dirty = false;
                self.load_error = None;
                true
            }
            Err(error) => {
                warn!(workspace = %self.workspace_id, error = %error, "failed to load preferences");
                self.load_error = Some(error);
                false
            }
        }
    }

    pub fn add(&mut self, key: &str, raw_value: &str) -> Result<(), FieldError> {
        self.map.add(key, raw_value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn edit(&mut self, key: &str, raw_value: &str) -> Result<(), FieldError> {
        self.map.update(key, raw_value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.map.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    /// Sends the whole map, then refetches. A rejected save keeps the local edits.
    pub async fn save(&mut self, backend: &dyn AdminBackend) -> bool {
        self.save_error = None;
        match backend
            .save_preferences(&self.workspace_id, &self.map)
            .await
        {
            Ok(()) => {
                info!(workspace = %self.workspace_id, entries = self.map.len(), "saved preferences");
                self.load(backend).await;
                true
            }
            Err(error) => {
                warn!(workspace = %self.workspace_id, error = %error, "failed to save preferences");
                self.save_error = Some(error.to_string());
                false
            }
        }
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(error) = &self.load_error {
            lines.push(fetch_error_line(error));
        }
        if let Some(error) = &self.save_error {
            lines.push(format!("Save failed: {error}"));
        }
        if self.map.is_empty() {
            lines.push("No preferences set".to_owned());
        }
        for (key, value) in self.map.iter() {
            lines.push(format!("{key} = {}", format_value(value)));
        }
        if self.dirty {
            lines.push("Unsaved changes".to_owned());
        }
        lines
    }
}
