pub mod auth_gate;
pub mod backend;
pub mod editors;
pub mod picker;
pub mod screens;
pub mod search_list;
pub mod search_tasks;

#[cfg(test)]
mod testing;

pub use auth_gate::{
    login_error_message, render_gate, AccessDenied, AuthGate, GateFailure, GateState,
};
pub use backend::{AdminBackend, WorkspaceSource};
pub use editors::{
    DomainForm, EditUserForm, Editor, EditorForm, EditorPhase, InviteUserForm, SubmitOutcome,
    WorkspaceForm,
};
pub use picker::{picker_lines, route_key, PickerCursor, PickerInput, TerminalPicker};
pub use screens::{DomainsScreen, PreferencesScreen, UsersScreen};
pub use search_list::{
    FetchKind, FetchOutcome, FetchRequest, ListPhase, PaginatedSearchList, ScrollMetrics,
    SearchItem, Selection, DEFAULT_SCROLL_THRESHOLD_PX, DEFAULT_SEARCH_DEBOUNCE,
};
pub use search_tasks::{PageSource, SearchController};
