use std::time::Duration;

use coffee_bar_core::{CoreError, Page, WorkspaceSummary};
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_SCROLL_THRESHOLD_PX: u32 = 50;

/// Row shown by a [`PaginatedSearchList`].
pub trait SearchItem: Clone + Send + 'static {
    fn item_id(&self) -> &str;
    fn label(&self) -> String;
    fn subtitle(&self) -> Option<String> {
        None
    }
}

impl SearchItem for WorkspaceSummary {
    fn item_id(&self) -> &str {
        self.id.as_str()
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn subtitle(&self) -> Option<String> {
        Some(WorkspaceSummary::subtitle(self).to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    FirstPage,
    NextPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub kind: FetchKind,
    pub query: String,
    pub first: u32,
    pub after: Option<String>,
}

#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub request: FetchRequest,
    pub result: Result<Page<T>, CoreError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Loading,
    Loaded,
    LoadingMore,
    Error { message: String, failed: FetchKind },
}

/// Viewport position of a scrollable list, in any consistent unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub offset: u32,
    pub viewport: u32,
    pub content: u32,
}

impl ScrollMetrics {
    pub fn remaining(&self) -> u32 {
        self.content
            .saturating_sub(self.offset.saturating_add(self.viewport))
    }
}

#[derive(Debug, Clone)]
struct PendingQuery {
    text: String,
    due_at: Instant,
}

/// Debounced, cursor-paginated search over a remote collection.
///
/// Every query change bumps the generation; responses carrying an older
/// generation are dropped without touching the loaded rows. At most one
/// fetch is in flight at a time.
#[derive(Debug, Clone)]
pub struct PaginatedSearchList<T> {
    noun: &'static str,
    page_size: u32,
    debounce: Duration,
    query: String,
    input: String,
    pending: Option<PendingQuery>,
    items: Vec<T>,
    cursor: Option<String>,
    has_more: bool,
    generation: u64,
    in_flight: Option<FetchRequest>,
    phase: ListPhase,
    selection: Option<Selection>,
}

impl<T: SearchItem> PaginatedSearchList<T> {
    pub fn new(noun: &'static str, page_size: u32, debounce: Duration) -> Self {
        Self {
            noun,
            page_size: page_size.max(1),
            debounce,
            query: String::new(),
            input: String::new(),
            pending: None,
            items: Vec::new(),
            cursor: None,
            has_more: false,
            generation: 0,
            in_flight: None,
            phase: ListPhase::Idle,
            selection: None,
        }
    }

    /// Issues the first page for the current query without waiting.
    pub fn open(&mut self) -> FetchRequest {
        self.pending = None;
        self.begin_first_page(self.input.clone())
    }

    /// Records typed text. The fetch is deferred until [`Self::poll_due`]
    /// observes a quiet interval with no further calls.
    pub fn set_query(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.input = text.clone();
        if self.pending.is_none() && text == self.query && self.phase != ListPhase::Idle {
            return;
        }
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
        self.pending = Some(PendingQuery {
            text,
            due_at: now + self.debounce,
        });
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due_at)
    }

    /// Fires the debounced first-page fetch once the quiet interval elapsed.
    pub fn poll_due(&mut self, now: Instant) -> Option<FetchRequest> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.due_at);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        Some(self.begin_first_page(pending.text))
    }

    fn begin_first_page(&mut self, text: String) -> FetchRequest {
        self.generation = self.generation.wrapping_add(1);
        self.query = text;
        self.items.clear();
        self.cursor = None;
        self.has_more = false;
        self.phase = ListPhase::Loading;
        let request = FetchRequest {
            generation: self.generation,
            kind: FetchKind::FirstPage,
            query: self.query.clone(),
            first: self.page_size,
            after: None,
        };
        self.in_flight = Some(request.clone());
        request
    }

    /// Requests the page after the stored cursor. No-op while a fetch is in
    /// flight, before the first page arrived, or when the server reported
    /// no further pages.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        if self.in_flight.is_some() || self.pending.is_some() || !self.has_more {
            return None;
        }
        let after = self.cursor.clone()?;
        self.phase = ListPhase::LoadingMore;
        let request = FetchRequest {
            generation: self.generation,
            kind: FetchKind::NextPage,
            query: self.query.clone(),
            first: self.page_size,
            after: Some(after),
        };
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Loads the next page once the viewport is within `threshold` of the end.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, threshold: u32) -> Option<FetchRequest> {
        if metrics.remaining() > threshold {
            return None;
        }
        self.load_more()
    }

    /// Applies a completed fetch. Returns whether visible state changed.
    pub fn apply(&mut self, outcome: FetchOutcome<T>) -> bool {
        let FetchOutcome { request, result } = outcome;
        if request.generation != self.generation
            || self.in_flight.as_ref() != Some(&request)
        {
            debug!(
                list = self.noun,
                query = %request.query,
                "discarding superseded search response"
            );
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                match request.kind {
                    FetchKind::FirstPage => self.items = page.items,
                    FetchKind::NextPage => self.items.extend(page.items),
                }
                self.cursor = page.page_info.end_cursor;
                self.has_more = page.page_info.has_next_page;
                self.phase = ListPhase::Loaded;
            }
            Err(error) => {
                warn!(
                    list = self.noun,
                    query = %request.query,
                    error = %error,
                    "search fetch failed"
                );
                self.phase = ListPhase::Error {
                    message: error.to_string(),
                    failed: request.kind,
                };
            }
        }
        true
    }

    /// Re-issues the fetch that failed.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        let ListPhase::Error { failed, .. } = &self.phase else {
            return None;
        };
        match failed {
            FetchKind::FirstPage => Some(self.begin_first_page(self.query.clone())),
            FetchKind::NextPage => self.load_more(),
        }
    }

    pub fn select(&mut self, item_id: &str) -> Option<Selection> {
        let item = self.items.iter().find(|item| item.item_id() == item_id)?;
        let selection = Selection {
            id: item.item_id().to_owned(),
            label: item.label(),
        };
        self.selection = Some(selection.clone());
        Some(selection)
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> &ListPhase {
        &self.phase
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn empty_state_text(&self) -> Option<String> {
        if !self.items.is_empty() || self.phase != ListPhase::Loaded {
            return None;
        }
        if self.query.trim().is_empty() {
            Some(format!("Start typing to search {}", self.noun))
        } else {
            Some(format!("No {} found", self.noun))
        }
    }
}

impl PaginatedSearchList<WorkspaceSummary> {
    pub fn workspaces(page_size: u32, debounce: Duration) -> Self {
        Self::new("workspaces", page_size, debounce)
    }
}
