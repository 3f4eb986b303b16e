use std::sync::Arc;

use async_trait::async_trait;
use coffee_bar_core::{CoreError, Page};
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::search_list::{
    FetchOutcome, FetchRequest, ListPhase, PaginatedSearchList, ScrollMetrics, SearchItem,
};

const SEARCH_EVENT_CHANNEL_CAPACITY: usize = 16;

/// Remote collection browsed by a search list.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(
        &self,
        query: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<T>, CoreError>;
}

async fn run_search_fetch_task<T>(
    source: Arc<dyn PageSource<T>>,
    request: FetchRequest,
    sender: mpsc::Sender<FetchOutcome<T>>,
) {
    let result = source
        .fetch_page(&request.query, request.first, request.after.as_deref())
        .await;
    let _ = sender.send(FetchOutcome { request, result }).await;
}

/// Drives a [`PaginatedSearchList`] against a [`PageSource`], running each
/// fetch as a background task and applying results on [`Self::tick`].
pub struct SearchController<T> {
    list: PaginatedSearchList<T>,
    source: Arc<dyn PageSource<T>>,
    sender: mpsc::Sender<FetchOutcome<T>>,
    receiver: mpsc::Receiver<FetchOutcome<T>>,
    status_warning: Option<String>,
}

impl<T: SearchItem> SearchController<T> {
    pub fn new(list: PaginatedSearchList<T>, source: Arc<dyn PageSource<T>>) -> Self {
        let (sender, receiver) = mpsc::channel(SEARCH_EVENT_CHANNEL_CAPACITY);
        Self {
            list,
            source,
            sender,
            receiver,
            status_warning: None,
        }
    }

    pub fn list(&self) -> &PaginatedSearchList<T> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PaginatedSearchList<T> {
        &mut self.list
    }

    pub fn status_warning(&self) -> Option<&str> {
        self.status_warning.as_deref()
    }

    pub fn open(&mut self) {
        let request = self.list.open();
        self.spawn_fetch(request);
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.list.set_query(text, Instant::now());
    }

    pub fn load_more(&mut self) -> bool {
        let request = self.list.load_more();
        self.dispatch(request)
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics, threshold: u32) -> bool {
        let request = self.list.on_scroll(metrics, threshold);
        self.dispatch(request)
    }

    pub fn retry(&mut self) -> bool {
        let request = self.list.retry();
        self.dispatch(request)
    }

    /// Applies finished fetches and starts a debounced query that became due.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.receiver.try_recv() {
            changed |= self.list.apply(outcome);
        }
        let due = self.list.poll_due(Instant::now());
        changed |= self.dispatch(due);
        changed
    }

    /// Waits for the next fetch result or debounce deadline, then ticks.
    pub async fn wait_for_change(&mut self) -> bool {
        let deadline = self.list.next_deadline();
        let outcome = tokio::select! {
            outcome = self.receiver.recv() => outcome,
            _ = sleep_until_deadline(deadline) => None,
        };
        let applied = outcome.is_some_and(|outcome| self.list.apply(outcome));
        self.tick() || applied
    }

    /// Waits until no fetch is in flight or pending.
    pub async fn settle(&mut self) -> &ListPhase {
        while self.list.is_fetching() || self.list.next_deadline().is_some() {
            self.wait_for_change().await;
        }
        self.list.phase()
    }

    fn dispatch(&mut self, request: Option<FetchRequest>) -> bool {
        match request {
            Some(request) => {
                self.spawn_fetch(request);
                true
            }
            None => false,
        }
    }

    fn spawn_fetch(&mut self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        match TokioHandle::try_current() {
            Ok(handle) => {
                self.status_warning = None;
                handle.spawn(async move {
                    run_search_fetch_task(source, request, sender).await;
                });
            }
            Err(_) => {
                self.status_warning =
                    Some("search unavailable: tokio runtime is not active".to_owned());
                self.list.apply(FetchOutcome {
                    request,
                    result: Err(CoreError::DependencyUnavailable(
                        "tokio runtime is not active".to_owned(),
                    )),
                });
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_list::{FetchKind, DEFAULT_SEARCH_DEBOUNCE};
    use coffee_bar_core::{PageInfo, WorkspaceId, WorkspaceSummary};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSource {
        calls: Mutex<Vec<(String, Option<String>)>>,
        delay: Duration,
    }

    impl RecordingSource {
        async fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl PageSource<WorkspaceSummary> for RecordingSource {
        async fn fetch_page(
            &self,
            query: &str,
            first: u32,
            after: Option<&str>,
        ) -> Result<Page<WorkspaceSummary>, CoreError> {
            self.calls
                .lock()
                .await
                .push((query.to_owned(), after.map(str::to_owned)));
            tokio::time::sleep(self.delay).await;
            let offset: u32 = after.and_then(|cursor| cursor.parse().ok()).unwrap_or(0);
            let items = (offset..offset + first)
                .map(|id| WorkspaceSummary {
                    id: WorkspaceId::new(id.to_string()),
                    name: format!("{query} {id}"),
                    domain: None,
                })
                .collect();
            Ok(Page::new(
                items,
                PageInfo {
                    has_next_page: offset + first < 200,
                    end_cursor: Some((offset + first).to_string()),
                },
            ))
        }
    }

    fn controller(source: Arc<RecordingSource>) -> SearchController<WorkspaceSummary> {
        SearchController::new(
            PaginatedSearchList::workspaces(50, DEFAULT_SEARCH_DEBOUNCE),
            source,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn typing_then_scrolling_issues_one_search_and_one_next_page() {
        let source = Arc::new(RecordingSource::default());
        let mut controller = controller(source.clone());

        for text in ["a", "ac", "acm", "acme"] {
            controller.set_query(text);
            tokio::time::advance(Duration::from_millis(100)).await;
            controller.tick();
        }
        controller.settle().await;
        assert_eq!(source.calls().await, vec![("acme".to_owned(), None)]);
        assert_eq!(controller.list().items().len(), 50);

        let bottom = ScrollMetrics {
            offset: 950,
            viewport: 50,
            content: 1_000,
        };
        assert!(controller.on_scroll(bottom, 50));
        assert!(!controller.on_scroll(bottom, 50));
        controller.settle().await;

        assert_eq!(
            source.calls().await,
            vec![
                ("acme".to_owned(), None),
                ("acme".to_owned(), Some("50".to_owned())),
            ]
        );
        assert_eq!(controller.list().items().len(), 100);
        assert_eq!(controller.list().items()[50].name, "acme 50");
    }

    #[tokio::test(start_paused = true)]
    async fn a_query_typed_during_a_slow_fetch_wins() {
        let source = Arc::new(RecordingSource {
            delay: Duration::from_secs(2),
            ..RecordingSource::default()
        });
        let mut controller = controller(source.clone());
        controller.open();

        controller.set_query("beta");
        controller.settle().await;

        assert_eq!(controller.list().query(), "beta");
        assert!(controller
            .list()
            .items()
            .iter()
            .all(|item| item.name.starts_with("beta")));
        assert_eq!(source.calls().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_failure_refetches_the_first_page() {
        struct FlakySource {
            failures: Mutex<u32>,
        }

        #[async_trait]
        impl PageSource<WorkspaceSummary> for FlakySource {
            async fn fetch_page(
                &self,
                _query: &str,
                _first: u32,
                _after: Option<&str>,
            ) -> Result<Page<WorkspaceSummary>, CoreError> {
                let mut failures = self.failures.lock().await;
                if *failures > 0 {
                    *failures -= 1;
                    return Err(CoreError::DependencyUnavailable("offline".to_owned()));
                }
                Ok(Page::new(Vec::new(), PageInfo::default()))
            }
        }

        let mut controller = SearchController::new(
            PaginatedSearchList::workspaces(20, DEFAULT_SEARCH_DEBOUNCE),
            Arc::new(FlakySource {
                failures: Mutex::new(1),
            }),
        );
        controller.open();
        assert!(matches!(
            controller.settle().await,
            ListPhase::Error {
                failed: FetchKind::FirstPage,
                ..
            }
        ));

        assert!(controller.retry());
        assert_eq!(controller.settle().await, &ListPhase::Loaded);
        assert_eq!(
            controller.list().empty_state_text().as_deref(),
            Some("Start typing to search workspaces")
        );
    }
}
