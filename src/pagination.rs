//! Paginated list synchronization.
//!
//! A [`PaginationController`] owns one list screen's data: the items fetched
//! so far, the last page index, whether the backend has more, and the
//! [`ScreenState`]. It publishes a [`ListSnapshot`] after every change.
//!
//! Invariants:
//!
//! - at most one page request is outstanding; calls made while one is in
//!   flight are ignored rather than queued,
//! - the page index only advances when a page arrives, so a failed
//!   `load_more` retries the same page,
//! - an id appears at most once in `items`,
//! - a `load_*` future dropped before it completes (timeout, lost `select!`,
//!   aborted task) counts as a failed request, so the list never stays
//!   stuck in Loading,
//! - after [`PaginationController::dispose`] nothing is mutated.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::screen_state::{ScreenEvent, ScreenState, StateHolder, StateSubscriber};

/// Something with a stable backend identifier.
pub trait Keyed {
    fn key(&self) -> i64;
}

/// Backend collaborator that serves one kind of list page by page.
pub trait PageSource: Send + Sync {
    type Item: Keyed + Clone + Send + Sync + 'static;

    /// Fetch page `page` (zero-based) of at most `page_size` items.
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Self::Item>, ClientError>> + Send;
}

impl<S: PageSource> PageSource for Arc<S> {
    type Item = S::Item;

    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Self::Item>, ClientError>> + Send {
        (**self).fetch_page(page, page_size)
    }
}

/// Everything a list UI needs to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSnapshot<T> {
    pub state: ScreenState,

    /// Accumulated items in fetch order.
    pub items: Vec<T>,

    /// Index of the last page that arrived successfully.
    pub page: u32,

    pub page_size: u32,

    /// Whether the last page was full, i.e. another one may exist.
    pub has_more: bool,

    /// A page request is outstanding.
    pub in_flight: bool,
}

impl<T> ListSnapshot<T> {
    fn empty(page_size: u32) -> Self {
        Self {
            state: ScreenState::Idle,
            items: Vec::new(),
            page: 0,
            page_size,
            has_more: false,
            in_flight: false,
        }
    }
}

/// What a `load_*` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page arrived and was merged.
    Loaded {
        page: u32,
        received: usize,
        added: usize,
    },
    /// Nothing was requested: a request was already in flight, there is no
    /// next page, or the screen is unauthorized or disposed.
    Ignored,
    /// The request failed. The snapshot carries the user-visible state.
    Failed(ClientError),
    /// The controller was disposed while the request was outstanding.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Initial,
    Next,
}

/// Owner of one paginated list.
pub struct PaginationController<S: PageSource> {
    source: S,
    page_size: u32,
    state: StateHolder<ListSnapshot<S::Item>>,
    disposed: watch::Sender<bool>,
}

impl<S: PageSource> PaginationController<S> {
    /// A page size of zero is treated as one.
    pub fn new(source: S, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let (disposed, _) = watch::channel(false);
        Self {
            source,
            page_size,
            state: StateHolder::new(ListSnapshot::empty(page_size)),
            disposed,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn subscribe(&self) -> StateSubscriber<ListSnapshot<S::Item>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ListSnapshot<S::Item> {
        self.state.snapshot()
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    /// Fetch page 0 and replace everything known so far.
    pub async fn load_initial(&self) -> LoadOutcome {
        self.load(Request::Initial).await
    }

    /// Fetch the page after the last one that arrived and append it.
    pub async fn load_more(&self) -> LoadOutcome {
        self.load(Request::Next).await
    }

    /// Cancel any outstanding request and freeze the snapshot.
    pub fn dispose(&self) {
        if !self.disposed.send_replace(true) {
            debug!("pagination controller disposed");
        }
    }

    /// Put a fresher copy of an item in place, or append it if unknown.
    pub fn upsert(&self, item: S::Item) {
        if self.is_disposed() {
            return;
        }
        self.state.update(|s| {
            let key = item.key();
            match s.items.iter_mut().find(|existing| existing.key() == key) {
                Some(existing) => *existing = item,
                None => s.items.push(item),
            }
            true
        });
    }

    /// Drop an item from the list. Returns whether it was present.
    pub fn remove(&self, key: i64) -> bool {
        if self.is_disposed() {
            return false;
        }
        let mut removed = false;
        self.state.update(|s| {
            let before = s.items.len();
            s.items.retain(|item| item.key() != key);
            removed = s.items.len() != before;
            removed
        });
        removed
    }

    /// Record that the backend rejected the session outside a page fetch.
    pub fn mark_unauthorized(&self) {
        if self.is_disposed() {
            return;
        }
        self.state.update(|s| match s.state.apply(ScreenEvent::AuthRejected) {
            Ok(next) => {
                s.state = next;
                true
            }
            Err(_) => false,
        });
    }

    async fn load(&self, request: Request) -> LoadOutcome {
        let Some(guard) = self.begin(request) else {
            debug!(?request, "page request ignored");
            return LoadOutcome::Ignored;
        };
        let page = guard.page;

        debug!(?request, page, page_size = self.page_size, "requesting page");

        let result = tokio::select! {
            result = self.source.fetch_page(page, self.page_size) => result,
            () = wait_disposed(self.disposed.subscribe()) => {
                guard.disarm();
                debug!(page, "page request cancelled");
                return LoadOutcome::Cancelled;
            }
        };

        guard.complete(result)
    }

    /// Check the guard and mark the request in flight, atomically.
    fn begin(&self, request: Request) -> Option<InFlight<'_, S>> {
        if self.is_disposed() {
            return None;
        }

        let mut requested = None;
        self.state.update(|s| {
            if s.in_flight {
                return false;
            }
            let page = match request {
                Request::Initial => 0,
                Request::Next => {
                    let resumable = matches!(s.state, ScreenState::Loaded | ScreenState::Error(_));
                    if !resumable || !s.has_more {
                        return false;
                    }
                    s.page + 1
                }
            };
            let Ok(next) = s.state.apply(ScreenEvent::FetchStarted) else {
                return false;
            };
            s.state = next;
            s.in_flight = true;
            requested = Some(page);
            true
        });
        requested.map(|page| InFlight {
            pager: self,
            request,
            page,
            armed: true,
        })
    }

    fn finish(
        &self,
        request: Request,
        page: u32,
        result: Result<Vec<S::Item>, ClientError>,
    ) -> LoadOutcome {
        let page_size = self.page_size;
        let mut outcome = LoadOutcome::Cancelled;

        self.state.update(|s| {
            if self.is_disposed() {
                return false;
            }
            s.in_flight = false;

            // Rejected by a concurrent mutation while this page was loading.
            if s.state.is_terminal() {
                outcome = LoadOutcome::Ignored;
                return true;
            }

            match result {
                Ok(items) => {
                    let received = items.len();
                    if request == Request::Initial {
                        s.items.clear();
                    }
                    let added = merge_by_key(&mut s.items, items);
                    s.page = page;
                    s.has_more = received == page_size as usize;
                    s.state = s
                        .state
                        .apply(ScreenEvent::FetchSucceeded)
                        .unwrap_or(ScreenState::Loaded);

                    info!(page, received, added, has_more = s.has_more, "page loaded");
                    outcome = LoadOutcome::Loaded {
                        page,
                        received,
                        added,
                    };
                }
                Err(err) => {
                    if request == Request::Initial {
                        s.items.clear();
                        s.page = 0;
                        s.has_more = false;
                    }
                    let event = if err.is_unauthorized() {
                        ScreenEvent::AuthRejected
                    } else {
                        ScreenEvent::FetchFailed(err.user_message())
                    };
                    s.state = s
                        .state
                        .apply(event)
                        .unwrap_or_else(|_| ScreenState::Error(err.user_message()));

                    warn!(page, error = %err, "page request failed");
                    outcome = LoadOutcome::Failed(err);
                }
            }
            true
        });

        outcome
    }
}

/// An outstanding page request. Dropping it unfinished records the request
/// as failed and clears the in-flight flag.
struct InFlight<'a, S: PageSource> {
    pager: &'a PaginationController<S>,
    request: Request,
    page: u32,
    armed: bool,
}

impl<S: PageSource> InFlight<'_, S> {
    fn complete(mut self, result: Result<Vec<S::Item>, ClientError>) -> LoadOutcome {
        self.armed = false;
        self.pager.finish(self.request, self.page, result)
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S: PageSource> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if !self.armed || self.pager.is_disposed() {
            return;
        }
        debug!(request = ?self.request, page = self.page, "page request dropped before completion");
        self.pager.finish(
            self.request,
            self.page,
            Err(ClientError::Network("request interrupted".to_string())),
        );
    }
}

/// Append `incoming` to `items`, replacing entries whose key is already
/// present. Returns how many new keys were appended.
fn merge_by_key<T: Keyed>(items: &mut Vec<T>, incoming: Vec<T>) -> usize {
    let mut index: HashMap<i64, usize> = items
        .iter()
        .enumerate()
        .map(|(pos, item)| (item.key(), pos))
        .collect();

    let mut added = 0;
    for item in incoming {
        match index.get(&item.key()) {
            Some(&pos) => items[pos] = item,
            None => {
                index.insert(item.key(), items.len());
                items.push(item);
                added += 1;
            }
        }
    }
    added
}

/// Resolves once the disposed flag is set. Never resolves if the controller
/// is dropped first.
async fn wait_disposed(mut disposed: watch::Receiver<bool>) {
    loop {
        if *disposed.borrow_and_update() {
            return;
        }
        if disposed.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        label: String,
    }

    impl Keyed for Row {
        fn key(&self) -> i64 {
            self.id
        }
    }

    fn rows(ids: std::ops::Range<i64>) -> Vec<Row> {
        ids.map(|id| Row {
            id,
            label: format!("row {id}"),
        })
        .collect()
    }

    /// Replays scripted responses and records which pages were requested.
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Vec<Row>, ClientError>>>,
        requested: Mutex<Vec<u32>>,
        hold_next: Mutex<bool>,
        release: Notify,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Row>, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            })
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }

        /// Make the next fetch wait until `release` is notified.
        fn hold_next(&self) {
            *self.hold_next.lock().unwrap() = true;
        }
    }

    impl PageSource for ScriptedSource {
        type Item = Row;

        async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<Vec<Row>, ClientError> {
            self.requested.lock().unwrap().push(page);
            let hold = std::mem::take(&mut *self.hold_next.lock().unwrap());
            if hold {
                self.release.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn network_error() -> ClientError {
        ClientError::Network("connection reset".to_string())
    }

    #[tokio::test]
    async fn test_full_first_page_has_more() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        let outcome = pager.load_initial().await;

        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                page: 0,
                received: 10,
                added: 10
            }
        );
        let snap = pager.snapshot();
        assert!(snap.has_more);
        assert_eq!(snap.state, ScreenState::Loaded);
        assert_eq!(snap.items.len(), 10);
        assert!(!snap.in_flight);
    }

    #[tokio::test]
    async fn test_short_first_page_has_no_more() {
        let source = ScriptedSource::new(vec![Ok(rows(0..7))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        pager.load_initial().await;

        let snap = pager.snapshot();
        assert!(!snap.has_more);
        assert_eq!(snap.items.len(), 7);
        assert_eq!(pager.load_more().await, LoadOutcome::Ignored);
        assert_eq!(source.requested(), vec![0]);
    }

    #[tokio::test]
    async fn test_initial_failure_leaves_list_empty() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10)), Err(network_error())]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        pager.load_initial().await;
        let outcome = pager.load_initial().await;

        assert_eq!(outcome, LoadOutcome::Failed(network_error()));
        let snap = pager.snapshot();
        assert!(snap.items.is_empty());
        assert!(!snap.has_more);
        assert!(snap.state.error_message().is_some());
    }

    #[tokio::test]
    async fn test_failed_load_more_retries_same_page() {
        let source = ScriptedSource::new(vec![
            Ok(rows(0..10)),
            Err(network_error()),
            Ok(rows(10..20)),
        ]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        pager.load_initial().await;

        let failed = pager.load_more().await;
        assert!(matches!(failed, LoadOutcome::Failed(ClientError::Network(_))));
        let snap = pager.snapshot();
        assert_eq!(snap.page, 0);
        assert_eq!(snap.items.len(), 10);
        assert!(snap.state.error_message().is_some());

        let retried = pager.load_more().await;
        assert!(matches!(retried, LoadOutcome::Loaded { page: 1, .. }));
        assert_eq!(source.requested(), vec![0, 1, 1]);

        let snap = pager.snapshot();
        assert_eq!(snap.page, 1);
        assert_eq!(snap.items.len(), 20);
        assert_eq!(snap.state, ScreenState::Loaded);
    }

    #[tokio::test]
    async fn test_overlapping_page_does_not_duplicate() {
        let mut second = rows(9..19);
        second[0].label = "row 9 (edited)".to_string();
        let source = ScriptedSource::new(vec![Ok(rows(0..10)), Ok(second)]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        pager.load_initial().await;
        let outcome = pager.load_more().await;

        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                page: 1,
                received: 10,
                added: 9
            }
        );
        let snap = pager.snapshot();
        let ids: Vec<i64> = snap.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, (0..19).collect::<Vec<_>>());
        assert_eq!(snap.items[9].label, "row 9 (edited)");
    }

    #[tokio::test]
    async fn test_concurrent_load_more_is_coalesced() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10)), Ok(rows(10..20))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);
        pager.load_initial().await;

        source.hold_next();
        let (first, second) = tokio::join!(pager.load_more(), async {
            let outcome = pager.load_more().await;
            source.release.notify_one();
            outcome
        });

        assert!(matches!(first, LoadOutcome::Loaded { page: 1, .. }));
        assert_eq!(second, LoadOutcome::Ignored);
        assert_eq!(source.requested(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_an_error() {
        let source = ScriptedSource::new(vec![Err(ClientError::Unauthorized), Ok(rows(0..10))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        let outcome = pager.load_initial().await;

        assert_eq!(outcome, LoadOutcome::Failed(ClientError::Unauthorized));
        assert_eq!(pager.snapshot().state, ScreenState::Unauthorized);
        assert_eq!(pager.load_initial().await, LoadOutcome::Ignored);
        assert_eq!(source.requested(), vec![0]);
    }

    #[tokio::test]
    async fn test_dispose_cancels_outstanding_request() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10)), Ok(rows(10..20))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);
        pager.load_initial().await;
        let before = pager.snapshot();

        source.hold_next();
        let (outcome, ()) = tokio::join!(pager.load_more(), async { pager.dispose() });

        assert_eq!(outcome, LoadOutcome::Cancelled);
        let after = pager.snapshot();
        assert_eq!(after.items, before.items);
        assert_eq!(after.page, 0);
        assert_eq!(pager.load_initial().await, LoadOutcome::Ignored);

        pager.upsert(Row {
            id: 99,
            label: "late".to_string(),
        });
        assert_eq!(pager.snapshot().items.len(), 10);
    }

    #[tokio::test]
    async fn test_timed_out_load_can_be_retried() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        source.hold_next();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), pager.load_initial()).await;
        assert!(timed_out.is_err());

        let snap = pager.snapshot();
        assert!(!snap.in_flight);
        assert!(snap.state.error_message().is_some());

        let outcome = pager.load_initial().await;
        assert!(matches!(outcome, LoadOutcome::Loaded { page: 0, received: 10, .. }));
        assert_eq!(source.requested(), vec![0, 0]);
        assert_eq!(pager.snapshot().state, ScreenState::Loaded);
    }

    #[tokio::test]
    async fn test_dropped_load_more_retries_same_page() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10)), Ok(rows(10..20))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);
        pager.load_initial().await;

        source.hold_next();
        tokio::select! {
            _ = pager.load_more() => panic!("held fetch completed"),
            () = tokio::task::yield_now() => {}
        }

        let snap = pager.snapshot();
        assert!(!snap.in_flight);
        assert_eq!(snap.items.len(), 10);
        assert_eq!(snap.page, 0);

        let outcome = pager.load_more().await;
        assert!(matches!(outcome, LoadOutcome::Loaded { page: 1, .. }));
        assert_eq!(source.requested(), vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn test_page_arriving_after_rejection_is_discarded() {
        let source = ScriptedSource::new(vec![Ok(rows(0..10)), Ok(rows(10..20))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);
        pager.load_initial().await;
        let before = pager.snapshot();

        source.hold_next();
        let (outcome, ()) = tokio::join!(pager.load_more(), async {
            pager.mark_unauthorized();
            source.release.notify_one();
        });

        assert_eq!(outcome, LoadOutcome::Ignored);
        let after = pager.snapshot();
        assert_eq!(after.items, before.items);
        assert_eq!(after.page, 0);
        assert_eq!(after.state, ScreenState::Unauthorized);
        assert!(!after.in_flight);
        assert_eq!(source.requested(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_load_more_before_initial_is_ignored() {
        let source = ScriptedSource::new(vec![]);
        let pager = PaginationController::new(Arc::clone(&source), 10);

        assert_eq!(pager.load_more().await, LoadOutcome::Ignored);
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let source = ScriptedSource::new(vec![Ok(rows(0..3))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);
        pager.load_initial().await;

        pager.upsert(Row {
            id: 1,
            label: "updated".to_string(),
        });
        assert_eq!(pager.snapshot().items[1].label, "updated");
        assert_eq!(pager.snapshot().items.len(), 3);

        assert!(pager.remove(0));
        assert!(!pager.remove(0));
        let ids: Vec<i64> = pager.snapshot().items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_subscribers_see_loading_then_loaded() {
        let source = ScriptedSource::new(vec![Ok(rows(0..2))]);
        let pager = PaginationController::new(Arc::clone(&source), 10);
        let mut sub = pager.subscribe();

        source.hold_next();
        let (_, seen) = tokio::join!(pager.load_initial(), async {
            let loading = sub.changed().await.map(|s| s.state);
            source.release.notify_one();
            let loaded = sub.changed().await.map(|s| s.state);
            (loading, loaded)
        });

        assert_eq!(seen.0, Some(ScreenState::Loading));
        assert_eq!(seen.1, Some(ScreenState::Loaded));
    }
}
