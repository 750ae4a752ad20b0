//! The paged collection controller.
//!
//! Every setter mutates the [`ViewState`], advances the request generation,
//! publishes a `loading` snapshot, and issues exactly one fetch. A response
//! is applied only if its generation is still current when it completes;
//! otherwise it is dropped without touching the view (last write wins).

use std::cell::Cell;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use desk_sync::{ErrorHook, ErrorInfo, Generation, GenerationCounter, Observers, Subscription};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace, warn};

use crate::config::CollectionConfig;
use crate::error::{CollectionError, Result};
use crate::service::QueryService;
use crate::types::{CollectionSnapshot, Filters, PageResult, ViewState};

/// Controller for one remote-paginated list screen.
///
/// Fetches are spawned on the ambient tokio runtime, so setters must be
/// called from within one.
pub struct PagedCollection<Q: QueryService> {
    inner: Arc<Inner<Q>>,
}

struct Inner<Q: QueryService> {
    service: Q,
    generations: GenerationCounter,
    state: Mutex<Shared<Q::Item>>,
    listeners: Observers<CollectionSnapshot<Q::Item>>,
    // Newest generation handed to listeners. Reentrant so a listener may
    // call a setter.
    published: ReentrantMutex<Cell<Generation>>,
    selection_listeners: Observers<BTreeSet<String>>,
    error_hook: Mutex<Option<ErrorHook>>,
    closed: AtomicBool,
}

struct Shared<T> {
    view: ViewState,
    items: Arc<[T]>,
    total_count: u64,
    selection: BTreeSet<String>,
}

impl<T> Shared<T> {
    fn snapshot(&self, generation: Generation) -> CollectionSnapshot<T> {
        CollectionSnapshot {
            items: Arc::clone(&self.items),
            total_count: self.total_count,
            page: self.view.page,
            page_size: self.view.page_size,
            sort_key: self.view.sort_key.clone(),
            sort_descending: self.view.sort_descending,
            filters: self.view.filters.clone(),
            loading: self.view.loading,
            last_error: self.view.last_error.clone(),
            generation,
        }
    }
}

impl<Q: QueryService> PagedCollection<Q> {
    /// Create a controller with an empty first page. No fetch is issued until
    /// [`start`](Self::start) or a setter is called.
    pub fn new(service: Q, config: CollectionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                generations: GenerationCounter::new(),
                state: Mutex::new(Shared {
                    view: ViewState::from_config(&config),
                    items: Arc::from(Vec::new()),
                    total_count: 0,
                    selection: BTreeSet::new(),
                }),
                listeners: Observers::new(),
                published: ReentrantMutex::new(Cell::new(Generation::ZERO)),
                selection_listeners: Observers::new(),
                error_hook: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Install the upward error hook, called for every applied fetch failure.
    #[must_use]
    pub fn with_error_hook(self, hook: ErrorHook) -> Self {
        *self.inner.error_hook.lock() = Some(hook);
        self
    }

    /// Issue the initial fetch for the configured view.
    pub fn start(&self) -> Result<Generation> {
        self.issue("start", |_| {})
    }

    /// Move to page `page` (starting at 1).
    pub fn set_page(&self, page: u32) -> Result<Generation> {
        if page == 0 {
            return Err(CollectionError::InvalidPage(page));
        }
        self.issue("set_page", |view| view.page = page)
    }

    /// Change the number of rows per page. The current page is kept.
    pub fn set_page_size(&self, page_size: u32) -> Result<Generation> {
        if page_size == 0 {
            return Err(CollectionError::InvalidPageSize(page_size));
        }
        self.issue("set_page_size", |view| view.page_size = page_size)
    }

    /// Change page and page size together with a single fetch.
    pub fn set_page_and_size(&self, page: u32, page_size: u32) -> Result<Generation> {
        if page == 0 {
            return Err(CollectionError::InvalidPage(page));
        }
        if page_size == 0 {
            return Err(CollectionError::InvalidPageSize(page_size));
        }
        self.issue("set_page_and_size", |view| {
            view.page = page;
            view.page_size = page_size;
        })
    }

    /// Change the sort. `None` clears it.
    pub fn set_sort(&self, key: Option<String>, descending: bool) -> Result<Generation> {
        self.issue("set_sort", |view| {
            view.sort_key = key;
            view.sort_descending = descending;
        })
    }

    /// Replace the filters.
    pub fn set_filters(&self, filters: Filters) -> Result<Generation> {
        self.issue("set_filters", |view| view.filters = filters)
    }

    /// Re-fetch the current view without changing it.
    pub fn refresh(&self) -> Result<Generation> {
        self.issue("refresh", |_| {})
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CollectionSnapshot<Q::Item> {
        let generation = self.inner.generations.current();
        self.inner.state.lock().snapshot(generation)
    }

    /// Register a listener for every published snapshot.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<CollectionSnapshot<Q::Item>>
    where
        F: Fn(&CollectionSnapshot<Q::Item>) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    /// Replace the set of selected row keys. Never triggers a fetch.
    pub fn set_selection<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selection: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        self.inner.state.lock().selection.clone_from(&selection);
        self.inner.selection_listeners.notify(&selection);
    }

    /// Currently selected row keys.
    #[must_use]
    pub fn selection(&self) -> BTreeSet<String> {
        self.inner.state.lock().selection.clone()
    }

    /// Register a listener for selection changes.
    pub fn subscribe_selection<F>(&self, listener: F) -> Subscription<BTreeSet<String>>
    where
        F: Fn(&BTreeSet<String>) + Send + Sync + 'static,
    {
        self.inner.selection_listeners.subscribe(listener)
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Tear the controller down.
    ///
    /// In-flight responses are discarded, listeners are dropped, and every
    /// later setter returns [`CollectionError::Closed`].
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let generation = self.inner.generations.advance();
        self.inner.listeners.clear();
        self.inner.selection_listeners.clear();
        debug!(%generation, "collection closed");
    }

    fn issue<F>(&self, reason: &'static str, mutate: F) -> Result<Generation>
    where
        F: FnOnce(&mut ViewState),
    {
        if self.is_closed() {
            return Err(CollectionError::Closed);
        }

        let (generation, request, snapshot) = {
            let mut shared = self.inner.state.lock();
            mutate(&mut shared.view);
            shared.view.loading = true;
            let generation = self.inner.generations.advance();
            (generation, shared.view.request(), shared.snapshot(generation))
        };

        debug!(
            %generation,
            reason,
            limit = request.limit,
            offset = request.offset,
            "issuing page fetch"
        );
        self.inner.publish(&snapshot);

        let limit = request.limit;
        let fetch = self.inner.service.fetch_page(request);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = fetch.await;
            inner.apply(generation, limit, result);
        });

        Ok(generation)
    }
}

impl<Q: QueryService> Inner<Q> {
    /// Notify listeners unless a newer generation has already been published.
    fn publish(&self, snapshot: &CollectionSnapshot<Q::Item>) {
        let published = self.published.lock();
        if snapshot.generation < published.get() {
            trace!(
                generation = %snapshot.generation,
                published = %published.get(),
                "skipping superseded snapshot"
            );
            return;
        }
        published.set(snapshot.generation);
        self.listeners.notify(snapshot);
    }

    fn apply(
        &self,
        generation: Generation,
        limit: u32,
        result: std::result::Result<PageResult<Q::Item>, ErrorInfo>,
    ) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(%generation, "discarding response after close");
            return;
        }

        let result = result.and_then(|page| check_limit(page, limit));

        let (snapshot, failure) = {
            let mut shared = self.state.lock();
            if !self.generations.is_current(generation) {
                debug!(
                    %generation,
                    current = %self.generations.current(),
                    "discarding stale page response"
                );
                return;
            }

            shared.view.loading = false;
            let failure = match result {
                Ok(page) => {
                    debug!(
                        %generation,
                        total = page.total_count,
                        items = page.items.len(),
                        "page applied"
                    );
                    shared.items = Arc::from(page.items);
                    shared.total_count = page.total_count;
                    shared.view.last_error = None;
                    None
                }
                Err(err) => {
                    warn!(%generation, error = %err, "page fetch failed");
                    shared.view.last_error = Some(err.clone());
                    Some(err)
                }
            };
            (shared.snapshot(generation), failure)
        };

        self.publish(&snapshot);

        if let Some(err) = failure {
            let hook = self.error_hook.lock().clone();
            if let Some(hook) = hook {
                hook(&err);
            }
        }
    }
}

fn check_limit<T>(
    page: PageResult<T>,
    limit: u32,
) -> std::result::Result<PageResult<T>, ErrorInfo> {
    if page.items.len() > limit as usize {
        return Err(ErrorInfo::protocol(format!(
            "backend returned {} items for a page of {limit}",
            page.items.len()
        )));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::PageFuture;
    use crate::types::PageRequest;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    /// Answers every request immediately with `limit` numbered rows.
    struct Immediate {
        calls: Arc<AtomicUsize>,
        total: u64,
    }

    impl QueryService for Immediate {
        type Item = u64;

        fn fetch_page(&self, request: PageRequest) -> PageFuture<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let total = self.total;
            Box::pin(async move {
                let end = (request.offset + u64::from(request.limit)).min(total);
                Ok::<_, ErrorInfo>(PageResult::new(total, (request.offset..end).collect()))
            })
        }
    }

    /// Always fails with the configured error.
    struct Failing(ErrorInfo);

    impl QueryService for Failing {
        type Item = u64;

        fn fetch_page(&self, _request: PageRequest) -> PageFuture<u64> {
            let err = self.0.clone();
            Box::pin(async move { Err::<PageResult<u64>, _>(err) })
        }
    }

    /// Returns more items than requested.
    struct Oversized;

    impl QueryService for Oversized {
        type Item = u64;

        fn fetch_page(&self, request: PageRequest) -> PageFuture<u64> {
            Box::pin(async move {
                Ok::<_, ErrorInfo>(PageResult::new(100, (0..u64::from(request.limit) + 1).collect()))
            })
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn immediate(total: u64) -> (PagedCollection<Immediate>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = Immediate {
            calls: Arc::clone(&calls),
            total,
        };
        (PagedCollection::new(service, CollectionConfig::default()), calls)
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_empty_and_idle() {
        let (collection, calls) = immediate(42);
        let snapshot = collection.snapshot();

        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.page, 1);
        assert_eq!(snapshot.page_size, 10);
        assert!(!snapshot.loading);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_loads_first_page() {
        let (collection, calls) = immediate(42);

        collection.start().unwrap();
        assert!(collection.snapshot().loading);
        settle().await;

        let snapshot = collection.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.total_count, 42);
        assert_eq!(&snapshot.items[..], &(0..10).collect::<Vec<_>>()[..]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_page_fetches_offset() {
        let (collection, _) = immediate(42);

        collection.set_page(5).unwrap();
        settle().await;

        let snapshot = collection.snapshot();
        assert_eq!(snapshot.page, 5);
        assert_eq!(&snapshot.items[..], &[40, 41]);
    }

    #[tokio::test]
    async fn test_each_setter_issues_one_fetch_with_new_generation() {
        let (collection, calls) = immediate(42);

        let g1 = collection.set_page(2).unwrap();
        let g2 = collection.set_page_size(20).unwrap();
        let g3 = collection.set_sort(Some("name".into()), false).unwrap();
        let g4 = collection.set_filters(Filters::new()).unwrap();
        let g5 = collection.refresh().unwrap();
        let g6 = collection.set_page_and_size(1, 5).unwrap();

        assert!(g1 < g2 && g2 < g3 && g3 < g4 && g4 < g5 && g5 < g6);
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        settle().await;
        let snapshot = collection.snapshot();
        assert_eq!(snapshot.generation, g6);
        assert_eq!(snapshot.items.len(), 5);
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_without_fetch() {
        let (collection, calls) = immediate(42);

        assert_eq!(collection.set_page(0), Err(CollectionError::InvalidPage(0)));
        assert_eq!(
            collection.set_page_size(0),
            Err(CollectionError::InvalidPageSize(0))
        );
        assert_eq!(
            collection.set_page_and_size(1, 0),
            Err(CollectionError::InvalidPageSize(0))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_sets_last_error_and_calls_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let collection = PagedCollection::new(
            Failing(ErrorInfo::auth("token expired")),
            CollectionConfig::default(),
        )
        .with_error_hook(Arc::new(move |err: &ErrorInfo| sink.lock().push(err.clone())));

        collection.start().unwrap();
        settle().await;

        let snapshot = collection.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.last_error, Some(ErrorInfo::auth("token expired")));
        assert_eq!(seen.lock().len(), 1);
        assert!(seen.lock()[0].is_auth());
    }

    #[tokio::test]
    async fn test_oversized_page_is_protocol_error() {
        let collection = PagedCollection::new(Oversized, CollectionConfig::default());

        collection.start().unwrap();
        settle().await;

        let snapshot = collection.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(
            snapshot.last_error.map(|e| e.kind),
            Some(desk_sync::ErrorKind::Protocol)
        );
    }

    #[tokio::test]
    async fn test_page_not_clamped_past_end() {
        let (collection, _) = immediate(15);

        collection.set_page(4).unwrap();
        settle().await;

        let snapshot = collection.snapshot();
        assert_eq!(snapshot.page, 4);
        assert!(snapshot.items.is_empty());
        assert!(snapshot.is_past_end());
    }

    #[tokio::test]
    async fn test_close_rejects_setters_and_discards_in_flight() {
        let (collection, _) = immediate(42);

        collection.start().unwrap();
        collection.close();
        settle().await;

        assert!(collection.is_closed());
        assert_eq!(collection.set_page(2), Err(CollectionError::Closed));
        assert_eq!(collection.refresh(), Err(CollectionError::Closed));
        assert!(collection.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn test_selection_does_not_fetch() {
        let (collection, calls) = immediate(42);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let sub = collection.subscribe_selection(move |keys| {
            counter.store(keys.len(), Ordering::SeqCst);
        });

        collection.set_selection(["dev-1", "dev-2"]);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(collection.selection().contains("dev-2"));
        assert!(sub.unsubscribe());
    }

    #[tokio::test]
    async fn test_listener_sees_loading_then_result() {
        let (collection, _) = immediate(3);
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        let sub = collection.subscribe(move |s| sink.lock().push((s.loading, s.items.len())));

        collection.start().unwrap();
        settle().await;

        assert_eq!(*states.lock(), vec![(true, 0), (false, 3)]);
        assert!(sub.unsubscribe());
    }

    #[tokio::test]
    async fn test_superseded_snapshot_is_not_published() {
        let (collection, _) = immediate(3);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = collection.subscribe(move |s| sink.lock().push(s.generation));

        let g1 = collection.start().unwrap();
        let g2 = collection.refresh().unwrap();
        settle().await;
        assert_eq!(*seen.lock(), vec![g1, g2, g2]);

        // A snapshot for an older generation arriving late is dropped.
        let late = collection.inner.state.lock().snapshot(g1);
        collection.inner.publish(&late);
        assert_eq!(*seen.lock(), vec![g1, g2, g2]);
        assert!(sub.unsubscribe());
    }

    #[tokio::test]
    async fn test_listener_may_call_setter() {
        let (collection, calls) = immediate(42);
        let collection = Arc::new(collection);
        let weak = Arc::downgrade(&collection);
        let sub = collection.subscribe(move |s| {
            if !s.loading && s.page == 1 {
                if let Some(collection) = weak.upgrade() {
                    collection.set_page(2).unwrap();
                }
            }
        });

        collection.start().unwrap();
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(collection.snapshot().page, 2);
        assert!(sub.unsubscribe());
    }

    /// Holds every reply until the test releases it.
    struct Gated {
        gates: Arc<Mutex<Vec<Option<oneshot::Sender<PageResult<u64>>>>>>,
    }

    impl QueryService for Gated {
        type Item = u64;

        fn fetch_page(&self, _request: PageRequest) -> PageFuture<u64> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().push(Some(tx));
            Box::pin(async move { rx.await.map_err(|_| ErrorInfo::transport("gate dropped")) })
        }
    }

    proptest! {
        #[test]
        fn test_last_write_wins_for_any_reply_order(
            order in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let gates = Arc::new(Mutex::new(Vec::new()));
                let collection = PagedCollection::new(
                    Gated { gates: Arc::clone(&gates) },
                    CollectionConfig::default(),
                );
                let published = Arc::new(Mutex::new(Vec::new()));
                let sink = Arc::clone(&published);
                let sub = collection.subscribe(move |s| {
                    sink.lock().push((s.generation, s.loading, s.items.to_vec()));
                });

                let generations: Vec<Generation> = (0..order.len())
                    .map(|i| collection.set_page(i as u32 + 1).unwrap())
                    .collect();
                let last = *generations.last().unwrap();
                let last_index = order.len() as u64 - 1;

                for &i in &order {
                    let gate = gates.lock()[i].take().unwrap();
                    gate.send(PageResult::new(100, vec![i as u64])).unwrap();
                    settle().await;
                }

                let snapshot = collection.snapshot();
                assert!(!snapshot.loading);
                assert_eq!(snapshot.generation, last);
                assert_eq!(&snapshot.items[..], &[last_index]);

                let published = published.lock();
                let applied: Vec<_> = published.iter().filter(|(_, loading, _)| !loading).collect();
                assert_eq!(applied.len(), 1);
                assert_eq!(applied[0], &(last, false, vec![last_index]));
                assert!(published.windows(2).all(|w| w[0].0 <= w[1].0));
                assert!(sub.unsubscribe());
            });
        }
    }
}
