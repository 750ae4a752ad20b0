//! Self-healing live log subscriber.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use desk_sync::{ErrorHook, ErrorInfo, ErrorKind, Observers, Subscription};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::LogBuffer;
use crate::config::{ReconnectPolicy, TailConfig};
use crate::error::TailError;
use crate::service::{LogStream, LogStreamService, OpenFuture};
use crate::state::{AtomicSubscriptionState, SubscriptionState};
use crate::types::{LogEntry, TailRequest};

/// Starts live tails against a [`LogStreamService`].
pub struct LiveTail<S: LogStreamService> {
    service: Arc<S>,
    config: TailConfig,
    error_hook: Option<ErrorHook>,
}

impl<S: LogStreamService> LiveTail<S> {
    /// Create a tail factory with the default configuration.
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(service),
            config: TailConfig::default(),
            error_hook: None,
        }
    }

    /// Configure reconnect delay and buffer bound.
    #[must_use]
    pub fn with_config(mut self, config: TailConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the upward error hook, called for auth and server
    /// terminations. Reconnecting continues regardless.
    #[must_use]
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.error_hook = Some(hook);
        self
    }

    /// Start following `request`.
    ///
    /// The returned handle is already `Connecting`; the first open is issued
    /// before this returns. The owner must call [`TailHandle::cancel`] when
    /// done with it.
    pub fn start(&self, request: TailRequest) -> TailHandle {
        self.launch(self.prepare(request))
    }

    /// Start following `request` with `listener` registered before the first
    /// open, so it sees every accepted entry.
    pub fn start_with<F>(&self, request: TailRequest, listener: F) -> (TailHandle, Subscription<LogEntry>)
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        let shared = self.prepare(request);
        let subscription = shared.listeners.subscribe(listener);
        (self.launch(shared), subscription)
    }

    fn prepare(&self, request: TailRequest) -> Arc<Shared> {
        let buffer = self
            .config
            .buffer_capacity
            .map_or_else(LogBuffer::new, LogBuffer::with_capacity);
        Arc::new(Shared {
            request,
            state: AtomicSubscriptionState::new(SubscriptionState::Idle),
            buffer: Mutex::new(buffer),
            listeners: Observers::new(),
            connects: AtomicU64::new(0),
            token: CancellationToken::new(),
        })
    }

    fn launch(&self, shared: Arc<Shared>) -> TailHandle {
        shared
            .state
            .transition(SubscriptionState::Idle, SubscriptionState::Connecting);
        info!(request = %shared.request, "starting live tail");
        let first = shared.open(self.service.as_ref());

        let worker = Worker {
            service: Arc::clone(&self.service),
            shared: Arc::clone(&shared),
            policy: self.config.reconnect,
            error_hook: self.error_hook.clone(),
        };
        tokio::spawn(worker.run(first));

        TailHandle { shared }
    }
}

struct Shared {
    request: TailRequest,
    state: AtomicSubscriptionState,
    buffer: Mutex<LogBuffer>,
    listeners: Observers<LogEntry>,
    connects: AtomicU64,
    token: CancellationToken,
}

impl Shared {
    fn open<S: LogStreamService>(&self, service: &S) -> OpenFuture {
        let attempt = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(request = %self.request, attempt, "opening log stream");
        service.subscribe(&self.request)
    }

    fn offer(&self, entry: LogEntry) {
        let accepted = {
            let mut buffer = self.buffer.lock();
            // Cancel takes this lock too, so nothing lands after it returns.
            if self.state.load() != SubscriptionState::Streaming {
                return;
            }
            let id = entry.id;
            if buffer.offer(entry) {
                buffer.front().cloned()
            } else {
                trace!(%id, "dropping out-of-order log entry");
                None
            }
        };

        if let Some(entry) = accepted {
            self.listeners.notify(&entry);
        }
    }
}

enum Termination {
    Ended,
    Failed(ErrorInfo),
    Cancelled,
}

struct Worker<S: LogStreamService> {
    service: Arc<S>,
    shared: Arc<Shared>,
    policy: ReconnectPolicy,
    error_hook: Option<ErrorHook>,
}

impl<S: LogStreamService> Worker<S> {
    async fn run(self, first: OpenFuture) {
        let token = self.shared.token.clone();
        let mut opening = first;
        let mut attempt = 0u32;

        loop {
            let opened = tokio::select! {
                biased;
                () = token.cancelled() => break,
                opened = opening => opened,
            };

            let termination = match opened {
                Ok(stream) => self.drive(stream, &token).await,
                Err(err) => Termination::Failed(err),
            };

            let failure = match termination {
                Termination::Cancelled => break,
                Termination::Ended => {
                    debug!(request = %self.shared.request, "log stream ended");
                    None
                }
                Termination::Failed(err) => {
                    warn!(request = %self.shared.request, error = %err, "log stream failed");
                    Some(err)
                }
            };

            let state = &self.shared.state;
            if !(state.transition(SubscriptionState::Streaming, SubscriptionState::ReconnectPending)
                || state.transition(SubscriptionState::Connecting, SubscriptionState::ReconnectPending))
            {
                break;
            }

            match (&failure, &self.error_hook) {
                (Some(err), Some(hook)) if matches!(err.kind, ErrorKind::Auth | ErrorKind::Server) => {
                    hook(err);
                }
                _ => {}
            }

            attempt = attempt.saturating_add(1);
            let delay = self.policy.delay_for_attempt(attempt);
            info!(
                request = %self.shared.request,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting log stream"
            );

            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            // The timer may fire concurrently with cancel; the state decides.
            if !state.transition(SubscriptionState::ReconnectPending, SubscriptionState::Connecting) {
                break;
            }
            opening = self.shared.open(self.service.as_ref());
        }

        debug!(request = %self.shared.request, "live tail worker stopped");
    }

    async fn drive(&self, mut stream: LogStream, token: &CancellationToken) -> Termination {
        if !self
            .shared
            .state
            .transition(SubscriptionState::Connecting, SubscriptionState::Streaming)
        {
            return Termination::Cancelled;
        }
        debug!(request = %self.shared.request, "log stream open");

        loop {
            let item = tokio::select! {
                biased;
                () = token.cancelled() => return Termination::Cancelled,
                item = stream.next() => item,
            };

            match item {
                Some(Ok(entry)) => self.shared.offer(entry),
                Some(Err(err)) if err.kind == ErrorKind::Protocol => {
                    warn!(request = %self.shared.request, error = %err, "dropping malformed log entry");
                }
                Some(Err(err)) => return Termination::Failed(err),
                None => return Termination::Ended,
            }
        }
    }
}

/// Owned handle to one running live tail.
///
/// The buffer stays readable after [`cancel`](Self::cancel) and is released
/// with the handle.
pub struct TailHandle {
    shared: Arc<Shared>,
}

impl TailHandle {
    /// The followed stream.
    #[must_use]
    pub fn request(&self) -> &TailRequest {
        &self.shared.request
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.shared.state.load()
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state().is_terminal()
    }

    /// Copy of the buffered entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.shared.buffer.lock().to_vec()
    }

    /// Number of buffered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    /// Returns true if no entry has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.buffer.lock().is_empty()
    }

    /// Number of opens issued against the service, including the first.
    #[must_use]
    pub fn connect_count(&self) -> u64 {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Register a listener for every accepted entry.
    pub fn subscribe<F>(&self, listener: F) -> crate::error::Result<Subscription<LogEntry>>
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        if self.is_cancelled() {
            return Err(TailError::Cancelled);
        }
        Ok(self.shared.listeners.subscribe(listener))
    }

    /// Stop the tail. Idempotent.
    ///
    /// Closes the open stream, abandons any pending reconnect, and drops all
    /// listeners. No entry is added to the buffer after this returns.
    pub fn cancel(&self) {
        let previous = {
            let _buffer = self.shared.buffer.lock();
            self.shared.state.cancel()
        };
        if previous.is_terminal() {
            return;
        }

        self.shared.token.cancel();
        self.shared.listeners.clear();
        info!(request = %self.shared.request, from = %previous, "live tail cancelled");
    }
}

impl Drop for TailHandle {
    fn drop(&mut self) {
        if !self.is_cancelled() {
            warn!(request = %self.shared.request, "live tail handle dropped without cancel");
            self.cancel();
        }
    }
}

impl std::fmt::Debug for TailHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailHandle")
            .field("request", &self.shared.request)
            .field("state", &self.state())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
