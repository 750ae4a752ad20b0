//! Reconnect and cancellation tests for the live tail.
//!
//! The channel backend hands out one pre-registered stream per open, so a
//! test ends a stream by dropping its sender. Time is paused; reconnect
//! delays only elapse when a test advances the clock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use desk_tail::{
    ErrorInfo, ErrorKind, LiveTail, LogEntry, LogStream, LogStreamService, OpenFuture,
    SubscriptionState, TailConfig, TailHandle, TailRequest,
};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::channel::oneshot;
use parking_lot::Mutex;

// ============================================================================
// Channel backend
// ============================================================================

type Item = Result<LogEntry, ErrorInfo>;

#[derive(Default)]
struct Feeds {
    calls: usize,
    requests: Vec<TailRequest>,
    streams: VecDeque<(Option<oneshot::Receiver<()>>, UnboundedReceiver<Item>)>,
}

#[derive(Clone, Default)]
struct ChannelBackend {
    feeds: Arc<Mutex<Feeds>>,
}

impl ChannelBackend {
    /// Register the stream served by the next open.
    fn feed(&self) -> UnboundedSender<Item> {
        let (tx, rx) = unbounded();
        self.feeds.lock().streams.push_back((None, rx));
        tx
    }

    /// Register a stream whose open completes only once the gate is released.
    fn gated_feed(&self) -> (oneshot::Sender<()>, UnboundedSender<Item>) {
        let (gate_tx, gate_rx) = oneshot::channel();
        let (tx, rx) = unbounded();
        self.feeds.lock().streams.push_back((Some(gate_rx), rx));
        (gate_tx, tx)
    }

    fn calls(&self) -> usize {
        self.feeds.lock().calls
    }

    fn requests(&self) -> Vec<TailRequest> {
        self.feeds.lock().requests.clone()
    }
}

impl LogStreamService for ChannelBackend {
    fn subscribe(&self, request: &TailRequest) -> OpenFuture {
        let mut feeds = self.feeds.lock();
        feeds.calls += 1;
        feeds.requests.push(request.clone());
        match feeds.streams.pop_front() {
            Some((gate, rx)) => Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                let stream: LogStream = Box::pin(rx);
                Ok::<_, ErrorInfo>(stream)
            }),
            // Nothing registered: the open never completes.
            None => Box::pin(futures::future::pending::<Result<LogStream, ErrorInfo>>()),
        }
    }
}

fn entry(id: u64) -> Item {
    Ok(LogEntry::new(id, Utc::now(), "up"))
}

fn ids(handle: &TailHandle) -> Vec<u64> {
    handle.entries().iter().map(|e| e.id.millis()).collect()
}

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

const DELAY: Duration = Duration::from_secs(1);

fn recording_hook(tail: LiveTail<ChannelBackend>) -> (LiveTail<ChannelBackend>, Arc<Mutex<Vec<ErrorKind>>>) {
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);
    let tail = tail.with_error_hook(Arc::new(move |err: &ErrorInfo| sink.lock().push(err.kind)));
    (tail, reported)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_buffer_orders_and_dedupes() {
    let backend = ChannelBackend::default();
    let tx = backend.feed();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::device_events("01"));

    for id in [5, 3, 7, 7, 10] {
        tx.unbounded_send(entry(id)).unwrap();
    }
    settle().await;

    assert_eq!(ids(&handle), vec![10, 7, 5]);
    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_pending_reconnect_prevents_reopen() {
    let backend = ChannelBackend::default();
    let tx = backend.feed();
    backend.feed();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::gateway_frames("gw1"));
    settle().await;
    assert_eq!(handle.state(), SubscriptionState::Streaming);

    tx.unbounded_send(entry(1)).unwrap();
    drop(tx);
    settle().await;
    assert_eq!(handle.state(), SubscriptionState::ReconnectPending);

    handle.cancel();
    tokio::time::advance(DELAY * 5).await;
    settle().await;

    assert_eq!(backend.calls(), 1);
    assert_eq!(handle.connect_count(), 1);
    assert_eq!(handle.state(), SubscriptionState::Cancelled);
    assert_eq!(ids(&handle), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_two_drops_reconnect_twice_without_errors() {
    let backend = ChannelBackend::default();
    let first = backend.feed();
    let second = backend.feed();
    let third = backend.feed();
    let (tail, reported) = recording_hook(LiveTail::new(backend.clone()));
    let handle = tail.start(TailRequest::device_frames("0102030405060708"));
    settle().await;

    drop(first);
    settle().await;
    tokio::time::advance(DELAY).await;
    settle().await;
    assert_eq!(backend.calls(), 2);
    assert_eq!(handle.state(), SubscriptionState::Streaming);

    drop(second);
    settle().await;
    tokio::time::advance(DELAY).await;
    settle().await;

    assert_eq!(backend.calls(), 3);
    assert_eq!(handle.connect_count(), 3);
    assert_eq!(handle.state(), SubscriptionState::Streaming);
    assert!(reported.lock().is_empty());
    assert!(
        backend
            .requests()
            .iter()
            .all(|r| *r == TailRequest::device_frames("0102030405060708"))
    );

    drop(third);
    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_waits_full_delay() {
    let backend = ChannelBackend::default();
    let first = backend.feed();
    let handle = LiveTail::new(backend.clone())
        .with_config(TailConfig::default().with_reconnect_delay(Duration::from_secs(3)))
        .start(TailRequest::device_events("01"));
    settle().await;

    drop(first);
    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(backend.calls(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(backend.calls(), 2);
    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_buffer_survives_reconnect() {
    let backend = ChannelBackend::default();
    let first = backend.feed();
    let second = backend.feed();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::device_events("01"));
    settle().await;

    first.unbounded_send(entry(1)).unwrap();
    first.unbounded_send(entry(2)).unwrap();
    drop(first);
    settle().await;
    tokio::time::advance(DELAY).await;
    settle().await;

    // The new stream replays an old entry before a fresh one.
    second.unbounded_send(entry(2)).unwrap();
    second.unbounded_send(entry(3)).unwrap();
    settle().await;

    assert_eq!(ids(&handle), vec![3, 2, 1]);
    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_no_buffer_mutation_after_cancel() {
    let backend = ChannelBackend::default();
    let tx = backend.feed();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::device_events("01"));
    settle().await;

    tx.unbounded_send(entry(1)).unwrap();
    settle().await;
    handle.cancel();

    // The send may fail once the stream is dropped.
    let _ = tx.unbounded_send(entry(2));
    settle().await;

    assert_eq!(ids(&handle), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_opening() {
    let backend = ChannelBackend::default();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::device_events("01"));
    settle().await;
    assert_eq!(handle.state(), SubscriptionState::Connecting);

    handle.cancel();
    tokio::time::advance(DELAY * 3).await;
    settle().await;

    assert_eq!(handle.state(), SubscriptionState::Cancelled);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_completing_after_cancel_is_ignored() {
    let backend = ChannelBackend::default();
    let (gate, tx) = backend.gated_feed();
    backend.feed();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::device_events("01"));
    settle().await;
    assert_eq!(handle.state(), SubscriptionState::Connecting);

    tx.unbounded_send(entry(1)).unwrap();
    handle.cancel();
    let _ = gate.send(());
    tokio::time::advance(DELAY * 5).await;
    settle().await;

    assert_eq!(handle.len(), 0);
    assert_eq!(handle.connect_count(), 1);
    assert_eq!(backend.calls(), 1);
    assert_eq!(handle.state(), SubscriptionState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_reconnects_silently() {
    let backend = ChannelBackend::default();
    let tx = backend.feed();
    let _next = backend.feed();
    let (tail, reported) = recording_hook(LiveTail::new(backend.clone()));
    let handle = tail.start(TailRequest::device_events("01"));
    settle().await;

    tx.unbounded_send(Err(ErrorInfo::transport("connection reset"))).unwrap();
    settle().await;
    assert_eq!(handle.state(), SubscriptionState::ReconnectPending);

    tokio::time::advance(DELAY).await;
    settle().await;

    assert_eq!(backend.calls(), 2);
    assert!(reported.lock().is_empty());
    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_server_error_reported_and_retried() {
    let backend = ChannelBackend::default();
    let tx = backend.feed();
    let _next = backend.feed();
    let (tail, reported) = recording_hook(LiveTail::new(backend.clone()));
    let handle = tail.start(TailRequest::device_events("01"));
    settle().await;

    tx.unbounded_send(Err(ErrorInfo::server("stream rejected"))).unwrap();
    settle().await;
    assert_eq!(*reported.lock(), vec![ErrorKind::Server]);

    tokio::time::advance(DELAY).await;
    settle().await;
    assert_eq!(backend.calls(), 2);
    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_entry_keeps_stream_open() {
    let backend = ChannelBackend::default();
    let tx = backend.feed();
    let handle = LiveTail::new(backend.clone()).start(TailRequest::device_events("01"));
    settle().await;

    tx.unbounded_send(entry(1)).unwrap();
    tx.unbounded_send(Err(ErrorInfo::protocol("invalid json"))).unwrap();
    tx.unbounded_send(entry(2)).unwrap();
    settle().await;

    assert_eq!(ids(&handle), vec![2, 1]);
    assert_eq!(handle.state(), SubscriptionState::Streaming);
    assert_eq!(backend.calls(), 1);
    handle.cancel();
}
