//! Tail command implementation.
//!
//! Runs a [`LiveTail`] and prints every newly accepted entry until the
//! shutdown signal fires, the entry limit is reached, or the session
//! expires. The tail is cancelled on every exit path.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use desk_sync::ErrorInfo;
use desk_tail::{LiveTail, LogEntry, LogStreamService, TailConfig, TailRequest};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::TailCommands;
use crate::error::CliError;
use crate::output::{LogLine, OutputFormat};

enum TailEvent {
    Entry(LogEntry),
    Failed(ErrorInfo),
}

/// Handler for the tail command.
pub struct TailCommand<S> {
    service: S,
    config: TailConfig,
}

impl<S: LogStreamService> TailCommand<S> {
    /// Creates a new tail command handler.
    #[must_use]
    pub const fn new(service: S, config: TailConfig) -> Self {
        Self { service, config }
    }

    /// Executes the tail command.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Auth`] if the session expires, or an IO/format
    /// error if output fails.
    pub async fn execute<W, F>(
        self,
        out: &mut W,
        format: &OutputFormat,
        stream: &TailCommands,
        shutdown: F,
    ) -> Result<(), CliError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hook_tx = tx.clone();
        let tail = LiveTail::new(self.service)
            .with_config(self.config)
            .with_error_hook(Arc::new(move |err: &ErrorInfo| {
                let _ = hook_tx.send(TailEvent::Failed(err.clone()));
            }));

        let request = tail_request(stream);
        let limit = stream.options().limit;
        info!(%request, ?limit, "following stream");
        let (handle, _subscription) = tail.start_with(request, move |entry: &LogEntry| {
            let _ = tx.send(TailEvent::Entry(entry.clone()));
        });

        tokio::pin!(shutdown);
        let mut printed = 0usize;
        let result = loop {
            let event = tokio::select! {
                () = &mut shutdown => break Ok(()),
                event = rx.recv() => event,
            };

            match event {
                Some(TailEvent::Entry(entry)) => {
                    if let Err(e) = format.write_line(out, &LogLine(entry)) {
                        break Err(e);
                    }
                    printed += 1;
                    if limit.is_some_and(|limit| printed >= limit) {
                        break Ok(());
                    }
                }
                Some(TailEvent::Failed(err)) if err.is_auth() => {
                    break Err(CliError::from(err));
                }
                Some(TailEvent::Failed(err)) => {
                    warn!(error = %err, "stream failed, retrying");
                }
                None => break Ok(()),
            }
        };

        handle.cancel();
        result
    }
}

/// Log stream request for a tail subcommand.
#[must_use]
pub fn tail_request(stream: &TailCommands) -> TailRequest {
    match stream {
        TailCommands::GatewayFrames { gateway_id, .. } => TailRequest::gateway_frames(gateway_id.clone()),
        TailCommands::DeviceFrames { dev_eui, .. } => TailRequest::device_frames(dev_eui.clone()),
        TailCommands::DeviceEvents { dev_eui, .. } => TailRequest::device_events(dev_eui.clone()),
    }
}
