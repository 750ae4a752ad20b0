//! List command implementation.
//!
//! Drives a [`PagedCollection`] to the requested page and prints the first
//! settled snapshot.

use std::io::Write;
use std::time::Duration;

use desk_collection::{CollectionConfig, CollectionSnapshot, PagedCollection, QueryService};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::ListArgs;
use crate::client::Row;
use crate::error::CliError;
use crate::output::{OutputFormat, PageView};

/// Handler for the list command.
pub struct ListCommand<Q> {
    service: Q,
    config: CollectionConfig,
    timeout: Duration,
}

impl<Q: QueryService<Item = Row>> ListCommand<Q> {
    /// Creates a new list command handler.
    #[must_use]
    pub const fn new(service: Q, config: CollectionConfig, timeout: Duration) -> Self {
        Self {
            service,
            config,
            timeout,
        }
    }

    /// Executes the list command.
    ///
    /// # Errors
    ///
    /// Returns error if an argument is invalid or the fetch fails.
    pub async fn execute<W: Write>(
        self,
        out: &mut W,
        format: &OutputFormat,
        args: &ListArgs,
    ) -> Result<(), CliError> {
        let config = apply_args(self.config, args)?;
        let collection = PagedCollection::new(self.service, config);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = collection.subscribe(move |snapshot: &CollectionSnapshot<Row>| {
            if !snapshot.loading {
                let _ = tx.send(snapshot.clone());
            }
        });

        let timeout = self.timeout;
        let result = async {
            let generation = collection.set_page(args.page)?;
            debug!(resource = %args.resource, %generation, "waiting for page");

            let settled = tokio::time::timeout(timeout, rx.recv())
                .await
                .map_err(|_| {
                    CliError::Connection(format!("no response within {}s", timeout.as_secs()))
                })?
                .ok_or_else(|| CliError::Connection("collection closed".to_string()))?;

            if let Some(err) = settled.last_error.clone() {
                return Err(CliError::from(err));
            }
            format.write(out, &PageView::from_snapshot(args.resource.clone(), &settled))
        }
        .await;

        subscription.unsubscribe();
        collection.close();
        result
    }
}

/// Fold command-line overrides into the collection configuration.
///
/// # Errors
///
/// Returns an error if the page size is zero or a filter is malformed.
pub fn apply_args(mut config: CollectionConfig, args: &ListArgs) -> Result<CollectionConfig, CliError> {
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            return Err(CliError::InvalidArgument("page size must be greater than 0".to_string()));
        }
        config = config.with_page_size(page_size);
    }
    if let Some(sort) = &args.sort {
        config = config.with_sort(sort.clone(), args.desc);
    }
    for filter in &args.filters {
        let (key, value) = parse_filter(filter)?;
        config = config.with_filter(key, value);
    }
    Ok(config)
}

/// Parse `KEY=VALUE`. Values that are valid JSON are kept as JSON; anything
/// else is sent as a string.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_filter(filter: &str) -> Result<(String, serde_json::Value), CliError> {
    let (key, value) = filter
        .split_once('=')
        .ok_or_else(|| CliError::InvalidArgument(format!("filter must be KEY=VALUE: {filter}")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidArgument(format!("filter key is empty: {filter}")));
    }

    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
