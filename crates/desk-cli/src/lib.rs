//! # desk-cli
//!
//! Command-line client for the device console.
//!
//! Provides commands for:
//! - Listing one page of any resource collection (devices, gateways, ...)
//! - Following live gateway frames, device frames and device events
//!
//! # Architecture
//!
//! `desk list` drives a [`desk_collection::PagedCollection`] over the HTTP
//! list API ([`client::ApiClient`]). `desk tail` drives a
//! [`desk_tail::LiveTail`] over the WebSocket stream API
//! ([`stream::WsLogStream`]).
//!
//! ```text
//! ┌──────────┐   POST /api/{resource}/list    ┌──────────────┐
//! │          │───────────────────────────────►│              │
//! │   desk   │                                │   console    │
//! │          │◄───────────────────────────────│    server    │
//! └──────────┘   WS /api/stream/{kind}/{id}   └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod stream;

pub use cli::{Cli, Commands, Format, ListArgs, LogFormat, TailCommands};
pub use client::{ApiClient, ResourceQuery, Row};
pub use config::ConsoleConfig;
pub use error::CliError;
pub use output::OutputFormat;
pub use stream::WsLogStream;
