//! HTTP transport for the reconciliation engine.
//!
//! [`CtpClient`] speaks the commerce platform's REST API and implements both
//! [`ctsync::ResourceService`] (for every [`HttpResource`]) and
//! [`ctsync::KeyLookup`], so one client can back any number of syncs:
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use ctsync::{CategoryResource, ResourceSync, SyncOptions};
//! use ctsync_http::{ClientConfig, CtpClient};
//!
//! let client = Arc::new(CtpClient::new(ClientConfig::new(
//!     "https://api.example.com",
//!     "my-project",
//!     "token",
//! ))?);
//! let sync = ResourceSync::<CategoryResource>::new(
//!     client.clone(),
//!     client,
//!     SyncOptions::default(),
//! );
//! let statistics = sync.sync(Vec::<ctsync_api::category::CategoryDraft>::new()).await;
//! println!("{}", statistics.report_message());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod errors;
pub mod service;

pub use client::{ClientConfig, CtpClient};
pub use service::HttpResource;
