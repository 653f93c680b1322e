//! Blocking client for the Action Network OSDI API.
//!
//! # Overview
//! Connects with an API token, discovers endpoints from the API root's
//! `_links` table, pages through collections by following `next` links, and
//! creates or updates people through the signup helper.
//!
//! # Design
//! - `ActionNetworkClient` holds the root document and resolves every
//!   resource name through it (`people`, then `osdi:people`).
//! - Every call passes through one `Throttle`: at most 4 calls per rolling
//!   second, with exponential backoff on local or server-side (429) refusals.
//! - I/O sits behind the `Transport` trait. `UreqTransport` is the real one;
//!   tests plug in scripted transports and a fake `Clock`.
//! - Replies are returned as `serde_json::Value`. `Person` is an optional
//!   typed view over a person record.

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod links;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::ActionNetworkClient;
pub use config::{ClientConfig, RateLimitConfig, RetryConfig};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use limiter::{Clock, RateLimiter, SystemClock, Throttle};
pub use links::RootDocument;
pub use transport::UreqTransport;
pub use types::{
    filter_expression, EmailAddress, FilterOp, NewPerson, Person, PersonLookup, PersonUpdate,
    PostalAddress,
};
