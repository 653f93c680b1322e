//! Error types for the Action Network client.
//!
//! # Design
//! `UnknownResource` gets a dedicated variant because a missing link-table
//! entry is a caller mistake, not a server failure. `RateLimited` is only
//! returned once the throttle has exhausted its retries. Non-JSON error
//! bodies land in `Http` with the raw status code and body for debugging;
//! JSON error bodies are returned to the caller as data.

use thiserror::Error;

/// Errors returned by `ActionNetworkClient` and its helpers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Neither `name` nor `osdi:name` is present in the root link table.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// The quota was still exceeded after the last retry.
    #[error("rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// The server returned a non-2xx status with a body that is not JSON.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A key the client relies on is absent from a response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Pagination kept returning `next` links past the configured guard.
    #[error("gave up after {0} pages")]
    PageLimitExceeded(usize),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
