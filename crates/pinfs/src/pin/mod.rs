//! Remote pin-tracking service boundary.
//!
//! A pin is a remote record asserting that specific content should
//! be retained, tracked by a pin identifier independent of any one
//! content identifier. The service side is a collaborator: this
//! module only defines the shape we consume ([`PinRecord`]), the
//! provider trait, an HTTP client, an in-memory provider used by
//! tests and embedders, and the post-flush confirmation policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod confirm;
mod http;
mod memory;

pub(crate) use confirm::confirm;
pub use confirm::{ConfirmError, ConfirmPolicy, Confirmation};
pub use http::HttpPinService;
pub use memory::MemoryPinService;

/// Replication status the service reports for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinStatus {
    Queued,
    Pinning,
    Pinned,
    Failed,
}

/// One pin record as the service reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinRecord {
    /// the service's identifier for the pin
    pub id: String,
    pub status: PinStatus,
    /// the content identifier the pin currently targets
    pub cid: String,
    /// peers the service advertises as likely holding the content
    #[serde(default)]
    pub delegates: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PinServiceError {
    #[error("pin service error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid pin service url: {0}")]
    Url(#[from] url::ParseError),
    #[error("pin not found: {0}")]
    NotFound(String),
    #[error("unexpected status {status} from pin service: {body}")]
    Status { status: u16, body: String },
}

/// The operations this crate needs from a pin-tracking service.
///
/// Implementations decide where the records live; the HTTP client
/// talks to a remote service, the memory provider keeps them in
/// the process.
#[async_trait]
pub trait PinProvider: Send + Sync + std::fmt::Debug {
    /// Look up a pin's current record
    async fn status_by_id(&self, pin_id: &str) -> Result<PinRecord, PinServiceError>;

    /// Request that the service pin `cid`, replacing the pin named
    /// by `pin_id` when one is given.
    async fn submit(&self, pin_id: Option<&str>, cid: &str) -> Result<PinRecord, PinServiceError>;
}
