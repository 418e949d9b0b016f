use std::time::Duration;

use crate::linked_data::Link;

use super::{PinProvider, PinRecord, PinServiceError, PinStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_PIN_TIMEOUT: Duration = Duration::from_secs(120);

/// What a mutation waits for after the root has been flushed.
///
/// `LocalFlush` treats the local flush as the durability boundary.
/// `RemotePin` additionally submits the new root to the pin
/// service and polls until the service reports it pinned, bounded
/// by `timeout`.
#[derive(Debug, Clone)]
pub enum ConfirmPolicy {
    LocalFlush,
    RemotePin {
        poll_interval: Duration,
        timeout: Duration,
    },
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        ConfirmPolicy::LocalFlush
    }
}

impl ConfirmPolicy {
    pub fn remote() -> Self {
        ConfirmPolicy::RemotePin {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_PIN_TIMEOUT,
        }
    }
}

/// The outcome of a confirmed mutation. Callers can tell a
/// locally-applied mutation from a remotely-pinned one by the
/// variant.
#[derive(Debug, Clone)]
pub enum Confirmation {
    /// The mutation is flushed locally; no remote guarantee.
    Flushed { link: Link },
    /// The remote service reports the new root as pinned.
    Pinned { link: Link, record: PinRecord },
}

impl Confirmation {
    /// The root content identifier the mutation produced
    pub fn link(&self) -> Link {
        match self {
            Confirmation::Flushed { link } => *link,
            Confirmation::Pinned { link, .. } => *link,
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Confirmation::Pinned { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("pin service error: {0}")]
    Service(#[from] PinServiceError),
    #[error("pin {0} failed on the remote service")]
    PinFailed(String),
    #[error("timed out waiting for pin {0} to converge")]
    Timeout(String),
}

pub(crate) async fn confirm(
    policy: &ConfirmPolicy,
    pins: &dyn PinProvider,
    pin_id: Option<&str>,
    link: Link,
) -> Result<Confirmation, ConfirmError> {
    match policy {
        ConfirmPolicy::LocalFlush => Ok(Confirmation::Flushed { link }),
        ConfirmPolicy::RemotePin {
            poll_interval,
            timeout,
        } => {
            let cid = link.to_string();
            let record = pins.submit(pin_id, &cid).await?;
            match record.status {
                PinStatus::Pinned => return Ok(Confirmation::Pinned { link, record }),
                PinStatus::Failed => return Err(ConfirmError::PinFailed(record.id)),
                PinStatus::Queued | PinStatus::Pinning => {}
            }

            let id = record.id.clone();
            let wait = async {
                loop {
                    tokio::time::sleep(*poll_interval).await;
                    let record = pins.status_by_id(&id).await?;
                    match record.status {
                        PinStatus::Pinned => return Ok(Confirmation::Pinned { link, record }),
                        PinStatus::Failed => return Err(ConfirmError::PinFailed(record.id)),
                        PinStatus::Queued | PinStatus::Pinning => continue,
                    }
                }
            };
            match tokio::time::timeout(*timeout, wait).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ConfirmError::Timeout(record.id)),
            }
        }
    }
}
