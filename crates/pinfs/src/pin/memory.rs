use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use async_trait::async_trait;

use super::{PinProvider, PinRecord, PinServiceError, PinStatus};

/// In-memory pin provider.
///
/// Serves the same contract as the HTTP client without a remote
/// service, which makes it the provider of choice for tests and
/// embedded use. Behavior knobs:
///
/// - `set_unreachable(true)` makes every call fail, simulating a
///   down service
/// - `set_auto_pin(false)` leaves submitted pins in `Pinning`
///   instead of converging immediately
/// - `set_fail_submissions(true)` marks submitted pins `Failed`
#[derive(Debug, Clone)]
pub struct MemoryPinService {
    inner: Arc<RwLock<MemoryPinServiceInner>>,
}

#[derive(Debug)]
struct MemoryPinServiceInner {
    records: HashMap<String, PinRecord>,
    unreachable: bool,
    auto_pin: bool,
    fail_submissions: bool,
    next_id: u64,
}

impl Default for MemoryPinServiceInner {
    fn default() -> Self {
        MemoryPinServiceInner {
            records: HashMap::new(),
            unreachable: false,
            auto_pin: true,
            fail_submissions: false,
            next_id: 0,
        }
    }
}

impl Default for MemoryPinService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPinService {
    pub fn new() -> Self {
        MemoryPinService {
            inner: Arc::new(RwLock::new(MemoryPinServiceInner::default())),
        }
    }

    /// Install or replace a record
    pub fn insert(&self, record: PinRecord) {
        let mut inner = self.inner.write().expect("pin service lock poisoned");
        inner.records.insert(record.id.clone(), record);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner
            .write()
            .expect("pin service lock poisoned")
            .unreachable = unreachable;
    }

    pub fn set_auto_pin(&self, auto_pin: bool) {
        self.inner
            .write()
            .expect("pin service lock poisoned")
            .auto_pin = auto_pin;
    }

    pub fn set_fail_submissions(&self, fail: bool) {
        self.inner
            .write()
            .expect("pin service lock poisoned")
            .fail_submissions = fail;
    }
}

#[async_trait]
impl PinProvider for MemoryPinService {
    async fn status_by_id(&self, pin_id: &str) -> Result<PinRecord, PinServiceError> {
        let inner = self
            .inner
            .read()
            .map_err(|err| PinServiceError::Default(anyhow!("lock poisoned: {err}")))?;
        if inner.unreachable {
            return Err(PinServiceError::Default(anyhow!("pin service unreachable")));
        }
        inner
            .records
            .get(pin_id)
            .cloned()
            .ok_or_else(|| PinServiceError::NotFound(pin_id.to_string()))
    }

    async fn submit(&self, pin_id: Option<&str>, cid: &str) -> Result<PinRecord, PinServiceError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|err| PinServiceError::Default(anyhow!("lock poisoned: {err}")))?;
        if inner.unreachable {
            return Err(PinServiceError::Default(anyhow!("pin service unreachable")));
        }

        let id = match pin_id {
            Some(id) => id.to_string(),
            None => {
                inner.next_id += 1;
                format!("pin-{}", inner.next_id)
            }
        };
        let status = if inner.fail_submissions {
            PinStatus::Failed
        } else if inner.auto_pin {
            PinStatus::Pinned
        } else {
            PinStatus::Pinning
        };

        let record = PinRecord {
            id: id.clone(),
            status,
            cid: cid.to_string(),
            delegates: Vec::new(),
        };
        inner.records.insert(id, record.clone());
        Ok(record)
    }
}
