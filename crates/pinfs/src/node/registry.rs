use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;

use crate::repo::{Repo, RepoConfig};

use super::{NodeError, StorageNode};

#[derive(Default)]
struct Slot {
    refs: usize,
    shared: Option<Shared>,
}

struct Shared {
    node: Arc<StorageNode>,
    repo: Repo,
}

/// Lifecycle manager for the shared [`StorageNode`].
///
/// The node exists iff the reference count is positive. The first
/// acquire performs the full construction (fresh identity, repo
/// init/open, endpoint bind); later acquires only bump the count.
/// The last release shuts the node down and removes its repo so a
/// future acquire starts from scratch.
///
/// Construction and count changes are serialized by one mutex,
/// held across construction deliberately: concurrent first
/// acquires must not race to build two nodes.
#[derive(Debug)]
pub struct NodeRegistry {
    base_dir: PathBuf,
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("refs", &self.refs)
            .field("live", &self.shared.is_some())
            .finish()
    }
}

impl NodeRegistry {
    /// A registry rooted at the given base directory. Repos are
    /// created under it at identity-derived paths.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        NodeRegistry {
            base_dir: base_dir.into(),
            slot: Mutex::new(Slot::default()),
        }
    }

    /// The process-wide registry backing [`Client::acquire`].
    ///
    /// [`Client::acquire`]: crate::client::Client::acquire
    pub fn global() -> Arc<NodeRegistry> {
        static GLOBAL: OnceLock<Arc<NodeRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(NodeRegistry::new(std::env::temp_dir())))
            .clone()
    }

    /// Take a reference on the shared node, constructing it if
    /// this is the first live reference.
    ///
    /// On construction failure any partially created repo state is
    /// cleaned up best-effort and the registry stays uninitialized;
    /// other live references are unaffected (there are none).
    pub async fn acquire(&self) -> Result<Arc<StorageNode>, NodeError> {
        let mut slot = self.slot.lock().await;

        if let Some(node) = slot.shared.as_ref().map(|shared| shared.node.clone()) {
            slot.refs += 1;
            return Ok(node);
        }

        init_extensions();

        let config = RepoConfig::generate();
        let repo_path = self.base_dir.join(format!("node_{}", config.identity.peer_id));

        if let Err(err) = Repo::init(&repo_path, &config) {
            let _ = std::fs::remove_dir_all(&repo_path);
            return Err(err.into());
        }

        let repo = match Repo::open(&repo_path) {
            Ok(repo) => repo,
            Err(err) => {
                let _ = std::fs::remove_dir_all(&repo_path);
                return Err(err.into());
            }
        };

        let node = match StorageNode::build(&repo).await {
            Ok(node) => node,
            Err(err) => {
                if let Err(close_err) = repo.close() {
                    tracing::warn!("failed to close repo while rolling back: {close_err}");
                }
                let _ = std::fs::remove_dir_all(&repo_path);
                return Err(err);
            }
        };

        tracing::debug!("built storage node {} at {:?}", node.id(), repo_path);

        let node = Arc::new(node);
        slot.shared = Some(Shared {
            node: node.clone(),
            repo,
        });
        slot.refs = 1;
        Ok(node)
    }

    /// Drop a reference on the shared node, tearing it down when
    /// this was the last one.
    ///
    /// # Panics
    ///
    /// Panics if called with no outstanding reference; releasing
    /// more than was acquired is a programming error, not a
    /// runtime condition.
    pub async fn release(&self) {
        let mut slot = self.slot.lock().await;
        assert!(
            slot.refs > 0,
            "storage node released more times than it was acquired"
        );
        slot.refs -= 1;
        if slot.refs > 0 {
            return;
        }

        if let Some(shared) = slot.shared.take() {
            let repo_path = shared.node.repo_path().to_path_buf();
            tracing::debug!("tearing down storage node {} at {:?}", shared.node.id(), repo_path);
            shared.node.shutdown().await;
            if let Err(err) = shared.repo.close() {
                tracing::warn!("failed to close repo during teardown: {err}");
            }
            if let Err(err) = std::fs::remove_dir_all(&repo_path) {
                tracing::warn!("failed to remove repo at {:?}: {err}", repo_path);
            }
        }
    }

    /// Current number of outstanding references.
    pub async fn refs(&self) -> usize {
        self.slot.lock().await.refs
    }
}

/// One-time process setup shared by every node the process will
/// ever build. Installing the default crypto provider can only
/// "fail" when some other component installed one first, which is
/// just as good.
fn init_extensions() {
    static READY: AtomicBool = AtomicBool::new(false);
    if READY.swap(true, Ordering::SeqCst) {
        return;
    }
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("a process-wide crypto provider was already installed");
    }
}
