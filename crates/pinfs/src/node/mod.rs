use std::path::{Path, PathBuf};

use anyhow::anyhow;
use iroh::discovery::pkarr::dht::DhtDiscovery;
use iroh::{Endpoint, NodeId};

use crate::repo::{Repo, RepoError};
use crate::store::{BlockStore, BlockStoreError};

mod registry;

pub use registry::NodeRegistry;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("node error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("repo error: {0}")]
    Repo(#[from] RepoError),
    #[error("block store error: {0}")]
    BlockStore(#[from] BlockStoreError),
}

/// The backing storage node shared by every client in the process.
///
/// Owns the repo-backed block store and an online endpoint bound
/// to the repo identity. Expensive to construct; built once per
/// registry by [`NodeRegistry::acquire`] and shut down when the
/// last reference releases.
#[derive(Debug)]
pub struct StorageNode {
    repo_path: PathBuf,
    endpoint: Endpoint,
    store: BlockStore,
}

impl StorageNode {
    pub(crate) async fn build(repo: &Repo) -> Result<StorageNode, NodeError> {
        let secret_key = repo.config().identity.secret_key()?;
        let store = BlockStore::fs(&repo.blobs_path()).await?;

        let mainline_discovery = DhtDiscovery::builder()
            .secret_key(secret_key.clone())
            .build()
            .map_err(|err| NodeError::Default(anyhow!("failed to build discovery: {err}")))?;

        let endpoint = Endpoint::builder()
            .secret_key(secret_key)
            .discovery(mainline_discovery)
            .bind()
            .await
            .map_err(|err| NodeError::Default(anyhow!("failed to bind endpoint: {err}")))?;

        Ok(StorageNode {
            repo_path: repo.path().to_path_buf(),
            endpoint,
            store,
        })
    }

    pub fn id(&self) -> NodeId {
        self.endpoint.node_id()
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Dial a peer so later block fetches can find it.
    pub async fn connect_peer(&self, peer: NodeId) -> Result<(), NodeError> {
        self.endpoint
            .connect(peer, iroh_blobs::ALPN)
            .await
            .map_err(|err| NodeError::Default(anyhow!("failed to connect to {peer}: {err}")))?;
        Ok(())
    }

    pub(crate) async fn shutdown(&self) {
        self.endpoint.close().await;
    }
}
