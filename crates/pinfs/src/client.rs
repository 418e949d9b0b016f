use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, Stream};
use futures::TryStreamExt;
use iroh::NodeId;
use tokio::sync::RwLock;

use crate::linked_data::{CodecError, Link, LD_DAG_CBOR_CODEC, LD_RAW_CODEC};
use crate::node::{NodeError, NodeRegistry, StorageNode};
use crate::pin::{
    confirm, ConfirmError, ConfirmPolicy, Confirmation, HttpPinService, PinProvider,
    PinServiceError, PinStatus,
};
use crate::root::{Entry, MutableRoot, NodeLink, RootError};
use crate::store::{BlockStore, BlockStoreError};

/// Upper bound on resolving a content identifier to its root
/// node during pin sync. Nothing else in the crate imposes its
/// own deadline; the store's transfer behavior applies
/// transitively.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("default error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("node error: {0}")]
    Node(#[from] NodeError),
    #[error("root error: {0}")]
    Root(#[from] RootError),
    #[error("block store error: {0}")]
    BlockStore(#[from] BlockStoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("pin service error: {0}")]
    PinService(#[from] PinServiceError),
    #[error("pin confirmation error: {0}")]
    Confirm(#[from] ConfirmError),
    #[error("no content identifier to resolve: set a pin or a root override")]
    UnknownRoot,
    #[error("timed out resolving {0}")]
    ResolveTimeout(Link),
}

/// Byte input for [`Client::put`]
pub type ByteStream =
    std::pin::Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static>>;

/// What to attach at a path: an identifier for content already in
/// the store, or a byte stream to ingest.
pub enum PutSource {
    Cid(String),
    Stream(ByteStream),
}

impl PutSource {
    pub fn cid(cid: impl Into<String>) -> Self {
        PutSource::Cid(cid.into())
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        let bytes = data.into();
        PutSource::Stream(Box::pin(stream::iter(vec![Ok::<_, std::io::Error>(bytes)])))
    }
}

#[derive(Debug, Default)]
struct RootState {
    /// the content identifier the root should represent; updated
    /// only after a successful (re)build or flush
    cid: Option<Link>,
    root: Option<MutableRoot>,
}

/// One client's handle on the shared storage node.
///
/// Pairs a reference into the node registry with one pin identity
/// and one lazily-built [`MutableRoot`]. The root and its content
/// identifier live under a read-write lock: listings and reads
/// take it shared, mutations and rebuilds take it exclusive.
///
/// Handles must be released with [`Client::close`]; a handle that
/// is merely dropped keeps its node reference alive.
#[derive(Debug)]
pub struct Client {
    registry: Arc<NodeRegistry>,
    node: Arc<StorageNode>,
    pins: Arc<dyn PinProvider>,
    pin_id: Option<String>,
    policy: ConfirmPolicy,
    state: RwLock<RootState>,
}

impl Client {
    /// Acquire a handle on the process-wide node, constructing the
    /// node if this is the first live handle. Every handle gets
    /// its own pin service client for the given url and token.
    pub async fn acquire(service_url: &str, service_token: &str) -> Result<Client, ClientError> {
        let pins = Arc::new(HttpPinService::new(service_url, service_token)?);
        Self::acquire_with(NodeRegistry::global(), pins).await
    }

    /// Acquire against a specific registry and pin provider.
    pub async fn acquire_with(
        registry: Arc<NodeRegistry>,
        pins: Arc<dyn PinProvider>,
    ) -> Result<Client, ClientError> {
        let node = registry.acquire().await?;
        Ok(Client {
            registry,
            node,
            pins,
            pin_id: None,
            policy: ConfirmPolicy::default(),
            state: RwLock::new(RootState::default()),
        })
    }

    /// Track the named pin during resolution and confirmation.
    pub fn with_pin_id(mut self, pin_id: impl Into<String>) -> Self {
        self.pin_id = Some(pin_id.into());
        self
    }

    /// Start resolution from a known root identifier instead of
    /// (or in addition to) the pin record.
    pub fn with_root(self, link: Link) -> Self {
        Client {
            state: RwLock::new(RootState {
                cid: Some(link),
                root: None,
            }),
            ..self
        }
    }

    pub fn with_confirm_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn node_id(&self) -> NodeId {
        self.node.id()
    }

    /// The node's block store, shared with every other handle.
    pub fn blocks(&self) -> &BlockStore {
        self.node.store()
    }

    /// The content identifier the root currently represents.
    pub async fn root_link(&self) -> Option<Link> {
        self.state.read().await.cid
    }

    /// Flush and discard the mutable root, then release this
    /// handle's reference on the shared node. The last handle to
    /// close tears the node down.
    pub async fn close(self) {
        {
            let mut state = self.state.write().await;
            if let Some(mut root) = state.root.take() {
                match root.flush().await {
                    Ok(link) => state.cid = Some(link),
                    Err(err) => tracing::warn!("failed to flush root during close: {err}"),
                }
            }
        }
        self.registry.release().await;
    }

    /// Install a fresh empty directory as the mutable root, for
    /// callers starting from nothing rather than from a pin.
    pub async fn init_root(&self) -> Result<Link, ClientError> {
        let mut state = self.state.write().await;
        let root = MutableRoot::init(self.node.store()).await?;
        let link = root.link();
        if let Some(mut previous) = state.root.take() {
            if let Err(err) = previous.flush().await {
                tracing::warn!("failed to flush previous root: {err}");
            }
        }
        state.root = Some(root);
        state.cid = Some(link);
        Ok(link)
    }

    /// Force a resolve-and-rebuild even if a root is already held.
    /// On failure the previous root stays installed and usable.
    pub async fn rebuild(&self) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        self.resolve_root(&mut state).await
    }

    /// List the directory at `path`.
    pub async fn ls(&self, path: &str) -> Result<Vec<Entry>, ClientError> {
        self.ensure_root().await?;
        let state = self.state.read().await;
        let root = state.root.as_ref().ok_or(ClientError::UnknownRoot)?;
        Ok(root.ls(path).await?)
    }

    /// Read back the file at `path`.
    pub async fn cat(&self, path: &str) -> Result<Bytes, ClientError> {
        self.ensure_root().await?;
        let state = self.state.read().await;
        let root = state.root.as_ref().ok_or(ClientError::UnknownRoot)?;
        Ok(root.read(path).await?)
    }

    /// Create an empty directory at `path`; parents must already
    /// exist.
    pub async fn mkdir(&self, path: &str) -> Result<Confirmation, ClientError> {
        self.ensure_root().await?;
        let mut state = self.state.write().await;
        let root = state.root.as_mut().ok_or(ClientError::UnknownRoot)?;
        root.mkdir(path).await?;
        self.flush_and_confirm(&mut state).await
    }

    /// Relocate the node at `src` to `dst`.
    pub async fn mv(&self, src: &str, dst: &str) -> Result<Confirmation, ClientError> {
        self.ensure_root().await?;
        let mut state = self.state.write().await;
        let root = state.root.as_mut().ok_or(ClientError::UnknownRoot)?;
        root.mv(src, dst).await?;
        self.flush_and_confirm(&mut state).await
    }

    /// Attach content at `path`: either a resolved identifier or
    /// an ingested byte stream. Intermediate directories are
    /// created; an existing entry at `path` is replaced.
    pub async fn put(&self, path: &str, source: PutSource) -> Result<Confirmation, ClientError> {
        self.ensure_root().await?;
        // resolve or ingest before taking the write lock; the
        // store is safe under concurrent access
        let link = self.resolve_source(source).await?;
        let mut state = self.state.write().await;
        let root = state.root.as_mut().ok_or(ClientError::UnknownRoot)?;
        root.attach(path, link).await?;
        self.flush_and_confirm(&mut state).await
    }

    /// Remove the child `name` from the directory at `parent`.
    pub async fn unlink(&self, parent: &str, name: &str) -> Result<Confirmation, ClientError> {
        self.ensure_root().await?;
        let mut state = self.state.write().await;
        let root = state.root.as_mut().ok_or(ClientError::UnknownRoot)?;
        root.unlink(parent, name).await?;
        self.flush_and_confirm(&mut state).await
    }

    /// Build the mutable root if this handle does not hold one
    /// yet. Double-checked so concurrent readers do not stack up
    /// redundant rebuilds behind the write lock.
    async fn ensure_root(&self) -> Result<(), ClientError> {
        if self.state.read().await.root.is_some() {
            return Ok(());
        }
        let mut state = self.state.write().await;
        if state.root.is_some() {
            return Ok(());
        }
        self.resolve_root(&mut state).await
    }

    /// Resolve the pin record to a content identifier and build a
    /// fresh root from it.
    ///
    /// The pin service answers which identifier is authoritative;
    /// the store answers what that content looks like. A service
    /// failure only means the already-known identifier stands, so
    /// remote latency or unavailability never corrupts a cached
    /// root: state is replaced only after the new root is built.
    async fn resolve_root(&self, state: &mut RootState) -> Result<(), ClientError> {
        let pin_id = self.pin_id.clone().unwrap_or_default();
        let mut target = state.cid;
        let mut providers: Vec<NodeId> = Vec::new();

        match self.pins.status_by_id(&pin_id).await {
            Ok(record) => {
                for delegate in &record.delegates {
                    match delegate.parse::<NodeId>() {
                        Ok(peer) => {
                            providers.push(peer);
                            let node = self.node.clone();
                            // nobody awaits these; failures are logged
                            tokio::spawn(async move {
                                if let Err(err) = node.connect_peer(peer).await {
                                    tracing::debug!("delegate connect to {peer} failed: {err}");
                                }
                            });
                        }
                        Err(err) => {
                            tracing::debug!("ignoring malformed delegate {delegate}: {err}")
                        }
                    }
                }
                if record.status == PinStatus::Pinned {
                    target = Some(record.cid.parse()?);
                }
            }
            Err(err) => {
                tracing::debug!("pin lookup for {pin_id:?} failed, keeping known root: {err}");
            }
        }

        let target = target.ok_or(ClientError::UnknownRoot)?;
        let root = match tokio::time::timeout(RESOLVE_TIMEOUT, self.open_root(target, &providers))
            .await
        {
            Ok(root) => root?,
            Err(_) => return Err(ClientError::ResolveTimeout(target)),
        };

        let link = root.link();
        if let Some(mut previous) = state.root.take() {
            if let Err(err) = previous.flush().await {
                tracing::warn!("failed to flush previous root: {err}");
            }
        }
        state.root = Some(root);
        state.cid = Some(link);
        Ok(())
    }

    async fn open_root(
        &self,
        link: Link,
        providers: &[NodeId],
    ) -> Result<MutableRoot, ClientError> {
        if !providers.is_empty() {
            // best-effort pull from the advertised delegates; a
            // local copy makes this a no-op
            if let Err(err) = self
                .node
                .store()
                .fetch(link.hash(), providers.to_vec(), self.node.endpoint())
                .await
            {
                tracing::debug!("fetch of {link} from delegates failed: {err}");
            }
        }
        Ok(MutableRoot::open(link, self.node.store()).await?)
    }

    async fn flush_and_confirm(&self, state: &mut RootState) -> Result<Confirmation, ClientError> {
        let root = state.root.as_mut().ok_or(ClientError::UnknownRoot)?;
        let link = root.flush().await?;
        state.cid = Some(link);
        Ok(confirm(&self.policy, self.pins.as_ref(), self.pin_id.as_deref(), link).await?)
    }

    async fn resolve_source(&self, source: PutSource) -> Result<NodeLink, ClientError> {
        match source {
            PutSource::Cid(cid) => {
                let link: Link = cid.parse()?;
                let store = self.node.store();
                if !store.stat(&link.hash()).await? {
                    return Err(ClientError::Root(RootError::LinkNotFound(link)));
                }
                let data = store.get(&link.hash()).await?;
                // the codec tag decides how the blob hangs in the
                // tree: directory nodes keep their kind, everything
                // else is a file
                if link.codec() == LD_DAG_CBOR_CODEC {
                    Ok(NodeLink::Dir(link))
                } else {
                    Ok(NodeLink::File(link, data.len() as u64))
                }
            }
            PutSource::Stream(stream) => {
                let counter = Arc::new(AtomicU64::new(0));
                let counting = {
                    let counter = counter.clone();
                    stream.inspect_ok(move |chunk: &Bytes| {
                        counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                    })
                };
                let hash = self.node.store().put_stream(Box::pin(counting)).await?;
                let size = counter.load(Ordering::Relaxed);
                Ok(NodeLink::File(Link::new(LD_RAW_CODEC, hash), size))
            }
        }
    }
}
