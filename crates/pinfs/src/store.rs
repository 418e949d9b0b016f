use std::future::IntoFuture;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use futures::Stream;
use iroh::{Endpoint, NodeId};
use iroh_blobs::{
    api::{
        blobs::{BlobStatus, Blobs},
        downloader::{Downloader, Shuffled},
        ExportBaoError, RequestError,
    },
    store::{fs::FsStore, mem::MemStore},
    BlobsProtocol, Hash,
};

use crate::linked_data::{BlockEncoded, CodecError, DagCborCodec};

/// Client over a local iroh-blobs store.
///
/// This is the crate's only view of raw block storage: content
/// goes in as bytes or a byte stream and comes back by hash.
/// Network retrieval happens through [`BlockStore::fetch`], which
/// pulls a missing hash from a set of provider peers over the
/// node's endpoint.
#[derive(Clone, Debug)]
pub struct BlockStore {
    inner: Arc<BlobsProtocol>,
}

impl Deref for BlockStore {
    type Target = Arc<BlobsProtocol>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("block store error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("block store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export bao error: {0}")]
    ExportBao(#[from] ExportBaoError),
    #[error("request error: {0}")]
    Request(#[from] RequestError),
    #[error("decode error: {0}")]
    Decode(#[from] CodecError),
}

impl BlockStore {
    /// Load a block store persisted under the given path.
    pub async fn fs(path: &Path) -> Result<Self, BlockStoreError> {
        tracing::debug!("BlockStore::fs called with path: {:?}", path);
        let store = FsStore::load(path).await?;
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Load a memory block store
    pub async fn memory() -> Result<Self, BlockStoreError> {
        let store = MemStore::new();
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Get a handle to the underlying blobs client against
    ///  the store
    pub fn blobs(&self) -> &Blobs {
        self.inner.store().blobs()
    }

    /// Get a blob as bytes
    pub async fn get(&self, hash: &Hash) -> Result<Bytes, BlockStoreError> {
        let bytes = self.blobs().get_bytes(*hash).await?;
        Ok(bytes)
    }

    /// Get a blob as a block encoded value
    pub async fn get_cbor<T: BlockEncoded<DagCborCodec>>(
        &self,
        hash: &Hash,
    ) -> Result<T, BlockStoreError> {
        let bytes = self.blobs().get_bytes(*hash).await?;
        Ok(T::decode(&bytes)?)
    }

    /// Store a stream of bytes as a blob
    pub async fn put_stream(
        &self,
        stream: impl Stream<Item = std::io::Result<Bytes>> + Send + Unpin + Sync + 'static,
    ) -> Result<Hash, BlockStoreError> {
        let outcome = self
            .blobs()
            .add_stream(stream)
            .into_future()
            .await
            .with_tag()
            .await?
            .hash;
        Ok(outcome)
    }

    /// Store a vec of bytes as a blob
    pub async fn put(&self, data: Vec<u8>) -> Result<Hash, BlockStoreError> {
        let hash = self.blobs().add_bytes(data).into_future().await?.hash;
        Ok(hash)
    }

    /// Check whether a blob is fully present locally
    pub async fn stat(&self, hash: &Hash) -> Result<bool, BlockStoreError> {
        let stat = self
            .blobs()
            .status(*hash)
            .await
            .map_err(|err| BlockStoreError::Default(anyhow!(err)))?;
        Ok(matches!(stat, BlobStatus::Complete { .. }))
    }

    /// Pull a single hash from the given provider peers.
    ///
    /// Checks for local presence first; a hash we already hold is
    /// not re-downloaded.
    pub async fn fetch(
        &self,
        hash: Hash,
        providers: Vec<NodeId>,
        endpoint: &Endpoint,
    ) -> Result<(), BlockStoreError> {
        if self.stat(&hash).await? {
            tracing::debug!("fetch: hash {} already present locally", hash);
            return Ok(());
        }

        if providers.is_empty() {
            return Err(anyhow!("no providers for hash {hash}").into());
        }

        tracing::debug!(
            "fetch: downloading hash {} from {} providers",
            hash,
            providers.len()
        );

        let downloader = Downloader::new(self.inner.store(), endpoint);
        let discovery = Shuffled::new(providers);

        match downloader.download(hash, discovery).await {
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }

        // the downloader reports success before we trust it
        match self.stat(&hash).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(anyhow!("hash {hash} not found after download").into()),
            Err(e) => Err(e),
        }
    }
}
