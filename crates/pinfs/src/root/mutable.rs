use anyhow::anyhow;
use bytes::Bytes;

use crate::linked_data::{BlockEncoded, CodecError, Link, LD_DAG_CBOR_CODEC};
use crate::store::{BlockStore, BlockStoreError};

use super::node::{Entry, Node, NodeLink};

#[derive(Debug, thiserror::Error)]
pub enum RootError {
    #[error("default error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("link not found: {0}")]
    LinkNotFound(Link),
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("path already exists: {0}")]
    PathAlreadyExists(String),
    #[error("cannot move '{from}' into its own subtree at '{to}'")]
    MoveIntoSelf { from: String, to: String },
    #[error("expected a directory node at {0}")]
    UnexpectedNodeKind(Link),
    #[error("block store error: {0}")]
    BlockStore(#[from] BlockStoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// An editable directory tree materialized from one immutable
/// root snapshot.
///
/// Mutations persist every rewritten interior node immediately;
/// the root node itself is kept in memory and written by
/// [`MutableRoot::flush`], which returns the tree's current
/// content identifier. Nothing here locks: the owning client
/// serializes access.
#[derive(Debug, Clone)]
pub struct MutableRoot {
    entry: Node,
    link: Link,
    dirty: bool,
    store: BlockStore,
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

impl MutableRoot {
    /// A fresh root over an empty directory.
    pub async fn init(store: &BlockStore) -> Result<Self, RootError> {
        let entry = Node::default();
        let link = Self::put_node(&entry, store).await?;
        Ok(MutableRoot {
            entry,
            link,
            dirty: false,
            store: store.clone(),
        })
    }

    /// Open the directory node behind `link` as a mutable root.
    ///
    /// The target must carry the directory codec and decode as a
    /// directory node; anything else is `UnexpectedNodeKind`, which
    /// signals an unexpected content shape rather than a transient
    /// fault.
    pub async fn open(link: Link, store: &BlockStore) -> Result<Self, RootError> {
        if link.codec() != LD_DAG_CBOR_CODEC {
            return Err(RootError::UnexpectedNodeKind(link));
        }
        if !store.stat(&link.hash()).await? {
            return Err(RootError::LinkNotFound(link));
        }
        let data = store.get(&link.hash()).await?;
        let entry = Node::decode(&data).map_err(|_| RootError::UnexpectedNodeKind(link))?;
        Ok(MutableRoot {
            entry,
            link,
            dirty: false,
            store: store.clone(),
        })
    }

    /// The root's content identifier as of the last flush.
    pub fn link(&self) -> Link {
        self.link
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the root node back to the store, producing the tree's
    /// current content identifier.
    pub async fn flush(&mut self) -> Result<Link, RootError> {
        if self.dirty {
            self.link = Self::put_node(&self.entry, &self.store).await?;
            self.dirty = false;
        }
        Ok(self.link)
    }

    /// List the directory at `path`, one entry per child.
    pub async fn ls(&self, path: &str) -> Result<Vec<Entry>, RootError> {
        let node = self.node_at(&segments(path)).await?;
        Ok(node
            .links()
            .iter()
            .map(|(name, link)| Entry::new(name, link))
            .collect())
    }

    /// Resolve the link at `path`. The root itself has no link
    /// entry and reports `PathNotFound`.
    pub async fn lookup(&self, path: &str) -> Result<NodeLink, RootError> {
        let parts = segments(path);
        let (name, parents) = parts
            .split_last()
            .ok_or_else(|| RootError::PathNotFound(path.to_string()))?;
        let parent = self.node_at(parents).await?;
        parent
            .get_link(name)
            .copied()
            .ok_or_else(|| RootError::PathNotFound(path.to_string()))
    }

    /// Create an empty directory at `path`. Parents must already
    /// exist.
    pub async fn mkdir(&mut self, path: &str) -> Result<(), RootError> {
        let parts = segments(path);
        let (name, parents) = parts
            .split_last()
            .ok_or_else(|| RootError::Default(anyhow!("cannot make the root directory")))?;
        let parent = self.node_at(parents).await?;
        if parent.get_link(name).is_some() {
            return Err(RootError::PathAlreadyExists(path.to_string()));
        }

        let dir = Node::default();
        let link = Self::put_node(&dir, &self.store).await?;
        self.set_at(&parts, NodeLink::Dir(link), false).await
    }

    /// Attach `link` at `path`, creating intermediate directories
    /// and replacing any existing entry.
    pub async fn attach(&mut self, path: &str, link: NodeLink) -> Result<(), RootError> {
        let parts = segments(path);
        if parts.is_empty() {
            return Err(RootError::Default(anyhow!(
                "cannot replace the root directory"
            )));
        }
        self.set_at(&parts, link, true).await
    }

    /// Relocate the node at `src` to `dst`.
    pub async fn mv(&mut self, src: &str, dst: &str) -> Result<(), RootError> {
        let src_parts = segments(src);
        let dst_parts = segments(dst);
        if src_parts.is_empty() {
            return Err(RootError::Default(anyhow!("cannot move the root directory")));
        }
        // also catches src == dst
        if dst_parts.len() >= src_parts.len() && dst_parts[..src_parts.len()] == src_parts[..] {
            return Err(RootError::MoveIntoSelf {
                from: src.to_string(),
                to: dst.to_string(),
            });
        }

        let moved = self.lookup(src).await?;
        if self.lookup(dst).await.is_ok() {
            return Err(RootError::PathAlreadyExists(dst.to_string()));
        }

        let (name, parents) = src_parts
            .split_last()
            .ok_or_else(|| RootError::PathNotFound(src.to_string()))?;
        self.remove_at(parents, name, src).await?;
        self.set_at(&dst_parts, moved, true).await
    }

    /// Remove the child `name` from the directory at `parent`.
    pub async fn unlink(&mut self, parent: &str, name: &str) -> Result<(), RootError> {
        let parents = segments(parent);
        let full = format!("{}/{}", parent.trim_end_matches('/'), name);
        self.remove_at(&parents, name, &full).await.map(|_| ())
    }

    /// Read the file at `path` out of the store.
    pub async fn read(&self, path: &str) -> Result<Bytes, RootError> {
        match self.lookup(path).await? {
            NodeLink::File(link, _) => {
                if !self.store.stat(&link.hash()).await? {
                    return Err(RootError::LinkNotFound(link));
                }
                Ok(self.store.get(&link.hash()).await?)
            }
            NodeLink::Dir(_) => Err(RootError::NotAFile(path.to_string())),
        }
    }

    async fn load_node(&self, link: &NodeLink, at: &str) -> Result<Node, RootError> {
        match link {
            NodeLink::File(..) => Err(RootError::NotADirectory(at.to_string())),
            NodeLink::Dir(link) => {
                if !self.store.stat(&link.hash()).await? {
                    return Err(RootError::LinkNotFound(*link));
                }
                let data = self.store.get(&link.hash()).await?;
                Ok(Node::decode(&data)?)
            }
        }
    }

    /// Walk down from the root through `parts`, yielding the node
    /// at the end of the path.
    async fn node_at(&self, parts: &[String]) -> Result<Node, RootError> {
        let mut node = self.entry.clone();
        let mut consumed = String::new();
        for part in parts {
            consumed.push('/');
            consumed.push_str(part);
            let next = node
                .get_link(part)
                .copied()
                .ok_or_else(|| RootError::PathNotFound(consumed.clone()))?;
            node = self.load_node(&next, &consumed).await?;
        }
        Ok(node)
    }

    /// Re-link `link` under `parts`, rewriting every ancestor
    /// bottom-up. Interior nodes are persisted as they are
    /// rebuilt; the updated root node stays in memory until the
    /// next flush.
    async fn set_at(
        &mut self,
        parts: &[String],
        link: NodeLink,
        create_parents: bool,
    ) -> Result<(), RootError> {
        let (name, parents) = parts
            .split_last()
            .ok_or_else(|| RootError::PathNotFound("/".to_string()))?;

        // descend to the immediate parent, remembering each node we
        // pass through together with its name in its own parent
        let mut visited: Vec<(String, Node)> = Vec::new();
        let mut node = self.entry.clone();
        let mut consumed = String::new();
        for part in parents {
            consumed.push('/');
            consumed.push_str(part);
            match node.get_link(part).copied() {
                Some(next @ NodeLink::Dir(_)) => {
                    let child = self.load_node(&next, &consumed).await?;
                    visited.push((part.clone(), std::mem::replace(&mut node, child)));
                }
                Some(NodeLink::File(..)) => {
                    return Err(RootError::NotADirectory(consumed));
                }
                None if create_parents => {
                    visited.push((part.clone(), std::mem::replace(&mut node, Node::default())));
                }
                None => return Err(RootError::PathNotFound(consumed)),
            }
        }

        // rebuild upward: each rewritten node is stored and becomes
        // a directory link in the node above it
        let mut name = name.clone();
        let mut link = link;
        loop {
            node.insert(name, link);
            match visited.pop() {
                Some((parent_name, parent_node)) => {
                    let stored = Self::put_node(&node, &self.store).await?;
                    link = NodeLink::Dir(stored);
                    name = parent_name;
                    node = parent_node;
                }
                None => {
                    self.entry = node;
                    self.dirty = true;
                    return Ok(());
                }
            }
        }
    }

    /// Drop the child `name` from the directory under `parents`,
    /// propagating the rewrite up to the root.
    async fn remove_at(
        &mut self,
        parents: &[String],
        name: &str,
        full: &str,
    ) -> Result<NodeLink, RootError> {
        let mut parent = self.node_at(parents).await?;
        let removed = parent
            .del(name)
            .ok_or_else(|| RootError::PathNotFound(full.to_string()))?;

        if parents.is_empty() {
            self.entry = parent;
            self.dirty = true;
        } else {
            let stored = Self::put_node(&parent, &self.store).await?;
            self.set_at(parents, NodeLink::Dir(stored), false).await?;
        }
        Ok(removed)
    }

    async fn put_node(node: &Node, store: &BlockStore) -> Result<Link, RootError> {
        let data = node.encode()?;
        let hash = store.put(data).await?;
        Ok(Link::new(LD_DAG_CBOR_CODEC, hash))
    }
}
