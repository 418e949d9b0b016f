use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::linked_data::{BlockEncoded, DagCborCodec, Link};

/// A directory's pointer at one child, tagged with the child's
/// kind. File links carry the file size so listings do not have
/// to touch the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeLink {
    Dir(Link),
    File(Link, u64),
}

impl NodeLink {
    pub fn link(&self) -> &Link {
        match self {
            NodeLink::Dir(link) => link,
            NodeLink::File(link, _) => link,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            NodeLink::Dir(_) => 0,
            NodeLink::File(_, size) => *size,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeLink::Dir(_))
    }
}

/// One directory node: a map of child names to links. Path
/// traversal is just repeated lookup of /-separated names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Node {
    links: BTreeMap<String, NodeLink>,
}

impl BlockEncoded<DagCborCodec> for Node {}

impl Node {
    pub fn new() -> Self {
        Node {
            links: BTreeMap::new(),
        }
    }

    pub fn get_link(&self, name: &str) -> Option<&NodeLink> {
        self.links.get(name)
    }

    pub fn insert(&mut self, name: String, link: NodeLink) -> Option<NodeLink> {
        self.links.insert(name, link)
    }

    pub fn del(&mut self, name: &str) -> Option<NodeLink> {
        self.links.remove(name)
    }

    pub fn links(&self) -> &BTreeMap<String, NodeLink> {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// the child's content identifier, rendered as a CID string
    pub id: String,
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

impl Entry {
    pub(crate) fn new(name: &str, link: &NodeLink) -> Entry {
        Entry {
            id: link.link().to_string(),
            name: name.to_string(),
            size: link.size(),
            is_dir: link.is_dir(),
        }
    }
}
