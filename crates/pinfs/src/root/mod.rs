//! The mutable directory view and its building blocks.
//!
//! - **[`Node`]**: one directory in the content graph, a map of
//!   child names to [`NodeLink`]s, stored as a single DAG-CBOR blob
//! - **[`NodeLink`]**: a tagged pointer at a child — a directory
//!   link or a file link carrying the file's size
//! - **[`Entry`]**: one row of a directory listing
//! - **[`MutableRoot`]**: an editable tree materialized from one
//!   immutable root snapshot
//!
//! # Structure
//!
//! A root is a graph of immutable directory nodes:
//! ```text
//! Root Node (dag-cbor)
//!     |
//!     +----------------+----------------+
//!     |                |                |
//!   file1         Dir Node            file2
//!   (raw)         (dag-cbor)          (raw)
//!                     |
//!               +-----+-----+
//!               |           |
//!             file3       file4
//! ```
//!
//! Mutations rewrite the spine of the tree: every node between the
//! change and the root is re-encoded and re-stored, bottom-up. The
//! root node itself stays in memory until [`MutableRoot::flush`],
//! which writes it and yields the tree's new content identifier.

mod mutable;
mod node;

pub use mutable::{MutableRoot, RootError};
pub use node::{Entry, Node, NodeLink};
