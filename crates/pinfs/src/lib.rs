/**
 * Client handles over a shared storage node.
 *  Pairs the process-wide node with one mutable root
 *  and one pin identity, and exposes the tree operations.
 */
pub mod client;
/**
 * Internal wrapper around codec-tagged content identifiers
 *  and the DAG-CBOR block encoding used for directory nodes.
 */
pub mod linked_data;
/**
 * The backing storage node and its lifecycle.
 *  One node per registry, reference-counted across clients,
 *  torn down when the last reference releases.
 */
pub mod node;
/**
 * Remote pin-tracking service boundary.
 *  Status lookup and pin submission behind a provider trait,
 *  plus the post-flush confirmation policy.
 */
pub mod pin;
/**
 * On-disk repository bootstrap: generated identity,
 *  config file, lock file, and the blobs directory.
 */
pub mod repo;
/**
 * The mutable directory view over one immutable
 *  content-graph snapshot, and its tree primitives.
 */
pub mod root;
/**
 * Storage layer implementation.
 *  Just a light wrapper around an iroh-blobs store.
 */
pub mod store;

pub mod prelude {
    pub use crate::client::{Client, ClientError, PutSource};
    pub use crate::linked_data::Link;
    pub use crate::node::{NodeRegistry, StorageNode};
    pub use crate::pin::{ConfirmPolicy, Confirmation, PinProvider, PinRecord, PinStatus};
    pub use crate::root::{Entry, MutableRoot, RootError};
    pub use crate::store::BlockStore;
}
