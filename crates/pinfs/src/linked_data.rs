use std::fmt;
use std::str::FromStr;

use cid::Cid;
use iroh_blobs::Hash;
use multihash::Multihash;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Multicodec for raw byte blobs
pub const LD_RAW_CODEC: u64 = 0x55;
/// Multicodec for DAG-CBOR encoded nodes
pub const LD_DAG_CBOR_CODEC: u64 = 0x71;

// Multihash code for BLAKE3, the digest every blob in the
//  store is addressed by
const MH_BLAKE3_CODE: u64 = 0x1e;
const DIGEST_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("dag-cbor encode error: {0}")]
    Encode(#[from] serde_ipld_dagcbor::EncodeError<std::collections::TryReserveError>),
    #[error("dag-cbor decode error: {0}")]
    Decode(#[from] serde_ipld_dagcbor::DecodeError<std::convert::Infallible>),
    #[error("cid error: {0}")]
    Cid(#[from] cid::Error),
    #[error("unsupported multihash code: {0:#x}")]
    UnsupportedMultihash(u64),
    #[error("invalid digest length: {0}")]
    InvalidDigestLength(usize),
}

/// A codec-tagged pointer at an immutable blob in the store.
///
/// The codec records how the blob's bytes should be interpreted
/// (raw data vs a DAG-CBOR directory node); the hash is the
/// BLAKE3 digest the store addresses the blob by. Links render
/// as CIDv1 strings at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    codec: u64,
    hash: Hash,
}

impl Link {
    pub fn new(codec: u64, hash: Hash) -> Self {
        Link { codec, hash }
    }

    pub fn codec(&self) -> u64 {
        self.codec
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn to_cid(&self) -> Cid {
        let mh = Multihash::<64>::wrap(MH_BLAKE3_CODE, self.hash.as_bytes())
            .expect("32-byte digest always fits");
        Cid::new_v1(self.codec, mh)
    }

    pub fn from_cid(cid: &Cid) -> Result<Self, CodecError> {
        let mh = cid.hash();
        if mh.code() != MH_BLAKE3_CODE {
            return Err(CodecError::UnsupportedMultihash(mh.code()));
        }
        let digest = mh.digest();
        if digest.len() != DIGEST_SIZE {
            return Err(CodecError::InvalidDigestLength(digest.len()));
        }
        let mut bytes = [0u8; DIGEST_SIZE];
        bytes.copy_from_slice(digest);
        Ok(Link::new(cid.codec(), Hash::from_bytes(bytes)))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cid())
    }
}

impl FromStr for Link {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cid = Cid::try_from(s)?;
        Link::from_cid(&cid)
    }
}

/// Marker for the DAG-CBOR block codec
pub struct DagCborCodec;

/// Types that round-trip through a single DAG-CBOR block.
pub trait BlockEncoded<C>: Serialize + DeserializeOwned {
    fn codec(&self) -> u64 {
        LD_DAG_CBOR_CODEC
    }

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_ipld_dagcbor::to_vec(self)?)
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_ipld_dagcbor::from_slice(data)?)
    }
}
