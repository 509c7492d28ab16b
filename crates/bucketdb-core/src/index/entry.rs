//! Module: index::entry
//! Responsibility: MultiRef payload encode/decode and structural validation.
//! Does not own: unique-policy decisions (see `index::plan`).

use crate::{
    error::InternalError,
    serialize::{DEFAULT_MAX_DECODE_BYTES, deserialize, serialize},
};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use thiserror::Error as ThisError;

/// Largest encoded entry a read will accept.
pub const MAX_INDEX_ENTRY_BYTES: usize = DEFAULT_MAX_DECODE_BYTES;

///
/// IndexEntryCorruption
///

#[derive(Debug, ThisError)]
pub enum IndexEntryCorruption {
    #[error("index entry failed to decode: {0}")]
    Undecodable(String),

    #[error("index entry contains zero keys")]
    EmptyEntry,

    #[error("index entry keys are not in ascending order")]
    Unsorted,

    #[error("index entry contains duplicate key")]
    DuplicateKey,

    #[error("index entry contains an empty key")]
    EmptyKey,
}

impl From<IndexEntryCorruption> for InternalError {
    fn from(err: IndexEntryCorruption) -> Self {
        Self::index_corruption(err.to_string())
    }
}

///
/// MultiRefWire
///
/// Persisted shape of a MultiRef.
///

#[derive(Deserialize, Serialize)]
struct MultiRefWire {
    refs: Vec<ByteBuf>,
}

///
/// MultiRef
///
/// Ordered, de-duplicated primary keys stored under one index key.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultiRef {
    refs: Vec<Vec<u8>>,
}

impl MultiRef {
    #[must_use]
    pub fn single(key: &[u8]) -> Self {
        Self {
            refs: vec![key.to_vec()],
        }
    }

    /// Insert `key` keeping order; returns false if it was already present.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        match self.refs.binary_search_by(|probe| probe.as_slice().cmp(key)) {
            Ok(_) => false,
            Err(pos) => {
                self.refs.insert(pos, key.to_vec());
                true
            }
        }
    }

    /// Remove `key`; returns false if it was not present.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.refs.binary_search_by(|probe| probe.as_slice().cmp(key)) {
            Ok(pos) => {
                self.refs.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.refs
            .binary_search_by(|probe| probe.as_slice().cmp(key))
            .is_ok()
    }

    #[must_use]
    pub fn first(&self) -> Option<&[u8]> {
        self.refs.first().map(Vec::as_slice)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.refs.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.refs.iter().map(Vec::as_slice)
    }

    #[must_use]
    pub fn into_refs(self) -> Vec<Vec<u8>> {
        self.refs
    }

    pub fn encode(&self) -> Result<Vec<u8>, InternalError> {
        let wire = MultiRefWire {
            refs: self.refs.iter().cloned().map(ByteBuf::from).collect(),
        };

        Ok(serialize(&wire)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, IndexEntryCorruption> {
        let wire: MultiRefWire =
            deserialize(bytes).map_err(|err| IndexEntryCorruption::Undecodable(err.to_string()))?;
        let refs: Vec<Vec<u8>> = wire.refs.into_iter().map(ByteBuf::into_vec).collect();

        // Phase 1: shape checks.
        if refs.is_empty() {
            return Err(IndexEntryCorruption::EmptyEntry);
        }
        if refs.iter().any(Vec::is_empty) {
            return Err(IndexEntryCorruption::EmptyKey);
        }

        // Phase 2: strict ascending order (which also rules out duplicates).
        for pair in refs.windows(2) {
            match pair[0].cmp(&pair[1]) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => return Err(IndexEntryCorruption::DuplicateKey),
                std::cmp::Ordering::Greater => return Err(IndexEntryCorruption::Unsorted),
            }
        }

        Ok(Self { refs })
    }
}

///
/// TESTS
///
