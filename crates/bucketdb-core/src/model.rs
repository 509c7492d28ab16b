use crate::error::InternalError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

///
/// Model
///
/// A record type stored in a bucket.
///
/// `unmarshal` decodes into `self`, which the bucket always obtains by
/// cloning its prototype, so implementations may rely on prototype defaults
/// for fields the encoded bytes leave out.
///

pub trait Model: Clone + Debug + Send + Sync + 'static {
    /// Fully-qualified record path; keys the migration registry and labels errors.
    const PATH: &'static str;

    /// Check the record's own invariants.
    fn validate(&self) -> Result<(), InternalError>;

    fn marshal(&self) -> Result<Vec<u8>, InternalError>;

    fn unmarshal(&mut self, bytes: &[u8]) -> Result<(), InternalError>;

    /// Embedded metadata, for records that carry it.
    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        None
    }
}

///
/// Metadata
///
/// Bookkeeping a record may embed; decorators write into it on `put`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Metadata {
    /// Logical height of the last write through a stamping decorator.
    pub last_modified: Option<u64>,
}

///
/// Object
///
/// A primary key paired with its record. The key is never part of the
/// serialized record; buckets attach it on every read.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Object<M> {
    key: Vec<u8>,
    value: M,
}

impl<M> Object<M> {
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>, value: M) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[must_use]
    pub const fn value(&self) -> &M {
        &self.value
    }

    pub const fn value_mut(&mut self) -> &mut M {
        &mut self.value
    }

    #[must_use]
    pub fn into_value(self) -> M {
        self.value
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, M) {
        (self.key, self.value)
    }
}
