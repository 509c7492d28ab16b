//! Schema-versioned buckets.
//!
//! Records are persisted inside a small envelope carrying their schema
//! version. Writes always use the current version; reads of older records
//! run the registered steps in order before handing the value out.

mod codec;
mod registry;

#[cfg(test)]
mod tests;

pub use codec::SchemaCodec;
#[cfg(test)]
pub(crate) use codec::SchemaEnvelope;
pub use registry::{MigrationRegistry, no_modification};

use crate::{
    bucket::{Bucket, BucketBuilder},
    model::Model,
};
use derive_more::Deref;
use std::sync::Arc;

///
/// MigrationBucket
///
/// Bucket whose records pass through the migration registry. Exposes the
/// full [`Bucket`] API through `Deref`.
///

#[derive(Clone, Debug, Deref)]
pub struct MigrationBucket<M> {
    #[deref]
    bucket: Bucket<M>,
    version: u32,
}

impl<M: Model> MigrationBucket<M> {
    /// Finalize `builder` with a schema codec backed by `registry`.
    ///
    /// Panics if `M` has no registered schema.
    #[must_use]
    pub fn new(builder: BucketBuilder<M>, registry: Arc<MigrationRegistry>) -> Self {
        let Some(version) = registry.current_version::<M>() else {
            panic!("schema not registered: {}", M::PATH);
        };

        let bucket = builder.build_with_codec(Arc::new(SchemaCodec::new(registry, version)));

        Self { bucket, version }
    }

    /// Schema version every write is stamped with.
    #[must_use]
    pub const fn current_version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub const fn bucket(&self) -> &Bucket<M> {
        &self.bucket
    }
}
