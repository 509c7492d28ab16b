//! Core runtime for BucketDB: buckets over an ordered byte-key store,
//! secondary indexes, sequences, schema migration, and context-bound
//! model buckets with decorators.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod binding;
pub mod bucket;
pub mod config;
pub mod error;
pub mod index;
pub mod migration;
pub mod model;
pub mod obs;
pub mod query;
pub mod sequence;
pub mod serialize;
pub mod store;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::InternalError as Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, serializers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        binding::{Context, ModelBucket as _, UnboundModelBucket as _},
        bucket::{Bucket, BucketBuilder},
        index::Indexer,
        migration::MigrationBucket,
        model::{Metadata, Model, Object},
    };
}
