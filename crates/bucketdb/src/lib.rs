//! ## Crate layout
//! - `core`: buckets, indexes, sequences, migrations, bindings, query
//!   routes, configuration, errors, and observability.
//!
//! The `prelude` module carries the vocabulary application code needs to
//! declare and use buckets.

pub use bucketdb_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use core::Error;

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        binding::{Context, ModelBucket as _, UnboundModelBucket as _, with_last_modified},
        bucket::{Bucket, BucketBuilder},
        config::EngineConfig,
        index::Indexer,
        migration::{MigrationBucket, MigrationRegistry, no_modification},
        model::{Metadata, Model, Object},
        query::{QueryMode, QueryRouter},
        serialize::{deserialize, serialize},
        store::{MemoryStore, ReadStore as _, WriteStore as _},
    };
    pub use serde::{Deserialize, Serialize};
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
    struct Note {
        text: String,
        #[serde(default)]
        metadata: Metadata,
    }

    impl Model for Note {
        const PATH: &'static str = "bucketdb::tests::Note";

        fn validate(&self) -> Result<(), crate::Error> {
            Ok(())
        }

        fn marshal(&self) -> Result<Vec<u8>, crate::Error> {
            Ok(serialize(self)?)
        }

        fn unmarshal(&mut self, bytes: &[u8]) -> Result<(), crate::Error> {
            *self = deserialize(bytes)?;
            Ok(())
        }

        fn metadata_mut(&mut self) -> Option<&mut Metadata> {
            Some(&mut self.metadata)
        }
    }

    #[test]
    fn prelude_is_enough_to_use_a_bucket() {
        let notes = with_last_modified(Bucket::new("note", Note::default()));
        let bound = notes.bind(&Context::new().with_height(10));
        let mut store = MemoryStore::new();

        let key = bound
            .put(
                &mut store,
                None,
                Note {
                    text: "hello".to_string(),
                    ..Note::default()
                },
            )
            .expect("put");

        let note = bound.one(&store, &key).expect("one");
        assert_eq!(note.value().text, "hello");
        assert_eq!(note.value().metadata.last_modified, Some(10));
    }

    #[test]
    fn version_is_exported() {
        assert!(!crate::VERSION.is_empty());
    }
}
