mod codec;


pub use codec::{ModelCodec, RecordCodec};

use crate::{
    config::{EngineConfig, IndexWriteMode},
    error::{InternalError, hex},
    index::{Index, IndexPlan, Indexer},
    model::{Model, Object},
    obs::sink::{self, MetricsEvent},
    sequence::Sequence,
    store::{ReadStore, WriteStore},
};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{debug, warn};

/// Name of the default primary-key sequence.
pub const SEQ_ID: &str = "id";

/// Bucket names: 3 to 8 characters from `[a-z_]`.
#[must_use]
pub fn is_bucket_name(name: &str) -> bool {
    (3..=8).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}

///
/// BucketBuilder
///
/// Wiring-time configuration for a bucket. Indexes can only be added here;
/// `build` freezes the index set.
///

pub struct BucketBuilder<M> {
    name: &'static str,
    proto: M,
    indexes: BTreeMap<&'static str, Indexer<M>>,
    unique: BTreeMap<&'static str, bool>,
    config: EngineConfig,
}

impl<M: Model> BucketBuilder<M> {
    /// Start configuring bucket `name` storing records shaped like `proto`.
    ///
    /// Panics if `name` is not 3-8 characters of `[a-z_]`.
    pub fn new(name: &'static str, proto: M) -> Self {
        assert!(is_bucket_name(name), "illegal bucket name: '{name}'");

        Self {
            name,
            proto,
            indexes: BTreeMap::new(),
            unique: BTreeMap::new(),
            config: EngineConfig::default(),
        }
    }

    /// Register a secondary index.
    ///
    /// Panics if an index with this name is already registered.
    #[must_use]
    pub fn with_index(mut self, name: &'static str, indexer: Indexer<M>, unique: bool) -> Self {
        assert!(
            !name.is_empty() && !name.contains(':'),
            "illegal index name: '{name}' (bucket {})",
            self.name
        );
        assert!(
            !self.indexes.contains_key(name),
            "index '{name}' registered twice on bucket {}",
            self.name
        );

        self.indexes.insert(name, indexer);
        self.unique.insert(name, unique);
        self
    }

    /// Attach an engine configuration.
    ///
    /// Panics if the configuration does not validate.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if let Err(err) = config.validate() {
            panic!("invalid engine config for bucket {}: {err}", self.name);
        }

        self.config = config;
        self
    }

    /// Finalize with the plain model codec.
    #[must_use]
    pub fn build(self) -> Bucket<M> {
        self.build_with_codec(Arc::new(ModelCodec))
    }

    /// Finalize with a custom record codec.
    #[must_use]
    pub fn build_with_codec(self, codec: Arc<dyn RecordCodec<M>>) -> Bucket<M> {
        let mut prefix = self.name.as_bytes().to_vec();
        prefix.push(b':');

        let max_refs = self.config.max_index_refs;
        let indexes = self
            .indexes
            .into_iter()
            .map(|(name, indexer)| {
                let unique = self.unique.get(name).copied().unwrap_or(false);
                let index = Index::new(self.name, name, indexer, unique).with_max_refs(max_refs);
                (name, index)
            })
            .collect();

        Bucket {
            name: self.name,
            prefix,
            proto: self.proto,
            indexes,
            codec,
            config: self.config,
        }
    }
}

///
/// Bucket
///
/// Named, prefixed region of the keyspace holding one record type.
/// Records live at `{name}:` + primary key and every write keeps the
/// registered indexes in step with the primary data.
///

#[derive(Clone)]
pub struct Bucket<M> {
    name: &'static str,
    prefix: Vec<u8>,
    proto: M,
    indexes: BTreeMap<&'static str, Index<M>>,
    codec: Arc<dyn RecordCodec<M>>,
    config: EngineConfig,
}

impl<M> fmt::Debug for Bucket<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("indexes", &self.indexes.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M: Model> Bucket<M> {
    #[must_use]
    pub fn builder(name: &'static str, proto: M) -> BucketBuilder<M> {
        BucketBuilder::new(name, proto)
    }

    /// Bucket without secondary indexes.
    #[must_use]
    pub fn new(name: &'static str, proto: M) -> Self {
        BucketBuilder::new(name, proto).build()
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full store key for a primary key.
    #[must_use]
    pub fn db_key(&self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + key.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(key);
        out
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&Index<M>> {
        self.indexes.get(name)
    }

    pub fn index_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.indexes.keys().copied()
    }

    /// Sequence stored at `{name}:` + `seq_name`.
    #[must_use]
    pub fn sequence(&self, seq_name: &str) -> Sequence {
        Sequence::new(self.db_key(seq_name.as_bytes()))
    }

    /// The default primary-key sequence.
    #[must_use]
    pub fn id_sequence(&self) -> Sequence {
        self.sequence(SEQ_ID)
    }

    /// Load one record; an absent key is `Ok(None)`.
    pub fn get<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        key: &[u8],
    ) -> Result<Option<Object<M>>, InternalError> {
        let obj = self.read(store, key)?;
        sink::record(MetricsEvent::Load {
            bucket: self.name,
            rows: u64::from(obj.is_some()),
        });

        Ok(obj)
    }

    fn read<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        key: &[u8],
    ) -> Result<Option<Object<M>>, InternalError> {
        let Some(bytes) = store.get(&self.db_key(key))? else {
            return Ok(None);
        };
        let value = self.codec.decode(&self.proto, &bytes)?;

        Ok(Some(Object::new(key, value)))
    }

    /// Validate, update every index, then write the record.
    ///
    /// Nothing is written for the primary key unless every index accepted
    /// the change.
    pub fn save<S: WriteStore + ?Sized>(
        &self,
        store: &mut S,
        obj: &Object<M>,
    ) -> Result<(), InternalError> {
        if obj.key().is_empty() {
            return Err(InternalError::bucket_unsupported(format!(
                "empty primary key: bucket {}",
                self.name
            )));
        }

        obj.value().validate()?;

        let bytes = self.codec.encode(obj.value())?;
        if bytes.len() > self.config.max_record_bytes {
            return Err(InternalError::bucket_unsupported(format!(
                "record exceeds max size: {} bytes (limit {}) in bucket {}",
                bytes.len(),
                self.config.max_record_bytes,
                self.name
            )));
        }

        if !self.indexes.is_empty() {
            // Always diff against what is stored, never against caller state.
            let prev = self.read(&*store, obj.key())?;
            self.update_indexes(store, prev.as_ref(), Some(obj))?;
        }
        store.set(self.db_key(obj.key()), bytes)?;

        debug!(bucket = self.name, key = %hex(obj.key()), "record saved");
        sink::record(MetricsEvent::Save { bucket: self.name });

        Ok(())
    }

    /// Drop every index reference to `key`, then the record itself.
    /// Deleting an absent key is a no-op.
    pub fn delete<S: WriteStore + ?Sized>(
        &self,
        store: &mut S,
        key: &[u8],
    ) -> Result<(), InternalError> {
        let db_key = self.db_key(key);
        if self.indexes.is_empty() {
            if !store.has(&db_key)? {
                return Ok(());
            }
        } else {
            let Some(prev) = self.read(&*store, key)? else {
                return Ok(());
            };
            self.update_indexes(store, Some(&prev), None)?;
        }
        store.delete(&db_key)?;

        debug!(bucket = self.name, key = %hex(key), "record deleted");
        sink::record(MetricsEvent::Delete { bucket: self.name });

        Ok(())
    }

    fn update_indexes<S: WriteStore + ?Sized>(
        &self,
        store: &mut S,
        prev: Option<&Object<M>>,
        next: Option<&Object<M>>,
    ) -> Result<(), InternalError> {
        let (inserts, removes) = match self.config.index_writes {
            IndexWriteMode::Staged => {
                let plans = self
                    .indexes
                    .values()
                    .map(|index| index.plan(&*store, prev, next))
                    .collect::<Result<Vec<IndexPlan>, _>>()?;

                let mut totals = (0, 0);
                for plan in plans {
                    totals.0 += plan.inserts;
                    totals.1 += plan.removes;
                    plan.apply(store)?;
                }
                totals
            }
            IndexWriteMode::Eager => {
                let mut totals = (0, 0);
                for index in self.indexes.values() {
                    let plan = index.plan(&*store, prev, next)?;
                    totals.0 += plan.inserts;
                    totals.1 += plan.removes;
                    plan.apply(store)?;
                }
                totals
            }
        };

        sink::record(MetricsEvent::IndexDelta {
            bucket: self.name,
            inserts,
            removes,
        });

        Ok(())
    }

    fn index_or_err(&self, name: &str) -> Result<&Index<M>, InternalError> {
        self.indexes.get(name).ok_or_else(|| {
            InternalError::bucket_config(format!("no such index: {name} (bucket {})", self.name))
        })
    }

    /// Records whose `name` index entry is exactly `key`.
    pub fn get_indexed<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        name: &str,
        key: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError> {
        let refs = self.index_or_err(name)?.get_at(store, key)?;

        self.read_refs(store, name, refs)
    }

    /// Records matching the index keys derived from `pattern`.
    pub fn get_indexed_like<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        name: &str,
        pattern: &Object<M>,
    ) -> Result<Vec<Object<M>>, InternalError> {
        let refs = self.index_or_err(name)?.get_like(store, pattern)?;

        self.read_refs(store, name, refs)
    }

    /// Records whose `name` index key starts with `prefix`.
    pub fn get_indexed_prefix<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        name: &str,
        prefix: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError> {
        let refs = self.index_or_err(name)?.get_prefix(store, prefix)?;

        self.read_refs(store, name, refs)
    }

    // An index pointing at a missing record means the index and primary
    // data diverged; surface it instead of skipping.
    fn read_refs<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        index: &str,
        refs: Vec<Vec<u8>>,
    ) -> Result<Vec<Object<M>>, InternalError> {
        let mut out = Vec::with_capacity(refs.len());
        for key in refs {
            let Some(obj) = self.read(store, &key)? else {
                warn!(bucket = self.name, index, key = %hex(&key), "index references missing record");

                return Err(InternalError::store_corruption(format!(
                    "index {}_{index} references missing record {}",
                    self.name,
                    hex(&key)
                )));
            };
            out.push(obj);
        }

        sink::record(MetricsEvent::Load {
            bucket: self.name,
            rows: out.len() as u64,
        });

        Ok(out)
    }
}
