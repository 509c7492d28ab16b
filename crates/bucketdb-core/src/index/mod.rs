mod entry;
mod plan;


pub use entry::{IndexEntryCorruption, MAX_INDEX_ENTRY_BYTES, MultiRef};
pub(crate) use plan::{IndexPlan, plan_index_update};

use crate::{
    config::DEFAULT_MAX_INDEX_REFS,
    error::InternalError,
    model::{Model, Object},
    store::{ReadStore, WriteStore},
};
use std::{collections::BTreeSet, fmt, sync::Arc};

type IndexerFn<M> = dyn Fn(&Object<M>) -> Result<Vec<Vec<u8>>, InternalError> + Send + Sync;

///
/// Indexer
///
/// Derives zero, one or several index keys from an object. Producing no
/// key leaves the object out of the index; empty keys are dropped.
///

pub struct Indexer<M>(Arc<IndexerFn<M>>);

impl<M> Clone for Indexer<M> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<M> fmt::Debug for Indexer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Indexer(..)")
    }
}

impl<M: 'static> Indexer<M> {
    /// Fallible indexer over the whole object, key included.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Object<M>) -> Result<Vec<Vec<u8>>, InternalError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// At most one key per record; `None` skips the record.
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&M) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self::new(move |obj| Ok(f(obj.value()).into_iter().collect()))
    }

    /// Any number of keys per record.
    pub fn multi<F>(f: F) -> Self
    where
        F: Fn(&M) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        Self::new(move |obj| Ok(f(obj.value())))
    }
}

///
/// Index
///
/// Secondary mapping from derived keys to the primary keys producing them.
/// Entries live under `{bucket}_{index}:` + derived key.
///

#[derive(Clone, Debug)]
pub struct Index<M> {
    bucket: &'static str,
    index: &'static str,
    name: String,
    prefix: Vec<u8>,
    indexer: Indexer<M>,
    unique: bool,
    max_refs: usize,
}

impl<M> Index<M> {
    #[must_use]
    pub fn new(bucket: &'static str, index: &'static str, indexer: Indexer<M>, unique: bool) -> Self {
        let name = format!("{bucket}_{index}");
        let mut prefix = name.clone().into_bytes();
        prefix.push(b':');

        Self {
            bucket,
            index,
            name,
            prefix,
            indexer,
            unique,
            max_refs: DEFAULT_MAX_INDEX_REFS,
        }
    }

    #[must_use]
    pub(crate) const fn with_max_refs(mut self, max_refs: usize) -> Self {
        self.max_refs = max_refs;
        self
    }

    /// Full index name, `{bucket}_{index}`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn bucket(&self) -> &'static str {
        self.bucket
    }

    /// Name the index was registered under within its bucket.
    #[must_use]
    pub const fn index_name(&self) -> &'static str {
        self.index
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub const fn max_refs(&self) -> usize {
        self.max_refs
    }

    /// Store key of the entry for one derived key.
    #[must_use]
    pub fn db_key(&self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + key.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(key);
        out
    }

    pub(crate) fn load_entry<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        db_key: &[u8],
    ) -> Result<Option<MultiRef>, InternalError> {
        store
            .get(db_key)?
            .map(|bytes| {
                MultiRef::decode(&bytes).map_err(|err| {
                    InternalError::index_corruption(format!("index corrupted: {} -> {err}", self.name))
                })
            })
            .transpose()
    }

    /// Primary keys stored under exactly `key`; empty when absent.
    pub fn get_at<S: ReadStore + ?Sized>(&self, store: &S, key: &[u8]) -> Result<Vec<Vec<u8>>, InternalError> {
        Ok(self
            .load_entry(store, &self.db_key(key))?
            .map(MultiRef::into_refs)
            .unwrap_or_default())
    }

    /// Primary keys under every derived key starting with `prefix`, sorted
    /// and de-duplicated.
    pub fn get_prefix<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        prefix: &[u8],
    ) -> Result<Vec<Vec<u8>>, InternalError> {
        let mut refs = BTreeSet::new();
        for (db_key, bytes) in store.scan_prefix(&self.db_key(prefix))? {
            let entry = MultiRef::decode(&bytes).map_err(|err| {
                InternalError::index_corruption(format!(
                    "index corrupted: {} [{}] -> {err}",
                    self.name,
                    String::from_utf8_lossy(&db_key)
                ))
            })?;
            refs.extend(entry.into_refs());
        }

        Ok(refs.into_iter().collect())
    }
}

impl<M: Model> Index<M> {
    /// Derived keys for `obj`, de-duplicated, with empty keys dropped.
    pub fn keys_for(&self, obj: &Object<M>) -> Result<BTreeSet<Vec<u8>>, InternalError> {
        let keys = (self.indexer.0)(obj)?;

        Ok(keys.into_iter().filter(|key| !key.is_empty()).collect())
    }

    /// Query by example: derive keys from `pattern` and collect their
    /// primary keys, sorted and de-duplicated.
    pub fn get_like<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        pattern: &Object<M>,
    ) -> Result<Vec<Vec<u8>>, InternalError> {
        let mut refs = BTreeSet::new();
        for key in self.keys_for(pattern)? {
            refs.extend(self.get_at(store, &key)?);
        }

        Ok(refs.into_iter().collect())
    }

    /// Move the index from `prev` to `next` for one object.
    ///
    /// `prev` is `None` on insert and `next` is `None` on delete. On error
    /// this index is left untouched.
    pub fn update<S: WriteStore + ?Sized>(
        &self,
        store: &mut S,
        prev: Option<&Object<M>>,
        next: Option<&Object<M>>,
    ) -> Result<(), InternalError> {
        let plan = self.plan(&*store, prev, next)?;

        plan.apply(store)
    }

    pub(crate) fn plan<S: ReadStore + ?Sized>(
        &self,
        store: &S,
        prev: Option<&Object<M>>,
        next: Option<&Object<M>>,
    ) -> Result<IndexPlan, InternalError> {
        plan_index_update(self, store, prev, next)
    }
}
