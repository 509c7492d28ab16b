use crate::{
    error::{InternalError, hex},
    index::{Index, MAX_INDEX_ENTRY_BYTES, MultiRef},
    model::{Model, Object},
    obs::sink::{self, MetricsEvent},
    store::{ReadStore, WriteStore},
};
use std::collections::BTreeSet;
use tracing::warn;

///
/// IndexOp
///
/// One index-store write: `Some(bytes)` sets the entry, `None` deletes it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct IndexOp {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

///
/// IndexPlan
///
/// Every write one index needs for a single object transition. Produced
/// without mutating the store; applying it only fails if the store does.
///

#[derive(Debug, Default)]
pub(crate) struct IndexPlan {
    pub ops: Vec<IndexOp>,
    pub inserts: u64,
    pub removes: u64,
}

impl IndexPlan {
    pub(crate) fn apply<S: WriteStore + ?Sized>(self, store: &mut S) -> Result<(), InternalError> {
        for op in self.ops {
            match op.value {
                Some(value) => store.set(op.key, value)?,
                None => store.delete(&op.key)?,
            }
        }

        Ok(())
    }
}

/// Plan the index mutations for moving one object from `prev` to `next`.
///
/// Old keys no longer produced lose the primary key (dropping the entry
/// once empty); new keys gain it. Keys produced both before and after are
/// left alone. All fallible work, including unique checks, happens here.
pub(crate) fn plan_index_update<M, S>(
    index: &Index<M>,
    store: &S,
    prev: Option<&Object<M>>,
    next: Option<&Object<M>>,
) -> Result<IndexPlan, InternalError>
where
    M: Model,
    S: ReadStore + ?Sized,
{
    let pk = match (prev, next) {
        (Some(p), Some(n)) if p.key() != n.key() => {
            return Err(InternalError::index_unsupported(format!(
                "cannot change primary key through index update: {} ({} -> {})",
                index.name(),
                hex(p.key()),
                hex(n.key())
            )));
        }
        (_, Some(obj)) | (Some(obj), None) => obj.key(),
        (None, None) => return Ok(IndexPlan::default()),
    };

    let old_keys = match prev {
        Some(obj) => index.keys_for(obj)?,
        None => BTreeSet::new(),
    };
    let new_keys = match next {
        Some(obj) => index.keys_for(obj)?,
        None => BTreeSet::new(),
    };

    let mut plan = IndexPlan::default();

    // ── Removal ────────────────────────────────

    for key in old_keys.difference(&new_keys) {
        let db_key = index.db_key(key);
        let Some(mut entry) = index.load_entry(store, &db_key)? else {
            return Err(missing_reference(index, key, pk));
        };
        if !entry.remove(pk) {
            return Err(missing_reference(index, key, pk));
        }

        let value = if entry.is_empty() {
            None
        } else {
            Some(entry.encode()?)
        };
        plan.ops.push(IndexOp { key: db_key, value });
        plan.removes += 1;
    }

    // ── Insertion ──────────────────────────────

    for key in new_keys.difference(&old_keys) {
        let db_key = index.db_key(key);
        let entry = match index.load_entry(store, &db_key)? {
            Some(mut entry) => {
                validate_unique(index, &entry, pk)?;
                entry.insert(pk);
                entry
            }
            None => MultiRef::single(pk),
        };

        if entry.len() > index.max_refs() {
            return Err(InternalError::index_unsupported(format!(
                "index entry exceeds max keys: {} -> {} keys (limit {})",
                index.name(),
                entry.len(),
                index.max_refs()
            )));
        }

        let value = entry.encode()?;
        if value.len() > MAX_INDEX_ENTRY_BYTES {
            return Err(InternalError::index_unsupported(format!(
                "index entry exceeds max size: {} -> {} bytes (limit {MAX_INDEX_ENTRY_BYTES})",
                index.name(),
                value.len()
            )));
        }

        plan.ops.push(IndexOp {
            key: db_key,
            value: Some(value),
        });
        plan.inserts += 1;
    }

    Ok(plan)
}

// Unique entries hold at most one key; a different holder is a conflict.
fn validate_unique<M>(index: &Index<M>, entry: &MultiRef, pk: &[u8]) -> Result<(), InternalError> {
    if !index.is_unique() {
        return Ok(());
    }

    if entry.len() > 1 {
        return Err(InternalError::index_corruption(format!(
            "unique index corrupted: {} -> {} keys",
            index.name(),
            entry.len()
        )));
    }

    match entry.first() {
        Some(holder) if holder != pk => {
            warn!(index = index.name(), holder = %hex(holder), key = %hex(pk), "unique index violation");
            sink::record(MetricsEvent::UniqueViolation {
                bucket: index.bucket(),
                index: index.index_name(),
            });

            Err(InternalError::duplicate_key(index.name(), holder))
        }
        _ => Ok(()),
    }
}

fn missing_reference<M>(index: &Index<M>, key: &[u8], pk: &[u8]) -> InternalError {
    warn!(index = index.name(), key = %hex(key), pk = %hex(pk), "index reference missing");

    InternalError::index_corruption(format!(
        "index entry missing expected key: {} [{}] -> {}",
        index.name(),
        hex(key),
        hex(pk)
    ))
}
