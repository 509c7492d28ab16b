use crate::{
    error::InternalError,
    store::{KvPair, ReadStore, WriteStore, prefix_end},
};
use derive_more::{Deref, DerefMut};
use std::{collections::BTreeMap, ops::Bound};

///
/// MemoryStore
///
/// Ordered in-memory keyed store. Infallible; used by tests and by
/// embedders that snapshot state elsewhere.
///

#[derive(Clone, Debug, Default, Deref, DerefMut)]
pub struct MemoryStore(BTreeMap<Vec<u8>, Vec<u8>>);

impl MemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Snapshot all keys (diagnostics only).
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.0.keys().cloned().collect()
    }
}

impl ReadStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        Ok(self.0.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, InternalError> {
        let upper = prefix_end(prefix).map_or(Bound::Unbounded, Bound::Excluded);
        let range = self
            .0
            .range::<[u8], _>((Bound::Included(prefix), upper.as_ref().map(Vec::as_slice)));

        Ok(range.map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl WriteStore for MemoryStore {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        self.0.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError> {
        self.0.remove(key);
        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::store::{ReadStore, WriteStore, prefix_end};

    #[test]
    fn prefix_end_increments_last_byte() {
        assert_eq!(prefix_end(b"acct:"), Some(b"acct;".to_vec()));
        assert_eq!(prefix_end(&[0x01, 0xff]), Some(vec![0x02]));
        assert_eq!(prefix_end(&[0xff, 0xff]), None);
        assert_eq!(prefix_end(&[]), None);
    }

    #[test]
    fn scan_prefix_is_ordered_and_bounded() {
        let mut store = MemoryStore::new();
        for key in [&b"acct:b"[..], b"acct:a", b"acct_name:x", b"acc", b"acct;"] {
            store.set(key.to_vec(), vec![1]).expect("set");
        }

        let keys: Vec<Vec<u8>> = store
            .scan_prefix(b"acct:")
            .expect("scan")
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        assert_eq!(keys, vec![b"acct:a".to_vec(), b"acct:b".to_vec()]);
    }

    #[test]
    fn delete_of_absent_key_is_noop() {
        let mut store = MemoryStore::new();
        store.delete(b"missing").expect("delete absent");
        assert!(!store.has(b"missing").expect("has"));
        assert!(store.is_empty());
    }
}
