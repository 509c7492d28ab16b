//! Keyed store capability consumed by the engine.
//!
//! The engine never owns durability: implementors provide point reads and
//! writes over raw byte keys plus an ordered prefix scan. Reads must observe
//! writes made earlier through the same handle.

mod memory;

pub use memory::MemoryStore;

use crate::error::InternalError;

/// One `(key, value)` pair returned by a prefix scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

///
/// ReadStore
///
/// Read half of the keyed store. Absent keys are `Ok(None)`, never errors.
///

pub trait ReadStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, InternalError>;

    fn has(&self, key: &[u8]) -> Result<bool, InternalError> {
        self.get(key).map(|value| value.is_some())
    }
}

///
/// WriteStore
///

pub trait WriteStore: ReadStore {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError>;

    /// Remove `key`; removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError>;
}

impl<T: ReadStore + ?Sized> ReadStore for &T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        (**self).get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, InternalError> {
        (**self).scan_prefix(prefix)
    }
}

impl<T: ReadStore + ?Sized> ReadStore for &mut T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        (**self).get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, InternalError> {
        (**self).scan_prefix(prefix)
    }
}

impl<T: WriteStore + ?Sized> WriteStore for &mut T {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError> {
        (**self).delete(key)
    }
}

impl<T: ReadStore + ?Sized> ReadStore for Box<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        (**self).get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, InternalError> {
        (**self).scan_prefix(prefix)
    }
}

impl<T: WriteStore + ?Sized> WriteStore for Box<T> {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError> {
        (**self).delete(key)
    }
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such bound exists (empty or all-`0xff` prefix).
#[must_use]
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }

    None
}
