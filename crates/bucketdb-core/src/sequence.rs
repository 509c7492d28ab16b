use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError, hex},
    obs::sink::{self, MetricsEvent},
    store::{ReadStore, WriteStore},
};
use tracing::debug;

/// Width of an encoded sequence value.
pub const SEQ_KEY_LEN: usize = 8;

/// Encode a sequence value as a fixed-width big-endian key, so numeric
/// order and byte order agree.
#[must_use]
pub fn seq_key(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode a key produced by [`seq_key`].
pub fn parse_seq_key(bytes: &[u8]) -> Result<u64, InternalError> {
    let buf: [u8; SEQ_KEY_LEN] = bytes.try_into().map_err(|_| {
        InternalError::sequence_corruption(format!(
            "sequence value must be {SEQ_KEY_LEN} bytes, found {}",
            bytes.len()
        ))
    })?;

    Ok(u64::from_be_bytes(buf))
}

///
/// Sequence
///
/// Persisted monotonic counter stored at a single key. Zero means "no id"
/// and is never handed out.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sequence {
    id: Vec<u8>,
}

impl Sequence {
    #[must_use]
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into() }
    }

    /// Store key holding the counter.
    #[must_use]
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Last value handed out, or 0 if the sequence was never advanced.
    pub fn current<S: ReadStore + ?Sized>(&self, store: &S) -> Result<u64, InternalError> {
        store
            .get(&self.id)?
            .map_or(Ok(0), |bytes| parse_seq_key(&bytes))
    }

    /// Advance the counter and return the new value.
    ///
    /// The value counts as allocated only once the counter write succeeded.
    pub fn next_int<S: WriteStore + ?Sized>(&self, store: &mut S) -> Result<u64, InternalError> {
        let current = self.current(&*store)?;
        let next = current.checked_add(1).ok_or_else(|| {
            InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Sequence,
                format!("sequence exhausted: {}", String::from_utf8_lossy(&self.id)),
            )
        })?;

        store.set(self.id.clone(), seq_key(next))?;

        debug!(sequence = %hex(&self.id), value = next, "sequence advanced");
        sink::record(MetricsEvent::SequenceAdvance { value: next });

        Ok(next)
    }

    /// Advance the counter and return the new value as a primary key.
    pub fn next_val<S: WriteStore + ?Sized>(&self, store: &mut S) -> Result<Vec<u8>, InternalError> {
        self.next_int(store).map(seq_key)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{Sequence, parse_seq_key, seq_key};
    use crate::{
        store::{MemoryStore, ReadStore, WriteStore},
        test_support::FailingStore,
    };

    #[test]
    fn fresh_sequence_starts_above_zero() {
        let mut store = MemoryStore::new();
        let seq = Sequence::new(b"acct:id".to_vec());

        assert_eq!(seq.current(&store).expect("current"), 0);
        assert_eq!(seq.next_val(&mut store).expect("next"), seq_key(1));
        assert_eq!(seq.current(&store).expect("current"), 1);
    }

    #[test]
    fn values_strictly_increase_and_sort_as_bytes() {
        let mut store = MemoryStore::new();
        let seq = Sequence::new(b"acct:id".to_vec());

        let keys: Vec<Vec<u8>> = (0..300)
            .map(|_| seq.next_val(&mut store).expect("next"))
            .collect();

        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "byte order must follow numeric order");
            assert!(
                parse_seq_key(&pair[0]).expect("decode") < parse_seq_key(&pair[1]).expect("decode")
            );
        }
        assert_eq!(parse_seq_key(&keys[0]).expect("decode"), 1);
    }

    #[test]
    fn counter_survives_new_handle() {
        let mut store = MemoryStore::new();
        Sequence::new(b"acct:id".to_vec())
            .next_int(&mut store)
            .expect("first");

        let reopened = Sequence::new(b"acct:id".to_vec());
        assert_eq!(reopened.next_int(&mut store).expect("second"), 2);
    }

    #[test]
    fn sequences_are_independent() {
        let mut store = MemoryStore::new();
        let a = Sequence::new(b"acct:id".to_vec());
        let b = Sequence::new(b"acct:nonce".to_vec());

        a.next_int(&mut store).expect("a1");
        a.next_int(&mut store).expect("a2");
        assert_eq!(b.next_int(&mut store).expect("b1"), 1);
    }

    #[test]
    fn failed_write_allocates_nothing() {
        let mut store = FailingStore::new(MemoryStore::new());
        let seq = Sequence::new(b"acct:id".to_vec());
        seq.next_int(&mut store).expect("first");

        store.fail_writes(true);
        let err = seq.next_int(&mut store).expect_err("write should fail");
        assert!(!err.is_corruption());

        store.fail_writes(false);
        assert_eq!(seq.current(&store).expect("current"), 1);
        assert_eq!(seq.next_int(&mut store).expect("retry"), 2);
    }

    #[test]
    fn corrupt_counter_is_reported() {
        let mut store = MemoryStore::new();
        store.set(b"acct:id".to_vec(), vec![1, 2, 3]).expect("set");

        let err = Sequence::new(b"acct:id".to_vec())
            .next_int(&mut store)
            .expect_err("short counter should fail");
        assert!(err.is_corruption());
        assert!(store.has(b"acct:id").expect("has"));
    }

    #[test]
    fn exhausted_counter_is_reported() {
        let mut store = MemoryStore::new();
        store
            .set(b"acct:id".to_vec(), seq_key(u64::MAX))
            .expect("set");

        let err = Sequence::new(b"acct:id".to_vec())
            .next_int(&mut store)
            .expect_err("overflow should fail");
        assert!(!err.is_corruption());
    }
}
