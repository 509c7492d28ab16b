use crate::{
    error::{InternalError, ValidationIssues},
    model::{Metadata, Model},
    serialize::{deserialize, serialize},
    store::{KvPair, ReadStore, WriteStore},
};
use serde::{Deserialize, Serialize};

///
/// Account
///
/// Shared test-only record for core tests.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Account {
    pub name: String,
    pub balance: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Account {
    pub(crate) fn new(name: &str, balance: u64) -> Self {
        Self {
            name: name.to_string(),
            balance,
            ..Self::default()
        }
    }

    pub(crate) fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(ToString::to_string).collect();
        self
    }
}

impl Model for Account {
    const PATH: &'static str = "bucketdb_core::test_support::Account";

    fn validate(&self) -> Result<(), InternalError> {
        let mut issues = ValidationIssues::new();
        if self.name.is_empty() {
            issues.push("name", "must not be empty");
        }

        issues.into_result(Self::PATH)
    }

    fn marshal(&self) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(self)?)
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> Result<(), InternalError> {
        *self = deserialize(bytes)?;
        Ok(())
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        Some(&mut self.metadata)
    }
}

///
/// FailingStore
///
/// Store double whose writes can be switched to fail, either globally or
/// for keys under one prefix.
///

pub(crate) struct FailingStore<S> {
    inner: S,
    fail_writes: bool,
    fail_prefix: Option<Vec<u8>>,
}

impl<S> FailingStore<S> {
    pub(crate) const fn new(inner: S) -> Self {
        Self {
            inner,
            fail_writes: false,
            fail_prefix: None,
        }
    }

    pub(crate) const fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub(crate) fn fail_prefix(&mut self, prefix: &[u8]) {
        self.fail_prefix = Some(prefix.to_vec());
    }

    pub(crate) const fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, key: &[u8]) -> Result<(), InternalError> {
        let blocked = self.fail_writes
            || self
                .fail_prefix
                .as_ref()
                .is_some_and(|prefix| key.starts_with(prefix));

        if blocked {
            Err(InternalError::store_internal("injected write failure"))
        } else {
            Ok(())
        }
    }
}

impl<S: ReadStore> ReadStore for FailingStore<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        self.inner.get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, InternalError> {
        self.inner.scan_prefix(prefix)
    }
}

impl<S: WriteStore> WriteStore for FailingStore<S> {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        self.check(&key)?;
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError> {
        self.check(key)?;
        self.inner.delete(key)
    }
}
