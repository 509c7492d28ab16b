//! Context-bound model buckets.
//!
//! An [`UnboundModelBucket`] is wiring-time configuration. Binding it to a
//! [`Context`] yields a short-lived [`ModelBucket`] handle for one logical
//! operation; decorators layered on top see the context at bind time.

mod decorator;
mod last_modified;


pub use decorator::{Decorated, Decorator, DecoratorFactory, Layer};
pub use last_modified::{LastModified, LastModifiedFactory, with_last_modified};

use crate::{
    bucket::Bucket,
    error::InternalError,
    migration::MigrationBucket,
    model::{Model, Object},
    query::QueryRouter,
    store::{ReadStore, WriteStore},
};

///
/// Context
///
/// Ambient values of the operation a bucket is bound to.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Context {
    height: Option<u64>,
}

impl Context {
    #[must_use]
    pub const fn new() -> Self {
        Self { height: None }
    }

    #[must_use]
    pub const fn with_height(mut self, height: u64) -> Self {
        self.height = Some(height);
        self
    }

    /// Logical height of the current operation, if known.
    #[must_use]
    pub const fn height(&self) -> Option<u64> {
        self.height
    }
}

///
/// ModelBucket
///
/// Operation-scoped bucket handle. Absent keys are `NotFound` errors here,
/// unlike the plain [`Bucket`] API.
///

pub trait ModelBucket<M: Model> {
    /// Load the record at `key`.
    fn one(&self, store: &dyn ReadStore, key: &[u8]) -> Result<Object<M>, InternalError>;

    /// Records listed under `key` in the named index.
    fn by_index(
        &self,
        store: &dyn ReadStore,
        index: &str,
        key: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError>;

    /// Save `value` and return its key. `None` allocates the next id.
    fn put(
        &self,
        store: &mut dyn WriteStore,
        key: Option<Vec<u8>>,
        value: M,
    ) -> Result<Vec<u8>, InternalError>;

    /// Delete the record at `key` and its index references.
    fn delete(&self, store: &mut dyn WriteStore, key: &[u8]) -> Result<(), InternalError>;

    /// `Ok` if a record exists at `key`, `NotFound` otherwise.
    fn has(&self, store: &dyn ReadStore, key: &[u8]) -> Result<(), InternalError>;

    /// Install read-only query routes under `name`.
    fn register(&self, name: &str, router: &mut QueryRouter);
}

impl<M: Model> ModelBucket<M> for Bucket<M> {
    fn one(&self, store: &dyn ReadStore, key: &[u8]) -> Result<Object<M>, InternalError> {
        self.get(store, key)?
            .ok_or_else(|| InternalError::not_found(self.name(), key))
    }

    fn by_index(
        &self,
        store: &dyn ReadStore,
        index: &str,
        key: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError> {
        self.get_indexed(store, index, key)
    }

    fn put(
        &self,
        store: &mut dyn WriteStore,
        key: Option<Vec<u8>>,
        value: M,
    ) -> Result<Vec<u8>, InternalError> {
        let key = match key {
            Some(key) => key,
            None => self.id_sequence().next_val(store)?,
        };

        let obj = Object::new(key, value);
        self.save(store, &obj)?;

        Ok(obj.into_parts().0)
    }

    fn delete(&self, store: &mut dyn WriteStore, key: &[u8]) -> Result<(), InternalError> {
        ModelBucket::has(self, &*store, key)?;

        Self::delete(self, store, key)
    }

    fn has(&self, store: &dyn ReadStore, key: &[u8]) -> Result<(), InternalError> {
        if store.has(&self.db_key(key))? {
            Ok(())
        } else {
            Err(InternalError::not_found(self.name(), key))
        }
    }

    fn register(&self, name: &str, router: &mut QueryRouter) {
        self.register_queries(name, router);
    }
}

impl<M: Model, T: ModelBucket<M> + ?Sized> ModelBucket<M> for &T {
    fn one(&self, store: &dyn ReadStore, key: &[u8]) -> Result<Object<M>, InternalError> {
        (**self).one(store, key)
    }

    fn by_index(
        &self,
        store: &dyn ReadStore,
        index: &str,
        key: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError> {
        (**self).by_index(store, index, key)
    }

    fn put(
        &self,
        store: &mut dyn WriteStore,
        key: Option<Vec<u8>>,
        value: M,
    ) -> Result<Vec<u8>, InternalError> {
        (**self).put(store, key, value)
    }

    fn delete(&self, store: &mut dyn WriteStore, key: &[u8]) -> Result<(), InternalError> {
        (**self).delete(store, key)
    }

    fn has(&self, store: &dyn ReadStore, key: &[u8]) -> Result<(), InternalError> {
        (**self).has(store, key)
    }

    fn register(&self, name: &str, router: &mut QueryRouter) {
        (**self).register(name, router);
    }
}

///
/// UnboundModelBucket
///
/// Reusable bucket configuration that can be bound to a context.
///

pub trait UnboundModelBucket<M: Model> {
    fn bind<'a>(&'a self, ctx: &Context) -> Box<dyn ModelBucket<M> + 'a>;
}

impl<M: Model> UnboundModelBucket<M> for Bucket<M> {
    fn bind<'a>(&'a self, _: &Context) -> Box<dyn ModelBucket<M> + 'a> {
        Box::new(self)
    }
}

impl<M: Model> UnboundModelBucket<M> for MigrationBucket<M> {
    fn bind<'a>(&'a self, _: &Context) -> Box<dyn ModelBucket<M> + 'a> {
        Box::new(self.bucket())
    }
}
