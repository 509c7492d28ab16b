use crate::{
    binding::{Context, ModelBucket, UnboundModelBucket},
    error::InternalError,
    model::{Model, Object},
    query::QueryRouter,
    store::{ReadStore, WriteStore},
};

///
/// Decorator
///
/// Cross-cutting behaviour wrapped around a bound bucket. Every operation
/// defaults to forwarding to `inner` unchanged, so a decorator only
/// overrides what it handles and decorators compose in any order.
///

pub trait Decorator<M: Model> {
    fn one(
        &self,
        inner: &dyn ModelBucket<M>,
        store: &dyn ReadStore,
        key: &[u8],
    ) -> Result<Object<M>, InternalError> {
        inner.one(store, key)
    }

    fn by_index(
        &self,
        inner: &dyn ModelBucket<M>,
        store: &dyn ReadStore,
        index: &str,
        key: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError> {
        inner.by_index(store, index, key)
    }

    fn put(
        &self,
        inner: &dyn ModelBucket<M>,
        store: &mut dyn WriteStore,
        key: Option<Vec<u8>>,
        value: M,
    ) -> Result<Vec<u8>, InternalError> {
        inner.put(store, key, value)
    }

    fn delete(
        &self,
        inner: &dyn ModelBucket<M>,
        store: &mut dyn WriteStore,
        key: &[u8],
    ) -> Result<(), InternalError> {
        inner.delete(store, key)
    }

    fn has(
        &self,
        inner: &dyn ModelBucket<M>,
        store: &dyn ReadStore,
        key: &[u8],
    ) -> Result<(), InternalError> {
        inner.has(store, key)
    }

    fn register(&self, inner: &dyn ModelBucket<M>, name: &str, router: &mut QueryRouter) {
        inner.register(name, router);
    }
}

///
/// Decorated
///
/// A bound bucket with one decorator applied.
///

pub struct Decorated<'a, M, D> {
    inner: Box<dyn ModelBucket<M> + 'a>,
    decorator: D,
}

impl<'a, M: Model, D: Decorator<M>> Decorated<'a, M, D> {
    pub fn new(inner: Box<dyn ModelBucket<M> + 'a>, decorator: D) -> Self {
        Self { inner, decorator }
    }

    pub const fn decorator(&self) -> &D {
        &self.decorator
    }
}

impl<M: Model, D: Decorator<M>> ModelBucket<M> for Decorated<'_, M, D> {
    fn one(&self, store: &dyn ReadStore, key: &[u8]) -> Result<Object<M>, InternalError> {
        self.decorator.one(&*self.inner, store, key)
    }

    fn by_index(
        &self,
        store: &dyn ReadStore,
        index: &str,
        key: &[u8],
    ) -> Result<Vec<Object<M>>, InternalError> {
        self.decorator.by_index(&*self.inner, store, index, key)
    }

    fn put(
        &self,
        store: &mut dyn WriteStore,
        key: Option<Vec<u8>>,
        value: M,
    ) -> Result<Vec<u8>, InternalError> {
        self.decorator.put(&*self.inner, store, key, value)
    }

    fn delete(&self, store: &mut dyn WriteStore, key: &[u8]) -> Result<(), InternalError> {
        self.decorator.delete(&*self.inner, store, key)
    }

    fn has(&self, store: &dyn ReadStore, key: &[u8]) -> Result<(), InternalError> {
        self.decorator.has(&*self.inner, store, key)
    }

    fn register(&self, name: &str, router: &mut QueryRouter) {
        self.decorator.register(&*self.inner, name, router);
    }
}

///
/// DecoratorFactory
///
/// Builds a decorator from the context at bind time. Panicking here is how
/// a decorator reports missing required context.
///

pub trait DecoratorFactory<M: Model> {
    type Decorator: Decorator<M> + 'static;

    fn build(&self, ctx: &Context) -> Self::Decorator;
}

///
/// Layer
///
/// Unbound bucket plus a decorator factory; binding it binds the inner
/// bucket and wraps the result.
///

#[derive(Clone, Debug)]
pub struct Layer<U, F> {
    inner: U,
    factory: F,
}

impl<U, F> Layer<U, F> {
    pub const fn new(inner: U, factory: F) -> Self {
        Self { inner, factory }
    }

    pub const fn inner(&self) -> &U {
        &self.inner
    }
}

impl<M, U, F> UnboundModelBucket<M> for Layer<U, F>
where
    M: Model,
    U: UnboundModelBucket<M>,
    F: DecoratorFactory<M>,
{
    fn bind<'a>(&'a self, ctx: &Context) -> Box<dyn ModelBucket<M> + 'a> {
        let decorator = self.factory.build(ctx);

        Box::new(Decorated::new(self.inner.bind(ctx), decorator))
    }
}
