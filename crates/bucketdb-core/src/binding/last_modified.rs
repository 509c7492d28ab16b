use crate::{
    binding::{Context, Decorator, DecoratorFactory, Layer, ModelBucket},
    error::InternalError,
    model::Model,
    store::WriteStore,
};

///
/// LastModified
///
/// Stamps `Metadata::last_modified` with the bound height on every `put`.
/// Reads pass through untouched.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LastModified {
    height: u64,
}

impl LastModified {
    #[must_use]
    pub const fn height(&self) -> u64 {
        self.height
    }
}

impl<M: Model> Decorator<M> for LastModified {
    fn put(
        &self,
        inner: &dyn ModelBucket<M>,
        store: &mut dyn WriteStore,
        key: Option<Vec<u8>>,
        mut value: M,
    ) -> Result<Vec<u8>, InternalError> {
        let Some(metadata) = value.metadata_mut() else {
            return Err(InternalError::model_unsupported(format!(
                "record has no metadata to stamp: {}",
                M::PATH
            )));
        };
        metadata.last_modified = Some(self.height);

        inner.put(store, key, value)
    }
}

///
/// LastModifiedFactory
///

#[derive(Clone, Copy, Debug, Default)]
pub struct LastModifiedFactory;

impl<M: Model> DecoratorFactory<M> for LastModifiedFactory {
    type Decorator = LastModified;

    fn build(&self, ctx: &Context) -> LastModified {
        let Some(height) = ctx.height() else {
            panic!("last-modified decorator bound without a height in context");
        };

        LastModified { height }
    }
}

/// Wrap `bucket` so every bound `put` records the context height.
///
/// Binding the result to a context without a height panics.
pub const fn with_last_modified<U>(bucket: U) -> Layer<U, LastModifiedFactory> {
    Layer::new(bucket, LastModifiedFactory)
}
