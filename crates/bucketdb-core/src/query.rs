//! Read-only query routes for external inspection.
//!
//! Buckets register handlers under `/{name}` (primary key lookup) and
//! `/{name}/{index}` (index lookup). Handlers read through the bucket, so
//! results are decoded and migrated exactly like any other read, then
//! re-encoded with the model's own codec.

use crate::{
    bucket::Bucket,
    error::InternalError,
    model::{Model, Object},
    store::ReadStore,
};
use std::{collections::BTreeMap, fmt};

///
/// QueryMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryMode {
    /// Exact key match.
    Key,

    /// Every key starting with the query data.
    Prefix,
}

///
/// QueryModel
///
/// One query result: the primary key and the record bytes.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryModel {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl QueryModel {
    fn from_object<M: Model>(obj: Object<M>) -> Result<Self, InternalError> {
        let value = obj.value().marshal()?;
        let (key, _) = obj.into_parts();

        Ok(Self { key, value })
    }
}

///
/// QueryHandler
///

pub trait QueryHandler: Send + Sync {
    fn query(
        &self,
        store: &dyn ReadStore,
        mode: QueryMode,
        data: &[u8],
    ) -> Result<Vec<QueryModel>, InternalError>;
}

///
/// QueryRouter
///

#[derive(Default)]
pub struct QueryRouter {
    routes: BTreeMap<String, Box<dyn QueryHandler>>,
}

impl fmt::Debug for QueryRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRouter")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl QueryRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` at `path`.
    ///
    /// Panics if `path` is already taken.
    pub fn register(&mut self, path: impl Into<String>, handler: Box<dyn QueryHandler>) {
        let path = path.into();
        assert!(
            !self.routes.contains_key(&path),
            "query route registered twice: {path}"
        );

        self.routes.insert(path, handler);
    }

    #[must_use]
    pub fn handler(&self, path: &str) -> Option<&dyn QueryHandler> {
        self.routes.get(path).map(AsRef::as_ref)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Dispatch a query to the handler at `path`.
    pub fn query(
        &self,
        store: &dyn ReadStore,
        path: &str,
        mode: QueryMode,
        data: &[u8],
    ) -> Result<Vec<QueryModel>, InternalError> {
        let handler = self
            .handler(path)
            .ok_or_else(|| InternalError::query_config(format!("unknown query route: {path}")))?;

        handler.query(store, mode, data)
    }
}

///
/// PrimaryQuery
///
/// Point lookups by primary key. Prefix mode is refused because sequence
/// counters share the primary key prefix.
///

struct PrimaryQuery<M> {
    bucket: Bucket<M>,
}

impl<M: Model> QueryHandler for PrimaryQuery<M> {
    fn query(
        &self,
        store: &dyn ReadStore,
        mode: QueryMode,
        data: &[u8],
    ) -> Result<Vec<QueryModel>, InternalError> {
        match mode {
            QueryMode::Key => self
                .bucket
                .get(store, data)?
                .into_iter()
                .map(QueryModel::from_object)
                .collect(),
            QueryMode::Prefix => Err(InternalError::query_unsupported(format!(
                "prefix queries are not supported on primary keys: {}",
                self.bucket.name()
            ))),
        }
    }
}

///
/// IndexQuery
///

struct IndexQuery<M> {
    bucket: Bucket<M>,
    index: &'static str,
}

impl<M: Model> QueryHandler for IndexQuery<M> {
    fn query(
        &self,
        store: &dyn ReadStore,
        mode: QueryMode,
        data: &[u8],
    ) -> Result<Vec<QueryModel>, InternalError> {
        let objs = match mode {
            QueryMode::Key => self.bucket.get_indexed(store, self.index, data)?,
            QueryMode::Prefix => self.bucket.get_indexed_prefix(store, self.index, data)?,
        };

        objs.into_iter().map(QueryModel::from_object).collect()
    }
}

impl<M: Model> Bucket<M> {
    /// Register `/{name}` and one `/{name}/{index}` route per index.
    ///
    /// Panics if any of those routes already exists.
    pub fn register_queries(&self, name: &str, router: &mut QueryRouter) {
        router.register(
            format!("/{name}"),
            Box::new(PrimaryQuery {
                bucket: self.clone(),
            }),
        );

        for index in self.index_names() {
            router.register(
                format!("/{name}/{index}"),
                Box::new(IndexQuery {
                    bucket: self.clone(),
                    index,
                }),
            );
        }
    }
}

///
/// TESTS
///
