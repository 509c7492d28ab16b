use crate::{
    bucket::RecordCodec,
    error::InternalError,
    migration::MigrationRegistry,
    model::Model,
    obs::sink::{self, MetricsEvent},
    serialize::{deserialize, serialize},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

///
/// SchemaEnvelope
///
/// Persisted form of a versioned record: the schema version next to the
/// model's own encoding.
///

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct SchemaEnvelope {
    pub schema: u32,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

///
/// SchemaCodec
///
/// Record codec that stamps every write with the current schema version
/// and fast-forwards older records on read.
///

#[derive(Clone, Debug)]
pub struct SchemaCodec {
    registry: Arc<MigrationRegistry>,
    version: u32,
}

impl SchemaCodec {
    pub(crate) const fn new(registry: Arc<MigrationRegistry>, version: u32) -> Self {
        Self { registry, version }
    }
}

impl<M: Model> RecordCodec<M> for SchemaCodec {
    fn encode(&self, value: &M) -> Result<Vec<u8>, InternalError> {
        let envelope = SchemaEnvelope {
            schema: self.version,
            payload: value.marshal()?,
        };

        Ok(serialize(&envelope)?)
    }

    fn decode(&self, proto: &M, bytes: &[u8]) -> Result<M, InternalError> {
        let envelope: SchemaEnvelope = deserialize(bytes)?;

        let mut value = proto.clone();
        value.unmarshal(&envelope.payload)?;

        if envelope.schema != self.version {
            let to = self.registry.migrate(&mut value, envelope.schema)?;

            debug!(path = M::PATH, from = envelope.schema, to, "record migrated");
            sink::record(MetricsEvent::SchemaMigrated {
                path: M::PATH,
                from: envelope.schema,
                to,
            });
        }

        Ok(value)
    }
}
