use crate::{error::InternalError, model::Model};

///
/// RecordCodec
///
/// Turns a record into the bytes stored at its primary key and back.
/// Decoding starts from a clone of the bucket prototype.
///

pub trait RecordCodec<M>: Send + Sync {
    fn encode(&self, value: &M) -> Result<Vec<u8>, InternalError>;

    fn decode(&self, proto: &M, bytes: &[u8]) -> Result<M, InternalError>;
}

///
/// ModelCodec
///
/// Stores exactly what `Model::marshal` produces.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct ModelCodec;

impl<M: Model> RecordCodec<M> for ModelCodec {
    fn encode(&self, value: &M) -> Result<Vec<u8>, InternalError> {
        value.marshal()
    }

    fn decode(&self, proto: &M, bytes: &[u8]) -> Result<M, InternalError> {
        let mut value = proto.clone();
        value.unmarshal(bytes)?;

        Ok(value)
    }
}
