//! DAG-CBOR encoding for structures persisted as blocks

use ipld_core::codec::Codec;
use serde::{de::DeserializeOwned, Serialize};
use serde_ipld_dagcbor::codec::DagCborCodec;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A type that round-trips through a DAG-CBOR block
pub trait BlockEncoded: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        DagCborCodec::encode_to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        DagCborCodec::decode_from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
