use serde::Serialize;
use serde::de::DeserializeOwned;
use wirecall::protocol::Encoding;

/// A message serialization format.
///
/// Errors are reported as plain strings; the caller decides which status
/// code a failure maps to.
pub trait MessageCodec {
    /// The wire encoding this codec produces.
    const ENCODING: Encoding;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, String>;

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String>;
}

/// Compact binary codec used for the `proto` encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcodeCodec;

impl MessageCodec for BitcodeCodec {
    const ENCODING: Encoding = Encoding::Binary;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, String> {
        bitcode::serialize(value).map_err(|err| err.to_string())
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
        bitcode::deserialize(bytes).map_err(|err| err.to_string())
    }
}

/// Textual codec used for the `json` encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    const ENCODING: Encoding = Encoding::Json;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, String> {
        serde_json::to_vec(value).map_err(|err| err.to_string())
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
        serde_json::from_slice(bytes).map_err(|err| err.to_string())
    }
}
