use crate::{BitcodeCodec, JsonCodec, MessageCodec};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use wirecall::Status;
use wirecall::protocol::Encoding;

/// Parses and serializes messages of type `T` in one wire encoding.
///
/// Obtained per call from the negotiated encoding; cheap to copy.
pub struct Serializer<T> {
    encoding: Encoding,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Serializer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Serializer<T> {}

impl<T> fmt::Debug for Serializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("encoding", &self.encoding)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Serializer<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Looks up the serializer for `encoding`.
    pub fn for_encoding(encoding: Encoding) -> Self {
        Self {
            encoding,
            _marker: PhantomData,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decodes one inbound message. Malformed input is `InvalidArgument`.
    pub fn parse(&self, bytes: &[u8]) -> Result<T, Status> {
        let decoded = match self.encoding {
            Encoding::Binary => BitcodeCodec::decode(bytes),
            Encoding::Json => JsonCodec::decode(bytes),
        };
        decoded.map_err(|err| {
            Status::invalid_argument(format!(
                "failed to parse {} message: {err}",
                self.encoding
            ))
        })
    }

    /// Encodes one outbound message. Failure is `Internal`.
    pub fn serialize(&self, value: &T) -> Result<Bytes, Status> {
        let encoded = match self.encoding {
            Encoding::Binary => BitcodeCodec::encode(value),
            Encoding::Json => JsonCodec::encode(value),
        };
        encoded.map(Bytes::from).map_err(|err| {
            Status::internal(format!(
                "failed to serialize {} message: {err}",
                self.encoding
            ))
        })
    }
}
