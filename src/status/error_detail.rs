use bytes::Bytes;

/// An opaque detail record attached to a `Status`.
///
/// `type_name` is the fully-qualified message type name (no type URL
/// prefix); `value` is the encoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub type_name: String,
    pub value: Bytes,
}

impl ErrorDetail {
    pub fn new(type_name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// Type URL form used inside `google.protobuf.Any`.
    pub fn type_url(&self) -> String {
        format!("{}{}", TYPE_URL_PREFIX, self.type_name)
    }

    /// Strips any `host/` prefix from a type URL.
    pub fn type_name_from_url(type_url: &str) -> &str {
        match type_url.rfind('/') {
            Some(pos) => &type_url[pos + 1..],
            None => type_url,
        }
    }
}

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";
