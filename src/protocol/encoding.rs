use std::fmt;

/// Message encoding negotiated from the content type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// The binary codec, advertised as the `proto` subtype.
    #[default]
    Binary,
    /// The textual codec, advertised as the `json` subtype.
    Json,
}

impl Encoding {
    /// Name used in content types and the Connect GET `encoding` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Binary => "proto",
            Encoding::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "proto" => Some(Encoding::Binary),
            "json" => Some(Encoding::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a content type into its lowercase media type and an optional
/// `charset` parameter.
pub(crate) fn parse_media_type(content_type: &str) -> (String, Option<String>) {
    let mut parts = content_type.split(';');
    let media = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let charset = parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    });
    (media, charset)
}

/// Resolves a `+proto` / `+json` style suffix. Only JSON may carry a charset,
/// and it must be UTF-8.
pub(crate) fn encoding_from_suffix(suffix: &str, charset: Option<&str>) -> Option<Encoding> {
    let encoding = Encoding::from_name(suffix)?;
    match (encoding, charset) {
        (_, None) => Some(encoding),
        (Encoding::Json, Some("utf-8" | "utf8")) => Some(encoding),
        _ => None,
    }
}
