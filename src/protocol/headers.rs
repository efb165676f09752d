use http::{HeaderMap, HeaderName, HeaderValue};

/// Reads a header as a string, ignoring values that are not visible ASCII.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Sets a header, silently skipping values that are not valid header text.
pub fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

/// Appends every entry of `source` to `target`.
pub fn append_all(target: &mut HeaderMap, source: &HeaderMap) {
    for (name, value) in source.iter() {
        target.append(name.clone(), value.clone());
    }
}
