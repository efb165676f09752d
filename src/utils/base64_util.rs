use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard alphabet, no padding.
pub fn encode_base64_std(data: &[u8]) -> String {
    STANDARD_NO_PAD.encode(data)
}

/// URL-safe alphabet, no padding.
pub fn encode_base64_url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decodes either alphabet, with or without padding.
pub fn decode_base64_lenient(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if value.contains(['-', '_']) {
        let normalized: String = value
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();
        LENIENT.decode(normalized.trim())
    } else {
        LENIENT.decode(value.trim())
    }
}
