mod base64_util;
mod percent;

pub use base64_util::{decode_base64_lenient, encode_base64_std, encode_base64_url};
pub use percent::{percent_decode, percent_encode, query_decode, query_encode};
