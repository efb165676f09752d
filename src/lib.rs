pub mod body;
pub mod compression;
pub mod constants;
pub mod context;
pub mod envelope;
pub mod method;
pub mod protocol;
pub mod status;
pub mod utils;

pub use status::{Code, ErrorDetail, Status};
