mod code;
mod error_detail;
mod status_struct;

pub use code::Code;
pub use error_detail::ErrorDetail;
pub use status_struct::Status;
