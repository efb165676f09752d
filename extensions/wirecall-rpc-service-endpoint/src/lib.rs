mod dispatch;
pub use dispatch::*;

mod endpoint;
pub use endpoint::*;

mod endpoint_options;
pub use endpoint_options::*;

pub mod error;

mod loopback;
