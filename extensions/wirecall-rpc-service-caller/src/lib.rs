mod call_traits;
pub use call_traits::*;
mod caller;
pub use caller::*;
mod caller_config;
pub use caller_config::*;
pub mod error;
mod interceptor;
pub use interceptor::*;
mod response;
pub use response::*;
mod transport;
pub use transport::*;
