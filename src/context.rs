mod abort_signal;
mod call_context;

pub use abort_signal::{AbortController, AbortSignal};
pub use call_context::{CallContext, CompletionGuard};
