mod method_descriptor;
mod service_descriptor;

pub use method_descriptor::{Idempotency, MethodDescriptor, MethodKind};
pub use service_descriptor::ServiceDescriptor;
