use crate::method::MethodDescriptor;

/// A named group of methods, as produced by schema compilation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub methods: &'static [MethodDescriptor],
}

impl ServiceDescriptor {
    pub const fn new(name: &'static str, methods: &'static [MethodDescriptor]) -> Self {
        Self { name, methods }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.method == name)
    }
}
