pub mod builtins;
pub mod dispatcher;
pub mod registry;
pub mod types;

pub use dispatcher::Dispatcher;
pub use registry::{Implementation, NativeRegistry, RegistryEntry};
pub use types::{FunctionDescriptor, NativeFunction, NativeSpec, QualifiedName};
