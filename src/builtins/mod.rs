/// Native functions callable from scripts.
///
/// Builtins live in a [`BuiltinRegistry`] under dotted names such as
/// `core.len` or `time.sleep`. Modules install whole namespaces at once
/// through [`BuiltinModule`]. An identifier that names no binding is looked
/// up here, first as written and then under the `core.` prefix.
pub mod registry;
pub mod types;

pub use registry::{BuiltinModule, BuiltinRegistry, RegistryError};
pub use types::{Builtin, BuiltinFuture, CallContext, Capability, NativeFunction, NativeResult};
