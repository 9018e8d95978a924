/// Builtin namespaces shipped with the runtime.
///
/// `core` holds the language level helpers and concurrency primitives,
/// `time` holds clocks and timers.
pub mod lang;
pub mod time;

pub use lang::CoreModule;
pub use time::TimeModule;
