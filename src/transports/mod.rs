// Файл: transports/mod.rs

pub mod direct;
pub mod script;

pub use direct::{DirectHandle, DirectTransport};
pub use script::{CallbackRegistry, ScriptHandle, ScriptInjector, ScriptTransport};
