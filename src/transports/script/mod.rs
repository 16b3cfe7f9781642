// Файл: transports/script/mod.rs
// Запросы через внедряемый скрипт с глобально адресуемым колбэком.

pub mod loader;
pub mod models;
pub mod requests;

pub use loader::HttpScriptLoader;
pub use models::{CallbackId, CallbackRegistry, CallbackState, ScriptElement, ScriptSignal};
pub use requests::{normalize_signal, ScriptHandle, ScriptInjector, ScriptTransport};
