// Файл: transports/direct/mod.rs
// Прямые HTTP-запросы (GET/POST) с разбором JSON.

pub mod models;
pub mod requests;

pub use models::{normalize_body, DirectHandle, PendingDirect};
pub use requests::DirectTransport;
