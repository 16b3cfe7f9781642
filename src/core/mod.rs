// Файл: core/mod.rs
// Общие утилиты: ошибки, конфигурация, контракт колбэка, HTTP и JSON.

pub mod callback;
pub mod config;
pub mod error;
pub mod http;
pub mod json;

pub use callback::{Callback, OnceCallback, Outcome};
pub use config::RequestConfig;
pub use error::{CoreError, ServiceError};
pub use http::{HttpClient, HttpMethod, ReqwestClient, WireRequest};
