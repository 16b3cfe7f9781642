//! Ядро запросов к удалённому HTTP-сервису с двумя транспортами:
//! прямой HTTP (GET/POST) и скриптовый колбэк (JSONP) как запасной путь.
//!
//! ```no_run
//! use request_bridge::{Dispatcher, ParamSet, RequestConfig};
//!
//! # async fn run() -> Result<(), request_bridge::CoreError> {
//! let dispatcher = Dispatcher::new(RequestConfig::default())?;
//! let params = ParamSet::new().with("where", "1=1").with("outFields", vec!["*"]);
//! dispatcher.request("https://example.com/query", &params, |outcome: request_bridge::Outcome| {
//!     match outcome {
//!         Ok(response) => println!("{}", response),
//!         Err(error) => eprintln!("{}", error),
//!     }
//! });
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod dispatcher;
pub mod params;
pub mod transports;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::{Callback, CoreError, Outcome, RequestConfig, ServiceError};
pub use dispatcher::{Dispatcher, RequestHandle};
pub use params::{serialize, ParamSet, ParamValue, SerializedQuery};

/// Инициализирует env_logger (уровень задаётся через RUST_LOG). Повторный вызов безопасен.
pub fn init_logger() {
    let _ = env_logger::try_init();
}
