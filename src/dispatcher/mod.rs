// Файл: dispatcher/mod.rs
// Выбор транспорта: прямой GET/POST или скриптовый колбэк, в зависимости от окружения и длины запроса.

pub mod requests;

pub use requests::{Dispatcher, RequestHandle};
