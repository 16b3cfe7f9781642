// Файл: core/error.rs
// Унифицированные типы ошибок: внутренняя CoreError и ServiceError для канала исходов.

use serde_json::{json, Value};
use thiserror::Error;

pub const TRANSPORT_ERROR_MESSAGE: &str = "transport error";
pub const UNPARSEABLE_MESSAGE: &str =
    "could not parse response as JSON; may indicate a cross-origin or transport error";
pub const UNEXPECTED_SHAPE_MESSAGE: &str = "expected array or object as response";
pub const ABORTED_MESSAGE: &str = "request aborted";

// --- 1. Внутренняя ошибка (CoreError) ---
// Используется конструкторами и сетевыми хелперами. В callback никогда не попадает:
// транспорты переводят её в ServiceError.

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Failed to parse JSON response or payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No tokio runtime is available to drive requests")]
    NoRuntime,

    #[error("Transport failure: {0}")]
    Transport(String),
}

// --- 2. Ошибка исхода (ServiceError) ---
// Структурированная ошибка с числовым кодом и сообщением.
// `raw` хранит JSON как есть: для серверных ошибок это их собственное тело.

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceError {
    pub code: i64,
    pub message: String,
    pub raw: Value,
}

impl ServiceError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code,
            raw: json!({ "code": code, "message": message }),
            message,
        }
    }

    /// Сеть/транспорт сообщили об ошибке до получения ответа.
    pub fn transport() -> Self {
        Self::new(500, TRANSPORT_ERROR_MESSAGE)
    }

    /// Тело ответа не удалось разобрать как JSON.
    pub fn unparseable() -> Self {
        Self::new(500, UNPARSEABLE_MESSAGE)
    }

    /// Скриптовый ответ не является ни объектом, ни массивом.
    pub fn unexpected_shape() -> Self {
        Self::new(500, UNEXPECTED_SHAPE_MESSAGE)
    }

    pub fn aborted() -> Self {
        Self::new(0, ABORTED_MESSAGE)
    }

    /// Оборачивает ошибку, объявленную сервером, без перекодирования.
    /// Код и сообщение ищутся на верхнем уровне, затем во вложенном `error`.
    /// Строковое `error` без `message` становится сообщением.
    pub fn from_value(raw: Value) -> Self {
        let (code, message) = {
            let source = match raw.get("error") {
                Some(inner) if inner.is_object() => inner,
                _ => &raw,
            };
            let code = source.get("code").and_then(Value::as_i64).unwrap_or(500);
            let message = match source.get("message") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => match (&raw, raw.get("error")) {
                    (_, Some(Value::String(s))) | (Value::String(s), _) => s.clone(),
                    _ => String::new(),
                },
            };
            (code, message)
        };
        Self { code, message, raw }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for ServiceError {}

// --- 3. Мост (CoreError -> ServiceError) ---
// Любая внутренняя ошибка на пути запроса считается транспортной.

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Parse(_) => ServiceError::unparseable(),
            CoreError::Network(_)
            | CoreError::UrlParse(_)
            | CoreError::NoRuntime
            | CoreError::Transport(_) => ServiceError::transport(),
        }
    }
}
