// Файл: transports/direct/models.rs
// Завершение прямого запроса: нормализация тела и одноразовая доставка исхода.

use crate::core::callback::{Callback, OnceCallback, Outcome};
use crate::core::error::{CoreError, ServiceError};
use crate::core::http::HttpMethod;
use crate::core::json::{declared_error, parse_json_from_text};
use log::warn;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Разбирает тело ответа в исход.
///
/// - не JSON (или JSON `null`) -> ошибка 500 "could not parse ...";
/// - объект с истинным полем `error` -> это поле как ошибка;
/// - иначе -> ответ.
pub fn normalize_body(body: &str, context: &str) -> Outcome {
    let parsed: Value = match parse_json_from_text(body, context) {
        Ok(value) => value,
        Err(_) => return Err(ServiceError::unparseable()),
    };

    if parsed.is_null() {
        return Err(ServiceError::unparseable());
    }

    if let Some(error) = declared_error(&parsed) {
        return Err(ServiceError::from_value(error.clone()));
    }

    Ok(parsed)
}

/// Живой прямой запрос. Все терминальные события (ошибка, завершение, отмена)
/// проходят через один одноразовый колбэк, поэтому срабатывает только первое.
#[derive(Debug, Clone)]
pub struct PendingDirect {
    callback: OnceCallback,
    url: String,
}

impl PendingDirect {
    pub fn new(callback: Callback, url: impl Into<String>) -> Self {
        Self {
            callback: OnceCallback::new(callback),
            url: url.into(),
        }
    }

    pub fn on_error(&self, error: &CoreError) -> bool {
        warn!("Request to {} failed: {}", self.url, error);
        self.callback.deliver(Err(ServiceError::transport()))
    }

    pub fn on_complete(&self, body: &str) -> bool {
        self.callback.deliver(normalize_body(body, &self.url))
    }

    pub fn on_abort(&self) -> bool {
        self.callback.deliver(Err(ServiceError::aborted()))
    }

    pub fn is_settled(&self) -> bool {
        self.callback.is_spent()
    }
}

/// Хэндл прямого запроса.
#[derive(Debug)]
pub struct DirectHandle {
    pub method: HttpMethod,
    pub url: String,
    pending: PendingDirect,
    task: JoinHandle<()>,
    runtime: Handle,
    abort_requested: AtomicBool,
}

impl DirectHandle {
    pub(crate) fn new(
        method: HttpMethod,
        url: String,
        pending: PendingDirect,
        task: JoinHandle<()>,
        runtime: Handle,
    ) -> Self {
        Self {
            method,
            url,
            pending,
            task,
            runtime,
            abort_requested: AtomicBool::new(false),
        }
    }

    /// Останавливает запрос. Если исход ещё не доставлен, колбэк получит
    /// `{code: 0, message: "request aborted"}`. Возвращает `true` в этом случае.
    ///
    /// Колбэк никогда не вызывается внутри `abort`: доставка идёт задачей на рантайме,
    /// как и у скриптового транспорта.
    pub fn abort(&self) -> bool {
        if self.pending.is_settled() || self.abort_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.task.abort();

        let pending = self.pending.clone();
        self.runtime.spawn(async move {
            pending.on_abort();
        });
        true
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::UNPARSEABLE_MESSAGE;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn recording() -> (PendingDirect, Arc<Mutex<Vec<Outcome>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let pending = PendingDirect::new(Callback::new(move |o| sink.lock().push(o)), "http://svc/test");
        (pending, seen)
    }

    #[test]
    fn success_body_is_delivered() {
        let outcome = normalize_body(r#"{"results":[1,2,3]}"#, "t");
        assert_eq!(outcome, Ok(json!({ "results": [1, 2, 3] })));
    }

    #[test]
    fn server_declared_error_takes_precedence() {
        let outcome = normalize_body(r#"{"error":{"code":400,"message":"bad request"}}"#, "t");
        let err = outcome.unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "bad request");
        assert_eq!(err.raw, json!({ "code": 400, "message": "bad request" }));
    }

    #[test]
    fn malformed_and_null_bodies_are_unparseable() {
        for body in ["<html>denied</html>", "", "null"] {
            let err = normalize_body(body, "t").unwrap_err();
            assert_eq!(err.code, 500);
            assert_eq!(err.message, UNPARSEABLE_MESSAGE);
        }
    }

    #[test]
    fn falsy_error_field_is_not_an_error() {
        assert_eq!(normalize_body(r#"{"error":null,"a":1}"#, "t"), Ok(json!({ "error": null, "a": 1 })));
    }

    #[test]
    fn duplicate_completion_fires_once() {
        let (pending, seen) = recording();
        assert!(pending.on_complete(r#"{"a":1}"#));
        assert!(!pending.on_complete(r#"{"a":2}"#));
        assert!(!pending.on_error(&CoreError::Transport("late".into())));
        assert_eq!(*seen.lock(), vec![Ok(json!({ "a": 1 }))]);
    }

    #[test]
    fn error_then_completion_fires_once() {
        let (pending, seen) = recording();
        assert!(pending.on_error(&CoreError::Transport("reset".into())));
        assert!(!pending.on_complete(r#"{"a":1}"#));
        assert!(!pending.on_abort());
        assert_eq!(*seen.lock(), vec![Err(ServiceError::transport())]);
        assert!(pending.is_settled());
    }

    #[test]
    fn abort_after_completion_is_noop() {
        let (pending, seen) = recording();
        pending.on_complete("[]");
        assert!(!pending.on_abort());
        assert_eq!(*seen.lock(), vec![Ok(json!([]))]);
    }
}
