// Файл: transports/script/requests.rs
// Скриптовый транспорт: только GET, ответ приходит вызовом зарегистрированного колбэка.

use super::models::{CallbackId, CallbackRegistry, ScriptElement, ScriptSignal};
use crate::core::callback::{Callback, OnceCallback, Outcome};
use crate::core::error::ServiceError;
use crate::core::json::{declared_error, is_structured};
use crate::params::{serialize_with_callback, ParamSet};
use log::debug;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Примитив внедрения скрипта.
///
/// `inject` должен загрузить и исполнить скрипт по `script.url`; исполненный скрипт
/// вызывает `registry.fire` (или `registry.dispatch_script`) для своего id.
/// Ошибки загрузки наружу не сообщаются: такой запрос просто не завершится.
pub trait ScriptInjector: Send + Sync {
    fn inject(&self, script: ScriptElement, registry: Arc<CallbackRegistry>);

    /// Снимает элемент с учёта после срабатывания колбэка.
    fn remove(&self, element_id: &str);
}

/// Превращает сигнал колбэка в исход.
pub fn normalize_signal(signal: ScriptSignal) -> Outcome {
    match signal {
        ScriptSignal::Aborted => Err(ServiceError::aborted()),
        ScriptSignal::Payload(payload) if !is_structured(&payload) => Err(ServiceError::unexpected_shape()),
        // Ошибкой становится весь ответ целиком, а не только его поле `error`.
        ScriptSignal::Payload(payload) if declared_error(&payload).is_some() => {
            Err(ServiceError::from_value(payload))
        }
        ScriptSignal::Payload(payload) => Ok(payload),
    }
}

/// Хэндл скриптового запроса.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    pub id: CallbackId,
    pub url: String,
    registry: Arc<CallbackRegistry>,
}

impl ScriptHandle {
    /// Разрешает ожидающий колбэк ошибкой `{code: 0, message: "request aborted"}`.
    /// Загрузку скрипта не останавливает: его поздний вызов будет проигнорирован.
    pub fn abort(&self) -> bool {
        self.registry.abort(self.id)
    }
}

#[derive(Clone)]
pub struct ScriptTransport {
    registry: Arc<CallbackRegistry>,
    injector: Arc<dyn ScriptInjector>,
    runtime: Handle,
}

impl ScriptTransport {
    pub fn new(registry: Arc<CallbackRegistry>, injector: Arc<dyn ScriptInjector>, runtime: Handle) -> Self {
        Self {
            registry,
            injector,
            runtime,
        }
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn get(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> ScriptHandle {
        let (id, signal) = self.registry.register();
        let query = serialize_with_callback(params, &self.registry.callback_path(id));
        let script_url = format!("{}?{}", url, query);

        debug!("Dispatching script request {}: {}", id, script_url);

        let callback = OnceCallback::new(callback.into());
        let injector = self.injector.clone();
        self.runtime.spawn(async move {
            match signal.await {
                Ok(signal) => {
                    callback.deliver(normalize_signal(signal));
                    injector.remove(&id.to_string());
                }
                // Запись удалена из реестра до срабатывания.
                Err(_) => debug!("Callback {} was evicted before firing", id),
            }
        });

        self.injector.inject(
            ScriptElement {
                id,
                url: script_url.clone(),
            },
            self.registry.clone(),
        );

        ScriptHandle {
            id,
            url: script_url,
            registry: self.registry.clone(),
        }
    }
}

impl std::fmt::Debug for ScriptTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptTransport")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::UNEXPECTED_SHAPE_MESSAGE;
    use crate::transports::script::CallbackState;
    use crate::testing::{counting_callback, outcome_channel, settle, RecordingInjector};
    use serde_json::json;

    fn transport(injector: Arc<RecordingInjector>) -> ScriptTransport {
        let registry = Arc::new(CallbackRegistry::new("window._RequestCallbacks"));
        ScriptTransport::new(registry, injector, Handle::current())
    }

    #[tokio::test]
    async fn builds_callback_url_and_injects() {
        let injector = RecordingInjector::new();
        let transport = transport(injector.clone());
        let (callback, _rx) = outcome_channel();

        let params = ParamSet::new().with("where", "1=1");
        let handle = transport.get("http://svc/query", &params, callback);

        assert_eq!(handle.id, CallbackId(0));
        assert_eq!(
            handle.url,
            "http://svc/query?where=1%3D1&callback=window._RequestCallbacks.c0&f=json"
        );
        assert_eq!(injector.scripts(), vec![ScriptElement { id: CallbackId(0), url: handle.url.clone() }]);
        assert!(!params.contains_key("callback"));

        let second = transport.get("http://svc/query", &params, Callback::new(|_| {}));
        assert_eq!(second.id, CallbackId(1));
    }

    #[tokio::test]
    async fn structured_payload_is_delivered() {
        let injector = RecordingInjector::new();
        let transport = transport(injector.clone());
        let (callback, rx) = outcome_channel();

        let handle = transport.get("http://svc/q", &ParamSet::new(), callback);
        transport.registry().fire(handle.id, json!({ "results": [1, 2, 3] }));

        assert_eq!(rx.await.unwrap(), Ok(json!({ "results": [1, 2, 3] })));
        settle().await;
        assert_eq!(*injector.removed.lock(), vec!["c0".to_string()]);
    }

    #[tokio::test]
    async fn bare_string_payload_is_rejected() {
        let transport = transport(RecordingInjector::new());
        let (callback, rx) = outcome_channel();

        let handle = transport.get("http://svc/q", &ParamSet::new(), callback);
        transport.registry().fire(handle.id, json!("hello"));

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!((err.code, err.message.as_str()), (500, UNEXPECTED_SHAPE_MESSAGE));
    }

    #[tokio::test]
    async fn payload_with_error_becomes_the_error() {
        let transport = transport(RecordingInjector::new());
        let (callback, rx) = outcome_channel();

        let handle = transport.get("http://svc/q", &ParamSet::new(), callback);
        let payload = json!({ "error": { "code": 499, "message": "token required" } });
        transport.registry().fire(handle.id, payload.clone());

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.code, 499);
        assert_eq!(err.raw, payload);
    }

    #[tokio::test]
    async fn abort_wins_over_late_response() {
        let transport = transport(RecordingInjector::new());
        let (callback, mut rx) = counting_callback();

        let handle = transport.get("http://svc/q", &ParamSet::new(), callback);
        assert!(handle.abort());
        assert!(!transport.registry().fire(handle.id, json!({ "results": [] })));
        settle().await;

        assert_eq!(rx.recv().await, Some(Err(ServiceError::aborted())));
        assert!(rx.try_recv().is_err());
        assert_eq!(transport.registry().state(handle.id), Some(CallbackState::Aborted));
    }

    #[tokio::test]
    async fn unresolved_request_never_calls_back() {
        let transport = transport(RecordingInjector::new());
        let (callback, mut rx) = counting_callback();

        let handle = transport.get("http://svc/q", &ParamSet::new(), callback);
        settle().await;
        assert!(rx.try_recv().is_err());

        transport.registry().evict(handle.id);
        settle().await;
        assert!(rx.try_recv().is_err());
        assert!(!handle.abort());
    }

    #[test]
    fn normalize_signal_table() {
        assert_eq!(normalize_signal(ScriptSignal::Payload(json!([1]))), Ok(json!([1])));
        assert_eq!(normalize_signal(ScriptSignal::Payload(json!(42))), Err(ServiceError::unexpected_shape()));
        assert_eq!(normalize_signal(ScriptSignal::Payload(json!(null))), Err(ServiceError::unexpected_shape()));
        assert_eq!(normalize_signal(ScriptSignal::Aborted), Err(ServiceError::aborted()));
    }
}
