// Файл: dispatcher/requests.rs
// Диспетчер запросов.

use crate::core::callback::{Callback, Outcome};
use crate::core::config::RequestConfig;
use crate::core::error::CoreError;
use crate::core::http::{HttpClient, HttpMethod, ReqwestClient, WireRequest};
use crate::params::{serialize, ParamSet};
use crate::transports::direct::{DirectHandle, DirectTransport};
use crate::transports::script::{
    CallbackRegistry, HttpScriptLoader, ScriptHandle, ScriptInjector, ScriptTransport,
};
use log::warn;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Хэндл запущенного запроса любого транспорта.
#[derive(Debug)]
pub enum RequestHandle {
    Direct(DirectHandle),
    Script(ScriptHandle),
}

impl RequestHandle {
    /// Лучшая попытка отмены. `true`, если колбэк получил ошибку отмены.
    pub fn abort(&self) -> bool {
        match self {
            RequestHandle::Direct(handle) => handle.abort(),
            RequestHandle::Script(handle) => handle.abort(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            RequestHandle::Direct(handle) => &handle.url,
            RequestHandle::Script(handle) => &handle.url,
        }
    }

    /// Метод прямого запроса; `None` для скриптового.
    pub fn method(&self) -> Option<HttpMethod> {
        match self {
            RequestHandle::Direct(handle) => Some(handle.method),
            RequestHandle::Script(_) => None,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, RequestHandle::Script(_))
    }
}

/// Точка входа для вызывающего кода. Какой транспорт использован, снаружи не видно:
/// каждый путь заканчивается одним вызовом `callback(Err(..) | Ok(..))`.
///
/// Колбэки вызываются из задач рантайма, никогда внутри вызова `request`/`get`/`post`.
/// Таймаутов нет: запрос без ответа и без сетевой ошибки не завершится.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: RequestConfig,
    direct: DirectTransport,
    script: ScriptTransport,
}

impl Dispatcher {
    /// Диспетчер на reqwest с HTTP-загрузчиком скриптов. Требует текущий рантайм tokio.
    pub fn new(config: RequestConfig) -> Result<Self, CoreError> {
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime)?;
        let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::for_config(&config)?);
        let injector = Arc::new(HttpScriptLoader::new(client.clone(), runtime.clone()));
        Ok(Self::with_parts(config, client, injector, runtime))
    }

    /// Сборка из готовых частей (свой HTTP-клиент, свой примитив внедрения скриптов).
    pub fn with_parts(
        config: RequestConfig,
        client: Arc<dyn HttpClient>,
        injector: Arc<dyn ScriptInjector>,
        runtime: Handle,
    ) -> Self {
        let registry = Arc::new(CallbackRegistry::new(config.callback_namespace.clone()));
        Self {
            direct: DirectTransport::new(client, runtime.clone()),
            script: ScriptTransport::new(registry, injector, runtime),
            config,
        }
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        self.script.registry()
    }

    /// Полная таблица выбора по длине `url?query`:
    ///
    /// | длина     | прямой транспорт | действие           |
    /// |-----------|------------------|--------------------|
    /// | <= порога | есть             | прямой GET         |
    /// | > порога  | есть             | прямой POST        |
    /// | <= порога | нет              | скриптовый GET     |
    /// | > порога  | нет              | предупреждение, `None`, колбэк не вызывается |
    pub fn request(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> Option<RequestHandle> {
        let query = serialize(params);
        let fits = query.request_length(url) <= self.config.max_url_length;

        match (fits, self.config.cors) {
            (true, true) => Some(RequestHandle::Direct(
                self.direct.send(WireRequest::get(url, query.as_str()), callback.into()),
            )),
            (false, true) => Some(RequestHandle::Direct(
                self.direct.send(WireRequest::post(url, query.as_str()), callback.into()),
            )),
            (true, false) => Some(RequestHandle::Script(self.script.get(url, params, callback))),
            (false, false) => {
                warn!(
                    "a request to {} was longer than {} characters and this environment cannot make \
                     a cross-domain post request; use a proxy",
                    url, self.config.max_url_length
                );
                None
            }
        }
    }

    /// GET с автоматическим выбором транспорта, без проверки длины.
    pub fn get(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> RequestHandle {
        if self.config.cors {
            self.get_direct(url, params, callback)
        } else {
            self.get_script(url, params, callback)
        }
    }

    /// Всегда прямой GET.
    pub fn get_direct(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> RequestHandle {
        RequestHandle::Direct(self.direct.get(url, params, callback))
    }

    /// Всегда скриптовый GET.
    pub fn get_script(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> RequestHandle {
        RequestHandle::Script(self.script.get(url, params, callback))
    }

    /// Всегда прямой POST, флаг окружения не проверяется.
    /// Без поддержки прямых запросов такой POST просто завершится транспортной ошибкой.
    pub fn post(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> RequestHandle {
        RequestHandle::Direct(self.direct.post(url, params, callback))
    }

    /// `request` в форме future. `None`, если запрос был отклонён
    /// или не завершится (запись колбэка удалена из реестра).
    pub async fn fetch(&self, url: &str, params: &ParamSet) -> Option<Outcome> {
        let (tx, rx) = oneshot::channel();
        let callback = Callback::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        self.request(url, params, callback)?;
        rx.await.ok()
    }
}
