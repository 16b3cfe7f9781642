// Файл: transports/direct/requests.rs
// Прямой транспорт: GET и POST через HttpClient, исход доставляется из задачи рантайма.

use super::models::{DirectHandle, PendingDirect};
use crate::core::callback::Callback;
use crate::core::http::{HttpClient, WireRequest};
use crate::params::{serialize, ParamSet};
use log::debug;
use std::sync::Arc;
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct DirectTransport {
    client: Arc<dyn HttpClient>,
    runtime: Handle,
}

impl DirectTransport {
    pub fn new(client: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    /// GET: сериализованные параметры добавляются к URL.
    pub fn get(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> DirectHandle {
        let query = serialize(params);
        self.send(WireRequest::get(url, query.as_str()), callback.into())
    }

    /// POST: параметры уходят телом `application/x-www-form-urlencoded`.
    pub fn post(&self, url: &str, params: &ParamSet, callback: impl Into<Callback>) -> DirectHandle {
        let query = serialize(params);
        self.send(WireRequest::post(url, query.as_str()), callback.into())
    }

    /// Запускает запрос в рантайме. Колбэк никогда не вызывается внутри этого метода.
    pub(crate) fn send(&self, request: WireRequest, callback: Callback) -> DirectHandle {
        debug!("Dispatching direct {:?} request: {}", request.method, request.url);

        let method = request.method;
        let url = request.url.clone();
        let pending = PendingDirect::new(callback, url.clone());

        // Фьючерс ленивый: сеть трогается только внутри задачи.
        let response = self.client.execute(request);
        let task_pending = pending.clone();
        let task = self.runtime.spawn(async move {
            match response.await {
                Ok(body) => task_pending.on_complete(&body),
                Err(error) => task_pending.on_error(&error),
            };
        });

        DirectHandle::new(method, url, pending, task, self.runtime.clone())
    }
}

impl std::fmt::Debug for DirectTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectTransport").finish_non_exhaustive()
    }
}
