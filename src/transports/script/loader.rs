// Файл: transports/script/loader.rs
// Внедрение «скрипта» вне браузера: тело загружается по HTTP и исполняется как вызов колбэка.

use super::models::{CallbackRegistry, ScriptElement};
use super::requests::ScriptInjector;
use crate::core::http::{HttpClient, HttpMethod, WireRequest};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Загружает ответ `<namespace>.cN(<json>);` обычным GET и передаёт его реестру.
///
/// Сбой загрузки только логируется: колбэк в этом случае не срабатывает.
pub struct HttpScriptLoader {
    client: Arc<dyn HttpClient>,
    runtime: Handle,
    tracked: Arc<Mutex<HashSet<String>>>,
}

impl HttpScriptLoader {
    pub fn new(client: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self {
            client,
            runtime,
            tracked: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Идентификаторы элементов, чьи колбэки ещё не сняты с учёта.
    pub fn tracked(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tracked.lock().iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl ScriptInjector for HttpScriptLoader {
    fn inject(&self, script: ScriptElement, registry: Arc<CallbackRegistry>) {
        let id = script.id;
        self.tracked.lock().insert(id.to_string());

        let request = WireRequest {
            method: HttpMethod::Get,
            url: script.url,
            body: None,
            content_type: None,
        };
        let url = request.url.clone();
        let load = self.client.execute(request);

        self.runtime.spawn(async move {
            match load.await {
                Ok(body) => {
                    if !registry.dispatch_script(&body) {
                        warn!("Script from {} did not resolve callback {}", url, id);
                    }
                }
                Err(e) => warn!("Failed to load script {}: {}", url, e),
            }
        });
    }

    fn remove(&self, element_id: &str) {
        if self.tracked.lock().remove(element_id) {
            debug!("Script element {} untracked", element_id);
        }
    }
}

impl std::fmt::Debug for HttpScriptLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScriptLoader")
            .field("tracked", &self.tracked.lock().len())
            .finish_non_exhaustive()
    }
}
