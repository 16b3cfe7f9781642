// Файл: testing.rs
// Тестовые двойники: HTTP-клиент со сценарием ответов и инжектор, записывающий скрипты.

use crate::core::callback::{Callback, Outcome};
use crate::core::error::CoreError;
use crate::core::http::{HttpClient, WireRequest};
use crate::transports::script::{CallbackRegistry, ScriptElement, ScriptInjector};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub enum Reply {
    Body(String),
    Fail,
    /// Ответ не приходит никогда.
    Hang,
}

/// Отвечает по очереди заранее заданными ответами; по умолчанию `{"ok":true}`.
#[derive(Default)]
pub struct FakeHttpClient {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<WireRequest>>,
}

impl FakeHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replying(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<WireRequest> {
        self.requests.lock().clone()
    }
}

impl HttpClient for FakeHttpClient {
    fn execute(&self, request: WireRequest) -> BoxFuture<'static, Result<String, CoreError>> {
        self.requests.lock().push(request);
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Reply::Body(r#"{"ok":true}"#.to_string()));
        async move {
            match reply {
                Reply::Body(body) => Ok(body),
                Reply::Fail => Err(CoreError::Transport("connection reset".into())),
                Reply::Hang => futures::future::pending().await,
            }
        }
        .boxed()
    }
}

/// Запоминает внедрённые скрипты и снятые с учёта элементы; сам ничего не загружает.
#[derive(Default)]
pub struct RecordingInjector {
    pub injected: Mutex<Vec<(ScriptElement, Arc<CallbackRegistry>)>>,
    pub removed: Mutex<Vec<String>>,
}

impl RecordingInjector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripts(&self) -> Vec<ScriptElement> {
        self.injected.lock().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl ScriptInjector for RecordingInjector {
    fn inject(&self, script: ScriptElement, registry: Arc<CallbackRegistry>) {
        self.injected.lock().push((script, registry));
    }

    fn remove(&self, element_id: &str) {
        self.removed.lock().push(element_id.to_string());
    }
}

/// Колбэк, пересылающий исход в канал.
pub fn outcome_channel() -> (Callback, oneshot::Receiver<Outcome>) {
    let (tx, rx) = oneshot::channel();
    let callback = Callback::new(move |outcome| {
        let _ = tx.send(outcome);
    });
    (callback, rx)
}

/// Колбэк, считающий все вызовы (для проверки «не более одного раза»).
pub fn counting_callback() -> (Callback, mpsc::UnboundedReceiver<Outcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = Callback::new(move |outcome| {
        let _ = tx.send(outcome);
    });
    (callback, rx)
}

/// Даёт рантайму прогнать уже запущенные задачи.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
