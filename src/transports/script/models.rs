// Файл: transports/script/models.rs
// Реестр ожидающих скриптовых колбэков и его жизненный цикл.

use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use tokio::sync::oneshot;

/// Идентификатор колбэка: `c0`, `c1`, ... (монотонно растущий в пределах реестра).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl std::str::FromStr for CallbackId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('c')
            .and_then(|n| n.parse().ok())
            .map(CallbackId)
            .ok_or(())
    }
}

/// Сигнал, которым разрешается ожидающий колбэк.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptSignal {
    /// Удалённый скрипт вызвал колбэк с этим значением.
    Payload(Value),
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    Pending,
    Fired,
    Aborted,
}

enum PendingCallback {
    Pending(oneshot::Sender<ScriptSignal>),
    Fired,
    Aborted,
}

impl PendingCallback {
    fn state(&self) -> CallbackState {
        match self {
            PendingCallback::Pending(_) => CallbackState::Pending,
            PendingCallback::Fired => CallbackState::Fired,
            PendingCallback::Aborted => CallbackState::Aborted,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    entries: HashMap<CallbackId, PendingCallback>,
}

/// Реестр колбэков скриптового транспорта.
///
/// Записи не удаляются автоматически после срабатывания: они остаются
/// в состоянии `Fired`/`Aborted`, чтобы поздний или повторный вызов был no-op.
/// Рост ограничен числом запросов; `evict` убирает запись явно.
pub struct CallbackRegistry {
    namespace: String,
    inner: Mutex<RegistryInner>,
}

impl CallbackRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Выделяет следующий id и регистрирует под ним ожидающий колбэк.
    pub fn register(&self) -> (CallbackId, oneshot::Receiver<ScriptSignal>) {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();
        let id = CallbackId(inner.next_id);
        inner.next_id += 1;
        inner.entries.insert(id, PendingCallback::Pending(tx));
        (id, rx)
    }

    /// Полный путь, который удалённый скрипт должен вызвать: `<namespace>.<id>`.
    pub fn callback_path(&self, id: CallbackId) -> String {
        format!("{}.{}", self.namespace, id)
    }

    pub fn state(&self, id: CallbackId) -> Option<CallbackState> {
        self.inner.lock().entries.get(&id).map(PendingCallback::state)
    }

    /// Вызов колбэка удалённым скриптом. `true`, если запись ожидала и теперь сработала.
    pub fn fire(&self, id: CallbackId, payload: Value) -> bool {
        self.resolve(id, PendingCallback::Fired, ScriptSignal::Payload(payload))
    }

    /// Отмена: ожидающий колбэк получает сигнал `Aborted`.
    pub fn abort(&self, id: CallbackId) -> bool {
        self.resolve(id, PendingCallback::Aborted, ScriptSignal::Aborted)
    }

    /// Убирает запись. Ожидающий запрос после этого не завершится никогда.
    pub fn evict(&self, id: CallbackId) -> Option<CallbackState> {
        self.inner.lock().entries.remove(&id).map(|entry| entry.state())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, id: CallbackId, terminal: PendingCallback, signal: ScriptSignal) -> bool {
        let sender = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.entries.get_mut(&id) else {
                warn!("Callback {} is not registered", id);
                return false;
            };
            if !matches!(entry, PendingCallback::Pending(_)) {
                debug!("Callback {} already settled, ignoring", id);
                return false;
            }
            match mem::replace(entry, terminal) {
                PendingCallback::Pending(tx) => tx,
                _ => return false,
            }
        };
        // Получатель мог исчезнуть (задача запроса снята) - запись всё равно считается сработавшей.
        let _ = sender.send(signal);
        true
    }

    /// Исполняет тело ответа вида `<namespace>.cN(<json>);`: находит запись и вызывает её.
    pub fn dispatch_script(&self, body: &str) -> bool {
        match self.parse_invocation(body) {
            Some((id, payload)) => self.fire(id, payload),
            None => {
                warn!("Script body does not invoke a callback under {}", self.namespace);
                false
            }
        }
    }

    fn parse_invocation(&self, body: &str) -> Option<(CallbackId, Value)> {
        let body = body.trim();
        let body = body.strip_prefix("/**/").unwrap_or(body).trim_start();
        let body = body.trim_end_matches(|c: char| c == ';' || c.is_whitespace());

        let open = body.find('(')?;
        let target = body[..open].trim();
        let id = target
            .strip_prefix(self.namespace.as_str())?
            .strip_prefix('.')?
            .parse::<CallbackId>()
            .ok()?;

        let args = body[open + 1..].strip_suffix(')')?;
        let payload = serde_json::from_str(args.trim()).ok()?;
        Some((id, payload))
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("namespace", &self.namespace)
            .field("entries", &self.len())
            .finish()
    }
}

/// Скриптовый элемент, который нужно внедрить: `id` элемента и адрес загрузки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub id: CallbackId,
    pub url: String,
}
