// Файл: core/callback.rs
// Единый контракт исхода: callback(error | response), не более одного раза на запрос.

use super::error::ServiceError;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Ровно одно из двух: ошибка или ответ.
pub type Outcome = Result<Value, ServiceError>;

/// Колбэк вызывающей стороны. Контекст (если нужен) захватывается замыканием
/// или передаётся явно через `with_context`.
pub struct Callback(Box<dyn FnOnce(Outcome) + Send + 'static>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Привязывает колбэк к контексту исполнения.
    pub fn with_context<C, F>(context: C, f: F) -> Self
    where
        C: Send + 'static,
        F: FnOnce(&C, Outcome) + Send + 'static,
    {
        Self::new(move |outcome| f(&context, outcome))
    }

    pub fn call(self, outcome: Outcome) {
        (self.0)(outcome)
    }
}

impl<F> From<F> for Callback
where
    F: FnOnce(Outcome) + Send + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Одноразовая обёртка над колбэком. Первый `deliver` вызывает колбэк,
/// все последующие (дубли, поздние события, abort после ответа) ничего не делают.
#[derive(Debug, Clone)]
pub struct OnceCallback {
    slot: Arc<Mutex<Option<Callback>>>,
}

impl OnceCallback {
    pub fn new(callback: Callback) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(callback))),
        }
    }

    /// Возвращает `true`, если исход был доставлен этим вызовом.
    pub fn deliver(&self, outcome: Outcome) -> bool {
        // Забираем колбэк до вызова: лок не держится во время пользовательского кода.
        let callback = self.slot.lock().take();
        match callback {
            Some(callback) => {
                callback.call(outcome);
                true
            }
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.slot.lock().is_none()
    }
}
