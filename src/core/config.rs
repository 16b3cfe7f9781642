// Файл: core/config.rs
// Настройки ядра запросов.

use std::time::Duration;

/// Порог длины `url?query`, выше которого GET заменяется на POST
/// (или запрос отклоняется без прямого транспорта).
pub const DEFAULT_MAX_URL_LENGTH: usize = 2000;
pub const DEFAULT_CALLBACK_NAMESPACE: &str = "window._RequestCallbacks";
pub const APP_USER_AGENT: &str = "request-bridge/0.1";

/// Конфигурация диспетчера и транспортов.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Умеет ли окружение прямые кросс-доменные запросы.
    /// Значение приходит снаружи (детекция окружения), здесь не вычисляется.
    pub cors: bool,

    pub max_url_length: usize,

    /// Полный путь реестра колбэков; в запрос уходит как `callback=<namespace>.<id>`.
    pub callback_namespace: String,

    pub user_agent: String,

    /// Таймаут только на установку соединения. Таймаута на весь запрос нет.
    pub connect_timeout: Option<Duration>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            cors: true,
            max_url_length: DEFAULT_MAX_URL_LENGTH,
            callback_namespace: DEFAULT_CALLBACK_NAMESPACE.to_string(),
            user_agent: APP_USER_AGENT.to_string(),
            connect_timeout: None,
        }
    }
}

impl RequestConfig {
    pub fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    pub fn with_max_url_length(mut self, max_url_length: usize) -> Self {
        self.max_url_length = max_url_length;
        self
    }

    pub fn with_callback_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.callback_namespace = namespace.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Сетевые настройки совпадают с умолчаниями, и HTTP-клиент можно взять общий.
    pub fn uses_default_client(&self) -> bool {
        self.user_agent == APP_USER_AGENT && self.connect_timeout.is_none()
    }
}
