// Файл: core/http.rs
// Сетевой шов прямого транспорта: трейт HttpClient и его реализация на reqwest.

use super::config::RequestConfig;
use super::error::CoreError;
use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::OnceCell;
use reqwest::{header, Client, Url};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// Общий клиент по умолчанию. 'reqwest::Client' использует Arc внутри,
// поэтому клонирование дешёвое; строится лениво и только один раз.
static SHARED_CLIENT: OnceCell<Client> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Запрос в том виде, в каком он уходит в сеть.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<&'static str>,
}

impl WireRequest {
    /// GET: строка запроса добавляется к URL после `?`.
    pub fn get(url: &str, query: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            url: format!("{}?{}", url, query),
            body: None,
            content_type: None,
        }
    }

    /// POST: строка запроса уходит телом формы.
    pub fn post(url: &str, query: &str) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.to_string(),
            body: Some(query.to_string()),
            content_type: Some(FORM_CONTENT_TYPE),
        }
    }
}

/// Низкоуровневый HTTP-примитив.
///
/// Post-conditions:
/// - `Ok(body)` при любом завершённом ответе, включая 4xx/5xx: судьбу ответа решает разбор тела.
/// - `Err(_)` только при сбое транспорта (DNS, соединение, обрыв чтения).
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: WireRequest) -> BoxFuture<'static, Result<String, CoreError>>;
}

/// HttpClient поверх reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &RequestConfig) -> Result<Self, CoreError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    /// Клиент с настройками по умолчанию, общий для всего процесса.
    pub fn shared() -> Result<Self, CoreError> {
        let client = SHARED_CLIENT.get_or_try_init(|| build_client(&RequestConfig::default()))?;
        Ok(Self {
            client: client.clone(),
        })
    }

    /// Общий клиент, если сетевые настройки по умолчанию; иначе собственный.
    pub fn for_config(config: &RequestConfig) -> Result<Self, CoreError> {
        if config.uses_default_client() {
            Self::shared()
        } else {
            Self::new(config)
        }
    }
}

fn build_client(config: &RequestConfig) -> Result<Client, CoreError> {
    let mut headers = header::HeaderMap::new();
    let agent = header::HeaderValue::from_str(&config.user_agent)
        .map_err(|e| CoreError::Transport(format!("Invalid user agent: {}", e)))?;
    headers.insert(header::USER_AGENT, agent);

    let mut builder = Client::builder().default_headers(headers);
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    Ok(builder.build()?)
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: WireRequest) -> BoxFuture<'static, Result<String, CoreError>> {
        let client = self.client.clone();
        async move {
            let url = Url::parse(&request.url)?;
            let mut builder = match request.method {
                HttpMethod::Get => client.get(url),
                HttpMethod::Post => client.post(url),
            };
            if let Some(content_type) = request.content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            // .error_for_status() не используется: тело 4xx/5xx тоже разбирается.
            let response = builder.send().await?;
            Ok::<_, CoreError>(response.text().await?)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn wire_request_shapes() {
        let get = WireRequest::get("http://host/q", "a=1&f=json");
        assert_eq!(get.method, HttpMethod::Get);
        assert_eq!(get.url, "http://host/q?a=1&f=json");
        assert!(get.body.is_none());

        let post = WireRequest::post("http://host/q", "a=1&f=json");
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(post.url, "http://host/q");
        assert_eq!(post.body.as_deref(), Some("a=1&f=json"));
        assert_eq!(post.content_type, Some(FORM_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn reqwest_client_sends_query_on_get() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("where".into(), "1=1".into()),
                Matcher::UrlEncoded("f".into(), "json".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"features":[]}"#)
            .create_async()
            .await;

        let client = ReqwestClient::new(&RequestConfig::default()).unwrap();
        let url = format!("{}/query", server.url());
        let body = client
            .execute(WireRequest::get(&url, "where=1%3D1&f=json"))
            .await
            .unwrap();

        assert_eq!(body, r#"{"features":[]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reqwest_client_posts_form_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query")
            .match_header("content-type", FORM_CONTENT_TYPE)
            .match_body("where=1%3D1&f=json")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = ReqwestClient::new(&RequestConfig::default()).unwrap();
        let url = format!("{}/query", server.url());
        let body = client
            .execute(WireRequest::post(&url, "where=1%3D1&f=json"))
            .await
            .unwrap();

        assert_eq!(body, r#"{"ok":true}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reqwest_client_returns_body_of_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = ReqwestClient::new(&RequestConfig::default()).unwrap();
        let url = format!("{}/missing", server.url());
        let body = client.execute(WireRequest::get(&url, "f=json")).await.unwrap();
        assert_eq!(body, "not found");
    }

    #[test]
    fn default_config_reuses_shared_client() {
        assert!(ReqwestClient::for_config(&RequestConfig::default().with_cors(false)).is_ok());
        assert!(SHARED_CLIENT.get().is_some());

        let custom = RequestConfig::default().with_connect_timeout(std::time::Duration::from_secs(3));
        assert!(ReqwestClient::for_config(&custom).is_ok());

        let broken = RequestConfig::default().with_user_agent("bad\nagent");
        assert!(matches!(ReqwestClient::for_config(&broken), Err(CoreError::Transport(_))));
    }

    #[tokio::test]
    async fn reqwest_client_reports_transport_failure() {
        let client = ReqwestClient::shared().unwrap();
        let result = client
            .execute(WireRequest::get("http://127.0.0.1:1/none", "f=json"))
            .await;
        assert!(matches!(result, Err(CoreError::Network(_))));
    }

    #[tokio::test]
    async fn reqwest_client_rejects_invalid_url() {
        let client = ReqwestClient::shared().unwrap();
        let result = client.execute(WireRequest::get("not a url", "f=json")).await;
        assert!(matches!(result, Err(CoreError::UrlParse(_))));
    }
}
