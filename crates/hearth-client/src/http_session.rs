//! Authenticated JSON HTTP calls over a shared cookie jar (spec.md §4.1).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::HttpError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "hearth-client/0.1";

/// Owns the `reqwest::Client`, base URL, and session-scoped header set.
///
/// The client's built-in cookie store (`cookie_store(true)`) stands in for
/// the hand-rolled cookie jar a non-Rust client needs — every request made
/// through this client shares cookies automatically.
pub struct HttpSession {
    client: reqwest::Client,
    base_url: Url,
    referer: String,
    headers: RwLock<HeaderMap>,
}

impl HttpSession {
    /// Build a session against `base_url` (e.g. `https://myapi.arlo.com/hmsweb`).
    pub fn new(base_url: Url) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let referer = format!("{}/", base_url.origin().ascii_serialization());
        Ok(Self {
            client,
            base_url,
            referer,
            headers: RwLock::new(HeaderMap::new()),
        })
    }

    /// A clone of the underlying client, so other connections (the SSE
    /// subscribe request in particular) share this session's cookie jar
    /// instead of starting an uncorrelated one (spec.md §4.4 step 1).
    #[must_use]
    pub(crate) fn raw_client(&self) -> reqwest::Client {
        self.client.clone()
    }

    /// Set (or overwrite) a session-scoped header, sent on every subsequent call.
    pub async fn set_header(&self, key: &str, value: &str) -> Result<(), HttpError> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| HttpError::Decode(format!("invalid header name {key}: {e}")))?;
        let val = HeaderValue::from_str(value)
            .map_err(|e| HttpError::Decode(format!("invalid header value for {key}: {e}")))?;
        self.headers.write().await.insert(name, val);
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: Option<HeaderMap>,
    ) -> Result<T, HttpError> {
        self.execute(Method::GET, path, None::<&()>, extra).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        extra: Option<HeaderMap>,
    ) -> Result<T, HttpError> {
        self.execute(Method::POST, path, Some(body), extra).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        extra: Option<HeaderMap>,
    ) -> Result<T, HttpError> {
        self.execute(Method::PUT, path, Some(body), extra).await
    }

    async fn execute<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        extra: Option<HeaderMap>,
    ) -> Result<T, HttpError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| HttpError::Decode(format!("invalid path {path}: {e}")))?;

        let mut request = self.client.request(method.clone(), url);
        request = request
            .header("User-Agent", USER_AGENT)
            .header("DNT", "1")
            .header("schemaVersion", "1")
            .header("Referer", &self.referer)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        for (name, value) in self.headers.read().await.iter() {
            request = request.header(name, value);
        }
        if let Some(extra) = extra {
            for (name, value) in extra.iter() {
                request = request.header(name, value);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = %method, path, "http request");
        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("application/json") || ct.is_empty());
        if !is_json {
            return Err(HttpError::Decode("response is not application/json".to_owned()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::routing::{get, post};
    use serde_json::json;

    async fn spawn_echo_server() -> Url {
        let app = axum::Router::new()
            .route("/ok", get(|| async { Json(json!({"hello": "world"})) }))
            .route(
                "/err",
                get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/echo",
                post(|body: Json<serde_json::Value>| async move { Json(body.0) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[tokio::test]
    async fn get_decodes_json_success() {
        let base = spawn_echo_server().await;
        let session = HttpSession::new(base).unwrap();
        let value: serde_json::Value = session.get("ok", None).await.unwrap();
        assert_eq!(value["hello"], "world");
    }

    #[tokio::test]
    async fn status_4xx_and_above_is_an_http_error() {
        let base = spawn_echo_server().await;
        let session = HttpSession::new(base).unwrap();
        let err = session.get::<serde_json::Value>("err", None).await.unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn post_round_trips_json_body() {
        let base = spawn_echo_server().await;
        let session = HttpSession::new(base).unwrap();
        let payload = json!({"a": 1});
        let echoed: serde_json::Value = session.post("echo", &payload, None).await.unwrap();
        assert_eq!(echoed, payload);
    }

    #[tokio::test]
    async fn set_header_is_sent_on_subsequent_requests() {
        let app = axum::Router::new().route(
            "/auth",
            get(|headers: axum::http::HeaderMap| async move {
                let token = headers
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                Json(json!({"token": token}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let session = HttpSession::new(base).unwrap();
        session.set_header("Authorization", "T123").await.unwrap();
        let value: serde_json::Value = session.get("auth", None).await.unwrap();
        assert_eq!(value["token"], "T123");
    }
}
