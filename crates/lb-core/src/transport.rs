use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::TransportConfig;
use crate::errors::{Result, TransportError};

const SNIPPET_LEN: usize = 200;

/// Body of a POST request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Sent as `application/x-www-form-urlencoded`, pairs kept in order
    Form(Vec<(String, String)>),
    /// Pre-encoded JSON document, sent as `application/json`
    Json(Vec<u8>),
}

impl RequestBody {
    /// Encode a typed request. Field order follows the struct declaration.
    pub fn json<T: serde::Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::Json(serde_json::to_vec(value)?))
    }

    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Raw outcome of one HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Leading part of the body, for error messages
    pub fn snippet(&self) -> String {
        String::from_utf8_lossy(&self.body)
            .chars()
            .take(SNIPPET_LEN)
            .collect()
    }
}

/// A single request/response exchange. Implementations never retry.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &Url, body: RequestBody) -> Result<HttpResponse>;

    async fn get(&self, url: &Url, bearer: Option<&str>) -> Result<HttpResponse>;
}

/// reqwest-backed transport, configured once
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .default_headers(headers);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str()).map_err(TransportError::Client)?);
        }

        let http = builder.build().map_err(TransportError::Client)?;
        Ok(Self { http })
    }

    async fn finish(&self, url: &Url, request: reqwest::RequestBuilder) -> Result<HttpResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        debug!(%status, len = body.len(), "Received response");
        Ok(HttpResponse { status, body })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, body), fields(url = %url))]
    async fn post(&self, url: &Url, body: RequestBody) -> Result<HttpResponse> {
        let request = match body {
            RequestBody::Form(pairs) => self.http.post(url.clone()).form(&pairs),
            RequestBody::Json(bytes) => self
                .http
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(bytes),
        };

        self.finish(url, request).await
    }

    #[instrument(skip(self, bearer), fields(url = %url))]
    async fn get(&self, url: &Url, bearer: Option<&str>) -> Result<HttpResponse> {
        let mut request = self.http.get(url.clone());
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        self.finish(url, request).await
    }
}
