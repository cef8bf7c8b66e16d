use std::sync::Arc;

use crate::config::ApiConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Thin JSON gateway over the tracker API. Every call makes exactly one attempt.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    config: ApiConfig,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_with_body(Method::GET, path, Option::<&Value>::None).await
    }

    pub async fn get_with_query<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute(Method::GET, path, request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(Method::POST, path, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(Method::PATCH, path, body).await
    }

    pub async fn delete<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_with_body(Method::DELETE, path, Option::<&Value>::None).await
    }

    pub async fn send_with_body<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method.clone(), path);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        self.execute(method, path, request).await
    }

    /// Starts a request and attaches the stored credential, read fresh on every call.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.config.url_for(path));
        match self.credentials.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T>(&self, method: Method, path: &str, request: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%method, path, "request failed before a response: {err}");
                return Err(ApiError::from(err));
            }
        };
        tracing::debug!(%method, path, status = response.status().as_u16(), "api response");
        Self::parse_json(response).await
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            serde_json::from_slice(&bytes).map_err(ApiError::from)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, extract_error_message(&body)))
        }
    }
}

fn build_http_client(config: &ApiConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| ApiError::Other(err.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| ApiError::Other(err.to_string()))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Pulls `message` out of an error envelope; non-JSON bodies yield nothing.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}
