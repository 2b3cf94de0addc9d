use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Unique constraint violated: {message}")]
    Conflict { message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    /// Requests run with the service role key: slot checks must see every
    /// patient's bookings, which row level security would otherwise hide.
    fn get_headers(&self) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", header_value(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", self.service_key))?);

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(classify_error(status, error_text));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// `Prefer: return=representation` so writes echo the affected rows.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        headers
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, SupabaseError> {
    HeaderValue::from_str(raw).map_err(|e| SupabaseError::InvalidHeader(e.to_string()))
}

fn classify_error(status: StatusCode, error_text: String) -> SupabaseError {
    let parsed = serde_json::from_str::<PostgrestError>(&error_text).ok();
    let code = parsed.as_ref().and_then(|p| p.code.clone());
    let message = parsed
        .and_then(|p| p.message)
        .unwrap_or_else(|| error_text.clone());

    if status == StatusCode::CONFLICT || code.as_deref() == Some(UNIQUE_VIOLATION) {
        debug!("Unique constraint rejected write: {}", message);
        return SupabaseError::Conflict { message };
    }

    error!("API error ({}): {}", status, error_text);

    match status.as_u16() {
        401 | 403 => SupabaseError::Auth(message),
        404 => SupabaseError::NotFound(message),
        other => SupabaseError::Api { status: other, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SupabaseClient {
        let config = AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "anon".to_string(),
            supabase_service_key: "service".to_string(),
            ..AppConfig::default()
        };
        SupabaseClient::new(&config)
    }

    #[tokio::test]
    async fn test_sends_service_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Value> = client_for(&server)
            .request(Method::GET, "/rest/v1/appointments", None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let result: Result<Vec<Value>, _> = client_for(&server)
            .request(Method::POST, "/rest/v1/appointments", Some(json!({})))
            .await;
        assert_matches!(result, Err(SupabaseError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let result: Result<Vec<Value>, _> = client_for(&server)
            .request(Method::GET, "/rest/v1/appointments", None)
            .await;
        assert_matches!(result, Err(SupabaseError::Api { status: 503, .. }));
    }
}
