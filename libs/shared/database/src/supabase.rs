use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::StoreError;

/// Non-2xx answer from PostgREST. Carried inside the `anyhow::Error` so
/// store implementations can recover the status code.
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {body}")]
pub struct SupabaseHttpError {
    pub status: u16,
    pub body: String,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.supabase_url, &config.supabase_anon_key)
    }

    pub fn with_base_url(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(anyhow!(SupabaseHttpError {
                status: status.as_u16(),
                body: error_text,
            }));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// `Prefer: return=representation`, so writes echo the stored rows.
pub fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

/// HTTP status of a failed PostgREST call, if the failure got that far.
pub fn http_status(err: &anyhow::Error) -> Option<u16> {
    err.downcast_ref::<SupabaseHttpError>().map(|e| e.status)
}

/// Generic mapping from client failures to store failures. Stores with a
/// more specific reading of 409 (e.g. the appointment slot guard) check
/// [`http_status`] first.
pub fn into_store_error(err: anyhow::Error) -> StoreError {
    match http_status(&err) {
        Some(404) => StoreError::NotFound,
        Some(409) => StoreError::Conflict(err.to_string()),
        _ => {
            if let Some(decode) = err.downcast_ref::<serde_json::Error>() {
                StoreError::Decode(decode.to_string())
            } else {
                StoreError::Database(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_request_sends_auth_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .and(header("apikey", "anon"))
            .and(header("Authorization", "Bearer service-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .mount(&mock_server)
            .await;

        let client = SupabaseClient::with_base_url(&mock_server.uri(), "anon");
        let rows: Vec<Value> = client
            .request(Method::GET, "/rest/v1/doctors", Some("service-token"), None)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_status_is_recoverable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
            .mount(&mock_server)
            .await;

        let client = SupabaseClient::with_base_url(&mock_server.uri(), "anon");
        let err = client
            .request::<Vec<Value>>(Method::POST, "/rest/v1/appointments", None, Some(json!({})))
            .await
            .unwrap_err();

        assert_eq!(http_status(&err), Some(409));
        assert_matches!(into_store_error(err), StoreError::Conflict(_));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_database() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = SupabaseClient::with_base_url(&mock_server.uri(), "anon");
        let err = client
            .request::<Vec<Value>>(Method::GET, "/rest/v1/appointments", None, None)
            .await
            .unwrap_err();

        assert_matches!(into_store_error(err), StoreError::Database(_));
    }
}
