use crate::error::{JournalError, JournalResult};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration as StdDuration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub(crate) provider: &'static str,
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Value,
}

impl HttpRequest {
    pub(crate) fn post(provider: &'static str, url: String, body: Value) -> Self {
        Self {
            provider,
            url,
            headers: Vec::new(),
            body,
        }
    }

    pub(crate) fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {token}")));
        self
    }

    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) status_text: String,
    pub(crate) body: String,
}

impl HttpResponse {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single request/response primitive every provider goes through. JSON POST
/// only, no streaming, no retries.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> JournalResult<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// `timeout_secs: None` waits until the server answers or the connection fails.
    pub fn new(timeout_secs: Option<u64>) -> JournalResult<Self> {
        let client = Client::builder()
            .timeout(timeout_secs.map(StdDuration::from_secs))
            .build()
            .map_err(|error| JournalError::Network {
                provider: "HTTP client".to_string(),
                detail: error.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> JournalResult<HttpResponse> {
        debug!(
            provider = request.provider,
            url = %redact_query(&request.url),
            authenticated = request.header("Authorization").is_some(),
            "sending request"
        );

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let network_error = |error: reqwest::Error| JournalError::Network {
            provider: request.provider.to_string(),
            detail: error.to_string(),
        };
        let response = builder.send().map_err(network_error)?;
        let status = response.status();
        let body = response.text().map_err(network_error)?;

        debug!(provider = request.provider, status = status.as_u16(), "response received");
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Drop the query string so API keys passed as parameters never reach the logs.
fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn redact_query_strips_keys() {
        assert_eq!(
            redact_query("https://example.test/models/x:generateContent?key=secret"),
            "https://example.test/models/x:generateContent"
        );
        assert_eq!(redact_query("http://localhost/api/chat"), "http://localhost/api/chat");
    }

    #[test]
    fn bearer_header_is_readable() {
        let request = HttpRequest::post("OpenAI", "http://x".to_string(), json!({})).bearer("sk-1");
        assert_eq!(request.header("authorization"), Some("Bearer sk-1"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reqwest_transport_posts_json_and_returns_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let base = server.uri();
        let (ok, missing) = tokio::task::spawn_blocking(move || {
            let transport = ReqwestTransport::new(Some(10)).expect("client");
            let ok = transport
                .send(
                    &HttpRequest::post("OpenAI", format!("{base}/chat/completions"), json!({"model": "gpt-4o"}))
                        .bearer("sk-test"),
                )
                .expect("ok response");
            let missing = transport
                .send(&HttpRequest::post("OpenAI", format!("{base}/missing"), json!({})))
                .expect("404 is still a response");
            (ok, missing)
        })
        .await
        .expect("blocking task");

        assert_eq!(ok.status, 200);
        assert!(ok.is_success());
        assert_eq!(ok.body, r#"{"ok":true}"#);

        assert_eq!(missing.status, 404);
        assert_eq!(missing.status_text, "Not Found");
        assert!(!missing.is_success());
    }

    #[test]
    fn unreachable_host_is_a_network_error() {
        let transport = ReqwestTransport::new(Some(2)).expect("client");
        let result = transport.send(&HttpRequest::post(
            "Local LLM",
            "http://127.0.0.1:9/api/chat".to_string(),
            json!({}),
        ));
        assert!(matches!(result, Err(JournalError::Network { .. })));
    }
}
