use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::models::{ExplainRequest, ExplainResponse};

pub const DEFAULT_ENDPOINT: &str = "https://extension-quickexplain.up.railway.app";

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("backend returned {0}")]
    Status(StatusCode),

    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Something that turns a selection into an explanation.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, request: &ExplainRequest) -> Result<ExplainResponse, ExplainError>;
}

/// Talks to the explain service over HTTP: `POST <endpoint>/explain`.
pub struct HttpExplainer {
    client: Client,
    url: String,
}

impl HttpExplainer {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/explain", endpoint.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Explainer for HttpExplainer {
    async fn explain(&self, request: &ExplainRequest) -> Result<ExplainResponse, ExplainError> {
        debug!(url = %self.url, "calling explain service");
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(ExplainError::Network)?;

        if !response.status().is_success() {
            return Err(ExplainError::Status(response.status()));
        }

        response.json::<ExplainResponse>().await.map_err(ExplainError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(text: &str, context: Option<&str>) -> ExplainRequest {
        ExplainRequest {
            text: text.into(),
            context: context.map(str::to_string),
        }
    }

    #[test]
    fn url_joins_endpoint_and_path() {
        assert_eq!(HttpExplainer::new("http://x").url(), "http://x/explain");
        assert_eq!(HttpExplainer::new("http://x/").url(), "http://x/explain");
        assert_eq!(HttpExplainer::new(DEFAULT_ENDPOINT).url(), format!("{DEFAULT_ENDPOINT}/explain"));
    }

    #[tokio::test]
    async fn posts_json_and_parses_explanation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/explain"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"text": "photosynthesis", "context": "green leaves"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "explanation": "The process plants use to convert light into energy."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let explainer = HttpExplainer::new(&server.uri());
        let resp = explainer
            .explain(&request("photosynthesis", Some("green leaves")))
            .await
            .unwrap();
        assert_eq!(resp.text(), Some("The process plants use to convert light into energy."));
    }

    #[tokio::test]
    async fn absent_context_is_sent_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({"text": "x", "context": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"explanation": "y"})))
            .expect(1)
            .mount(&server)
            .await;

        let resp = HttpExplainer::new(&server.uri()).explain(&request("x", None)).await.unwrap();
        assert_eq!(resp.text(), Some("y"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = HttpExplainer::new(&server.uri()).explain(&request("x", None)).await.unwrap_err();
        assert!(matches!(err, ExplainError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = HttpExplainer::new(&server.uri()).explain(&request("x", None)).await.unwrap_err();
        assert!(matches!(err, ExplainError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let err = HttpExplainer::new("http://127.0.0.1:1").explain(&request("x", None)).await.unwrap_err();
        assert!(matches!(err, ExplainError::Network(_)));
    }
}
