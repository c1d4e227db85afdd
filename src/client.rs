use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::provider::{ChunkStream, Provider};
use crate::sse::process_sse;
use crate::types::{ApiErrorBody, ErrorEnvelope, GenerateContentRequest, Model};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini API.
///
/// The client itself is keyless; the credential travels with each request so
/// that a session can be rebuilt around a new key without a new client.
#[derive(Debug, Clone)]
pub struct Gemini {
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
}

impl Gemini {
    /// Create a new Gemini client against the public endpoint, with no
    /// overall request timeout.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds a whole request including the streamed body; `None`
    /// lets a reply stream for as long as the provider keeps it open.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let mut builder = ReqwestClient::builder().connect_timeout(DEFAULT_CONNECT_TIMEOUT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the streaming endpoint for a model.
    fn stream_url(&self, model: &Model) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("models/{model}:streamGenerateContent"))?;
        url.query_pairs_mut().append_pair("alt", "sse");
        Ok(url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self, credential: &Credential) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let mut key = HeaderValue::from_str(credential.expose())
            .map_err(|_| Error::authentication("API key contains invalid characters"))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        error_from_response(status_code, &error_body, retry_after)
    }

    /// Send a request and get a stream of response chunks.
    pub async fn stream(
        &self,
        credential: &Credential,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream> {
        let url = self.stream_url(model)?;
        let headers = self.default_headers(credential)?;

        tracing::debug!(
            %model,
            turns = request.contents.len(),
            "sending streamGenerateContent"
        );
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        self.timeout.map(|t| t.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::warn!(error = %err, "streamGenerateContent failed");
            return Err(err);
        }

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

#[async_trait::async_trait]
impl Provider for Gemini {
    async fn stream_generate(
        &self,
        credential: &Credential,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<ChunkStream> {
        self.stream(credential, model, &request).await
    }
}

/// Maps an HTTP error status and body to our error type.
pub(crate) fn error_from_response(
    status_code: u16,
    body: &str,
    retry_after: Option<u64>,
) -> Error {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_else(|_| ApiErrorBody {
            code: status_code,
            message: body.to_string(),
            status: None,
            details: Vec::new(),
        });
    error_from_body(status_code, &parsed, retry_after)
}

/// Maps a decoded service error to our error type.
pub(crate) fn error_from_body(
    status_code: u16,
    body: &ApiErrorBody,
    retry_after: Option<u64>,
) -> Error {
    let message = body.message.clone();
    if status_code == 401 || body.is_invalid_key() {
        return Error::authentication(message);
    }
    match status_code {
        400 => Error::bad_request(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 | 504 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502 | 503 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, body.status.clone(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, Part};
    use futures::StreamExt;
    use std::env;

    #[test]
    fn client_creation() {
        let client = Gemini::new().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout, None);

        let client = Gemini::with_options(
            Some("http://localhost:8080/v1beta".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/v1beta/");
        assert_eq!(client.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn invalid_base_url() {
        let err = Gemini::with_options(Some("not a url".to_string()), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn stream_url_for_models() {
        let client = Gemini::new().unwrap();
        let url = client.stream_url(&Model::default()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:streamGenerateContent?alt=sse"
        );
        let url = client.stream_url(&Model::from("gemini-2.5-pro")).unwrap();
        assert!(url.path().ends_with("/models/gemini-2.5-pro:streamGenerateContent"));
    }

    #[test]
    fn headers_carry_key() {
        let client = Gemini::new().unwrap();
        let credential = Credential::new("AIzaSyTest").unwrap();
        let headers = client.default_headers(&credential).unwrap();
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "AIzaSyTest");
        assert!(headers.get(API_KEY_HEADER).unwrap().is_sensitive());

        let credential = Credential::new("bad\nkey").unwrap();
        assert!(client.default_headers(&credential).unwrap_err().is_authentication());
    }

    #[test]
    fn map_invalid_key() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert!(error_from_response(400, body, None).is_authentication());
    }

    #[test]
    fn map_status_codes() {
        let body = r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = error_from_response(429, body, Some(7));
        assert!(matches!(err, Error::RateLimit { retry_after: Some(7), .. }));

        assert!(matches!(
            error_from_response(400, "{}", None),
            Error::BadRequest { .. }
        ));
        assert!(error_from_response(401, "nope", None).is_authentication());
        assert!(error_from_response(403, "denied", None).is_permission());
        assert!(matches!(
            error_from_response(404, "no such model", None),
            Error::NotFound { .. }
        ));
        assert!(error_from_response(503, "busy", None).is_server_error());
        assert_eq!(error_from_response(418, "teapot", None).status_code(), Some(418));
    }

    #[test]
    fn unparseable_body_becomes_message() {
        let err = error_from_response(500, "<html>oops</html>", None);
        assert_eq!(err.to_string(), "Internal server error: <html>oops</html>");
    }

    #[tokio::test]
    #[ignore] // Ignore by default as this requires a real API key
    async fn stream_live() {
        let Ok(key) = env::var("WORMZERO_API_KEY") else {
            println!("Skipping stream_live: WORMZERO_API_KEY not set");
            return;
        };
        let credential = Credential::new(key).unwrap();
        let client = Gemini::new().unwrap();
        let request = GenerateContentRequest::new(vec![Content::user(vec![Part::text(
            "Reply with a short greeting.",
        )])]);

        let mut stream = client
            .stream(&credential, &Model::default(), &request)
            .await
            .unwrap();
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            if let Some(fragment) = chunk.unwrap().text() {
                text.push_str(&fragment);
            }
        }
        assert!(!text.is_empty());
    }
}
