use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::form::{ContactForm, ValidForm, ValidationErrors};
use crate::util::{read_limited_text, validate_base_url, BodyError, UrlValidationError};

/// Name of the callable function that emails the site owner.
const FUNCTION_NAME: &str = "sendEmail";
const MAX_RESPONSE_SIZE: usize = 64 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Error categories the relay reports in its error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayErrorKind {
    /// The relay's own validation refused the payload.
    InvalidArgument,
    /// The mail provider failed, or something unexpected happened.
    Internal,
    Other(String),
}

impl RelayErrorKind {
    fn from_status(status: &str) -> Self {
        match status {
            "INVALID_ARGUMENT" => RelayErrorKind::InvalidArgument,
            "INTERNAL" => RelayErrorKind::Internal,
            other => RelayErrorKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RelayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayErrorKind::InvalidArgument => f.write_str("invalid-argument"),
            RelayErrorKind::Internal => f.write_str("internal"),
            RelayErrorKind::Other(status) => write!(f, "{}", status.to_lowercase()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("Relay refused the message ({kind}): {message}")]
    Relay { kind: RelayErrorKind, message: String },
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Unreadable relay response: {0}")]
    Body(#[from] BodyError),
    #[error("Unexpected relay response: {0}")]
    Decode(String),
}

/// Proof of delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The mail provider's id, when it reported one.
    pub message_id: Option<String>,
}

/// What the visitor is told. Causes are never shown, only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Success,
    Failed,
}

impl SubmitStatus {
    pub fn notice(self) -> &'static str {
        match self {
            SubmitStatus::Success => {
                "Tu mensaje ha sido enviado correctamente. ¡Gracias por contactarme!"
            }
            SubmitStatus::Failed => {
                "Hubo un error al enviar el mensaje. Por favor, intenta nuevamente."
            }
        }
    }
}

#[derive(Serialize)]
struct CallRequest<'a> {
    data: &'a ValidForm<'a>,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    #[serde(default)]
    result: Option<SendResult>,
    #[serde(default)]
    error: Option<CallError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallError {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Client for the contact relay's callable HTTP endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl RelayClient {
    /// `functions_base_url` is the functions host, e.g.
    /// `https://us-central1-myproject.cloudfunctions.net`.
    pub fn new(client: reqwest::Client, functions_base_url: &str) -> Result<Self, UrlValidationError> {
        let mut endpoint = validate_base_url(functions_base_url)?;
        if let Ok(mut path) = endpoint.path_segments_mut() {
            path.pop_if_empty().push(FUNCTION_NAME);
        }
        Ok(Self {
            client,
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Validates `form` and, only if it passes, delivers it to the relay.
    pub async fn send(&self, form: &ContactForm) -> Result<Receipt, SendError> {
        let valid = form.validate()?;
        let body = serde_json::to_vec(&CallRequest { data: &valid })
            .map_err(|e| SendError::Decode(e.to_string()))?;

        // Covers the body read as well as the send
        let (status, text) = tokio::time::timeout(self.timeout, self.exchange(body))
            .await
            .map_err(|_| SendError::Timeout)??;

        let (result, error) = match serde_json::from_str::<CallResponse>(&text) {
            Ok(parsed) => (parsed.result, parsed.error),
            Err(_) => (None, None),
        };

        if let Some(error) = error {
            return Err(SendError::Relay {
                kind: RelayErrorKind::from_status(&error.status),
                message: error.message,
            });
        }
        if !status.is_success() {
            return Err(SendError::HttpStatus(status.as_u16()));
        }

        match result {
            Some(SendResult {
                success: true,
                message_id,
            }) => {
                tracing::info!(sender = %valid.name, "Contact message relayed");
                Ok(Receipt { message_id })
            }
            Some(_) => Err(SendError::Decode("relay did not report success".into())),
            None => Err(SendError::Decode("missing result".into())),
        }
    }

    async fn exchange(&self, body: Vec<u8>) -> Result<(reqwest::StatusCode, String), SendError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let text = read_limited_text(response, MAX_RESPONSE_SIZE).await?;
        Ok((status, text))
    }

    /// Sends and collapses the outcome to what the visitor sees.
    pub async fn submit(&self, form: &ContactForm) -> SubmitStatus {
        match self.send(form).await {
            Ok(receipt) => {
                tracing::debug!(message_id = ?receipt.message_id, "Relay receipt");
                SubmitStatus::Success
            }
            Err(SendError::Invalid(errors)) => {
                tracing::debug!(error = %errors, "Contact form rejected locally");
                SubmitStatus::Failed
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send contact message");
                SubmitStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Field;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn good_form() -> ContactForm {
        ContactForm::new(" Ana ", "ana@example.com", "Me encantó tu último post.")
    }

    fn relay(server: &MockServer) -> RelayClient {
        RelayClient::new(reqwest::Client::new(), &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendEmail"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "data": {
                    "name": "Ana",
                    "email": "ana@example.com",
                    "message": "Me encantó tu último post."
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"success": true, "messageId": "re_123"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = relay(&server).send(&good_form()).await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("re_123"));
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = relay(&server);
        let form = ContactForm::new("A", "bad", "short");
        match client.send(&form).await {
            Err(SendError::Invalid(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.get(Field::Email).is_some());
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(client.submit(&form).await, SubmitStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_argument_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendEmail"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"status": "INVALID_ARGUMENT", "message": "Email inválido"}
            })))
            .mount(&server)
            .await;

        let err = relay(&server).send(&good_form()).await.unwrap_err();
        match err {
            SendError::Relay { kind, message } => {
                assert_eq!(kind, RelayErrorKind::InvalidArgument);
                assert_eq!(kind.to_string(), "invalid-argument");
                assert_eq!(message, "Email inválido");
            }
            other => panic!("expected relay error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_internal_failure_collapses_to_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"status": "INTERNAL", "message": "No se pudo enviar el correo en este momento"}
            })))
            .mount(&server)
            .await;

        let client = relay(&server);
        assert!(matches!(
            client.send(&good_form()).await,
            Err(SendError::Relay {
                kind: RelayErrorKind::Internal,
                ..
            })
        ));
        assert_eq!(client.submit(&good_form()).await, SubmitStatus::Failed);
    }

    #[tokio::test]
    async fn test_plain_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = relay(&server).send(&good_form()).await.unwrap_err();
        assert!(matches!(err, SendError::HttpStatus(503)));
    }

    #[tokio::test]
    async fn test_unsuccessful_result_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": {"success": false}})),
            )
            .mount(&server)
            .await;

        let client = relay(&server);
        assert_eq!(client.submit(&good_form()).await, SubmitStatus::Failed);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": {"success": true}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = relay(&server).with_timeout(Duration::from_millis(50));
        assert!(matches!(
            client.send(&good_form()).await,
            Err(SendError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let base = crate::util::stalled_body_server().await;
        let client = RelayClient::new(reqwest::Client::new(), &base)
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        assert!(matches!(
            client.send(&good_form()).await,
            Err(SendError::Timeout)
        ));
    }

    #[test]
    fn test_endpoint_path() {
        let client = RelayClient::new(
            reqwest::Client::new(),
            "https://us-central1-demo.cloudfunctions.net/",
        )
        .unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://us-central1-demo.cloudfunctions.net/sendEmail"
        );
        assert!(RelayClient::new(reqwest::Client::new(), "http://example.com").is_err());
    }

    #[test]
    fn test_notices() {
        assert!(SubmitStatus::Success.notice().starts_with("Tu mensaje"));
        assert!(SubmitStatus::Failed.notice().starts_with("Hubo un error"));
    }
}
