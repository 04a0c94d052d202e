use async_trait::async_trait;
use reqwest::header::{ACCEPT_CHARSET, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use log::{debug, error, warn};

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::language_utils;

use super::auth::AccessTokenProvider;
use super::Translator;

/// Request body of the translateText call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    source_language_code: &'a str,
    target_language_code: &'a str,
    contents: &'a [String],
}

/// Response body of the translateText call
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back off exponentially, then try again
    Retry,
    /// Fetch a new token, then try again
    Reauthenticate,
    /// The service is unreachable; wait for the network, then try again
    WaitForNetwork,
    /// Give up
    Fatal,
}

impl RetryDecision {
    /// Decision for a non-success HTTP status
    pub fn for_status(status: StatusCode) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::Reauthenticate
        } else if status.is_server_error() {
            Self::Retry
        } else {
            Self::Fatal
        }
    }
}

/// Why a single attempt failed
#[derive(Debug)]
enum AttemptFailure {
    Status { status: StatusCode, body: String },
    Connect(String),
    Network(String),
    EmptyBody,
    Decode(String),
}

impl AttemptFailure {
    fn decision(&self) -> RetryDecision {
        match self {
            Self::Status { status, .. } => RetryDecision::for_status(*status),
            Self::Connect(_) => RetryDecision::WaitForNetwork,
            Self::Network(_) | Self::EmptyBody => RetryDecision::Retry,
            Self::Decode(_) => RetryDecision::Fatal,
        }
    }

    fn into_provider_error(self) -> ProviderError {
        match self {
            Self::Status { status, body } if status == StatusCode::UNAUTHORIZED => {
                ProviderError::AuthenticationError(body)
            }
            Self::Status { status, body } => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            },
            Self::Connect(message) => ProviderError::ConnectionError(message),
            Self::Network(message) => ProviderError::RequestFailed(message),
            Self::EmptyBody => ProviderError::ParseError("Empty response body".to_string()),
            Self::Decode(message) => ProviderError::ParseError(message),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Connect(message) => write!(f, "cannot connect: {}", message),
            Self::Network(message) => write!(f, "network error: {}", message),
            Self::EmptyBody => write!(f, "empty response body"),
            Self::Decode(message) => write!(f, "undecodable response: {}", message),
        }
    }
}

/// Client of a translateText HTTP endpoint
pub struct CloudTranslator {
    /// HTTP client for making requests
    client: Client,
    /// URL of the translateText call
    endpoint: String,
    source_language_code: String,
    target_language_code: String,
    /// Bearer token source
    auth: AccessTokenProvider,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Pause when the service cannot be reached
    offline_wait: Duration,
}

impl CloudTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            source_language_code: service_language_code(&config.source_language_code),
            target_language_code: service_language_code(&config.target_language_code),
            auth: AccessTokenProvider::from_config(config),
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
            offline_wait: Duration::from_secs(config.offline_wait_secs),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, token: &str, lines: &[String]) -> Result<Vec<String>, AttemptFailure> {
        let request = TranslateRequest {
            source_language_code: &self.source_language_code,
            target_language_code: &self.target_language_code,
            contents: lines,
        };

        let response = self.client.post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_CHARSET, "utf-8")
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AttemptFailure::Connect(e.to_string())
                } else {
                    AttemptFailure::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(AttemptFailure::Status { status, body });
        }

        let body = response.text().await
            .map_err(|e| AttemptFailure::Network(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(AttemptFailure::EmptyBody);
        }

        let parsed: TranslateResponse = serde_json::from_str(&body)
            .map_err(|e| AttemptFailure::Decode(e.to_string()))?;

        Ok(parsed.translations.into_iter().map(|t| t.translated_text).collect())
    }
}

#[async_trait]
impl Translator for CloudTranslator {
    async fn translate(&self, lines: &[String]) -> Result<Vec<String>, ProviderError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let attempts = self.max_retries.saturating_add(1);
        let mut attempt = 0;
        let mut last_error = String::new();

        while attempt < attempts {
            let token = self.auth.token().await?;
            debug!("Sending {} lines to {} (attempt {}/{})", lines.len(), self.endpoint, attempt + 1, attempts);

            let failure = match self.send(&token, lines).await {
                Ok(translations) if translations.len() == lines.len() => return Ok(translations),
                Ok(translations) => {
                    return Err(ProviderError::ParseError(format!(
                        "Expected {} translations, received {}",
                        lines.len(),
                        translations.len()
                    )));
                }
                Err(failure) => failure,
            };

            error!("Translation request failed: {} - attempt {}/{}", failure, attempt + 1, attempts);
            last_error = failure.to_string();
            attempt += 1;
            let more_attempts = attempt < attempts;

            match failure.decision() {
                RetryDecision::Fatal => return Err(failure.into_provider_error()),
                RetryDecision::Reauthenticate => {
                    self.auth.refresh().await?;
                }
                RetryDecision::WaitForNetwork if more_attempts => {
                    warn!("Translation service unreachable, waiting {:?}", self.offline_wait);
                    tokio::time::sleep(self.offline_wait).await;
                }
                RetryDecision::Retry if more_attempts => {
                    tokio::time::sleep(backoff_delay(self.backoff_base_ms, attempt)).await;
                }
                _ => {}
            }
        }

        Err(ProviderError::RetriesExhausted {
            attempts,
            message: last_error,
        })
    }
}

/// Pause before retry `attempt` (1-based): the base doubled per earlier attempt, saturating
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Two-letter code where one exists, as the service expects
fn service_language_code(code: &str) -> String {
    language_utils::normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.to_string())
}
