use parking_lot::RwLock;
use log::{debug, warn};
use tokio::process::Command;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;

// @module: Bearer token acquisition for the translation service

/// Supplies the bearer token sent with translation requests
///
/// A configured `api_key` is used as is. Otherwise the token is the trimmed
/// standard output of `auth_command`, run through `sh -c`, and is fetched
/// again whenever the service rejects it.
pub struct AccessTokenProvider {
    // @field: Static token
    api_key: String,

    // @field: Command printing a fresh token
    auth_command: Option<String>,

    // @field: Last token obtained
    current: RwLock<Option<String>>,
}

impl AccessTokenProvider {
    pub fn new(api_key: impl Into<String>, auth_command: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_command,
            current: RwLock::new(None),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(config.api_key.clone(), config.auth_command.clone())
    }

    /// Current token, acquiring one on first use
    pub async fn token(&self) -> Result<String, ProviderError> {
        let cached = self.current.read().clone();
        match cached {
            Some(token) => Ok(token),
            None => self.refresh().await,
        }
    }

    /// Acquire a new token, replacing the current one
    pub async fn refresh(&self) -> Result<String, ProviderError> {
        let token = if !self.api_key.is_empty() {
            self.api_key.clone()
        } else if let Some(command) = &self.auth_command {
            Self::run_auth_command(command).await?
        } else {
            return Err(ProviderError::AuthenticationError(
                "Neither api_key nor auth_command is configured".to_string(),
            ));
        };

        *self.current.write() = Some(token.clone());
        Ok(token)
    }

    async fn run_auth_command(command: &str) -> Result<String, ProviderError> {
        debug!("Refreshing access token with auth command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| ProviderError::AuthenticationError(format!("Failed to run auth command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Auth command exited with {}: {}", output.status, stderr.trim());
            return Err(ProviderError::AuthenticationError(format!(
                "Auth command exited with {}",
                output.status
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ProviderError::AuthenticationError("Auth command printed no token".to_string()));
        }

        Ok(token)
    }
}
