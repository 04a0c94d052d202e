/*!
 * Machine translation of corpus lines.
 *
 * This module contains the client used by the translate pass to fill rows
 * that no subtitle could be aligned to:
 *
 * - `client`: HTTP client of the translateText service, with bounded retry
 * - `auth`: bearer token acquisition and refresh
 */

use async_trait::async_trait;

use crate::errors::ProviderError;

pub mod auth;
pub mod client;

pub use self::auth::AccessTokenProvider;
pub use self::client::{CloudTranslator, RetryDecision};

/// Translates batches of lines from the source to the target language
///
/// Implementations return exactly one translation per input line, in order.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, lines: &[String]) -> Result<Vec<String>, ProviderError>;
}
