/*!
 * Mock translator for testing
 *
 * Returns predetermined translations without any network access and records
 * every batch it receives.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use subcorpus::errors::ProviderError;
use subcorpus::translation::Translator;

/// Translator answering from a fixed dictionary
#[derive(Debug, Default)]
pub struct MockTranslator {
    /// Known translations; unknown lines are echoed with a marker
    dictionary: HashMap<String, String>,
    /// Batches received, in call order
    calls: Mutex<Vec<Vec<String>>>,
    /// Fail every call
    should_fail: bool,
}

impl MockTranslator {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            dictionary: pairs.iter()
                .map(|(source, target)| (source.to_string(), target.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Batches received so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, lines: &[String]) -> Result<Vec<String>, ProviderError> {
        self.calls.lock().unwrap().push(lines.to_vec());

        if self.should_fail {
            return Err(ProviderError::ApiError {
                status_code: 400,
                message: "Mock translation failure".to_string(),
            });
        }

        Ok(lines.iter()
            .map(|line| {
                self.dictionary.get(line)
                    .cloned()
                    .unwrap_or_else(|| format!("[pt] {}", line))
            })
            .collect())
    }
}
