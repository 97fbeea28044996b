use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Risk classifier settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of the scoring service. `None` runs without a classifier,
    /// so every payment receives the fallback score.
    pub url: Option<String>,
    /// Upper bound on one classifier call.
    pub timeout_ms: u64,
    /// Score used when the classifier is unavailable.
    pub fallback_score: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 2_000,
            fallback_score: 0.5,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.timeout_ms == 0 {
            return Err(ClassifierError::Config("timeout_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.fallback_score) {
            return Err(ClassifierError::Config(format!(
                "fallback_score must be within [0, 1], got {}",
                self.fallback_score
            )));
        }
        if let Some(url) = &self.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClassifierError::Config(format!(
                    "url must be http(s), got {url}"
                )));
            }
        }
        Ok(())
    }
}
