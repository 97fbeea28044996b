use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::classifier::{RiskAssessment, RiskClassifier, RiskRequest};
use crate::error::ClassifierError;

/// Classifier backed by an HTTP scoring service.
///
/// Sends `POST {base_url}/analyze` with a [`RiskRequest`] body and expects a
/// JSON object carrying at least a `score` field.
#[derive(Clone, Debug)]
pub struct HttpRiskClassifier {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpRiskClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Config(e.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/analyze", base_url.trim_end_matches('/')),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RiskClassifier for HttpRiskClassifier {
    async fn classify(&self, request: &RiskRequest) -> Result<RiskAssessment, ClassifierError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let assessment: RiskAssessment = response
            .json()
            .await
            .map_err(|e| ClassifierError::Decode(e.to_string()))?;
        if !assessment.score.is_finite() {
            return Err(ClassifierError::Decode(format!(
                "score is not finite: {}",
                assessment.score
            )));
        }
        debug!(score = assessment.score, from = %request.from_account, "classifier answered");
        Ok(assessment)
    }
}
