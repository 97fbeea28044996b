use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::classifier::{RiskAssessment, RiskClassifier, RiskRequest, UnavailableClassifier};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::http::HttpRiskClassifier;

/// Reason attached to assessments produced without the classifier.
pub const FALLBACK_REASON: &str = "CLASSIFIER_OFFLINE_FALLBACK";

/// Bounded access to a [`RiskClassifier`].
///
/// [`assess`](Self::assess) never fails: a timeout or classifier error
/// yields the fallback score, and every score is clamped into `[0, 1]`.
#[derive(Clone)]
pub struct RiskGateway {
    classifier: Arc<dyn RiskClassifier>,
    timeout: Duration,
    fallback_score: f64,
}

impl RiskGateway {
    pub fn new(classifier: Arc<dyn RiskClassifier>, timeout: Duration, fallback_score: f64) -> Self {
        Self {
            classifier,
            timeout,
            fallback_score: fallback_score.clamp(0.0, 1.0),
        }
    }

    /// Build the HTTP classifier named in `config`, or an unavailable one
    /// when no URL is set.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let classifier: Arc<dyn RiskClassifier> = match &config.url {
            Some(url) => Arc::new(HttpRiskClassifier::new(url, timeout)?),
            None => Arc::new(UnavailableClassifier),
        };
        Ok(Self::new(classifier, timeout, config.fallback_score))
    }

    pub fn with_classifier(classifier: Arc<dyn RiskClassifier>) -> Self {
        let defaults = ClassifierConfig::default();
        Self::new(
            classifier,
            Duration::from_millis(defaults.timeout_ms),
            defaults.fallback_score,
        )
    }

    pub fn fallback_score(&self) -> f64 {
        self.fallback_score
    }

    pub async fn assess(&self, request: &RiskRequest) -> RiskAssessment {
        let outcome = match tokio::time::timeout(self.timeout, self.classifier.classify(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(mut assessment) => {
                assessment.score = if assessment.score.is_nan() {
                    1.0
                } else {
                    assessment.score.clamp(0.0, 1.0)
                };
                debug!(score = assessment.score, "risk assessed");
                assessment
            }
            Err(e) => {
                warn!(error = %e, fallback = self.fallback_score, "classifier unavailable, using fallback score");
                RiskAssessment::new(self.fallback_score).with_reason(FALLBACK_REASON)
            }
        }
    }
}

impl std::fmt::Debug for RiskGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskGateway")
            .field("timeout", &self.timeout)
            .field("fallback_score", &self.fallback_score)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FixedRiskClassifier;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Stalled;

    #[async_trait]
    impl RiskClassifier for Stalled {
        async fn classify(&self, _: &RiskRequest) -> Result<RiskAssessment, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RiskAssessment::new(0.0))
        }
    }

    fn request() -> RiskRequest {
        RiskRequest::new("ACC-1", "MERCHANT-A", 10_000)
    }

    #[tokio::test]
    async fn passes_through_classifier_score() {
        let gateway = RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(0.3)));
        let assessment = gateway.assess(&request()).await;
        assert_eq!(assessment.score, 0.3);
        assert!(assessment.reasons.is_empty());
    }

    #[tokio::test]
    async fn clamps_out_of_range_scores() {
        let high = RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(3.0)));
        let low = RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(-1.0)));
        let nan = RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(f64::NAN)));
        assert_eq!(high.assess(&request()).await.score, 1.0);
        assert_eq!(low.assess(&request()).await.score, 0.0);
        assert_eq!(nan.assess(&request()).await.score, 1.0);
    }

    #[tokio::test]
    async fn error_uses_fallback() {
        let gateway = RiskGateway::with_classifier(Arc::new(UnavailableClassifier));
        let assessment = gateway.assess(&request()).await;
        assert_eq!(assessment.score, 0.5);
        assert_eq!(assessment.reasons, vec![FALLBACK_REASON]);
    }

    #[tokio::test]
    async fn timeout_uses_fallback() {
        let gateway = RiskGateway::new(Arc::new(Stalled), Duration::from_millis(100), 0.6);
        let assessment = gateway.assess(&request()).await;
        assert_eq!(assessment.score, 0.6);
        assert_eq!(assessment.reasons, vec![FALLBACK_REASON]);
    }

    #[tokio::test]
    async fn from_config_without_url_always_falls_back() {
        let gateway = RiskGateway::from_config(&ClassifierConfig::default()).unwrap();
        assert_eq!(gateway.assess(&request()).await.reasons, vec![FALLBACK_REASON]);
    }

    #[tokio::test]
    async fn from_config_reaches_http_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 0.91})))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClassifierConfig {
            url: Some(server.uri()),
            ..Default::default()
        };
        let gateway = RiskGateway::from_config(&config).unwrap();
        assert_eq!(gateway.assess(&request()).await.score, 0.91);
    }

    #[tokio::test]
    async fn slow_http_service_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"score": 0.1}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = ClassifierConfig {
            url: Some(server.uri()),
            timeout_ms: 50,
            fallback_score: 0.5,
        };
        let gateway = RiskGateway::from_config(&config).unwrap();
        let assessment = gateway.assess(&request()).await;
        assert_eq!(assessment.score, 0.5);
        assert_eq!(assessment.reasons, vec![FALLBACK_REASON]);
    }
}
