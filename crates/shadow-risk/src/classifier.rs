use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Payload sent to the classifier.
///
/// `amount` is in major currency units, as the scoring service expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRequest {
    pub from_account: String,
    pub to_account: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl RiskRequest {
    /// Build a request from an amount in minor units.
    pub fn new(from_account: impl Into<String>, to_account: impl Into<String>, amount_minor: u64) -> Self {
        Self {
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount: amount_minor as f64 / 100.0,
            lat: None,
            lon: None,
            ip: None,
        }
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }
}

/// Classifier verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl RiskAssessment {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            reasons: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// Opaque risk scoring function.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn classify(&self, request: &RiskRequest) -> Result<RiskAssessment, ClassifierError>;
}

/// Always returns the same assessment.
#[derive(Clone, Debug)]
pub struct FixedRiskClassifier {
    assessment: RiskAssessment,
}

impl FixedRiskClassifier {
    pub fn new(score: f64) -> Self {
        Self {
            assessment: RiskAssessment::new(score),
        }
    }
}

#[async_trait]
impl RiskClassifier for FixedRiskClassifier {
    async fn classify(&self, _request: &RiskRequest) -> Result<RiskAssessment, ClassifierError> {
        Ok(self.assessment.clone())
    }
}

/// Scores each request with a local function.
pub struct FnRiskClassifier<F> {
    score: F,
}

impl<F> FnRiskClassifier<F>
where
    F: Fn(&RiskRequest) -> RiskAssessment + Send + Sync,
{
    pub fn new(score: F) -> Self {
        Self { score }
    }
}

#[async_trait]
impl<F> RiskClassifier for FnRiskClassifier<F>
where
    F: Fn(&RiskRequest) -> RiskAssessment + Send + Sync,
{
    async fn classify(&self, request: &RiskRequest) -> Result<RiskAssessment, ClassifierError> {
        Ok((self.score)(request))
    }
}

/// A classifier that is never reachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableClassifier;

#[async_trait]
impl RiskClassifier for UnavailableClassifier {
    async fn classify(&self, _request: &RiskRequest) -> Result<RiskAssessment, ClassifierError> {
        Err(ClassifierError::Unavailable("no classifier configured".into()))
    }
}
