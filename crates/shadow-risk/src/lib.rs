//! Risk scoring for the Shadow Ledger.
//!
//! The classifier is an external collaborator. [`RiskClassifier`] is the
//! seam; [`HttpRiskClassifier`] talks to a scoring service over HTTP, and
//! [`RiskGateway`] bounds every call with a timeout and substitutes a
//! conservative fallback score when the classifier cannot answer.

pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;

pub use classifier::{
    FixedRiskClassifier, FnRiskClassifier, RiskAssessment, RiskClassifier, RiskRequest,
    UnavailableClassifier,
};
pub use config::ClassifierConfig;
pub use error::ClassifierError;
pub use gateway::{RiskGateway, FALLBACK_REASON};
pub use http::HttpRiskClassifier;
