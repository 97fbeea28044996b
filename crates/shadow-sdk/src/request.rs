use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shadow_ledger::SubmitStatus;
use shadow_policy::{BlockReason, TransactionFlags};
use shadow_risk::RiskRequest;
use shadow_types::{SealMode, TransactionId};

/// An inbound payment to be scored and audited.
///
/// `amount` is in minor currency units. A missing `transactionId` gets a
/// fresh time-ordered id; a missing `timestamp` is the time of processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(alias = "fromAccount")]
    pub account_id: String,
    pub to_account: String,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub flags: TransactionFlags,
}

impl PaymentRequest {
    pub fn new(account_id: impl Into<String>, to_account: impl Into<String>, amount: u64) -> Self {
        Self {
            transaction_id: None,
            account_id: account_id.into(),
            to_account: to_account.into(),
            amount,
            timestamp: None,
            current_lat: None,
            current_lon: None,
            ip_address: None,
            flags: TransactionFlags::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.current_lat = Some(lat);
        self.current_lon = Some(lon);
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_flags(mut self, flags: TransactionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The classifier's view of this payment.
    pub fn risk_request(&self) -> RiskRequest {
        let mut request = RiskRequest::new(&self.account_id, &self.to_account, self.amount);
        if let (Some(lat), Some(lon)) = (self.current_lat, self.current_lon) {
            request = request.with_location(lat, lon);
        }
        if let Some(ip) = &self.ip_address {
            request = request.with_ip(ip);
        }
        request
    }
}

/// What happened to a payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Submitted to the ledger under `mode`.
    Accepted {
        transaction_id: TransactionId,
        mode: SealMode,
        strategy: String,
        risk_score: f64,
        reasons: Vec<String>,
        ledger: SubmitStatus,
    },
    /// Refused by policy.
    Blocked {
        reason: BlockReason,
        risk_score: f64,
        reasons: Vec<String>,
    },
    /// Reported as queued but never processed.
    Queued { reference: String },
}

impl PaymentOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PaymentOutcome::Accepted { .. })
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            PaymentOutcome::Accepted { transaction_id, .. } => Some(transaction_id),
            _ => None,
        }
    }
}
