use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shadow_ledger::LedgerConfig;
use shadow_policy::PolicyThresholds;
use shadow_risk::ClassifierConfig;
use shadow_seal::StrategyConfig;

use crate::accounts::AccountsConfig;
use crate::error::{SdkError, SdkResult};

/// Where blocks are persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Append-only ledger file. `None` keeps the ledger in memory.
    pub path: Option<PathBuf>,
}

/// Complete configuration for an [`AuditService`](crate::AuditService).
///
/// Every section is optional in TOML and falls back to its defaults:
///
/// ```toml
/// [ledger]
/// batch_size = 10
///
/// [policy]
/// high = 0.8
///
/// [strategies]
/// tsa_authority_key = "…64 hex chars…"
/// multisig_signer_keys = ["…", "…", "…"]
/// multisig_threshold = 2
///
/// [classifier]
/// url = "http://localhost:8000"
/// timeout_ms = 2000
///
/// [storage]
/// path = "shadow.ledger"
///
/// [accounts]
/// honeypot = ["TRAP-001"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub ledger: LedgerConfig,
    pub policy: PolicyThresholds,
    pub strategies: StrategyConfig,
    pub classifier: ClassifierConfig,
    pub storage: StorageConfig,
    pub accounts: AccountsConfig,
}

impl ShadowConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.ledger.validate()?;
        self.policy.validate()?;
        self.strategies.validate()?;
        self.classifier.validate()?;
        Ok(())
    }

    /// Defaults plus freshly generated signing keys (2-of-3 multisig).
    pub fn generate() -> Self {
        Self {
            strategies: StrategyConfig::generate(3, 2),
            ..Default::default()
        }
    }
}
