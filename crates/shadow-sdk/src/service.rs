use std::sync::Arc;

use chrono::Utc;
use shadow_ledger::{LedgerChain, ValidationReport, VerificationResult};
use shadow_policy::{BlockReason, PolicyDecision, PolicyEngine};
use shadow_risk::{RiskAssessment, RiskGateway};
use shadow_seal::StrategySet;
use shadow_store::{AuditStore, FileAuditStore, InMemoryAuditStore};
use shadow_types::{AuditBlock, SealMode, TransactionEvent, TransactionId};
use tracing::{info, warn};

use crate::accounts::AccountsConfig;
use crate::config::ShadowConfig;
use crate::error::{SdkError, SdkResult};
use crate::request::{PaymentOutcome, PaymentRequest};

/// The payment audit pipeline.
///
/// Each payment is validated, scored through the [`RiskGateway`], routed
/// by the [`PolicyEngine`], and, unless blocked, submitted to the ledger.
/// Ledger submission can wait on the seal lock and on storage, so it runs
/// on the blocking thread pool.
pub struct AuditService {
    ledger: Arc<LedgerChain>,
    gateway: RiskGateway,
    policy: PolicyEngine,
    accounts: AccountsConfig,
}

impl AuditService {
    pub fn new(
        ledger: LedgerChain,
        gateway: RiskGateway,
        policy: PolicyEngine,
        accounts: AccountsConfig,
    ) -> Self {
        Self {
            ledger: Arc::new(ledger),
            gateway,
            policy,
            accounts,
        }
    }

    /// Wire every subsystem from `config`.
    pub fn from_config(config: &ShadowConfig) -> SdkResult<Self> {
        config.validate()?;
        let store: Arc<dyn AuditStore> = match &config.storage.path {
            Some(path) => Arc::new(FileAuditStore::open(path)?),
            None => Arc::new(InMemoryAuditStore::new()),
        };
        let strategies = StrategySet::from_config(&config.strategies)?;
        let ledger = LedgerChain::new(config.ledger.clone(), strategies, store)?;
        let gateway = RiskGateway::from_config(&config.classifier)?;
        let policy = PolicyEngine::new(config.policy.clone())?;
        Ok(Self::new(ledger, gateway, policy, config.accounts.clone()))
    }

    /// Replace the risk gateway.
    pub fn with_gateway(mut self, gateway: RiskGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn ledger(&self) -> &LedgerChain {
        &self.ledger
    }

    pub async fn process_payment(&self, request: PaymentRequest) -> SdkResult<PaymentOutcome> {
        info!(from = %request.account_id, amount = request.amount, "processing payment");

        let id = request
            .transaction_id
            .clone()
            .map(TransactionId::new)
            .unwrap_or_else(TransactionId::generate);
        let event = TransactionEvent::new(
            id,
            request.account_id.as_str(),
            request.to_account.as_str(),
            request.amount,
            request.timestamp.unwrap_or_else(Utc::now),
        )?;
        let flags = self.accounts.flags_for(&request.account_id, request.flags);

        // Trap accounts never reach the classifier.
        let assessment = if flags.honeypot {
            RiskAssessment::new(0.0)
        } else {
            self.gateway.assess(&request.risk_request()).await
        };

        match self.policy.decide(assessment.score, request.amount, &flags) {
            PolicyDecision::Block(BlockReason::Honeypot) => {
                warn!(
                    account = %request.account_id,
                    ip = request.ip_address.as_deref().unwrap_or("unknown"),
                    "honeypot triggered"
                );
                Ok(PaymentOutcome::Queued {
                    reference: format!("HP-{}", Utc::now().timestamp_millis()),
                })
            }
            PolicyDecision::Block(reason) => {
                warn!(
                    account = %request.account_id,
                    score = assessment.score,
                    %reason,
                    "payment blocked"
                );
                Ok(PaymentOutcome::Blocked {
                    reason,
                    risk_score: assessment.score,
                    reasons: assessment.reasons,
                })
            }
            PolicyDecision::Seal(mode) => {
                let ledger = Arc::clone(&self.ledger);
                let ack = tokio::task::spawn_blocking(move || ledger.submit(event, mode))
                    .await
                    .map_err(|e| SdkError::Join(format!("ledger submit: {e}")))??;
                Ok(PaymentOutcome::Accepted {
                    transaction_id: ack.transaction_id,
                    mode,
                    strategy: mode.strategy_name().to_string(),
                    risk_score: assessment.score,
                    reasons: assessment.reasons,
                    ledger: ack.status,
                })
            }
        }
    }

    pub fn verify(&self, transaction_id: &str) -> SdkResult<VerificationResult> {
        Ok(self.ledger.verify(&TransactionId::new(transaction_id))?)
    }

    pub fn recent_blocks(&self, n: usize) -> SdkResult<Vec<AuditBlock>> {
        Ok(self.ledger.recent_blocks(n)?)
    }

    /// Seal every non-empty lane.
    pub fn flush(&self) -> SdkResult<Vec<AuditBlock>> {
        Ok(self.ledger.flush()?)
    }

    pub fn pending(&self) -> SdkResult<Vec<(SealMode, usize)>> {
        Ok(self.ledger.pending()?)
    }

    pub fn validate_chain(&self) -> SdkResult<ValidationReport> {
        Ok(self.ledger.validate_chain()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_ledger::{LedgerConfig, LedgerError, SubmitStatus};
    use shadow_store::StoreResult;
    use shadow_types::TransactionWitness;
    use std::sync::Mutex;
    use std::thread::ThreadId;
    use shadow_policy::TransactionFlags;
    use shadow_risk::{
        FixedRiskClassifier, FnRiskClassifier, RiskRequest, UnavailableClassifier, FALLBACK_REASON,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service_with(score: f64, batch_size: usize) -> AuditService {
        let mut config = ShadowConfig::generate();
        config.ledger.batch_size = batch_size;
        AuditService::from_config(&config)
            .unwrap()
            .with_gateway(RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(score))))
    }

    fn mode_of(outcome: &PaymentOutcome) -> SealMode {
        match outcome {
            PaymentOutcome::Accepted { mode, .. } => *mode,
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_risk_is_merkle_batched() {
        let service = service_with(0.05, 10);
        let outcome = service
            .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000))
            .await
            .unwrap();
        assert_eq!(mode_of(&outcome), SealMode::Merkle);
        match outcome {
            PaymentOutcome::Accepted { ledger, strategy, .. } => {
                assert_eq!(ledger, SubmitStatus::Pending { lane_depth: 1 });
                assert_eq!(strategy, "MERKLE");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn routes_by_risk_and_amount() {
        let tsa = service_with(0.3, 10);
        let multisig = service_with(0.6, 10);
        let calm = service_with(0.0, 10);

        let request = || PaymentRequest::new("ACC-1", "MERCHANT-A", 10_000);
        assert_eq!(
            mode_of(&tsa.process_payment(request()).await.unwrap()),
            SealMode::TimestampAuthority
        );
        assert_eq!(
            mode_of(&multisig.process_payment(request()).await.unwrap()),
            SealMode::MultiSignature
        );
        assert_eq!(
            mode_of(
                &calm
                    .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 2_000_000))
                    .await
                    .unwrap()
            ),
            SealMode::MultiSignature
        );
        assert_eq!(
            mode_of(
                &calm
                    .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 77_700))
                    .await
                    .unwrap()
            ),
            SealMode::ZeroKnowledge
        );
    }

    #[tokio::test]
    async fn small_amount_bypass_needs_listed_account_and_small_amount() {
        let mut config = ShadowConfig::generate();
        config.accounts.small_amount_bypass.insert("KIOSK-1".into());
        let service = AuditService::from_config(&config)
            .unwrap()
            .with_gateway(RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(0.0))));

        let small = PaymentRequest::new("KIOSK-1", "MERCHANT-A", 100);
        assert_eq!(mode_of(&service.process_payment(small).await.unwrap()), SealMode::Simple);

        let over_limit = PaymentRequest::new("KIOSK-1", "MERCHANT-A", 500_000);
        assert_eq!(
            mode_of(&service.process_payment(over_limit).await.unwrap()),
            SealMode::Merkle
        );

        let self_granted = PaymentRequest::new("ACC-1", "MERCHANT-A", 100).with_flags(TransactionFlags {
            small_amount_bypass: true,
            ..Default::default()
        });
        assert_eq!(
            mode_of(&service.process_payment(self_granted).await.unwrap()),
            SealMode::Merkle
        );
    }

    /// In-memory store that remembers which thread committed last.
    #[derive(Default)]
    struct CommitThread {
        inner: InMemoryAuditStore,
        committed_on: Mutex<Option<ThreadId>>,
    }

    impl AuditStore for CommitThread {
        fn commit_block(&self, block: &AuditBlock, witnesses: &[TransactionWitness]) -> StoreResult<()> {
            *self.committed_on.lock().unwrap() = Some(std::thread::current().id());
            self.inner.commit_block(block, witnesses)
        }
        fn latest_block(&self) -> StoreResult<Option<AuditBlock>> {
            self.inner.latest_block()
        }
        fn block(&self, height: u64) -> StoreResult<Option<AuditBlock>> {
            self.inner.block(height)
        }
        fn recent_blocks(&self, n: usize) -> StoreResult<Vec<AuditBlock>> {
            self.inner.recent_blocks(n)
        }
        fn witness(&self, id: &TransactionId) -> StoreResult<Option<TransactionWitness>> {
            self.inner.witness(id)
        }
        fn witnesses_for_block(&self, height: u64) -> StoreResult<Vec<TransactionWitness>> {
            self.inner.witnesses_for_block(height)
        }
        fn block_count(&self) -> StoreResult<u64> {
            self.inner.block_count()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ledger_submission_runs_off_the_runtime_thread() {
        let store = Arc::new(CommitThread::default());
        let ledger = LedgerChain::new(
            LedgerConfig::with_batch_size(1),
            StrategySet::ephemeral(),
            store.clone(),
        )
        .unwrap();
        let service = AuditService::new(
            ledger,
            RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(0.0))),
            PolicyEngine::default(),
            AccountsConfig::default(),
        );

        let outcome = service
            .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000))
            .await
            .unwrap();
        match outcome {
            PaymentOutcome::Accepted { ledger, .. } => {
                assert_eq!(ledger, SubmitStatus::Sealed { height: 1 })
            }
            other => panic!("unexpected {other:?}"),
        }
        let committed_on = store.committed_on.lock().unwrap().expect("block committed");
        assert_ne!(committed_on, std::thread::current().id());
    }

    #[tokio::test]
    async fn high_risk_is_blocked_and_not_buffered() {
        let service = service_with(0.95, 10);
        let outcome = service
            .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PaymentOutcome::Blocked {
                reason: BlockReason::HighRisk,
                ..
            }
        ));
        assert!(service.pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn honeypot_is_silently_queued_without_scoring() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let classifier = FnRiskClassifier::new(move |_: &RiskRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            RiskAssessment::new(0.0)
        });

        let mut config = ShadowConfig::generate();
        config.accounts.honeypot.insert("TRAP-1".into());
        let service = AuditService::from_config(&config)
            .unwrap()
            .with_gateway(RiskGateway::with_classifier(Arc::new(classifier)));

        let outcome = service
            .process_payment(PaymentRequest::new("TRAP-1", "MULE-9", 5_000).with_ip("203.0.113.7"))
            .await
            .unwrap();
        match outcome {
            PaymentOutcome::Queued { reference } => assert!(reference.starts_with("HP-")),
            other => panic!("expected silent queue, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(service.pending().unwrap().is_empty());
        assert!(service.flush().unwrap().is_empty());
    }

    #[tokio::test]
    async fn classifier_outage_uses_fallback_score() {
        let service = service_with(0.0, 10)
            .with_gateway(RiskGateway::with_classifier(Arc::new(UnavailableClassifier)));
        let outcome = service
            .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000))
            .await
            .unwrap();
        match outcome {
            PaymentOutcome::Accepted {
                mode,
                risk_score,
                reasons,
                ..
            } => {
                assert_eq!(mode, SealMode::TimestampAuthority);
                assert_eq!(risk_score, 0.5);
                assert_eq!(reasons, vec![FALLBACK_REASON]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn sealed_payment_verifies() {
        let service = service_with(0.1, 1);
        let outcome = service
            .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000).with_id("pay-1"))
            .await
            .unwrap();
        assert_eq!(outcome.transaction_id().map(|id| id.as_str()), Some("pay-1"));

        let result = service.verify("pay-1").unwrap();
        assert!(result.found);
        assert!(result.proof_valid);
        assert_eq!(result.block_height, Some(1));
        assert!(service.validate_chain().unwrap().is_valid());
        assert!(!service.verify("pay-2").unwrap().found);
    }

    #[tokio::test]
    async fn rejects_invalid_and_duplicate_payments() {
        let service = service_with(0.1, 10);
        assert!(matches!(
            service
                .process_payment(PaymentRequest::new("ACC-1", "ACC-1", 5_000))
                .await,
            Err(SdkError::Validation(_))
        ));

        let request = PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000).with_id("dup");
        service.process_payment(request.clone()).await.unwrap();
        assert!(matches!(
            service.process_payment(request).await,
            Err(SdkError::Ledger(LedgerError::DuplicateTransaction(_)))
        ));
    }

    #[tokio::test]
    async fn missing_keys_refuse_instead_of_degrading() {
        let service = AuditService::from_config(&ShadowConfig::default())
            .unwrap()
            .with_gateway(RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(0.3))));
        assert!(matches!(
            service
                .process_payment(PaymentRequest::new("ACC-1", "MERCHANT-A", 5_000))
                .await,
            Err(SdkError::Ledger(LedgerError::StrategyUnavailable {
                mode: SealMode::TimestampAuthority,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn file_backed_service_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ShadowConfig::generate();
        config.ledger.batch_size = 2;
        config.storage.path = Some(dir.path().join("shadow.ledger"));

        {
            let service = AuditService::from_config(&config)
                .unwrap()
                .with_gateway(RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(0.0))));
            for i in 0..4 {
                service
                    .process_payment(
                        PaymentRequest::new("ACC-1", "MERCHANT-A", 1_000).with_id(format!("p-{i}")),
                    )
                    .await
                    .unwrap();
            }
        }

        let reopened = AuditService::from_config(&config).unwrap();
        assert_eq!(reopened.recent_blocks(10).unwrap().len(), 2);
        assert!(reopened.verify("p-3").unwrap().found);
        assert!(reopened.validate_chain().unwrap().is_valid());
    }
}
