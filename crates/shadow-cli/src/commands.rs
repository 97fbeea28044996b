use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use shadow_risk::{FixedRiskClassifier, FnRiskClassifier, RiskAssessment, RiskGateway, RiskRequest};
use shadow_sdk::{
    AuditBlock, AuditService, PaymentOutcome, PaymentRequest, ShadowConfig, StorageConfig,
    SubmitStatus, TransactionFlags, ValidationReport, VerificationResult,
};
use shadow_seal::StrategyConfig;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Keygen(args) => cmd_keygen(args),
        Command::Submit(args) => cmd_submit(&cli.config, format, args).await,
        Command::Ingest(args) => cmd_ingest(&cli.config, format, args).await,
        Command::Verify(args) => cmd_verify(&cli.config, format, args),
        Command::Blocks(args) => cmd_blocks(&cli.config, format, args),
        Command::Audit => cmd_audit(&cli.config, format),
        Command::Demo(args) => cmd_demo(format, args).await,
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn load_config(path: &Option<std::path::PathBuf>) -> anyhow::Result<ShadowConfig> {
    match path {
        Some(path) => ShadowConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => {
            tracing::warn!("no configuration given, using ephemeral keys and an in-memory ledger");
            Ok(ShadowConfig::generate())
        }
    }
}

fn open_service(config: &ShadowConfig, risk: Option<f64>) -> anyhow::Result<AuditService> {
    let service = AuditService::from_config(config).context("starting audit service")?;
    Ok(match risk {
        Some(score) => {
            service.with_gateway(RiskGateway::with_classifier(Arc::new(FixedRiskClassifier::new(score))))
        }
        None => service,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_keygen(args: KeygenArgs) -> anyhow::Result<()> {
    let config = ShadowConfig {
        strategies: StrategyConfig::generate(args.signers, args.threshold),
        storage: StorageConfig { path: args.ledger },
        ..Default::default()
    };
    config.validate()?;
    let text = config.to_toml_string()?;

    match args.output {
        Some(path) => {
            if path.exists() && !args.force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("{} Wrote configuration to {}", "✓".green().bold(), path.display().to_string().bold());
            println!(
                "  Multisig: {} of {} signers",
                args.threshold.to_string().cyan(),
                args.signers.to_string().cyan()
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

async fn cmd_submit(
    config: &Option<std::path::PathBuf>,
    format: OutputFormat,
    args: SubmitArgs,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let service = open_service(&config, args.risk)?;

    let mut request = PaymentRequest::new(args.from, args.to, args.amount).with_flags(TransactionFlags {
        privacy: args.privacy,
        honeypot: false,
        small_amount_bypass: false,
    });
    if let Some(id) = args.id {
        request = request.with_id(id);
    }
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        request = request.with_location(lat, lon);
    }
    if let Some(ip) = args.ip {
        request = request.with_ip(ip);
    }

    let outcome = service.process_payment(request).await?;
    // Lanes are process-local; seal them before exiting.
    let flushed = service.flush()?;

    match format {
        OutputFormat::Json => print_json(&json!({ "payment": outcome, "flushed": flushed })),
        OutputFormat::Text => {
            print_outcome(&outcome);
            print_flushed(&flushed);
            Ok(())
        }
    }
}

async fn cmd_ingest(
    config: &Option<std::path::PathBuf>,
    format: OutputFormat,
    args: IngestArgs,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let service = open_service(&config, args.risk)?;
    let file = std::fs::File::open(&args.path)
        .with_context(|| format!("opening {}", args.path.display()))?;

    let mut tally = Tally::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let result = match serde_json::from_str::<PaymentRequest>(&line) {
            Ok(request) => service.process_payment(request).await.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };
        match result {
            Ok(outcome) => {
                if format == OutputFormat::Text {
                    print!("{:>5}  ", line_no.to_string().dimmed());
                    print_outcome(&outcome);
                }
                tally.record(&outcome);
            }
            Err(e) if args.fail_fast => {
                service.flush()?;
                return Err(e.context(format!("line {line_no}")));
            }
            Err(e) => {
                if format == OutputFormat::Text {
                    println!("{:>5}  {} {e:#}", line_no.to_string().dimmed(), "✗ error".red());
                }
                tally.failed += 1;
            }
        }
    }
    let flushed = service.flush()?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "accepted": tally.accepted,
            "blocked": tally.blocked,
            "queued": tally.queued,
            "failed": tally.failed,
            "flushed": flushed,
        })),
        OutputFormat::Text => {
            print_flushed(&flushed);
            println!(
                "\n{} accepted, {} blocked, {} queued, {} failed",
                tally.accepted.to_string().green(),
                tally.blocked.to_string().red(),
                tally.queued.to_string().yellow(),
                tally.failed.to_string().dimmed()
            );
            Ok(())
        }
    }
}

fn cmd_verify(
    config: &Option<std::path::PathBuf>,
    format: OutputFormat,
    args: VerifyArgs,
) -> anyhow::Result<()> {
    let service = open_service(&load_config(config)?, None)?;
    let result = service.verify(&args.transaction_id)?;
    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            print_verification(&result);
            Ok(())
        }
    }
}

fn cmd_blocks(
    config: &Option<std::path::PathBuf>,
    format: OutputFormat,
    args: BlocksArgs,
) -> anyhow::Result<()> {
    let service = open_service(&load_config(config)?, None)?;
    let blocks = service.recent_blocks(args.count)?;
    match format {
        OutputFormat::Json => print_json(&blocks),
        OutputFormat::Text => {
            if blocks.is_empty() {
                println!("No blocks sealed.");
            }
            for block in &blocks {
                print_block(block);
            }
            Ok(())
        }
    }
}

fn cmd_audit(config: &Option<std::path::PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let service = open_service(&load_config(config)?, None)?;
    let report = service.validate_chain()?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_valid() {
        bail!("chain validation found {} violation(s)", report.violations.len());
    }
    Ok(())
}

async fn cmd_demo(format: OutputFormat, args: DemoArgs) -> anyhow::Result<()> {
    let mut config = ShadowConfig::generate();
    config.ledger.batch_size = args.batch_size;
    config.accounts.honeypot.insert("TRAP-001".into());
    let service = AuditService::from_config(&config)?.with_gateway(RiskGateway::with_classifier(
        Arc::new(FnRiskClassifier::new(demo_score)),
    ));

    let mut requests: Vec<PaymentRequest> = (0..args.payments)
        .map(|i| {
            PaymentRequest::new(
                format!("ACC-{:03}", i % 7),
                format!("MERCHANT-{}", (b'A' + (i % 5) as u8) as char),
                1_000 + (i as u64 * 3_733) % 90_000,
            )
        })
        .collect();
    requests.push(PaymentRequest::new("ACC-100", "MERCHANT-Z", 77_700));
    requests.push(PaymentRequest::new("ACC-101", "MERCHANT-Z", 2_500_000));
    requests.push(PaymentRequest::new("TRAP-001", "MULE-9", 45_000).with_ip("203.0.113.7"));

    let mut tally = Tally::default();
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        let outcome = service.process_payment(request).await?;
        if format == OutputFormat::Text {
            print_outcome(&outcome);
        }
        tally.record(&outcome);
        outcomes.push(outcome);
    }
    let flushed = service.flush()?;
    let blocks = service.recent_blocks(usize::MAX)?;
    let report = service.validate_chain()?;
    let sample = outcomes
        .iter()
        .find_map(PaymentOutcome::transaction_id)
        .map(|id| service.verify(id.as_str()))
        .transpose()?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "outcomes": outcomes,
            "blocks": blocks,
            "verification": sample,
            "report": report,
        })),
        OutputFormat::Text => {
            print_flushed(&flushed);
            println!("\n{}", "Chain".bold());
            for block in blocks.iter().rev() {
                print_block(block);
            }
            if let Some(result) = &sample {
                println!();
                print_verification(result);
            }
            println!();
            print_report(&report);
            println!(
                "{} accepted, {} blocked, {} queued",
                tally.accepted.to_string().green(),
                tally.blocked.to_string().red(),
                tally.queued.to_string().yellow()
            );
            Ok(())
        }
    }
}

/// Deterministic stand-in for the external classifier.
fn demo_score(request: &RiskRequest) -> RiskAssessment {
    let cents = (request.amount * 100.0) as u64;
    let score = (cents.wrapping_mul(7_919) % 100) as f64 / 100.0;
    let assessment = RiskAssessment::new(score);
    if score > 0.8 {
        assessment.with_reason("velocity spike")
    } else {
        assessment
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tally {
    accepted: usize,
    blocked: usize,
    queued: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: &PaymentOutcome) {
        match outcome {
            PaymentOutcome::Accepted { .. } => self.accepted += 1,
            PaymentOutcome::Blocked { .. } => self.blocked += 1,
            PaymentOutcome::Queued { .. } => self.queued += 1,
        }
    }
}

fn print_outcome(outcome: &PaymentOutcome) {
    match outcome {
        PaymentOutcome::Accepted {
            transaction_id,
            strategy,
            risk_score,
            ledger,
            ..
        } => {
            let status = match ledger {
                SubmitStatus::Pending { lane_depth } => format!("pending, lane depth {lane_depth}"),
                SubmitStatus::Sealed { height } => format!("sealed in block #{height}"),
            };
            println!(
                "{} {} via {} (risk {:.2}, {})",
                "✓".green().bold(),
                transaction_id.as_str().yellow(),
                strategy.cyan(),
                risk_score,
                status
            );
        }
        PaymentOutcome::Blocked {
            reason,
            risk_score,
            reasons,
        } => {
            println!("{} blocked: {} (risk {:.2})", "✗".red().bold(), reason, risk_score);
            for r in reasons {
                println!("    {}", r.dimmed());
            }
        }
        PaymentOutcome::Queued { reference } => {
            println!("{} queued {}", "•".yellow(), reference.dimmed());
        }
    }
}

fn print_flushed(blocks: &[AuditBlock]) {
    if !blocks.is_empty() {
        println!("{} Sealed {} pending block(s) on flush", "✓".green(), blocks.len());
    }
}

fn print_block(block: &AuditBlock) {
    println!(
        "{}  {}  {} tx  prev {}  {}",
        format!("#{}", block.height).yellow().bold(),
        block.merkle_root.short_hex().cyan(),
        block.transaction_count,
        block.previous_block_hash.short_hex().dimmed(),
        block.seal_mode.strategy_name()
    );
}

fn print_verification(result: &VerificationResult) {
    if !result.found {
        if let Some(reason) = &result.seal_failure {
            println!(
                "{} {}: batch failed to seal: {}",
                "✗".red().bold(),
                result.transaction_id.as_str(),
                reason
            );
            return;
        }
        let state = if result.pending { "pending, not yet sealed" } else { "not found" };
        println!("{} {}: {}", "?".yellow().bold(), result.transaction_id.as_str(), state);
        return;
    }
    println!("{} {} sealed", "✓".green().bold(), result.transaction_id.as_str().yellow());
    if let Some(height) = result.block_height {
        println!("  Block: #{height}");
    }
    if let Some(root) = &result.merkle_root {
        println!("  Root: {}", root.to_hex().cyan());
    }
    if let Some(strategy) = &result.strategy_name {
        println!("  Strategy: {strategy}");
    }
    println!(
        "  Proof: {}",
        if result.proof_valid { "valid".green() } else { "invalid".red() }
    );
}

fn print_report(report: &ValidationReport) {
    if report.is_valid() {
        println!(
            "{} Chain valid: {} blocks, {} transactions",
            "✓".green().bold(),
            report.block_count,
            report.transaction_count
        );
        return;
    }
    println!(
        "{} {} violation(s) in {} blocks",
        "✗".red().bold(),
        report.violations.len(),
        report.block_count
    );
    for v in &report.violations {
        println!("  #{} {:?}: {}", v.height, v.kind, v.description);
    }
}
