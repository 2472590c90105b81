//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, SignalJson, StageResponse};
use crate::config::AppConfig;
use crate::jobs;
use crate::pipeline::{ObservationInput, ObservationKind, process_observation};
use infrawatch_core::{
    InfrawatchError, MetricSnapshot, MetricStore, SignalDetector, StageClassifier, StageResult,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum file size for snapshot classification input (1 MB).
///
/// A metric snapshot is a handful of numbers; anything larger is a
/// mistake or an attack.
const MAX_SNAPSHOT_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), InfrawatchError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| InfrawatchError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(InfrawatchError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Open the store, creating the file on first use.
fn open_store(db_path: &PathBuf) -> Result<MetricStore, InfrawatchError> {
    MetricStore::open(db_path)
}

/// Evaluators configured from an optional config file.
fn build_evaluators(
    config_path: Option<&Path>,
) -> Result<(AppConfig, StageClassifier, SignalDetector), InfrawatchError> {
    let config = AppConfig::load_or_default(config_path)?;
    let classifier = StageClassifier::with_thresholds(config.stage_thresholds());
    let detector = SignalDetector::with_thresholds(config.signal_thresholds());
    Ok((config, classifier, detector))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), InfrawatchError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| InfrawatchError::SerializationError(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &PathBuf,
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), InfrawatchError> {
    let (config, classifier, detector) = build_evaluators(config_path)?;

    let db_path = config.database.clone().unwrap_or_else(|| db_path.clone());
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let store = open_store(&db_path)?;
    let state = AppState::with_evaluators(store, classifier, detector);

    println!("Infrawatch Monitor Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Database: {:?}", db_path);
    if config.evaluation_interval_secs > 0 {
        println!(
            "  Evaluation interval: {}s",
            config.evaluation_interval_secs
        );
    } else {
        println!("  Evaluation interval: disabled");
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /health        - Health check");
    println!("  GET  /status        - Store status");
    println!("  GET  /stage/current - Classify and record current stage");
    println!("  GET  /stage/history - Stage history");
    println!("  POST /classify      - Classify a posted snapshot");
    println!("  POST /observations  - Ingest a metric observation");
    println!("  GET  /signals       - List signals");
    println!("  POST /signals/read  - Acknowledge a signal");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    if config.evaluation_interval_secs > 0 {
        let _evaluation = jobs::spawn_evaluation_loop(state.clone(), config.evaluation_interval_secs);
    }

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(db_path: &PathBuf, json_mode: bool) -> Result<(), InfrawatchError> {
    let store = open_store(db_path)?;

    let observations = store.observation_count()?;
    let stage_snapshots = store.stage_count()?;
    let signals_total = store.signal_count()?;
    let signals_unread = store.unread_count()?;
    let latest_stage = store.latest_stage()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "observations": observations,
            "stage_snapshots": stage_snapshots,
            "signals_total": signals_total,
            "signals_unread": signals_unread,
            "latest_stage": latest_stage.as_ref().map(|r| format!("{:?}", r.stage)),
        }));
    }

    println!("Store Status:");
    println!("  Observations:    {}", observations);
    println!("  Stage snapshots: {}", stage_snapshots);
    println!("  Signals:         {} ({} unread)", signals_total, signals_unread);
    match latest_stage {
        Some(result) => println!("  Latest stage:    {}", result.stage),
        None => println!("  Latest stage:    (none recorded)"),
    }
    Ok(())
}

// =============================================================================
// STAGE COMMAND
// =============================================================================

/// Classify the stored snapshot and print the result.
pub fn cmd_stage(
    db_path: &PathBuf,
    config_path: Option<&Path>,
    json_mode: bool,
    detailed: bool,
    record: bool,
) -> Result<(), InfrawatchError> {
    let (_, classifier, _) = build_evaluators(config_path)?;
    let store = open_store(db_path)?;

    let snapshot = store.load_snapshot()?;
    if snapshot.is_empty() {
        println!("No observations stored yet; classifying an empty snapshot.");
    }

    let result = classifier.determine(&snapshot);
    if record {
        store.append_stage(&result)?;
    }

    print_stage_result(&result, json_mode, detailed)
}

/// Render a stage determination.
fn print_stage_result(
    result: &StageResult,
    json_mode: bool,
    detailed: bool,
) -> Result<(), InfrawatchError> {
    if json_mode {
        return print_json(&StageResponse::from(result));
    }

    println!("Stage Determination:");
    println!("  Stage:      {}", result.stage);
    println!("  Confidence: {}", result.confidence);
    println!("  Rationale:  {}", result.rationale);

    if detailed {
        println!();
        println!("Trigger conditions:");
        for (name, met) in &result.trigger_conditions {
            println!("  {:20} {}", name, if *met { "yes" } else { "no" });
        }

        if !result.transition_risks.is_empty() {
            println!();
            println!("Transition risks:");
            for (stage, risk) in &result.transition_risks {
                let gap = risk
                    .gap
                    .map(|g| format!(", m01 needed: {:.2}", g.m01_needed))
                    .unwrap_or_default();
                println!(
                    "  to {:?}: {} ({}/{} conditions{})",
                    stage,
                    risk.probability.as_str(),
                    risk.conditions_met,
                    risk.conditions_total,
                    gap
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// SIGNALS COMMAND
// =============================================================================

/// List stored signals.
pub fn cmd_signals(
    db_path: &PathBuf,
    json_mode: bool,
    limit: usize,
    unread_only: bool,
) -> Result<(), InfrawatchError> {
    let store = open_store(db_path)?;
    let signals = store.signals(limit.max(1), unread_only)?;

    if json_mode {
        let rendered: Vec<SignalJson> = signals
            .iter()
            .map(|(id, signal)| SignalJson::from_stored(*id, signal))
            .collect();
        return print_json(&rendered);
    }

    if signals.is_empty() {
        println!("No signals.");
        return Ok(());
    }

    println!("Signals ({} shown, newest first):", signals.len());
    for (id, signal) in &signals {
        let read_marker = if signal.is_read { " " } else { "*" };
        println!(
            "  {}[{:>4}] {:6} {:22} {}",
            read_marker,
            id,
            signal.severity.as_str(),
            signal.signal_type.as_str(),
            signal.title
        );
    }
    Ok(())
}

// =============================================================================
// OBSERVE COMMAND
// =============================================================================

/// Ingest one observation through the detector pipeline.
pub fn cmd_observe(
    db_path: &PathBuf,
    config_path: Option<&Path>,
    json_mode: bool,
    metric_id: String,
    kind: ObservationKind,
    value: f64,
    value_high: Option<f64>,
    sector: Option<String>,
    provider: Option<String>,
) -> Result<(), InfrawatchError> {
    if !value.is_finite() {
        return Err(InfrawatchError::SerializationError(
            "value must be finite".to_string(),
        ));
    }

    let (_, _, detector) = build_evaluators(config_path)?;
    let store = open_store(db_path)?;

    let input = ObservationInput {
        metric_id,
        kind,
        value,
        value_high,
        sector,
        provider,
        metric_name: None,
    };
    let outcome = process_observation(&store, &detector, &input)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "stored": true,
            "previous_value": outcome.previous_value,
            "signal": outcome
                .signal
                .as_ref()
                .map(|(id, signal)| SignalJson::from_stored(*id, signal)),
        }));
    }

    match outcome.previous_value {
        Some(previous) => println!("Stored (previous value: {})", previous),
        None => println!("Stored (first observation for this metric)"),
    }
    match outcome.signal {
        Some((id, signal)) => {
            println!(
                "Signal [{}] {} {}: {}",
                id,
                signal.severity.as_str(),
                signal.signal_type.as_str(),
                signal.title
            );
        }
        None => println!("No signal."),
    }
    Ok(())
}

// =============================================================================
// CLASSIFY COMMAND
// =============================================================================

/// Classify a snapshot from a JSON file without touching the store.
pub fn cmd_classify(
    config_path: Option<&Path>,
    json_mode: bool,
    file: &PathBuf,
) -> Result<(), InfrawatchError> {
    validate_file_size(file, MAX_SNAPSHOT_FILE_SIZE)?;

    let raw = std::fs::read_to_string(file)
        .map_err(|e| InfrawatchError::IoError(format!("Cannot read snapshot file: {}", e)))?;
    let snapshot: MetricSnapshot = serde_json::from_str(&raw)
        .map_err(|e| InfrawatchError::DeserializationError(format!("Invalid snapshot: {}", e)))?;

    let (_, classifier, _) = build_evaluators(config_path)?;
    let result = classifier.determine(&snapshot);
    print_stage_result(&result, json_mode, true)
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty store.
pub fn cmd_init(db_path: &PathBuf, force: bool) -> Result<(), InfrawatchError> {
    if db_path.exists() && !force {
        return Err(InfrawatchError::IoError(format!(
            "Store already exists at {:?} (use --force to reinitialize)",
            db_path
        )));
    }

    if db_path.exists() {
        std::fs::remove_file(db_path)
            .map_err(|e| InfrawatchError::IoError(format!("Cannot remove old store: {}", e)))?;
    }

    let _store = open_store(db_path)?;
    println!("Initialized empty store at {:?}", db_path);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
