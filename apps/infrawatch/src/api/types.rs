//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API. Stage and
//! signal records translate from the core types here; the core itself
//! stays wire-format agnostic.

use crate::pipeline::{ObservationInput, ObservationKind};
use infrawatch_core::{
    InfrawatchError, MetricSnapshot, Severity, Signal, SignalType, StageResult, TransitionRisk,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum accepted metric id length, validated at the API boundary.
const MAX_METRIC_ID_LENGTH: usize = 128;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub observations: usize,
    pub stage_snapshots: usize,
    pub signals_total: usize,
    pub signals_unread: usize,
    /// Latest recorded stage code, if any evaluation ran yet.
    pub latest_stage: Option<String>,
}

// =============================================================================
// STAGE RESPONSES
// =============================================================================

/// Transition-risk entry as served over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRiskJson {
    pub probability: String,
    pub conditions_met: usize,
    pub conditions_total: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<GapJson>,
}

/// Residual-gap entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapJson {
    pub m01_needed: f64,
}

impl From<&TransitionRisk> for TransitionRiskJson {
    fn from(risk: &TransitionRisk) -> Self {
        Self {
            probability: risk.probability.as_str().to_string(),
            conditions_met: risk.conditions_met,
            conditions_total: risk.conditions_total,
            details: risk.details.clone(),
            gap: risk.gap.map(|g| GapJson {
                m01_needed: g.m01_needed,
            }),
        }
    }
}

/// Full stage determination response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    pub stage: String,
    pub name: String,
    pub description: String,
    pub confidence: String,
    pub rationale: String,
    pub trigger_conditions: BTreeMap<String, bool>,
    /// Keyed `to_S0`-style, matching the monitor's historical wire format.
    pub transition_risks: BTreeMap<String, TransitionRiskJson>,
    pub metrics_snapshot: MetricSnapshot,
    pub determined_at_ms: u64,
}

impl From<&StageResult> for StageResponse {
    fn from(result: &StageResult) -> Self {
        let transition_risks = result
            .transition_risks
            .iter()
            .map(|(stage, risk)| (format!("to_{:?}", stage), TransitionRiskJson::from(risk)))
            .collect();

        Self {
            stage: format!("{:?}", result.stage),
            name: result.stage.name().to_string(),
            description: result.stage.description().to_string(),
            confidence: result.confidence.as_str().to_string(),
            rationale: result.rationale.clone(),
            trigger_conditions: result.trigger_conditions.clone(),
            transition_risks,
            metrics_snapshot: result.metrics_snapshot.clone(),
            determined_at_ms: result.determined_at_ms,
        }
    }
}

/// One line of stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistoryPoint {
    pub stage: String,
    pub confidence: String,
    pub rationale: String,
    pub determined_at_ms: u64,
}

impl From<&StageResult> for StageHistoryPoint {
    fn from(result: &StageResult) -> Self {
        Self {
            stage: format!("{:?}", result.stage),
            confidence: result.confidence.as_str().to_string(),
            rationale: result.rationale.clone(),
            determined_at_ms: result.determined_at_ms,
        }
    }
}

/// Stage history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistoryResponse {
    pub history: Vec<StageHistoryPoint>,
    pub total: usize,
}

// =============================================================================
// OBSERVATION REQUEST/RESPONSE
// =============================================================================

/// Metric observation ingest request.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRequest {
    pub metric_id: String,
    pub kind: ObservationKind,
    pub value: f64,
    #[serde(default)]
    pub value_high: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub metric_name: Option<String>,
}

impl ObservationRequest {
    /// Convert to a pipeline input, validating fields.
    ///
    /// Rejects empty or oversized metric ids and non-finite values at
    /// the API boundary, before anything reaches the store.
    pub fn to_input(&self) -> Result<ObservationInput, InfrawatchError> {
        if self.metric_id.is_empty() {
            return Err(InfrawatchError::SerializationError(
                "metric_id must not be empty".to_string(),
            ));
        }
        if self.metric_id.len() > MAX_METRIC_ID_LENGTH {
            return Err(InfrawatchError::SerializationError(format!(
                "metric_id length {} exceeds maximum {} bytes",
                self.metric_id.len(),
                MAX_METRIC_ID_LENGTH
            )));
        }
        if !self.value.is_finite() {
            return Err(InfrawatchError::SerializationError(
                "value must be finite".to_string(),
            ));
        }
        if let Some(high) = self.value_high {
            if !high.is_finite() {
                return Err(InfrawatchError::SerializationError(
                    "value_high must be finite".to_string(),
                ));
            }
        }

        Ok(ObservationInput {
            metric_id: self.metric_id.clone(),
            kind: self.kind,
            value: self.value,
            value_high: self.value_high,
            sector: self.sector.clone(),
            provider: self.provider.clone(),
            metric_name: self.metric_name.clone(),
        })
    }
}

/// Observation ingest response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationResponse {
    pub stored: bool,
    pub previous_value: Option<f64>,
    pub signal: Option<SignalJson>,
    pub error: Option<String>,
}

impl ObservationResponse {
    pub fn stored(previous_value: Option<f64>, signal: Option<SignalJson>) -> Self {
        Self {
            stored: true,
            previous_value,
            signal,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            stored: false,
            previous_value: None,
            signal: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// SIGNAL RESPONSES
// =============================================================================

/// Signal as served over the wire, with its store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalJson {
    pub id: Option<u64>,
    pub signal_type: SignalType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub metric_id: String,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub threshold: Option<f64>,
    pub sector: Option<String>,
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub created_at_ms: u64,
    pub is_read: bool,
}

impl SignalJson {
    /// Wrap a stored signal with its id.
    #[must_use]
    pub fn from_stored(id: u64, signal: &Signal) -> Self {
        let mut json = Self::from_signal(signal);
        json.id = Some(id);
        json
    }

    /// Wrap a freshly detected, not-yet-stored signal.
    #[must_use]
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            id: None,
            signal_type: signal.signal_type,
            severity: signal.severity,
            title: signal.title.clone(),
            description: signal.description.clone(),
            metric_id: signal.metric_id.clone(),
            current_value: signal.current_value,
            previous_value: signal.previous_value,
            change_percent: signal.change_percent,
            threshold: signal.threshold,
            sector: signal.sector.clone(),
            provider: signal.provider.clone(),
            metadata: signal.metadata.clone(),
            created_at_ms: signal.created_at_ms,
            is_read: signal.is_read,
        }
    }
}

/// Signal list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalListResponse {
    pub signals: Vec<SignalJson>,
    pub total: usize,
    pub unread: usize,
}

/// Mark-read request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub id: u64,
}

/// Mark-read response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl MarkReadResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
