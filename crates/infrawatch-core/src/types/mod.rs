//! # Core Type Definitions
//!
//! This module contains the closed vocabularies and shared value types of
//! the Infrawatch decision core:
//! - Stage codes and confidence levels (`StageCode`, `Confidence`)
//! - Signal vocabularies (`SignalType`, `Severity`)
//! - Transition-risk probability ladder (`Probability`)
//! - Error types (`InfrawatchError`)
//!
//! ## Determinism Guarantees
//!
//! All enums here are closed sets with a fixed variant order. Types that
//! end up as map keys implement `Ord` so `BTreeMap` iteration is stable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// STAGE CODE
// =============================================================================

/// Lifecycle stage of AI-infrastructure economics, from S0 (unsustainable)
/// to S3 (mature, self-funding).
///
/// The variant order is meaningful: `StageCode` is `Ord` and S0 < S3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageCode {
    /// S0: Unsustainable — revenue cannot cover depreciation.
    S0,
    /// S1: Critical Transition — fast revenue growth, still short.
    S1,
    /// S2: Early Self-Sustaining — coverage near 1.0, prices stable.
    S2,
    /// S3: Mature Industrialization — fully self-funding, margins stable.
    S3,
}

impl StageCode {
    /// Get the stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageCode::S0 => "Unsustainable",
            StageCode::S1 => "Critical Transition",
            StageCode::S2 => "Early Self-Sustaining",
            StageCode::S3 => "Mature Industrialization",
        }
    }

    /// Get a one-line description of the stage.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            StageCode::S0 => "Severe capacity glut; revenue cannot cover depreciation; prices collapsing",
            StageCode::S1 => "Revenue growing fast but still short; supply and demand tightly balanced",
            StageCode::S2 => "Coverage approaching 1.0; prices stable; enterprise adoption accelerating",
            StageCode::S3 => "Fully self-funding; prices fall while gross margins hold",
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<StageCode> {
        match self {
            StageCode::S0 => Some(StageCode::S1),
            StageCode::S1 => Some(StageCode::S2),
            StageCode::S2 => Some(StageCode::S3),
            StageCode::S3 => None,
        }
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(&self) -> Option<StageCode> {
        match self {
            StageCode::S0 => None,
            StageCode::S1 => Some(StageCode::S0),
            StageCode::S2 => Some(StageCode::S1),
            StageCode::S3 => Some(StageCode::S2),
        }
    }

    /// Check if this stage is terminal (S3).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageCode::S3)
    }
}

impl std::fmt::Display for StageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self, self.name())
    }
}

// =============================================================================
// CONFIDENCE
// =============================================================================

/// Confidence attached to a stage determination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Get the confidence label as emitted by the original monitor.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SIGNAL VOCABULARIES
// =============================================================================

/// Kind of discrete alert a detector can emit.
///
/// `DisclosureChange` and `SupplyChainAlert` are part of the closed
/// vocabulary but no detector in this crate constructs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    PriceMove,
    CoverageThreshold,
    SupplyDemandShift,
    AdoptionInflection,
    DisclosureChange,
    SupplyChainAlert,
}

impl SignalType {
    /// Wire identifier for this signal type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::PriceMove => "price_move",
            SignalType::CoverageThreshold => "coverage_threshold",
            SignalType::SupplyDemandShift => "supply_demand_shift",
            SignalType::AdoptionInflection => "adoption_inflection",
            SignalType::DisclosureChange => "disclosure_change",
            SignalType::SupplyChainAlert => "supply_chain_alert",
        }
    }
}

/// Severity tier of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Get the severity label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

// =============================================================================
// TRANSITION PROBABILITY
// =============================================================================

/// Coarse probability ladder used in transition-risk estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Probability {
    Low,
    Medium,
    High,
}

impl Probability {
    /// Get the probability label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Probability::Low => "low",
            Probability::Medium => "medium",
            Probability::High => "high",
        }
    }
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Current wall-clock time as unix milliseconds.
///
/// A pre-epoch clock yields 0 rather than an error; the decision core
/// treats timestamps as opaque ordering keys only.
#[must_use]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Infrawatch core.
///
/// The evaluators themselves are total and never return these; all
/// variants originate in the storage layer or record encoding.
#[derive(Debug, Error)]
pub enum InfrawatchError {
    /// The requested metric has no stored observation.
    #[error("Metric not found: {0}")]
    MetricNotFound(String),

    /// The requested signal id does not exist.
    #[error("Signal not found: {0}")]
    SignalNotFound(u64),

    /// A record could not be encoded for storage.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A stored record could not be decoded.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or database error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
