//! # infrawatch-core
//!
//! The deterministic decision core of Infrawatch - THE LOGIC.
//!
//! This crate answers two questions about a stream of AI-infrastructure
//! economic metrics: which sustainability stage the industry is in
//! (Stage Classifier), and which individual metric movements deserve a
//! discrete alert (Signal Detector).
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is pure: both evaluators are side-effect-free functions of their
//!   inputs, safe to call concurrently from any number of callers
//! - Is total: a snapshot always classifies; absent inputs degrade to
//!   "fact not evaluated" or "no signal", never to an error
//! - Holds no history: diffing current vs. previous observations is the
//!   storage layer's job, batching and de-duplication the caller's
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod detector;
pub mod snapshot;
pub mod stage;
pub mod storage;
pub mod thresholds;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Confidence, InfrawatchError, Probability, Severity, SignalType, StageCode};

// =============================================================================
// RE-EXPORTS: Decision Core
// =============================================================================

pub use detector::{Signal, SignalDetector};
pub use snapshot::{MetricSnapshot, metric_ids};
pub use stage::{StageClassifier, StageResult, TransitionGap, TransitionRisk};
pub use thresholds::{SignalThresholds, StageThresholds};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{MetricObservation, MetricStore};
