//! # Threshold Tables
//!
//! The fixed boundary values the classifier and detectors compare
//! against. Both tables ship with the monitoring framework's defaults
//! and can be overridden at construction time; nothing in this crate
//! learns or adjusts them from data.

use serde::{Deserialize, Serialize};

// =============================================================================
// STAGE THRESHOLDS (Default Reference Values)
// =============================================================================

/// Coverage ratio below which the industry cannot fund its own capital base.
pub const M01_CRITICAL: f64 = 0.30;

/// Coverage ratio above which economics are considered healthy.
pub const M01_HEALTHY: f64 = 0.70;

/// Coverage ratio at which inference revenue fully funds depreciation.
pub const M01_SUSTAINABLE: f64 = 1.00;

/// QoQ token-price deflation beyond this fraction counts as a collapse.
pub const DEFLATION_SEVERE: f64 = 0.15;

/// Spot discount beyond this fraction indicates idle capacity.
pub const SPOT_EXCESS: f64 = 0.40;

/// Symmetric band (±) within which rental prices count as stable.
pub const RENTAL_STABLE_BAND: f64 = 0.05;

/// Symmetric band (± percentage points) for stable cloud margins.
pub const MARGIN_STABLE_BAND: f64 = 0.03;

/// Minimum consecutive growth quarters for a sustained adoption trend.
pub const ADOPTION_MIN_STREAK: u32 = 2;

/// Supply tightness index at or above which supply is constrained.
pub const SUPPLY_TIGHT: f64 = 0.80;

/// Boundary values consumed by the stage classifier.
///
/// Deserializes with per-field defaults so a partial override table
/// only replaces what it names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThresholds {
    pub m01_critical: f64,
    pub m01_healthy: f64,
    pub m01_sustainable: f64,
    pub deflation_severe: f64,
    pub spot_excess: f64,
    pub rental_stable_band: f64,
    pub margin_stable_band: f64,
    pub adoption_min_streak: u32,
    pub supply_tight: f64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            m01_critical: M01_CRITICAL,
            m01_healthy: M01_HEALTHY,
            m01_sustainable: M01_SUSTAINABLE,
            deflation_severe: DEFLATION_SEVERE,
            spot_excess: SPOT_EXCESS,
            rental_stable_band: RENTAL_STABLE_BAND,
            margin_stable_band: MARGIN_STABLE_BAND,
            adoption_min_streak: ADOPTION_MIN_STREAK,
            supply_tight: SUPPLY_TIGHT,
        }
    }
}

// =============================================================================
// SIGNAL THRESHOLDS (Default Reference Values)
// =============================================================================

/// Absolute price change (fraction) that triggers a HIGH price-move signal.
pub const PRICE_MOVE_HIGH: f64 = 0.10;

/// Absolute price change (fraction) that triggers a MEDIUM price-move signal.
pub const PRICE_MOVE_MEDIUM: f64 = 0.05;

/// Absolute adoption change (fraction) that marks an inflection.
pub const ADOPTION_INFLECTION: f64 = 0.20;

/// Absolute spot-discount change (points) that marks a supply/demand shift.
pub const SPOT_DISCOUNT_SHIFT: f64 = 0.10;

/// Coverage-ratio levels whose crossing is surfaced, scanned ascending.
pub const COVERAGE_LEVELS: [f64; 3] = [M01_CRITICAL, M01_HEALTHY, M01_SUSTAINABLE];

/// Boundary values consumed by the signal detectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub price_move_high: f64,
    pub price_move_medium: f64,
    pub adoption_inflection: f64,
    pub spot_discount_shift: f64,
    pub coverage_levels: [f64; 3],
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            price_move_high: PRICE_MOVE_HIGH,
            price_move_medium: PRICE_MOVE_MEDIUM,
            adoption_inflection: ADOPTION_INFLECTION,
            spot_discount_shift: SPOT_DISCOUNT_SHIFT,
            coverage_levels: COVERAGE_LEVELS,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
