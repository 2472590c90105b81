//! # Metric Snapshot
//!
//! A flat snapshot of the named indicators the stage classifier consumes.
//!
//! Every field except the adoption streak is optional: a rule that
//! references a missing field is skipped during classification, never
//! treated as false. Callers are responsible for handing in a snapshot
//! whose fields were captured at the same logical point in time.

use serde::{Deserialize, Serialize};

// =============================================================================
// WELL-KNOWN METRIC IDS
// =============================================================================

/// Metric ids under which the store keeps the classifier's inputs.
///
/// Ingestion pipelines write observations under these keys; the store's
/// snapshot assembly reads them back into a [`MetricSnapshot`].
pub mod metric_ids {
    /// Lower bound of the inference-revenue-to-depreciation coverage ratio.
    pub const M01_LOW: &str = "m01_low";
    /// Upper bound of the coverage ratio.
    pub const M01_HIGH: &str = "m01_high";
    /// Quarter-over-quarter fractional decline in flagship token price.
    pub const PRICE_DEFLATION_QOQ: &str = "b_price_deflation_qoq";
    /// Fractional discount of spot vs. on-demand GPU rental.
    pub const SPOT_DISCOUNT: &str = "c_spot_discount";
    /// Quarter-over-quarter fractional change in GPU rental price.
    pub const RENTAL_QOQ: &str = "c_rental_qoq";
    /// Consecutive quarters of positive enterprise-adoption growth.
    pub const ADOPTION_STREAK: &str = "a_adoption_streak";
    /// Quarter-over-quarter change in cloud segment margin (points).
    pub const CLOUD_MARGIN_QOQ: &str = "d3_cloud_margin_qoq";
    /// Composite [0,1] supply-chain tightness index.
    pub const SUPPLY_TIGHTNESS: &str = "e_supply_tightness";
}

// =============================================================================
// METRIC SNAPSHOT
// =============================================================================

/// A point-in-time snapshot of the tracked indicators.
///
/// Dimensionless ratios are plain fractions (0.08 = 8%); the cloud margin
/// delta is in percentage points; the supply tightness index is in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricSnapshot {
    /// Lower bound of the coverage ratio for the current period.
    pub m01_low: Option<f64>,
    /// Upper bound of the coverage ratio for the current period.
    pub m01_high: Option<f64>,
    /// QoQ fractional decline in flagship API token price.
    pub price_deflation_qoq: Option<f64>,
    /// Fractional spot-vs-on-demand GPU rental discount.
    pub spot_discount: Option<f64>,
    /// QoQ fractional change in GPU rental price (signed).
    pub rental_qoq: Option<f64>,
    /// Consecutive quarters of positive adoption growth. Defaults to 0;
    /// unlike the other fields this one is always evaluable.
    #[serde(default)]
    pub adoption_growth_streak: u32,
    /// QoQ change in cloud segment margin, percentage points (signed).
    pub cloud_margin_qoq: Option<f64>,
    /// Supply-chain tightness index in [0,1].
    pub supply_tightness: Option<f64>,
}

impl MetricSnapshot {
    /// Create an empty snapshot (every indicator absent, streak 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether any indicator at all is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.m01_low.is_none()
            && self.m01_high.is_none()
            && self.price_deflation_qoq.is_none()
            && self.spot_discount.is_none()
            && self.rental_qoq.is_none()
            && self.adoption_growth_streak == 0
            && self.cloud_margin_qoq.is_none()
            && self.supply_tightness.is_none()
    }

    /// Set a field by its well-known metric id.
    ///
    /// Returns false when the id is not one of the classifier inputs;
    /// the value is left unrecorded in that case. The adoption streak is
    /// truncated toward zero and clamped at zero.
    pub fn set_by_metric_id(&mut self, metric_id: &str, value: f64) -> bool {
        match metric_id {
            metric_ids::M01_LOW => self.m01_low = Some(value),
            metric_ids::M01_HIGH => self.m01_high = Some(value),
            metric_ids::PRICE_DEFLATION_QOQ => self.price_deflation_qoq = Some(value),
            metric_ids::SPOT_DISCOUNT => self.spot_discount = Some(value),
            metric_ids::RENTAL_QOQ => self.rental_qoq = Some(value),
            metric_ids::ADOPTION_STREAK => {
                self.adoption_growth_streak = if value > 0.0 { value as u32 } else { 0 };
            }
            metric_ids::CLOUD_MARGIN_QOQ => self.cloud_margin_qoq = Some(value),
            metric_ids::SUPPLY_TIGHTNESS => self.supply_tightness = Some(value),
            _ => return false,
        }
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
