//! # Signal Detector
//!
//! Stateless threshold-crossing evaluators that turn metric movements
//! into discrete, severity-tagged alerts.
//!
//! Each detector is a pure function of a (current, previous) value pair:
//! it returns at most one [`Signal`] per invocation and holds no history.
//! Batching, persistence and de-duplication across invocations belong to
//! the caller. A zero or missing previous value means insufficient
//! history: no signal, never a division error or a NaN escaping.

use crate::thresholds::SignalThresholds;
use crate::types::{Severity, SignalType, now_millis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SIGNAL
// =============================================================================

/// A discrete alert surfaced to a human operator.
///
/// Immutable once constructed except for `is_read`, which an external
/// collaborator flips when the operator acknowledges the signal; the
/// detectors always construct it unread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// Identifier of the metric whose movement triggered the signal.
    pub metric_id: String,
    pub current_value: f64,
    #[serde(default)]
    pub previous_value: Option<f64>,
    /// Relative change in percent (12.3 = +12.3%), when meaningful.
    #[serde(default)]
    pub change_percent: Option<f64>,
    /// The threshold that was crossed, for level-crossing signals.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    /// Free-form context, deterministic iteration order.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at_ms: u64,
    /// Read flag, owned by the signal store after construction.
    pub is_read: bool,
}

// =============================================================================
// SIGNAL DETECTOR
// =============================================================================

/// Signal Detector — four independent, pure evaluators over one
/// threshold table. Construct one wherever a comparison happens; there
/// is no shared state worth keeping alive between calls.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    thresholds: SignalThresholds,
}

impl Default for SignalDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalDetector {
    /// Create a detector with the framework's default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            thresholds: SignalThresholds::default(),
        }
    }

    /// Create a detector with custom thresholds.
    #[must_use]
    pub fn with_thresholds(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    /// The threshold table in effect.
    #[must_use]
    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    // =========================================================================
    // PRICE MOVE
    // =========================================================================

    /// Detect a significant price movement.
    ///
    /// Severity is HIGH at |change| >= 10%, MEDIUM at >= 5%, otherwise no
    /// signal. A zero previous price is insufficient history.
    #[must_use]
    pub fn detect_price_move(
        &self,
        metric_id: &str,
        current: f64,
        previous: f64,
        sector: Option<&str>,
        provider: Option<&str>,
    ) -> Option<Signal> {
        let change = relative_change(current, previous)?;
        let abs_change = change.abs();

        let severity = if abs_change >= self.thresholds.price_move_high {
            Severity::High
        } else if abs_change >= self.thresholds.price_move_medium {
            Severity::Medium
        } else {
            return None;
        };

        let direction = if change > 0.0 { "up" } else { "down" };
        let subject = provider.unwrap_or(metric_id);

        Some(Signal {
            signal_type: SignalType::PriceMove,
            severity,
            title: format!("{} price {}", sector.unwrap_or("B"), direction),
            description: format!(
                "{} price {} {:.1}% vs. previous observation",
                subject,
                direction,
                abs_change * 100.0
            ),
            metric_id: metric_id.to_string(),
            current_value: current,
            previous_value: Some(previous),
            change_percent: Some(change * 100.0),
            threshold: None,
            sector: sector.map(str::to_string),
            provider: provider.map(str::to_string),
            metadata: BTreeMap::new(),
            created_at_ms: now_millis(),
            is_read: false,
        })
    }

    // =========================================================================
    // COVERAGE THRESHOLD
    // =========================================================================

    /// Detect the coverage ratio crossing one of the framework levels
    /// (0.30 / 0.70 / 1.00), judged on the low bound.
    ///
    /// Levels are scanned ascending and only the FIRST level crossed is
    /// reported, even when one step jumps several levels. The bounds are
    /// asymmetric on purpose — upward `prev < t <= now`, downward
    /// `prev >= t > now` — so a value landing exactly on a level cannot
    /// trigger both directions.
    #[must_use]
    pub fn detect_coverage_crossing(
        &self,
        m01_low: f64,
        m01_high: f64,
        previous_m01_low: Option<f64>,
        previous_m01_high: Option<f64>,
    ) -> Option<Signal> {
        let prev_low = previous_m01_low?;

        for &level in &self.thresholds.coverage_levels {
            let crossed_up = prev_low < level && level <= m01_low;
            let crossed_down = prev_low >= level && level > m01_low;

            let direction = if crossed_up {
                "up"
            } else if crossed_down {
                "down"
            } else {
                continue;
            };

            let movement = if crossed_up { "rose" } else { "fell" };
            let sense = if crossed_up { "upward" } else { "downward" };
            let mut metadata = BTreeMap::new();
            metadata.insert("direction".to_string(), direction.to_string());
            metadata.insert("m01_high".to_string(), format!("{m01_high:.2}"));
            if let Some(prev_high) = previous_m01_high {
                metadata.insert("m01_high_prev".to_string(), format!("{prev_high:.2}"));
            }

            return Some(Signal {
                signal_type: SignalType::CoverageThreshold,
                severity: Severity::High,
                title: format!("M01 coverage crossed {level} {sense}"),
                description: format!(
                    "M01 coverage {} from {:.2} to {:.2}, crossing the {} level",
                    movement, prev_low, m01_low, level
                ),
                metric_id: "m01_coverage".to_string(),
                current_value: m01_low,
                previous_value: Some(prev_low),
                change_percent: None,
                threshold: Some(level),
                sector: None,
                provider: None,
                metadata,
                created_at_ms: now_millis(),
                is_read: false,
            });
        }

        None
    }

    // =========================================================================
    // SUPPLY / DEMAND SHIFT
    // =========================================================================

    /// Detect a shift in the supply/demand balance: the spot discount
    /// moving by at least 10 percentage points, in either direction.
    #[must_use]
    pub fn detect_supply_demand_shift(
        &self,
        current_spot_discount: f64,
        previous_spot_discount: f64,
    ) -> Option<Signal> {
        let change = current_spot_discount - previous_spot_discount;
        if !change.is_finite() || change.abs() < self.thresholds.spot_discount_shift {
            return None;
        }

        let direction = if change > 0.0 { "widened" } else { "narrowed" };

        Some(Signal {
            signal_type: SignalType::SupplyDemandShift,
            severity: Severity::Medium,
            title: format!("GPU spot discount {direction}"),
            description: format!(
                "Spot discount moved from {:.1}% to {:.1}%",
                previous_spot_discount * 100.0,
                current_spot_discount * 100.0
            ),
            metric_id: "c_spot_discount".to_string(),
            current_value: current_spot_discount,
            previous_value: Some(previous_spot_discount),
            change_percent: Some(change.abs() * 100.0),
            threshold: Some(self.thresholds.spot_discount_shift),
            sector: Some("C".to_string()),
            provider: None,
            metadata: BTreeMap::new(),
            created_at_ms: now_millis(),
            is_read: false,
        })
    }

    // =========================================================================
    // ADOPTION INFLECTION
    // =========================================================================

    /// Detect an inflection in enterprise adoption: quarter-over-quarter
    /// change of at least 20% in either direction.
    #[must_use]
    pub fn detect_adoption_inflection(
        &self,
        metric_id: &str,
        current: f64,
        previous: f64,
        metric_name: Option<&str>,
    ) -> Option<Signal> {
        let change = relative_change(current, previous)?;
        if change.abs() < self.thresholds.adoption_inflection {
            return None;
        }

        let direction = if change > 0.0 { "accelerating" } else { "slowing" };

        Some(Signal {
            signal_type: SignalType::AdoptionInflection,
            severity: Severity::Medium,
            title: format!("Enterprise adoption {direction}"),
            description: format!(
                "{} changed {:+.1}% quarter-over-quarter",
                metric_name.unwrap_or(metric_id),
                change * 100.0
            ),
            metric_id: metric_id.to_string(),
            current_value: current,
            previous_value: Some(previous),
            change_percent: Some(change * 100.0),
            threshold: Some(self.thresholds.adoption_inflection),
            sector: Some("A".to_string()),
            provider: None,
            metadata: BTreeMap::new(),
            created_at_ms: now_millis(),
            is_read: false,
        })
    }
}

/// Fractional change of `current` against `previous`.
///
/// None when the previous value is zero (insufficient history) or the
/// ratio is not finite.
fn relative_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous;
    change.is_finite().then_some(change)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // PRICE MOVE
    // =========================================================================

    #[test]
    fn ten_percent_move_is_high_severity() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_price_move("gpt_input", 110.0, 100.0, Some("B"), Some("openai"))
            .expect("signal");
        assert_eq!(signal.severity, Severity::High);
        assert_eq!(signal.signal_type, SignalType::PriceMove);
        let pct = signal.change_percent.expect("change percent");
        assert!((pct - 10.0).abs() < 1e-9);
        assert!(!signal.is_read);
    }

    #[test]
    fn six_percent_move_is_medium_severity() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_price_move("gpt_input", 106.0, 100.0, None, None)
            .expect("signal");
        assert_eq!(signal.severity, Severity::Medium);
    }

    #[test]
    fn four_percent_move_is_quiet() {
        let detector = SignalDetector::new();
        assert!(
            detector
                .detect_price_move("gpt_input", 104.0, 100.0, None, None)
                .is_none()
        );
    }

    #[test]
    fn zero_previous_price_yields_no_signal() {
        let detector = SignalDetector::new();
        assert!(
            detector
                .detect_price_move("gpt_input", 100.0, 0.0, None, None)
                .is_none()
        );
    }

    #[test]
    fn downward_move_reports_down_direction() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_price_move("h100_hourly", 85.0, 100.0, Some("C"), None)
            .expect("signal");
        assert_eq!(signal.severity, Severity::High);
        assert!(signal.title.contains("down"));
        assert!(signal.change_percent.unwrap_or(0.0) < 0.0);
    }

    // =========================================================================
    // COVERAGE THRESHOLD
    // =========================================================================

    #[test]
    fn upward_crossing_reports_first_level() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_coverage_crossing(0.35, 0.45, Some(0.24), Some(0.30))
            .expect("signal");
        assert_eq!(signal.threshold, Some(0.30));
        assert_eq!(signal.metadata.get("direction").map(String::as_str), Some("up"));
        assert_eq!(signal.severity, Severity::High);
    }

    #[test]
    fn downward_crossing_reports_level_down() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_coverage_crossing(0.25, 0.32, Some(0.35), Some(0.42))
            .expect("signal");
        assert_eq!(signal.threshold, Some(0.30));
        assert_eq!(signal.metadata.get("direction").map(String::as_str), Some("down"));
    }

    #[test]
    fn quiet_between_levels() {
        let detector = SignalDetector::new();
        assert!(
            detector
                .detect_coverage_crossing(0.65, 0.69, Some(0.35), Some(0.40))
                .is_none()
        );
    }

    #[test]
    fn multi_level_jump_reports_only_the_lowest() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_coverage_crossing(1.05, 1.20, Some(0.25), None)
            .expect("signal");
        // One step across 0.30, 0.70 and 1.00: only the first is surfaced.
        assert_eq!(signal.threshold, Some(0.30));
    }

    #[test]
    fn landing_exactly_on_a_level_triggers_only_upward() {
        let detector = SignalDetector::new();
        let up = detector
            .detect_coverage_crossing(0.30, 0.35, Some(0.29), None)
            .expect("signal");
        assert_eq!(up.metadata.get("direction").map(String::as_str), Some("up"));

        // Leaving from exactly the level downward also counts once.
        let down = detector
            .detect_coverage_crossing(0.29, 0.35, Some(0.30), None)
            .expect("signal");
        assert_eq!(down.metadata.get("direction").map(String::as_str), Some("down"));
    }

    #[test]
    fn no_previous_coverage_yields_no_signal() {
        let detector = SignalDetector::new();
        assert!(detector.detect_coverage_crossing(0.35, 0.45, None, None).is_none());
    }

    // =========================================================================
    // SUPPLY / DEMAND SHIFT
    // =========================================================================

    #[test]
    fn ten_point_discount_move_triggers() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_supply_demand_shift(0.45, 0.30)
            .expect("signal");
        assert_eq!(signal.severity, Severity::Medium);
        assert!(signal.title.contains("widened"));
    }

    #[test]
    fn nine_point_discount_move_is_quiet() {
        let detector = SignalDetector::new();
        assert!(detector.detect_supply_demand_shift(0.39, 0.30).is_none());
    }

    #[test]
    fn narrowing_discount_reports_narrowed() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_supply_demand_shift(0.20, 0.35)
            .expect("signal");
        assert!(signal.title.contains("narrowed"));
    }

    // =========================================================================
    // ADOPTION INFLECTION
    // =========================================================================

    #[test]
    fn twenty_percent_adoption_jump_triggers() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_adoption_inflection("a_seats", 120.0, 100.0, Some("enterprise seats"))
            .expect("signal");
        assert_eq!(signal.severity, Severity::Medium);
        assert!(signal.title.contains("accelerating"));
        assert!(signal.description.contains("enterprise seats"));
    }

    #[test]
    fn adoption_decline_reports_slowing() {
        let detector = SignalDetector::new();
        let signal = detector
            .detect_adoption_inflection("a_seats", 75.0, 100.0, None)
            .expect("signal");
        assert!(signal.title.contains("slowing"));
    }

    #[test]
    fn small_adoption_change_is_quiet() {
        let detector = SignalDetector::new();
        assert!(
            detector
                .detect_adoption_inflection("a_seats", 110.0, 100.0, None)
                .is_none()
        );
    }

    #[test]
    fn zero_previous_adoption_yields_no_signal() {
        let detector = SignalDetector::new();
        assert!(
            detector
                .detect_adoption_inflection("a_seats", 50.0, 0.0, None)
                .is_none()
        );
    }
}
