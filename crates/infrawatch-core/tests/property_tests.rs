//! # Property-Based Tests
//!
//! Verification tests using proptest.
//!
//! These tests ensure the classifier's totality/determinism invariants
//! and the detectors' threshold discipline.

use infrawatch_core::{
    Confidence, MetricSnapshot, Severity, SignalDetector, StageClassifier, StageCode,
};
use proptest::option;
use proptest::prelude::*;

/// Strategy for an arbitrary, possibly sparse snapshot.
fn arb_snapshot() -> impl Strategy<Value = MetricSnapshot> {
    (
        option::of(-2.0..3.0f64),
        option::of(-2.0..3.0f64),
        option::of(-1.0..1.0f64),
        option::of(0.0..1.0f64),
        option::of(-1.0..1.0f64),
        0u32..8,
        option::of(-0.2..0.2f64),
        option::of(0.0..1.0f64),
    )
        .prop_map(
            |(
                m01_low,
                m01_high,
                price_deflation_qoq,
                spot_discount,
                rental_qoq,
                adoption_growth_streak,
                cloud_margin_qoq,
                supply_tightness,
            )| MetricSnapshot {
                m01_low,
                m01_high,
                price_deflation_qoq,
                spot_discount,
                rental_qoq,
                adoption_growth_streak,
                cloud_margin_qoq,
                supply_tightness,
            },
        )
}

// =============================================================================
// CLASSIFIER PROPERTIES
// =============================================================================

proptest! {
    /// Classification is total: any snapshot produces exactly one of the
    /// four stages and never includes itself among the transition risks.
    #[test]
    fn classify_is_total(snapshot in arb_snapshot()) {
        let result = StageClassifier::new().determine(&snapshot);

        prop_assert!(matches!(
            result.stage,
            StageCode::S0 | StageCode::S1 | StageCode::S2 | StageCode::S3
        ));
        prop_assert!(!result.transition_risks.contains_key(&result.stage));
    }

    /// Identical snapshots classify identically (timestamps aside).
    #[test]
    fn classify_is_idempotent(snapshot in arb_snapshot()) {
        let classifier = StageClassifier::new();
        let first = classifier.determine(&snapshot);
        let second = classifier.determine(&snapshot);

        prop_assert_eq!(first.stage, second.stage);
        prop_assert_eq!(first.confidence, second.confidence);
        prop_assert_eq!(first.trigger_conditions, second.trigger_conditions);
        prop_assert_eq!(first.transition_risks, second.transition_risks);
    }

    /// A snapshot satisfying every S0 fact classifies S0/HIGH no matter
    /// what the remaining fields look like.
    #[test]
    fn unsustainable_facts_always_win(
        m01_high in 0.0..0.29f64,
        deflation in 0.16..1.0f64,
        spot in 0.41..1.0f64,
        rest in arb_snapshot(),
    ) {
        let snapshot = MetricSnapshot {
            m01_high: Some(m01_high),
            price_deflation_qoq: Some(deflation),
            spot_discount: Some(spot),
            ..rest
        };

        let result = StageClassifier::new().determine(&snapshot);
        prop_assert_eq!(result.stage, StageCode::S0);
        prop_assert_eq!(result.confidence, Confidence::High);
    }

    /// An adoption streak alone can carry a snapshot into S1 but never
    /// into a healthier stage.
    #[test]
    fn streak_alone_never_exceeds_s1(streak in 0u32..10) {
        let snapshot = MetricSnapshot {
            adoption_growth_streak: streak,
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        prop_assert_eq!(result.stage, StageCode::S1);
    }
}

// =============================================================================
// DETECTOR PROPERTIES
// =============================================================================

proptest! {
    /// Price-move severity follows the banded thresholds exactly.
    #[test]
    fn price_move_severity_bands(previous in 1.0..1000.0f64, change in -0.5..0.5f64) {
        let current = previous * (1.0 + change);
        let detector = SignalDetector::new();
        let signal = detector.detect_price_move("m", current, previous, None, None);

        // Recompute the realized change; float rounding keeps us honest.
        let realized = ((current - previous) / previous).abs();
        match signal {
            Some(s) if realized >= 0.10 => prop_assert_eq!(s.severity, Severity::High),
            Some(s) => {
                prop_assert!(realized >= 0.05);
                prop_assert_eq!(s.severity, Severity::Medium);
            }
            None => prop_assert!(realized < 0.05),
        }
    }

    /// A zero previous value never produces a signal, whatever the
    /// current value is.
    #[test]
    fn zero_previous_is_insufficient_history(current in -1000.0..1000.0f64) {
        let detector = SignalDetector::new();
        prop_assert!(detector.detect_price_move("m", current, 0.0, None, None).is_none());
        prop_assert!(detector.detect_adoption_inflection("m", current, 0.0, None).is_none());
    }

    /// Coverage values wandering strictly between two adjacent levels
    /// never produce a crossing signal.
    #[test]
    fn coverage_quiet_inside_band(
        previous in 0.31..0.69f64,
        current in 0.31..0.69f64,
    ) {
        let detector = SignalDetector::new();
        prop_assert!(
            detector
                .detect_coverage_crossing(current, current + 0.05, Some(previous), None)
                .is_none()
        );
    }

    /// The supply/demand detector is symmetric in direction: only the
    /// magnitude of the discount change decides whether it fires.
    #[test]
    fn supply_shift_is_direction_symmetric(base in 0.0..0.5f64, delta in 0.0..0.4f64) {
        let detector = SignalDetector::new();
        let widened = detector.detect_supply_demand_shift(base + delta, base);
        let narrowed = detector.detect_supply_demand_shift(base, base + delta);
        prop_assert_eq!(widened.is_some(), narrowed.is_some());

        let realized = ((base + delta) - base).abs();
        prop_assert_eq!(widened.is_some(), realized >= 0.10);
    }
}
