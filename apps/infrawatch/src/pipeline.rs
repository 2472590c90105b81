//! # Observation Pipeline
//!
//! The one path every new metric observation takes, whether it arrives
//! over HTTP or from the CLI: store it as the latest value for its
//! metric id, diff it against the observation it replaced, run the
//! detector that matches its kind, and persist any resulting signal.
//!
//! The detectors themselves are pure; this module owns the ordering
//! (store first, then diff) and nothing else.

use infrawatch_core::{
    InfrawatchError, MetricObservation, MetricStore, Signal, SignalDetector, metric_ids,
    types::now_millis,
};
use serde::Deserialize;

// =============================================================================
// OBSERVATION KIND
// =============================================================================

/// Which detector an incoming observation feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ObservationKind {
    /// API token or GPU rental price; feeds the price-move detector.
    Price,
    /// Spot-vs-on-demand discount; feeds the supply/demand detector.
    SpotDiscount,
    /// Enterprise adoption metric; feeds the inflection detector.
    Adoption,
    /// M01 coverage bounds; feeds the threshold-crossing detector.
    Coverage,
    /// Stored for stage classification only; no detector runs.
    Plain,
}

// =============================================================================
// PIPELINE INPUT / OUTCOME
// =============================================================================

/// One observation entering the pipeline.
#[derive(Debug, Clone)]
pub struct ObservationInput {
    pub metric_id: String,
    pub kind: ObservationKind,
    pub value: f64,
    /// Upper coverage bound, for `Coverage` observations.
    pub value_high: Option<f64>,
    pub sector: Option<String>,
    pub provider: Option<String>,
    /// Display name used in signal descriptions, when nicer than the id.
    pub metric_name: Option<String>,
}

/// What the pipeline did with an observation.
#[derive(Debug, Clone)]
pub struct ObservationOutcome {
    /// The value this observation replaced, if any.
    pub previous_value: Option<f64>,
    /// The detected signal and its store-assigned id, if one fired.
    pub signal: Option<(u64, Signal)>,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Store an observation and run its detector against the prior value.
pub fn process_observation(
    store: &MetricStore,
    detector: &SignalDetector,
    input: &ObservationInput,
) -> Result<ObservationOutcome, InfrawatchError> {
    let recorded_at_ms = now_millis();

    let previous = store.put_observation(&MetricObservation {
        metric_id: input.metric_id.clone(),
        value: input.value,
        sector: input.sector.clone(),
        provider: input.provider.clone(),
        recorded_at_ms,
    })?;

    // Coverage observations carry two bounds under two metric ids; the
    // upper bound is stored before the detector sees either.
    let previous_high = match (input.kind, input.value_high) {
        (ObservationKind::Coverage, Some(high)) => store.put_observation(&MetricObservation {
            metric_id: metric_ids::M01_HIGH.to_string(),
            value: high,
            sector: input.sector.clone(),
            provider: input.provider.clone(),
            recorded_at_ms,
        })?,
        _ => None,
    };

    let signal = detect(detector, input, previous.as_ref(), previous_high.as_ref());

    let outcome = ObservationOutcome {
        previous_value: previous.map(|p| p.value),
        signal: match signal {
            Some(signal) => {
                let id = store.append_signal(&signal)?;
                tracing::info!(
                    signal_type = signal.signal_type.as_str(),
                    severity = signal.severity.as_str(),
                    metric_id = %signal.metric_id,
                    "Signal detected: {}",
                    signal.title
                );
                Some((id, signal))
            }
            None => None,
        },
    };

    Ok(outcome)
}

/// Run the detector matching the observation kind.
fn detect(
    detector: &SignalDetector,
    input: &ObservationInput,
    previous: Option<&MetricObservation>,
    previous_high: Option<&MetricObservation>,
) -> Option<Signal> {
    let prior = previous.map(|p| p.value);

    match input.kind {
        ObservationKind::Price => detector.detect_price_move(
            &input.metric_id,
            input.value,
            prior?,
            input.sector.as_deref(),
            input.provider.as_deref(),
        ),
        ObservationKind::SpotDiscount => detector.detect_supply_demand_shift(input.value, prior?),
        ObservationKind::Adoption => detector.detect_adoption_inflection(
            &input.metric_id,
            input.value,
            prior?,
            input.metric_name.as_deref(),
        ),
        ObservationKind::Coverage => detector.detect_coverage_crossing(
            input.value,
            input.value_high.unwrap_or(input.value),
            prior,
            previous_high.map(|p| p.value),
        ),
        ObservationKind::Plain => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use infrawatch_core::{Severity, SignalType};

    fn open_temp_store() -> (MetricStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MetricStore::open(dir.path().join("pipeline.db")).expect("open");
        (store, dir)
    }

    fn price_input(value: f64) -> ObservationInput {
        ObservationInput {
            metric_id: "b_gpt_input_price".to_string(),
            kind: ObservationKind::Price,
            value,
            value_high: None,
            sector: Some("B".to_string()),
            provider: Some("openai".to_string()),
            metric_name: None,
        }
    }

    #[test]
    fn first_observation_never_signals() {
        let (store, _dir) = open_temp_store();
        let detector = SignalDetector::new();

        let outcome = process_observation(&store, &detector, &price_input(100.0)).expect("process");
        assert!(outcome.previous_value.is_none());
        assert!(outcome.signal.is_none());
    }

    #[test]
    fn second_observation_diffs_against_the_first() {
        let (store, _dir) = open_temp_store();
        let detector = SignalDetector::new();

        process_observation(&store, &detector, &price_input(100.0)).expect("seed");
        let outcome = process_observation(&store, &detector, &price_input(112.0)).expect("process");

        assert_eq!(outcome.previous_value, Some(100.0));
        let (_, signal) = outcome.signal.expect("twelve percent move");
        assert_eq!(signal.signal_type, SignalType::PriceMove);
        assert_eq!(signal.severity, Severity::High);

        // The signal also landed in the store.
        assert_eq!(store.unread_count().expect("count"), 1);
    }

    #[test]
    fn coverage_observation_stores_both_bounds() {
        let (store, _dir) = open_temp_store();
        let detector = SignalDetector::new();

        let coverage = |low: f64, high: f64| ObservationInput {
            metric_id: metric_ids::M01_LOW.to_string(),
            kind: ObservationKind::Coverage,
            value: low,
            value_high: Some(high),
            sector: None,
            provider: None,
            metric_name: None,
        };

        process_observation(&store, &detector, &coverage(0.24, 0.30)).expect("seed");
        let outcome =
            process_observation(&store, &detector, &coverage(0.35, 0.42)).expect("process");

        let (_, signal) = outcome.signal.expect("crossed 0.30 upward");
        assert_eq!(signal.signal_type, SignalType::CoverageThreshold);
        assert_eq!(signal.threshold, Some(0.30));

        // Both bounds are now visible to the stage classifier.
        let snapshot = store.load_snapshot().expect("snapshot");
        assert_eq!(snapshot.m01_low, Some(0.35));
        assert_eq!(snapshot.m01_high, Some(0.42));
    }

    #[test]
    fn plain_observations_only_store() {
        let (store, _dir) = open_temp_store();
        let detector = SignalDetector::new();

        let input = ObservationInput {
            metric_id: metric_ids::SUPPLY_TIGHTNESS.to_string(),
            kind: ObservationKind::Plain,
            value: 0.85,
            value_high: None,
            sector: None,
            provider: None,
            metric_name: None,
        };
        process_observation(&store, &detector, &input).expect("seed");
        let outcome = process_observation(&store, &detector, &input).expect("process");

        assert_eq!(outcome.previous_value, Some(0.85));
        assert!(outcome.signal.is_none());
        assert_eq!(store.unread_count().expect("count"), 0);
    }
}
