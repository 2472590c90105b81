//! # Stage Classifier
//!
//! Maps a [`MetricSnapshot`] to one of the four sustainability stages,
//! with a confidence level, the boolean facts that carried the decision,
//! and forward-looking transition-risk estimates for adjacent stages.
//!
//! ## Resolution order
//!
//! | Priority | Stage | Rule |
//! |----------|-------|------|
//! | 1 | S0 | all present facts true AND >= 3 true |
//! | 2 | S3 | all present facts true AND >= 2 true |
//! | 3 | S2 | all present facts true AND >= 2 true |
//! | 4 | S1 | any fact true |
//! | 5 | S1 | fallback (mixed signals) |
//!
//! S0 is checked first so a genuinely unsustainable snapshot is never
//! masked by a coincidentally healthy S2/S3 partial match. The
//! "all-present AND minimum-count" hybrid is kept as two explicit counts
//! so a rule set with zero evaluable facts can never win vacuously.
//!
//! Classification is pure and total: a snapshot with every field absent
//! still classifies (to the S1 fallback), and a missing field skips its
//! facts rather than counting against a stage.

use crate::snapshot::MetricSnapshot;
use crate::thresholds::StageThresholds;
use crate::types::{Confidence, Probability, StageCode, now_millis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// RULE SET
// =============================================================================

/// The facts one stage's rule set evaluated against a snapshot.
///
/// Only facts whose inputs were present appear; `met` counts true facts
/// and `len` counts evaluated facts, the two numbers the resolution
/// algorithm compares.
#[derive(Debug, Clone, Default)]
struct RuleSet {
    facts: Vec<(&'static str, bool)>,
}

impl RuleSet {
    fn push(&mut self, name: &'static str, met: bool) {
        self.facts.push((name, met));
    }

    /// Number of facts that evaluated true.
    fn met_count(&self) -> usize {
        self.facts.iter().filter(|(_, met)| *met).count()
    }

    /// All present facts true AND at least `min_count` of them.
    ///
    /// Both conditions are deliberate: the count keeps an almost-empty
    /// snapshot from qualifying, the full agreement keeps a contradicted
    /// stage from qualifying.
    fn all_met(&self, min_count: usize) -> bool {
        self.met_count() >= min_count && self.facts.iter().all(|(_, met)| *met)
    }

    /// At least one fact true.
    fn any_met(&self) -> bool {
        self.facts.iter().any(|(_, met)| *met)
    }

    fn to_map(&self) -> BTreeMap<String, bool> {
        self.facts
            .iter()
            .map(|(name, met)| ((*name).to_string(), *met))
            .collect()
    }
}

// =============================================================================
// TRANSITION RISK
// =============================================================================

/// Residual distance to a coverage threshold the destination stage needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionGap {
    /// Additional coverage ratio required, rounded to two decimals.
    pub m01_needed: f64,
}

/// Estimated likelihood of moving to an adjacent stage, with the fact
/// counts that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRisk {
    pub probability: Probability,
    pub conditions_met: usize,
    pub conditions_total: usize,
    /// Per-fact detail of the destination stage's rule set, when computed.
    #[serde(default)]
    pub details: BTreeMap<String, bool>,
    /// Residual gap toward the destination, when one is defined.
    #[serde(default)]
    pub gap: Option<TransitionGap>,
}

// =============================================================================
// STAGE RESULT
// =============================================================================

/// Outcome of one classification call.
///
/// Immutable once produced; ownership passes entirely to the caller,
/// which typically appends it to the stage-history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The winning stage.
    pub stage: StageCode,
    /// Confidence in the determination.
    pub confidence: Confidence,
    /// Short human-readable rationale.
    pub rationale: String,
    /// Evaluated facts of the winning stage's rule set.
    pub trigger_conditions: BTreeMap<String, bool>,
    /// Risk estimates keyed by destination stage. Never contains the
    /// current stage; empty for S0 and S3.
    pub transition_risks: BTreeMap<StageCode, TransitionRisk>,
    /// Verbatim copy of the classified snapshot.
    pub metrics_snapshot: MetricSnapshot,
    /// Unix-millisecond timestamp of the determination.
    pub determined_at_ms: u64,
}

// =============================================================================
// STAGE CLASSIFIER
// =============================================================================

/// Stage Classifier — pure function of a metric snapshot.
#[derive(Debug, Clone)]
pub struct StageClassifier {
    thresholds: StageThresholds,
}

impl Default for StageClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StageClassifier {
    /// Create a classifier with the framework's default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            thresholds: StageThresholds::default(),
        }
    }

    /// Create a classifier with custom thresholds.
    #[must_use]
    pub fn with_thresholds(thresholds: StageThresholds) -> Self {
        Self { thresholds }
    }

    /// The threshold table in effect.
    #[must_use]
    pub fn thresholds(&self) -> &StageThresholds {
        &self.thresholds
    }

    /// Classify a snapshot. Total: always returns a result.
    #[must_use]
    pub fn determine(&self, snapshot: &MetricSnapshot) -> StageResult {
        let s0 = self.s0_facts(snapshot);
        let s3 = self.s3_facts(snapshot);
        let s2 = self.s2_facts(snapshot);
        let s1 = self.s1_facts(snapshot);

        let (stage, confidence, rationale, trigger) = if s0.all_met(3) {
            (
                StageCode::S0,
                Confidence::High,
                "Coverage below critical, price collapse, capacity glut".to_string(),
                &s0,
            )
        } else if s3.all_met(2) {
            (
                StageCode::S3,
                Confidence::High,
                "Coverage above 1.0 with stable cloud margins".to_string(),
                &s3,
            )
        } else if s2.all_met(2) {
            (
                StageCode::S2,
                Confidence::High,
                "Coverage near self-sustaining, supply and demand balanced".to_string(),
                &s2,
            )
        } else if s1.any_met() {
            let confidence = if snapshot.adoption_growth_streak >= self.thresholds.adoption_min_streak
            {
                Confidence::High
            } else {
                Confidence::Medium
            };
            (
                StageCode::S1,
                confidence,
                "Coverage in transition band or sustained enterprise adoption".to_string(),
                &s1,
            )
        } else {
            (
                StageCode::S1,
                Confidence::Low,
                "mixed signals, defaulting to transition".to_string(),
                &s1,
            )
        };

        StageResult {
            stage,
            confidence,
            rationale,
            trigger_conditions: trigger.to_map(),
            transition_risks: self.transition_risks(stage, snapshot),
            metrics_snapshot: snapshot.clone(),
            determined_at_ms: now_millis(),
        }
    }

    // =========================================================================
    // RULE SETS
    // =========================================================================

    /// S0 (Unsustainable) facts.
    fn s0_facts(&self, m: &MetricSnapshot) -> RuleSet {
        let t = &self.thresholds;
        let mut facts = RuleSet::default();

        if let Some(m01_high) = m.m01_high {
            facts.push("m01_too_low", m01_high < t.m01_critical);
        }
        if let Some(deflation) = m.price_deflation_qoq {
            facts.push("price_collapse", deflation > t.deflation_severe);
        }
        if let Some(discount) = m.spot_discount {
            facts.push("capacity_excess", discount > t.spot_excess);
        }

        facts
    }

    /// S3 (Mature Industrialization) facts.
    fn s3_facts(&self, m: &MetricSnapshot) -> RuleSet {
        let t = &self.thresholds;
        let mut facts = RuleSet::default();

        if let Some(m01_low) = m.m01_low {
            facts.push("m01_sustainable", m01_low > t.m01_sustainable);
        }
        if let Some(margin) = m.cloud_margin_qoq {
            facts.push("margin_stable", margin.abs() < t.margin_stable_band);
        }

        facts
    }

    /// S2 (Early Self-Sustaining) facts.
    fn s2_facts(&self, m: &MetricSnapshot) -> RuleSet {
        let t = &self.thresholds;
        let mut facts = RuleSet::default();

        if let Some(m01_low) = m.m01_low {
            facts.push("m01_healthy", m01_low > t.m01_healthy);
        }
        if let Some(rental) = m.rental_qoq {
            facts.push("rental_stable", rental.abs() < t.rental_stable_band);
        }
        if let Some(tightness) = m.supply_tightness {
            facts.push("supply_stable", tightness < t.supply_tight);
        }

        facts
    }

    /// S1 (Critical Transition) facts.
    ///
    /// The transition-band fact needs both coverage bounds; the adoption
    /// fact is always evaluable because the streak defaults to 0.
    fn s1_facts(&self, m: &MetricSnapshot) -> RuleSet {
        let t = &self.thresholds;
        let mut facts = RuleSet::default();

        if let (Some(m01_low), Some(m01_high)) = (m.m01_low, m.m01_high) {
            facts.push(
                "m01_transition",
                t.m01_critical <= m01_high && m01_low <= t.m01_healthy,
            );
        }
        facts.push(
            "adoption_growing",
            m.adoption_growth_streak >= t.adoption_min_streak,
        );

        facts
    }

    // =========================================================================
    // TRANSITION RISKS
    // =========================================================================

    /// Risk estimates for the stages adjacent to the winning one.
    ///
    /// Only S1 and S2 have documented outgoing entries; the S2→S1 branch
    /// is the original framework's placeholder and computes no facts.
    fn transition_risks(
        &self,
        current: StageCode,
        m: &MetricSnapshot,
    ) -> BTreeMap<StageCode, TransitionRisk> {
        let t = &self.thresholds;
        let mut risks = BTreeMap::new();

        match current {
            StageCode::S1 => {
                let s0 = self.s0_facts(m);
                let met = s0.met_count();
                risks.insert(
                    StageCode::S0,
                    TransitionRisk {
                        probability: if met >= 2 {
                            Probability::High
                        } else {
                            Probability::Low
                        },
                        conditions_met: met,
                        conditions_total: 3,
                        details: s0.to_map(),
                        gap: None,
                    },
                );

                let s2 = self.s2_facts(m);
                let met = s2.met_count();
                let gap = (t.m01_healthy - m.m01_low.unwrap_or(0.0)).max(0.0);
                risks.insert(
                    StageCode::S2,
                    TransitionRisk {
                        probability: match met {
                            n if n >= 2 => Probability::High,
                            1 => Probability::Medium,
                            _ => Probability::Low,
                        },
                        conditions_met: met,
                        conditions_total: 2,
                        details: s2.to_map(),
                        gap: Some(TransitionGap {
                            m01_needed: round2(gap),
                        }),
                    },
                );
            }

            StageCode::S2 => {
                let s3 = self.s3_facts(m);
                let met = s3.met_count();
                let gap = (t.m01_sustainable - m.m01_low.unwrap_or(0.0)).max(0.0);
                risks.insert(
                    StageCode::S3,
                    TransitionRisk {
                        probability: if met >= 2 {
                            Probability::High
                        } else {
                            Probability::Medium
                        },
                        conditions_met: met,
                        conditions_total: 2,
                        details: BTreeMap::new(),
                        gap: Some(TransitionGap {
                            m01_needed: round2(gap),
                        }),
                    },
                );

                // Placeholder inherited from the framework: no facts defined
                // for the S2→S1 regression yet.
                risks.insert(
                    StageCode::S1,
                    TransitionRisk {
                        probability: Probability::Low,
                        conditions_met: 0,
                        conditions_total: 2,
                        details: BTreeMap::new(),
                        gap: None,
                    },
                );
            }

            // No outgoing entries documented for S0 and S3.
            StageCode::S0 | StageCode::S3 => {}
        }

        risks
    }
}

/// Round to two decimals, the precision gaps are reported at.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unsustainable_snapshot() -> MetricSnapshot {
        MetricSnapshot {
            m01_low: Some(0.10),
            m01_high: Some(0.20),
            price_deflation_qoq: Some(0.25),
            spot_discount: Some(0.55),
            ..MetricSnapshot::default()
        }
    }

    #[test]
    fn all_s0_facts_true_wins_regardless_of_other_fields() {
        let mut snapshot = unsustainable_snapshot();
        // Healthy-looking side metrics must not mask the danger case.
        snapshot.rental_qoq = Some(0.01);
        snapshot.cloud_margin_qoq = Some(0.01);
        snapshot.supply_tightness = Some(0.50);

        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S0);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.trigger_conditions.len(), 3);
        assert!(result.trigger_conditions.values().all(|met| *met));
    }

    #[test]
    fn two_s0_facts_are_not_enough() {
        let snapshot = MetricSnapshot {
            m01_high: Some(0.20),
            price_deflation_qoq: Some(0.25),
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_ne!(result.stage, StageCode::S0);
    }

    #[test]
    fn empty_snapshot_falls_back_to_s1_low() {
        let result = StageClassifier::new().determine(&MetricSnapshot::new());
        assert_eq!(result.stage, StageCode::S1);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.rationale, "mixed signals, defaulting to transition");
    }

    #[test]
    fn mature_snapshot_classifies_s3() {
        let snapshot = MetricSnapshot {
            m01_low: Some(1.10),
            m01_high: Some(1.30),
            cloud_margin_qoq: Some(0.01),
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S3);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.transition_risks.is_empty());
    }

    #[test]
    fn single_present_fact_cannot_win_s3() {
        // margin_stable alone is all-true but below the minimum count.
        let snapshot = MetricSnapshot {
            cloud_margin_qoq: Some(0.00),
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_ne!(result.stage, StageCode::S3);
    }

    #[test]
    fn early_self_sustaining_classifies_s2() {
        let snapshot = MetricSnapshot {
            m01_low: Some(0.85),
            m01_high: Some(0.95),
            rental_qoq: Some(0.01),
            supply_tightness: Some(0.60),
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S2);
        assert_eq!(result.confidence, Confidence::High);
        // S2 carries the opportunity toward S3 and the placeholder back-risk.
        assert!(result.transition_risks.contains_key(&StageCode::S3));
        assert!(result.transition_risks.contains_key(&StageCode::S1));
        assert!(!result.transition_risks.contains_key(&StageCode::S2));
    }

    #[test]
    fn s2_to_s3_gap_measures_remaining_coverage() {
        let snapshot = MetricSnapshot {
            m01_low: Some(0.85),
            m01_high: Some(0.95),
            rental_qoq: Some(0.01),
            supply_tightness: Some(0.60),
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        let to_s3 = &result.transition_risks[&StageCode::S3];
        assert_eq!(to_s3.gap, Some(TransitionGap { m01_needed: 0.15 }));
        // Only margin_stable could make S3 facts; it is absent here.
        assert_eq!(to_s3.conditions_met, 0);
        assert_eq!(to_s3.probability, Probability::Medium);
    }

    #[test]
    fn transition_band_with_adoption_streak_is_high_confidence_s1() {
        let snapshot = MetricSnapshot {
            m01_low: Some(0.40),
            m01_high: Some(0.60),
            adoption_growth_streak: 3,
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S1);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn transition_band_without_streak_is_medium_confidence() {
        let snapshot = MetricSnapshot {
            m01_low: Some(0.40),
            m01_high: Some(0.60),
            adoption_growth_streak: 1,
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S1);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn transition_band_needs_both_coverage_bounds() {
        // Only the low bound present: the band fact is skipped entirely,
        // and with no streak nothing in S1 fires, so we get the fallback.
        let snapshot = MetricSnapshot {
            m01_low: Some(0.40),
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S1);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.trigger_conditions.contains_key("m01_transition"));
    }

    #[test]
    fn s1_risks_exclude_current_stage() {
        let snapshot = MetricSnapshot {
            m01_low: Some(0.40),
            m01_high: Some(0.60),
            adoption_growth_streak: 2,
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert!(!result.transition_risks.contains_key(&StageCode::S1));
        assert!(result.transition_risks.contains_key(&StageCode::S0));
        assert!(result.transition_risks.contains_key(&StageCode::S2));
    }

    #[test]
    fn s1_risk_to_s0_goes_high_at_two_facts() {
        let snapshot = MetricSnapshot {
            m01_low: Some(0.15),
            m01_high: Some(0.35), // keeps m01_too_low false, band true
            price_deflation_qoq: Some(0.20),
            spot_discount: Some(0.50),
            adoption_growth_streak: 0,
            ..MetricSnapshot::default()
        };
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.stage, StageCode::S1);
        let to_s0 = &result.transition_risks[&StageCode::S0];
        assert_eq!(to_s0.conditions_met, 2);
        assert_eq!(to_s0.probability, Probability::High);
        assert_eq!(to_s0.conditions_total, 3);
    }

    #[test]
    fn custom_thresholds_shift_the_boundaries() {
        let thresholds = StageThresholds {
            m01_critical: 0.50,
            ..StageThresholds::default()
        };
        let classifier = StageClassifier::with_thresholds(thresholds);
        let snapshot = MetricSnapshot {
            m01_high: Some(0.40),
            price_deflation_qoq: Some(0.25),
            spot_discount: Some(0.55),
            ..MetricSnapshot::default()
        };
        // With the raised critical line, 0.40 now counts as too low.
        let result = classifier.determine(&snapshot);
        assert_eq!(result.stage, StageCode::S0);
    }

    #[test]
    fn result_embeds_the_classified_snapshot() {
        let snapshot = unsustainable_snapshot();
        let result = StageClassifier::new().determine(&snapshot);
        assert_eq!(result.metrics_snapshot, snapshot);
    }
}
