// ⚖️ Reconciliation Engine - pair intakes with outcomes per animal
// Greedy chronological matching with an auditable warning trail
//
// For each animal independently: sort both event lists, then walk them with
// two cursors pairing each intake with the next outcome on the same or a
// later calendar day. Real shelter streams are overwhelmingly clean (one
// intake, one outcome, in order); the discrepancy branches make corrupt or
// boundary-truncated data degrade to best-effort rows plus warnings instead
// of aborting the run.

use crate::events::{IntakeEvent, OutcomeEvent};
use crate::registry::{Animal, AnimalRegistry};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// WARNINGS
// ============================================================================

/// Discrepancy messages, matching what the warnings report prints.
pub const WARN_INTAKE_UNMATCHED: &str = "Intake not matched with outcome.";
pub const WARN_OUTCOME_OUT_OF_ORDER: &str = "Outcome out of order. Discarded.";
pub const WARN_EXTRA_OUTCOMES: &str = "Extra outcomes remaining at end.";

/// One reconciliation discrepancy, attributed to an animal.
///
/// Collected as data rather than printed so callers (and tests) can assert
/// on the discrepancy trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub animal_id: String,
    pub message: String,
}

impl Warning {
    fn new(animal_id: &str, message: &str) -> Self {
        Warning {
            animal_id: animal_id.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WARNING {} - {}", self.animal_id, self.message)
    }
}

// ============================================================================
// IMPOUND EPISODE
// ============================================================================

/// One reconciled pairing (or solitary occurrence) of an intake and/or an
/// outcome for one animal. Invariant: never both sides missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpoundEpisode {
    pub animal_id: String,
    pub intake: Option<IntakeEvent>,
    pub outcome: Option<OutcomeEvent>,
}

impl ImpoundEpisode {
    fn paired(animal_id: &str, intake: IntakeEvent, outcome: OutcomeEvent) -> Self {
        ImpoundEpisode {
            animal_id: animal_id.to_string(),
            intake: Some(intake),
            outcome: Some(outcome),
        }
    }

    /// Animal presumed still in custody: no outcome recorded.
    fn solitary_intake(animal_id: &str, intake: IntakeEvent) -> Self {
        ImpoundEpisode {
            animal_id: animal_id.to_string(),
            intake: Some(intake),
            outcome: None,
        }
    }

    /// Custody began before the observed window: no intake recorded.
    fn solitary_outcome(animal_id: &str, outcome: OutcomeEvent) -> Self {
        ImpoundEpisode {
            animal_id: animal_id.to_string(),
            intake: None,
            outcome: Some(outcome),
        }
    }
}

/// The reconciliation output: episodes in registry iteration order plus the
/// structured discrepancy trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reconciliation {
    pub episodes: Vec<ImpoundEpisode>,
    pub warnings: Vec<Warning>,
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

/// Pairs each animal's intake events with its outcome events.
///
/// No condition here is fatal: every anomaly downgrades to a warning plus a
/// documented row shape, and no animal is ever dropped from the output.
#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Reconcile every animal in the registry.
    ///
    /// Sorts each animal's event lists in place, then pairs them. Requires a
    /// fully populated registry; per-animal results depend only on that
    /// animal's own lists.
    pub fn reconcile(&self, registry: &mut AnimalRegistry) -> Reconciliation {
        let mut result = Reconciliation::default();

        for animal in registry.iter_mut() {
            animal.sort_intakes();
            animal.sort_outcomes();

            self.reconcile_animal(animal, &mut result);
        }

        result
    }

    /// Pair one animal's sorted intake and outcome events into episodes.
    fn reconcile_animal(&self, animal: &Animal, result: &mut Reconciliation) {
        let id = animal.animal_id.as_str();
        let intakes = &animal.intakes;
        let outcomes = &animal.outcomes;

        let mut next_intake = 0;
        let mut next_outcome = 0;

        while next_intake < intakes.len() {
            let intake = &intakes[next_intake];

            if next_outcome >= outcomes.len() {
                // Intake(s) remaining but no more outcomes.
                let intakes_remaining = intakes.len() - next_intake;

                if intakes_remaining > 1 {
                    // Discrepancy: multiple intakes are left over. One or more
                    // late intakes is missing its matching outcome. Keep only
                    // the most recent remaining intake as the animal's
                    // terminal state and discard the rest.
                    result.warnings.push(Warning::new(id, WARN_INTAKE_UNMATCHED));

                    let last = intakes[intakes.len() - 1].clone();
                    result
                        .episodes
                        .push(ImpoundEpisode::solitary_intake(id, last));
                    next_intake = intakes.len();
                } else {
                    // A single unpaired intake: the data set ends with the
                    // animal still in the shelter's custody.
                    result
                        .episodes
                        .push(ImpoundEpisode::solitary_intake(id, intake.clone()));
                    next_intake += 1;
                }
            } else {
                // Try to pair the current intake with the next outcome.
                let outcome = &outcomes[next_outcome];
                next_outcome += 1;

                match compare_by_day(outcome.outcome_date, intake.intake_date) {
                    Ordering::Less => {
                        if next_intake == 0 {
                            // The outcome is on an earlier day than the first
                            // intake: custody began before the first date in
                            // the data set. Emit the outcome by itself.
                            result
                                .episodes
                                .push(ImpoundEpisode::solitary_outcome(id, outcome.clone()));
                        } else {
                            // Discrepancy: outcome out of time order relative
                            // to an intake already matched.
                            result
                                .warnings
                                .push(Warning::new(id, WARN_OUTCOME_OUT_OF_ORDER));
                        }
                    }
                    Ordering::Equal | Ordering::Greater => {
                        // Same or later day: pair them up.
                        result.episodes.push(ImpoundEpisode::paired(
                            id,
                            intake.clone(),
                            outcome.clone(),
                        ));
                        next_intake += 1;
                    }
                }
            }
        }

        // Outcome event(s) left over after all intakes were handled.
        if next_outcome < outcomes.len() {
            if intakes.is_empty() {
                // No intakes at all in the time period: the animal was taken
                // up before the first date in the data set, so every leftover
                // outcome is a legitimate solitary episode.
                for outcome in &outcomes[next_outcome..] {
                    result
                        .episodes
                        .push(ImpoundEpisode::solitary_outcome(id, outcome.clone()));
                }
            } else {
                // Discrepancy: surplus outcomes that pair with nothing.
                // Discard them all.
                result.warnings.push(Warning::new(id, WARN_EXTRA_OUTCOMES));
            }
        }
    }
}

/// Compare two timestamps at calendar-day granularity.
///
/// Intake and outcome timestamps for the same physical event may carry
/// different times of day across the source feeds, so pairing decisions
/// ignore time-of-day. Keep it that way even if a feed gains reliable
/// sub-day precision.
fn compare_by_day(a: chrono::NaiveDateTime, b: chrono::NaiveDateTime) -> Ordering {
    a.date().cmp(&b.date())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AnimalSnapshot;
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn intake_at(y: i32, m: u32, d: u32) -> IntakeEvent {
        IntakeEvent::at(dt(y, m, d, 9))
    }

    fn outcome_at(y: i32, m: u32, d: u32) -> OutcomeEvent {
        OutcomeEvent::at(dt(y, m, d, 17))
    }

    fn registry_with(
        id: &str,
        intakes: Vec<IntakeEvent>,
        outcomes: Vec<OutcomeEvent>,
    ) -> AnimalRegistry {
        let mut registry = AnimalRegistry::new();
        let animal = registry.upsert(AnimalSnapshot::new(id, dt(2016, 1, 1, 0)));
        for intake in intakes {
            animal.add_intake(intake);
        }
        for outcome in outcomes {
            animal.add_outcome(outcome);
        }
        registry
    }

    #[test]
    fn test_clean_pair_yields_one_episode_no_warnings() {
        let mut registry = registry_with(
            "A0",
            vec![intake_at(2016, 1, 10)],
            vec![outcome_at(2016, 1, 15)],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 1);
        assert!(result.warnings.is_empty());

        let episode = &result.episodes[0];
        assert_eq!(episode.animal_id, "A0");
        assert!(episode.intake.is_some());
        assert!(episode.outcome.is_some());
    }

    #[test]
    fn test_same_day_outcome_pairs_despite_earlier_time_of_day() {
        // Outcome at 08:00, intake at 09:00 on the same calendar day: the
        // day-granularity rule pairs them.
        let intake = IntakeEvent::at(dt(2016, 1, 10, 9));
        let outcome = OutcomeEvent::at(dt(2016, 1, 10, 8));
        let mut registry = registry_with("A0", vec![intake], vec![outcome]);

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 1);
        assert!(result.episodes[0].intake.is_some());
        assert!(result.episodes[0].outcome.is_some());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_solitary_intake_still_in_custody() {
        let mut registry = registry_with("A1", vec![intake_at(2016, 1, 10)], vec![]);

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 1);
        assert!(result.warnings.is_empty());
        assert!(result.episodes[0].intake.is_some());
        assert_eq!(result.episodes[0].outcome, None);
    }

    #[test]
    fn test_solitary_outcome_for_pre_window_custody() {
        let mut registry = registry_with("A2", vec![], vec![outcome_at(2016, 1, 5)]);

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 1);
        assert!(result.warnings.is_empty());
        assert_eq!(result.episodes[0].intake, None);
        assert!(result.episodes[0].outcome.is_some());
    }

    #[test]
    fn test_pre_window_outcome_then_pending_intake() {
        // Outcome on 01-09 predates the first intake on 01-10: the outcome is
        // solitary, and the intake then has nothing left to pair with.
        let mut registry = registry_with(
            "A3",
            vec![intake_at(2016, 1, 10)],
            vec![outcome_at(2016, 1, 9)],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 2);
        assert!(result.warnings.is_empty());

        assert_eq!(result.episodes[0].intake, None);
        assert!(result.episodes[0].outcome.is_some());

        assert!(result.episodes[1].intake.is_some());
        assert_eq!(result.episodes[1].outcome, None);
    }

    #[test]
    fn test_multiple_unmatched_intakes_keep_most_recent() {
        let mut registry = registry_with(
            "A4",
            vec![intake_at(2016, 1, 1), intake_at(2016, 2, 1)],
            vec![],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(
            result.warnings,
            vec![Warning {
                animal_id: "A4".to_string(),
                message: WARN_INTAKE_UNMATCHED.to_string(),
            }]
        );

        // Only the most recent intake survives.
        assert_eq!(result.episodes.len(), 1);
        let intake = result.episodes[0].intake.as_ref().unwrap();
        assert_eq!(intake.intake_date.date(), dt(2016, 2, 1, 0).date());
        assert_eq!(result.episodes[0].outcome, None);
    }

    #[test]
    fn test_surplus_outcomes_discarded_after_pairing() {
        let mut registry = registry_with(
            "A5",
            vec![intake_at(2016, 1, 1)],
            vec![outcome_at(2016, 1, 5), outcome_at(2016, 1, 10)],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        // First outcome pairs with the intake; the second is surplus.
        assert_eq!(result.episodes.len(), 1);
        let episode = &result.episodes[0];
        assert!(episode.intake.is_some());
        let outcome = episode.outcome.as_ref().unwrap();
        assert_eq!(outcome.outcome_date.date(), dt(2016, 1, 5, 0).date());

        assert_eq!(
            result.warnings,
            vec![Warning {
                animal_id: "A5".to_string(),
                message: WARN_EXTRA_OUTCOMES.to_string(),
            }]
        );
    }

    #[test]
    fn test_out_of_order_outcome_after_a_match_is_discarded() {
        // First cycle pairs cleanly (01-10 / 01-15). The 01-12 outcome then
        // lands before the 02-01 intake and after a completed match: it is
        // out of order and dropped with a warning. The 02-01 intake is left
        // with a 02-05 outcome to pair with.
        let mut registry = registry_with(
            "B1",
            vec![intake_at(2016, 1, 10), intake_at(2016, 2, 1)],
            vec![
                outcome_at(2016, 1, 15),
                outcome_at(2016, 1, 12),
                outcome_at(2016, 2, 5),
            ],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        // Sorted outcomes: 01-12, 01-15, 02-05. The 01-12 outcome pairs with
        // the 01-10 intake; 01-15 is then earlier than the 02-01 intake and
        // not the first intake, so it is discarded; 02-05 pairs with 02-01.
        assert_eq!(result.episodes.len(), 2);
        assert_eq!(
            result.warnings,
            vec![Warning {
                animal_id: "B1".to_string(),
                message: WARN_OUTCOME_OUT_OF_ORDER.to_string(),
            }]
        );

        let first = &result.episodes[0];
        assert_eq!(
            first.outcome.as_ref().unwrap().outcome_date.date(),
            dt(2016, 1, 12, 0).date()
        );
        let second = &result.episodes[1];
        assert_eq!(
            second.outcome.as_ref().unwrap().outcome_date.date(),
            dt(2016, 2, 5, 0).date()
        );
    }

    #[test]
    fn test_two_clean_custody_cycles() {
        let mut registry = registry_with(
            "B2",
            vec![intake_at(2016, 1, 10), intake_at(2016, 3, 1)],
            vec![outcome_at(2016, 1, 20), outcome_at(2016, 3, 10)],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 2);
        assert!(result.warnings.is_empty());
        for episode in &result.episodes {
            assert!(episode.intake.is_some());
            assert!(episode.outcome.is_some());
        }
    }

    #[test]
    fn test_all_pre_window_outcomes_are_emitted() {
        // Zero intakes overall: every outcome is legitimately pre-window and
        // each one becomes its own solitary episode.
        let mut registry = registry_with(
            "B3",
            vec![],
            vec![outcome_at(2016, 1, 5), outcome_at(2016, 2, 5)],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        assert_eq!(result.episodes.len(), 2);
        assert!(result.warnings.is_empty());
        assert!(result.episodes.iter().all(|e| e.intake.is_none()));
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let mut registry = registry_with(
            "C1",
            vec![intake_at(2016, 1, 10), intake_at(2016, 3, 1)],
            vec![outcome_at(2016, 1, 20)],
        );

        let engine = ReconciliationEngine::new();
        let first = engine.reconcile(&mut registry);
        let second = engine.reconcile(&mut registry);

        assert_eq!(first.episodes, second.episodes);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn test_every_episode_has_at_least_one_side() {
        let mut registry = registry_with(
            "C2",
            vec![intake_at(2016, 1, 10)],
            vec![outcome_at(2016, 1, 5), outcome_at(2016, 1, 15)],
        );

        let result = ReconciliationEngine::new().reconcile(&mut registry);

        for episode in &result.episodes {
            assert!(episode.intake.is_some() || episode.outcome.is_some());
        }
    }

    #[test]
    fn test_warning_display_format() {
        let warning = Warning::new("A4", WARN_INTAKE_UNMATCHED);
        assert_eq!(
            warning.to_string(),
            "WARNING A4 - Intake not matched with outcome."
        );
    }
}
