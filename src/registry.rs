// 🐾 Animal Registry - canonical animal records keyed on animal ID
// Merge-on-conflict semantics: update-if-newer, never regress to missing

use crate::events::{na, IntakeEvent, OutcomeEvent};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// ANIMAL SNAPSHOT
// ============================================================================

/// The animal attributes observed on one ingested record, timestamped at the
/// record's primary event date. Snapshots are folded into the registry and
/// never independently persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSnapshot {
    /// External animal identifier, stable across all sources
    pub animal_id: String,

    /// When this set of attributes was observed
    pub observed_at: NaiveDateTime,

    pub kind: Option<String>,
    pub gender: Option<String>,
    pub name: Option<String>,
    pub color_1: Option<String>,
    pub color_2: Option<String>,
    pub breed_1: Option<String>,
    pub breed_2: Option<String>,
}

impl AnimalSnapshot {
    /// Create a snapshot with no descriptive attributes set.
    pub fn new(animal_id: impl Into<String>, observed_at: NaiveDateTime) -> Self {
        AnimalSnapshot {
            animal_id: animal_id.into(),
            observed_at,
            kind: None,
            gender: None,
            name: None,
            color_1: None,
            color_2: None,
            breed_1: None,
            breed_2: None,
        }
    }
}

// ============================================================================
// ANIMAL
// ============================================================================

/// Registry entry: the merged attribute values for one animal plus its
/// accumulated intake and outcome events.
///
/// Entries are created on first sighting of an identifier, mutated in place
/// by every later sighting, and never deleted within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub animal_id: String,
    pub kind: Option<String>,
    pub gender: Option<String>,
    pub name: Option<String>,
    pub color_1: Option<String>,
    pub color_2: Option<String>,
    pub breed_1: Option<String>,
    pub breed_2: Option<String>,

    /// Timestamp of this animal's current attribute information
    pub observed_at: NaiveDateTime,

    /// Intake events, append-only until reconciliation sorts them
    pub intakes: Vec<IntakeEvent>,

    /// Outcome events, append-only until reconciliation sorts them
    pub outcomes: Vec<OutcomeEvent>,
}

impl Animal {
    fn from_snapshot(snapshot: AnimalSnapshot) -> Self {
        Animal {
            animal_id: snapshot.animal_id,
            kind: snapshot.kind,
            gender: snapshot.gender,
            name: snapshot.name,
            color_1: snapshot.color_1,
            color_2: snapshot.color_2,
            breed_1: snapshot.breed_1,
            breed_2: snapshot.breed_2,
            observed_at: snapshot.observed_at,
            intakes: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Update this animal's attributes from a snapshot when the snapshot is
    /// newer.
    ///
    /// An update never deletes accumulated information: a populated field is
    /// never overwritten by a newer field whose value is missing.
    pub fn update_if_newer(&mut self, snapshot: &AnimalSnapshot) {
        // Ignore snapshots with older or equal information.
        if snapshot.observed_at <= self.observed_at {
            return;
        }

        merge_field(&mut self.kind, &snapshot.kind);
        merge_field(&mut self.gender, &snapshot.gender);
        merge_field(&mut self.name, &snapshot.name);
        merge_field(&mut self.color_1, &snapshot.color_1);
        merge_field(&mut self.color_2, &snapshot.color_2);
        merge_field(&mut self.breed_1, &snapshot.breed_1);
        merge_field(&mut self.breed_2, &snapshot.breed_2);

        // Advance the timestamp to that of the snapshot.
        self.observed_at = snapshot.observed_at;
    }

    /// Add an intake event for this animal. No deduplication.
    pub fn add_intake(&mut self, intake: IntakeEvent) {
        self.intakes.push(intake);
    }

    /// Add an outcome event for this animal. No deduplication.
    pub fn add_outcome(&mut self, outcome: OutcomeEvent) {
        self.outcomes.push(outcome);
    }

    /// Sort the intake events by timestamp ascending.
    ///
    /// The sort is stable: events with identical timestamps keep their
    /// insertion order. Source timestamps carry no sub-day precision in some
    /// feeds, so ties are common and the tiebreak matters.
    pub fn sort_intakes(&mut self) {
        self.intakes.sort_by_key(|intake| intake.intake_date);
    }

    /// Sort the outcome events by timestamp ascending. Stable, as above.
    pub fn sort_outcomes(&mut self) {
        self.outcomes.sort_by_key(|outcome| outcome.outcome_date);
    }
}

fn merge_field(existing: &mut Option<String>, incoming: &Option<String>) {
    if incoming.is_some() {
        *existing = incoming.clone();
    }
}

impl fmt::Display for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Animal {} kind({}) gender({}) name({}) color({},{}) breed({},{})",
            self.animal_id,
            na(&self.kind),
            na(&self.gender),
            na(&self.name),
            na(&self.color_1),
            na(&self.color_2),
            na(&self.breed_1),
            na(&self.breed_2),
        )
    }
}

// ============================================================================
// ANIMAL REGISTRY
// ============================================================================

/// Dictionary of animals keyed on animal ID.
///
/// Backed by a `BTreeMap` so iteration is identifier-sorted, which makes the
/// output tables bit-exact across runs. Uniqueness invariant: at most one
/// entry per identifier.
#[derive(Debug, Default)]
pub struct AnimalRegistry {
    animals: BTreeMap<String, Animal>,
}

impl AnimalRegistry {
    pub fn new() -> Self {
        AnimalRegistry {
            animals: BTreeMap::new(),
        }
    }

    /// Add a new animal from a snapshot, or merge the snapshot into the
    /// existing entry via update-if-newer.
    ///
    /// Returns the registry's entry so the caller can append the record's
    /// events to it.
    pub fn upsert(&mut self, snapshot: AnimalSnapshot) -> &mut Animal {
        match self.animals.entry(snapshot.animal_id.clone()) {
            Entry::Occupied(entry) => {
                let animal = entry.into_mut();
                animal.update_if_newer(&snapshot);
                animal
            }
            Entry::Vacant(entry) => entry.insert(Animal::from_snapshot(snapshot)),
        }
    }

    /// Look up an animal by its identifier.
    pub fn lookup(&self, animal_id: &str) -> Option<&Animal> {
        self.animals.get(animal_id)
    }

    /// Number of distinct animals seen so far.
    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }

    /// Iterate animals in identifier-sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Animal> {
        self.animals.values()
    }

    /// Iterate animals mutably in identifier-sorted order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Animal> {
        self.animals.values_mut()
    }
}

// ============================================================================
// TESTS
// ============================================================================
