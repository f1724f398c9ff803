// Table Materializer - walk the registry and emit the two output relations
// One row per animal, one row per impound episode, missing values as NA

use crate::events::{IntakeEvent, OutcomeEvent, DATE_DISPLAY_FORMAT};
use crate::reconcile::{ImpoundEpisode, Reconciliation};
use crate::registry::{Animal, AnimalRegistry};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// ANIMAL TABLE
// ============================================================================

/// One row of the Animal relation: the final merged snapshot attributes for
/// one registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalRow {
    pub animal_id: String,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub color_1: Option<String>,
    pub color_2: Option<String>,
    pub breed_1: Option<String>,
    pub breed_2: Option<String>,
}

impl AnimalRow {
    fn from_animal(animal: &Animal) -> Self {
        AnimalRow {
            animal_id: animal.animal_id.clone(),
            kind: animal.kind.clone(),
            name: animal.name.clone(),
            gender: animal.gender.clone(),
            color_1: animal.color_1.clone(),
            color_2: animal.color_2.clone(),
            breed_1: animal.breed_1.clone(),
            breed_2: animal.breed_2.clone(),
        }
    }
}

/// The Animal relation: one row per distinct animal, identifier-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimalTable {
    pub rows: Vec<AnimalRow>,
}

impl AnimalTable {
    const COLUMNS: [&'static str; 8] = [
        "animal_id",
        "kind",
        "name",
        "gender",
        "color_1",
        "color_2",
        "breed_1",
        "breed_2",
    ];

    /// Build the animal table from the registry, in registry iteration order
    /// (identifier-sorted, so output is bit-exact across runs).
    pub fn from_registry(registry: &AnimalRegistry) -> Self {
        AnimalTable {
            rows: registry.iter().map(AnimalRow::from_animal).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the relation as CSV, missing values rendered as `NA`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        writer.write_record(Self::COLUMNS)?;
        for row in &self.rows {
            writer.write_record([
                row.animal_id.as_str(),
                cell(&row.kind),
                cell(&row.name),
                cell(&row.gender),
                cell(&row.color_1),
                cell(&row.color_2),
                cell(&row.breed_1),
                cell(&row.breed_2),
            ])?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// IMPOUND TABLE
// ============================================================================

/// One row of the Impound relation: the animal identifier plus all
/// intake-side and outcome-side fields of one episode. A solitary episode
/// carries `None` for every field of its missing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpoundRow {
    pub animal_id: String,
    pub intake_date: Option<NaiveDateTime>,
    pub intake_type: Option<String>,
    pub intake_subtype: Option<String>,
    pub intake_condition: Option<String>,
    pub intake_location: Option<String>,
    pub intake_age_count: Option<i32>,
    pub intake_age_units: Option<String>,
    pub intake_age: Option<i64>,
    pub intake_spay_neuter: Option<String>,
    pub kennel: Option<String>,
    pub outcome_date: Option<NaiveDateTime>,
    pub outcome_type: Option<String>,
    pub outcome_subtype: Option<String>,
    pub outcome_condition: Option<String>,
    pub outcome_spay_neuter: Option<String>,
}

impl ImpoundRow {
    fn from_episode(episode: &ImpoundEpisode) -> Self {
        // A missing side flattens to None in every one of its columns.
        let intake = episode.intake.clone().unwrap_or_else(|| {
            IntakeEvent::at(NaiveDateTime::default())
        });
        let outcome = episode.outcome.clone().unwrap_or_else(|| {
            OutcomeEvent::at(NaiveDateTime::default())
        });

        ImpoundRow {
            animal_id: episode.animal_id.clone(),
            intake_date: episode.intake.as_ref().map(|i| i.intake_date),
            intake_type: intake.intake_type,
            intake_subtype: intake.intake_subtype,
            intake_condition: intake.intake_condition,
            intake_location: intake.intake_location,
            intake_age_count: intake.intake_age_count,
            intake_age_units: intake.intake_age_units,
            intake_age: intake.intake_age,
            intake_spay_neuter: intake.intake_spay_neuter,
            kennel: intake.kennel,
            outcome_date: episode.outcome.as_ref().map(|o| o.outcome_date),
            outcome_type: outcome.outcome_type,
            outcome_subtype: outcome.outcome_subtype,
            outcome_condition: outcome.outcome_condition,
            outcome_spay_neuter: outcome.outcome_spay_neuter,
        }
    }
}

/// The Impound relation: one row per reconciled episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpoundTable {
    pub rows: Vec<ImpoundRow>,
}

impl ImpoundTable {
    const COLUMNS: [&'static str; 16] = [
        "animal_id",
        "intake_date",
        "intake_type",
        "intake_subtype",
        "intake_condition",
        "intake_location",
        "intake_age_count",
        "intake_age_units",
        "intake_age",
        "intake_spay_neuter",
        "kennel",
        "outcome_date",
        "outcome_type",
        "outcome_subtype",
        "outcome_condition",
        "outcome_spay_neuter",
    ];

    /// Build the impound table from the reconciliation output, in episode
    /// emission order.
    pub fn from_reconciliation(reconciliation: &Reconciliation) -> Self {
        ImpoundTable {
            rows: reconciliation
                .episodes
                .iter()
                .map(ImpoundRow::from_episode)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the relation as CSV, missing values rendered as `NA` and
    /// timestamps as mm/dd/yyyy hh:mm.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        writer.write_record(Self::COLUMNS)?;
        for row in &self.rows {
            writer.write_record([
                row.animal_id.clone(),
                date_cell(&row.intake_date),
                owned_cell(&row.intake_type),
                owned_cell(&row.intake_subtype),
                owned_cell(&row.intake_condition),
                owned_cell(&row.intake_location),
                num_cell(&row.intake_age_count),
                owned_cell(&row.intake_age_units),
                num_cell(&row.intake_age),
                owned_cell(&row.intake_spay_neuter),
                owned_cell(&row.kennel),
                date_cell(&row.outcome_date),
                owned_cell(&row.outcome_type),
                owned_cell(&row.outcome_subtype),
                owned_cell(&row.outcome_condition),
                owned_cell(&row.outcome_spay_neuter),
            ])?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// CELL RENDERING
// ============================================================================

fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(crate::NA)
}

fn owned_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| crate::NA.to_string())
}

fn date_cell(value: &Option<NaiveDateTime>) -> String {
    match value {
        Some(date) => date.format(DATE_DISPLAY_FORMAT).to_string(),
        None => crate::NA.to_string(),
    }
}

fn num_cell<T: ToString>(value: &Option<T>) -> String {
    match value {
        Some(n) => n.to_string(),
        None => crate::NA.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ReconciliationEngine;
    use crate::registry::AnimalSnapshot;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn sample_registry() -> AnimalRegistry {
        let mut registry = AnimalRegistry::new();

        let mut snap = AnimalSnapshot::new("A1", dt(2016, 1, 10));
        snap.kind = Some("Dog".to_string());
        snap.name = Some("Rex".to_string());
        let animal = registry.upsert(snap);

        let mut intake = IntakeEvent::at(dt(2016, 1, 10));
        intake.intake_type = Some("Stray".to_string());
        intake.intake_age_count = Some(2);
        animal.add_intake(intake);

        let mut outcome = OutcomeEvent::at(dt(2016, 1, 15));
        outcome.outcome_type = Some("Adoption".to_string());
        animal.add_outcome(outcome);

        registry.upsert(AnimalSnapshot::new("A2", dt(2016, 1, 20)));

        registry
    }

    #[test]
    fn test_animal_table_has_one_row_per_registry_entry() {
        let registry = sample_registry();
        let table = AnimalTable::from_registry(&registry);

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].animal_id, "A1");
        assert_eq!(table.rows[0].kind.as_deref(), Some("Dog"));
        assert_eq!(table.rows[1].animal_id, "A2");
        assert_eq!(table.rows[1].kind, None);
    }

    #[test]
    fn test_impound_row_spreads_episode_fields() {
        let mut registry = sample_registry();
        let reconciliation = ReconciliationEngine::new().reconcile(&mut registry);
        let table = ImpoundTable::from_reconciliation(&reconciliation);

        assert_eq!(table.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.animal_id, "A1");
        assert_eq!(row.intake_type.as_deref(), Some("Stray"));
        assert_eq!(row.intake_age_count, Some(2));
        assert_eq!(row.outcome_type.as_deref(), Some("Adoption"));
        assert_eq!(row.outcome_subtype, None);
        assert_eq!(row.kennel, None);
    }

    #[test]
    fn test_solitary_episode_renders_na_side() {
        let mut registry = AnimalRegistry::new();
        let animal = registry.upsert(AnimalSnapshot::new("A1", dt(2016, 1, 10)));
        animal.add_intake(IntakeEvent::at(dt(2016, 1, 10)));

        let reconciliation = ReconciliationEngine::new().reconcile(&mut registry);
        let table = ImpoundTable::from_reconciliation(&reconciliation);

        let row = &table.rows[0];
        assert!(row.intake_date.is_some());
        assert_eq!(row.outcome_date, None);
        assert_eq!(row.outcome_type, None);
    }

    #[test]
    fn test_csv_output_uses_na_marker_and_date_format() {
        let dir = tempdir().unwrap();
        let animal_path = dir.path().join("animals.csv");
        let impound_path = dir.path().join("impounds.csv");

        let mut registry = sample_registry();
        let reconciliation = ReconciliationEngine::new().reconcile(&mut registry);

        AnimalTable::from_registry(&registry)
            .write_csv(&animal_path)
            .unwrap();
        ImpoundTable::from_reconciliation(&reconciliation)
            .write_csv(&impound_path)
            .unwrap();

        let animals = fs::read_to_string(&animal_path).unwrap();
        assert!(animals.starts_with(
            "animal_id,kind,name,gender,color_1,color_2,breed_1,breed_2"
        ));
        assert!(animals.contains("A1,Dog,Rex,NA,NA,NA,NA,NA"));
        assert!(animals.contains("A2,NA,NA,NA,NA,NA,NA,NA"));

        let impounds = fs::read_to_string(&impound_path).unwrap();
        assert!(impounds.contains("01/10/2016 10:15"));
        assert!(impounds.contains("01/15/2016 10:15"));
        assert!(impounds.contains("Stray"));
    }
}
