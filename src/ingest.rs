// 🏗️ Ingestion Adapters - one per source schema
// Cleaned tabular records → animal snapshot + zero, one, or two events

use crate::events::{IntakeEvent, OutcomeEvent};
use crate::registry::{AnimalRegistry, AnimalSnapshot};
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

// ============================================================================
// SOURCE KIND
// ============================================================================

/// The closed set of source schemas this pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    AustinIntake,
    AustinOutcome,
    SacramentoOpen,
    SacramentoCpra,
}

impl SourceKind {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceKind::AustinIntake => "Austin intakes",
            SourceKind::AustinOutcome => "Austin outcomes",
            SourceKind::SacramentoOpen => "Sacramento open-data impounds",
            SourceKind::SacramentoCpra => "Sacramento CPRA impounds",
        }
    }

    /// Short code for internal use
    pub fn code(&self) -> &str {
        match self {
            SourceKind::AustinIntake => "atx-intake",
            SourceKind::AustinOutcome => "atx-outcome",
            SourceKind::SacramentoOpen => "sac-open",
            SourceKind::SacramentoCpra => "sac-cpra",
        }
    }
}

// ============================================================================
// CLEANED RECORD SHAPES
// ============================================================================

// The record structs below mirror the cleaned extracts one-to-one. Every
// column is carried as an optional string: the upstream cleaning step writes
// the literal "NA" for values it could not recover, and the adapters are
// responsible for turning that sentinel (and blank cells) back into None.

/// Austin intake extract: separate intake-only event fields plus the full
/// animal-identity column set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AustinIntakeRecord {
    #[serde(default)]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color_1: Option<String>,
    #[serde(default)]
    pub color_2: Option<String>,
    #[serde(default)]
    pub breed_1: Option<String>,
    #[serde(default)]
    pub breed_2: Option<String>,
    #[serde(default)]
    pub intake_date: Option<String>,
    #[serde(default)]
    pub intake_type: Option<String>,
    #[serde(default)]
    pub intake_condition: Option<String>,
    #[serde(default)]
    pub intake_location: Option<String>,
    #[serde(default)]
    pub intake_age_count: Option<String>,
    #[serde(default)]
    pub intake_age_units: Option<String>,
    #[serde(default)]
    pub intake_age: Option<String>,
    #[serde(default)]
    pub intake_spay_neuter: Option<String>,
}

/// Austin outcome extract: outcome-only event fields plus the full
/// animal-identity column set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AustinOutcomeRecord {
    #[serde(default)]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color_1: Option<String>,
    #[serde(default)]
    pub color_2: Option<String>,
    #[serde(default)]
    pub breed_1: Option<String>,
    #[serde(default)]
    pub breed_2: Option<String>,
    #[serde(default)]
    pub outcome_date: Option<String>,
    #[serde(default)]
    pub outcome_type: Option<String>,
    #[serde(default)]
    pub outcome_subtype: Option<String>,
    #[serde(default)]
    pub outcome_spay_neuter: Option<String>,
}

/// Sacramento open-data extract: one row bundles an intake and an outcome
/// with a reduced field set (no conditions or sub-types).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SacOpenRecord {
    #[serde(default)]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub intake_date: Option<String>,
    #[serde(default)]
    pub intake_type: Option<String>,
    #[serde(default)]
    pub intake_location: Option<String>,
    #[serde(default)]
    pub outcome_date: Option<String>,
    #[serde(default)]
    pub outcome_type: Option<String>,
}

/// Sacramento CPRA extract: one row bundles an intake and an outcome with
/// the richer field set, including kennel, sub-types, and conditions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SacCpraRecord {
    #[serde(default)]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color_1: Option<String>,
    #[serde(default)]
    pub color_2: Option<String>,
    #[serde(default)]
    pub breed_1: Option<String>,
    #[serde(default)]
    pub breed_2: Option<String>,
    #[serde(default)]
    pub kennel: Option<String>,
    #[serde(default)]
    pub spay_neuter: Option<String>,
    #[serde(default)]
    pub intake_date: Option<String>,
    #[serde(default)]
    pub intake_type: Option<String>,
    #[serde(default)]
    pub intake_subtype: Option<String>,
    #[serde(default)]
    pub intake_condition: Option<String>,
    #[serde(default)]
    pub intake_location: Option<String>,
    #[serde(default)]
    pub outcome_date: Option<String>,
    #[serde(default)]
    pub outcome_type: Option<String>,
    #[serde(default)]
    pub outcome_subtype: Option<String>,
    #[serde(default)]
    pub outcome_condition: Option<String>,
}

// ============================================================================
// INGEST STATS
// ============================================================================

/// Per-source ingestion tally. Row-level defects (missing identifier or
/// missing primary timestamp) are non-fatal: the row is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub source: SourceKind,
    pub rows: usize,
    pub skipped: usize,
}

impl IngestStats {
    fn new(source: SourceKind) -> Self {
        IngestStats {
            source,
            rows: 0,
            skipped: 0,
        }
    }

    /// Rows that actually reached the registry.
    pub fn ingested(&self) -> usize {
        self.rows - self.skipped
    }
}

// ============================================================================
// FIELD CLEANUP HELPERS
// ============================================================================

/// Normalize a cleaned-extract cell: blank cells and the literal "NA"
/// sentinel both mean missing.
fn clean(value: &Option<String>) -> Option<String> {
    let text = value.as_deref()?.trim();
    if text.is_empty() || text == crate::NA {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse a timestamp from the formats the cleaned extracts use.
///
/// Accepts, in order:
/// - `2016-01-10 14:30:00` (ISO date-time)
/// - `2016-01-10T14:30:00` (ISO date-time, T separator)
/// - `01/10/2016 14:30`    (US date-time)
/// - `2016-01-10`          (date only, midnight assumed)
/// - `01/10/2016`          (US date only, midnight assumed)
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    let text = text.trim();

    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }

    None
}

fn clean_timestamp(value: &Option<String>) -> Option<NaiveDateTime> {
    clean(value).and_then(|text| parse_timestamp(&text))
}

fn clean_i32(value: &Option<String>) -> Option<i32> {
    clean(value).and_then(|text| text.parse().ok())
}

fn clean_i64(value: &Option<String>) -> Option<i64> {
    clean(value).and_then(|text| text.parse().ok())
}

// ============================================================================
// ADAPTERS
// ============================================================================

/// Ingest Austin intake records: one snapshot + one intake event per row.
pub fn ingest_austin_intakes(
    records: &[AustinIntakeRecord],
    registry: &mut AnimalRegistry,
) -> IngestStats {
    let mut stats = IngestStats::new(SourceKind::AustinIntake);

    for record in records {
        stats.rows += 1;

        let (animal_id, intake_date) =
            match (clean(&record.animal_id), clean_timestamp(&record.intake_date)) {
                (Some(id), Some(date)) => (id, date),
                _ => {
                    stats.skipped += 1;
                    continue;
                }
            };

        let mut snapshot = AnimalSnapshot::new(animal_id, intake_date);
        snapshot.kind = clean(&record.kind);
        snapshot.gender = clean(&record.gender);
        snapshot.name = clean(&record.name);
        snapshot.color_1 = clean(&record.color_1);
        snapshot.color_2 = clean(&record.color_2);
        snapshot.breed_1 = clean(&record.breed_1);
        snapshot.breed_2 = clean(&record.breed_2);

        let animal = registry.upsert(snapshot);

        let mut intake = IntakeEvent::at(intake_date);
        intake.intake_type = clean(&record.intake_type);
        intake.intake_condition = clean(&record.intake_condition);
        intake.intake_location = clean(&record.intake_location);
        intake.intake_age_count = clean_i32(&record.intake_age_count);
        intake.intake_age_units = clean(&record.intake_age_units);
        intake.intake_age = clean_i64(&record.intake_age);
        intake.intake_spay_neuter = clean(&record.intake_spay_neuter);

        animal.add_intake(intake);
    }

    stats
}

/// Ingest Austin outcome records: one snapshot + one outcome event per row.
pub fn ingest_austin_outcomes(
    records: &[AustinOutcomeRecord],
    registry: &mut AnimalRegistry,
) -> IngestStats {
    let mut stats = IngestStats::new(SourceKind::AustinOutcome);

    for record in records {
        stats.rows += 1;

        let (animal_id, outcome_date) =
            match (clean(&record.animal_id), clean_timestamp(&record.outcome_date)) {
                (Some(id), Some(date)) => (id, date),
                _ => {
                    stats.skipped += 1;
                    continue;
                }
            };

        let mut snapshot = AnimalSnapshot::new(animal_id, outcome_date);
        snapshot.kind = clean(&record.kind);
        snapshot.gender = clean(&record.gender);
        snapshot.name = clean(&record.name);
        snapshot.color_1 = clean(&record.color_1);
        snapshot.color_2 = clean(&record.color_2);
        snapshot.breed_1 = clean(&record.breed_1);
        snapshot.breed_2 = clean(&record.breed_2);

        let animal = registry.upsert(snapshot);

        let mut outcome = OutcomeEvent::at(outcome_date);
        outcome.outcome_type = clean(&record.outcome_type);
        outcome.outcome_subtype = clean(&record.outcome_subtype);
        outcome.outcome_spay_neuter = clean(&record.outcome_spay_neuter);

        animal.add_outcome(outcome);
    }

    stats
}

/// Ingest Sacramento open-data records: one snapshot + one intake event per
/// row, plus an outcome event when the row carries an outcome date (rows for
/// animals still in custody do not).
pub fn ingest_sac_open(records: &[SacOpenRecord], registry: &mut AnimalRegistry) -> IngestStats {
    let mut stats = IngestStats::new(SourceKind::SacramentoOpen);

    for record in records {
        stats.rows += 1;

        let (animal_id, intake_date) =
            match (clean(&record.animal_id), clean_timestamp(&record.intake_date)) {
                (Some(id), Some(date)) => (id, date),
                _ => {
                    stats.skipped += 1;
                    continue;
                }
            };

        // Open-data rows expose only a reduced identity set.
        let mut snapshot = AnimalSnapshot::new(animal_id, intake_date);
        snapshot.kind = clean(&record.kind);
        snapshot.name = clean(&record.name);

        let animal = registry.upsert(snapshot);

        let mut intake = IntakeEvent::at(intake_date);
        intake.intake_type = clean(&record.intake_type);
        intake.intake_location = clean(&record.intake_location);
        animal.add_intake(intake);

        if let Some(outcome_date) = clean_timestamp(&record.outcome_date) {
            let mut outcome = OutcomeEvent::at(outcome_date);
            outcome.outcome_type = clean(&record.outcome_type);
            animal.add_outcome(outcome);
        }
    }

    stats
}

/// Ingest Sacramento CPRA records: like the open-data shape but with the
/// richer field set (kennel, sub-types, conditions, sterilization).
pub fn ingest_sac_cpra(records: &[SacCpraRecord], registry: &mut AnimalRegistry) -> IngestStats {
    let mut stats = IngestStats::new(SourceKind::SacramentoCpra);

    for record in records {
        stats.rows += 1;

        let (animal_id, intake_date) =
            match (clean(&record.animal_id), clean_timestamp(&record.intake_date)) {
                (Some(id), Some(date)) => (id, date),
                _ => {
                    stats.skipped += 1;
                    continue;
                }
            };

        let mut snapshot = AnimalSnapshot::new(animal_id, intake_date);
        snapshot.kind = clean(&record.kind);
        snapshot.gender = clean(&record.gender);
        snapshot.name = clean(&record.name);
        snapshot.color_1 = clean(&record.color_1);
        snapshot.color_2 = clean(&record.color_2);
        snapshot.breed_1 = clean(&record.breed_1);
        snapshot.breed_2 = clean(&record.breed_2);

        let animal = registry.upsert(snapshot);

        let mut intake = IntakeEvent::at(intake_date);
        intake.kennel = clean(&record.kennel);
        intake.intake_type = clean(&record.intake_type);
        intake.intake_subtype = clean(&record.intake_subtype);
        intake.intake_condition = clean(&record.intake_condition);
        intake.intake_location = clean(&record.intake_location);
        // The CPRA sterilization column describes status at intake.
        intake.intake_spay_neuter = clean(&record.spay_neuter);
        animal.add_intake(intake);

        if let Some(outcome_date) = clean_timestamp(&record.outcome_date) {
            let mut outcome = OutcomeEvent::at(outcome_date);
            outcome.outcome_type = clean(&record.outcome_type);
            outcome.outcome_subtype = clean(&record.outcome_subtype);
            outcome.outcome_condition = clean(&record.outcome_condition);
            animal.add_outcome(outcome);
        }
    }

    stats
}

// ============================================================================
// CSV LOADERS
// ============================================================================

// A missing required column is a structural error: the extract was produced
// by a different pipeline version and nothing in it can be trusted, so the
// load for that source aborts.

const AUSTIN_INTAKE_COLUMNS: [&str; 16] = [
    "animal_id",
    "kind",
    "gender",
    "name",
    "color_1",
    "color_2",
    "breed_1",
    "breed_2",
    "intake_date",
    "intake_type",
    "intake_condition",
    "intake_location",
    "intake_age_count",
    "intake_age_units",
    "intake_age",
    "intake_spay_neuter",
];

const AUSTIN_OUTCOME_COLUMNS: [&str; 12] = [
    "animal_id",
    "kind",
    "gender",
    "name",
    "color_1",
    "color_2",
    "breed_1",
    "breed_2",
    "outcome_date",
    "outcome_type",
    "outcome_subtype",
    "outcome_spay_neuter",
];

const SAC_OPEN_COLUMNS: [&str; 8] = [
    "animal_id",
    "kind",
    "name",
    "intake_date",
    "intake_type",
    "intake_location",
    "outcome_date",
    "outcome_type",
];

const SAC_CPRA_COLUMNS: [&str; 19] = [
    "animal_id",
    "kind",
    "gender",
    "name",
    "color_1",
    "color_2",
    "breed_1",
    "breed_2",
    "kennel",
    "spay_neuter",
    "intake_date",
    "intake_type",
    "intake_subtype",
    "intake_condition",
    "intake_location",
    "outcome_date",
    "outcome_type",
    "outcome_subtype",
    "outcome_condition",
];

/// CPRA extracts carry a record-source column that open-data extracts lack.
const CPRA_MARKER_COLUMN: &str = "rec_source";

fn check_columns(headers: &csv::StringRecord, required: &[&str], path: &Path) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&name| !headers.iter().any(|h| h == name))
        .copied()
        .collect();

    if !missing.is_empty() {
        bail!(
            "{}: missing required column(s): {}",
            path.display(),
            missing.join(", ")
        );
    }

    Ok(())
}

fn load_records<T: for<'de> Deserialize<'de>>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers from {}", path.display()))?
        .clone();
    check_columns(&headers, required, path)?;

    let mut records = Vec::new();
    for (line_num, result) in reader.deserialize().enumerate() {
        let record: T = result.with_context(|| {
            format!(
                "Failed to parse CSV line {} in {}",
                line_num + 2, // 1-indexed + header row
                path.display()
            )
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Load a cleaned Austin intake extract.
pub fn load_austin_intakes(path: &Path) -> Result<Vec<AustinIntakeRecord>> {
    load_records(path, &AUSTIN_INTAKE_COLUMNS)
}

/// Load a cleaned Austin outcome extract.
pub fn load_austin_outcomes(path: &Path) -> Result<Vec<AustinOutcomeRecord>> {
    load_records(path, &AUSTIN_OUTCOME_COLUMNS)
}

/// Load a cleaned Sacramento open-data extract.
pub fn load_sac_open(path: &Path) -> Result<Vec<SacOpenRecord>> {
    load_records(path, &SAC_OPEN_COLUMNS)
}

/// Load a cleaned Sacramento CPRA extract.
pub fn load_sac_cpra(path: &Path) -> Result<Vec<SacCpraRecord>> {
    load_records(path, &SAC_CPRA_COLUMNS)
}

/// Detect which Sacramento shape an extract carries by probing its headers
/// for the CPRA record-source column.
pub fn detect_sac_shape(path: &Path) -> Result<SourceKind> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers from {}", path.display()))?;

    if headers.iter().any(|h| h == CPRA_MARKER_COLUMN) {
        Ok(SourceKind::SacramentoCpra)
    } else {
        Ok(SourceKind::SacramentoOpen)
    }
}

// ============================================================================
// TESTS
// ============================================================================
