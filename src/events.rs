// Event value types - one intake or outcome occurrence
// Created once at ingestion, never mutated, only sorted and consumed

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output timestamp format, mm/dd/yyyy hh:mm.
pub const DATE_DISPLAY_FORMAT: &str = "%m/%d/%Y %H:%M";

// ============================================================================
// INTAKE EVENT
// ============================================================================

/// An animal entering shelter custody.
///
/// The timestamp is required (rows without one are rejected at ingestion);
/// every descriptive field is missing-capable because the source feeds carry
/// different subsets of detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeEvent {
    /// Intake event timestamp
    pub intake_date: NaiveDateTime,

    /// Type of intake (e.g., Stray, Owner Surrender)
    pub intake_type: Option<String>,

    /// Sub-type of intake type (e.g., Stray/Field, Owner Surrender/OTC)
    pub intake_subtype: Option<String>,

    /// Condition at time of intake (e.g., Normal, Injured)
    pub intake_condition: Option<String>,

    /// Place where the animal was captured or surrendered
    pub intake_location: Option<String>,

    /// Integer age
    pub intake_age_count: Option<i32>,

    /// Units of the integer age (e.g., dy, mo, yr)
    pub intake_age_units: Option<String>,

    /// Age denormalized to a count of seconds
    pub intake_age: Option<i64>,

    /// Sterilization status (e.g., Intact, Altered)
    pub intake_spay_neuter: Option<String>,

    /// Kennel assignment
    pub kennel: Option<String>,
}

impl IntakeEvent {
    /// Create an intake with only its timestamp set.
    pub fn at(intake_date: NaiveDateTime) -> Self {
        IntakeEvent {
            intake_date,
            intake_type: None,
            intake_subtype: None,
            intake_condition: None,
            intake_location: None,
            intake_age_count: None,
            intake_age_units: None,
            intake_age: None,
            intake_spay_neuter: None,
            kennel: None,
        }
    }
}

impl fmt::Display for IntakeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Intake {} type({}) subtype({}) condition({}) spayNeuter({}) location({}) kennel({})",
            self.intake_date.format(DATE_DISPLAY_FORMAT),
            na(&self.intake_type),
            na(&self.intake_subtype),
            na(&self.intake_condition),
            na(&self.intake_spay_neuter),
            na(&self.intake_location),
            na(&self.kennel),
        )
    }
}

// ============================================================================
// OUTCOME EVENT
// ============================================================================

/// An animal leaving shelter custody (adoption, transfer, return, etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    /// Outcome event timestamp
    pub outcome_date: NaiveDateTime,

    /// Type of outcome (e.g., Adoption, Transfer, Return to Owner)
    pub outcome_type: Option<String>,

    /// Sub-type of outcome type (e.g., Adoption/Foster, Transfer/Partner)
    pub outcome_subtype: Option<String>,

    /// Condition at time of discharge (e.g., Normal, Sick)
    pub outcome_condition: Option<String>,

    /// Sterilization status when discharged (e.g., Intact, Altered)
    pub outcome_spay_neuter: Option<String>,
}

impl OutcomeEvent {
    /// Create an outcome with only its timestamp set.
    pub fn at(outcome_date: NaiveDateTime) -> Self {
        OutcomeEvent {
            outcome_date,
            outcome_type: None,
            outcome_subtype: None,
            outcome_condition: None,
            outcome_spay_neuter: None,
        }
    }
}

impl fmt::Display for OutcomeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Outcome {} type({}) subtype({}) condition({}) spayNeuter({})",
            self.outcome_date.format(DATE_DISPLAY_FORMAT),
            na(&self.outcome_type),
            na(&self.outcome_subtype),
            na(&self.outcome_condition),
            na(&self.outcome_spay_neuter),
        )
    }
}

/// Render an optional string for display, missing values as `NA`.
pub fn na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(crate::NA)
}

// ============================================================================
// TESTS
// ============================================================================
