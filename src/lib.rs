// Impound Tables - Core Library
// Builds normalized animal and impound tables from shelter open-data extracts

pub mod events;
pub mod ingest;
pub mod reconcile;
pub mod registry;
pub mod tables;

// Re-export commonly used types
pub use events::{IntakeEvent, OutcomeEvent, DATE_DISPLAY_FORMAT};
pub use ingest::{
    detect_sac_shape, ingest_austin_intakes, ingest_austin_outcomes, ingest_sac_cpra,
    ingest_sac_open, load_austin_intakes, load_austin_outcomes, load_sac_cpra, load_sac_open,
    parse_timestamp, AustinIntakeRecord, AustinOutcomeRecord, IngestStats, SacCpraRecord,
    SacOpenRecord, SourceKind,
};
pub use reconcile::{
    ImpoundEpisode, Reconciliation, ReconciliationEngine, Warning, WARN_EXTRA_OUTCOMES,
    WARN_INTAKE_UNMATCHED, WARN_OUTCOME_OUT_OF_ORDER,
};
pub use registry::{Animal, AnimalRegistry, AnimalSnapshot};
pub use tables::{AnimalRow, AnimalTable, ImpoundRow, ImpoundTable};

/// The missing-value marker used in input extracts and output tables.
/// Distinct from the empty string: `NA` means "value not present in source".
pub const NA: &str = "NA";

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything one pipeline run produces: the two normalized relations, the
/// structured discrepancy trail, and the per-source ingest tallies.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub animals: AnimalTable,
    pub impounds: ImpoundTable,
    pub warnings: Vec<Warning>,
    pub stats: Vec<IngestStats>,
}

fn finish(registry: &mut AnimalRegistry, stats: Vec<IngestStats>) -> BuildOutput {
    let reconciliation = ReconciliationEngine::new().reconcile(registry);

    BuildOutput {
        animals: AnimalTable::from_registry(registry),
        impounds: ImpoundTable::from_reconciliation(&reconciliation),
        warnings: reconciliation.warnings,
        stats,
    }
}

/// Build the animal and impound tables from Austin intake and outcome
/// extracts, which carry intakes and outcomes as disjoint record sets.
pub fn build_austin_tables(
    intakes: &[AustinIntakeRecord],
    outcomes: &[AustinOutcomeRecord],
) -> BuildOutput {
    let mut registry = AnimalRegistry::new();
    let stats = vec![
        ingest_austin_intakes(intakes, &mut registry),
        ingest_austin_outcomes(outcomes, &mut registry),
    ];

    finish(&mut registry, stats)
}

/// Build the animal and impound tables from a Sacramento open-data extract,
/// which bundles an intake and an outcome per row with a reduced field set.
pub fn build_sac_open_tables(records: &[SacOpenRecord]) -> BuildOutput {
    let mut registry = AnimalRegistry::new();
    let stats = vec![ingest_sac_open(records, &mut registry)];

    finish(&mut registry, stats)
}

/// Build the animal and impound tables from a Sacramento CPRA extract, the
/// richer bundled shape with kennel, sub-type, and condition detail.
pub fn build_sac_cpra_tables(records: &[SacCpraRecord]) -> BuildOutput {
    let mut registry = AnimalRegistry::new();
    let stats = vec![ingest_sac_cpra(records, &mut registry)];

    finish(&mut registry, stats)
}
