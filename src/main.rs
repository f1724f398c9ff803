use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use impound_tables::{
    build_austin_tables, build_sac_cpra_tables, build_sac_open_tables, detect_sac_shape,
    load_austin_intakes, load_austin_outcomes, load_sac_cpra, load_sac_open, BuildOutput,
    IngestStats, SourceKind, Warning,
};

/// Discrepancy trail and ingest tallies, written alongside the tables so a
/// downstream job can audit the run without re-parsing console output.
#[derive(Serialize)]
struct RunReport<'a> {
    stats: &'a [IngestStats],
    warnings: &'a [Warning],
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("austin") if args.len() == 5 => {
            run_austin(Path::new(&args[2]), Path::new(&args[3]), Path::new(&args[4]))
        }
        Some("sacramento") if args.len() == 4 => {
            run_sacramento(Path::new(&args[2]), Path::new(&args[3]))
        }
        _ => {
            eprintln!("Usage:");
            eprintln!("  impound-tables austin <intakes.csv> <outcomes.csv> <out-dir>");
            eprintln!("  impound-tables sacramento <impounds.csv> <out-dir>");
            std::process::exit(2);
        }
    }
}

fn run_austin(intake_path: &Path, outcome_path: &Path, out_dir: &Path) -> Result<()> {
    println!("🐾 Building tables from Austin intake and outcome extracts");

    let intakes = load_austin_intakes(intake_path)?;
    println!("✓ Loaded {} intake records", intakes.len());

    let outcomes = load_austin_outcomes(outcome_path)?;
    println!("✓ Loaded {} outcome records", outcomes.len());

    let output = build_austin_tables(&intakes, &outcomes);
    write_output(&output, out_dir)
}

fn run_sacramento(impound_path: &Path, out_dir: &Path) -> Result<()> {
    // CPRA extracts carry more columns than open-data extracts; probe the
    // headers rather than making the caller say which one this is.
    let shape = detect_sac_shape(impound_path)?;
    println!("🐾 Building tables from {}", shape.name());

    let output = match shape {
        SourceKind::SacramentoCpra => {
            let records = load_sac_cpra(impound_path)?;
            println!("✓ Loaded {} impound records", records.len());
            build_sac_cpra_tables(&records)
        }
        SourceKind::SacramentoOpen => {
            let records = load_sac_open(impound_path)?;
            println!("✓ Loaded {} impound records", records.len());
            build_sac_open_tables(&records)
        }
        other => bail!("{} is not a Sacramento shape", other.name()),
    };

    write_output(&output, out_dir)
}

fn write_output(output: &BuildOutput, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let animal_path: PathBuf = out_dir.join("animals.csv");
    let impound_path: PathBuf = out_dir.join("impounds.csv");
    let report_path: PathBuf = out_dir.join("report.json");

    output.animals.write_csv(&animal_path)?;
    output.impounds.write_csv(&impound_path)?;

    let report = RunReport {
        stats: &output.stats,
        warnings: &output.warnings,
    };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&report_path, json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    for stats in &output.stats {
        println!(
            "✓ {}: {} rows ingested, {} skipped",
            stats.source.name(),
            stats.ingested(),
            stats.skipped
        );
    }
    println!(
        "✓ Wrote {} animals and {} impounds to {}",
        output.animals.len(),
        output.impounds.len(),
        out_dir.display()
    );

    if output.warnings.is_empty() {
        println!("✓ No reconciliation discrepancies");
    } else {
        println!("⚠️  {} reconciliation discrepancies:", output.warnings.len());
        for warning in &output.warnings {
            eprintln!("   {}", warning);
        }
    }

    Ok(())
}
