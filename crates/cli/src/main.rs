use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use growth_core::classification::classify;
use growth_core::config::resolve_reference_path;
use growth_core::constants::{DEFAULT_PATIENT_DATA_DIR, PERCENTILE_DECIMALS};
use growth_core::percentile::{percentile, round_to};
use growth_core::repositories::DateRange;
use growth_core::{
    AccessContext, ChartType, CoreConfig, FileRepository, Gender, GrowthResult, GrowthService,
    MokaCache, PatientId, ReferenceStore, ReferenceTable,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "growth")]
#[command(about = "Pediatric growth analytics CLI (WHO Child Growth Standards)")]
struct Cli {
    /// Reference table YAML (defaults to GROWTH_REFERENCE_PATH, then the bundled table)
    #[arg(long, global = true)]
    reference: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Z-score, percentile and classification for one measurement
    ZScore {
        /// MALE or FEMALE
        gender: String,
        /// WFA, HFA or HcFA
        chart: String,
        /// Age in days
        age_days: i64,
        /// Measured value (kg or cm)
        value: f64,
    },
    /// Convert a Z-score to a percentile
    Percentile {
        #[arg(allow_negative_numbers = true)]
        z: f64,
    },
    /// Classify a Z-score on a chart
    Classify {
        /// WFA, HFA or HcFA
        chart: String,
        #[arg(allow_negative_numbers = true)]
        z: f64,
    },
    /// Load a reference table and report its series
    ValidateReference {
        /// Path to the YAML table
        path: PathBuf,
    },
    /// Growth trend for a patient stored under PATIENT_DATA_DIR
    Trends {
        /// Patient id (32 hex characters)
        patient_id: String,
        /// WFA, HFA or HcFA
        chart: String,
        /// Tenant the patient belongs to
        #[arg(long)]
        tenant: String,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn load_reference(override_path: Option<PathBuf>) -> GrowthResult<ReferenceTable> {
    let override_path =
        override_path.or_else(|| std::env::var("GROWTH_REFERENCE_PATH").ok().map(PathBuf::from));
    let path = resolve_reference_path(override_path)?;
    ReferenceTable::load_or_bundled(path.as_deref())
}

fn service(reference: Option<PathBuf>) -> GrowthResult<GrowthService> {
    let data_dir = PathBuf::from(
        std::env::var("PATIENT_DATA_DIR").unwrap_or_else(|_| DEFAULT_PATIENT_DATA_DIR.into()),
    );
    let cfg = Arc::new(CoreConfig::new(data_dir.clone(), reference.clone()));
    Ok(GrowthService::new(
        cfg.clone(),
        Arc::new(load_reference(reference)?),
        Arc::new(FileRepository::new(data_dir)),
        Arc::new(MokaCache::new(cfg.cache_capacity())),
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::ZScore {
            gender,
            chart,
            age_days,
            value,
        }) => {
            let gender: Gender = gender.parse()?;
            let chart: ChartType = chart.parse()?;
            match service(cli.reference)
                .and_then(|s| s.calculate_z_score(gender, chart, age_days, value))
            {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => eprintln!("Error calculating z-score: {}", e),
            }
        }
        Some(Commands::Percentile { z }) => {
            println!("{}", round_to(percentile(z), PERCENTILE_DECIMALS));
        }
        Some(Commands::Classify { chart, z }) => {
            let chart: ChartType = chart.parse()?;
            println!("{}", classify(chart, z));
        }
        Some(Commands::ValidateReference { path }) => match ReferenceTable::load(&path) {
            Ok(table) => {
                println!("{}: {} rows from '{}'", path.display(), table.len(), table.source());
                for gender in [Gender::Male, Gender::Female] {
                    for chart in ChartType::ALL {
                        let rows = table.rows(gender, chart);
                        match (rows.first(), rows.last()) {
                            (Some(first), Some(last)) => println!(
                                "  {gender} {chart}: {} rows, days {}..={}",
                                rows.len(),
                                first.age_days,
                                last.age_days
                            ),
                            _ => println!("  {gender} {chart}: missing"),
                        }
                    }
                }
            }
            Err(e) => eprintln!("Error loading reference table: {}", e),
        },
        Some(Commands::Trends {
            patient_id,
            chart,
            tenant,
            from,
            to,
        }) => {
            let patient_id = PatientId::parse(&patient_id)?;
            let chart: ChartType = chart.parse()?;
            let result = AccessContext::for_tenant(&tenant).and_then(|ctx| {
                let range = DateRange::new(from, to)?;
                service(cli.reference)?.get_growth_trends(&ctx, &patient_id, chart, Some(range))
            });
            match result {
                Ok(trends) => println!("{}", serde_json::to_string_pretty(&trends)?),
                Err(e) => eprintln!("Error reading trends: {}", e),
            }
        }
        None => {
            println!("Use --help for usage");
        }
    }

    Ok(())
}
