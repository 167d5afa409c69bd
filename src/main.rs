use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use placement_eligibility::config::{Config, CriteriaDefaults};
use placement_eligibility::db::{setup, PostgresStore, ResultTable};
use placement_eligibility::eligibility::{self, EligibilityOutcome};
use placement_eligibility::export::{self, OutputFormat};
use placement_eligibility::insights::Insight;
use placement_eligibility::logging;
use placement_eligibility::models::{EligibilityCriteria, PlacementStatus};
use placement_eligibility::report;
use placement_eligibility::runner::ReportRunner;

#[derive(Parser)]
#[command(name = "placement-eligibility")]
#[command(about = "Placement eligibility finder and insight reports over student records", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// TOML file with [connection] and [criteria] sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct CriteriaArgs {
    /// Minimum problems solved [default: 50]
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..))]
    min_problems: Option<i32>,
    /// Minimum soft skills average, 0-100 [default: 75]
    #[arg(long)]
    min_soft_avg: Option<f64>,
    /// Minimum mock interview score, 0-100 [default: 60]
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=100))]
    min_mock: Option<i32>,
    /// Restrict to a batch; repeat for several
    #[arg(long = "batch")]
    batches: Vec<String>,
    /// Programming language, or "Any"
    #[arg(long)]
    language: Option<String>,
    /// Ready, "Not Ready", Placed, or "Any"
    #[arg(long)]
    status: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample cohort
    Seed,
    /// Import student profiles from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the batches present in the database
    Batches,
    /// Find students meeting the eligibility criteria
    Eligible {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Evaluate a CSV snapshot of student profiles instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run the fixed insight reports
    Insights {
        /// Run only this insight (1-10)
        #[arg(long)]
        number: Option<Insight>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report with eligible students and every insight
    Report {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Maps the "Any" choice to no filter.
fn optional_filter(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("any"))
}

impl CriteriaArgs {
    fn into_criteria(self, defaults: &CriteriaDefaults) -> anyhow::Result<EligibilityCriteria> {
        let base = EligibilityCriteria::default();
        let min_soft_avg = self
            .min_soft_avg
            .or(defaults.min_soft_avg)
            .unwrap_or(base.min_soft_avg);
        if !(0.0..=100.0).contains(&min_soft_avg) {
            bail!("--min-soft-avg must be between 0 and 100, got {min_soft_avg}");
        }

        let status = optional_filter(self.status)
            .map(|s| s.parse::<PlacementStatus>())
            .transpose()
            .map_err(anyhow::Error::msg)?;

        let batches = self
            .batches
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();

        Ok(EligibilityCriteria {
            min_problems: self
                .min_problems
                .or(defaults.min_problems)
                .unwrap_or(base.min_problems),
            min_soft_avg,
            min_mock: self.min_mock.or(defaults.min_mock).unwrap_or(base.min_mock),
            batches,
            language: optional_filter(self.language),
            status,
        })
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn emit(table: &ResultTable, format: OutputFormat, out: Option<&Path>) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = match out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        OutputFormat::Table => writer.write_all(export::render_text(table).as_bytes())?,
        OutputFormat::Csv => export::write_csv(table, &mut writer)?,
        OutputFormat::Json => {
            export::write_json(table, &mut writer)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    if let Some(path) = out {
        println!("Wrote {} rows to {}.", table.row_count(), path.display());
    }
    Ok(())
}

fn print_outcome(
    outcome: &EligibilityOutcome,
    format: OutputFormat,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let annotate = format == OutputFormat::Table || out.is_some();

    if annotate {
        println!("{}", outcome.summary_line());
    }
    if outcome.table.is_empty() && format == OutputFormat::Table && out.is_none() {
        return Ok(());
    }

    emit(&outcome.table, format, out)?;

    if annotate && !outcome.by_batch.is_empty() {
        println!("Eligible count by batch:");
        for batch in &outcome.by_batch {
            println!("- {}: {}", batch.course_batch, batch.eligible_count);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_stderr_logging(cli.verbose);
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        database_url,
        config: config_path,
        command,
        ..
    } = cli;
    let config = load_config(config_path.as_deref())?;

    // Snapshot evaluation never connects, so settings are resolved per command.
    let connection = || {
        config
            .resolve_connection(database_url.as_deref())
            .context("invalid database connection settings")
    };

    match command {
        Commands::InitDb => {
            let pool = setup::connect_pool(&connection()?).await?;
            setup::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = setup::connect_pool(&connection()?).await?;
            let count = setup::seed(&pool).await?;
            println!("Seeded {count} students.");
        }
        Commands::Import { csv } => {
            let pool = setup::connect_pool(&connection()?).await?;
            let written = setup::import_csv(&pool, &csv).await?;
            println!("Imported {written} students from {}.", csv.display());
        }
        Commands::Batches => {
            let runner = ReportRunner::new(PostgresStore::new(connection()?));
            let batches = runner.list_batches().await?;
            if batches.is_empty() {
                println!("No batches found.");
            }
            for batch in batches {
                println!("{batch}");
            }
        }
        Commands::Eligible {
            criteria,
            format,
            out,
            snapshot,
        } => {
            let criteria = criteria.into_criteria(&config.criteria)?;
            let outcome = match snapshot {
                Some(path) => {
                    let profiles = eligibility::load_snapshot(&path)
                        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
                    eligibility::evaluate_snapshot(&criteria, &profiles)
                }
                None => {
                    let runner = ReportRunner::new(PostgresStore::new(connection()?));
                    runner.find_eligible(&criteria).await?
                }
            };
            print_outcome(&outcome, format, out.as_deref())?;
        }
        Commands::Insights {
            number,
            format,
            out,
        } => {
            let runner = ReportRunner::new(PostgresStore::new(connection()?));
            match number {
                Some(insight) => {
                    let table = runner.run_insight(insight).await?;
                    if format == OutputFormat::Table {
                        println!("{insight}");
                    }
                    emit(&table, format, out.as_deref())?;
                }
                None => {
                    if out.is_some() {
                        bail!("--out needs --number when running every insight; use `report` for a combined file");
                    }
                    for (insight, table) in runner.run_all_insights().await? {
                        if format == OutputFormat::Table {
                            println!("{insight}");
                        }
                        emit(&table, format, None)?;
                        println!();
                    }
                }
            }
        }
        Commands::Report { criteria, out } => {
            let criteria = criteria.into_criteria(&config.criteria)?;
            let runner = ReportRunner::new(PostgresStore::new(connection()?));
            let outcome = runner.find_eligible(&criteria).await?;
            let insights = runner.run_all_insights().await?;
            let report = report::build_report(
                Utc::now().date_naive(),
                &criteria,
                &outcome,
                &insights,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
