use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod db;
mod filter;
mod models;
mod report;

use models::{FilterSpec, ResultFilter, RowKey};

#[derive(Parser)]
#[command(name = "ultratork-results")]
#[command(about = "Test execution result dashboard for the UltraTork test framework", long_about = None)]
struct Cli {
    /// Connection config file (DATABASE_URL takes precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import result rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List known testplace names
    Testplaces,
    /// Filtered result table for one testplace
    Results {
        #[arg(long)]
        testplace: String,
        /// ALL or a result tag (matched case-insensitively)
        #[arg(long, default_value = "ALL")]
        result: ResultFilter,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// Status cards and chart tables across testplaces
    Overview {
        #[arg(long = "testplace")]
        testplaces: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Drill into one result row, by flat index or by stable key
    #[command(group(
        ArgGroup::new("selector")
            .args(["index", "run"])
            .required(true)
            .multiple(false)
    ))]
    Detail {
        #[arg(long)]
        testplace: String,
        /// Nr. from the rendered table; pair with the same filter flags the
        /// table was rendered with
        #[arg(long)]
        index: Option<usize>,
        /// ALL or a result tag (matched case-insensitively)
        #[arg(long, default_value = "ALL")]
        result: ResultFilter,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Run timestamp of the row (use with --name and --try-count)
        #[arg(long)]
        run: Option<String>,
        #[arg(long, requires = "run")]
        name: Option<String>,
        #[arg(long, requires = "run")]
        try_count: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = config::database_url(cli.config.as_deref())?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} result rows from {}.", csv.display());
        }
        Commands::Testplaces => {
            let names = db::fetch_testplace_names(&pool).await?;
            if names.is_empty() {
                println!("No testplaces configured.");
            }
            for name in names {
                println!("- {name}");
            }
        }
        Commands::Results {
            testplace,
            result,
            start_date,
            end_date,
        } => {
            let groups = db::fetch_result_groups(&pool, &testplace).await?;
            let spec = FilterSpec {
                result,
                start_date,
                end_date,
            };
            let filtered = filter::apply(&groups, &spec)
                .with_context(|| format!("failed to filter results for {testplace}"))?;
            print!("{}", report::results_table(&testplace, &filtered));
        }
        Commands::Overview { testplaces, out } => {
            let mut selected = Vec::new();
            if testplaces.is_empty() {
                tracing::info!("no testplaces selected, rendering placeholder");
            }
            for name in &testplaces {
                let groups = db::fetch_result_groups(&pool, name).await?;
                selected.push((name.clone(), groups));
            }

            let bundle = aggregate::overview(&selected);
            let rendered = report::overview_report(&bundle);
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Overview written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Detail {
            testplace,
            index,
            result,
            start_date,
            end_date,
            run,
            name,
            try_count,
        } => {
            let groups = db::fetch_result_groups(&pool, &testplace).await?;

            match (index, run) {
                (Some(index), _) => {
                    // The Nr. column numbers the filtered rendering, so the
                    // index must resolve against the same filtered view.
                    let spec = FilterSpec {
                        result,
                        start_date,
                        end_date,
                    };
                    let filtered = filter::apply(&groups, &spec)
                        .with_context(|| format!("failed to filter results for {testplace}"))?;
                    let (group, record) = filter::locate_by_index(&filtered, index)?;
                    print!("{}", report::detail_panel(group, record));
                }
                (None, Some(run)) => {
                    let key = RowKey {
                        ran_at: run,
                        test_name: name.context("--run also needs --name")?,
                        try_count: try_count.context("--run also needs --try-count")?,
                    };
                    let (group, record) = filter::locate_by_key(&groups, &key)?;
                    print!("{}", report::detail_panel(group, record));
                }
                (None, None) => unreachable!("clap enforces the selector group"),
            }
        }
    }

    Ok(())
}
