//! nregacache CLI - district-level MGNREGA employment summaries.
//!
//! Queries the public data.gov.in MGNREGA dataset through a local
//! freshness cache, so repeated lookups for the same state and fiscal year
//! cost nothing. The first query for a slice pulls every upstream page and
//! can take several seconds.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nregacache::utils::{fmt_avg, fmt_count};
use nregacache::{ApiClient, CacheBuilder, Config, DistrictSummary, FileStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  nregacache <state> <fin_year> <district>   query a district summary");
    eprintln!("  nregacache --states                        list known states");
    eprintln!("  nregacache --districts <state>             list known districts");
    eprintln!("  nregacache --preview <state> <fin_year>    print the first-page API URL");
    eprintln!();
    eprintln!("Example: nregacache ODISHA 2024-2025 PURI");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::load()?;

    match args.as_slice() {
        [flag] if flag == "--states" => {
            let store = FileStore::open(&config.data_dir())?;
            list_states(&store)
        }
        [flag, state] if flag == "--districts" => {
            let store = FileStore::open(&config.data_dir())?;
            list_districts(&store, state)
        }
        [flag, state, fin_year] if flag == "--preview" => {
            let client = ApiClient::new(&config)?;
            println!("{}", client.page_url(state, fin_year, 0));
            Ok(())
        }
        [state, fin_year, district] => {
            run_query(&config, state, fin_year, district).await
        }
        _ => usage(),
    }
}

fn list_states(store: &FileStore) -> Result<()> {
    use nregacache::DistrictRegistry;

    let states = store.states()?;
    if states.is_empty() {
        println!("No states cached yet. Run a query first.");
        return Ok(());
    }
    for state in states {
        println!("{}", state);
    }
    Ok(())
}

fn list_districts(store: &FileStore, state: &str) -> Result<()> {
    use nregacache::DistrictRegistry;

    let districts = store.list(state)?;
    if districts.is_empty() {
        println!("No districts known for '{}'. Run a query first.", state);
        return Ok(());
    }
    for district in districts {
        println!("{}", district);
    }
    Ok(())
}

async fn run_query(config: &Config, state: &str, fin_year: &str, district: &str) -> Result<()> {
    let store = Arc::new(FileStore::open(&config.data_dir())?);
    let client = Arc::new(ApiClient::new(config)?);
    let builder = CacheBuilder::new(client, store.clone(), store, config.ttl());

    info!(state, fin_year, district, "running district query");
    let summary = builder.get_summary(state, fin_year, district).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &DistrictSummary) {
    let Some(ref matched) = summary.matched_district else {
        println!(
            "No data found for district '{}' in {} {}.",
            summary.query, summary.state, summary.fin_year
        );
        if !summary.districts_known.is_empty() {
            println!();
            println!("Known districts for {}:", summary.state);
            for district in &summary.districts_known {
                println!("  {}", district);
            }
        }
        return;
    };

    println!(
        "{} - {} ({} records)",
        matched,
        summary.fin_year,
        fmt_count(summary.records.len())
    );

    let Some(ref headline) = summary.headline else {
        println!("Records found, but none carry a parseable month.");
        return;
    };

    println!();
    println!("Latest month with data: {}", headline.month);
    println!("  Households worked:     {}", fmt_avg(headline.households_worked));
    println!("  Individuals worked:    {}", fmt_avg(headline.individuals_worked));
    println!("  Persondays:            {}", fmt_avg(headline.persondays));
    println!("  Wages:                 {}", fmt_avg(headline.wages));
    println!("  Avg days/household:    {}", fmt_avg(headline.avg_days_per_household));

    println!();
    println!(
        "{:<6} {:>8} {:>14} {:>14} {:>14} {:>14} {:>12}",
        "Month", "Records", "Households", "Individuals", "Persondays", "Wages", "Avg days/HH"
    );
    for row in &summary.monthly {
        println!(
            "{:<6} {:>8} {:>14} {:>14} {:>14} {:>14} {:>12}",
            row.month,
            fmt_count(row.records),
            fmt_avg(row.households_worked),
            fmt_avg(row.individuals_worked),
            fmt_avg(row.persondays),
            fmt_avg(row.wages),
            fmt_avg(row.avg_days_per_household),
        );
    }
}
