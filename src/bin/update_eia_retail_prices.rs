use std::{
    error::Error,
    path::{Path, PathBuf},
};

use clap::Parser;
use eia_prices::{
    config::Config,
    db::eia::{
        lib_eia::EiaClient,
        retail_price::Row,
        retail_price_archive::{EiaRetailPriceArchive, WatermarkReader},
    },
};
use log::{info, warn};
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Path to the YAML settings file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Fetch and clean the data but don't write anything to DuckDB
    #[arg(long)]
    dry_run: bool,

    /// Show the first rows stored and the row count by sector
    #[arg(long)]
    verify: bool,
}

/// Make an ASCII table from the data
fn ascii_table(rows: &[Row]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Month", "State", "Sector", "Price", "Units"]);
    for row in rows {
        builder.push_record(vec![
            row.month.clone(),
            row.state.clone(),
            row.sector.clone(),
            row.price.to_string(),
            row.units.clone(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

/// Run this job once a month, EIA publishes the retail prices with a lag
/// of about two months.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    // the API key lives in the .env file
    let env_file = format!(".env/{}.env", args.env);
    if let Err(e) = dotenvy::from_path(Path::new(&env_file)) {
        warn!("Could not read {}: {}", env_file, e);
    }

    let config = Config::load(&args.config)?;
    let archive = EiaRetailPriceArchive::from_config(&config);
    let client = EiaClient::from_env(&config);
    if args.dry_run {
        let watermark = archive
            .connect_read_only()?
            .and_then(|conn| conn.latest_month(&archive.table_name));
        println!("Latest month in database: {:?}", watermark);
        let (rows, extracted) = archive.extract_new_rows(&client, watermark.as_deref())?;
        println!("{}", ascii_table(&rows));
        println!(
            "Dry run, {} rows extracted, {} rows would be loaded",
            extracted,
            rows.len()
        );
        return Ok(());
    }

    let conn = archive.connect()?;
    let summary = archive.update_duckdb(&client, &conn)?;
    println!("Latest month in database: {:?}", summary.watermark);
    info!("{} rows extracted before the watermark filter", summary.extracted);
    if summary.loaded > 0 {
        println!(
            "Incremental ETL job finished. Records updated: {}",
            summary.loaded
        );
    } else {
        println!("No data extracted. Check your API key as it expires within 7 days!");
    }

    if args.verify {
        let rows = archive.get_data(&conn, 5)?;
        println!("First {} rows in the database:\n{}", rows.len(), ascii_table(&rows));
        for (sector, n) in archive.sector_counts(&conn)? {
            info!("sector {}: {} rows", sector, n);
        }
    }

    Ok(())
}
