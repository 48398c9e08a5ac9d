//! Writes a synthetic CSV file for exercising uploads, paging and search.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;

#[derive(Parser, Debug)]
#[command(name = "generate-csv", about = "Generate a test CSV file")]
struct Args {
    /// Number of data rows to write
    #[arg(short, long, default_value_t = 100_000)]
    rows: usize,

    /// Output path (defaults to test_data_<rows>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("test_data_{}.csv", args.rows)));

    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut rng = rand::thread_rng();

    wtr.write_record(["ID", "Name", "Email", "City", "Age"])?;
    for i in 1..=args.rows {
        wtr.write_record([
            i.to_string(),
            format!("User {i}"),
            format!("user{i}@email.com"),
            format!("City {}", rng.gen_range(1..=100)),
            rng.gen_range(20..60).to_string(),
        ])
        .with_context(|| format!("Failed to write row {i}"))?;
    }
    wtr.flush()?;

    println!("Generated {} with {} rows", path.display(), args.rows);
    Ok(())
}
