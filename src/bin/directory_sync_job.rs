use chrono::{SecondsFormat, Utc};

use station_metrics::adapters::db::{
    gather_station_ids, open_connection, run_migrations, upsert_product_title,
    upsert_station_metadata,
};
use station_metrics::adapters::directory::{DEFAULT_BASE_URL, DirectoryClient};

fn main() {
    if let Err(error) = run() {
        eprintln!("directory sync failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut db_path: Option<String> = None;
    let mut base_url = DEFAULT_BASE_URL.to_string();
    let mut verbose = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--db" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--db requires a value".to_string());
                };
                db_path = Some(value.clone());
                index += 2;
            }
            "--base-url" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--base-url requires a value".to_string());
                };
                base_url = value.clone();
                index += 2;
            }
            "--verbose" => {
                verbose = true;
                index += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    let Some(db_path) = db_path else {
        return Err("--db <file> is required".to_string());
    };

    let mut connection = open_connection(&db_path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;

    let station_ids = gather_station_ids(&connection).map_err(|error| error.to_string())?;
    println!("found {} station id(s) in the change log", station_ids.len());

    let client = DirectoryClient::new(&base_url).map_err(|error| error.to_string())?;
    let fetched_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    match client.fetch_product_titles() {
        Ok(titles) => {
            for (product_id, title) in &titles {
                upsert_product_title(&connection, *product_id, Some(title), &fetched_at)
                    .map_err(|error| error.to_string())?;
            }
            println!("stored {} product title(s)", titles.len());
        }
        Err(error) => {
            println!("product list unavailable, keeping cached titles: {error}");
        }
    }

    let mut saved = 0_usize;
    let mut skipped = 0_usize;
    for station_id in &station_ids {
        match client.fetch_station_metadata(station_id) {
            Ok(Some(metadata)) => {
                upsert_station_metadata(&connection, &metadata, &fetched_at)
                    .map_err(|error| error.to_string())?;
                saved += 1;
                if verbose {
                    println!("saved directory entry for {station_id}");
                }
            }
            Ok(None) => {
                skipped += 1;
                if verbose {
                    println!("skipping {station_id}: unknown to the directory");
                }
            }
            Err(error) => {
                skipped += 1;
                println!("skipping {station_id}: {error}");
            }
        }
    }

    println!("directory sync done: {saved} saved, {skipped} skipped");
    Ok(())
}

fn print_help() {
    println!("directory_sync_job");
    println!();
    println!("Fetches station and product metadata for every station id present");
    println!("in the change log and stores it in the local directory cache.");
    println!();
    println!("Usage:");
    println!("  cargo run --bin directory_sync_job -- --db <file> [--base-url <url>] [--verbose]");
}
