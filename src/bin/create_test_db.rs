use std::path::Path;

use uuid::Uuid;

use station_metrics::adapters::db::{
    NewChangeRow, insert_change_row, open_connection, run_migrations, schema_version,
    upsert_product_title, upsert_station_metadata,
};
use station_metrics::domain::models::StationMetadata;

fn main() {
    if let Err(error) = run() {
        eprintln!("failed to create demo db: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut path = if cfg!(windows) {
        ".\\data\\stations_demo.db".to_string()
    } else {
        "./data/stations_demo.db".to_string()
    };
    let mut force = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--path" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--path requires a value".to_string());
                };
                path = value.clone();
                index += 2;
            }
            "--force" => {
                force = true;
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

    let path_ref = Path::new(&path);
    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    if force && path_ref.exists() {
        std::fs::remove_file(path_ref)
            .map_err(|error| format!("failed to remove existing db file: {error}"))?;
    }

    let mut connection = open_connection(&path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;
    let version = schema_version(&connection).map_err(|error| error.to_string())?;

    let seeded = seed_demo_data(&connection).map_err(|error| error.to_string())?;

    println!("created/updated demo db at: {path}");
    println!("schema version: {version}");
    println!("seeded {seeded} change row(s) for 3 stations over 14 days");
    Ok(())
}

fn change(station: &str, new_state: &str, product: Option<i64>, at: &str) -> NewChangeRow {
    NewChangeRow {
        station_id: station.to_string(),
        old_state: None,
        new_state: Some(new_state.to_string()),
        old_product_id: None,
        new_product_id: product,
        changed_at: Some(at.to_string()),
    }
}

/// Seeds a small but representative change log: daily busy blocks on two
/// stations, a mid-session product switch, one session left open at the
/// end of the log, one exact duplicate row and one unparseable timestamp.
fn seed_demo_data(
    connection: &rusqlite::Connection,
) -> Result<usize, station_metrics::adapters::db::DbError> {
    let station_a = Uuid::new_v4().to_string();
    let station_b = Uuid::new_v4().to_string();
    let station_c = Uuid::new_v4().to_string();

    let mut rows = Vec::new();

    for day in 1..=14 {
        rows.push(change(
            &station_a,
            "BUSY",
            Some(101),
            &format!("2026-08-{day:02}T10:00:00Z"),
        ));
        rows.push(change(
            &station_a,
            "FREE",
            None,
            &format!("2026-08-{day:02}T12:30:00Z"),
        ));
    }

    for day in (2..=14).step_by(2) {
        rows.push(change(
            &station_b,
            "BUSY",
            Some(102),
            &format!("2026-08-{day:02}T18:00:00Z"),
        ));
        // Product switch halfway through the evening block.
        rows.push(change(
            &station_b,
            "BUSY",
            Some(103),
            &format!("2026-08-{day:02}T19:00:00Z"),
        ));
        rows.push(change(
            &station_b,
            "FREE",
            None,
            &format!("2026-08-{day:02}T20:00:00Z"),
        ));
    }

    // Session still open when the log ends.
    rows.push(change(&station_c, "BUSY", Some(101), "2026-08-14T22:00:00Z"));

    // Exact duplicate of an existing row.
    rows.push(change(&station_a, "BUSY", Some(101), "2026-08-01T10:00:00Z"));

    // Unparseable timestamp; the normalizer counts and skips it.
    rows.push(change(&station_a, "FREE", None, "not-a-timestamp"));

    for row in &rows {
        insert_change_row(connection, row)?;
    }

    let fetched_at = "2026-08-15T00:00:00Z";
    upsert_station_metadata(
        connection,
        &StationMetadata {
            station_id: station_a.clone(),
            name: Some("Aurora-01".to_string()),
            city: Some("Kazan".to_string()),
            processor: Some("AMD 5600X".to_string()),
            graphic_names: Some("RTX 3070".to_string()),
            free_trial: Some(false),
            product_count: Some(12),
            ram_bytes: Some(34_359_738_368),
            graphic_ram_bytes: Some(8_589_934_592),
            longitude: Some(49.106),
            latitude: Some(55.796),
        },
        fetched_at,
    )?;
    upsert_station_metadata(
        connection,
        &StationMetadata {
            station_id: station_b.clone(),
            name: Some("Borealis-02".to_string()),
            city: Some("Moscow".to_string()),
            free_trial: Some(true),
            ..StationMetadata::default()
        },
        fetched_at,
    )?;

    upsert_product_title(connection, 101, Some("Cyber Race"), fetched_at)?;
    upsert_product_title(connection, 102, Some("Frost Siege"), fetched_at)?;
    upsert_product_title(connection, 103, Some("Night Rally"), fetched_at)?;

    Ok(rows.len())
}

fn print_help() {
    println!("create_test_db");
    println!();
    println!("Creates a sqlite database with the full schema and a small");
    println!("deterministic change log suitable for local pipeline runs.");
    println!();
    println!("Usage:");
    println!("  cargo run --bin create_test_db -- [--path <file>] [--force]");
    println!();
    println!("Options:");
    println!("  --path <file>   target sqlite file (default: ./data/stations_demo.db)");
    println!("  --force         delete existing file before creating");
}
