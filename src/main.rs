fn main() {
    if let Err(err) = station_metrics::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
