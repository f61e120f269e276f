//! Fetch facilities from a running API and print cluster statistics.
//!
//! Run with: cargo run --example fetch_and_cluster --features http [base_url]

use facility_map::{FacilitySource, MapSession, SourceConfig};
use std::time::Instant;

#[tokio::main]
async fn main() {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SourceConfig::default().base_url);

    let source = match FacilitySource::new(SourceConfig { base_url: base_url.clone(), ..Default::default() }) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to create source: {}", e);
            return;
        }
    };

    let mut session = MapSession::default();
    let start = Instant::now();
    match source.load_session(&mut session).await {
        Ok(count) => println!("Loaded {} facilities from {} in {:?}", count, base_url, start.elapsed()),
        Err(e) => {
            eprintln!("Load failed: {}", e);
            return;
        }
    }

    println!(
        "{} plottable, {} districts, {} sport types",
        session.store().plottable_count(),
        session.filter_options().districts.len(),
        session.filter_options().sport_types.len()
    );

    println!("\nTop districts:");
    for (district, count) in session.store().district_counts(5) {
        println!("  {:<30} {}", district, count);
    }

    println!("\nClusters per distance:");
    for distance in [0.0, 10.0, 20.0, 40.0, 80.0] {
        let start = Instant::now();
        session.set_distance(distance);
        println!("  {:>4}px: {:>5} clusters ({:?})", distance, session.clusters().len(), start.elapsed());
    }
}
