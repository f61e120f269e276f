//! Walk a map session through filtering, clustering and live search.
//!
//! Run with: cargo run --example session_walkthrough

use facility_map::{FacilityRecord, FilterCriteria, GeoPoint, Intent, MapSession};

fn facility(id: u64, name: &str, district: &str, sports: &str, lat: f64, lng: f64) -> FacilityRecord {
    FacilityRecord {
        id,
        name: Some(name.to_string()),
        district: Some(district.to_string()),
        sports: Some(sports.to_string()),
        location: Some(GeoPoint::new(lat, lng)),
        ..Default::default()
    }
}

fn main() {
    let records = vec![
        facility(1, "Стадион «Петровский»", "Петроградский", "Футбол", 59.9515, 30.2869),
        facility(2, "СК «Юбилейный»", "Петроградский", "Хоккей, Фигурное катание", 59.9522, 30.2936),
        facility(3, "Газпром Арена", "Петроградский", "Футбол", 59.9730, 30.2210),
        facility(4, "Бассейн «Волна»", "Московский", "Плавание", 59.8520, 30.3210),
        facility(5, "Площадка у школы №1", "Московский", "Баскетбол, Футбол", 59.8535, 30.3225),
    ];

    let mut session = MapSession::default();
    session.load(records);

    println!("Facility Map Walkthrough\n");
    println!("Loaded {} facilities", session.total_count());
    print_clusters(&session);

    println!("\nZooming in to 15:");
    session.set_zoom(15.0);
    print_clusters(&session);

    println!("\nFilter: sport type \"футбол\"");
    session.set_criteria(FilterCriteria::default().with_sport_type("футбол"));
    println!("  visible: {}/{}", session.visible_count(), session.total_count());
    print_clusters(&session);

    println!("\nLive search \"фут\":");
    session.set_query("фут");
    for m in session.suggestions() {
        println!("  #{} {} | {}", m.record.id, m.highlighted_name.to_markup(), m.highlighted_sports.to_markup());
    }

    println!("\nPicking the first cluster:");
    if let Some(anchor) = session.clusters().first().map(|c| c.anchor) {
        match session.resolve_pick(anchor) {
            Intent::ShowDetail(record) => println!("  show detail for {}", record.display_name()),
            Intent::FitBounds { bounds, .. } => println!(
                "  fit bounds {:.4}..{:.4}N {:.4}..{:.4}E",
                bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng
            ),
            other => println!("  {:?}", other),
        }
    }
}

fn print_clusters(session: &MapSession) {
    for cluster in session.clusters() {
        let style = cluster.style();
        let ids: Vec<u64> = cluster.members.iter().map(|r| r.id).collect();
        println!(
            "  cluster at ({:.0}, {:.0}) r={} {} -> {:?}",
            cluster.anchor.x, cluster.anchor.y, style.radius, style.fill, ids
        );
    }
}
