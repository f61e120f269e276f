//! Session context tying the components together.
//!
//! A [`MapSession`] owns the record store and everything derived from it.
//! Every setter recomputes what depends on it synchronously and then notifies
//! observers, so a recomputation always sees the latest committed criteria and
//! thresholds; there is no queue of pending updates to fall behind.
//!
//! ```text
//! RecordStore ──filter──▶ filtered set ──cluster──▶ clusters ──▶ observers
//!      └────────suggest──────────────────────────▶ suggestions ─▶ observers
//! ```

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::cluster::{cluster_records, Cluster, ClusterConfig, ClusterIndex};
use crate::filter::apply_filter;
use crate::store::{FilterOptions, RecordStore};
use crate::suggest::{suggest, SuggestConfig, SuggestionMatch};
use crate::viewport::{resolve_search_pick, resolve_selection, Intent, ViewConfig};
use crate::{FacilityRecord, FilterCriteria, MapError, PixelPoint, Projector, Result};

/// Receives notifications after each recomputation.
///
/// All methods default to no-ops so observers implement only what they draw.
pub trait SessionObserver: Send + Sync {
    fn on_filtered_set_changed(&self, _records: &[Arc<FacilityRecord>]) {}
    fn on_clusters_changed(&self, _clusters: &[Cluster]) {}
    fn on_suggestions_changed(&self, _matches: &[SuggestionMatch]) {}
    fn on_load_failed(&self, _error: &MapError) {}
}

/// Explicit owner of all map state for one session.
pub struct MapSession {
    store: RecordStore,
    filter_options: FilterOptions,
    criteria: FilterCriteria,
    cluster_config: ClusterConfig,
    suggest_config: SuggestConfig,
    view_config: ViewConfig,
    projector: Projector,
    query: String,
    load_error: Option<MapError>,

    filtered: Vec<Arc<FacilityRecord>>,
    clusters: Vec<Cluster>,
    cluster_index: ClusterIndex,
    suggestions: Vec<SuggestionMatch>,

    observers: Vec<Arc<dyn SessionObserver>>,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(ClusterConfig::default(), SuggestConfig::default(), ViewConfig::default())
    }
}

impl MapSession {
    pub fn new(
        cluster_config: ClusterConfig,
        suggest_config: SuggestConfig,
        view_config: ViewConfig,
    ) -> Self {
        Self {
            store: RecordStore::new(),
            filter_options: FilterOptions::default(),
            criteria: FilterCriteria::default(),
            cluster_config,
            suggest_config,
            view_config,
            projector: Projector::new(view_config.zoom),
            query: String::new(),
            load_error: None,
            filtered: Vec::new(),
            clusters: Vec::new(),
            cluster_index: ClusterIndex::new(&[]),
            suggestions: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Replace the dataset and rebuild every derived set.
    pub fn load(&mut self, records: Vec<FacilityRecord>) -> usize {
        let count = self.store.load(records);
        self.load_error = None;
        info!("[MapSession] Dataset replaced: {} facilities", count);

        self.refilter();
        self.refresh_suggestions();
        count
    }

    /// Apply the outcome of a data-source fetch.
    ///
    /// On failure the store is emptied, observers get `on_load_failed` followed
    /// by empty derived sets, and the error is returned.
    pub fn load_result(&mut self, result: Result<Vec<FacilityRecord>>) -> Result<usize> {
        match result {
            Ok(records) => Ok(self.load(records)),
            Err(error) => {
                warn!("[MapSession] Load failed: {}", error);
                self.store.clear();
                self.load_error = Some(error.clone());
                for observer in &self.observers {
                    observer.on_load_failed(&error);
                }
                self.refilter();
                self.refresh_suggestions();
                Err(error)
            }
        }
    }

    /// Store the district and sport-type filter choices.
    pub fn set_filter_options(&mut self, options: FilterOptions) {
        debug!(
            "[MapSession] Filter options: {} districts, {} sport types",
            options.districts.len(),
            options.sport_types.len()
        );
        self.filter_options = options;
    }

    /// Back to an empty session. Observers and configuration are kept.
    pub fn reset(&mut self) {
        self.store.clear();
        self.filter_options = FilterOptions::default();
        self.criteria = FilterCriteria::default();
        self.query.clear();
        self.load_error = None;
        self.projector = Projector::new(self.view_config.zoom);
        self.refilter();
        self.refresh_suggestions();
    }

    // ------------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------------

    /// Non-finite values are ignored and the current threshold is kept.
    pub fn set_distance(&mut self, distance_px: f64) {
        if !distance_px.is_finite() {
            warn!("[MapSession] Ignoring non-finite cluster distance {}", distance_px);
            return;
        }
        self.cluster_config.distance_px = distance_px;
        self.recluster();
    }

    pub fn set_min_distance(&mut self, min_distance_px: f64) {
        if !min_distance_px.is_finite() {
            warn!("[MapSession] Ignoring non-finite min distance {}", min_distance_px);
            return;
        }
        self.cluster_config.min_distance_px = min_distance_px;
        self.recluster();
    }

    /// Pixel distances depend on resolution, so zooming re-clusters.
    ///
    /// A non-finite zoom would project every point to NaN, so it is ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            warn!("[MapSession] Ignoring non-finite zoom {}", zoom);
            return;
        }
        if zoom == self.projector.zoom() {
            return;
        }
        self.projector = Projector::new(zoom);
        self.recluster();
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    /// Clear all filters and the search box.
    pub fn reset_criteria(&mut self) {
        self.query.clear();
        self.set_criteria(FilterCriteria::default());
        self.clear_suggestions();
    }

    /// Update the live-search text and recompute suggestions.
    pub fn set_query(&mut self, text: &str) {
        self.query = text.to_string();
        self.refresh_suggestions();
    }

    /// Hide the suggestion list without touching the query.
    pub fn clear_suggestions(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        self.suggestions.clear();
        self.notify_suggestions();
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Resolve a pick at a world-pixel position against the drawn clusters.
    pub fn resolve_pick(&self, at: PixelPoint) -> Intent {
        let hit = self
            .cluster_index
            .hit_test(at)
            .and_then(|i| self.clusters.get(i));
        resolve_selection(hit, &self.view_config)
    }

    /// Resolve a chosen suggestion.
    ///
    /// On success the search text becomes the facility name and the
    /// suggestion list closes.
    pub fn pick_suggestion(&mut self, id: u64) -> Result<Intent> {
        let record = Arc::clone(self.store.by_id(id)?);
        let intent = resolve_search_pick(&record, &self.view_config)?;

        self.query = record.name.clone().unwrap_or_default();
        self.clear_suggestions();
        Ok(intent)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn filter_options(&self) -> &FilterOptions {
        &self.filter_options
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn cluster_config(&self) -> &ClusterConfig {
        &self.cluster_config
    }

    pub fn view_config(&self) -> &ViewConfig {
        &self.view_config
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn load_error(&self) -> Option<&MapError> {
        self.load_error.as_ref()
    }

    pub fn filtered(&self) -> &[Arc<FacilityRecord>] {
        &self.filtered
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn suggestions(&self) -> &[SuggestionMatch] {
        &self.suggestions
    }

    pub fn total_count(&self) -> usize {
        self.store.len()
    }

    pub fn visible_count(&self) -> usize {
        self.filtered.len()
    }

    // ------------------------------------------------------------------------
    // Recomputation
    // ------------------------------------------------------------------------

    fn refilter(&mut self) {
        let start = Instant::now();
        self.filtered = apply_filter(self.store.all(), &self.criteria);
        debug!(
            "[MapSession] Filtered {} of {} facilities in {:?}",
            self.filtered.len(),
            self.store.len(),
            start.elapsed()
        );
        for observer in &self.observers {
            observer.on_filtered_set_changed(&self.filtered);
        }
        self.recluster();
    }

    fn recluster(&mut self) {
        let start = Instant::now();
        self.clusters = cluster_records(&self.filtered, &self.projector, &self.cluster_config);
        self.cluster_index = ClusterIndex::new(&self.clusters);
        debug!(
            "[MapSession] {} clusters at zoom {} (distance {}px, min {}px) in {:?}",
            self.clusters.len(),
            self.projector.zoom(),
            self.cluster_config.distance_px,
            self.cluster_config.min_distance_px,
            start.elapsed()
        );
        for observer in &self.observers {
            observer.on_clusters_changed(&self.clusters);
        }
    }

    fn refresh_suggestions(&mut self) {
        self.suggestions = suggest(&self.query, self.store.all(), &self.suggest_config);
        self.notify_suggestions();
    }

    fn notify_suggestions(&self) {
        for observer in &self.observers {
            observer.on_suggestions_changed(&self.suggestions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        filtered: Mutex<Vec<usize>>,
        clusters: Mutex<Vec<usize>>,
        suggestions: Mutex<Vec<usize>>,
        failures: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recorder {
        fn on_filtered_set_changed(&self, records: &[Arc<FacilityRecord>]) {
            self.filtered.lock().unwrap().push(records.len());
        }
        fn on_clusters_changed(&self, clusters: &[Cluster]) {
            self.clusters.lock().unwrap().push(clusters.len());
        }
        fn on_suggestions_changed(&self, matches: &[SuggestionMatch]) {
            self.suggestions.lock().unwrap().push(matches.len());
        }
        fn on_load_failed(&self, error: &MapError) {
            self.failures.lock().unwrap().push(error.to_string());
        }
    }

    fn spec_records() -> Vec<FacilityRecord> {
        vec![
            FacilityRecord {
                id: 1,
                name: Some("Стадион".into()),
                district: Some("Центральный".into()),
                sports: Some("Футбол".into()),
                location: Some(GeoPoint::new(59.93, 30.31)),
                ..Default::default()
            },
            FacilityRecord {
                id: 2,
                district: Some("Московский".into()),
                sports: Some("Баскетбол".into()),
                location: None,
                ..Default::default()
            },
        ]
    }

    fn city_records() -> Vec<FacilityRecord> {
        // Two tight groups about 10km apart plus one outlier
        let mut records = Vec::new();
        for i in 0..4 {
            records.push(FacilityRecord {
                id: 10 + i,
                district: Some("Приморский".into()),
                sports: Some("Футбол".into()),
                location: Some(GeoPoint::new(60.00 + i as f64 * 0.0005, 30.25)),
                ..Default::default()
            });
        }
        for i in 0..3 {
            records.push(FacilityRecord {
                id: 20 + i,
                district: Some("Фрунзенский".into()),
                sports: Some("Хоккей".into()),
                location: Some(GeoPoint::new(59.87, 30.38 + i as f64 * 0.0005)),
                ..Default::default()
            });
        }
        records.push(FacilityRecord {
            id: 30,
            district: Some("Курортный".into()),
            sports: Some("Лыжи".into()),
            location: Some(GeoPoint::new(60.19, 29.70)),
            ..Default::default()
        });
        records
    }

    #[test]
    fn test_load_and_filter() {
        let mut session = MapSession::default();
        session.load(spec_records());
        assert_eq!(session.total_count(), 2);
        assert_eq!(session.visible_count(), 2);
        // Record 2 has no location: visible in the list, not on the map
        assert_eq!(session.clusters().len(), 1);

        session.set_criteria(FilterCriteria::default().with_district("центр"));
        let ids: Vec<u64> = session.filtered().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_notifications_fire_per_recompute() {
        let recorder = Arc::new(Recorder::default());
        let mut session = MapSession::default();
        session.add_observer(recorder.clone());

        session.load(city_records());
        session.set_distance(10.0);
        session.set_criteria(FilterCriteria::default().with_sport_type("хоккей"));

        assert_eq!(*recorder.filtered.lock().unwrap(), vec![8, 3]);
        assert_eq!(recorder.clusters.lock().unwrap().len(), 3);
        assert_eq!(*recorder.suggestions.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_distance_and_zoom_recluster() {
        let mut session = MapSession::default();
        session.load(city_records());
        assert_eq!(session.clusters().len(), 3);

        session.set_distance(0.0);
        assert_eq!(session.clusters().len(), 8);

        session.set_distance(40.0);
        session.set_zoom(18.0);
        assert!(session.clusters().len() > 3);

        session.set_zoom(3.0);
        assert_eq!(session.clusters().len(), 1);
    }

    #[test]
    fn test_non_finite_inputs_are_ignored() {
        let recorder = Arc::new(Recorder::default());
        let mut session = MapSession::default();
        session.add_observer(recorder.clone());
        session.load(city_records());
        let before = session.clusters().to_vec();
        let notified = recorder.clusters.lock().unwrap().len();

        session.set_zoom(f64::NAN);
        session.set_zoom(f64::INFINITY);
        session.set_distance(f64::NAN);
        session.set_min_distance(f64::NEG_INFINITY);

        assert_eq!(session.projector().zoom(), session.view_config().zoom);
        assert_eq!(*session.cluster_config(), ClusterConfig::default());
        assert_eq!(session.clusters(), &before[..]);
        assert_eq!(recorder.clusters.lock().unwrap().len(), notified);

        // The session keeps working afterwards
        session.set_zoom(3.0);
        assert_eq!(session.clusters().len(), 1);
    }

    #[test]
    fn test_min_distance_keeps_membership() {
        let mut session = MapSession::default();
        session.load(city_records());
        let before: Vec<usize> = session.clusters().iter().map(Cluster::len).collect();

        session.set_min_distance(0.0);
        let after: Vec<usize> = session.clusters().iter().map(Cluster::len).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_live_query_ignores_filter() {
        let mut session = MapSession::default();
        session.load(spec_records());
        session.set_criteria(FilterCriteria::default().with_district("москов"));

        session.set_query("фут");
        assert_eq!(session.suggestions().len(), 1);
        assert_eq!(session.suggestions()[0].record.id, 1);
        assert_eq!(session.suggestions()[0].highlighted_sports.segments[0].text, "Фут");

        session.set_query("ф");
        assert!(session.suggestions().is_empty());
    }

    #[test]
    fn test_pick_suggestion() {
        let mut session = MapSession::default();
        session.load(spec_records());
        session.set_query("стад");
        assert_eq!(session.suggestions().len(), 1);

        let intent = session.pick_suggestion(1).unwrap();
        assert!(matches!(intent, Intent::CenterOn { zoom, .. } if zoom == 16.0));
        assert_eq!(session.query(), "Стадион");
        assert!(session.suggestions().is_empty());

        assert_eq!(session.pick_suggestion(2), Err(MapError::NoLocation(2)));
        assert_eq!(session.pick_suggestion(99), Err(MapError::NotFound(99)));
    }

    #[test]
    fn test_resolve_pick() {
        let mut session = MapSession::default();
        session.load(city_records());

        let outlier = session
            .clusters()
            .iter()
            .find(|c| c.members[0].id == 30)
            .unwrap()
            .anchor;
        let group = session
            .clusters()
            .iter()
            .find(|c| c.members[0].id == 10)
            .unwrap()
            .anchor;

        match session.resolve_pick(outlier) {
            Intent::ShowDetail(record) => assert_eq!(record.id, 30),
            other => panic!("expected ShowDetail, got {:?}", other),
        }
        assert!(matches!(session.resolve_pick(group), Intent::FitBounds { .. }));

        let far_away = PixelPoint::new(outlier.x + 500.0, outlier.y + 500.0);
        assert_eq!(session.resolve_pick(far_away), Intent::ClearSelection);
    }

    #[test]
    fn test_failed_load_empties_store() {
        let recorder = Arc::new(Recorder::default());
        let mut session = MapSession::default();
        session.add_observer(recorder.clone());
        session.load(city_records());

        let result = session.load_result(Err(MapError::LoadFailure {
            source_name: "facilities".into(),
            reason: "connection refused".into(),
        }));

        assert!(result.is_err());
        assert_eq!(session.total_count(), 0);
        assert!(session.clusters().is_empty());
        assert!(session.load_error().is_some());
        assert_eq!(recorder.failures.lock().unwrap().len(), 1);
        assert_eq!(recorder.filtered.lock().unwrap().last(), Some(&0));

        // A later successful load clears the error
        session.load_result(Ok(spec_records())).unwrap();
        assert!(session.load_error().is_none());
        assert_eq!(session.total_count(), 2);
    }

    #[test]
    fn test_reload_rebuilds_derived_state() {
        let mut session = MapSession::default();
        session.load(city_records());
        session.set_criteria(FilterCriteria::default().with_district("примор"));
        assert_eq!(session.visible_count(), 4);

        session.load(spec_records());
        assert_eq!(session.visible_count(), 0);
        assert!(session.clusters().is_empty());
    }

    #[test]
    fn test_reset_criteria() {
        let mut session = MapSession::default();
        session.load(city_records());
        session.set_criteria(FilterCriteria::default().with_query("лыжи"));
        session.set_query("лыж");
        assert_eq!(session.visible_count(), 1);

        session.reset_criteria();
        assert_eq!(session.visible_count(), 8);
        assert_eq!(session.query(), "");
        assert!(session.suggestions().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut session = MapSession::default();
        session.load(city_records());
        session.set_filter_options(FilterOptions {
            districts: vec!["Приморский".into()],
            sport_types: vec![],
        });
        session.set_zoom(14.0);

        session.reset();
        assert_eq!(session.total_count(), 0);
        assert!(session.filter_options().districts.is_empty());
        assert_eq!(session.projector().zoom(), session.view_config().zoom);
    }
}
