//! Selection resolvers.
//!
//! Picks on the map and choices from the suggestion list are turned into
//! [`Intent`]s. Nothing here touches a rendering surface; an adapter applies
//! the intent (opens a popup, animates the view, ...).

use std::sync::Arc;

use crate::cluster::Cluster;
use crate::{Bounds, FacilityRecord, GeoPoint, MapError, Result};

/// View defaults and animation hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConfig {
    /// Initial view centre. Default: Saint Petersburg (59.9386, 30.3141)
    pub center: GeoPoint,
    /// Initial zoom. Default: 11.0
    pub zoom: f64,
    /// Zoom used when centring on a picked suggestion. Default: 16.0
    pub search_pick_zoom: f64,
    /// Padding around fitted bounds. Default: 50.0
    pub fit_padding_px: f64,
    /// Default: 1000
    pub center_duration_ms: u32,
    /// Default: 500
    pub fit_duration_ms: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(59.9386, 30.3141),
            zoom: 11.0,
            search_pick_zoom: 16.0,
            fit_padding_px: 50.0,
            center_duration_ms: 1000,
            fit_duration_ms: 500,
        }
    }
}

/// Instruction for the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Show the detail popup of one facility.
    ShowDetail(Arc<FacilityRecord>),
    /// Zoom the view to enclose the given bounds.
    FitBounds {
        bounds: Bounds,
        padding_px: f64,
        duration_ms: u32,
    },
    /// Close any open popup.
    ClearSelection,
    /// Animate the view to a location.
    CenterOn {
        location: GeoPoint,
        zoom: f64,
        duration_ms: u32,
    },
}

/// Resolve a map pick. `None` means empty space was clicked.
pub fn resolve_selection(cluster: Option<&Cluster>, config: &ViewConfig) -> Intent {
    let Some(cluster) = cluster else {
        return Intent::ClearSelection;
    };

    if let Some(record) = cluster.single() {
        return Intent::ShowDetail(Arc::clone(record));
    }

    match cluster.bounds() {
        Some(bounds) if cluster.is_aggregate() => Intent::FitBounds {
            bounds,
            padding_px: config.fit_padding_px,
            duration_ms: config.fit_duration_ms,
        },
        _ => Intent::ClearSelection,
    }
}

/// Resolve a chosen suggestion into a centring intent.
///
/// Fails with [`MapError::NoLocation`] when the record cannot be placed.
pub fn resolve_search_pick(record: &FacilityRecord, config: &ViewConfig) -> Result<Intent> {
    let location = record
        .location
        .filter(GeoPoint::is_valid)
        .ok_or(MapError::NoLocation(record.id))?;

    Ok(Intent::CenterOn {
        location,
        zoom: config.search_pick_zoom,
        duration_ms: config.center_duration_ms,
    })
}
