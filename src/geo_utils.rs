//! # Geographic Utilities
//!
//! Projection and bounding-box helpers shared by the clusterer and the viewport.
//!
//! The map renders in Web Mercator (EPSG:3857). Clustering distances are
//! expressed in screen pixels, so every facility location is first projected to
//! metres and then divided by the resolution (metres per pixel) of the current
//! zoom level. The resulting "world pixel" space is planar: the clusterer never
//! sees latitudes or longitudes.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`project`] | Longitude/latitude to Web Mercator metres |
//! | [`unproject`] | Web Mercator metres back to longitude/latitude |
//! | [`resolution_for_zoom`] | Metres per pixel at a zoom level |
//! | [`compute_bounds`] | Bounding box of a set of locations |
//! | [`centroid`] | Arithmetic centre of planar points |
//!
//! ## Example
//!
//! ```rust
//! use facility_map::{GeoPoint, geo_utils::Projector};
//!
//! let projector = Projector::new(11.0);
//! let palace_square = GeoPoint::new(59.9390, 30.3158);
//! let nevsky = GeoPoint::new(59.9343, 30.3351);
//!
//! let a = projector.to_pixels(&palace_square);
//! let b = projector.to_pixels(&nevsky);
//! // A couple of kilometres is only a handful of pixels at city zoom
//! assert!(a.distance(&b) < 40.0);
//! ```

use geo::{BoundingRect, Centroid, MultiPoint, Point};

use crate::{Bounds, GeoPoint, PixelPoint};

/// WGS84 semi-major axis used by the spherical Mercator projection.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the projected world in metres.
pub const HALF_WORLD: f64 = std::f64::consts::PI * EARTH_RADIUS;

/// Resolution at zoom 0 for 256px tiles.
const ZOOM_0_RESOLUTION: f64 = 2.0 * HALF_WORLD / 256.0;

// =============================================================================
// Projection
// =============================================================================

/// Project a location to Web Mercator metres.
///
/// Latitudes beyond the Mercator limit (about ±85.05°) are clamped to the edge
/// of the projected world.
///
/// # Example
///
/// ```rust
/// use facility_map::{GeoPoint, geo_utils};
///
/// let (x, y) = geo_utils::project(&GeoPoint::new(0.0, 0.0));
/// assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
/// ```
pub fn project(point: &GeoPoint) -> (f64, f64) {
    let x = EARTH_RADIUS * point.longitude.to_radians();
    let y = EARTH_RADIUS
        * (std::f64::consts::PI * (point.latitude + 90.0) / 360.0)
            .tan()
            .ln();
    (x, y.clamp(-HALF_WORLD, HALF_WORLD))
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64) -> GeoPoint {
    let longitude = (x / EARTH_RADIUS).to_degrees();
    let latitude =
        (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    GeoPoint::new(latitude, longitude)
}

/// Metres per pixel at the given zoom level.
///
/// Fractional zoom levels are allowed; each whole step halves the resolution.
#[inline]
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    ZOOM_0_RESOLUTION / 2f64.powf(zoom)
}

/// Converts between geographic locations and world pixels at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    zoom: f64,
    resolution: f64,
}

impl Projector {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            resolution: resolution_for_zoom(zoom),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Metres per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn to_pixels(&self, point: &GeoPoint) -> PixelPoint {
        let (x, y) = project(point);
        PixelPoint::new(x / self.resolution, y / self.resolution)
    }

    pub fn from_pixels(&self, pixel: &PixelPoint) -> GeoPoint {
        unproject(pixel.x * self.resolution, pixel.y * self.resolution)
    }
}

// =============================================================================
// Bounding Box / Centre
// =============================================================================

/// Compute the bounding box enclosing every location.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use facility_map::{GeoPoint, geo_utils};
///
/// let bounds = geo_utils::compute_bounds(&[
///     GeoPoint::new(59.90, 30.30),
///     GeoPoint::new(59.95, 30.25),
/// ]).unwrap();
/// assert_eq!(bounds.min_lat, 59.90);
/// assert_eq!(bounds.max_lng, 30.30);
/// ```
pub fn compute_bounds(points: &[GeoPoint]) -> Option<Bounds> {
    let multi: MultiPoint = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect();
    let rect = multi.bounding_rect()?;

    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Arithmetic centre of planar points, `None` for empty input.
pub fn centroid(points: &[PixelPoint]) -> Option<PixelPoint> {
    let multi: MultiPoint = points.iter().map(|p| Point::new(p.x, p.y)).collect();
    multi.centroid().map(|c| PixelPoint::new(c.x(), c.y()))
}

// =============================================================================
// Unit Tests
// =============================================================================
