//! Greedy proximity clustering in projected pixel space.
//!
//! Points are visited in input order. A point joins the earliest existing
//! cluster whose seed (the first point that opened it) lies within
//! `distance_px`; otherwise it opens a new cluster. Seeds are kept in an
//! R-tree so each lookup is logarithmic rather than a scan over every cluster,
//! and ties are broken by cluster creation order, never by tree layout, so the
//! same input order always yields the same clusters.
//!
//! `min_distance_px` never changes membership. It only moves the rendered
//! anchor of a cluster from the member centroid toward the seed, which keeps
//! neighbouring aggregate circles from sitting on top of each other.
//!
//! Clusters carry no identity: every change of points or thresholds rebuilds
//! them from scratch.

use std::sync::Arc;

use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::geo_utils::{centroid, Projector};
use crate::{Bounds, FacilityRecord, PixelPoint};

/// Configuration for the clusterer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    /// Points within this many pixels of a cluster's seed join that cluster.
    /// Default: 40.0
    pub distance_px: f64,

    /// Pulls cluster anchors toward their seed to reduce overlap.
    /// Values above `distance_px` behave like `distance_px`. Default: 20.0
    pub min_distance_px: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            distance_px: 40.0,
            min_distance_px: 20.0,
        }
    }
}

impl ClusterConfig {
    /// Weight of the seed when placing the anchor (0 = pure centroid).
    fn interpolation_ratio(&self) -> f64 {
        if self.distance_px <= 0.0 || self.min_distance_px <= 0.0 {
            return 0.0;
        }
        self.min_distance_px.min(self.distance_px) / self.distance_px
    }
}

/// Indices of the input points forming one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGroup {
    /// Member indices in input order; the first one is the seed
    pub indices: Vec<usize>,
    /// Position at which the cluster is drawn
    pub anchor: PixelPoint,
}

type Seed = GeomWithData<[f64; 2], usize>;

/// Partition planar points into proximity groups.
///
/// Every input index appears in exactly one group. Groups are returned in
/// creation order.
///
/// # Example
/// ```
/// use facility_map::{group_points, ClusterConfig, PixelPoint};
///
/// let points = [PixelPoint::new(0.0, 0.0), PixelPoint::new(3.0, 4.0)];
///
/// let wide = ClusterConfig { distance_px: 50.0, min_distance_px: 0.0 };
/// assert_eq!(group_points(&points, &wide).len(), 1);
///
/// let narrow = ClusterConfig { distance_px: 1.0, min_distance_px: 0.0 };
/// assert_eq!(group_points(&points, &narrow).len(), 2);
/// ```
pub fn group_points(points: &[PixelPoint], config: &ClusterConfig) -> Vec<PointGroup> {
    let max_dist_2 = config.distance_px.max(0.0).powi(2);
    let mut seeds: RTree<Seed> = RTree::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, p) in points.iter().enumerate() {
        let nearest_group = seeds
            .locate_within_distance([p.x, p.y], max_dist_2)
            .map(|seed| seed.data)
            .min();

        match nearest_group {
            Some(g) => groups[g].push(i),
            None => {
                seeds.insert(Seed::new([p.x, p.y], groups.len()));
                groups.push(vec![i]);
            }
        }
    }

    let ratio = config.interpolation_ratio();
    groups
        .into_iter()
        .map(|indices| {
            let seed = points[indices[0]];
            let member_points: Vec<PixelPoint> = indices.iter().map(|&i| points[i]).collect();
            let center = centroid(&member_points).unwrap_or(seed);
            let anchor = PixelPoint::new(
                center.x * (1.0 - ratio) + seed.x * ratio,
                center.y * (1.0 - ratio) + seed.y * ratio,
            );
            PointGroup { indices, anchor }
        })
        .collect()
}

/// A group of facilities drawn as one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<Arc<FacilityRecord>>,
    pub anchor: PixelPoint,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// More than one member.
    pub fn is_aggregate(&self) -> bool {
        self.members.len() > 1
    }

    /// The only member of a singleton cluster.
    pub fn single(&self) -> Option<&Arc<FacilityRecord>> {
        match self.members.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Geographic extent of the members.
    pub fn bounds(&self) -> Option<Bounds> {
        let locations: Vec<_> = self.members.iter().filter_map(|r| r.location).collect();
        Bounds::from_points(&locations)
    }

    pub fn style(&self) -> ClusterStyle {
        ClusterStyle::for_cluster(self)
    }
}

/// Cluster the plottable records at the projector's zoom.
///
/// Records without a usable location are skipped; they are not an error.
pub fn cluster_records(
    records: &[Arc<FacilityRecord>],
    projector: &Projector,
    config: &ClusterConfig,
) -> Vec<Cluster> {
    let plottable: Vec<(&Arc<FacilityRecord>, PixelPoint)> = records
        .iter()
        .filter_map(|r| {
            let location = r.location.filter(|p| p.is_valid())?;
            Some((r, projector.to_pixels(&location)))
        })
        .collect();

    let points: Vec<PixelPoint> = plottable.iter().map(|(_, p)| *p).collect();

    group_points(&points, config)
        .into_iter()
        .map(|group| Cluster {
            members: group
                .indices
                .iter()
                .map(|&i| Arc::clone(plottable[i].0))
                .collect(),
            anchor: group.anchor,
        })
        .collect()
}

// ============================================================================
// Rendering Hints
// ============================================================================

pub const SINGLE_RADIUS: f64 = 8.0;
pub const MIN_AGGREGATE_RADIUS: f64 = 12.0;
pub const MAX_AGGREGATE_RADIUS: f64 = 30.0;
pub const STROKE_WIDTH: f64 = 2.0;

pub const AGGREGATE_FILL: &str = "#2c5aa0";
const RINK_FILL: &str = "#f39c12";
const COMPLEX_FILL: &str = "#27ae60";
const FIELD_FILL: &str = "#3498db";
const DEFAULT_FILL: &str = "#e74c3c";

/// Marker colour for a facility type.
pub fn marker_color(kind: Option<&str>) -> &'static str {
    let Some(kind) = kind else {
        return DEFAULT_FILL;
    };
    let kind = kind.to_lowercase();
    if kind.contains("каток") {
        RINK_FILL
    } else if kind.contains("комплекс") || kind.contains("центр") {
        COMPLEX_FILL
    } else if kind.contains("площадка") || kind.contains("поле") {
        FIELD_FILL
    } else {
        DEFAULT_FILL
    }
}

/// Circle radius for a cluster of `size` members.
///
/// Grows with size for aggregates but stays within
/// [`MIN_AGGREGATE_RADIUS`, `MAX_AGGREGATE_RADIUS`].
pub fn cluster_radius(size: usize) -> f64 {
    if size > 1 {
        (size as f64 * 1.5 + 8.0).clamp(MIN_AGGREGATE_RADIUS, MAX_AGGREGATE_RADIUS)
    } else {
        SINGLE_RADIUS
    }
}

/// How a cluster should be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStyle {
    pub radius: f64,
    pub fill: &'static str,
    /// Member count, shown on aggregates only
    pub label: Option<String>,
}

impl ClusterStyle {
    pub fn for_cluster(cluster: &Cluster) -> Self {
        let size = cluster.len();
        if size > 1 {
            Self {
                radius: cluster_radius(size),
                fill: AGGREGATE_FILL,
                label: Some(size.to_string()),
            }
        } else {
            let kind = cluster.members.first().and_then(|r| r.kind.as_deref());
            Self {
                radius: SINGLE_RADIUS,
                fill: marker_color(kind),
                label: None,
            }
        }
    }

    /// Radius of the clickable area, stroke included.
    pub fn hit_radius(&self) -> f64 {
        self.radius + STROKE_WIDTH / 2.0
    }
}

// ============================================================================
// Hit Testing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct HitTarget {
    index: usize,
    radius: f64,
}

/// Spatial index over drawn cluster circles for resolving picks.
pub struct ClusterIndex {
    tree: RTree<GeomWithData<[f64; 2], HitTarget>>,
    max_radius: f64,
}

impl ClusterIndex {
    pub fn new(clusters: &[Cluster]) -> Self {
        let targets: Vec<_> = clusters
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let radius = c.style().hit_radius();
                GeomWithData::new([c.anchor.x, c.anchor.y], HitTarget { index, radius })
            })
            .collect();
        let max_radius = targets.iter().map(|t| t.data.radius).fold(0.0, f64::max);

        Self {
            tree: RTree::bulk_load(targets),
            max_radius,
        }
    }

    /// Index of the cluster drawn under `at`, if any.
    ///
    /// When circles overlap the closest anchor wins; on an exact tie the
    /// cluster drawn last (highest index) wins, as it is on top.
    pub fn hit_test(&self, at: PixelPoint) -> Option<usize> {
        self.tree
            .locate_within_distance([at.x, at.y], self.max_radius * self.max_radius)
            .filter_map(|t| {
                let [x, y] = *t.geom();
                let d = (x - at.x).hypot(y - at.y);
                (d <= t.data.radius).then_some((d, t.data.index))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, index)| index)
    }
}
