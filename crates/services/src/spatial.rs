//! # Spatial Index
//!
//! Pure geometry over a candidate set and a viewport: whether to render
//! individually or aggregated, which items fall inside the viewport, and how
//! to grid nearby items into clusters. Output depends only on the input set
//! and the viewport span, never on iteration order.

use std::collections::BTreeMap;

use domains::models::{AnnotationItem, ClusterItem, Span, Viewport};

/// Either axis of the span exceeding this switches the map to clusters.
/// The boundary is exclusive: a span of exactly 0.40 stays individual.
pub const CLUSTER_SPAN_THRESHOLD: f64 = 0.40;

/// Cells never shrink below this many degrees per axis.
pub const MIN_CELL_DEGREES: f64 = 0.02;

const CELL_DIVISOR: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationMode {
    Individual,
    Clustered,
}

pub fn presentation_mode(span: Span) -> PresentationMode {
    if span.latitude_delta > CLUSTER_SPAN_THRESHOLD || span.longitude_delta > CLUSTER_SPAN_THRESHOLD
    {
        PresentationMode::Clustered
    } else {
        PresentationMode::Individual
    }
}

/// Keeps items whose coordinates fall inside `center ± span/2`, bounds
/// inclusive on both edges.
pub fn viewport_filter(items: &[AnnotationItem], viewport: &Viewport) -> Vec<AnnotationItem> {
    let lat_half = viewport.span.latitude_delta / 2.0;
    let lon_half = viewport.span.longitude_delta / 2.0;

    let min_lat = viewport.center.latitude - lat_half;
    let max_lat = viewport.center.latitude + lat_half;
    let min_lon = viewport.center.longitude - lon_half;
    let max_lon = viewport.center.longitude + lon_half;

    items
        .iter()
        .filter(|item| {
            item.latitude >= min_lat
                && item.latitude <= max_lat
                && item.longitude >= min_lon
                && item.longitude <= max_lon
        })
        .cloned()
        .collect()
}

/// Partitions items into a grid of `max(span/8, 0.02)`-degree cells. Each
/// non-empty cell yields one cluster at the arithmetic mean of its members.
///
/// Buckets are keyed and emitted through a `BTreeMap`, and members are summed
/// in a sorted order, so identical input sets produce bit-identical output
/// regardless of how the caller ordered them.
pub fn cluster(items: &[AnnotationItem], span: Span) -> Vec<ClusterItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let cell_lat = (span.latitude_delta / CELL_DIVISOR).max(MIN_CELL_DEGREES);
    let cell_lon = (span.longitude_delta / CELL_DIVISOR).max(MIN_CELL_DEGREES);

    let mut buckets: BTreeMap<(i64, i64), Vec<&AnnotationItem>> = BTreeMap::new();
    for item in items {
        let lat_index = (item.latitude / cell_lat).floor() as i64;
        let lon_index = (item.longitude / cell_lon).floor() as i64;
        buckets.entry((lat_index, lon_index)).or_default().push(item);
    }

    buckets
        .into_iter()
        .map(|((lat_index, lon_index), mut members)| {
            members.sort_by(|a, b| a.id.cmp(&b.id));

            let count = members.len();
            let avg_lat = members.iter().map(|m| m.latitude).sum::<f64>() / count as f64;
            let avg_lon = members.iter().map(|m| m.longitude).sum::<f64>() / count as f64;

            ClusterItem {
                id: format!("{lat_index}:{lon_index}"),
                latitude: avg_lat,
                longitude: avg_lon,
                count,
            }
        })
        .collect()
}
