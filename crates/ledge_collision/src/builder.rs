//! Builds the linked segment graph from raw level polylines.
//!
//! Each polyline becomes a chain of segments linked through `prev`/`next`.
//! Convex floor/ceiling corners get a short vertical wall connector so the
//! silhouette has no gap, and every floor and ceiling end is flagged as a
//! ledge or not from its neighbour on that side.

use glam::Vec2;
use ledge_core::geometry::{cross, DEGENERATE_LENGTH_SQ};

use crate::segment::{CollisionSegment, SegmentEnd, SegmentId, SurfaceKind};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    pub points: Vec<Vec2>,
    /// Link the last point back to the first. A polyline whose last point
    /// equals its first is treated as closed either way.
    pub closed: bool,
}

impl Polyline {
    pub fn open(points: Vec<Vec2>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    pub fn closed(points: Vec<Vec2>) -> Self {
        Self {
            points,
            closed: true,
        }
    }
}

/// Builds every segment of the level. Ids are assigned in build order and
/// equal each segment's index in the returned vector.
pub fn build_segment_graph(polylines: &[Polyline], connector_offset: f32) -> Vec<CollisionSegment> {
    let mut segments: Vec<CollisionSegment> = Vec::new();
    let mut connector_count = 0usize;

    for (index, polyline) in polylines.iter().enumerate() {
        let (points, closed) = normalized_points(polyline);
        if points.len() < 2 {
            log::debug!(
                "Skipping polyline {} with {} distinct point(s)",
                index,
                points.len()
            );
            continue;
        }

        let mut chain = raw_chain(&points, closed);
        connector_count += splice_connectors(&mut chain, closed, connector_offset);

        let base = segments.len() as u32;
        for (k, segment) in chain.iter_mut().enumerate() {
            segment.id = SegmentId(base + k as u32);
        }
        link_chain(&mut chain, closed);
        flag_ledges(&mut chain, base);
        segments.extend(chain);
    }

    log::info!(
        "Built {} collision segments ({} wall connectors) from {} polylines",
        segments.len(),
        connector_count,
        polylines.len()
    );
    segments
}

/// Drops repeated points and folds a repeated first point into `closed`.
fn normalized_points(polyline: &Polyline) -> (Vec<Vec2>, bool) {
    let mut points: Vec<Vec2> = Vec::with_capacity(polyline.points.len());
    for &p in &polyline.points {
        match points.last() {
            Some(&last) if last.distance_squared(p) <= DEGENERATE_LENGTH_SQ => {}
            _ => points.push(p),
        }
    }

    let mut closed = polyline.closed;
    if points.len() > 2 && points[0].distance_squared(points[points.len() - 1]) <= DEGENERATE_LENGTH_SQ
    {
        points.pop();
        closed = true;
    }
    // Two points cannot enclose anything; wrapping would only duplicate the
    // segment backwards.
    if points.len() < 3 {
        closed = false;
    }
    (points, closed)
}

fn raw_chain(points: &[Vec2], closed: bool) -> Vec<CollisionSegment> {
    let mut chain: Vec<CollisionSegment> = points
        .windows(2)
        .filter_map(|pair| CollisionSegment::new(SegmentId(0), pair[0], pair[1]))
        .collect();
    if closed {
        if let (Some(&last), Some(&first)) = (points.last(), points.first()) {
            chain.extend(CollisionSegment::new(SegmentId(0), last, first));
        }
    }
    chain
}

/// Inserts wall connectors between convex floor/ceiling pairs. Returns how
/// many were added.
fn splice_connectors(chain: &mut Vec<CollisionSegment>, closed: bool, offset: f32) -> usize {
    let n = chain.len();
    let mut spliced = Vec::with_capacity(n + 2);
    let mut added = 0;
    for i in 0..n {
        spliced.push(chain[i].clone());
        if i + 1 == n && !closed {
            break;
        }
        let next = &chain[(i + 1) % n];
        if let Some(connector) = wall_connector(&chain[i], next, offset) {
            spliced.push(connector);
            added += 1;
        }
    }
    *chain = spliced;
    added
}

/// A vertical connector for a floor->ceiling or ceiling->floor corner whose
/// normals diverge. It sits `offset` below the shared vertex, on the
/// non-floor side, so walking off the floor's end never catches on it.
fn wall_connector(
    a: &CollisionSegment,
    b: &CollisionSegment,
    offset: f32,
) -> Option<CollisionSegment> {
    if cross(a.normal, b.normal) <= 0.0 {
        return None;
    }
    let vertex = a.end();
    let step = Vec2::new(0.0, offset);
    match (a.kind, b.kind) {
        // Points down, faces +x.
        (SurfaceKind::Floor, SurfaceKind::Ceiling) => {
            CollisionSegment::new(SegmentId(0), vertex + step, vertex + step * 2.0)
        }
        // Points up, faces -x.
        (SurfaceKind::Ceiling, SurfaceKind::Floor) => {
            CollisionSegment::new(SegmentId(0), vertex + step * 2.0, vertex + step)
        }
        _ => None,
    }
}

fn link_chain(chain: &mut [CollisionSegment], closed: bool) {
    let n = chain.len();
    for i in 0..n.saturating_sub(1) {
        chain[i].next = Some(chain[i + 1].id);
        chain[i + 1].prev = Some(chain[i].id);
    }
    if closed && n > 1 {
        chain[n - 1].next = Some(chain[0].id);
        chain[0].prev = Some(chain[n - 1].id);
    }
}

fn flag_ledges(chain: &mut [CollisionSegment], base: u32) {
    let lookup = |id: Option<SegmentId>| id.map(|id| (id.0 - base) as usize);
    let flags: Vec<(bool, bool)> = chain
        .iter()
        .map(|segment| {
            if segment.is_wall() {
                return (false, false);
            }
            let prev = lookup(segment.prev).map(|i| &chain[i]);
            let next = lookup(segment.next).map(|i| &chain[i]);
            (
                is_open_end(segment, prev, SegmentEnd::End),
                is_open_end(segment, next, SegmentEnd::Start),
            )
        })
        .collect();
    for (segment, (start_ledge, end_ledge)) in chain.iter_mut().zip(flags) {
        segment.start_ledge = start_ledge;
        segment.end_ledge = end_ledge;
    }
}

/// `shared` is the neighbour's end that touches `surface`.
fn is_open_end(
    surface: &CollisionSegment,
    neighbor: Option<&CollisionSegment>,
    shared: SegmentEnd,
) -> bool {
    match neighbor {
        None => true,
        Some(n) if !n.is_wall() => true,
        Some(n) => n.direction_away_from(shared).dot(surface.normal) >= 0.0,
    }
}
