//! Uniform grid broad phase over static segments.
//!
//! The grid starts at the world origin and is stored row-major. Cells only
//! hold segment ids; the segments themselves live in the `CollisionWorld`.
//! Insertion walks the cells a segment crosses with a DDA (Amanatides-Woo)
//! traversal, so long diagonal segments touch only the cells they actually
//! pass through instead of their whole bounding box.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use ledge_core::geometry::Rect;

use crate::segment::{CollisionSegment, SegmentId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialPartition {
    world_width: f32,
    world_height: f32,
    cell_width: f32,
    cell_height: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<SegmentId>>,
}

impl SpatialPartition {
    pub fn new(world_width: f32, world_height: f32, cell_width: f32, cell_height: f32) -> Self {
        let mut partition = Self::default();
        partition.setup_partition(world_width, world_height, cell_width, cell_height);
        partition
    }

    /// Allocates a grid covering `world_width` x `world_height`, dropping any
    /// previous contents. Cell sizes must be positive; `PhysicsConfig`
    /// validation guarantees that before a world is built.
    pub fn setup_partition(
        &mut self,
        world_width: f32,
        world_height: f32,
        cell_width: f32,
        cell_height: f32,
    ) {
        self.world_width = world_width.max(0.0);
        self.world_height = world_height.max(0.0);
        self.cell_width = cell_width;
        self.cell_height = cell_height;
        self.cols = ((self.world_width / cell_width).ceil() as usize).max(1);
        self.rows = ((self.world_height / cell_height).ceil() as usize).max(1);
        self.cells = vec![Vec::new(); self.cols * self.rows];
        log::debug!(
            "Partition set up: {}x{} cells of {}x{} over {}x{}",
            self.cols,
            self.rows,
            cell_width,
            cell_height,
            self.world_width,
            self.world_height
        );
    }

    /// Empties every cell, keeping the grid dimensions.
    pub fn clear_partition(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Adds `segment` to every cell it crosses. Only the part inside the
    /// world is walked; a segment entirely outside it is not stored.
    pub fn add_static_collision(&mut self, segment: &CollisionSegment) {
        let id = segment.id;
        let dir = segment.ray.dir;
        if self.cells.is_empty() {
            return;
        }
        if !(segment.start().is_finite() && dir.is_finite()) {
            log::warn!("Segment {} has no finite extent; not partitioned", id);
            return;
        }
        let Some((origin, end)) = self.clip_to_world(segment.start(), segment.end(), dir) else {
            log::warn!(
                "Segment {} lies outside the {}x{} world; not partitioned",
                id,
                self.world_width,
                self.world_height
            );
            return;
        };

        let (cx, cy) = self.clamped_cell(origin);
        let (ex, ey) = self.clamped_cell(end);
        let (mut cx, mut cy) = (cx as i64, cy as i64);
        let (ex, ey) = (ex as i64, ey as i64);

        let step_x: i64 = if dir.x > 0.0 {
            1
        } else if dir.x < 0.0 {
            -1
        } else {
            0
        };
        let step_y: i64 = if dir.y > 0.0 {
            1
        } else if dir.y < 0.0 {
            -1
        } else {
            0
        };

        let mut t_max_x = if step_x != 0 {
            let boundary = (if step_x > 0 { cx + 1 } else { cx }) as f32 * self.cell_width;
            (boundary - origin.x) / dir.x
        } else {
            f32::INFINITY
        };
        let mut t_max_y = if step_y != 0 {
            let boundary = (if step_y > 0 { cy + 1 } else { cy }) as f32 * self.cell_height;
            (boundary - origin.y) / dir.y
        } else {
            f32::INFINITY
        };
        let t_delta_x = if step_x != 0 {
            self.cell_width / dir.x.abs()
        } else {
            f32::INFINITY
        };
        let t_delta_y = if step_y != 0 {
            self.cell_height / dir.y.abs()
        } else {
            f32::INFINITY
        };

        // Each step moves exactly one axis by one cell, so the walk from the
        // start cell to the end cell takes their Manhattan distance in steps.
        // Both cells are on the grid, which bounds the walk by cols + rows.
        let steps = (ex - cx).abs() + (ey - cy).abs();
        self.push_cell(cx, cy, id);
        for _ in 0..steps {
            if t_max_x < t_max_y {
                cx += step_x;
                t_max_x += t_delta_x;
            } else {
                cy += step_y;
                t_max_y += t_delta_y;
            }
            self.push_cell(cx, cy, id);
        }
        if (cx, cy) != (ex, ey) {
            log::trace!(
                "DDA for segment {} ended at ({}, {}) instead of ({}, {})",
                id,
                cx,
                cy,
                ex,
                ey
            );
            self.push_cell(ex, ey, id);
        }
    }

    /// Liang-Barsky clip of `start -> end` against the world rectangle.
    /// Endpoints cut by a boundary are snapped onto it exactly, so segments
    /// with huge coordinates keep their in-world extent.
    fn clip_to_world(&self, start: Vec2, end: Vec2, dir: Vec2) -> Option<(Vec2, Vec2)> {
        let max = Vec2::new(self.world_width, self.world_height);
        let (mut t0, mut t1) = (0.0f32, 1.0f32);
        let (mut snap0, mut snap1): (Option<(usize, f32)>, Option<(usize, f32)>) = (None, None);
        let edges = [
            (-dir.x, start.x, 0, 0.0),
            (dir.x, max.x - start.x, 0, max.x),
            (-dir.y, start.y, 1, 0.0),
            (dir.y, max.y - start.y, 1, max.y),
        ];
        for (p, q, axis, boundary) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                    snap0 = Some((axis, boundary));
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                    snap1 = Some((axis, boundary));
                }
            }
        }

        let clipped = |t: f32, snap: Option<(usize, f32)>, unclipped: Vec2| match snap {
            None => unclipped,
            Some((axis, boundary)) => {
                let mut p = start + dir * t;
                p[axis] = boundary;
                p.clamp(Vec2::ZERO, max)
            }
        };
        Some((clipped(t0, snap0, start), clipped(t1, snap1, end)))
    }

    /// Ids of every segment referenced by a cell overlapping `rect`. The
    /// rectangle is clamped to the grid, so any input is accepted.
    pub fn ids_in_world_area(&self, rect: &Rect) -> BTreeSet<SegmentId> {
        let mut ids = BTreeSet::new();
        if self.cells.is_empty() {
            return ids;
        }
        let (c0, r0) = self.clamped_cell(rect.min);
        let (c1, r1) = self.clamped_cell(rect.max);
        for row in r0.min(r1)..=r0.max(r1) {
            for col in c0.min(c1)..=c0.max(c1) {
                ids.extend(self.cells[row * self.cols + col].iter().copied());
            }
        }
        ids
    }

    /// Segments overlapping `rect`, deduplicated and keyed by id.
    pub fn collisions_in_world_area<'a>(
        &self,
        rect: &Rect,
        segments: &'a [CollisionSegment],
    ) -> BTreeMap<SegmentId, &'a CollisionSegment> {
        self.ids_in_world_area(rect)
            .into_iter()
            .filter_map(|id| segments.get(id.index()).map(|segment| (id, segment)))
            .collect()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Segment ids stored in one cell; empty for out-of-range coordinates.
    pub fn cell(&self, col: usize, row: usize) -> &[SegmentId] {
        if col >= self.cols || row >= self.rows {
            return &[];
        }
        &self.cells[row * self.cols + col]
    }

    pub fn cell_rect(&self, col: usize, row: usize) -> Rect {
        Rect::new(
            col as f32 * self.cell_width,
            row as f32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    pub fn world_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.world_width, self.world_height)
    }

    fn cell_coords(&self, p: Vec2) -> (i64, i64) {
        (
            (p.x / self.cell_width).floor() as i64,
            (p.y / self.cell_height).floor() as i64,
        )
    }

    fn clamped_cell(&self, p: Vec2) -> (usize, usize) {
        let (x, y) = self.cell_coords(p);
        (
            x.clamp(0, self.cols as i64 - 1) as usize,
            y.clamp(0, self.rows as i64 - 1) as usize,
        )
    }

    fn push_cell(&mut self, x: i64, y: i64, id: SegmentId) {
        if x < 0 || y < 0 || x >= self.cols as i64 || y >= self.rows as i64 {
            return;
        }
        let cell = &mut self.cells[y as usize * self.cols + x as usize];
        if cell.last() != Some(&id) {
            cell.push(id);
        }
    }
}
