//! Fog-of-war view computation.
//!
//! A view is a `(2R+1)×(2R+1)` window centered on the viewer. Everything
//! starts as fog; rays are cast along sixteen fixed directions and reveal
//! cells step by step until they hit a wall. The wall itself is revealed,
//! the rest of the ray stays fogged, and the two cells flanking the wall
//! hit are fogged as well so that a ray grazing a corner cannot expose the
//! pocket behind it. Rays are processed in a fixed order, later writes win.
//! The 3×3 core around the viewer is always visible.
//!
//! Views are read-only snapshots computed on demand.

use crate::world::{Position, World};
use shared::{BlockRecord, BlockType, MapRecord};

pub const DEFAULT_VISION_RADIUS: usize = 4;

/// Cardinal, diagonal, then the eight shallow directions (~22.5° apart).
const RAY_DIRECTIONS: [(i32, i32); 16] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
    (1, 2),
    (2, 1),
    (-1, 2),
    (-2, 1),
    (1, -2),
    (2, -1),
    (-1, -2),
    (-2, -1),
];

#[derive(Debug, Clone, Copy)]
pub struct Visibility {
    radius: usize,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new(DEFAULT_VISION_RADIUS)
    }
}

impl Visibility {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// Computes the window seen from `viewer`.
    pub fn view(&self, world: &World, viewer: Position) -> MapRecord {
        let mut window = Window::new(self.radius);

        for (dx, dy) in RAY_DIRECTIONS {
            self.cast_ray(world, viewer, dx, dy, &mut window);
        }

        for dy in -1..=1 {
            for dx in -1..=1 {
                window.reveal(world, viewer, dx, dy);
            }
        }

        MapRecord {
            id: 0,
            width: window.size,
            height: window.size,
            map_blocks: window.cells,
        }
    }

    fn cast_ray(&self, world: &World, viewer: Position, dx: i32, dy: i32, window: &mut Window) {
        let radius = self.radius as i32;
        let mut occluded = false;

        for step in 1..=radius {
            let (ox, oy) = (dx * step, dy * step);
            if !world.contains(viewer.offset(ox, oy)) || !window.in_bounds(ox, oy) {
                break;
            }

            if occluded {
                window.fog(ox, oy);
                continue;
            }

            if window.reveal(world, viewer, ox, oy) == Some(BlockType::Wall) {
                occluded = true;
                for (fx, fy) in flanking_offsets(dx, dy) {
                    window.fog(ox + fx, oy + fy);
                }
            }
        }
    }
}

/// Cells beside a wall hit that a ray in direction `(dx, dy)` also hides.
fn flanking_offsets(dx: i32, dy: i32) -> [(i32, i32); 2] {
    let (sx, sy) = (dx.signum(), dy.signum());
    if sx != 0 && sy != 0 {
        [(sx, 0), (0, sy)]
    } else if sx != 0 {
        [(0, 1), (0, -1)]
    } else {
        [(1, 0), (-1, 0)]
    }
}

/// View window addressed by offsets from the viewer.
struct Window {
    radius: i32,
    size: usize,
    cells: Vec<Vec<BlockRecord>>,
}

impl Window {
    fn new(radius: usize) -> Self {
        let size = radius * 2 + 1;
        Self {
            radius: radius as i32,
            size,
            cells: vec![vec![BlockRecord::fog(); size]; size],
        }
    }

    fn in_bounds(&self, ox: i32, oy: i32) -> bool {
        ox.abs() <= self.radius && oy.abs() <= self.radius
    }

    fn cell(&mut self, ox: i32, oy: i32) -> Option<&mut BlockRecord> {
        if !self.in_bounds(ox, oy) {
            return None;
        }
        let (vx, vy) = ((ox + self.radius) as usize, (oy + self.radius) as usize);
        Some(&mut self.cells[vy][vx])
    }

    fn fog(&mut self, ox: i32, oy: i32) {
        if let Some(cell) = self.cell(ox, oy) {
            *cell = BlockRecord::fog();
        }
    }

    /// Copies the world block at `viewer + (ox, oy)` into the window and
    /// returns its type. Cells outside the world stay fogged.
    fn reveal(&mut self, world: &World, viewer: Position, ox: i32, oy: i32) -> Option<BlockType> {
        let record = world.block(viewer.offset(ox, oy)).ok()?.to_record();
        let block_type = record.block_type;
        *self.cell(ox, oy)? = record;
        Some(block_type)
    }
}
