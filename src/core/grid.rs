//! Tile grid geometry.
//!
//! A node's coordinate space is partitioned into a regular array of tiles
//! anchored at the grid offset. Tile `(tx, ty)` covers
//! `[x_offset + tx * tile_width, +tile_width) x [y_offset + ty * tile_height, +tile_height)`.
//! Tile indices may be negative when the bounds start before the grid offset.

use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Default tile edge length used when an operator does not pick one.
pub const DEFAULT_TILE_SIZE: i32 = 256;

/// Regular tiling of a coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileGrid {
    /// X coordinate of the left edge of tile column 0
    pub x_offset: i32,
    /// Y coordinate of the top edge of tile row 0
    pub y_offset: i32,
    /// Tile width in pixels
    pub tile_width: i32,
    /// Tile height in pixels
    pub tile_height: i32,
}

impl TileGrid {
    /// Create a grid, failing on a non-positive tile size.
    pub fn new(x_offset: i32, y_offset: i32, tile_width: i32, tile_height: i32) -> RasterResult<Self> {
        if tile_width <= 0 || tile_height <= 0 {
            return Err(RasterError::invalid(format!(
                "tile size must be positive, got {}x{}",
                tile_width, tile_height
            )));
        }
        Ok(Self {
            x_offset,
            y_offset,
            tile_width,
            tile_height,
        })
    }

    /// A grid anchored at the bounds' minimum corner with the given tile
    /// size clamped to the bounds.
    pub fn anchored(bounds: &Rect, tile_width: i32, tile_height: i32) -> RasterResult<Self> {
        Self::new(
            bounds.x,
            bounds.y,
            tile_width.min(bounds.width),
            tile_height.min(bounds.height),
        )
    }

    /// The same tiling with its offset shifted by `(dx, dy)`, or `None` if
    /// the offset leaves the `i32` range.
    ///
    /// Tile `(tx, ty)` of the result covers tile `(tx, ty)` of `self`
    /// shifted by `(dx, dy)`.
    pub fn translated(&self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x_offset: self.x_offset.checked_add(dx)?,
            y_offset: self.y_offset.checked_add(dy)?,
            ..*self
        })
    }

    /// Column index containing x coordinate `x`.
    pub fn x_to_tile(&self, x: i32) -> i32 {
        to_tile(x, self.x_offset, self.tile_width)
    }

    /// Row index containing y coordinate `y`.
    pub fn y_to_tile(&self, y: i32) -> i32 {
        to_tile(y, self.y_offset, self.tile_height)
    }

    /// Left edge of column `tx`, clamped to the `i32` range.
    pub fn tile_to_x(&self, tx: i32) -> i32 {
        clamp_i32(tile_start(tx, self.x_offset, self.tile_width))
    }

    /// Top edge of row `ty`, clamped to the `i32` range.
    pub fn tile_to_y(&self, ty: i32) -> i32 {
        clamp_i32(tile_start(ty, self.y_offset, self.tile_height))
    }

    /// Rectangle of tile `(tx, ty)`, unclipped except where it would leave
    /// the `i32` coordinate range.
    pub fn tile_rect(&self, tx: i32, ty: i32) -> Rect {
        let x0 = tile_start(tx, self.x_offset, self.tile_width);
        let y0 = tile_start(ty, self.y_offset, self.tile_height);
        let x1 = clamp_i32(x0 + i64::from(self.tile_width));
        let y1 = clamp_i32(y0 + i64::from(self.tile_height));
        Rect::from_corners(clamp_i32(x0), clamp_i32(y0), x1, y1)
    }

    /// Indices of every tile overlapping `rect`. Empty for an empty rect.
    pub fn tiles_in(&self, rect: &Rect) -> TileRange {
        if rect.is_empty() {
            return TileRange::EMPTY;
        }
        TileRange {
            min_x: self.x_to_tile(rect.min_x()),
            min_y: self.y_to_tile(rect.min_y()),
            max_x: self.x_to_tile(rect.max_x() - 1).saturating_add(1),
            max_y: self.y_to_tile(rect.max_y() - 1).saturating_add(1),
        }
    }
}

// Tile math runs in i64 so that grids anchored near either end of the
// coordinate range never overflow.

fn to_tile(v: i32, offset: i32, size: i32) -> i32 {
    clamp_i32((i64::from(v) - i64::from(offset)).div_euclid(i64::from(size)))
}

fn tile_start(t: i32, offset: i32, size: i32) -> i64 {
    i64::from(offset) + i64::from(t) * i64::from(size)
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A half-open block of tile indices `[min_x, max_x) x [min_y, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    /// First column
    pub min_x: i32,
    /// First row
    pub min_y: i32,
    /// One past the last column
    pub max_x: i32,
    /// One past the last row
    pub max_y: i32,
}

impl TileRange {
    /// A range containing no tiles.
    pub const EMPTY: TileRange = TileRange {
        min_x: 0,
        min_y: 0,
        max_x: 0,
        max_y: 0,
    };

    /// Number of columns.
    pub fn num_x(&self) -> i32 {
        (self.max_x - self.min_x).max(0)
    }

    /// Number of rows.
    pub fn num_y(&self) -> i32 {
        (self.max_y - self.min_y).max(0)
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.num_x() as usize * self.num_y() as usize
    }

    /// Whether the range holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `(tx, ty)` lies in the range.
    pub fn contains(&self, tx: i32, ty: i32) -> bool {
        tx >= self.min_x && tx < self.max_x && ty >= self.min_y && ty < self.max_y
    }

    /// Iterate indices in row-major order.
    pub fn iter(&self) -> TileIter {
        TileIter {
            range: *self,
            current_x: self.min_x,
            current_y: if self.is_empty() { self.max_y } else { self.min_y },
        }
    }
}

impl IntoIterator for TileRange {
    type Item = (i32, i32);
    type IntoIter = TileIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileIter {
    range: TileRange,
    current_x: i32,
    current_y: i32,
}

impl Iterator for TileIter {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_y >= self.range.max_y {
            return None;
        }

        let item = (self.current_x, self.current_y);

        // Move to next tile
        self.current_x += 1;
        if self.current_x >= self.range.max_x {
            self.current_x = self.range.min_x;
            self.current_y += 1;
        }

        Some(item)
    }
}
