//! Tile grid geometry shared by every mover in the arena.
//!
//! Gameplay logic operates exclusively on [`TileCoord`] values. The
//! continuous [`Vec2`] positions produced by [`tile_to_position`] exist for
//! presentation adapters and never feed back into rule evaluation.

use std::f32::consts::FRAC_1_SQRT_2;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Location of a single tile expressed as signed column and row indices.
///
/// Coordinates are signed so that offsets and knockback vectors can be
/// expressed without conversions; [`MapBounds::clamp`] pulls stray values
/// back into the arena.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the tile displaced by the provided offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Returns the tile one step away in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Computes the Chebyshev distance `max(|dx|, |dy|)` between two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Reports whether `other` lies within `reach` tiles under the Chebyshev metric.
    #[must_use]
    pub fn within_reach(self, other: TileCoord, reach: u32) -> bool {
        self.chebyshev_distance(other) <= reach
    }

    /// Reports whether `other` is one of the eight neighbours of this tile.
    #[must_use]
    pub fn is_adjacent(self, other: TileCoord) -> bool {
        self != other && self.within_reach(other, 1)
    }

    /// Iterates over the eight neighbouring tiles in [`Direction::ALL`] order.
    pub fn neighbors(self) -> impl Iterator<Item = TileCoord> {
        Direction::ALL.into_iter().map(move |direction| self.step(direction))
    }
}

/// Compass directions available to players, enemies and the boss.
///
/// The declaration order doubles as the tie-break order used by
/// [`Direction::closest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing columns and decreasing rows.
    NorthEast,
    /// Toward increasing column indices.
    East,
    /// Toward increasing columns and rows.
    SouthEast,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing columns and increasing rows.
    SouthWest,
    /// Toward decreasing column indices.
    West,
    /// Toward decreasing columns and rows.
    NorthWest,
}

impl Direction {
    /// Every direction in declaration order.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Integer tile offset of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// Unit-length vector pointing in this direction.
    #[must_use]
    pub fn unit_vector(self) -> Vec2 {
        match self {
            Self::North => Vec2::new(0.0, -1.0),
            Self::NorthEast => Vec2::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
            Self::East => Vec2::new(1.0, 0.0),
            Self::SouthEast => Vec2::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            Self::South => Vec2::new(0.0, 1.0),
            Self::SouthWest => Vec2::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            Self::West => Vec2::new(-1.0, 0.0),
            Self::NorthWest => Vec2::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        }
    }

    /// Picks the direction whose unit vector best matches `(dx, dy)`.
    ///
    /// The vector is normalised and compared against every compass vector by
    /// dot product; ties resolve to the earliest direction in [`Direction::ALL`]
    /// and the zero vector resolves to [`Direction::South`].
    #[must_use]
    pub fn closest(dx: f32, dy: f32) -> Direction {
        let heading = Vec2::new(dx, dy);
        if heading.length_squared() <= f32::EPSILON {
            return Direction::South;
        }
        let heading = heading.normalize();

        let mut best = Direction::North;
        let mut best_dot = f32::NEG_INFINITY;
        for direction in Self::ALL {
            let dot = heading.dot(direction.unit_vector());
            if dot > best_dot {
                best = direction;
                best_dot = dot;
            }
        }
        best
    }

    /// Direction pointing from `from` toward `to`, South when they coincide.
    #[must_use]
    pub fn between(from: TileCoord, to: TileCoord) -> Direction {
        let dx = to.x().saturating_sub(from.x());
        let dy = to.y().saturating_sub(from.y());
        Self::closest(dx as f32, dy as f32)
    }
}

/// Pixel dimensions of a single isometric tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileMetrics {
    tile_width: f32,
    tile_height: f32,
}

impl TileMetrics {
    /// Creates tile metrics from a tile's full width and height.
    #[must_use]
    pub const fn new(tile_width: f32, tile_height: f32) -> Self {
        Self {
            tile_width,
            tile_height,
        }
    }

    /// Full width of a tile in screen units.
    #[must_use]
    pub const fn tile_width(&self) -> f32 {
        self.tile_width
    }

    /// Full height of a tile in screen units.
    #[must_use]
    pub const fn tile_height(&self) -> f32 {
        self.tile_height
    }
}

impl Default for TileMetrics {
    fn default() -> Self {
        Self::new(64.0, 32.0)
    }
}

/// Projects a tile onto the staggered isometric screen plane.
///
/// Odd rows are shifted right by a quarter tile so that neighbouring rows
/// interlock.
#[must_use]
pub fn tile_to_position(tile: TileCoord, metrics: TileMetrics) -> Vec2 {
    let half_width = metrics.tile_width() / 2.0;
    let half_height = metrics.tile_height() / 2.0;
    let stagger = if tile.y().rem_euclid(2) == 1 {
        metrics.tile_width() / 4.0
    } else {
        0.0
    };
    Vec2::new(
        tile.x() as f32 * half_width + stagger,
        tile.y() as f32 * half_height,
    )
}

/// Playable extent of the arena, including the buffer margins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapBounds {
    width: u32,
    height: u32,
    right_buffer: u32,
    top_buffer: u32,
    bottom_buffer: u32,
}

impl MapBounds {
    /// Creates map bounds from the map size and its buffer margins.
    #[must_use]
    pub const fn new(
        width: u32,
        height: u32,
        right_buffer: u32,
        top_buffer: u32,
        bottom_buffer: u32,
    ) -> Self {
        Self {
            width,
            height,
            right_buffer,
            top_buffer,
            bottom_buffer,
        }
    }

    /// Width of the authored map in tiles, excluding buffers.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the authored map in tiles, excluding buffers.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Largest valid column index.
    #[must_use]
    pub fn max_x(&self) -> i32 {
        let columns = self.width.saturating_add(self.right_buffer);
        clamp_to_i32(columns.saturating_sub(1))
    }

    /// Largest valid row index.
    #[must_use]
    pub fn max_y(&self) -> i32 {
        let rows = self
            .height
            .saturating_add(self.top_buffer)
            .saturating_add(self.bottom_buffer);
        clamp_to_i32(rows.saturating_sub(1))
    }

    /// Clamps a tile into `[0, max_x] × [0, max_y]`.
    #[must_use]
    pub fn clamp(&self, tile: TileCoord) -> TileCoord {
        TileCoord::new(
            tile.x().clamp(0, self.max_x()),
            tile.y().clamp(0, self.max_y()),
        )
    }

    /// Reports whether the tile lies inside the bounds.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.clamp(tile) == tile
    }

    /// Tile at the centre of the playable area.
    #[must_use]
    pub fn center(&self) -> TileCoord {
        TileCoord::new(self.max_x() / 2, self.max_y() / 2)
    }
}

impl Default for MapBounds {
    fn default() -> Self {
        Self::new(30, 30, 2, 2, 2)
    }
}

fn clamp_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
