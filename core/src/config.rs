//! Run configuration describing the arena layout and RNG seed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EnemyKind, MapBounds, TileCoord, TileMetrics};

/// Default number of enemies produced by each spawn point on level one.
pub const DEFAULT_SPAWNS_PER_POINT: u32 = 5;

/// Placement of a single spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnPointLayout {
    /// Enemy kind produced by the point.
    pub kind: EnemyKind,
    /// Tile on which new enemies appear.
    pub tile: TileCoord,
}

/// Arena layout and tuning supplied when a world is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Playable extent including buffer margins.
    pub bounds: MapBounds,
    /// Screen dimensions of a tile for presentation adapters.
    pub metrics: TileMetrics,
    /// Spawn points placed at the start of every level.
    pub spawn_points: Vec<SpawnPointLayout>,
    /// Enemies produced by each spawn point on level one.
    pub spawns_per_point: u32,
    /// Crates placed at the start of a run.
    pub crates: Vec<TileCoord>,
    /// Start tiles of player one and player two.
    pub player_starts: [TileCoord; 2],
    /// Optional designated boss arrival tile; the map centre otherwise.
    pub boss_tile: Option<TileCoord>,
    /// Seed for every random draw made by the systems.
    pub seed: u64,
}

impl RunConfig {
    /// Checks that every authored tile lies inside the arena.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bounds.width() == 0 || self.bounds.height() == 0 {
            return Err(ConfigError::EmptyMap);
        }
        if self.spawn_points.is_empty() {
            return Err(ConfigError::NoSpawnPoints);
        }
        let authored = self
            .spawn_points
            .iter()
            .map(|point| point.tile)
            .chain(self.crates.iter().copied())
            .chain(self.player_starts.iter().copied())
            .chain(self.boss_tile);
        for tile in authored {
            if !self.bounds.contains(tile) {
                return Err(ConfigError::OutOfBounds {
                    x: tile.x(),
                    y: tile.y(),
                });
            }
        }
        Ok(())
    }

    /// Tile on which the boss arrives.
    #[must_use]
    pub fn boss_arrival_tile(&self) -> TileCoord {
        self.boss_tile.unwrap_or_else(|| self.bounds.center())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        let skeleton = |x, y| SpawnPointLayout {
            kind: EnemyKind::Skeleton,
            tile: TileCoord::new(x, y),
        };
        let slime = |x, y| SpawnPointLayout {
            kind: EnemyKind::Slime,
            tile: TileCoord::new(x, y),
        };
        Self {
            bounds: MapBounds::default(),
            metrics: TileMetrics::default(),
            spawn_points: vec![
                skeleton(4, 4),
                skeleton(27, 6),
                skeleton(16, 31),
                slime(6, 28),
                slime(28, 27),
                slime(16, 2),
            ],
            spawns_per_point: DEFAULT_SPAWNS_PER_POINT,
            crates: vec![
                TileCoord::new(10, 10),
                TileCoord::new(22, 11),
                TileCoord::new(12, 23),
            ],
            player_starts: [TileCoord::new(16, 17), TileCoord::new(17, 17)],
            boss_tile: None,
            seed: 0x5eed_0f_5ca1_ab1e,
        }
    }
}

/// Reasons a run configuration is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The map has no playable tiles.
    #[error("map must be at least one tile wide and tall")]
    EmptyMap,
    /// No spawn point was configured.
    #[error("at least one spawn point is required")]
    NoSpawnPoints,
    /// An authored tile lies outside the arena.
    #[error("tile ({x}, {y}) lies outside the arena")]
    OutOfBounds {
        /// Column of the offending tile.
        x: i32,
        /// Row of the offending tile.
        y: i32,
    },
}
