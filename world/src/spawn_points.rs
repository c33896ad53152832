//! Spawn point counters owned by the world on behalf of the spawn director.

use std::time::Duration;

use skulls_daggers_core::{EnemyKind, SpawnPointId, SpawnPointSnapshot, TileCoord};

#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnPoint {
    pub(crate) id: SpawnPointId,
    pub(crate) kind: EnemyKind,
    pub(crate) tile: TileCoord,
    pub(crate) spawned: u32,
    pub(crate) max: u32,
    pub(crate) interval: Duration,
    pub(crate) last_spawn_at: Duration,
    pub(crate) active: bool,
}

impl SpawnPoint {
    pub(crate) fn new(id: SpawnPointId, kind: EnemyKind, tile: TileCoord, max: u32) -> Self {
        Self {
            id,
            kind,
            tile,
            spawned: 0,
            max,
            interval: kind.profile().spawn_interval,
            last_spawn_at: Duration::ZERO,
            active: true,
        }
    }

    /// Re-arms the point for a new level.
    pub(crate) fn rearm(&mut self, max: u32, interval: Duration, now: Duration) {
        self.spawned = 0;
        self.max = max;
        self.interval = interval;
        self.last_spawn_at = now;
        self.active = true;
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.spawned >= self.max
    }

    pub(crate) fn snapshot(&self) -> SpawnPointSnapshot {
        SpawnPointSnapshot {
            id: self.id,
            kind: self.kind,
            tile: self.tile,
            spawned: self.spawned,
            max: self.max,
            interval: self.interval,
            last_spawn_at: self.last_spawn_at,
            active: self.active,
        }
    }
}
