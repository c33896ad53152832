#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave spawning, spawn point retirement and the one-time boss trigger.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skulls_daggers_core::{
    stats, Command, EnemySnapshot, RunPhase, RunStatus, SpawnPointPlan, SpawnPointSnapshot,
    TileCoord,
};

/// Spawn intervals on level two and later deviate from the kind default by at most this share.
const INTERVAL_JITTER_PERCENT: u32 = 25;

/// Pure system that decides when and where spawn points produce enemies.
#[derive(Debug)]
pub struct SpawnDirector<R = ChaCha8Rng> {
    rng: R,
}

impl SpawnDirector<ChaCha8Rng> {
    /// Creates a director whose random draws are fully determined by `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> SpawnDirector<R> {
    /// Creates a director drawing from the provided generator.
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Emits spawn, deferral and retirement commands for every spawn point.
    ///
    /// A point spawns once strictly more than its interval has passed since the
    /// last attempt. A full spawn tile triggers up to five random probes within
    /// three tiles; when every probe fails the interval is skipped.
    pub fn handle<F>(
        &mut self,
        status: &RunStatus,
        spawn_points: &[SpawnPointSnapshot],
        enemies: &[EnemySnapshot],
        is_tile_open: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(TileCoord) -> bool,
    {
        if status.phase != RunPhase::Waves {
            return;
        }
        let now = status.clock;

        for point in spawn_points.iter().filter(|point| point.active) {
            if point.spawned >= point.max {
                let referenced = enemies
                    .iter()
                    .any(|enemy| enemy.alive && enemy.spawn_point == Some(point.id));
                if !referenced {
                    out.push(Command::DeactivateSpawnPoint {
                        spawn_point: point.id,
                    });
                }
                continue;
            }
            if now.saturating_sub(point.last_spawn_at) <= point.interval {
                continue;
            }
            match self.pick_tile(point.tile, &is_tile_open) {
                Some(tile) => out.push(Command::SpawnEnemy {
                    spawn_point: point.id,
                    tile,
                }),
                None => out.push(Command::DeferSpawn {
                    spawn_point: point.id,
                }),
            }
        }
    }

    fn pick_tile<F>(&mut self, origin: TileCoord, is_tile_open: &F) -> Option<TileCoord>
    where
        F: Fn(TileCoord) -> bool,
    {
        if is_tile_open(origin) {
            return Some(origin);
        }
        let radius = i32::try_from(stats::SPAWN_PROBE_RADIUS).unwrap_or(i32::MAX);
        (0..stats::SPAWN_PROBE_ATTEMPTS)
            .map(|_| {
                origin.offset(
                    self.rng.gen_range(-radius..=radius),
                    self.rng.gen_range(-radius..=radius),
                )
            })
            .find(|tile| is_tile_open(*tile))
    }

    /// Caps and intervals for every spawn point on `level`.
    ///
    /// Level one keeps the kind defaults; later levels draw each interval
    /// uniformly within a quarter of the default in either direction.
    pub fn plan_level(
        &mut self,
        level: u32,
        base: u32,
        spawn_points: &[SpawnPointSnapshot],
    ) -> Vec<SpawnPointPlan> {
        spawn_points
            .iter()
            .map(|point| {
                let default = point.kind.profile().spawn_interval;
                let interval = if level >= 2 {
                    let percent = self.rng.gen_range(
                        100 - INTERVAL_JITTER_PERCENT..=100 + INTERVAL_JITTER_PERCENT,
                    );
                    default.saturating_mul(percent) / 100
                } else {
                    default
                };
                SpawnPointPlan {
                    spawn_point: point.id,
                    max: stats::level_cap(base, level),
                    interval,
                }
            })
            .collect()
    }
}

/// Announces the boss once every spawn point has retired and no enemy is alive.
///
/// The check is cheap and meant to run every tick until the world records the
/// announcement; the world ignores repeats.
pub fn check_boss_trigger(
    status: &RunStatus,
    spawn_points: &[SpawnPointSnapshot],
    enemies: &[EnemySnapshot],
    boss_tile: TileCoord,
    arrival_delay: Duration,
    out: &mut Vec<Command>,
) {
    if status.phase != RunPhase::Waves || status.boss_incoming_announced {
        return;
    }
    let retired = spawn_points.iter().all(|point| !point.active);
    let cleared = enemies.iter().all(|enemy| !enemy.alive);
    if retired && cleared {
        out.push(Command::AnnounceBoss {
            tile: boss_tile,
            arrival_delay,
        });
    }
}
