#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy and boss behaviour: idle, chase and attack evaluated at a per-kind cadence.

use std::{collections::BTreeMap, time::Duration};

use skulls_daggers_core::{
    stats::{self, BossProfile},
    BehaviorState, BossSnapshot, Command, EnemyId, EnemySnapshot, Event, PlayerId,
    PlayerSnapshot, RunStatus, TileCoord,
};

/// Pure system that turns enemy and boss snapshots into movement and attack commands.
#[derive(Debug, Default)]
pub struct AiDirector {
    next_think: BTreeMap<EnemyId, Duration>,
    boss_next_think: Option<Duration>,
}

impl AiDirector {
    /// Creates a director with no cadence history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes world events and snapshots to emit enemy and boss commands.
    ///
    /// `is_tile_open` reports whether an enemy may step onto a tile; the world
    /// re-validates every move, so a stale answer only costs a rejected step.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        status: &RunStatus,
        players: &[PlayerSnapshot],
        enemies: &[EnemySnapshot],
        boss: Option<&BossSnapshot>,
        is_tile_open: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(TileCoord) -> bool,
    {
        self.observe(events);
        let now = status.clock;

        for enemy in enemies.iter().filter(|enemy| enemy.alive) {
            if !self.due(enemy, now) {
                continue;
            }
            think_enemy(enemy, now, players, &is_tile_open, out);
        }

        if let Some(boss) = boss.filter(|boss| boss.alive) {
            let interval = BossProfile::for_level(status.level).move_interval;
            if self.boss_next_think.map_or(true, |next| now >= next) {
                self.boss_next_think = Some(now.saturating_add(interval));
                think_boss(boss, now, status.level, players, out);
            }
        } else {
            self.boss_next_think = None;
        }
    }

    /// Number of enemies whose cadence is being tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.next_think.len()
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::RunStarted { .. } | Event::RunRestored { .. } | Event::LevelAdvanced { .. } => {
                    self.next_think.clear();
                    self.boss_next_think = None;
                }
                Event::EnemyDied { enemy, .. } | Event::EnemyRemoved { enemy } => {
                    let _ = self.next_think.remove(enemy);
                }
                _ => {}
            }
        }
    }

    fn due(&mut self, enemy: &EnemySnapshot, now: Duration) -> bool {
        let next = self.next_think.entry(enemy.id).or_insert(now);
        if now < *next {
            return false;
        }
        *next = now.saturating_add(enemy.kind.profile().think_interval);
        true
    }
}

fn ready(last: Option<Duration>, now: Duration, cooldown: Duration) -> bool {
    last.map_or(true, |last| now.saturating_sub(last) >= cooldown)
}

/// Nearest living player by Chebyshev distance; ties go to the lower player index.
fn nearest_player(from: TileCoord, players: &[PlayerSnapshot]) -> Option<(PlayerId, TileCoord, u32)> {
    players
        .iter()
        .filter(|player| player.alive)
        .map(|player| (player.id, player.tile, from.chebyshev_distance(player.tile)))
        .min_by_key(|(id, _, distance)| (*distance, *id))
}

/// Candidate steps toward `target`: the diagonal first, then each axis on its own.
fn chase_steps(from: TileCoord, target: TileCoord) -> Vec<TileCoord> {
    let dx = (target.x() - from.x()).signum();
    let dy = (target.y() - from.y()).signum();
    let mut steps = Vec::with_capacity(3);
    for (sx, sy) in [(dx, dy), (dx, 0), (0, dy)] {
        if (sx, sy) == (0, 0) {
            continue;
        }
        let step = from.offset(sx, sy);
        if !steps.contains(&step) {
            steps.push(step);
        }
    }
    steps
}

fn classify(distance: u32) -> BehaviorState {
    if distance > stats::AGGRO_RANGE {
        BehaviorState::Idle
    } else if distance <= stats::MELEE_REACH {
        BehaviorState::Attack
    } else {
        BehaviorState::Chase
    }
}

fn think_enemy<F>(
    enemy: &EnemySnapshot,
    now: Duration,
    players: &[PlayerSnapshot],
    is_tile_open: &F,
    out: &mut Vec<Command>,
) where
    F: Fn(TileCoord) -> bool,
{
    let profile = enemy.kind.profile();
    let target = nearest_player(enemy.tile, players);
    let behavior = target.map_or(BehaviorState::Idle, |(_, _, distance)| classify(distance));
    if behavior != enemy.behavior {
        out.push(Command::SetEnemyBehavior {
            enemy: enemy.id,
            behavior,
        });
    }

    let Some((player, player_tile, _)) = target else {
        return;
    };
    match behavior {
        BehaviorState::Attack => {
            if ready(enemy.last_attack_at, now, profile.attack_cooldown) {
                out.push(Command::EnemyAttack {
                    enemy: enemy.id,
                    player,
                });
            }
        }
        BehaviorState::Chase => {
            if !ready(enemy.last_move_at, now, profile.move_cooldown) {
                return;
            }
            let step = chase_steps(enemy.tile, player_tile)
                .into_iter()
                .find(|tile| *tile != player_tile && is_tile_open(*tile));
            if let Some(to) = step {
                out.push(Command::MoveEnemy { enemy: enemy.id, to });
            }
        }
        BehaviorState::Idle | BehaviorState::Dead => {}
    }
}

fn think_boss(
    boss: &BossSnapshot,
    now: Duration,
    level: u32,
    players: &[PlayerSnapshot],
    out: &mut Vec<Command>,
) {
    let profile = BossProfile::for_level(level);
    let target = nearest_player(boss.tile, players);
    let behavior = match target {
        Some((_, _, distance)) if distance <= stats::MELEE_REACH => BehaviorState::Attack,
        Some(_) => BehaviorState::Chase,
        None => BehaviorState::Idle,
    };
    if behavior != boss.behavior {
        out.push(Command::SetBossBehavior { behavior });
    }

    let Some((player, player_tile, _)) = target else {
        return;
    };
    if behavior == BehaviorState::Attack {
        if ready(boss.last_attack_at, now, profile.attack_cooldown) {
            out.push(Command::BossAttack { player });
        }
        return;
    }
    if let Some(to) = chase_steps(boss.tile, player_tile)
        .into_iter()
        .find(|tile| *tile != player_tile)
    {
        out.push(Command::MoveBoss { to });
    }
}
