//! Live enemy and boss collections with occupancy queries.

use std::{collections::BTreeMap, time::Duration};

use skulls_daggers_core::{
    stats::BossProfile, BehaviorState, BossSnapshot, Direction, EnemyId, EnemyKind,
    EnemySnapshot, SpawnPointId, TileCoord,
};

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) tile: TileCoord,
    pub(crate) facing: Direction,
    pub(crate) health: u32,
    pub(crate) alive: bool,
    pub(crate) behavior: BehaviorState,
    pub(crate) last_move_at: Option<Duration>,
    pub(crate) last_attack_at: Option<Duration>,
    pub(crate) spawn_point: Option<SpawnPointId>,
}

impl Enemy {
    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind,
            tile: self.tile,
            facing: self.facing,
            health: self.health,
            alive: self.alive,
            behavior: self.behavior,
            last_move_at: self.last_move_at,
            last_attack_at: self.last_attack_at,
            spawn_point: self.spawn_point,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Boss {
    pub(crate) tile: TileCoord,
    pub(crate) facing: Direction,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) damage: u32,
    pub(crate) alive: bool,
    pub(crate) behavior: BehaviorState,
    pub(crate) last_move_at: Option<Duration>,
    pub(crate) last_attack_at: Option<Duration>,
}

impl Boss {
    pub(crate) fn arrive(tile: TileCoord, level: u32) -> Self {
        let profile = BossProfile::for_level(level);
        Self {
            tile,
            facing: Direction::South,
            health: profile.max_health,
            max_health: profile.max_health,
            damage: profile.damage,
            alive: true,
            behavior: BehaviorState::Idle,
            last_move_at: None,
            last_attack_at: None,
        }
    }

    pub(crate) fn snapshot(&self) -> BossSnapshot {
        BossSnapshot {
            tile: self.tile,
            facing: self.facing,
            health: self.health,
            max_health: self.max_health,
            alive: self.alive,
            behavior: self.behavior,
            last_move_at: self.last_move_at,
            last_attack_at: self.last_attack_at,
        }
    }
}

/// Enemies keyed by identifier so that iteration order is deterministic.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    enemies: BTreeMap<EnemyId, Enemy>,
    pub(crate) boss: Option<Boss>,
    next_enemy_id: u32,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Drops every enemy and the boss; identifiers keep increasing.
    pub(crate) fn clear(&mut self) {
        self.enemies.clear();
        self.boss = None;
    }

    pub(crate) fn spawn(
        &mut self,
        kind: EnemyKind,
        tile: TileCoord,
        facing: Direction,
        spawn_point: Option<SpawnPointId>,
    ) -> EnemyId {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);
        let enemy = Enemy {
            id,
            kind,
            tile,
            facing,
            health: kind.profile().max_health,
            alive: true,
            behavior: BehaviorState::Idle,
            last_move_at: None,
            last_attack_at: None,
            spawn_point,
        };
        let _ = self.enemies.insert(id, enemy);
        id
    }

    pub(crate) fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    pub(crate) fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: EnemyId) -> Option<Enemy> {
        self.enemies.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    pub(crate) fn alive(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values().filter(|enemy| enemy.alive)
    }

    /// Alive enemies standing on `tile`; corpses never count.
    pub(crate) fn count_on_tile(&self, tile: TileCoord) -> usize {
        self.alive().filter(|enemy| enemy.tile == tile).count()
    }

    pub(crate) fn alive_count(&self, kind: EnemyKind) -> usize {
        self.alive().filter(|enemy| enemy.kind == kind).count()
    }

    pub(crate) fn alive_total(&self) -> usize {
        self.alive().count()
    }

    pub(crate) fn references_spawn_point(&self, spawn_point: SpawnPointId) -> bool {
        self.alive()
            .any(|enemy| enemy.spawn_point == Some(spawn_point))
    }

    pub(crate) fn live_boss(&self) -> Option<&Boss> {
        self.boss.as_ref().filter(|boss| boss.alive)
    }
}
