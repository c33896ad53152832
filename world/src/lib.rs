#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Skulls & Daggers.
//!
//! The world owns every live entity, the shared party economy, and the
//! scheduled-event queue that models timed effects. It is mutated only
//! through [`apply`]; systems observe it through the [`query`] module.

mod loot;
mod players;
mod registry;
mod schedule;
mod spawn_points;

use std::time::Duration;

use skulls_daggers_core::{
    stats::{self, BossProfile},
    AbilityRejection, AbilitySlot, AreaHit, AttackRejection, BehaviorState, Buff, BuffKind,
    CharacterKind, Command, ConsumableEffect, ConsumableRejection, CrateId, DashPhase, Direction,
    Economy, EnemyId, Event, GemColor, ItemKind, LootId, LootKind, MagicEffect, MeleeTarget,
    MoveRejection, PlayMode, PlayerId, PurchaseRejection, RunConfig, RunPhase, RunSnapshot,
    ShopItem, SpawnPointId, SpawnPointPlan, TileCoord, UpgradeKind,
};
use tracing::debug;

use crate::{
    loot::{Crates, LootField},
    players::{elapsed, Player},
    registry::{Boss, Registry},
    schedule::{Schedule, ScheduledAction},
    spawn_points::SpawnPoint,
};

/// Represents the authoritative Skulls & Daggers world state.
#[derive(Debug)]
pub struct World {
    config: RunConfig,
    mode: PlayMode,
    phase: RunPhase,
    level: u32,
    clock: Duration,
    players: Vec<Player>,
    economy: Economy,
    registry: Registry,
    spawn_points: Vec<SpawnPoint>,
    loot: LootField,
    crates: Crates,
    schedule: Schedule,
    boss_incoming_announced: bool,
    victory_announced: bool,
    next_token: u64,
}

impl World {
    /// Creates a world laid out from `config` with a single-knight run ready to play.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        let mode = PlayMode::Single(CharacterKind::Knight);
        let mut world = Self {
            config,
            mode,
            phase: RunPhase::Waves,
            level: 1,
            clock: Duration::ZERO,
            players: Vec::new(),
            economy: Economy::default(),
            registry: Registry::new(),
            spawn_points: Vec::new(),
            loot: LootField::new(),
            crates: Crates::new(),
            schedule: Schedule::new(),
            boss_incoming_announced: false,
            victory_announced: false,
            next_token: 0,
        };
        world.reset_run(mode);
        world
    }

    fn reset_run(&mut self, mode: PlayMode) {
        let bounds = self.config.bounds;
        self.mode = mode;
        self.phase = RunPhase::Waves;
        self.level = 1;
        self.clock = Duration::ZERO;
        self.economy = Economy::default();
        self.players = (0u32..)
            .zip(mode.characters())
            .zip(self.config.player_starts)
            .map(|((index, character), start)| {
                Player::new(PlayerId::new(index), character, bounds.clamp(start), 0)
            })
            .collect();
        self.registry.clear();
        self.spawn_points = (0u32..)
            .zip(&self.config.spawn_points)
            .map(|(index, layout)| {
                SpawnPoint::new(
                    SpawnPointId::new(index),
                    layout.kind,
                    bounds.clamp(layout.tile),
                    self.config.spawns_per_point,
                )
            })
            .collect();
        self.loot.clear();
        self.crates.clear();
        for tile in &self.config.crates {
            let _ = self.crates.place(bounds.clamp(*tile));
        }
        self.schedule.clear();
        self.boss_incoming_announced = false;
        self.victory_announced = false;
    }

    fn next_token(&mut self) -> u64 {
        self.next_token = self.next_token.wrapping_add(1);
        self.next_token
    }

    fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    fn spawn_point_mut(&mut self, id: SpawnPointId) -> Option<&mut SpawnPoint> {
        self.spawn_points.iter_mut().find(|point| point.id == id)
    }

    fn live_player_on(&self, tile: TileCoord) -> bool {
        self.players
            .iter()
            .any(|player| player.alive && player.tile == tile)
    }

    /// First tile at or around `preferred` that no living player stands on,
    /// scanning rings out to the spawn probe radius.
    fn boss_landing_tile(&self, preferred: TileCoord) -> TileCoord {
        let bounds = self.config.bounds;
        let open = |tile: TileCoord| bounds.contains(tile) && !self.live_player_on(tile);
        if open(preferred) {
            return preferred;
        }
        let reach = i32::try_from(stats::SPAWN_PROBE_RADIUS).unwrap_or(i32::MAX);
        (1..=reach)
            .flat_map(|radius| {
                (-radius..=radius).flat_map(move |dy| {
                    (-radius..=radius)
                        .filter(move |dx| dx.abs() == radius || dy.abs() == radius)
                        .map(move |dx| preferred.offset(dx, dy))
                })
            })
            .find(|tile| open(*tile))
            .unwrap_or(preferred)
    }

    fn hostile_on(&self, tile: TileCoord) -> bool {
        self.registry.count_on_tile(tile) > 0
            || self
                .registry
                .live_boss()
                .map_or(false, |boss| boss.tile == tile)
    }

    fn is_tile_open_for_enemy(&self, tile: TileCoord) -> bool {
        self.config.bounds.contains(tile)
            && self.registry.count_on_tile(tile) < stats::TILE_STACK_LIMIT
            && !self.live_player_on(tile)
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        for player in &mut self.players {
            player.regenerate_mana(dt);
        }
        out_events.push(Event::TimeAdvanced {
            dt,
            now: self.clock,
        });

        while let Some(action) = self.schedule.pop_due(self.clock) {
            self.fire(action, out_events);
        }
    }

    fn fire(&mut self, action: ScheduledAction, out_events: &mut Vec<Event>) {
        match action {
            ScheduledAction::RemoveEnemy { enemy } => {
                let dead = self
                    .registry
                    .enemy(enemy)
                    .map_or(false, |entry| !entry.alive);
                if dead && self.registry.remove(enemy).is_some() {
                    out_events.push(Event::EnemyRemoved { enemy });
                }
            }
            ScheduledAction::RemoveBoss => {
                if self.registry.boss.as_ref().map_or(false, |boss| !boss.alive) {
                    self.registry.boss = None;
                    out_events.push(Event::BossRemoved);
                }
            }
            ScheduledAction::ExpireBuff {
                player,
                kind,
                ends_at,
            } => {
                let Some(entry) = self.player_mut(player) else {
                    return;
                };
                let current = entry.buffs.get(kind).map(|buff| buff.ends_at);
                if current == Some(ends_at) {
                    let _ = entry.buffs.remove(kind);
                    out_events.push(Event::BuffExpired { player, kind });
                }
            }
            ScheduledAction::EndSignature { player, token } => {
                let Some(entry) = self.player_mut(player) else {
                    return;
                };
                if entry.signature_active && entry.signature_token == token {
                    entry.signature_active = false;
                    entry.move_speed = entry.character.profile().move_speed;
                    out_events.push(Event::SignatureEnded { player });
                }
            }
            ScheduledAction::ExpireMagic { player, token } => {
                let Some(entry) = self.player_mut(player) else {
                    return;
                };
                if entry.magic_token != token {
                    return;
                }
                if let Some(effect) = entry.magic_active.take() {
                    match effect {
                        MagicEffect::Ward => {}
                        MagicEffect::Rage => entry.rage_armed = false,
                        MagicEffect::Aura => entry.aura_active = false,
                    }
                    out_events.push(Event::MagicExpired { player, effect });
                }
            }
            ScheduledAction::DashSustain { player, token } => {
                let Some(entry) = self.player_mut(player) else {
                    return;
                };
                if entry.dash_token == token && entry.dash_phase == Some(DashPhase::Burst) {
                    entry.dash_phase = Some(DashPhase::Sustained);
                    out_events.push(Event::DashSustained { player });
                }
            }
            ScheduledAction::DashEnd { player, token } => {
                let Some(entry) = self.player_mut(player) else {
                    return;
                };
                if entry.dash_token == token && entry.dash_phase.take().is_some() {
                    out_events.push(Event::DashEnded { player });
                }
            }
            ScheduledAction::ResetAttack { player, token } => {
                let Some(entry) = self.player_mut(player) else {
                    return;
                };
                if entry.attacking && entry.attack_token == token {
                    entry.attacking = false;
                    out_events.push(Event::AttackFinished { player });
                }
            }
            ScheduledAction::BossArrival { tile, level } => {
                if level != self.level
                    || self.phase != RunPhase::BossIncoming
                    || self.registry.live_boss().is_some()
                {
                    return;
                }
                let tile = self.boss_landing_tile(tile);
                let boss = Boss::arrive(tile, level);
                let health = boss.health;
                self.registry.boss = Some(boss);
                self.phase = RunPhase::BossFight;
                out_events.push(Event::BossSpawned { tile, health });
            }
        }
    }

    fn start_run(&mut self, mode: PlayMode, out_events: &mut Vec<Event>) {
        self.reset_run(mode);
        out_events.push(Event::RunStarted {
            mode,
            level: self.level,
        });
    }

    fn advance_level(&mut self, spawn_plan: &[SpawnPointPlan], out_events: &mut Vec<Event>) {
        if self.phase != RunPhase::Victory {
            debug!(phase = ?self.phase, "level advance requested before victory");
            return;
        }
        self.level = self.level.saturating_add(1);
        self.phase = RunPhase::Waves;
        self.boss_incoming_announced = false;
        self.victory_announced = false;
        self.registry.clear();

        let level = self.level;
        let base = self.config.spawns_per_point;
        let now = self.clock;
        for point in &mut self.spawn_points {
            let planned = spawn_plan
                .iter()
                .find(|plan| plan.spawn_point == point.id);
            let max = planned.map_or_else(|| stats::level_cap(base, level), |plan| plan.max);
            let interval =
                planned.map_or_else(|| point.kind.profile().spawn_interval, |plan| plan.interval);
            point.rearm(max, interval, now);
        }
        out_events.push(Event::LevelAdvanced { level });
    }

    fn restore_run(&mut self, snapshot: RunSnapshot, out_events: &mut Vec<Event>) {
        let bounds = self.config.bounds;
        self.reset_run(snapshot.mode);
        self.level = snapshot.level.max(1);
        self.phase = snapshot.phase;
        self.boss_incoming_announced = snapshot.boss_incoming_announced;
        self.victory_announced = snapshot.victory_announced;
        self.economy = snapshot.economy;

        for (player, record) in self.players.iter_mut().zip(&snapshot.players) {
            let mut restored = Player::new(player.id, record.character, bounds.clamp(record.tile), 0);
            restored.max_health = record.max_health.max(1);
            restored.health = record.health.min(restored.max_health);
            restored.alive = restored.health > 0;
            restored.facing = record.facing;
            *player = restored;
        }

        if !snapshot.spawn_points.is_empty() {
            self.spawn_points = (0u32..)
                .zip(&snapshot.spawn_points)
                .map(|(index, record)| {
                    let mut point = SpawnPoint::new(
                        SpawnPointId::new(index),
                        record.kind,
                        bounds.clamp(record.tile),
                        record.max,
                    );
                    point.spawned = record.spawned;
                    point.active = record.active;
                    if let Some(interval) = record.interval {
                        point.interval = interval;
                    }
                    point
                })
                .collect();
        }

        for record in &snapshot.enemies {
            let tile = bounds.clamp(record.tile);
            if !self.is_tile_open_for_enemy(tile) {
                debug!(x = tile.x(), y = tile.y(), "restored enemy dropped on a full tile");
                continue;
            }
            let _ = self.registry.spawn(record.kind, tile, record.facing, None);
        }

        if let Some(record) = snapshot.boss.filter(|record| record.health > 0) {
            let mut boss = Boss::arrive(bounds.clamp(record.tile), self.level);
            boss.health = record.health.min(boss.max_health);
            self.registry.boss = Some(boss);
            self.phase = RunPhase::BossFight;
            self.boss_incoming_announced = true;
        } else if matches!(self.phase, RunPhase::BossIncoming | RunPhase::BossFight) {
            self.phase = RunPhase::BossIncoming;
            self.boss_incoming_announced = true;
            let arrives_at = self.clock.saturating_add(stats::BOSS_ARRIVAL_DELAY);
            self.schedule.push(
                arrives_at,
                ScheduledAction::BossArrival {
                    tile: self.config.boss_arrival_tile(),
                    level: self.level,
                },
            );
        }

        for record in &snapshot.loot {
            if record.amount > 0 {
                let _ = self
                    .loot
                    .place(bounds.clamp(record.tile), record.kind, record.amount);
            }
        }

        self.crates.clear();
        for tile in &snapshot.crates {
            let _ = self.crates.place(bounds.clamp(*tile));
        }

        if self.players.iter().any(|player| !player.alive) {
            self.phase = RunPhase::Defeated;
        } else if self.phase == RunPhase::Defeated {
            self.phase = RunPhase::Waves;
        }

        out_events.push(Event::RunRestored { level: self.level });
    }

    fn move_player(&mut self, id: PlayerId, direction: Direction, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(player) = self.player(id) else {
            debug!(player = id.get(), "move for unknown player ignored");
            return;
        };
        let from = player.tile;
        let to = self.config.bounds.clamp(from.step(direction));
        let rejection = if !player.alive {
            Some(MoveRejection::Defeated)
        } else if player.attacking {
            Some(MoveRejection::Attacking)
        } else if !elapsed(player.last_step_at, now, player.step_interval()) {
            Some(MoveRejection::Recovering)
        } else if to != from && self.hostile_on(to) {
            Some(MoveRejection::Blocked)
        } else {
            None
        };
        if let Some(reason) = rejection {
            debug!(player = id.get(), ?reason, "player move rejected");
            out_events.push(Event::MoveRejected { player: id, reason });
            return;
        }

        if let Some(player) = self.player_mut(id) {
            player.tile = to;
            player.facing = direction;
            player.last_step_at = Some(now);
        }
        out_events.push(Event::PlayerMoved {
            player: id,
            from,
            to,
            facing: direction,
        });
    }

    fn melee_target_tile(&self, target: MeleeTarget, origin: TileCoord) -> Option<TileCoord> {
        match target {
            MeleeTarget::Enemy(enemy) => self
                .registry
                .enemy(enemy)
                .filter(|entry| entry.alive)
                .map(|entry| entry.tile),
            MeleeTarget::Boss => self.registry.live_boss().map(|boss| boss.tile),
            MeleeTarget::Crate(crate_id) => self
                .crates
                .get(crate_id)
                .filter(|entry| !entry.broken)
                .map(|entry| entry.tile),
            MeleeTarget::Nothing => Some(origin),
        }
    }

    fn melee_attack(
        &mut self,
        id: PlayerId,
        target: MeleeTarget,
        damage: u32,
        consume_rage: bool,
        interval: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.clock;
        let Some(player) = self.player(id) else {
            return;
        };
        let origin = player.tile;
        let rage_armed = player.rage_armed;
        let target_tile = self.melee_target_tile(target, origin);
        let rejection = if !player.alive {
            Some(AttackRejection::Defeated)
        } else if player.attacking || !elapsed(player.last_attack_at, now, interval) {
            Some(AttackRejection::OnCooldown)
        } else if !target_tile.map_or(false, |tile| origin.within_reach(tile, stats::MELEE_REACH)) {
            Some(AttackRejection::OutOfReach)
        } else {
            None
        };
        if let Some(reason) = rejection {
            debug!(player = id.get(), ?reason, "melee attack rejected");
            out_events.push(Event::AttackRejected { player: id, reason });
            return;
        }

        let facing = match target_tile {
            Some(tile) if tile != origin => Direction::between(origin, tile),
            _ => player.facing,
        };
        let strikes_foe = matches!(target, MeleeTarget::Enemy(_) | MeleeTarget::Boss);
        let spend_rage = consume_rage && rage_armed && strikes_foe;
        let damage = if consume_rage && !rage_armed {
            damage / 2
        } else {
            damage
        };

        let token = self.next_token();
        if let Some(player) = self.player_mut(id) {
            player.attacking = true;
            player.attack_token = token;
            player.last_attack_at = Some(now);
            player.facing = facing;
            if spend_rage {
                player.rage_armed = false;
                if player.magic_active == Some(MagicEffect::Rage) {
                    player.magic_active = None;
                }
            }
        }
        self.schedule.push(
            now.saturating_add(stats::ATTACK_RECOVERY),
            ScheduledAction::ResetAttack { player: id, token },
        );
        out_events.push(Event::AttackStarted {
            player: id,
            target,
            facing,
        });
        if spend_rage {
            out_events.push(Event::RageConsumed { player: id });
            out_events.push(Event::MagicExpired {
                player: id,
                effect: MagicEffect::Rage,
            });
        }

        match target {
            MeleeTarget::Enemy(enemy) => self.damage_enemy(enemy, damage, out_events),
            MeleeTarget::Boss => self.damage_boss(damage, out_events),
            MeleeTarget::Crate(crate_id) => self.break_crate(crate_id, out_events),
            MeleeTarget::Nothing => {}
        }
    }

    fn finish_attack(&mut self, id: PlayerId, out_events: &mut Vec<Event>) {
        let Some(player) = self.player_mut(id) else {
            return;
        };
        if player.attacking {
            player.attacking = false;
            out_events.push(Event::AttackFinished { player: id });
        }
    }

    fn area_strike(
        &mut self,
        id: PlayerId,
        hits: &[AreaHit],
        boss_damage: Option<u32>,
        out_events: &mut Vec<Event>,
    ) {
        if self.player(id).is_none() {
            return;
        }
        for hit in hits {
            let Some(from) = self
                .registry
                .enemy(hit.enemy)
                .filter(|entry| entry.alive)
                .map(|entry| entry.tile)
            else {
                continue;
            };
            let to = self.config.bounds.clamp(hit.knockback_to);
            if to != from && self.is_tile_open_for_enemy(to) {
                if let Some(enemy) = self.registry.enemy_mut(hit.enemy) {
                    enemy.tile = to;
                }
                out_events.push(Event::EnemyKnockedBack {
                    enemy: hit.enemy,
                    from,
                    to,
                });
            }
            self.damage_enemy(hit.enemy, hit.damage, out_events);
        }
        if let Some(damage) = boss_damage {
            self.damage_boss(damage, out_events);
        }
    }

    fn damage_enemy(&mut self, id: EnemyId, damage: u32, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(enemy) = self.registry.enemy_mut(id).filter(|entry| entry.alive) else {
            return;
        };
        enemy.health = enemy.health.saturating_sub(damage);
        if enemy.health > 0 {
            out_events.push(Event::EnemyDamaged {
                enemy: id,
                damage,
                health: enemy.health,
            });
            return;
        }

        enemy.alive = false;
        enemy.behavior = BehaviorState::Dead;
        out_events.push(Event::EnemyDied {
            enemy: id,
            kind: enemy.kind,
            tile: enemy.tile,
            spawn_point: enemy.spawn_point,
        });
        self.schedule.push(
            now.saturating_add(stats::CORPSE_DELAY),
            ScheduledAction::RemoveEnemy { enemy: id },
        );
    }

    fn damage_boss(&mut self, damage: u32, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let level = self.level;
        let Some(boss) = self.registry.boss.as_mut().filter(|boss| boss.alive) else {
            return;
        };
        boss.health = boss.health.saturating_sub(damage);
        if boss.health > 0 {
            out_events.push(Event::BossDamaged {
                damage,
                health: boss.health,
            });
            return;
        }

        boss.alive = false;
        boss.behavior = BehaviorState::Dead;
        out_events.push(Event::BossDied {
            tile: boss.tile,
            level,
        });
        self.schedule
            .push(now.saturating_add(stats::CORPSE_DELAY), ScheduledAction::RemoveBoss);
        self.phase = RunPhase::Victory;
        self.victory_announced = true;
        out_events.push(Event::Victory { level });
    }

    fn damage_player(&mut self, id: PlayerId, damage: u32, out_events: &mut Vec<Event>) {
        let Some(player) = self
            .players
            .iter_mut()
            .find(|player| player.id == id && player.alive)
        else {
            return;
        };
        let mitigation = stats::mitigate(damage, player.defenses());
        if mitigation.shield_consumed {
            let _ = player.buffs.remove(BuffKind::Shield);
            out_events.push(Event::ShieldConsumed { player: id });
            return;
        }

        player.health = player.health.saturating_sub(mitigation.applied);
        out_events.push(Event::PlayerDamaged {
            player: id,
            damage: mitigation.applied,
            health: player.health,
        });
        if player.health == 0 {
            player.alive = false;
            player.attacking = false;
            out_events.push(Event::PlayerDefeated { player: id });
            if self.phase != RunPhase::Victory {
                self.phase = RunPhase::Defeated;
            }
        }
    }

    fn break_crate(&mut self, id: CrateId, out_events: &mut Vec<Event>) {
        let Some(entry) = self.crates.get_mut(id).filter(|entry| !entry.broken) else {
            return;
        };
        entry.broken = true;
        out_events.push(Event::CrateBroken {
            crate_id: id,
            tile: entry.tile,
        });
    }

    fn reject_ability(
        id: PlayerId,
        slot: AbilitySlot,
        reason: AbilityRejection,
        out_events: &mut Vec<Event>,
    ) {
        debug!(player = id.get(), ?slot, ?reason, "ability rejected");
        out_events.push(Event::AbilityRejected {
            player: id,
            slot,
            reason,
        });
    }

    fn activate_signature(
        &mut self,
        id: PlayerId,
        cooldown: Duration,
        active_for: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.clock;
        let Some(player) = self.player(id) else {
            return;
        };
        let rejection = if !player.alive {
            Some(AbilityRejection::Defeated)
        } else if player.signature_active {
            Some(AbilityRejection::AlreadyActive)
        } else if !elapsed(player.last_signature_at, now, cooldown) {
            Some(AbilityRejection::OnCooldown)
        } else {
            None
        };
        if let Some(reason) = rejection {
            Self::reject_ability(id, AbilitySlot::Signature, reason, out_events);
            return;
        }

        let token = self.next_token();
        let Some(player) = self.player_mut(id) else {
            return;
        };
        player.signature_active = true;
        player.signature_token = token;
        player.last_signature_at = Some(now);
        player.move_speed *= stats::SIGNATURE_SPEED_FACTOR;
        out_events.push(Event::SignatureActivated {
            player: id,
            ability: player.character.profile().signature,
            origin: player.tile,
            facing: player.facing,
        });
        self.schedule.push(
            now.saturating_add(active_for),
            ScheduledAction::EndSignature { player: id, token },
        );
    }

    fn activate_magic(
        &mut self,
        id: PlayerId,
        cooldown: Duration,
        active_for: Duration,
        mana_cost: f32,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.clock;
        let Some(player) = self.player(id) else {
            return;
        };
        let rejection = if !player.alive {
            Some(AbilityRejection::Defeated)
        } else if player.magic_active.is_some() {
            Some(AbilityRejection::AlreadyActive)
        } else if !elapsed(player.last_magic_at, now, cooldown) {
            Some(AbilityRejection::OnCooldown)
        } else if player.mana.map_or(false, |mana| mana < mana_cost) {
            Some(AbilityRejection::InsufficientMana)
        } else {
            None
        };
        if let Some(reason) = rejection {
            Self::reject_ability(id, AbilitySlot::Magic, reason, out_events);
            return;
        }

        let token = self.next_token();
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let effect = player.character.profile().magic;
        if let Some(mana) = player.mana.as_mut() {
            *mana = (*mana - mana_cost).max(0.0);
        }
        player.last_magic_at = Some(now);
        player.magic_active = Some(effect);
        player.magic_token = token;
        match effect {
            MagicEffect::Ward => {}
            MagicEffect::Rage => player.rage_armed = true,
            MagicEffect::Aura => player.aura_active = true,
        }
        out_events.push(Event::MagicActivated { player: id, effect });

        let ends_at = now.saturating_add(active_for);
        if effect == MagicEffect::Ward {
            self.apply_buff(
                id,
                Buff {
                    kind: BuffKind::Shield,
                    multiplier: 1.0,
                    ends_at,
                },
                out_events,
            );
        }
        self.schedule
            .push(ends_at, ScheduledAction::ExpireMagic { player: id, token });
    }

    fn activate_dash(&mut self, id: PlayerId, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(player) = self.player(id) else {
            return;
        };
        let rejection = if !player.alive {
            Some(AbilityRejection::Defeated)
        } else if player.dash_phase.is_some() {
            Some(AbilityRejection::AlreadyActive)
        } else if !elapsed(player.last_dash_at, now, stats::DASH_CYCLE) {
            Some(AbilityRejection::OnCooldown)
        } else {
            None
        };
        if let Some(reason) = rejection {
            Self::reject_ability(id, AbilitySlot::Dash, reason, out_events);
            return;
        }

        let token = self.next_token();
        if let Some(player) = self.player_mut(id) {
            player.dash_phase = Some(DashPhase::Burst);
            player.dash_token = token;
            player.last_dash_at = Some(now);
        }
        let sustain_at = now.saturating_add(stats::DASH_BURST);
        self.schedule.push(
            sustain_at,
            ScheduledAction::DashSustain { player: id, token },
        );
        self.schedule.push(
            sustain_at.saturating_add(stats::DASH_SUSTAIN),
            ScheduledAction::DashEnd { player: id, token },
        );
        out_events.push(Event::DashStarted { player: id });
    }

    fn apply_buff(&mut self, id: PlayerId, buff: Buff, out_events: &mut Vec<Event>) {
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let _ = player.buffs.apply(buff);
        self.schedule.push(
            buff.ends_at,
            ScheduledAction::ExpireBuff {
                player: id,
                kind: buff.kind,
                ends_at: buff.ends_at,
            },
        );
        out_events.push(Event::BuffApplied {
            player: id,
            kind: buff.kind,
            multiplier: buff.multiplier,
            ends_at: buff.ends_at,
        });
    }

    fn apply_consumable(
        &mut self,
        id: PlayerId,
        effect: ConsumableEffect,
        out_events: &mut Vec<Event>,
    ) {
        match effect {
            ConsumableEffect::Heal(amount) => {
                let Some(player) = self.player_mut(id) else {
                    return;
                };
                let healed = player.heal(amount);
                out_events.push(Event::PlayerHealed {
                    player: id,
                    amount: healed,
                    health: player.health,
                });
            }
            ConsumableEffect::Buff {
                kind,
                multiplier,
                duration,
            } => {
                let ends_at = self.clock.saturating_add(duration);
                self.apply_buff(
                    id,
                    Buff {
                        kind,
                        multiplier,
                        ends_at,
                    },
                    out_events,
                );
            }
        }
    }

    fn consumable_rejection(&self, id: PlayerId) -> Option<ConsumableRejection> {
        match self.player(id) {
            Some(player) if player.alive => None,
            _ => Some(ConsumableRejection::Defeated),
        }
    }

    fn use_item(
        &mut self,
        id: PlayerId,
        item: ItemKind,
        effect: ConsumableEffect,
        out_events: &mut Vec<Event>,
    ) {
        let rejection = self.consumable_rejection(id).or_else(|| {
            (!self.economy.inventory.take(item)).then_some(ConsumableRejection::OutOfStock)
        });
        if let Some(reason) = rejection {
            debug!(player = id.get(), ?item, ?reason, "item use rejected");
            out_events.push(Event::ConsumableRejected { player: id, reason });
            return;
        }
        out_events.push(Event::ItemUsed { player: id, item });
        self.apply_consumable(id, effect, out_events);
    }

    fn consume_gem(
        &mut self,
        id: PlayerId,
        color: GemColor,
        effect: ConsumableEffect,
        out_events: &mut Vec<Event>,
    ) {
        let rejection = self.consumable_rejection(id).or_else(|| {
            (!self.economy.gems.take(color)).then_some(ConsumableRejection::OutOfStock)
        });
        if let Some(reason) = rejection {
            debug!(player = id.get(), ?color, ?reason, "gem use rejected");
            out_events.push(Event::ConsumableRejected { player: id, reason });
            return;
        }
        out_events.push(Event::GemConsumed { player: id, color });
        self.apply_consumable(id, effect, out_events);
    }

    fn purchase(&mut self, item: ShopItem, quantity: u32, out_events: &mut Vec<Event>) {
        let cost = match item.price().checked_mul(quantity) {
            Some(cost) if cost <= self.economy.gold => Ok(cost),
            _ => Err(PurchaseRejection::InsufficientGold),
        };
        let cost = match cost {
            Ok(cost) => cost,
            Err(reason) => {
                debug!(?item, quantity, ?reason, "purchase rejected");
                out_events.push(Event::PurchaseRejected {
                    item,
                    quantity,
                    reason,
                });
                return;
            }
        };

        self.economy.gold -= cost;
        match item {
            ShopItem::Item(kind) => self.economy.inventory.add(kind, quantity),
            ShopItem::Upgrade(kind) => {
                self.economy.upgrades.raise(kind, quantity);
                if kind == UpgradeKind::Health {
                    let bonus = stats::HEALTH_PER_UPGRADE.saturating_mul(quantity);
                    for player in &mut self.players {
                        player.max_health = player.max_health.saturating_add(bonus);
                        if player.alive {
                            player.health = player.health.saturating_add(bonus);
                        }
                    }
                }
            }
        }
        out_events.push(Event::PurchaseCompleted {
            item,
            quantity,
            cost,
            gold: self.economy.gold,
        });
    }

    fn spawn_enemy(&mut self, id: SpawnPointId, tile: TileCoord, out_events: &mut Vec<Event>) {
        if self.phase != RunPhase::Waves {
            debug!(phase = ?self.phase, "spawn outside the wave phase ignored");
            return;
        }
        let Some(point) = self.spawn_points.iter().find(|point| point.id == id).copied() else {
            return;
        };
        if !point.active || point.exhausted() {
            debug!(spawn_point = id.get(), "spawn from a spent point ignored");
            return;
        }
        let tile = self.config.bounds.clamp(tile);
        if !point.tile.within_reach(tile, stats::SPAWN_PROBE_RADIUS)
            || !self.is_tile_open_for_enemy(tile)
        {
            self.defer_spawn(id, out_events);
            return;
        }

        let enemy = self
            .registry
            .spawn(point.kind, tile, Direction::South, Some(id));
        let now = self.clock;
        if let Some(point) = self.spawn_point_mut(id) {
            point.spawned = point.spawned.saturating_add(1);
            point.last_spawn_at = now;
        }
        out_events.push(Event::EnemySpawned {
            enemy,
            kind: point.kind,
            tile,
            spawn_point: id,
        });
    }

    fn defer_spawn(&mut self, id: SpawnPointId, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(point) = self.spawn_point_mut(id).filter(|point| point.active) else {
            return;
        };
        point.last_spawn_at = now;
        out_events.push(Event::SpawnDeferred { spawn_point: id });
    }

    fn deactivate_spawn_point(&mut self, id: SpawnPointId, out_events: &mut Vec<Event>) {
        if self.registry.references_spawn_point(id) {
            return;
        }
        let Some(point) = self
            .spawn_point_mut(id)
            .filter(|point| point.active && point.exhausted())
        else {
            return;
        };
        point.active = false;
        out_events.push(Event::SpawnPointDeactivated { spawn_point: id });
    }

    fn move_enemy(&mut self, id: EnemyId, to: TileCoord, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(enemy) = self.registry.enemy(id).filter(|entry| entry.alive) else {
            return;
        };
        let from = enemy.tile;
        let ready = elapsed(enemy.last_move_at, now, enemy.kind.profile().move_cooldown);
        if !ready || !from.is_adjacent(to) || !self.is_tile_open_for_enemy(to) {
            debug!(enemy = id.get(), "enemy move rejected");
            return;
        }
        if let Some(enemy) = self.registry.enemy_mut(id) {
            enemy.tile = to;
            enemy.facing = Direction::between(from, to);
            enemy.last_move_at = Some(now);
        }
        out_events.push(Event::EnemyMoved { enemy: id, from, to });
    }

    fn set_enemy_behavior(
        &mut self,
        id: EnemyId,
        behavior: BehaviorState,
        out_events: &mut Vec<Event>,
    ) {
        if behavior == BehaviorState::Dead {
            return;
        }
        let Some(enemy) = self.registry.enemy_mut(id).filter(|entry| entry.alive) else {
            return;
        };
        if enemy.behavior != behavior {
            enemy.behavior = behavior;
            out_events.push(Event::EnemyBehaviorChanged { enemy: id, behavior });
        }
    }

    fn enemy_attack(&mut self, id: EnemyId, target: PlayerId, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(target_tile) = self
            .player(target)
            .filter(|player| player.alive)
            .map(|player| player.tile)
        else {
            return;
        };
        let Some(enemy) = self.registry.enemy_mut(id).filter(|entry| entry.alive) else {
            return;
        };
        let profile = enemy.kind.profile();
        if !enemy.tile.within_reach(target_tile, stats::MELEE_REACH)
            || !elapsed(enemy.last_attack_at, now, profile.attack_cooldown)
        {
            return;
        }
        enemy.last_attack_at = Some(now);
        if enemy.tile != target_tile {
            enemy.facing = Direction::between(enemy.tile, target_tile);
        }
        self.damage_player(target, profile.damage, out_events);
    }

    fn announce_boss(&mut self, tile: TileCoord, arrival_delay: Duration, out_events: &mut Vec<Event>) {
        if self.boss_incoming_announced || self.phase != RunPhase::Waves {
            return;
        }
        if self.spawn_points.iter().any(|point| point.active) || self.registry.alive_total() > 0 {
            debug!("boss announcement before the waves were cleared ignored");
            return;
        }
        let tile = self.config.bounds.clamp(tile);
        let arrives_at = self.clock.saturating_add(arrival_delay);
        self.boss_incoming_announced = true;
        self.phase = RunPhase::BossIncoming;
        self.schedule.push(
            arrives_at,
            ScheduledAction::BossArrival {
                tile,
                level: self.level,
            },
        );
        out_events.push(Event::BossIncoming { tile, arrives_at });
    }

    fn move_boss(&mut self, to: TileCoord, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let interval = BossProfile::for_level(self.level).move_interval;
        let blocked = !self.config.bounds.contains(to) || self.live_player_on(to);
        let Some(boss) = self.registry.boss.as_mut().filter(|boss| boss.alive) else {
            return;
        };
        let from = boss.tile;
        if blocked || !from.is_adjacent(to) || !elapsed(boss.last_move_at, now, interval) {
            return;
        }
        boss.tile = to;
        boss.facing = Direction::between(from, to);
        boss.last_move_at = Some(now);
        out_events.push(Event::BossMoved { from, to });
    }

    fn set_boss_behavior(
        &mut self,
        behavior: BehaviorState,
        out_events: &mut Vec<Event>,
    ) {
        if behavior == BehaviorState::Dead {
            return;
        }
        let Some(boss) = self.registry.boss.as_mut().filter(|boss| boss.alive) else {
            return;
        };
        if boss.behavior != behavior {
            boss.behavior = behavior;
            out_events.push(Event::BossBehaviorChanged { behavior });
        }
    }

    fn boss_attack(&mut self, target: PlayerId, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let cooldown = BossProfile::for_level(self.level).attack_cooldown;
        let Some(target_tile) = self
            .player(target)
            .filter(|player| player.alive)
            .map(|player| player.tile)
        else {
            return;
        };
        let Some(boss) = self.registry.boss.as_mut().filter(|boss| boss.alive) else {
            return;
        };
        if !boss.tile.within_reach(target_tile, stats::MELEE_REACH)
            || !elapsed(boss.last_attack_at, now, cooldown)
        {
            return;
        }
        boss.last_attack_at = Some(now);
        if boss.tile != target_tile {
            boss.facing = Direction::between(boss.tile, target_tile);
        }
        let damage = boss.damage;
        self.damage_player(target, damage, out_events);
    }

    fn drop_loot(
        &mut self,
        tile: TileCoord,
        kind: LootKind,
        amount: u32,
        out_events: &mut Vec<Event>,
    ) {
        if amount == 0 {
            return;
        }
        let tile = self.config.bounds.clamp(tile);
        let (loot, evicted) = self.loot.place(tile, kind, amount);
        out_events.push(Event::LootDropped {
            loot,
            tile,
            kind,
            amount,
        });
        for loot in evicted {
            debug!(loot = loot.get(), "oldest loot evicted");
            out_events.push(Event::LootEvicted { loot });
        }
    }

    fn place_crate(&mut self, tile: TileCoord, out_events: &mut Vec<Event>) {
        let tile = self.config.bounds.clamp(tile);
        let crate_id = self.crates.place(tile);
        out_events.push(Event::CratePlaced { crate_id, tile });
    }

    fn collect_loot(&mut self, id: PlayerId, loot: LootId, out_events: &mut Vec<Event>) {
        let Some(player_tile) = self
            .player(id)
            .filter(|player| player.alive)
            .map(|player| player.tile)
        else {
            return;
        };
        let in_reach = self.loot.get(loot).map_or(false, |drop| {
            player_tile.within_reach(drop.tile, stats::LOOT_PICKUP_REACH)
        });
        if !in_reach {
            return;
        }
        let Some(drop) = self.loot.take(loot) else {
            return;
        };
        match drop.kind {
            LootKind::Gold => {
                self.economy.gold = self.economy.gold.saturating_add(drop.amount);
            }
            LootKind::Gem(color) => self.economy.gems.add(color, drop.amount),
            LootKind::Item(item) => self.economy.inventory.add(item, drop.amount),
        }
        out_events.push(Event::LootCollected {
            loot,
            player: id,
            kind: drop.kind,
            amount: drop.amount,
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartRun { mode } => world.start_run(mode, out_events),
        Command::AdvanceLevel { spawn_plan } => world.advance_level(&spawn_plan, out_events),
        Command::RestoreRun { snapshot } => world.restore_run(*snapshot, out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::MovePlayer { player, direction } => {
            world.move_player(player, direction, out_events);
        }
        Command::MeleeAttack {
            player,
            target,
            damage,
            consume_rage,
            interval,
        } => world.melee_attack(player, target, damage, consume_rage, interval, out_events),
        Command::FinishAttack { player } => world.finish_attack(player, out_events),
        Command::ActivateSignature {
            player,
            cooldown,
            active_for,
        } => world.activate_signature(player, cooldown, active_for, out_events),
        Command::AreaStrike {
            player,
            hits,
            boss_damage,
        } => world.area_strike(player, &hits, boss_damage, out_events),
        Command::ActivateMagic {
            player,
            cooldown,
            active_for,
            mana_cost,
        } => world.activate_magic(player, cooldown, active_for, mana_cost, out_events),
        Command::ActivateDash { player } => world.activate_dash(player, out_events),
        Command::UseItem {
            player,
            item,
            effect,
        } => world.use_item(player, item, effect, out_events),
        Command::ConsumeGem {
            player,
            color,
            effect,
        } => world.consume_gem(player, color, effect, out_events),
        Command::Purchase { item, quantity } => world.purchase(item, quantity, out_events),
        Command::SpawnEnemy { spawn_point, tile } => {
            world.spawn_enemy(spawn_point, tile, out_events);
        }
        Command::DeferSpawn { spawn_point } => world.defer_spawn(spawn_point, out_events),
        Command::DeactivateSpawnPoint { spawn_point } => {
            world.deactivate_spawn_point(spawn_point, out_events);
        }
        Command::MoveEnemy { enemy, to } => world.move_enemy(enemy, to, out_events),
        Command::SetEnemyBehavior { enemy, behavior } => {
            world.set_enemy_behavior(enemy, behavior, out_events);
        }
        Command::EnemyAttack { enemy, player } => world.enemy_attack(enemy, player, out_events),
        Command::AnnounceBoss {
            tile,
            arrival_delay,
        } => world.announce_boss(tile, arrival_delay, out_events),
        Command::MoveBoss { to } => world.move_boss(to, out_events),
        Command::SetBossBehavior { behavior } => world.set_boss_behavior(behavior, out_events),
        Command::BossAttack { player } => world.boss_attack(player, out_events),
        Command::DropLoot { tile, kind, amount } => {
            world.drop_loot(tile, kind, amount, out_events);
        }
        Command::PlaceCrate { tile } => world.place_crate(tile, out_events),
        Command::CollectLoot { player, loot } => world.collect_loot(player, loot, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use skulls_daggers_core::{
        BossRecord, BossSnapshot, CrateSnapshot, EnemyId, EnemyKind, EnemyRecord, EnemySnapshot,
        Economy, LootRecord, LootSnapshot, MapBounds, PlayerId, PlayerRecord, PlayerSnapshot,
        RunConfig, RunSnapshot, RunStatus, SpawnPointRecord, SpawnPointSnapshot, TileCoord,
        TileMetrics,
    };

    use super::World;

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &RunConfig {
        &world.config
    }

    /// Playable extent of the arena.
    #[must_use]
    pub fn bounds(world: &World) -> MapBounds {
        world.config.bounds
    }

    /// Screen dimensions of a tile for presentation adapters.
    #[must_use]
    pub fn metrics(world: &World) -> TileMetrics {
        world.config.metrics
    }

    /// Simulation time elapsed since the run started or was restored.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Coarse run progress.
    #[must_use]
    pub fn status(world: &World) -> RunStatus {
        RunStatus {
            mode: world.mode,
            phase: world.phase,
            level: world.level,
            clock: world.clock,
            boss_incoming_announced: world.boss_incoming_announced,
            victory_announced: world.victory_announced,
        }
    }

    /// Snapshots of every player in index order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerSnapshot> {
        world.players.iter().map(|player| player.snapshot()).collect()
    }

    /// Snapshot of a single player.
    #[must_use]
    pub fn player(world: &World, id: PlayerId) -> Option<PlayerSnapshot> {
        world.player(id).map(|player| player.snapshot())
    }

    /// Snapshots of every registered enemy, corpses included, ordered by identifier.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<EnemySnapshot> {
        world.registry.iter().map(|enemy| enemy.snapshot()).collect()
    }

    /// Snapshot of a single enemy.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<EnemySnapshot> {
        world.registry.enemy(id).map(|enemy| enemy.snapshot())
    }

    /// Number of alive enemies standing on `tile`.
    #[must_use]
    pub fn count_enemies_on_tile(world: &World, tile: TileCoord) -> usize {
        world.registry.count_on_tile(tile)
    }

    /// Number of alive enemies of the provided kind, computed fresh on every call.
    #[must_use]
    pub fn alive_count(world: &World, kind: EnemyKind) -> usize {
        world.registry.alive_count(kind)
    }

    /// Reports whether an enemy may step onto or spawn at `tile`.
    #[must_use]
    pub fn is_tile_open_for_enemy(world: &World, tile: TileCoord) -> bool {
        world.is_tile_open_for_enemy(tile)
    }

    /// Snapshot of the boss while it is in the arena.
    #[must_use]
    pub fn boss(world: &World) -> Option<BossSnapshot> {
        world.registry.boss.as_ref().map(|boss| boss.snapshot())
    }

    /// Snapshots of every spawn point.
    #[must_use]
    pub fn spawn_points(world: &World) -> Vec<SpawnPointSnapshot> {
        world
            .spawn_points
            .iter()
            .map(|point| point.snapshot())
            .collect()
    }

    /// Snapshots of the loot lying in the arena, oldest first.
    #[must_use]
    pub fn loot(world: &World) -> Vec<LootSnapshot> {
        world.loot.iter().map(|drop| drop.snapshot()).collect()
    }

    /// Snapshots of every crate, broken ones included.
    #[must_use]
    pub fn crates(world: &World) -> Vec<CrateSnapshot> {
        world.crates.iter().map(|entry| entry.snapshot()).collect()
    }

    /// Shared party stash.
    #[must_use]
    pub fn economy(world: &World) -> Economy {
        world.economy
    }

    /// Captures everything needed to resume the run.
    #[must_use]
    pub fn run_snapshot(world: &World) -> RunSnapshot {
        RunSnapshot {
            mode: world.mode,
            level: world.level,
            phase: world.phase,
            boss_incoming_announced: world.boss_incoming_announced,
            victory_announced: world.victory_announced,
            economy: world.economy,
            players: world
                .players
                .iter()
                .map(|player| PlayerRecord {
                    character: player.character,
                    tile: player.tile,
                    facing: player.facing,
                    health: player.health,
                    max_health: player.max_health,
                })
                .collect(),
            boss: world.registry.live_boss().map(|boss| BossRecord {
                tile: boss.tile,
                health: boss.health,
            }),
            enemies: world
                .registry
                .alive()
                .map(|enemy| EnemyRecord {
                    kind: enemy.kind,
                    tile: enemy.tile,
                    facing: enemy.facing,
                })
                .collect(),
            spawn_points: world
                .spawn_points
                .iter()
                .map(|point| SpawnPointRecord {
                    kind: point.kind,
                    tile: point.tile,
                    spawned: point.spawned,
                    max: point.max,
                    active: point.active,
                    interval: Some(point.interval),
                })
                .collect(),
            loot: world
                .loot
                .iter()
                .map(|drop| LootRecord {
                    tile: drop.tile,
                    kind: drop.kind,
                    amount: drop.amount,
                })
                .collect(),
            crates: world
                .crates
                .iter()
                .filter(|entry| !entry.broken)
                .map(|entry| entry.tile)
                .collect(),
        }
    }
}
