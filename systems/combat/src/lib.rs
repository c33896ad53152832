#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat resolution: melee targeting, area abilities, loot rolls and pickup.

use std::ops::RangeInclusive;

use glam::Vec2;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skulls_daggers_core::{
    stats::{self, AreaAbility},
    AreaHit, BossSnapshot, BuffKind, Command, CrateSnapshot, Direction, Economy, EnemySnapshot,
    Event, GemColor, LootKind, LootSnapshot, MapBounds, MeleeTarget, PlayerSnapshot,
    SignatureAbility, TileCoord,
};

/// Probability that a death or broken crate drops a gem.
pub const GEM_CHANCE: f64 = 0.8;
/// Probability that a regular enemy drops gold.
pub const GOLD_CHANCE: f64 = 0.8;

const ENEMY_GOLD: RangeInclusive<u32> = 5..=30;
const CRATE_GOLD: RangeInclusive<u32> = 25..=100;
const BOSS_PILE_GOLD: RangeInclusive<u32> = 50..=500;
const BOSS_PILES: RangeInclusive<u32> = 3..=5;
const BOSS_CRATES: RangeInclusive<u32> = 3..=6;
const BOSS_PILE_RADIUS: i32 = 1;
const BOSS_CRATE_RING: RangeInclusive<u32> = 2..=3;
const RING_ATTEMPTS: usize = 16;
const ARC_TOLERANCE: f32 = 1e-4;

/// Melee damage of the player's next swing.
///
/// Base damage plus upgrades, scaled by the damage buff, doubled while rage is armed.
#[must_use]
pub fn melee_damage(player: &PlayerSnapshot, economy: &Economy) -> u32 {
    let base = player
        .character
        .profile()
        .damage
        .saturating_add(economy.upgrades.bonus_damage());
    let scaled = scale(base, player.buffs.multiplier(BuffKind::Damage));
    if player.rage_armed {
        scaled.saturating_mul(2)
    } else {
        scaled
    }
}

fn scale(damage: u32, multiplier: f32) -> u32 {
    let scaled = (damage as f32 * multiplier).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Picks what a swing connects with.
///
/// Live enemies come first, preferring the one on the faced tile and then the
/// nearest; the boss is next, then an intact crate.
#[must_use]
pub fn choose_melee_target(
    player: &PlayerSnapshot,
    enemies: &[EnemySnapshot],
    boss: Option<&BossSnapshot>,
    crates: &[CrateSnapshot],
) -> MeleeTarget {
    let origin = player.tile;
    let faced = origin.step(player.facing);
    let in_reach = |tile: TileCoord| origin.within_reach(tile, stats::MELEE_REACH);

    let enemy = enemies
        .iter()
        .filter(|enemy| enemy.alive && in_reach(enemy.tile))
        .min_by_key(|enemy| (enemy.tile != faced, origin.chebyshev_distance(enemy.tile), enemy.id));
    if let Some(enemy) = enemy {
        return MeleeTarget::Enemy(enemy.id);
    }
    if boss.map_or(false, |boss| boss.alive && in_reach(boss.tile)) {
        return MeleeTarget::Boss;
    }
    crates
        .iter()
        .filter(|entry| !entry.broken && in_reach(entry.tile))
        .min_by_key(|entry| (entry.tile != faced, entry.id))
        .map_or(MeleeTarget::Nothing, |entry| MeleeTarget::Crate(entry.id))
}

/// Builds the melee command for the player's attack input.
#[must_use]
pub fn melee_command(
    player: &PlayerSnapshot,
    economy: &Economy,
    enemies: &[EnemySnapshot],
    boss: Option<&BossSnapshot>,
    crates: &[CrateSnapshot],
) -> Command {
    Command::MeleeAttack {
        player: player.id,
        target: choose_melee_target(player, enemies, boss, crates),
        damage: melee_damage(player, economy),
        consume_rage: player.rage_armed,
        interval: player.character.profile().attack_interval(),
    }
}

/// Reports whether `target` lies inside the ability's range and facing arc.
#[must_use]
pub fn in_area(origin: TileCoord, facing: Direction, area: &AreaAbility, target: TileCoord) -> bool {
    let distance = origin.chebyshev_distance(target);
    if distance > area.range {
        return false;
    }
    if distance == 0 || area.arc_degrees >= 360.0 {
        return true;
    }
    let offset = Vec2::new(
        (target.x() - origin.x()) as f32,
        (target.y() - origin.y()) as f32,
    )
    .normalize();
    let half_arc = (area.arc_degrees / 2.0).to_radians();
    offset.dot(facing.unit_vector()) >= half_arc.cos() - ARC_TOLERANCE
}

/// Tile a target is pushed to, away from the origin and clamped to the arena.
#[must_use]
pub fn knockback_tile(
    origin: TileCoord,
    facing: Direction,
    target: TileCoord,
    tiles: u32,
    bounds: MapBounds,
) -> TileCoord {
    let (sx, sy) = if target == origin {
        facing.offset()
    } else {
        (
            (target.x() - origin.x()).signum(),
            (target.y() - origin.y()).signum(),
        )
    };
    let tiles = i32::try_from(tiles).unwrap_or(0);
    bounds.clamp(target.offset(sx.saturating_mul(tiles), sy.saturating_mul(tiles)))
}

/// Resolves an area ability into per-enemy hits plus optional boss damage.
#[must_use]
pub fn area_strike(
    player: &PlayerSnapshot,
    ability: SignatureAbility,
    origin: TileCoord,
    facing: Direction,
    economy: &Economy,
    enemies: &[EnemySnapshot],
    boss: Option<&BossSnapshot>,
    bounds: MapBounds,
) -> Command {
    let area = ability.profile();
    let damage = scale(
        area.damage.saturating_add(economy.upgrades.bonus_damage()),
        player.buffs.multiplier(BuffKind::Damage),
    );
    let hits = enemies
        .iter()
        .filter(|enemy| enemy.alive && in_area(origin, facing, &area, enemy.tile))
        .map(|enemy| AreaHit {
            enemy: enemy.id,
            damage,
            knockback_to: knockback_tile(origin, facing, enemy.tile, area.knockback, bounds),
        })
        .collect();
    let boss_damage = boss
        .filter(|boss| boss.alive && in_area(origin, facing, &area, boss.tile))
        .map(|_| damage);
    Command::AreaStrike {
        player: player.id,
        hits,
        boss_damage,
    }
}

/// Emits a collection command for every drop lying under a living player.
///
/// Players are scanned in index order, so a drop shared by two players goes to the first.
pub fn pickup_scan(players: &[PlayerSnapshot], loot: &[LootSnapshot], out: &mut Vec<Command>) {
    let mut claimed = Vec::new();
    for player in players.iter().filter(|player| player.alive) {
        for drop in loot {
            if claimed.contains(&drop.id)
                || !player.tile.within_reach(drop.tile, stats::LOOT_PICKUP_REACH)
            {
                continue;
            }
            claimed.push(drop.id);
            out.push(Command::CollectLoot {
                player: player.id,
                loot: drop.id,
            });
        }
    }
}

/// Pure system that reacts to combat events with area strikes and loot drops.
#[derive(Debug)]
pub struct CombatResolver<R = ChaCha8Rng> {
    rng: R,
}

impl CombatResolver<ChaCha8Rng> {
    /// Creates a resolver whose loot rolls are fully determined by `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> CombatResolver<R> {
    /// Creates a resolver drawing from the provided generator.
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Consumes world events and snapshots to emit area strikes and loot commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        economy: &Economy,
        players: &[PlayerSnapshot],
        enemies: &[EnemySnapshot],
        boss: Option<&BossSnapshot>,
        bounds: MapBounds,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::SignatureActivated {
                    player,
                    ability,
                    origin,
                    facing,
                } => {
                    if let Some(caster) = players.iter().find(|entry| entry.id == *player) {
                        out.push(area_strike(
                            caster, *ability, *origin, *facing, economy, enemies, boss, bounds,
                        ));
                    }
                }
                Event::EnemyDied { tile, .. } => self.roll_enemy_loot(*tile, out),
                Event::CrateBroken { tile, .. } => self.roll_crate_loot(*tile, out),
                Event::BossDied { tile, .. } => self.roll_boss_loot(*tile, out),
                _ => {}
            }
        }
    }

    /// Independent gold and gem trials for a regular enemy death.
    pub fn roll_enemy_loot(&mut self, tile: TileCoord, out: &mut Vec<Command>) {
        if self.rng.gen_bool(GOLD_CHANCE) {
            let amount = self.rng.gen_range(ENEMY_GOLD);
            out.push(gold(tile, amount));
        }
        self.roll_gem(tile, out);
    }

    /// Guaranteed gold plus a gem trial for a broken crate.
    pub fn roll_crate_loot(&mut self, tile: TileCoord, out: &mut Vec<Command>) {
        let amount = self.rng.gen_range(CRATE_GOLD);
        out.push(gold(tile, amount));
        self.roll_gem(tile, out);
    }

    /// Gold piles around the boss and a ring of fresh crates.
    pub fn roll_boss_loot(&mut self, tile: TileCoord, out: &mut Vec<Command>) {
        for _ in 0..self.rng.gen_range(BOSS_PILES) {
            let pile = tile.offset(
                self.rng.gen_range(-BOSS_PILE_RADIUS..=BOSS_PILE_RADIUS),
                self.rng.gen_range(-BOSS_PILE_RADIUS..=BOSS_PILE_RADIUS),
            );
            let amount = self.rng.gen_range(BOSS_PILE_GOLD);
            out.push(gold(pile, amount));
        }
        for _ in 0..self.rng.gen_range(BOSS_CRATES) {
            let spot = self.ring_tile(tile);
            out.push(Command::PlaceCrate { tile: spot });
        }
    }

    fn roll_gem(&mut self, tile: TileCoord, out: &mut Vec<Command>) {
        if !self.rng.gen_bool(GEM_CHANCE) {
            return;
        }
        if let Some(color) = GemColor::ALL.choose(&mut self.rng) {
            out.push(Command::DropLoot {
                tile,
                kind: LootKind::Gem(*color),
                amount: 1,
            });
        }
    }

    fn ring_tile(&mut self, center: TileCoord) -> TileCoord {
        let outer = i32::try_from(*BOSS_CRATE_RING.end()).unwrap_or(0);
        for _ in 0..RING_ATTEMPTS {
            let candidate = center.offset(
                self.rng.gen_range(-outer..=outer),
                self.rng.gen_range(-outer..=outer),
            );
            if BOSS_CRATE_RING.contains(&center.chebyshev_distance(candidate)) {
                return candidate;
            }
        }
        center.offset(outer, 0)
    }
}

fn gold(tile: TileCoord, amount: u32) -> Command {
    Command::DropLoot {
        tile,
        kind: LootKind::Gold,
        amount,
    }
}
