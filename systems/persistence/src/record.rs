//! On-disk save record and its conversion to and from run snapshots.
//!
//! Every field is optional when reading so that partial or older records load
//! on top of the current run instead of failing outright.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use skulls_daggers_core::{
    BossRecord, CharacterKind, Direction, Economy, EnemyKind, EnemyRecord, GemColor, Gems,
    Inventory, ItemKind, LootKind, LootRecord, PlayMode, PlayerRecord, RunPhase, RunSnapshot,
    SpawnPointRecord, TileCoord, Upgrades,
};

/// A single persisted save slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveRecord {
    /// Human-readable save name.
    pub name: Option<String>,
    /// Milliseconds since the Unix epoch at which the save was written.
    pub timestamp: Option<u64>,
    /// Player one, carrying the shared economy.
    pub player: Option<PlayerSection>,
    /// Player two in co-op runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player2: Option<PlayerSection>,
    /// Whether the run was co-op. Without it a missing `player2` keeps the
    /// current partner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coop: Option<bool>,
    /// Level and boss progress.
    pub game_state: Option<GameStateSection>,
    /// Positions of living enemies by kind.
    pub enemies: Option<EnemySection>,
    /// Loot and crates lying in the arena.
    pub drops: Option<DropSection>,
    /// Consumables held by the party.
    pub inventory: Option<InventorySection>,
}

/// Tile position as stored in a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Column.
    pub tile_x: i32,
    /// Row.
    pub tile_y: i32,
}

impl From<TileCoord> for Position {
    fn from(tile: TileCoord) -> Self {
        Self {
            tile_x: tile.x(),
            tile_y: tile.y(),
        }
    }
}

impl From<Position> for TileCoord {
    fn from(position: Position) -> Self {
        TileCoord::new(position.tile_x, position.tile_y)
    }
}

/// Player stats and, for player one, the shared progression.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerSection {
    /// Current health.
    pub health: Option<u32>,
    /// Maximum health including upgrades.
    pub max_health: Option<u32>,
    /// Gold held by the party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold: Option<u32>,
    /// Gems held by the party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gems: Option<GemSection>,
    /// Tile occupied.
    pub position: Option<Position>,
    /// Character played.
    pub character: Option<CharacterKind>,
    /// Facing when saved.
    pub facing: Option<Direction>,
    /// Upgrade levels of the party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrades: Option<UpgradeSection>,
}

/// Gem counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemSection {
    /// Blue gems.
    pub blue: u32,
    /// Green gems.
    pub green: u32,
    /// Red gems.
    pub red: u32,
}

/// Upgrade levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpgradeSection {
    /// Damage upgrade level.
    pub damage: u32,
    /// Health upgrade level.
    pub health: u32,
    /// Cooldown upgrade level.
    pub ability_cooldown: u32,
}

/// Consumable counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InventorySection {
    /// Health potions.
    pub health_potions: u32,
    /// Speed potions.
    pub speed_potions: u32,
    /// Damage potions.
    pub damage_potions: u32,
}

/// Level and boss progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameStateSection {
    /// Current level.
    pub level: Option<u32>,
    /// Whether the boss was alive.
    pub boss_alive: Option<bool>,
    /// Remaining boss health.
    pub boss_health: Option<u32>,
    /// Boss tile, when it was alive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boss_position: Option<Position>,
    /// Whether the boss announcement already fired.
    pub boss_incoming_shown: Option<bool>,
    /// Whether the victory already fired.
    pub victory_shown: Option<bool>,
    /// Spawn point counters.
    pub spawn_data: Option<Vec<SpawnEntry>>,
}

/// Counters of one spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnEntry {
    /// Enemy kind produced.
    pub kind: EnemyKind,
    /// Spawn column.
    pub tile_x: i32,
    /// Spawn row.
    pub tile_y: i32,
    /// Enemies produced so far.
    pub spawned: u32,
    /// Enemies produced per level.
    pub max: u32,
    /// Whether the point was still producing.
    pub active: bool,
    /// Spawn interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

/// Living enemies split by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySection {
    /// Living skeletons.
    pub skeletons: Option<Vec<EnemyEntry>>,
    /// Living slimes.
    pub slimes: Option<Vec<EnemyEntry>>,
}

/// Position and facing of one enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyEntry {
    /// Column.
    pub tile_x: i32,
    /// Row.
    pub tile_y: i32,
    /// Facing.
    #[serde(default = "default_facing")]
    pub dir: Direction,
}

fn default_facing() -> Direction {
    Direction::South
}

/// Loot and crates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DropSection {
    /// Gold piles.
    pub gold_drops: Option<Vec<AmountDrop>>,
    /// Gem drops.
    pub gem_drops: Option<Vec<GemDrop>>,
    /// Consumables lying on the ground.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_drops: Option<Vec<ItemDrop>>,
    /// Intact crates.
    pub crates: Option<Vec<Position>>,
}

/// Gold pile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountDrop {
    /// Column.
    pub tile_x: i32,
    /// Row.
    pub tile_y: i32,
    /// Gold in the pile.
    pub amount: u32,
}

/// Gem drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GemDrop {
    /// Column.
    pub tile_x: i32,
    /// Row.
    pub tile_y: i32,
    /// Gem colour.
    pub color: GemColor,
    /// Gems in the drop.
    #[serde(default = "one")]
    pub amount: u32,
}

/// Consumable drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDrop {
    /// Column.
    pub tile_x: i32,
    /// Row.
    pub tile_y: i32,
    /// Item kind.
    pub item: ItemKind,
    /// Items in the drop.
    #[serde(default = "one")]
    pub amount: u32,
}

fn one() -> u32 {
    1
}

impl SaveRecord {
    /// Captures the resumable parts of a run.
    #[must_use]
    pub fn capture(name: &str, timestamp: u64, run: &RunSnapshot) -> Self {
        let economy = run.economy;
        let player = run.players.first().map(|record| PlayerSection {
            gold: Some(economy.gold),
            gems: Some(GemSection {
                blue: economy.gems.blue,
                green: economy.gems.green,
                red: economy.gems.red,
            }),
            upgrades: Some(UpgradeSection {
                damage: economy.upgrades.damage,
                health: economy.upgrades.health,
                ability_cooldown: economy.upgrades.ability_cooldown,
            }),
            ..player_section(record)
        });
        let player2 = match run.mode {
            PlayMode::Coop(..) => run.players.get(1).map(player_section),
            PlayMode::Single(_) => None,
        };

        let enemies_of = |kind: EnemyKind| {
            run.enemies
                .iter()
                .filter(|enemy| enemy.kind == kind)
                .map(|enemy| EnemyEntry {
                    tile_x: enemy.tile.x(),
                    tile_y: enemy.tile.y(),
                    dir: enemy.facing,
                })
                .collect()
        };

        let mut gold_drops = Vec::new();
        let mut gem_drops = Vec::new();
        let mut item_drops = Vec::new();
        for drop in &run.loot {
            let (tile_x, tile_y) = (drop.tile.x(), drop.tile.y());
            match drop.kind {
                LootKind::Gold => gold_drops.push(AmountDrop {
                    tile_x,
                    tile_y,
                    amount: drop.amount,
                }),
                LootKind::Gem(color) => gem_drops.push(GemDrop {
                    tile_x,
                    tile_y,
                    color,
                    amount: drop.amount,
                }),
                LootKind::Item(item) => item_drops.push(ItemDrop {
                    tile_x,
                    tile_y,
                    item,
                    amount: drop.amount,
                }),
            }
        }

        Self {
            name: Some(name.to_owned()),
            timestamp: Some(timestamp),
            player,
            player2,
            coop: Some(matches!(run.mode, PlayMode::Coop(..))),
            game_state: Some(GameStateSection {
                level: Some(run.level),
                boss_alive: Some(run.boss.is_some()),
                boss_health: Some(run.boss.map_or(0, |boss| boss.health)),
                boss_position: run.boss.map(|boss| boss.tile.into()),
                boss_incoming_shown: Some(run.boss_incoming_announced),
                victory_shown: Some(run.victory_announced),
                spawn_data: Some(
                    run.spawn_points
                        .iter()
                        .map(|point| SpawnEntry {
                            kind: point.kind,
                            tile_x: point.tile.x(),
                            tile_y: point.tile.y(),
                            spawned: point.spawned,
                            max: point.max,
                            active: point.active,
                            interval_ms: point.interval.map(|interval| {
                                u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
                            }),
                        })
                        .collect(),
                ),
            }),
            enemies: Some(EnemySection {
                skeletons: Some(enemies_of(EnemyKind::Skeleton)),
                slimes: Some(enemies_of(EnemyKind::Slime)),
            }),
            drops: Some(DropSection {
                gold_drops: Some(gold_drops),
                gem_drops: Some(gem_drops),
                item_drops: (!item_drops.is_empty()).then_some(item_drops),
                crates: Some(run.crates.iter().map(|tile| (*tile).into()).collect()),
            }),
            inventory: Some(InventorySection {
                health_potions: economy.inventory.health_potions,
                speed_potions: economy.inventory.speed_potions,
                damage_potions: economy.inventory.damage_potions,
            }),
        }
    }

    /// Builds the run to restore, taking every missing field from `current`.
    ///
    /// `boss_tile` places a living boss whose record carries no position and
    /// that is absent from the current run.
    #[must_use]
    pub fn overlay(&self, current: &RunSnapshot, boss_tile: TileCoord) -> RunSnapshot {
        let mut run = current.clone();

        if let Some(first) = &self.player {
            let lead = overlay_player(first, current.players.first(), None);
            let lead_character = lead.character;
            let partner = match &self.player2 {
                Some(second) => Some(overlay_player(
                    second,
                    current.players.get(1),
                    Some(lead.tile),
                )),
                None if self.coop == Some(false) => None,
                None => current.players.get(1).copied(),
            };
            run.mode = match &partner {
                Some(partner) => PlayMode::Coop(lead_character, partner.character),
                None => PlayMode::Single(lead_character),
            };
            run.players = std::iter::once(lead).chain(partner).collect();
            run.economy = overlay_economy(first, self.inventory, current.economy);
        } else if let Some(inventory) = self.inventory {
            run.economy.inventory = inventory_from(inventory);
        }

        if let Some(state) = &self.game_state {
            overlay_game_state(state, current, boss_tile, &mut run);
        }

        if let Some(enemies) = &self.enemies {
            let restore = |entries: &Option<Vec<EnemyEntry>>, kind: EnemyKind| -> Vec<EnemyRecord> {
                match entries {
                    Some(entries) => entries
                        .iter()
                        .map(|entry| EnemyRecord {
                            kind,
                            tile: TileCoord::new(entry.tile_x, entry.tile_y),
                            facing: entry.dir,
                        })
                        .collect(),
                    None => current
                        .enemies
                        .iter()
                        .filter(|enemy| enemy.kind == kind)
                        .copied()
                        .collect(),
                }
            };
            let mut restored = restore(&enemies.skeletons, EnemyKind::Skeleton);
            restored.extend(restore(&enemies.slimes, EnemyKind::Slime));
            run.enemies = restored;
        }

        if let Some(drops) = &self.drops {
            overlay_drops(drops, current, &mut run);
        }

        run
    }
}

fn player_section(record: &PlayerRecord) -> PlayerSection {
    PlayerSection {
        health: Some(record.health),
        max_health: Some(record.max_health),
        position: Some(record.tile.into()),
        character: Some(record.character),
        facing: Some(record.facing),
        ..PlayerSection::default()
    }
}

fn overlay_player(
    section: &PlayerSection,
    current: Option<&PlayerRecord>,
    fallback_tile: Option<TileCoord>,
) -> PlayerRecord {
    let character = section
        .character
        .or(current.map(|record| record.character))
        .unwrap_or(CharacterKind::Knight);
    let base_health = character.profile().max_health;
    let max_health = section
        .max_health
        .or(current.map(|record| record.max_health))
        .unwrap_or(base_health);
    let tile = section
        .position
        .map(TileCoord::from)
        .or(current.map(|record| record.tile))
        .or(fallback_tile.map(|tile| tile.offset(1, 0)))
        .unwrap_or(TileCoord::new(0, 0));
    PlayerRecord {
        character,
        tile,
        facing: section
            .facing
            .or(current.map(|record| record.facing))
            .unwrap_or(Direction::South),
        health: section
            .health
            .or(current.map(|record| record.health))
            .unwrap_or(max_health),
        max_health,
    }
}

fn inventory_from(section: InventorySection) -> Inventory {
    Inventory {
        health_potions: section.health_potions,
        speed_potions: section.speed_potions,
        damage_potions: section.damage_potions,
    }
}

fn overlay_economy(
    section: &PlayerSection,
    inventory: Option<InventorySection>,
    current: Economy,
) -> Economy {
    Economy {
        gold: section.gold.unwrap_or(current.gold),
        gems: section.gems.map_or(current.gems, |gems| Gems {
            blue: gems.blue,
            green: gems.green,
            red: gems.red,
        }),
        upgrades: section.upgrades.map_or(current.upgrades, |upgrades| Upgrades {
            damage: upgrades.damage,
            health: upgrades.health,
            ability_cooldown: upgrades.ability_cooldown,
        }),
        inventory: inventory.map_or(current.inventory, inventory_from),
    }
}

fn overlay_game_state(
    state: &GameStateSection,
    current: &RunSnapshot,
    boss_tile: TileCoord,
    run: &mut RunSnapshot,
) {
    run.level = state.level.unwrap_or(current.level).max(1);
    run.boss_incoming_announced = state
        .boss_incoming_shown
        .unwrap_or(current.boss_incoming_announced);
    run.victory_announced = state.victory_shown.unwrap_or(current.victory_announced);

    run.boss = match state.boss_alive {
        Some(true) => {
            let tile = state
                .boss_position
                .map(TileCoord::from)
                .or(current.boss.map(|boss| boss.tile))
                .unwrap_or(boss_tile);
            let health = state
                .boss_health
                .or(current.boss.map(|boss| boss.health))
                .unwrap_or(0);
            (health > 0).then_some(BossRecord { tile, health })
        }
        Some(false) => None,
        None => current.boss,
    };

    let has_progress = state.boss_alive.is_some()
        || state.boss_incoming_shown.is_some()
        || state.victory_shown.is_some();
    if has_progress {
        run.phase = if run.victory_announced {
            RunPhase::Victory
        } else if run.boss.is_some() {
            RunPhase::BossFight
        } else if run.boss_incoming_announced {
            RunPhase::BossIncoming
        } else {
            RunPhase::Waves
        };
    }

    if let Some(entries) = &state.spawn_data {
        run.spawn_points = entries
            .iter()
            .map(|entry| SpawnPointRecord {
                kind: entry.kind,
                tile: TileCoord::new(entry.tile_x, entry.tile_y),
                spawned: entry.spawned,
                max: entry.max,
                active: entry.active,
                interval: entry.interval_ms.map(Duration::from_millis),
            })
            .collect();
    }
}

fn overlay_drops(drops: &DropSection, current: &RunSnapshot, run: &mut RunSnapshot) {
    let kept = |keep: fn(LootKind) -> bool| {
        current
            .loot
            .iter()
            .filter(move |drop| keep(drop.kind))
            .copied()
    };
    let mut loot: Vec<LootRecord> = Vec::new();
    match &drops.gold_drops {
        Some(entries) => loot.extend(entries.iter().map(|entry| LootRecord {
            tile: TileCoord::new(entry.tile_x, entry.tile_y),
            kind: LootKind::Gold,
            amount: entry.amount,
        })),
        None => loot.extend(kept(|kind| kind == LootKind::Gold)),
    }
    match &drops.gem_drops {
        Some(entries) => loot.extend(entries.iter().map(|entry| LootRecord {
            tile: TileCoord::new(entry.tile_x, entry.tile_y),
            kind: LootKind::Gem(entry.color),
            amount: entry.amount,
        })),
        None => loot.extend(kept(|kind| matches!(kind, LootKind::Gem(_)))),
    }
    match &drops.item_drops {
        Some(entries) => loot.extend(entries.iter().map(|entry| LootRecord {
            tile: TileCoord::new(entry.tile_x, entry.tile_y),
            kind: LootKind::Item(entry.item),
            amount: entry.amount,
        })),
        None if drops.gold_drops.is_some() => {}
        None => loot.extend(kept(|kind| matches!(kind, LootKind::Item(_)))),
    }
    run.loot = loot;

    if let Some(crates) = &drops.crates {
        run.crates = crates.iter().map(|position| (*position).into()).collect();
    }
}
