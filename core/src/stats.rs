//! Balancing tables for characters, enemies, the boss, consumables and the shop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Step interval of a character moving at speed multiplier `1.0`.
pub const BASE_STEP_INTERVAL: Duration = Duration::from_millis(150);
/// Melee interval of a character attacking at speed multiplier `1.0`.
pub const BASE_ATTACK_INTERVAL: Duration = Duration::from_millis(600);
/// Fallback delay after which an unfinished attack animation is forcibly reset.
pub const ATTACK_RECOVERY: Duration = Duration::from_millis(400);
/// Maximum Chebyshev distance at which an idle enemy notices a player.
pub const AGGRO_RANGE: u32 = 10;
/// Chebyshev reach of every melee strike.
pub const MELEE_REACH: u32 = 1;
/// Chebyshev reach within which a player collects loot.
pub const LOOT_PICKUP_REACH: u32 = 0;
/// Maximum number of live enemies sharing a single tile.
pub const TILE_STACK_LIMIT: usize = 3;
/// Delay between an entity's death and its removal from the registry.
pub const CORPSE_DELAY: Duration = Duration::from_millis(800);
/// Maximum number of loot drops lying in the arena at once.
pub const LOOT_CAP: usize = 50;

/// Duration of the dash burst phase.
pub const DASH_BURST: Duration = Duration::from_secs(1);
/// Move-speed multiplier applied during the dash burst phase.
pub const DASH_BURST_MULTIPLIER: f32 = 4.0;
/// Duration of the sustained dash phase that follows the burst.
pub const DASH_SUSTAIN: Duration = Duration::from_secs(3);
/// Move-speed multiplier applied during the sustained dash phase.
pub const DASH_SUSTAIN_MULTIPLIER: f32 = 2.0;
/// Cooldown that starts once the sustained dash phase ends.
pub const DASH_COOLDOWN: Duration = Duration::from_secs(8);
/// Minimum time between two dash activations: both phases plus the cooldown.
pub const DASH_CYCLE: Duration = Duration::from_secs(12);

/// Flat damage bonus granted per damage upgrade level.
pub const DAMAGE_PER_UPGRADE: u32 = 5;
/// Maximum health granted per health upgrade level.
pub const HEALTH_PER_UPGRADE: u32 = 20;
/// Percentage of an ability cooldown removed per cooldown upgrade level.
pub const COOLDOWN_REDUCTION_PERCENT_PER_LEVEL: u32 = 10;
/// Smallest percentage of a base cooldown that upgrades can reach.
pub const MIN_COOLDOWN_PERCENT: u32 = 30;
/// Factor applied to a character's move speed while its signature ability is active.
pub const SIGNATURE_SPEED_FACTOR: f32 = 0.5;

/// Chebyshev radius probed around an occupied spawn tile.
pub const SPAWN_PROBE_RADIUS: u32 = 3;
/// Random tiles probed before a spawn point skips its interval.
pub const SPAWN_PROBE_ATTEMPTS: usize = 5;

/// Delay between the boss announcement and the boss entering the arena.
pub const BOSS_ARRIVAL_DELAY: Duration = Duration::from_secs(3);

/// Playable characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterKind {
    /// Sturdy all-rounder that wards itself against the next hit.
    Knight,
    /// Quick striker fuelled by a regenerating mana pool.
    Fighter,
    /// Slow heavy hitter that dampens incoming damage.
    Warrior,
}

impl CharacterKind {
    /// Every character in selection order.
    pub const ALL: [CharacterKind; 3] = [
        CharacterKind::Knight,
        CharacterKind::Fighter,
        CharacterKind::Warrior,
    ];

    /// Base statistics of the character.
    #[must_use]
    pub const fn profile(self) -> CharacterProfile {
        match self {
            Self::Knight => CharacterProfile {
                max_health: 120,
                damage: 20,
                attack_speed: 1.0,
                move_speed: 1.0,
                signature: SignatureAbility::GroundSlam,
                magic: MagicEffect::Ward,
                mana: None,
            },
            Self::Fighter => CharacterProfile {
                max_health: 100,
                damage: 15,
                attack_speed: 1.4,
                move_speed: 1.2,
                signature: SignatureAbility::Whirlwind,
                magic: MagicEffect::Rage,
                mana: Some(ManaProfile {
                    max: 100.0,
                    regen_per_second: 5.0,
                }),
            },
            Self::Warrior => CharacterProfile {
                max_health: 150,
                damage: 25,
                attack_speed: 0.8,
                move_speed: 0.9,
                signature: SignatureAbility::FireStreak,
                magic: MagicEffect::Aura,
                mana: None,
            },
        }
    }

    /// Lowercase identifier used in configuration files and save records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Knight => "knight",
            Self::Fighter => "fighter",
            Self::Warrior => "warrior",
        }
    }
}

/// Base statistics shared by every instance of a character kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterProfile {
    /// Maximum health before upgrades.
    pub max_health: u32,
    /// Melee damage before upgrades and buffs.
    pub damage: u32,
    /// Attack speed multiplier; higher values shorten the melee interval.
    pub attack_speed: f32,
    /// Move speed multiplier; higher values shorten the step interval.
    pub move_speed: f32,
    /// Directional area ability bound to the character.
    pub signature: SignatureAbility,
    /// Timed magic effect bound to the character.
    pub magic: MagicEffect,
    /// Mana pool, present only for characters that regenerate mana.
    pub mana: Option<ManaProfile>,
}

impl CharacterProfile {
    /// Melee interval derived from the attack speed multiplier.
    #[must_use]
    pub fn attack_interval(&self) -> Duration {
        scale_interval(BASE_ATTACK_INTERVAL, self.attack_speed)
    }
}

/// Mana pool parameters for characters that regenerate mana over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManaProfile {
    /// Capacity of the pool; characters start a run full.
    pub max: f32,
    /// Mana regenerated per simulated second.
    pub regen_per_second: f32,
}

/// Signature area abilities, one per character kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAbility {
    /// Knight: shockwave around the caster.
    GroundSlam,
    /// Fighter: spinning strike hitting every neighbour.
    Whirlwind,
    /// Warrior: narrow line of fire in the facing direction.
    FireStreak,
}

impl SignatureAbility {
    /// Area, damage and timing parameters of the ability.
    #[must_use]
    pub const fn profile(self) -> AreaAbility {
        match self {
            Self::GroundSlam => AreaAbility {
                range: 2,
                arc_degrees: 360.0,
                damage: 30,
                knockback: 2,
                cooldown: Duration::from_secs(6),
                active_for: Duration::from_secs(1),
            },
            Self::Whirlwind => AreaAbility {
                range: 1,
                arc_degrees: 360.0,
                damage: 20,
                knockback: 1,
                cooldown: Duration::from_secs(4),
                active_for: Duration::from_millis(800),
            },
            Self::FireStreak => AreaAbility {
                range: 4,
                arc_degrees: 45.0,
                damage: 40,
                knockback: 1,
                cooldown: Duration::from_secs(8),
                active_for: Duration::from_millis(1200),
            },
        }
    }
}

/// Parameters of a directional area ability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaAbility {
    /// Chebyshev range in tiles.
    pub range: u32,
    /// Width of the affected arc centred on the caster's facing.
    pub arc_degrees: f32,
    /// Damage applied to every target inside the area.
    pub damage: u32,
    /// Tiles a surviving target is pushed away from the caster.
    pub knockback: u32,
    /// Cooldown before upgrades.
    pub cooldown: Duration,
    /// Window during which the caster is slowed.
    pub active_for: Duration,
}

/// Character-specific magic effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MagicEffect {
    /// Knight: shield that blocks the next hit.
    Ward,
    /// Fighter: arms a single doubled melee strike.
    Rage,
    /// Warrior: halves incoming damage while active.
    Aura,
}

impl MagicEffect {
    /// Timing and cost parameters of the effect.
    #[must_use]
    pub const fn profile(self) -> MagicProfile {
        match self {
            Self::Ward => MagicProfile {
                cooldown: Duration::from_secs(15),
                active_for: Duration::from_secs(5),
                mana_cost: 0.0,
            },
            Self::Rage => MagicProfile {
                cooldown: Duration::from_secs(12),
                active_for: Duration::from_secs(6),
                mana_cost: 40.0,
            },
            Self::Aura => MagicProfile {
                cooldown: Duration::from_secs(20),
                active_for: Duration::from_secs(8),
                mana_cost: 0.0,
            },
        }
    }
}

/// Timing and cost parameters of a magic effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MagicProfile {
    /// Cooldown before upgrades.
    pub cooldown: Duration,
    /// Window after which the effect deactivates on its own.
    pub active_for: Duration,
    /// Mana consumed on activation; ignored by characters without mana.
    pub mana_cost: f32,
}

/// Hostile creature kinds produced by spawn points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    /// Fast, hard-hitting undead.
    Skeleton,
    /// Sluggish blob with a slow attack.
    Slime,
}

impl EnemyKind {
    /// Every enemy kind in declaration order.
    pub const ALL: [EnemyKind; 2] = [EnemyKind::Skeleton, EnemyKind::Slime];

    /// Per-kind behaviour and combat constants.
    #[must_use]
    pub const fn profile(self) -> EnemyProfile {
        match self {
            Self::Skeleton => EnemyProfile {
                max_health: 30,
                damage: 10,
                think_interval: Duration::from_millis(100),
                move_cooldown: Duration::from_millis(200),
                attack_cooldown: Duration::from_millis(2000),
                spawn_interval: Duration::from_millis(4000),
            },
            Self::Slime => EnemyProfile {
                max_health: 20,
                damage: 6,
                think_interval: Duration::from_millis(150),
                move_cooldown: Duration::from_millis(400),
                attack_cooldown: Duration::from_millis(3000),
                spawn_interval: Duration::from_millis(6000),
            },
        }
    }
}

/// Behaviour and combat constants of an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnemyProfile {
    /// Hit points of a freshly spawned enemy.
    pub max_health: u32,
    /// Damage dealt by each successful attack.
    pub damage: u32,
    /// Cadence at which the AI re-evaluates this enemy.
    pub think_interval: Duration,
    /// Minimum time between two steps.
    pub move_cooldown: Duration,
    /// Minimum time between two attacks.
    pub attack_cooldown: Duration,
    /// Default interval between two spawns at a spawn point of this kind.
    pub spawn_interval: Duration,
}

/// Level-scaled boss statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BossProfile {
    /// Hit points on arrival.
    pub max_health: u32,
    /// Damage dealt by each attack.
    pub damage: u32,
    /// Fixed movement tick.
    pub move_interval: Duration,
    /// Minimum time between two attacks.
    pub attack_cooldown: Duration,
}

impl BossProfile {
    /// Boss statistics for the provided level; levels below one count as one.
    #[must_use]
    pub fn for_level(level: u32) -> Self {
        let extra = level.max(1) - 1;
        Self {
            max_health: 500u32.saturating_add(extra.saturating_mul(250)),
            damage: 15u32.saturating_add(extra.saturating_mul(5)),
            move_interval: Duration::from_secs(1),
            attack_cooldown: Duration::from_secs(1),
        }
    }
}

/// Permanent upgrade tracks purchasable in the shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Adds flat melee damage.
    Damage,
    /// Raises maximum health.
    Health,
    /// Shortens signature and magic cooldowns.
    AbilityCooldown,
}

/// Permanent upgrade levels shared by the party.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Upgrades {
    /// Damage upgrade level.
    pub damage: u32,
    /// Health upgrade level.
    pub health: u32,
    /// Ability cooldown upgrade level.
    pub ability_cooldown: u32,
}

impl Upgrades {
    /// Level reached on the provided track.
    #[must_use]
    pub const fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Damage => self.damage,
            UpgradeKind::Health => self.health,
            UpgradeKind::AbilityCooldown => self.ability_cooldown,
        }
    }

    /// Raises the provided track by `levels`.
    pub fn raise(&mut self, kind: UpgradeKind, levels: u32) {
        let slot = match kind {
            UpgradeKind::Damage => &mut self.damage,
            UpgradeKind::Health => &mut self.health,
            UpgradeKind::AbilityCooldown => &mut self.ability_cooldown,
        };
        *slot = slot.saturating_add(levels);
    }

    /// Flat melee damage bonus granted by the damage track.
    #[must_use]
    pub const fn bonus_damage(&self) -> u32 {
        self.damage.saturating_mul(DAMAGE_PER_UPGRADE)
    }

    /// Maximum health bonus granted by the health track.
    #[must_use]
    pub const fn bonus_health(&self) -> u32 {
        self.health.saturating_mul(HEALTH_PER_UPGRADE)
    }
}

/// Applies the cooldown upgrade formula `base × max(0.3, 1 − 0.1 × level)`.
#[must_use]
pub fn effective_cooldown(base: Duration, cooldown_level: u32) -> Duration {
    let reduction = cooldown_level.saturating_mul(COOLDOWN_REDUCTION_PERCENT_PER_LEVEL);
    let percent = 100u32.saturating_sub(reduction).max(MIN_COOLDOWN_PERCENT);
    base.saturating_mul(percent) / 100
}

/// Maximum enemies a spawn point produces on `level`, given its level-one cap.
#[must_use]
pub fn level_cap(base: u32, level: u32) -> u32 {
    base.saturating_add(level.max(1).saturating_sub(1).saturating_mul(2))
}

/// Divides a base interval by a speed multiplier, treating non-positive speeds as a stop.
#[must_use]
pub fn scale_interval(base: Duration, speed: f32) -> Duration {
    if speed <= f32::EPSILON || !speed.is_finite() {
        return Duration::MAX;
    }
    let nanos = (base.as_nanos() as f64 / f64::from(speed)).round();
    if nanos >= u64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::from_nanos(nanos as u64)
}

/// Gem colours dropped by enemies and crates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GemColor {
    /// Blue gem; consumed for a shield.
    Blue,
    /// Green gem; consumed for a speed buff.
    Green,
    /// Red gem; consumed for a damage buff.
    Red,
}

impl GemColor {
    /// Every gem colour in declaration order.
    pub const ALL: [GemColor; 3] = [GemColor::Blue, GemColor::Green, GemColor::Red];
}

/// Gem counters shared by the party.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gems {
    /// Blue gems held.
    pub blue: u32,
    /// Green gems held.
    pub green: u32,
    /// Red gems held.
    pub red: u32,
}

impl Gems {
    /// Number of gems of the provided colour.
    #[must_use]
    pub const fn count(&self, color: GemColor) -> u32 {
        match color {
            GemColor::Blue => self.blue,
            GemColor::Green => self.green,
            GemColor::Red => self.red,
        }
    }

    /// Adds `amount` gems of the provided colour.
    pub fn add(&mut self, color: GemColor, amount: u32) {
        let slot = self.slot(color);
        *slot = slot.saturating_add(amount);
    }

    /// Removes a single gem, reporting whether one was available.
    pub fn take(&mut self, color: GemColor) -> bool {
        let slot = self.slot(color);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    fn slot(&mut self, color: GemColor) -> &mut u32 {
        match color {
            GemColor::Blue => &mut self.blue,
            GemColor::Green => &mut self.green,
            GemColor::Red => &mut self.red,
        }
    }
}

/// Consumable items sold in the shop and occasionally dropped as loot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Restores health.
    HealthPotion,
    /// Grants a temporary speed buff.
    SpeedPotion,
    /// Grants a temporary damage buff.
    DamagePotion,
}

/// Consumable items held by the party.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inventory {
    /// Health potions held.
    pub health_potions: u32,
    /// Speed potions held.
    pub speed_potions: u32,
    /// Damage potions held.
    pub damage_potions: u32,
}

impl Inventory {
    /// Number of items of the provided kind.
    #[must_use]
    pub const fn count(&self, item: ItemKind) -> u32 {
        match item {
            ItemKind::HealthPotion => self.health_potions,
            ItemKind::SpeedPotion => self.speed_potions,
            ItemKind::DamagePotion => self.damage_potions,
        }
    }

    /// Adds `amount` items of the provided kind.
    pub fn add(&mut self, item: ItemKind, amount: u32) {
        let slot = self.slot(item);
        *slot = slot.saturating_add(amount);
    }

    /// Removes a single item, reporting whether one was available.
    pub fn take(&mut self, item: ItemKind) -> bool {
        let slot = self.slot(item);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    fn slot(&mut self, item: ItemKind) -> &mut u32 {
        match item {
            ItemKind::HealthPotion => &mut self.health_potions,
            ItemKind::SpeedPotion => &mut self.speed_potions,
            ItemKind::DamagePotion => &mut self.damage_potions,
        }
    }
}

/// Entries offered by the shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShopItem {
    /// A consumable added to the shared inventory.
    Item(ItemKind),
    /// A permanent upgrade level.
    Upgrade(UpgradeKind),
}

impl ShopItem {
    /// Gold price of a single unit.
    #[must_use]
    pub const fn price(self) -> u32 {
        match self {
            Self::Item(ItemKind::HealthPotion) => 25,
            Self::Item(ItemKind::SpeedPotion) => 40,
            Self::Item(ItemKind::DamagePotion) => 60,
            Self::Upgrade(UpgradeKind::Damage) => 100,
            Self::Upgrade(UpgradeKind::Health) => 100,
            Self::Upgrade(UpgradeKind::AbilityCooldown) => 150,
        }
    }
}

/// Kinds of timed buffs a player can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuffKind {
    /// Multiplies move speed.
    Speed,
    /// Multiplies melee damage.
    Damage,
    /// Blocks the next incoming hit.
    Shield,
}

/// Effect applied when a consumable is used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConsumableEffect {
    /// Restores the provided amount of health, never beyond the maximum.
    Heal(u32),
    /// Applies a timed buff.
    Buff {
        /// Buff to apply.
        kind: BuffKind,
        /// Multiplier carried by the buff; ignored by shields.
        multiplier: f32,
        /// Time until the buff expires.
        duration: Duration,
    },
}

/// Defensive state consulted when a hit lands on a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Defenses {
    /// A shield buff is active.
    pub shield: bool,
    /// A damage-reduction aura is active.
    pub aura: bool,
}

/// Outcome of mitigating a single incoming hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mitigation {
    /// Damage that reaches the player's health.
    pub applied: u32,
    /// The shield absorbed the hit and must be removed.
    pub shield_consumed: bool,
}

/// Resolves an incoming hit against the player's defences.
///
/// A shield blocks any positive hit completely and is consumed; otherwise an
/// aura halves the damage rounding down; otherwise the full damage applies.
#[must_use]
pub const fn mitigate(damage: u32, defenses: Defenses) -> Mitigation {
    if damage > 0 && defenses.shield {
        return Mitigation {
            applied: 0,
            shield_consumed: true,
        };
    }
    let applied = if defenses.aura { damage / 2 } else { damage };
    Mitigation {
        applied,
        shield_consumed: false,
    }
}
