#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skulls & Daggers combat simulation.
//!
//! This crate defines the message surface that connects the session
//! orchestrator, the authoritative world, and pure systems. Systems inspect
//! world snapshots and the [`Event`] stream, then respond exclusively with
//! [`Command`] batches. The world executes those commands through its
//! `apply` entry point, re-validating each one against live state, and
//! broadcasts new events describing what actually happened.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod spatial;
pub mod stats;

pub use config::{ConfigError, RunConfig, SpawnPointLayout};
pub use spatial::{tile_to_position, Direction, MapBounds, TileCoord, TileMetrics};
pub use stats::{
    BuffKind, CharacterKind, CharacterProfile, ConsumableEffect, EnemyKind, GemColor, Gems,
    ItemKind, Inventory, MagicEffect, ShopItem, SignatureAbility, UpgradeKind, Upgrades,
};

/// Unique identifier assigned to a player; player one is `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a loot drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LootId(u32);

impl LootId {
    /// Creates a new loot identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a breakable crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrateId(u32);

impl CrateId {
    /// Creates a new crate identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnPointId(u32);

impl SpawnPointId {
    /// Creates a new spawn point identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Party composition chosen when a run starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    /// A single player.
    Single(CharacterKind),
    /// Two players sharing gold, gems, upgrades and inventory.
    Coop(CharacterKind, CharacterKind),
}

impl PlayMode {
    /// Characters in player-index order.
    #[must_use]
    pub fn characters(&self) -> Vec<CharacterKind> {
        match *self {
            Self::Single(first) => vec![first],
            Self::Coop(first, second) => vec![first, second],
        }
    }

    /// Number of players taking part in the run.
    #[must_use]
    pub const fn player_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Coop(_, _) => 2,
        }
    }
}

/// Coarse progress of the current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Spawn points are producing enemies.
    Waves,
    /// Every wave is cleared and the boss is on its way.
    BossIncoming,
    /// The boss is in the arena.
    BossFight,
    /// The boss was defeated.
    Victory,
    /// A player fell; the run awaits a restart.
    Defeated,
}

/// Behaviour states shared by enemies and the boss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    /// No player within aggro range.
    Idle,
    /// Closing the distance toward the nearest player.
    Chase,
    /// Adjacent to a player and striking on cooldown.
    Attack,
    /// Dead and awaiting removal.
    Dead,
}

/// Phases of the two-step dash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DashPhase {
    /// Short initial burst.
    Burst,
    /// Longer sustained phase following the burst.
    Sustained,
}

impl DashPhase {
    /// Move-speed multiplier applied during the phase.
    #[must_use]
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Burst => stats::DASH_BURST_MULTIPLIER,
            Self::Sustained => stats::DASH_SUSTAIN_MULTIPLIER,
        }
    }
}

/// Timed modifier carried by a player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Buff {
    /// Kind of the buff.
    pub kind: BuffKind,
    /// Multiplier applied while active; `1.0` for shields.
    pub multiplier: f32,
    /// Absolute simulation time at which the buff expires.
    pub ends_at: Duration,
}

/// At most one buff per kind; applying a buff overwrites the previous one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BuffSet {
    speed: Option<Buff>,
    damage: Option<Buff>,
    shield: Option<Buff>,
}

impl BuffSet {
    /// Active buff of the provided kind, if any.
    #[must_use]
    pub const fn get(&self, kind: BuffKind) -> Option<Buff> {
        match kind {
            BuffKind::Speed => self.speed,
            BuffKind::Damage => self.damage,
            BuffKind::Shield => self.shield,
        }
    }

    /// Reports whether a buff of the provided kind is active.
    #[must_use]
    pub const fn is_active(&self, kind: BuffKind) -> bool {
        self.get(kind).is_some()
    }

    /// Multiplier of the provided kind, `1.0` when inactive.
    #[must_use]
    pub fn multiplier(&self, kind: BuffKind) -> f32 {
        self.get(kind).map_or(1.0, |buff| buff.multiplier)
    }

    /// Installs the buff, returning the one it replaced.
    pub fn apply(&mut self, buff: Buff) -> Option<Buff> {
        self.slot(buff.kind).replace(buff)
    }

    /// Removes the buff of the provided kind, returning it.
    pub fn remove(&mut self, kind: BuffKind) -> Option<Buff> {
        self.slot(kind).take()
    }

    /// Iterates over active buffs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = Buff> {
        [self.speed, self.damage, self.shield].into_iter().flatten()
    }

    fn slot(&mut self, kind: BuffKind) -> &mut Option<Buff> {
        match kind {
            BuffKind::Speed => &mut self.speed,
            BuffKind::Damage => &mut self.damage,
            BuffKind::Shield => &mut self.shield,
        }
    }
}

/// Contents of a loot drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LootKind {
    /// A pile of gold.
    Gold,
    /// Gems of a single colour.
    Gem(GemColor),
    /// A named consumable.
    Item(ItemKind),
}

/// Gold, gems, upgrades and consumables shared by the party.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Economy {
    /// Gold available for purchases.
    pub gold: u32,
    /// Gem counters.
    pub gems: Gems,
    /// Permanent upgrade levels.
    pub upgrades: Upgrades,
    /// Consumables held.
    pub inventory: Inventory,
}

/// Ability slots that can be rejected independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbilitySlot {
    /// The character's signature area ability.
    Signature,
    /// The character's magic effect.
    Magic,
    /// The universal dash.
    Dash,
}

/// What a melee swing connects with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeleeTarget {
    /// A live enemy.
    Enemy(EnemyId),
    /// The boss.
    Boss,
    /// An intact crate.
    Crate(CrateId),
    /// Nothing within reach; the swing still consumes the cooldown.
    Nothing,
}

/// Damage dealt to a single enemy by an area ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AreaHit {
    /// Enemy inside the affected area.
    pub enemy: EnemyId,
    /// Damage applied to the enemy.
    pub damage: u32,
    /// Tile the enemy is pushed to before the damage lands.
    pub knockback_to: TileCoord,
}

/// Interval and cap assigned to a spawn point when a level starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpawnPointPlan {
    /// Spawn point being re-armed.
    pub spawn_point: SpawnPointId,
    /// Enemies the point produces during the level.
    pub max: u32,
    /// Interval between two spawns.
    pub interval: Duration,
}

/// Reasons a movement request is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveRejection {
    /// The player is dead.
    Defeated,
    /// The player is mid-attack.
    Attacking,
    /// The step interval has not elapsed.
    Recovering,
    /// An enemy or the boss holds the destination tile.
    Blocked,
}

/// Reasons a melee attack is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttackRejection {
    /// The attacker is dead.
    Defeated,
    /// The melee interval has not elapsed.
    OnCooldown,
    /// The target is missing, dead, or farther than melee reach.
    OutOfReach,
}

/// Reasons an ability activation is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbilityRejection {
    /// The player is dead.
    Defeated,
    /// The cooldown has not elapsed.
    OnCooldown,
    /// The ability is still running.
    AlreadyActive,
    /// The mana pool cannot pay for the effect.
    InsufficientMana,
}

/// Reasons a consumable cannot be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsumableRejection {
    /// The player is dead.
    Defeated,
    /// None left in the shared stash.
    OutOfStock,
}

/// Reasons a purchase is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PurchaseRejection {
    /// The shared gold pool cannot cover `price × quantity`.
    InsufficientGold,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards the current run and starts a fresh one on level one.
    StartRun {
        /// Party composition.
        mode: PlayMode,
    },
    /// Moves a victorious run on to the next level.
    AdvanceLevel {
        /// Cap and interval for each spawn point on the new level.
        spawn_plan: Vec<SpawnPointPlan>,
    },
    /// Replaces the run with a previously captured snapshot.
    RestoreRun {
        /// Snapshot to install.
        snapshot: Box<RunSnapshot>,
    },
    /// Advances the simulation clock and fires due scheduled actions.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a player step one tile.
    MovePlayer {
        /// Player attempting to move.
        player: PlayerId,
        /// Direction of the step.
        direction: Direction,
    },
    /// Requests a melee swing.
    MeleeAttack {
        /// Attacking player.
        player: PlayerId,
        /// What the swing connects with.
        target: MeleeTarget,
        /// Damage dealt to an enemy or the boss.
        damage: u32,
        /// The damage includes an armed rage doubling that must be consumed.
        consume_rage: bool,
        /// Melee interval gating the swing.
        interval: Duration,
    },
    /// Reports that the presentation layer finished a player's attack animation.
    FinishAttack {
        /// Player whose animation completed.
        player: PlayerId,
    },
    /// Requests activation of a player's signature ability.
    ActivateSignature {
        /// Casting player.
        player: PlayerId,
        /// Effective cooldown after upgrades.
        cooldown: Duration,
        /// Window during which the caster is slowed.
        active_for: Duration,
    },
    /// Applies the damage and knockback of a resolved area ability.
    AreaStrike {
        /// Casting player.
        player: PlayerId,
        /// Enemies inside the affected area.
        hits: Vec<AreaHit>,
        /// Damage dealt to the boss when it stands inside the area.
        boss_damage: Option<u32>,
    },
    /// Requests activation of a player's magic effect.
    ActivateMagic {
        /// Casting player.
        player: PlayerId,
        /// Effective cooldown after upgrades.
        cooldown: Duration,
        /// Window after which the effect deactivates.
        active_for: Duration,
        /// Mana consumed on activation.
        mana_cost: f32,
    },
    /// Requests the two-phase dash.
    ActivateDash {
        /// Dashing player.
        player: PlayerId,
    },
    /// Consumes one item from the shared inventory.
    UseItem {
        /// Player drinking the item.
        player: PlayerId,
        /// Item consumed.
        item: ItemKind,
        /// Effect applied to the player.
        effect: ConsumableEffect,
    },
    /// Consumes one gem from the shared pouch.
    ConsumeGem {
        /// Player consuming the gem.
        player: PlayerId,
        /// Colour consumed.
        color: GemColor,
        /// Effect applied to the player.
        effect: ConsumableEffect,
    },
    /// Buys `quantity` units of a shop item from the shared gold pool.
    Purchase {
        /// Item bought.
        item: ShopItem,
        /// Units bought.
        quantity: u32,
    },
    /// Places a new enemy produced by a spawn point.
    SpawnEnemy {
        /// Producing spawn point.
        spawn_point: SpawnPointId,
        /// Tile on which the enemy appears.
        tile: TileCoord,
    },
    /// Skips a spawn point's current interval because no tile was free.
    DeferSpawn {
        /// Spawn point that could not place an enemy.
        spawn_point: SpawnPointId,
    },
    /// Retires an exhausted spawn point.
    DeactivateSpawnPoint {
        /// Spawn point to retire.
        spawn_point: SpawnPointId,
    },
    /// Requests that an enemy step onto a neighbouring tile.
    MoveEnemy {
        /// Moving enemy.
        enemy: EnemyId,
        /// Destination tile.
        to: TileCoord,
    },
    /// Records an enemy's behaviour state.
    SetEnemyBehavior {
        /// Enemy being updated.
        enemy: EnemyId,
        /// New state.
        behavior: BehaviorState,
    },
    /// Requests that an enemy strike a player.
    EnemyAttack {
        /// Attacking enemy.
        enemy: EnemyId,
        /// Targeted player.
        player: PlayerId,
    },
    /// Announces the boss; single use per level.
    AnnounceBoss {
        /// Arrival tile.
        tile: TileCoord,
        /// Delay between the announcement and the arrival.
        arrival_delay: Duration,
    },
    /// Requests that the boss step onto a neighbouring tile.
    MoveBoss {
        /// Destination tile.
        to: TileCoord,
    },
    /// Records the boss's behaviour state.
    SetBossBehavior {
        /// New state.
        behavior: BehaviorState,
    },
    /// Requests that the boss strike a player.
    BossAttack {
        /// Targeted player.
        player: PlayerId,
    },
    /// Places loot on the ground.
    DropLoot {
        /// Tile holding the drop.
        tile: TileCoord,
        /// Contents of the drop.
        kind: LootKind,
        /// Quantity contained.
        amount: u32,
    },
    /// Places an intact crate.
    PlaceCrate {
        /// Tile holding the crate.
        tile: TileCoord,
    },
    /// Moves a loot drop into the shared stash.
    CollectLoot {
        /// Collecting player.
        player: PlayerId,
        /// Drop being collected.
        loot: LootId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A fresh run started.
    RunStarted {
        /// Party composition.
        mode: PlayMode,
        /// Level the run starts on.
        level: u32,
    },
    /// A snapshot replaced the run.
    RunRestored {
        /// Level restored from the snapshot.
        level: u32,
    },
    /// The run moved on to a new level.
    LevelAdvanced {
        /// Level that became active.
        level: u32,
    },
    /// The simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Simulation time after the tick.
        now: Duration,
    },
    /// A player stepped between two tiles.
    PlayerMoved {
        /// Moving player.
        player: PlayerId,
        /// Tile before the step.
        from: TileCoord,
        /// Tile after the step.
        to: TileCoord,
        /// Facing after the step.
        facing: Direction,
    },
    /// A movement request was refused.
    MoveRejected {
        /// Player whose step was refused.
        player: PlayerId,
        /// Reason for the refusal.
        reason: MoveRejection,
    },
    /// A melee swing began.
    AttackStarted {
        /// Attacking player.
        player: PlayerId,
        /// What the swing connects with.
        target: MeleeTarget,
        /// Facing during the swing.
        facing: Direction,
    },
    /// A melee swing was refused.
    AttackRejected {
        /// Player whose swing was refused.
        player: PlayerId,
        /// Reason for the refusal.
        reason: AttackRejection,
    },
    /// A player's attack state ended, by animation completion or fallback timer.
    AttackFinished {
        /// Player whose attack ended.
        player: PlayerId,
    },
    /// An armed rage doubled a strike and was spent.
    RageConsumed {
        /// Player whose rage was spent.
        player: PlayerId,
    },
    /// A signature ability was activated.
    SignatureActivated {
        /// Casting player.
        player: PlayerId,
        /// Ability cast.
        ability: SignatureAbility,
        /// Caster's tile at activation.
        origin: TileCoord,
        /// Caster's facing at activation.
        facing: Direction,
    },
    /// A signature ability's active window closed.
    SignatureEnded {
        /// Casting player.
        player: PlayerId,
    },
    /// A magic effect was activated.
    MagicActivated {
        /// Casting player.
        player: PlayerId,
        /// Effect activated.
        effect: MagicEffect,
    },
    /// A magic effect expired or was spent.
    MagicExpired {
        /// Casting player.
        player: PlayerId,
        /// Effect that ended.
        effect: MagicEffect,
    },
    /// A dash burst started.
    DashStarted {
        /// Dashing player.
        player: PlayerId,
    },
    /// A dash moved from burst to sustained speed.
    DashSustained {
        /// Dashing player.
        player: PlayerId,
    },
    /// A dash ended and its cooldown started.
    DashEnded {
        /// Dashing player.
        player: PlayerId,
    },
    /// An ability activation was refused.
    AbilityRejected {
        /// Player whose activation was refused.
        player: PlayerId,
        /// Ability slot involved.
        slot: AbilitySlot,
        /// Reason for the refusal.
        reason: AbilityRejection,
    },
    /// A buff was applied or overwritten.
    BuffApplied {
        /// Buffed player.
        player: PlayerId,
        /// Kind applied.
        kind: BuffKind,
        /// Multiplier carried.
        multiplier: f32,
        /// Absolute expiry time.
        ends_at: Duration,
    },
    /// A buff ran out.
    BuffExpired {
        /// Player who lost the buff.
        player: PlayerId,
        /// Kind that expired.
        kind: BuffKind,
    },
    /// A shield absorbed a hit and was consumed.
    ShieldConsumed {
        /// Shielded player.
        player: PlayerId,
    },
    /// A player regained health.
    PlayerHealed {
        /// Healed player.
        player: PlayerId,
        /// Health actually restored.
        amount: u32,
        /// Health after healing.
        health: u32,
    },
    /// An item left the shared inventory.
    ItemUsed {
        /// Player using the item.
        player: PlayerId,
        /// Item used.
        item: ItemKind,
    },
    /// A gem left the shared pouch.
    GemConsumed {
        /// Player consuming the gem.
        player: PlayerId,
        /// Colour consumed.
        color: GemColor,
    },
    /// A consumable could not be used.
    ConsumableRejected {
        /// Player whose request was refused.
        player: PlayerId,
        /// Reason for the refusal.
        reason: ConsumableRejection,
    },
    /// A purchase went through.
    PurchaseCompleted {
        /// Item bought.
        item: ShopItem,
        /// Units bought.
        quantity: u32,
        /// Gold spent.
        cost: u32,
        /// Gold remaining.
        gold: u32,
    },
    /// A purchase was refused; the gold pool is unchanged.
    PurchaseRejected {
        /// Item requested.
        item: ShopItem,
        /// Units requested.
        quantity: u32,
        /// Reason for the refusal.
        reason: PurchaseRejection,
    },
    /// A hit landed on a player.
    PlayerDamaged {
        /// Player hit.
        player: PlayerId,
        /// Damage after mitigation.
        damage: u32,
        /// Health after the hit.
        health: u32,
    },
    /// A player's health reached zero.
    PlayerDefeated {
        /// Fallen player.
        player: PlayerId,
    },
    /// A spawn point produced an enemy.
    EnemySpawned {
        /// Identifier of the new enemy.
        enemy: EnemyId,
        /// Kind of the new enemy.
        kind: EnemyKind,
        /// Tile the enemy occupies.
        tile: TileCoord,
        /// Producing spawn point.
        spawn_point: SpawnPointId,
    },
    /// A spawn point skipped an interval.
    SpawnDeferred {
        /// Spawn point that skipped.
        spawn_point: SpawnPointId,
    },
    /// A spawn point retired.
    SpawnPointDeactivated {
        /// Retired spawn point.
        spawn_point: SpawnPointId,
    },
    /// An enemy stepped between two tiles.
    EnemyMoved {
        /// Moving enemy.
        enemy: EnemyId,
        /// Tile before the step.
        from: TileCoord,
        /// Tile after the step.
        to: TileCoord,
    },
    /// An enemy changed behaviour state.
    EnemyBehaviorChanged {
        /// Enemy updated.
        enemy: EnemyId,
        /// New state.
        behavior: BehaviorState,
    },
    /// An area ability pushed an enemy away.
    EnemyKnockedBack {
        /// Displaced enemy.
        enemy: EnemyId,
        /// Tile before the push.
        from: TileCoord,
        /// Tile after the push.
        to: TileCoord,
    },
    /// An enemy took damage and survived.
    EnemyDamaged {
        /// Damaged enemy.
        enemy: EnemyId,
        /// Damage taken.
        damage: u32,
        /// Health remaining.
        health: u32,
    },
    /// An enemy died; its corpse lingers for the presentation delay.
    EnemyDied {
        /// Dead enemy.
        enemy: EnemyId,
        /// Kind of the dead enemy.
        kind: EnemyKind,
        /// Tile of death.
        tile: TileCoord,
        /// Spawn point the enemy came from, if known.
        spawn_point: Option<SpawnPointId>,
    },
    /// A corpse left the registry.
    EnemyRemoved {
        /// Removed enemy.
        enemy: EnemyId,
    },
    /// The boss was announced.
    BossIncoming {
        /// Arrival tile.
        tile: TileCoord,
        /// Absolute arrival time.
        arrives_at: Duration,
    },
    /// The boss entered the arena.
    BossSpawned {
        /// Arrival tile.
        tile: TileCoord,
        /// Health on arrival.
        health: u32,
    },
    /// The boss stepped between two tiles.
    BossMoved {
        /// Tile before the step.
        from: TileCoord,
        /// Tile after the step.
        to: TileCoord,
    },
    /// The boss changed behaviour state.
    BossBehaviorChanged {
        /// New state.
        behavior: BehaviorState,
    },
    /// The boss took damage and survived.
    BossDamaged {
        /// Damage taken.
        damage: u32,
        /// Health remaining.
        health: u32,
    },
    /// The boss died.
    BossDied {
        /// Tile of death.
        tile: TileCoord,
        /// Level on which the boss fell.
        level: u32,
    },
    /// The boss corpse left the arena.
    BossRemoved,
    /// The level was won.
    Victory {
        /// Level won.
        level: u32,
    },
    /// Loot appeared on the ground.
    LootDropped {
        /// Identifier of the drop.
        loot: LootId,
        /// Tile holding the drop.
        tile: TileCoord,
        /// Contents.
        kind: LootKind,
        /// Quantity.
        amount: u32,
    },
    /// The oldest drop was discarded to respect the loot cap.
    LootEvicted {
        /// Discarded drop.
        loot: LootId,
    },
    /// A player picked up a drop.
    LootCollected {
        /// Collected drop.
        loot: LootId,
        /// Collecting player.
        player: PlayerId,
        /// Contents.
        kind: LootKind,
        /// Quantity.
        amount: u32,
    },
    /// A crate was placed.
    CratePlaced {
        /// Identifier of the crate.
        crate_id: CrateId,
        /// Tile holding the crate.
        tile: TileCoord,
    },
    /// A crate was smashed open.
    CrateBroken {
        /// Broken crate.
        crate_id: CrateId,
        /// Tile of the crate.
        tile: TileCoord,
    },
}

/// Immutable representation of a single player's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Character played.
    pub character: CharacterKind,
    /// Tile currently occupied.
    pub tile: TileCoord,
    /// Current facing.
    pub facing: Direction,
    /// Current health.
    pub health: u32,
    /// Maximum health including upgrades.
    pub max_health: u32,
    /// Whether the player is still standing.
    pub alive: bool,
    /// Current mana, for characters with a mana pool.
    pub mana: Option<f32>,
    /// Current move-speed multiplier before buffs and dash.
    pub move_speed: f32,
    /// Whether an attack is in progress.
    pub attacking: bool,
    /// Time of the last melee swing.
    pub last_attack_at: Option<Duration>,
    /// Time of the last step.
    pub last_step_at: Option<Duration>,
    /// Time of the last signature activation.
    pub last_signature_at: Option<Duration>,
    /// Time of the last magic activation.
    pub last_magic_at: Option<Duration>,
    /// Time of the last dash activation.
    pub last_dash_at: Option<Duration>,
    /// Whether the signature ability's window is open.
    pub signature_active: bool,
    /// Current dash phase.
    pub dash_phase: Option<DashPhase>,
    /// Active buffs.
    pub buffs: BuffSet,
    /// Whether the next melee strike is doubled.
    pub rage_armed: bool,
    /// Whether a damage-reduction aura is active.
    pub aura_active: bool,
}

impl PlayerSnapshot {
    /// Move-speed multiplier after buffs and dash.
    #[must_use]
    pub fn effective_move_speed(&self) -> f32 {
        let dash = self.dash_phase.map_or(1.0, DashPhase::multiplier);
        self.move_speed * self.buffs.multiplier(BuffKind::Speed) * dash
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnemySnapshot {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Tile currently occupied.
    pub tile: TileCoord,
    /// Current facing.
    pub facing: Direction,
    /// Remaining health.
    pub health: u32,
    /// Whether the enemy is alive.
    pub alive: bool,
    /// Current behaviour state.
    pub behavior: BehaviorState,
    /// Time of the last step.
    pub last_move_at: Option<Duration>,
    /// Time of the last attack.
    pub last_attack_at: Option<Duration>,
    /// Producing spawn point; absent for restored enemies.
    pub spawn_point: Option<SpawnPointId>,
}

/// Immutable representation of the boss used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BossSnapshot {
    /// Tile currently occupied.
    pub tile: TileCoord,
    /// Current facing.
    pub facing: Direction,
    /// Remaining health.
    pub health: u32,
    /// Health on arrival.
    pub max_health: u32,
    /// Whether the boss is alive.
    pub alive: bool,
    /// Current behaviour state.
    pub behavior: BehaviorState,
    /// Time of the last step.
    pub last_move_at: Option<Duration>,
    /// Time of the last attack.
    pub last_attack_at: Option<Duration>,
}

/// Immutable representation of a spawn point used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPointSnapshot {
    /// Identifier of the spawn point.
    pub id: SpawnPointId,
    /// Enemy kind produced.
    pub kind: EnemyKind,
    /// Spawn tile.
    pub tile: TileCoord,
    /// Enemies produced so far this level.
    pub spawned: u32,
    /// Enemies the point produces this level.
    pub max: u32,
    /// Interval between two spawns.
    pub interval: Duration,
    /// Time of the last spawn or skipped interval.
    pub last_spawn_at: Duration,
    /// Whether the point is still producing.
    pub active: bool,
}

/// Immutable representation of a loot drop used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LootSnapshot {
    /// Identifier of the drop.
    pub id: LootId,
    /// Tile holding the drop.
    pub tile: TileCoord,
    /// Contents.
    pub kind: LootKind,
    /// Quantity.
    pub amount: u32,
}

/// Immutable representation of a crate used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrateSnapshot {
    /// Identifier of the crate.
    pub id: CrateId,
    /// Tile holding the crate.
    pub tile: TileCoord,
    /// Whether the crate was smashed.
    pub broken: bool,
}

/// Coarse run progress used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStatus {
    /// Party composition.
    pub mode: PlayMode,
    /// Current phase.
    pub phase: RunPhase,
    /// Current level, starting at one.
    pub level: u32,
    /// Simulation time since the run started or was restored.
    pub clock: Duration,
    /// Whether the boss announcement fired this level.
    pub boss_incoming_announced: bool,
    /// Whether the victory fired this level.
    pub victory_announced: bool,
}

/// Player state captured for persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Character played.
    pub character: CharacterKind,
    /// Tile occupied.
    pub tile: TileCoord,
    /// Facing.
    pub facing: Direction,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
}

/// Boss state captured for persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossRecord {
    /// Tile occupied.
    pub tile: TileCoord,
    /// Remaining health.
    pub health: u32,
}

/// Live enemy captured for persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyRecord {
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Tile occupied.
    pub tile: TileCoord,
    /// Facing.
    pub facing: Direction,
}

/// Spawn point progress captured for persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPointRecord {
    /// Enemy kind produced.
    pub kind: EnemyKind,
    /// Spawn tile.
    pub tile: TileCoord,
    /// Enemies produced so far.
    pub spawned: u32,
    /// Enemies the point produces this level.
    pub max: u32,
    /// Whether the point is still producing.
    pub active: bool,
    /// Spawn interval this level; `None` falls back to the kind default.
    pub interval: Option<Duration>,
}

/// Loot drop captured for persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootRecord {
    /// Tile holding the drop.
    pub tile: TileCoord,
    /// Contents.
    pub kind: LootKind,
    /// Quantity.
    pub amount: u32,
}

/// Everything needed to resume a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Party composition.
    pub mode: PlayMode,
    /// Current level.
    pub level: u32,
    /// Current phase.
    pub phase: RunPhase,
    /// Whether the boss announcement already fired.
    pub boss_incoming_announced: bool,
    /// Whether the victory already fired.
    pub victory_announced: bool,
    /// Shared party stash.
    pub economy: Economy,
    /// Players in index order.
    pub players: Vec<PlayerRecord>,
    /// The boss, when alive.
    pub boss: Option<BossRecord>,
    /// Live enemies.
    pub enemies: Vec<EnemyRecord>,
    /// Spawn point progress.
    pub spawn_points: Vec<SpawnPointRecord>,
    /// Loot lying on the ground.
    pub loot: Vec<LootRecord>,
    /// Intact crates.
    pub crates: Vec<TileCoord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn run_snapshot_round_trips_through_bincode() {
        let snapshot = RunSnapshot {
            mode: PlayMode::Coop(CharacterKind::Knight, CharacterKind::Warrior),
            level: 2,
            phase: RunPhase::BossFight,
            boss_incoming_announced: true,
            victory_announced: false,
            economy: Economy {
                gold: 340,
                ..Economy::default()
            },
            players: vec![PlayerRecord {
                character: CharacterKind::Knight,
                tile: TileCoord::new(3, 4),
                facing: Direction::SouthWest,
                health: 80,
                max_health: 140,
            }],
            boss: Some(BossRecord {
                tile: TileCoord::new(15, 16),
                health: 410,
            }),
            enemies: vec![EnemyRecord {
                kind: EnemyKind::Slime,
                tile: TileCoord::new(1, 1),
                facing: Direction::East,
            }],
            spawn_points: Vec::new(),
            loot: vec![LootRecord {
                tile: TileCoord::new(2, 2),
                kind: LootKind::Gem(GemColor::Green),
                amount: 1,
            }],
            crates: vec![TileCoord::new(9, 9)],
        };
        assert_round_trip(&snapshot);
    }

    #[test]
    fn buff_set_overwrites_instead_of_stacking() {
        let mut buffs = BuffSet::default();
        let first = Buff {
            kind: BuffKind::Speed,
            multiplier: 1.5,
            ends_at: Duration::from_secs(10),
        };
        let second = Buff {
            kind: BuffKind::Speed,
            multiplier: 1.25,
            ends_at: Duration::from_secs(4),
        };
        assert_eq!(buffs.apply(first), None);
        assert_eq!(buffs.apply(second), Some(first));
        assert_eq!(buffs.get(BuffKind::Speed), Some(second));
        assert_eq!(buffs.iter().count(), 1);
        assert!((buffs.multiplier(BuffKind::Damage) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn play_mode_lists_characters_in_player_order() {
        let mode = PlayMode::Coop(CharacterKind::Fighter, CharacterKind::Knight);
        assert_eq!(
            mode.characters(),
            vec![CharacterKind::Fighter, CharacterKind::Knight]
        );
        assert_eq!(PlayMode::Single(CharacterKind::Warrior).player_count(), 1);
    }
}
