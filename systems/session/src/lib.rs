#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-driven orchestration of a Skulls & Daggers run.
//!
//! A [`Session`] owns the world together with every system and advances them
//! in a fixed order each update:
//!
//! 1. the clock ticks and scheduled actions fire;
//! 2. a fallen player halts the rest of the update;
//! 3. each player's attack, abilities, consumables, purchase and movement
//!    resolve in player-index order;
//! 4. the AI director thinks;
//! 5. the spawn director produces enemies;
//! 6. loot under players is collected;
//! 7. the boss trigger is checked.
//!
//! Commands from each step are applied before the next step reads the world.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use skulls_daggers_core::{
    stats, BossSnapshot, Command, ConfigError, ConsumableRejection, CrateSnapshot, Direction,
    Economy, EnemySnapshot, Event, GemColor, ItemKind, LootSnapshot, PlayMode, PlayerId,
    PlayerSnapshot, PurchaseRejection, RunConfig, RunPhase, RunStatus, ShopItem,
};
use skulls_daggers_persistence::{PersistenceError, SaveSlots, SaveStorage, SaveSummary};
use skulls_daggers_system_abilities::{command_for, cooldowns, AbilityRequest, CooldownReport};
use skulls_daggers_system_ai::AiDirector;
use skulls_daggers_system_combat::{melee_command, pickup_scan, CombatResolver};
use skulls_daggers_system_spawning::{check_boss_trigger, SpawnDirector};
use skulls_daggers_world::{self as world, query, World};
use tracing::{info, warn};

/// How long a notice stays on screen.
pub const NOTICE_DURATION: Duration = Duration::from_secs(2);

const COMBAT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Inputs of one player for a single update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    /// Swing at whatever is in reach.
    pub attack: bool,
    /// Trigger the signature ability.
    pub signature: bool,
    /// Trigger the magic effect.
    pub magic: bool,
    /// Start a dash.
    pub dash: bool,
    /// Drink a potion.
    pub item: Option<ItemKind>,
    /// Consume a gem.
    pub gem: Option<GemColor>,
    /// Buy from the shop.
    pub purchase: Option<(ShopItem, u32)>,
    /// Step one tile.
    pub movement: Option<Direction>,
}

impl PlayerInput {
    fn ability_requests(&self) -> impl Iterator<Item = AbilityRequest> {
        [
            self.signature.then_some(AbilityRequest::Signature),
            self.magic.then_some(AbilityRequest::Magic),
            self.dash.then_some(AbilityRequest::Dash),
            self.item.map(AbilityRequest::Item),
            self.gem.map(AbilityRequest::Gem),
        ]
        .into_iter()
        .flatten()
    }
}

/// A player as shown by the interface.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerView {
    /// Player state.
    pub snapshot: PlayerSnapshot,
    /// Remaining cooldowns.
    pub cooldowns: CooldownReport,
}

/// Read-only picture of the run for display.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    /// Phase, level and clock.
    pub status: RunStatus,
    /// Players in index order.
    pub players: Vec<PlayerView>,
    /// Enemies, including corpses awaiting removal.
    pub enemies: Vec<EnemySnapshot>,
    /// The boss, when present.
    pub boss: Option<BossSnapshot>,
    /// Loot on the ground.
    pub loot: Vec<LootSnapshot>,
    /// Crates in the arena.
    pub crates: Vec<CrateSnapshot>,
    /// Shared party stash.
    pub economy: Economy,
    /// Notices still on screen, oldest first.
    pub notices: Vec<String>,
}

#[derive(Clone, Debug)]
struct Notice {
    message: String,
    expires_at: Duration,
}

/// A run together with its systems and save slots.
#[derive(Debug)]
pub struct Session<S> {
    world: World,
    ai: AiDirector,
    spawner: SpawnDirector,
    combat: CombatResolver,
    slots: SaveSlots<S>,
    mode: PlayMode,
    elapsed: Duration,
    notices: Vec<Notice>,
    ai_inbox: Vec<Event>,
    frame_events: Vec<Event>,
}

impl<S: SaveStorage> Session<S> {
    /// Creates a session with a single-knight run ready to play.
    pub fn new(config: RunConfig, storage: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed;
        let world = World::new(config);
        let mode = query::status(&world).mode;
        Ok(Self {
            world,
            ai: AiDirector::new(),
            spawner: SpawnDirector::from_seed(seed),
            combat: CombatResolver::from_seed(seed ^ COMBAT_SEED_SALT),
            slots: SaveSlots::new(storage),
            mode,
            elapsed: Duration::ZERO,
            notices: Vec::new(),
            ai_inbox: Vec::new(),
            frame_events: Vec::new(),
        })
    }

    /// World driven by the session.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Save slots of the session.
    #[must_use]
    pub fn slots(&self) -> &SaveSlots<S> {
        &self.slots
    }

    /// Events produced by the most recent update.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.frame_events
    }

    /// Discards the current run and starts a fresh one.
    pub fn start_run(&mut self, mode: PlayMode) {
        info!(?mode, "starting run");
        self.mode = mode;
        self.frame_events.clear();
        self.execute(vec![Command::StartRun { mode }]);
    }

    /// Starts the current party over from level one.
    pub fn restart(&mut self) {
        self.start_run(self.mode);
    }

    /// Moves a won run on to the next level.
    pub fn advance_level(&mut self) {
        let status = query::status(&self.world);
        if status.phase != RunPhase::Victory {
            return;
        }
        let config = query::config(&self.world);
        let spawn_plan = self.spawner.plan_level(
            status.level.saturating_add(1),
            config.spawns_per_point,
            &query::spawn_points(&self.world),
        );
        self.execute(vec![Command::AdvanceLevel { spawn_plan }]);
    }

    /// Reports that a player's attack animation finished.
    pub fn finish_attack_animation(&mut self, player: PlayerId) {
        self.execute(vec![Command::FinishAttack { player }]);
    }

    /// Advances the run by `dt`, applying one input per player in index order.
    ///
    /// Returns the events the update produced.
    pub fn update(&mut self, dt: Duration, inputs: &[PlayerInput]) -> &[Event] {
        self.elapsed = self.elapsed.saturating_add(dt);
        let now = self.elapsed;
        self.notices.retain(|notice| notice.expires_at > now);
        self.frame_events.clear();

        self.execute(vec![Command::Tick { dt }]);
        if query::status(&self.world).phase == RunPhase::Defeated {
            return &self.frame_events;
        }

        for (player, input) in query::players(&self.world).iter().zip(inputs) {
            self.resolve_player(player.id, input);
        }
        self.run_ai();
        self.run_spawning();

        let mut commands = Vec::new();
        pickup_scan(
            &query::players(&self.world),
            &query::loot(&self.world),
            &mut commands,
        );
        self.execute(commands);

        let mut commands = Vec::new();
        check_boss_trigger(
            &query::status(&self.world),
            &query::spawn_points(&self.world),
            &query::enemies(&self.world),
            query::config(&self.world).boss_arrival_tile(),
            stats::BOSS_ARRIVAL_DELAY,
            &mut commands,
        );
        self.execute(commands);

        &self.frame_events
    }

    /// Display picture of the run.
    #[must_use]
    pub fn current_state(&self) -> SessionState {
        let status = query::status(&self.world);
        let economy = query::economy(&self.world);
        SessionState {
            status,
            players: query::players(&self.world)
                .into_iter()
                .map(|snapshot| PlayerView {
                    cooldowns: cooldowns(&snapshot, &economy, status.clock),
                    snapshot,
                })
                .collect(),
            enemies: query::enemies(&self.world),
            boss: query::boss(&self.world),
            loot: query::loot(&self.world),
            crates: query::crates(&self.world),
            economy,
            notices: self
                .notices
                .iter()
                .map(|notice| notice.message.clone())
                .collect(),
        }
    }

    /// Saves the run under `name`.
    pub fn save_run(&mut self, name: &str) -> Result<SaveSummary, PersistenceError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX));
        let snapshot = query::run_snapshot(&self.world);
        match self.slots.save(name, timestamp, &snapshot) {
            Ok(summary) => {
                self.notify("Game saved");
                Ok(summary)
            }
            Err(error) => {
                warn!(%error, "save failed");
                self.notify(match &error {
                    PersistenceError::SlotLimit { .. } => "All save slots are full".to_owned(),
                    other => format!("Save failed: {other}"),
                });
                Err(error)
            }
        }
    }

    /// Replaces the run with a saved one.
    ///
    /// Without a name the save last used is loaded, falling back to the
    /// newest. A failed load leaves the run untouched.
    pub fn load_run(&mut self, name: Option<&str>) -> Result<String, PersistenceError> {
        let current = query::run_snapshot(&self.world);
        let boss_tile = query::config(&self.world).boss_arrival_tile();
        match self.slots.load(name, &current, boss_tile) {
            Ok(loaded) => {
                self.mode = loaded.snapshot.mode;
                self.frame_events.clear();
                self.execute(vec![Command::RestoreRun {
                    snapshot: Box::new(loaded.snapshot),
                }]);
                self.notify(format!("Loaded {}", loaded.name));
                Ok(loaded.name)
            }
            Err(error) => {
                warn!(%error, "load failed");
                self.notify(format!("Load failed: {error}"));
                Err(error)
            }
        }
    }

    /// Saves available to load, newest first.
    pub fn list_saves(&self) -> Result<Vec<SaveSummary>, PersistenceError> {
        self.slots.list_saves()
    }

    /// Deletes one save.
    pub fn delete_save(&mut self, name: &str) -> Result<bool, PersistenceError> {
        self.slots.delete(name)
    }

    /// Deletes every save.
    pub fn delete_all_saves(&mut self) -> Result<usize, PersistenceError> {
        self.slots.delete_all()
    }

    fn resolve_player(&mut self, id: PlayerId, input: &PlayerInput) {
        let Some(player) = query::player(&self.world, id).filter(|player| player.alive) else {
            return;
        };

        if input.attack {
            let command = melee_command(
                &player,
                &query::economy(&self.world),
                &query::enemies(&self.world),
                query::boss(&self.world).as_ref(),
                &query::crates(&self.world),
            );
            self.execute(vec![command]);
        }

        for request in input.ability_requests() {
            let Some(player) = query::player(&self.world, id) else {
                return;
            };
            let command = command_for(&player, &query::economy(&self.world), request);
            self.execute(vec![command]);
        }

        if let Some((item, quantity)) = input.purchase {
            self.execute(vec![Command::Purchase { item, quantity }]);
        }

        if let Some(direction) = input.movement {
            self.execute(vec![Command::MovePlayer {
                player: id,
                direction,
            }]);
        }
    }

    fn run_ai(&mut self) {
        let events = std::mem::take(&mut self.ai_inbox);
        let world = &self.world;
        let mut commands = Vec::new();
        self.ai.handle(
            &events,
            &query::status(world),
            &query::players(world),
            &query::enemies(world),
            query::boss(world).as_ref(),
            |tile| query::is_tile_open_for_enemy(world, tile),
            &mut commands,
        );
        self.execute(commands);
    }

    fn run_spawning(&mut self) {
        let world = &self.world;
        let mut commands = Vec::new();
        self.spawner.handle(
            &query::status(world),
            &query::spawn_points(world),
            &query::enemies(world),
            |tile| query::is_tile_open_for_enemy(world, tile),
            &mut commands,
        );
        self.execute(commands);
    }

    /// Applies commands in order, then lets combat react until the run settles.
    fn execute(&mut self, commands: Vec<Command>) {
        let mut pending = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut pending);
        }
        while !pending.is_empty() {
            self.observe(&pending);
            let mut follow_up = Vec::new();
            self.combat.handle(
                &pending,
                &query::economy(&self.world),
                &query::players(&self.world),
                &query::enemies(&self.world),
                query::boss(&self.world).as_ref(),
                query::bounds(&self.world),
                &mut follow_up,
            );
            self.ai_inbox.append(&mut pending);
            for command in follow_up {
                world::apply(&mut self.world, command, &mut pending);
            }
        }
    }

    fn observe(&mut self, events: &[Event]) {
        self.frame_events.extend(events.iter().cloned());
        for event in events {
            match event {
                Event::RunStarted { mode, level } => info!(?mode, level, "run started"),
                Event::RunRestored { level } => info!(level, "run restored"),
                Event::LevelAdvanced { level } => info!(level, "level started"),
                Event::BossIncoming { tile, .. } => {
                    info!(?tile, "boss incoming");
                    self.notify("The boss is coming!");
                }
                Event::BossSpawned { .. } => info!("boss arrived"),
                Event::Victory { level } => {
                    info!(level, "level won");
                    self.notify(format!("Level {level} cleared!"));
                }
                Event::PlayerDefeated { player } => {
                    info!(?player, "run lost");
                    self.notify("You have fallen");
                }
                Event::PurchaseRejected {
                    reason: PurchaseRejection::InsufficientGold,
                    ..
                } => self.notify("Not enough gold"),
                Event::ConsumableRejected {
                    reason: ConsumableRejection::OutOfStock,
                    ..
                } => self.notify("Nothing left to use"),
                _ => {}
            }
        }
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.notices.push(Notice {
            message: message.into(),
            expires_at: self.elapsed.saturating_add(NOTICE_DURATION),
        });
    }
}
