use std::time::Duration;

use rand::rngs::mock::StepRng;
use skulls_daggers_core::{
    BuffKind, CharacterKind, Command, ConsumableEffect, Direction, Economy, EnemyKind,
    EnemyRecord, Event, GemColor, ItemKind, LootKind, MeleeTarget, PlayMode, PlayerId,
    PlayerRecord, RunConfig, TileCoord, Upgrades,
};
use skulls_daggers_system_combat::{
    choose_melee_target, melee_command, melee_damage, pickup_scan, CombatResolver,
};
use skulls_daggers_world::{self as world, query, World};

const PLAYER: PlayerId = PlayerId::new(0);

fn arena(
    character: CharacterKind,
    tile: TileCoord,
    facing: Direction,
    enemies: &[(EnemyKind, TileCoord)],
    economy: Economy,
) -> World {
    let mut world = World::new(RunConfig::default());
    let mut snapshot = query::run_snapshot(&world);
    snapshot.mode = PlayMode::Single(character);
    snapshot.players = vec![PlayerRecord {
        character,
        tile,
        facing,
        health: character.profile().max_health,
        max_health: character.profile().max_health,
    }];
    snapshot.enemies = enemies
        .iter()
        .map(|(kind, tile)| EnemyRecord {
            kind: *kind,
            tile: *tile,
            facing: Direction::North,
        })
        .collect();
    snapshot.crates.clear();
    snapshot.economy = economy;
    let _ = run(
        &mut world,
        Command::RestoreRun {
            snapshot: Box::new(snapshot),
        },
    );
    world
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn resolve<R: rand::Rng>(
    world: &mut World,
    resolver: &mut CombatResolver<R>,
    events: Vec<Event>,
) -> Vec<Event> {
    let mut log = events.clone();
    let mut pending = events;
    while !pending.is_empty() {
        let mut commands = Vec::new();
        resolver.handle(
            &pending,
            &query::economy(world),
            &query::players(world),
            &query::enemies(world),
            query::boss(world).as_ref(),
            query::bounds(world),
            &mut commands,
        );
        pending.clear();
        for command in commands {
            world::apply(world, command, &mut pending);
        }
        log.extend(pending.iter().cloned());
    }
    log
}

#[test]
fn upgrades_and_buffs_scale_melee_damage() {
    let mut economy = Economy {
        upgrades: Upgrades {
            damage: 2,
            ..Upgrades::default()
        },
        ..Economy::default()
    };
    economy.inventory.add(ItemKind::DamagePotion, 1);
    let mut world = arena(
        CharacterKind::Knight,
        TileCoord::new(6, 6),
        Direction::South,
        &[(EnemyKind::Skeleton, TileCoord::new(6, 7))],
        economy,
    );
    let knight = query::player(&world, PLAYER).expect("knight");
    assert_eq!(melee_damage(&knight, &query::economy(&world)), 30);

    let _ = run(
        &mut world,
        Command::UseItem {
            player: PLAYER,
            item: ItemKind::DamagePotion,
            effect: ConsumableEffect::Buff {
                kind: BuffKind::Damage,
                multiplier: 1.5,
                duration: Duration::from_secs(10),
            },
        },
    );
    let knight = query::player(&world, PLAYER).expect("knight");
    assert_eq!(melee_damage(&knight, &query::economy(&world)), 45);

    let command = melee_command(
        &knight,
        &query::economy(&world),
        &query::enemies(&world),
        None,
        &query::crates(&world),
    );
    let events = run(&mut world, command);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EnemyDied { .. })));
}

#[test]
fn the_faced_enemy_is_struck_first() {
    let world = arena(
        CharacterKind::Knight,
        TileCoord::new(6, 6),
        Direction::East,
        &[
            (EnemyKind::Slime, TileCoord::new(5, 6)),
            (EnemyKind::Skeleton, TileCoord::new(7, 6)),
        ],
        Economy::default(),
    );
    let faced = query::enemies(&world)[1].id;
    let knight = query::player(&world, PLAYER).expect("knight");
    assert_eq!(
        choose_melee_target(&knight, &query::enemies(&world), None, &[]),
        MeleeTarget::Enemy(faced)
    );
}

#[test]
fn swings_at_nothing_fall_through_to_crates() {
    let mut world = arena(
        CharacterKind::Warrior,
        TileCoord::new(6, 6),
        Direction::South,
        &[],
        Economy::default(),
    );
    let _ = run(
        &mut world,
        Command::PlaceCrate {
            tile: TileCoord::new(7, 7),
        },
    );
    let warrior = query::player(&world, PLAYER).expect("warrior");
    let crates = query::crates(&world);
    assert_eq!(
        choose_melee_target(&warrior, &[], None, &crates),
        MeleeTarget::Crate(crates[0].id)
    );

    let command = melee_command(&warrior, &Economy::default(), &[], None, &crates);
    let events = run(&mut world, command);
    let mut resolver = CombatResolver::with_rng(StepRng::new(0, 0));
    let log = resolve(&mut world, &mut resolver, events);
    assert!(log.contains(&Event::LootDropped {
        loot: query::loot(&world)[0].id,
        tile: TileCoord::new(7, 7),
        kind: LootKind::Gold,
        amount: 25,
    }));
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::LootDropped { kind: LootKind::Gem(GemColor::Blue), .. })));
}

#[test]
fn ground_slam_hits_and_knocks_back_everything_in_range() {
    let mut world = arena(
        CharacterKind::Knight,
        TileCoord::new(10, 10),
        Direction::North,
        &[
            (EnemyKind::Skeleton, TileCoord::new(11, 10)),
            (EnemyKind::Skeleton, TileCoord::new(8, 8)),
            (EnemyKind::Slime, TileCoord::new(13, 10)),
        ],
        Economy::default(),
    );
    let enemies = query::enemies(&world);
    let slam = CharacterKind::Knight.profile().signature.profile();
    let events = run(
        &mut world,
        Command::ActivateSignature {
            player: PLAYER,
            cooldown: slam.cooldown,
            active_for: slam.active_for,
        },
    );
    let mut resolver = CombatResolver::from_seed(9);
    let log = resolve(&mut world, &mut resolver, events);

    assert!(log.contains(&Event::EnemyKnockedBack {
        enemy: enemies[0].id,
        from: TileCoord::new(11, 10),
        to: TileCoord::new(13, 10),
    }));
    assert!(log.contains(&Event::EnemyKnockedBack {
        enemy: enemies[1].id,
        from: TileCoord::new(8, 8),
        to: TileCoord::new(6, 6),
    }));
    let slime = query::enemy(&world, enemies[2].id).expect("slime");
    assert_eq!(slime.health, 20);
    assert!(log
        .iter()
        .filter(|event| matches!(event, Event::EnemyDied { .. }))
        .all(|event| !matches!(event, Event::EnemyDied { enemy, .. } if *enemy == enemies[2].id)));
}

#[test]
fn boss_death_scatters_piles_and_crates() {
    let mut resolver = CombatResolver::with_rng(StepRng::new(0, 0));
    let center = TileCoord::new(16, 17);
    let mut commands = Vec::new();
    resolver.roll_boss_loot(center, &mut commands);

    let piles: Vec<_> = commands
        .iter()
        .filter_map(|command| match command {
            Command::DropLoot { tile, amount, .. } => Some((*tile, *amount)),
            _ => None,
        })
        .collect();
    let crates: Vec<_> = commands
        .iter()
        .filter_map(|command| match command {
            Command::PlaceCrate { tile } => Some(*tile),
            _ => None,
        })
        .collect();
    assert_eq!(piles.len(), 3);
    assert!(piles
        .iter()
        .all(|(tile, amount)| center.within_reach(*tile, 1) && *amount == 50));
    assert_eq!(crates.len(), 3);
    assert!(crates.iter().all(|tile| {
        let distance = center.chebyshev_distance(*tile);
        (2..=3).contains(&distance)
    }));
}

#[test]
fn failed_trials_drop_nothing() {
    let mut resolver = CombatResolver::with_rng(StepRng::new(u64::MAX, 0));
    let mut commands = Vec::new();
    resolver.roll_enemy_loot(TileCoord::new(3, 3), &mut commands);
    assert!(commands.is_empty());
}

#[test]
fn gold_and_gem_trials_are_independent() {
    let mut resolver = CombatResolver::from_seed(0xC0FFEE);
    let trials = 20_000;
    let (mut both, mut neither, mut gold_only, mut gem_only) = (0u32, 0u32, 0u32, 0u32);
    for _ in 0..trials {
        let mut commands = Vec::new();
        resolver.roll_enemy_loot(TileCoord::new(3, 3), &mut commands);
        let gold = commands.iter().any(|command| {
            matches!(command, Command::DropLoot { kind: LootKind::Gold, amount, .. } if (5..=30).contains(amount))
        });
        let gem = commands
            .iter()
            .any(|command| matches!(command, Command::DropLoot { kind: LootKind::Gem(_), .. }));
        match (gold, gem) {
            (true, true) => both += 1,
            (false, false) => neither += 1,
            (true, false) => gold_only += 1,
            (false, true) => gem_only += 1,
        }
    }
    let share = |count: u32| f64::from(count) / f64::from(trials);
    assert!((share(both) - 0.64).abs() < 0.02, "both {}", share(both));
    assert!((share(neither) - 0.04).abs() < 0.01, "neither {}", share(neither));
    assert!(
        (share(gold_only + gem_only) - 0.32).abs() < 0.02,
        "exactly one {}",
        share(gold_only + gem_only)
    );
}

#[test]
fn pickup_scan_collects_only_under_living_players() {
    let tile = TileCoord::new(6, 6);
    let mut world = arena(CharacterKind::Fighter, tile, Direction::South, &[], Economy::default());
    let _ = run(
        &mut world,
        Command::DropLoot {
            tile,
            kind: LootKind::Gold,
            amount: 12,
        },
    );
    let _ = run(
        &mut world,
        Command::DropLoot {
            tile: TileCoord::new(7, 6),
            kind: LootKind::Gem(GemColor::Red),
            amount: 1,
        },
    );

    let mut commands = Vec::new();
    pickup_scan(&query::players(&world), &query::loot(&world), &mut commands);
    assert_eq!(commands.len(), 1);
    for command in commands {
        let _ = run(&mut world, command);
    }
    assert_eq!(query::economy(&world).gold, 12);
    assert_eq!(query::economy(&world).gems.count(GemColor::Red), 0);
    assert_eq!(query::loot(&world).len(), 1);
}
