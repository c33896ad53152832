use std::time::Duration;

use skulls_daggers_core::{
    AbilityRejection, AbilitySlot, BuffKind, CharacterKind, Command, Direction, Economy, Event,
    GemColor, ItemKind, PlayMode, PlayerId, PlayerRecord, RunConfig, TileCoord, Upgrades,
};
use skulls_daggers_system_abilities::{command_for, cooldowns, AbilityRequest};
use skulls_daggers_world::{self as world, query, World};

const PLAYER: PlayerId = PlayerId::new(0);

fn arena(character: CharacterKind, health: u32, economy: Economy) -> World {
    let mut world = World::new(RunConfig::default());
    let mut snapshot = query::run_snapshot(&world);
    snapshot.mode = PlayMode::Single(character);
    snapshot.players = vec![PlayerRecord {
        character,
        tile: TileCoord::new(8, 8),
        facing: Direction::South,
        health,
        max_health: character.profile().max_health,
    }];
    snapshot.enemies.clear();
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

fn request(world: &mut World, request: AbilityRequest) -> Vec<Event> {
    let player = query::player(world, PLAYER).expect("player");
    let command = command_for(&player, &query::economy(world), request);
    run(world, command)
}

fn advance(world: &mut World, millis: u64) -> Vec<Event> {
    run(
        world,
        Command::Tick {
            dt: Duration::from_millis(millis),
        },
    )
}

fn with_cooldown_level(level: u32) -> Economy {
    Economy {
        upgrades: Upgrades {
            ability_cooldown: level,
            ..Upgrades::default()
        },
        ..Economy::default()
    }
}

fn rejected(events: &[Event], slot: AbilitySlot) -> Option<AbilityRejection> {
    events.iter().find_map(|event| match event {
        Event::AbilityRejected {
            slot: rejected,
            reason,
            ..
        } if *rejected == slot => Some(*reason),
        _ => None,
    })
}

#[test]
fn cooldown_upgrades_shorten_the_signature() {
    let mut world = arena(CharacterKind::Knight, 120, with_cooldown_level(3));
    let _ = request(&mut world, AbilityRequest::Signature);

    let _ = advance(&mut world, 4_199);
    let early = request(&mut world, AbilityRequest::Signature);
    assert_eq!(rejected(&early, AbilitySlot::Signature), Some(AbilityRejection::OnCooldown));

    let _ = advance(&mut world, 1);
    let ready = request(&mut world, AbilityRequest::Signature);
    assert!(ready
        .iter()
        .any(|event| matches!(event, Event::SignatureActivated { .. })));
}

#[test]
fn cooldown_reduction_bottoms_out_at_thirty_percent() {
    let mut world = arena(CharacterKind::Knight, 120, with_cooldown_level(12));
    let _ = request(&mut world, AbilityRequest::Signature);
    let player = query::player(&world, PLAYER).expect("knight");
    let report = cooldowns(&player, &query::economy(&world), query::clock(&world));
    assert_eq!(report.signature, Duration::from_millis(1_800));
    assert_eq!(report.dash, Duration::ZERO);
}

#[test]
fn dash_cooldown_ignores_upgrades() {
    let mut world = arena(CharacterKind::Fighter, 100, with_cooldown_level(5));
    let _ = request(&mut world, AbilityRequest::Dash);
    let _ = advance(&mut world, 2_000);
    let player = query::player(&world, PLAYER).expect("fighter");
    let report = cooldowns(&player, &query::economy(&world), query::clock(&world));
    assert_eq!(report.dash, Duration::from_secs(10));
    assert!(!report.all_ready());
}

#[test]
fn dash_speed_changes_with_its_phase() {
    let mut world = arena(CharacterKind::Knight, 120, Economy::default());
    let _ = request(&mut world, AbilityRequest::Dash);
    let speed = |world: &World| {
        query::player(world, PLAYER)
            .expect("knight")
            .effective_move_speed()
    };
    assert!((speed(&world) - 4.0).abs() < f32::EPSILON);
    let _ = advance(&mut world, 1_000);
    assert!((speed(&world) - 2.0).abs() < f32::EPSILON);
    let _ = advance(&mut world, 3_000);
    assert!((speed(&world) - 1.0).abs() < f32::EPSILON);
}

#[test]
fn health_potion_never_overheals() {
    let mut economy = Economy::default();
    economy.inventory.add(ItemKind::HealthPotion, 2);
    let mut world = arena(CharacterKind::Warrior, 120, economy);

    let events = request(&mut world, AbilityRequest::Item(ItemKind::HealthPotion));
    assert!(events.contains(&Event::PlayerHealed {
        player: PLAYER,
        amount: 30,
        health: 150,
    }));
    assert_eq!(query::economy(&world).inventory.health_potions, 1);
}

#[test]
fn blue_gem_shields_until_its_timer_runs_out() {
    let mut economy = Economy::default();
    economy.gems.add(GemColor::Blue, 1);
    let mut world = arena(CharacterKind::Warrior, 150, economy);

    let _ = request(&mut world, AbilityRequest::Gem(GemColor::Blue));
    let shielded = |world: &World| {
        query::player(world, PLAYER)
            .expect("warrior")
            .buffs
            .is_active(BuffKind::Shield)
    };
    assert!(shielded(&world));
    let _ = advance(&mut world, 9_999);
    assert!(shielded(&world));
    let events = advance(&mut world, 1);
    assert!(events.contains(&Event::BuffExpired {
        player: PLAYER,
        kind: BuffKind::Shield,
    }));
    assert!(!shielded(&world));
    assert_eq!(query::economy(&world).gems.count(GemColor::Blue), 0);
}

#[test]
fn magic_stays_exclusive_while_active_and_checks_mana() {
    let mut world = arena(CharacterKind::Fighter, 100, Economy::default());
    let _ = request(&mut world, AbilityRequest::Magic);
    let again = request(&mut world, AbilityRequest::Magic);
    assert_eq!(rejected(&again, AbilitySlot::Magic), Some(AbilityRejection::AlreadyActive));

    let _ = advance(&mut world, 12_000);
    let costly = run(
        &mut world,
        Command::ActivateMagic {
            player: PLAYER,
            cooldown: Duration::from_secs(12),
            active_for: Duration::from_secs(6),
            mana_cost: 150.0,
        },
    );
    assert_eq!(
        rejected(&costly, AbilitySlot::Magic),
        Some(AbilityRejection::InsufficientMana)
    );
}

#[test]
fn signature_slowdown_ignores_buffs_when_restoring() {
    let mut economy = Economy::default();
    economy.inventory.add(ItemKind::SpeedPotion, 1);
    let mut world = arena(CharacterKind::Warrior, 150, economy);
    let _ = request(&mut world, AbilityRequest::Item(ItemKind::SpeedPotion));
    let _ = request(&mut world, AbilityRequest::Signature);

    let player = query::player(&world, PLAYER).expect("warrior");
    assert!((player.move_speed - 0.45).abs() < 1e-6);
    assert!((player.effective_move_speed() - 0.675).abs() < 1e-5);

    let _ = advance(&mut world, 1_200);
    let player = query::player(&world, PLAYER).expect("warrior");
    assert!((player.move_speed - 0.9).abs() < f32::EPSILON);
    assert!((player.effective_move_speed() - 1.35).abs() < 1e-5);
}
