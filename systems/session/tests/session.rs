use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use skulls_daggers_core::{
    BossRecord, CharacterKind, Direction, EnemyKind, EnemyRecord, Event, ItemKind, PlayMode,
    PlayerId, RunConfig, RunPhase, RunSnapshot, ShopItem, TileCoord,
};
use skulls_daggers_persistence::{MemoryStorage, PersistenceError, SaveSlots};
use skulls_daggers_session::{PlayerInput, Session};
use skulls_daggers_world::{query, World};

const FRAME: Duration = Duration::from_millis(50);

fn base_run() -> RunSnapshot {
    query::run_snapshot(&World::new(RunConfig::default()))
}

fn retire_spawn_points(run: &mut RunSnapshot) {
    for point in &mut run.spawn_points {
        point.spawned = point.max;
        point.active = false;
    }
}

fn session_from(run: RunSnapshot) -> Session<MemoryStorage> {
    let mut slots = SaveSlots::new(MemoryStorage::new());
    let _ = slots.save("fixture", 1, &run).expect("save fixture");
    let mut session =
        Session::new(RunConfig::default(), slots.into_storage()).expect("default config");
    let _ = session.load_run(Some("fixture")).expect("load fixture");
    session
}

fn fresh_session() -> Session<MemoryStorage> {
    Session::new(RunConfig::default(), MemoryStorage::new()).expect("default config")
}

fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

#[test]
fn a_fallen_player_freezes_the_run_until_restart() {
    let mut run = base_run();
    retire_spawn_points(&mut run);
    run.players[0].tile = TileCoord::new(5, 5);
    run.players[0].health = 5;
    run.enemies = vec![EnemyRecord {
        kind: EnemyKind::Skeleton,
        tile: TileCoord::new(6, 5),
        facing: Direction::West,
    }];
    let mut session = session_from(run);

    let events = session.update(FRAME, &[]).to_vec();
    assert!(events.contains(&Event::PlayerDefeated {
        player: PlayerId::new(0),
    }));
    assert_eq!(query::status(session.world()).phase, RunPhase::Defeated);

    let enemies = query::enemies(session.world());
    let step = PlayerInput {
        movement: Some(Direction::North),
        attack: true,
        ..PlayerInput::default()
    };
    let frozen = session.update(Duration::from_secs(5), &[step]).to_vec();
    assert!(frozen.iter().all(|event| !matches!(
        event,
        Event::PlayerMoved { .. }
            | Event::AttackStarted { .. }
            | Event::EnemyMoved { .. }
            | Event::EnemySpawned { .. }
            | Event::BossIncoming { .. }
    )));
    assert_eq!(query::enemies(session.world()), enemies);

    session.restart();
    let status = query::status(session.world());
    assert_eq!(status.phase, RunPhase::Waves);
    let knight = query::player(session.world(), PlayerId::new(0)).expect("knight");
    assert!(knight.alive);
    assert_eq!(knight.health, 120);
}

#[test]
fn cleared_waves_bring_the_boss_exactly_once() {
    let mut run = base_run();
    retire_spawn_points(&mut run);
    run.enemies.clear();
    let mut session = session_from(run);

    let mut log = session.update(FRAME, &[]).to_vec();
    assert!(session
        .current_state()
        .notices
        .iter()
        .any(|notice| notice == "The boss is coming!"));
    for _ in 0..79 {
        log.extend(session.update(FRAME, &[]).iter().cloned());
    }
    assert_eq!(count(&log, |event| matches!(event, Event::BossIncoming { .. })), 1);
    assert_eq!(count(&log, |event| matches!(event, Event::BossSpawned { .. })), 1);
    assert_eq!(query::status(session.world()).phase, RunPhase::BossFight);
}

#[test]
fn killing_the_boss_wins_and_the_next_level_rearms_spawns() {
    let mut run = base_run();
    retire_spawn_points(&mut run);
    run.enemies.clear();
    run.players[0].tile = TileCoord::new(5, 5);
    run.players[0].facing = Direction::East;
    run.boss = Some(BossRecord {
        tile: TileCoord::new(6, 5),
        health: 1,
    });
    let mut session = session_from(run);
    assert_eq!(query::status(session.world()).phase, RunPhase::BossFight);

    let swing = PlayerInput {
        attack: true,
        ..PlayerInput::default()
    };
    let events = session.update(FRAME, &[swing]).to_vec();
    assert!(events.contains(&Event::Victory { level: 1 }));
    assert!(count(&events, |event| matches!(event, Event::CratePlaced { .. })) >= 3);

    session.advance_level();
    let status = query::status(session.world());
    assert_eq!(status.level, 2);
    assert_eq!(status.phase, RunPhase::Waves);
    assert!(query::spawn_points(session.world())
        .iter()
        .all(|point| point.active && point.max == 7 && point.spawned == 0));
}

#[test]
fn notices_fade_after_two_seconds() {
    let mut session = fresh_session();
    let buy = PlayerInput {
        purchase: Some((ShopItem::Item(ItemKind::HealthPotion), 1)),
        ..PlayerInput::default()
    };
    let _ = session.update(Duration::from_millis(16), &[buy]);
    let shown = |session: &Session<MemoryStorage>| {
        session
            .current_state()
            .notices
            .iter()
            .any(|notice| notice == "Not enough gold")
    };
    assert!(shown(&session));

    let _ = session.update(Duration::from_millis(1_984), &[]);
    assert!(shown(&session));
    let _ = session.update(Duration::from_millis(16), &[]);
    assert!(!shown(&session));
}

#[test]
fn a_failed_load_keeps_the_current_run() {
    let mut session = fresh_session();
    session.start_run(PlayMode::Coop(CharacterKind::Fighter, CharacterKind::Warrior));
    let _ = session.update(FRAME, &[]);
    let before = query::run_snapshot(session.world());

    let error = session.load_run(Some("missing")).expect_err("no such save");
    assert!(matches!(error, PersistenceError::NotFound { .. }));
    assert_eq!(query::run_snapshot(session.world()), before);
    assert!(session
        .current_state()
        .notices
        .iter()
        .any(|notice| notice.starts_with("Load failed")));
}

#[test]
fn the_slot_cap_surfaces_as_a_notice() {
    let mut session = fresh_session();
    for name in ["a", "b", "c"] {
        let _ = session.save_run(name).expect("free slot");
    }
    let error = session.save_run("d").expect_err("slot cap");
    assert!(matches!(error, PersistenceError::SlotLimit { .. }));
    assert!(session
        .current_state()
        .notices
        .contains(&"All save slots are full".to_owned()));
    assert_eq!(session.list_saves().expect("list").len(), 3);
}

#[test]
fn loading_the_last_save_rewinds_the_party() {
    let mut session = fresh_session();
    session.start_run(PlayMode::Coop(CharacterKind::Fighter, CharacterKind::Warrior));
    let east = PlayerInput {
        movement: Some(Direction::East),
        ..PlayerInput::default()
    };
    for _ in 0..3 {
        let _ = session.update(Duration::from_millis(200), &[east, east]);
    }
    let _ = session.save_run("midway").expect("save");
    let saved = query::run_snapshot(session.world());

    for _ in 0..3 {
        let _ = session.update(Duration::from_millis(200), &[east, east]);
    }
    let name = session.load_run(None).expect("load");
    assert_eq!(name, "midway");
    let restored = query::run_snapshot(session.world());
    assert_eq!(restored.mode, saved.mode);
    assert_eq!(restored.players, saved.players);
    assert_eq!(restored.economy, saved.economy);
}

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay();
    let second = replay();
    assert_eq!(first, second, "replay diverged between runs");
    assert!(first.spawned > 0, "the scripted run never met an enemy");
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    fingerprint: u64,
    spawned: usize,
}

fn replay() -> ReplayOutcome {
    let config = RunConfig {
        seed: 42,
        ..RunConfig::default()
    };
    let mut session = Session::new(config, MemoryStorage::new()).expect("config");
    session.start_run(PlayMode::Single(CharacterKind::Warrior));

    let mut hasher = DefaultHasher::new();
    let mut spawned = 0;
    for frame in 0..1_200 {
        let events = session.update(FRAME, &[scripted_input(frame)]);
        spawned += count(events, |event| matches!(event, Event::EnemySpawned { .. }));
        for event in events {
            format!("{event:?}").hash(&mut hasher);
        }
        if query::status(session.world()).phase == RunPhase::Defeated {
            break;
        }
    }
    format!("{:?}", query::run_snapshot(session.world())).hash(&mut hasher);
    ReplayOutcome {
        fingerprint: hasher.finish(),
        spawned,
    }
}

fn scripted_input(frame: usize) -> PlayerInput {
    const ROUTE: [Direction; 4] = [
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::North,
    ];
    PlayerInput {
        attack: true,
        signature: frame % 100 == 0,
        magic: frame % 250 == 0,
        dash: frame == 50,
        movement: Some(ROUTE[(frame / 20) % ROUTE.len()]),
        ..PlayerInput::default()
    }
}
