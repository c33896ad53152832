use std::time::Duration;

use skulls_daggers_core::{
    stats, AbilityRejection, AbilitySlot, AreaHit, AttackRejection, BuffKind, CharacterKind,
    Command, ConsumableEffect, Direction, Economy, EnemyId, EnemyKind, EnemyRecord, Event,
    GemColor, ItemKind, LootKind, MagicEffect, MeleeTarget, MoveRejection, PlayMode, PlayerId,
    PlayerRecord, PurchaseRejection, RunConfig, RunPhase, ShopItem, SpawnPointPlan, TileCoord,
    UpgradeKind,
};
use skulls_daggers_world::{apply, query, World};

const PLAYER: PlayerId = PlayerId::new(0);

fn world_with(players: &[(CharacterKind, TileCoord)], enemies: &[(EnemyKind, TileCoord)]) -> World {
    world_with_economy(players, enemies, Economy::default())
}

fn world_with_economy(
    players: &[(CharacterKind, TileCoord)],
    enemies: &[(EnemyKind, TileCoord)],
    economy: Economy,
) -> World {
    let mut world = World::new(RunConfig::default());
    let mut snapshot = query::run_snapshot(&world);
    snapshot.mode = match players {
        [(first, _)] => PlayMode::Single(*first),
        [(first, _), (second, _)] => PlayMode::Coop(*first, *second),
        _ => panic!("one or two players expected"),
    };
    snapshot.players = players
        .iter()
        .map(|(character, tile)| PlayerRecord {
            character: *character,
            tile: *tile,
            facing: Direction::South,
            health: character.profile().max_health,
            max_health: character.profile().max_health,
        })
        .collect();
    snapshot.enemies = enemies
        .iter()
        .map(|(kind, tile)| EnemyRecord {
            kind: *kind,
            tile: *tile,
            facing: Direction::North,
        })
        .collect();
    snapshot.economy = economy;
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::RestoreRun {
            snapshot: Box::new(snapshot),
        },
        &mut events,
    );
    world
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, command, &mut events);
    events
}

fn tick(world: &mut World, millis: u64) -> Vec<Event> {
    run(
        world,
        Command::Tick {
            dt: Duration::from_millis(millis),
        },
    )
}

fn first_enemy(world: &World) -> EnemyId {
    query::enemies(world)
        .first()
        .map(|enemy| enemy.id)
        .expect("an enemy")
}

fn knight_swing(target: MeleeTarget, damage: u32) -> Command {
    Command::MeleeAttack {
        player: PLAYER,
        target,
        damage,
        consume_rage: false,
        interval: CharacterKind::Knight.profile().attack_interval(),
    }
}

#[test]
fn melee_requires_chebyshev_adjacency() {
    let mut near = world_with(
        &[(CharacterKind::Knight, TileCoord::new(6, 6))],
        &[(EnemyKind::Skeleton, TileCoord::new(5, 5))],
    );
    let skeleton = first_enemy(&near);
    let events = run(&mut near, knight_swing(MeleeTarget::Enemy(skeleton), 20));
    assert!(events.contains(&Event::EnemyDamaged {
        enemy: skeleton,
        damage: 20,
        health: 10,
    }));

    let mut far = world_with(
        &[(CharacterKind::Knight, TileCoord::new(7, 7))],
        &[(EnemyKind::Skeleton, TileCoord::new(5, 5))],
    );
    let skeleton = first_enemy(&far);
    let events = run(&mut far, knight_swing(MeleeTarget::Enemy(skeleton), 20));
    assert_eq!(
        events,
        vec![Event::AttackRejected {
            player: PLAYER,
            reason: AttackRejection::OutOfReach,
        }]
    );
}

#[test]
fn attack_blocks_movement_until_finished() {
    let mut world = world_with(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[]);
    let _ = run(&mut world, knight_swing(MeleeTarget::Nothing, 20));

    let events = run(
        &mut world,
        Command::MovePlayer {
            player: PLAYER,
            direction: Direction::North,
        },
    );
    assert_eq!(
        events,
        vec![Event::MoveRejected {
            player: PLAYER,
            reason: MoveRejection::Attacking,
        }]
    );

    let finished = run(&mut world, Command::FinishAttack { player: PLAYER });
    assert_eq!(finished, vec![Event::AttackFinished { player: PLAYER }]);

    let fallback = tick(&mut world, 400);
    assert!(!fallback
        .iter()
        .any(|event| matches!(event, Event::AttackFinished { .. })));

    let events = run(
        &mut world,
        Command::MovePlayer {
            player: PLAYER,
            direction: Direction::North,
        },
    );
    assert!(events.contains(&Event::PlayerMoved {
        player: PLAYER,
        from: TileCoord::new(6, 6),
        to: TileCoord::new(6, 5),
        facing: Direction::North,
    }));
}

#[test]
fn fallback_timer_ends_attack_exactly_once() {
    let mut world = world_with(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[]);
    let _ = run(&mut world, knight_swing(MeleeTarget::Nothing, 20));

    let events = tick(&mut world, 400);
    assert!(events.contains(&Event::AttackFinished { player: PLAYER }));
    assert!(run(&mut world, Command::FinishAttack { player: PLAYER }).is_empty());
}

#[test]
fn ward_shield_absorbs_one_hit() {
    let mut world = world_with(
        &[(CharacterKind::Knight, TileCoord::new(6, 6))],
        &[(EnemyKind::Skeleton, TileCoord::new(5, 5))],
    );
    let skeleton = first_enemy(&world);
    let ward = MagicEffect::Ward.profile();
    let events = run(
        &mut world,
        Command::ActivateMagic {
            player: PLAYER,
            cooldown: ward.cooldown,
            active_for: ward.active_for,
            mana_cost: ward.mana_cost,
        },
    );
    assert!(events.contains(&Event::MagicActivated {
        player: PLAYER,
        effect: MagicEffect::Ward,
    }));

    let events = run(
        &mut world,
        Command::EnemyAttack {
            enemy: skeleton,
            player: PLAYER,
        },
    );
    assert_eq!(events, vec![Event::ShieldConsumed { player: PLAYER }]);
    let knight = query::player(&world, PLAYER).expect("knight");
    assert_eq!(knight.health, 120);
    assert!(!knight.buffs.is_active(BuffKind::Shield));

    let _ = tick(&mut world, 2_000);
    let events = run(
        &mut world,
        Command::EnemyAttack {
            enemy: skeleton,
            player: PLAYER,
        },
    );
    assert_eq!(
        events,
        vec![Event::PlayerDamaged {
            player: PLAYER,
            damage: 10,
            health: 110,
        }]
    );

    let expiry = tick(&mut world, 3_000);
    assert!(expiry.contains(&Event::MagicExpired {
        player: PLAYER,
        effect: MagicEffect::Ward,
    }));
    assert!(!expiry
        .iter()
        .any(|event| matches!(event, Event::BuffExpired { .. })));
}

#[test]
fn aura_halves_incoming_damage() {
    let mut world = world_with(
        &[(CharacterKind::Warrior, TileCoord::new(6, 6))],
        &[(EnemyKind::Slime, TileCoord::new(6, 7))],
    );
    let slime = first_enemy(&world);
    let aura = MagicEffect::Aura.profile();
    let _ = run(
        &mut world,
        Command::ActivateMagic {
            player: PLAYER,
            cooldown: aura.cooldown,
            active_for: aura.active_for,
            mana_cost: aura.mana_cost,
        },
    );
    let events = run(
        &mut world,
        Command::EnemyAttack {
            enemy: slime,
            player: PLAYER,
        },
    );
    assert_eq!(
        events,
        vec![Event::PlayerDamaged {
            player: PLAYER,
            damage: 3,
            health: 147,
        }]
    );
}

#[test]
fn purchase_spends_exactly_the_price_or_nothing() {
    let rich = Economy {
        gold: 100,
        ..Economy::default()
    };
    let potion = ShopItem::Item(ItemKind::DamagePotion);

    let mut world = world_with_economy(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[], rich);
    let events = run(
        &mut world,
        Command::Purchase {
            item: potion,
            quantity: 1,
        },
    );
    assert_eq!(
        events,
        vec![Event::PurchaseCompleted {
            item: potion,
            quantity: 1,
            cost: 60,
            gold: 40,
        }]
    );
    assert_eq!(query::economy(&world).inventory.damage_potions, 1);

    let mut world = world_with_economy(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[], rich);
    let events = run(
        &mut world,
        Command::Purchase {
            item: potion,
            quantity: 2,
        },
    );
    assert_eq!(
        events,
        vec![Event::PurchaseRejected {
            item: potion,
            quantity: 2,
            reason: PurchaseRejection::InsufficientGold,
        }]
    );
    assert_eq!(query::economy(&world).gold, 100);

    let events = run(
        &mut world,
        Command::Purchase {
            item: potion,
            quantity: 0,
        },
    );
    assert_eq!(
        events,
        vec![Event::PurchaseCompleted {
            item: potion,
            quantity: 0,
            cost: 0,
            gold: 100,
        }]
    );
    assert_eq!(query::economy(&world), rich);
}

#[test]
fn health_upgrade_raises_both_coop_players() {
    let economy = Economy {
        gold: 250,
        ..Economy::default()
    };
    let mut world = world_with_economy(
        &[
            (CharacterKind::Knight, TileCoord::new(6, 6)),
            (CharacterKind::Fighter, TileCoord::new(8, 8)),
        ],
        &[],
        economy,
    );
    let _ = run(
        &mut world,
        Command::Purchase {
            item: ShopItem::Upgrade(UpgradeKind::Health),
            quantity: 2,
        },
    );
    let players = query::players(&world);
    assert_eq!(players[0].max_health, 160);
    assert_eq!(players[0].health, 160);
    assert_eq!(players[1].max_health, 140);
    assert_eq!(query::economy(&world).upgrades.health, 2);
    assert_eq!(query::economy(&world).gold, 50);
}

#[test]
fn dash_runs_burst_then_sustain_then_cooldown() {
    let mut world = world_with(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[]);
    let events = run(&mut world, Command::ActivateDash { player: PLAYER });
    assert_eq!(events, vec![Event::DashStarted { player: PLAYER }]);

    assert!(tick(&mut world, 1_000).contains(&Event::DashSustained { player: PLAYER }));
    assert!(tick(&mut world, 3_000).contains(&Event::DashEnded { player: PLAYER }));

    let events = run(&mut world, Command::ActivateDash { player: PLAYER });
    assert_eq!(
        events,
        vec![Event::AbilityRejected {
            player: PLAYER,
            slot: AbilitySlot::Dash,
            reason: AbilityRejection::OnCooldown,
        }]
    );

    let _ = tick(&mut world, 8_000);
    let events = run(&mut world, Command::ActivateDash { player: PLAYER });
    assert_eq!(events, vec![Event::DashStarted { player: PLAYER }]);
}

#[test]
fn reapplied_buff_overwrites_end_time() {
    let mut economy = Economy::default();
    economy.inventory.add(ItemKind::SpeedPotion, 1);
    economy.gems.add(GemColor::Green, 1);
    let mut world = world_with_economy(
        &[(CharacterKind::Knight, TileCoord::new(6, 6))],
        &[],
        economy,
    );

    let _ = run(
        &mut world,
        Command::UseItem {
            player: PLAYER,
            item: ItemKind::SpeedPotion,
            effect: ConsumableEffect::Buff {
                kind: BuffKind::Speed,
                multiplier: 1.5,
                duration: Duration::from_secs(10),
            },
        },
    );
    let _ = tick(&mut world, 5_000);
    let _ = run(
        &mut world,
        Command::ConsumeGem {
            player: PLAYER,
            color: GemColor::Green,
            effect: ConsumableEffect::Buff {
                kind: BuffKind::Speed,
                multiplier: 1.25,
                duration: Duration::from_secs(8),
            },
        },
    );

    let at_ten = tick(&mut world, 5_000);
    assert!(!at_ten
        .iter()
        .any(|event| matches!(event, Event::BuffExpired { .. })));
    let buff = query::player(&world, PLAYER)
        .and_then(|player| player.buffs.get(BuffKind::Speed))
        .expect("speed buff");
    assert_eq!(buff.ends_at, Duration::from_secs(13));

    let at_thirteen = tick(&mut world, 3_000);
    assert!(at_thirteen.contains(&Event::BuffExpired {
        player: PLAYER,
        kind: BuffKind::Speed,
    }));
}

#[test]
fn empty_stash_rejects_consumables() {
    let mut world = world_with(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[]);
    let events = run(
        &mut world,
        Command::UseItem {
            player: PLAYER,
            item: ItemKind::HealthPotion,
            effect: ConsumableEffect::Heal(50),
        },
    );
    assert!(matches!(
        events.as_slice(),
        [Event::ConsumableRejected { .. }]
    ));
}

#[test]
fn signature_end_restores_table_move_speed() {
    let mut world = world_with(&[(CharacterKind::Fighter, TileCoord::new(6, 6))], &[]);
    let whirlwind = CharacterKind::Fighter.profile().signature.profile();
    let _ = run(
        &mut world,
        Command::ActivateSignature {
            player: PLAYER,
            cooldown: whirlwind.cooldown,
            active_for: whirlwind.active_for,
        },
    );
    let slowed = query::player(&world, PLAYER).expect("fighter").move_speed;
    assert!((slowed - 0.6).abs() < 1e-6);

    let events = tick(&mut world, 800);
    assert!(events.contains(&Event::SignatureEnded { player: PLAYER }));
    let restored = query::player(&world, PLAYER).expect("fighter").move_speed;
    assert!((restored - 1.2).abs() < f32::EPSILON);
}

#[test]
fn enemies_never_exceed_the_tile_stack_limit() {
    let crowded = TileCoord::new(10, 10);
    let mut world = world_with(
        &[(CharacterKind::Knight, TileCoord::new(20, 20))],
        &[
            (EnemyKind::Skeleton, crowded),
            (EnemyKind::Skeleton, crowded),
            (EnemyKind::Slime, crowded),
            (EnemyKind::Slime, TileCoord::new(11, 10)),
        ],
    );
    let latecomer = query::enemies(&world)
        .into_iter()
        .find(|enemy| enemy.tile == TileCoord::new(11, 10))
        .map(|enemy| enemy.id)
        .expect("latecomer");

    let events = run(
        &mut world,
        Command::MoveEnemy {
            enemy: latecomer,
            to: crowded,
        },
    );
    assert!(events.is_empty());
    assert_eq!(query::count_enemies_on_tile(&world, crowded), 3);
    assert!(!query::is_tile_open_for_enemy(&world, TileCoord::new(20, 20)));
}

#[test]
fn corpses_leave_occupancy_before_the_registry() {
    let mut world = world_with(
        &[(CharacterKind::Warrior, TileCoord::new(6, 6))],
        &[(EnemyKind::Slime, TileCoord::new(5, 6))],
    );
    let slime = first_enemy(&world);
    let events = run(
        &mut world,
        Command::MeleeAttack {
            player: PLAYER,
            target: MeleeTarget::Enemy(slime),
            damage: 25,
            consume_rage: false,
            interval: CharacterKind::Warrior.profile().attack_interval(),
        },
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EnemyDied { enemy, .. } if *enemy == slime)));
    assert_eq!(query::count_enemies_on_tile(&world, TileCoord::new(5, 6)), 0);
    assert_eq!(query::alive_count(&world, EnemyKind::Slime), 0);
    assert_eq!(query::enemies(&world).len(), 1);

    assert!(tick(&mut world, 799).iter().all(|event| !matches!(event, Event::EnemyRemoved { .. })));
    assert!(tick(&mut world, 1).contains(&Event::EnemyRemoved { enemy: slime }));
    assert!(query::enemies(&world).is_empty());
}

#[test]
fn rage_doubles_one_strike_and_is_spent() {
    let mut world = world_with(
        &[(CharacterKind::Fighter, TileCoord::new(6, 6))],
        &[(EnemyKind::Skeleton, TileCoord::new(7, 6))],
    );
    let skeleton = first_enemy(&world);
    let rage = MagicEffect::Rage.profile();
    let _ = run(
        &mut world,
        Command::ActivateMagic {
            player: PLAYER,
            cooldown: rage.cooldown,
            active_for: rage.active_for,
            mana_cost: rage.mana_cost,
        },
    );
    let fighter = query::player(&world, PLAYER).expect("fighter");
    assert!(fighter.rage_armed);
    assert_eq!(fighter.mana, Some(60.0));

    let events = run(
        &mut world,
        Command::MeleeAttack {
            player: PLAYER,
            target: MeleeTarget::Enemy(skeleton),
            damage: 30,
            consume_rage: true,
            interval: CharacterKind::Fighter.profile().attack_interval(),
        },
    );
    assert!(events.contains(&Event::RageConsumed { player: PLAYER }));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EnemyDied { .. })));
    assert!(!query::player(&world, PLAYER).expect("fighter").rage_armed);
}

#[test]
fn boss_is_announced_once_and_its_death_wins_the_level() {
    let mut world = World::new(RunConfig::default());
    let mut snapshot = query::run_snapshot(&world);
    for point in &mut snapshot.spawn_points {
        point.spawned = point.max;
        point.active = false;
    }
    let _ = run(
        &mut world,
        Command::RestoreRun {
            snapshot: Box::new(snapshot),
        },
    );

    let announce = Command::AnnounceBoss {
        tile: query::config(&world).boss_arrival_tile(),
        arrival_delay: stats::BOSS_ARRIVAL_DELAY,
    };
    let first = run(&mut world, announce.clone());
    let second = run(&mut world, announce);
    assert_eq!(
        first
            .iter()
            .filter(|event| matches!(event, Event::BossIncoming { .. }))
            .count(),
        1
    );
    assert!(second.is_empty());
    assert_eq!(query::status(&world).phase, RunPhase::BossIncoming);

    let arrival = tick(&mut world, 3_000);
    assert!(arrival
        .iter()
        .any(|event| matches!(event, Event::BossSpawned { health: 500, .. })));
    assert_eq!(query::status(&world).phase, RunPhase::BossFight);

    let events = run(
        &mut world,
        Command::AreaStrike {
            player: PLAYER,
            hits: Vec::<AreaHit>::new(),
            boss_damage: Some(500),
        },
    );
    assert!(events.contains(&Event::Victory { level: 1 }));
    assert_eq!(query::status(&world).phase, RunPhase::Victory);

    let events = run(&mut world, Command::AdvanceLevel { spawn_plan: Vec::new() });
    assert_eq!(events, vec![Event::LevelAdvanced { level: 2 }]);
    assert!(query::spawn_points(&world)
        .iter()
        .all(|point| point.active && point.max == 7 && point.spawned == 0));
    assert!(query::boss(&world).is_none());
}

#[test]
fn loot_is_collected_once_into_the_shared_stash() {
    let tile = TileCoord::new(6, 6);
    let mut world = world_with(&[(CharacterKind::Knight, tile)], &[]);
    let events = run(
        &mut world,
        Command::DropLoot {
            tile,
            kind: LootKind::Gold,
            amount: 25,
        },
    );
    let Some(Event::LootDropped { loot, .. }) = events.first().cloned() else {
        panic!("loot drop expected");
    };

    let collect = Command::CollectLoot {
        player: PLAYER,
        loot,
    };
    assert_eq!(run(&mut world, collect.clone()).len(), 1);
    assert!(run(&mut world, collect).is_empty());
    assert_eq!(query::economy(&world).gold, 25);
}

#[test]
fn loot_overflow_evicts_the_oldest_drop() {
    let mut world = world_with(&[(CharacterKind::Knight, TileCoord::new(6, 6))], &[]);
    let mut evicted = 0;
    for _ in 0..=stats::LOOT_CAP {
        evicted += run(
            &mut world,
            Command::DropLoot {
                tile: TileCoord::new(1, 1),
                kind: LootKind::Gold,
                amount: 5,
            },
        )
        .iter()
        .filter(|event| matches!(event, Event::LootEvicted { .. }))
        .count();
    }
    assert_eq!(evicted, 1);
    assert_eq!(query::loot(&world).len(), stats::LOOT_CAP);
}

#[test]
fn a_fallen_player_ends_the_run() {
    let mut world = world_with(
        &[(CharacterKind::Knight, TileCoord::new(6, 6))],
        &[(EnemyKind::Skeleton, TileCoord::new(6, 5))],
    );
    let mut snapshot = query::run_snapshot(&world);
    snapshot.players[0].health = 5;
    let _ = run(
        &mut world,
        Command::RestoreRun {
            snapshot: Box::new(snapshot),
        },
    );
    let skeleton = first_enemy(&world);
    let events = run(
        &mut world,
        Command::EnemyAttack {
            enemy: skeleton,
            player: PLAYER,
        },
    );
    assert!(events.contains(&Event::PlayerDamaged {
        player: PLAYER,
        damage: 10,
        health: 0,
    }));
    assert!(events.contains(&Event::PlayerDefeated { player: PLAYER }));
    assert_eq!(query::status(&world).phase, RunPhase::Defeated);
}

#[test]
fn restoring_a_later_level_keeps_its_spawn_intervals() {
    let mut world = World::new(RunConfig::default());
    let mut snapshot = query::run_snapshot(&world);
    snapshot.phase = RunPhase::Victory;
    snapshot.victory_announced = true;
    let _ = run(
        &mut world,
        Command::RestoreRun {
            snapshot: Box::new(snapshot),
        },
    );
    let interval = Duration::from_millis(4_900);
    let spawn_plan = query::spawn_points(&world)
        .iter()
        .map(|point| SpawnPointPlan {
            spawn_point: point.id,
            max: 7,
            interval,
        })
        .collect();
    let _ = run(&mut world, Command::AdvanceLevel { spawn_plan });

    let saved = query::run_snapshot(&world);
    let mut resumed = World::new(RunConfig::default());
    let _ = run(
        &mut resumed,
        Command::RestoreRun {
            snapshot: Box::new(saved.clone()),
        },
    );
    assert_eq!(query::status(&resumed).level, 2);
    assert!(query::spawn_points(&resumed)
        .iter()
        .all(|point| point.interval == interval && point.max == 7));

    let mut legacy = saved;
    for point in &mut legacy.spawn_points {
        point.interval = None;
    }
    let _ = run(
        &mut resumed,
        Command::RestoreRun {
            snapshot: Box::new(legacy),
        },
    );
    assert!(query::spawn_points(&resumed)
        .iter()
        .all(|point| point.interval == point.kind.profile().spawn_interval));
}

#[test]
fn the_boss_never_lands_on_a_player() {
    let landing = RunConfig::default().boss_arrival_tile();
    let mut world = world_with(&[(CharacterKind::Knight, landing)], &[]);
    let mut snapshot = query::run_snapshot(&world);
    for point in &mut snapshot.spawn_points {
        point.spawned = point.max;
        point.active = false;
    }
    let _ = run(
        &mut world,
        Command::RestoreRun {
            snapshot: Box::new(snapshot),
        },
    );
    let _ = run(
        &mut world,
        Command::AnnounceBoss {
            tile: landing,
            arrival_delay: stats::BOSS_ARRIVAL_DELAY,
        },
    );
    let events = tick(&mut world, 3_000);
    let Some(Event::BossSpawned { tile, .. }) = events
        .iter()
        .find(|event| matches!(event, Event::BossSpawned { .. }))
        .cloned()
    else {
        panic!("boss arrival expected");
    };
    assert_ne!(tile, landing);
    assert_eq!(tile.chebyshev_distance(landing), 1);
    assert_eq!(query::boss(&world).expect("boss").tile, tile);
}
