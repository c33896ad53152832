//! Scripted players used to soak-test a run without a human at the keyboard.

use skulls_daggers_core::{
    stats, Direction, ItemKind, PlayerSnapshot, ShopItem, TileCoord, UpgradeKind,
};
use skulls_daggers_session::{PlayerInput, PlayerView, SessionState};

/// Health fraction below which the autopilot drinks a potion.
const LOW_HEALTH: f32 = 0.4;
/// Reach at which area abilities are worth firing.
const SIGNATURE_RANGE: u32 = 2;

/// Chooses one input per player for the next update.
pub(crate) fn plan(state: &SessionState) -> Vec<PlayerInput> {
    state
        .players
        .iter()
        .enumerate()
        .map(|(index, view)| plan_player(state, view, index == 0))
        .collect()
}

fn plan_player(state: &SessionState, view: &PlayerView, shopper: bool) -> PlayerInput {
    let player = &view.snapshot;
    let mut input = PlayerInput::default();
    if !player.alive {
        return input;
    }

    let threat = nearest_threat(state, player.tile);
    let low = (player.health as f32) < player.max_health as f32 * LOW_HEALTH;
    if low && state.economy.inventory.count(ItemKind::HealthPotion) > 0 {
        input.item = Some(ItemKind::HealthPotion);
    }
    if shopper {
        input.purchase = shopping(state);
    }

    match threat {
        Some(tile) if player.tile.within_reach(tile, stats::MELEE_REACH) => {
            input.attack = true;
            input.signature = view.cooldowns.signature.is_zero();
            input.magic = view.cooldowns.magic.is_zero() && !player.rage_armed;
        }
        Some(tile) => {
            let close = player.tile.within_reach(tile, SIGNATURE_RANGE);
            input.signature = close && view.cooldowns.signature.is_zero();
            input.movement = Some(Direction::between(player.tile, tile));
        }
        None if crate_in_reach(state, player.tile) => input.attack = true,
        None => input.movement = next_errand(state, player),
    }
    input
}

fn nearest_threat(state: &SessionState, from: TileCoord) -> Option<TileCoord> {
    let enemies = state
        .enemies
        .iter()
        .filter(|enemy| enemy.alive)
        .map(|enemy| enemy.tile);
    let boss = state.boss.iter().filter(|boss| boss.alive).map(|boss| boss.tile);
    enemies
        .chain(boss)
        .min_by_key(|tile| (from.chebyshev_distance(*tile), *tile))
}

/// Walks to loot first, then to crates.
fn next_errand(state: &SessionState, player: &PlayerSnapshot) -> Option<Direction> {
    let from = player.tile;
    let loot = state.loot.iter().map(|drop| drop.tile);
    let target = loot
        .min_by_key(|tile| (from.chebyshev_distance(*tile), *tile))
        .or_else(|| {
            state
                .crates
                .iter()
                .filter(|entry| !entry.broken)
                .map(|entry| entry.tile)
                .min_by_key(|tile| (from.chebyshev_distance(*tile), *tile))
        })?;
    (target != from).then(|| Direction::between(from, target))
}

fn crate_in_reach(state: &SessionState, from: TileCoord) -> bool {
    state
        .crates
        .iter()
        .any(|entry| !entry.broken && from.within_reach(entry.tile, stats::MELEE_REACH))
}

fn shopping(state: &SessionState) -> Option<(ShopItem, u32)> {
    let economy = &state.economy;
    let wishlist = [
        ShopItem::Item(ItemKind::HealthPotion),
        ShopItem::Upgrade(UpgradeKind::Damage),
        ShopItem::Upgrade(UpgradeKind::Health),
    ];
    if economy.inventory.count(ItemKind::HealthPotion) == 0 {
        return affordable(economy.gold, wishlist[0]);
    }
    wishlist[1..]
        .iter()
        .find_map(|item| affordable(economy.gold, *item))
}

fn affordable(gold: u32, item: ShopItem) -> Option<(ShopItem, u32)> {
    (gold >= item.price()).then_some((item, 1))
}
