#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ability activation and consumable effects.
//!
//! Cooldowns are upgrade-adjusted here and enforced by the world, which also
//! owns the timers that end signature windows, magic effects, dash phases and
//! buffs. This crate decides *what* an input asks for; the world decides
//! whether it is allowed right now.

use std::time::Duration;

use skulls_daggers_core::{
    stats, BuffKind, Command, ConsumableEffect, Economy, GemColor, ItemKind, PlayerSnapshot,
};

/// Hit points restored by a health potion.
pub const HEALTH_POTION_HEAL: u32 = 50;

/// Effect of drinking a potion.
#[must_use]
pub const fn item_effect(item: ItemKind) -> ConsumableEffect {
    match item {
        ItemKind::HealthPotion => ConsumableEffect::Heal(HEALTH_POTION_HEAL),
        ItemKind::SpeedPotion => ConsumableEffect::Buff {
            kind: BuffKind::Speed,
            multiplier: 1.5,
            duration: Duration::from_secs(10),
        },
        ItemKind::DamagePotion => ConsumableEffect::Buff {
            kind: BuffKind::Damage,
            multiplier: 1.5,
            duration: Duration::from_secs(10),
        },
    }
}

/// Effect of consuming a gem.
#[must_use]
pub const fn gem_effect(color: GemColor) -> ConsumableEffect {
    match color {
        GemColor::Blue => ConsumableEffect::Buff {
            kind: BuffKind::Shield,
            multiplier: 1.0,
            duration: Duration::from_secs(10),
        },
        GemColor::Green => ConsumableEffect::Buff {
            kind: BuffKind::Speed,
            multiplier: 1.25,
            duration: Duration::from_secs(8),
        },
        GemColor::Red => ConsumableEffect::Buff {
            kind: BuffKind::Damage,
            multiplier: 1.25,
            duration: Duration::from_secs(8),
        },
    }
}

/// Ability or consumable a player asked for this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbilityRequest {
    /// The character's signature area ability.
    Signature,
    /// The character's magic effect.
    Magic,
    /// The universal dash.
    Dash,
    /// Drink a potion from the shared stash.
    Item(ItemKind),
    /// Consume a gem from the shared stash.
    Gem(GemColor),
}

/// Signature cooldown after the party's cooldown upgrades.
#[must_use]
pub fn signature_cooldown(player: &PlayerSnapshot, economy: &Economy) -> Duration {
    let base = player.character.profile().signature.profile().cooldown;
    stats::effective_cooldown(base, economy.upgrades.ability_cooldown)
}

/// Magic cooldown after the party's cooldown upgrades.
#[must_use]
pub fn magic_cooldown(player: &PlayerSnapshot, economy: &Economy) -> Duration {
    let base = player.character.profile().magic.profile().cooldown;
    stats::effective_cooldown(base, economy.upgrades.ability_cooldown)
}

/// Translates a request into the world command that performs it.
#[must_use]
pub fn command_for(player: &PlayerSnapshot, economy: &Economy, request: AbilityRequest) -> Command {
    let id = player.id;
    match request {
        AbilityRequest::Signature => Command::ActivateSignature {
            player: id,
            cooldown: signature_cooldown(player, economy),
            active_for: player.character.profile().signature.profile().active_for,
        },
        AbilityRequest::Magic => {
            let magic = player.character.profile().magic.profile();
            Command::ActivateMagic {
                player: id,
                cooldown: magic_cooldown(player, economy),
                active_for: magic.active_for,
                mana_cost: magic.mana_cost,
            }
        }
        AbilityRequest::Dash => Command::ActivateDash { player: id },
        AbilityRequest::Item(item) => Command::UseItem {
            player: id,
            item,
            effect: item_effect(item),
        },
        AbilityRequest::Gem(color) => Command::ConsumeGem {
            player: id,
            color,
            effect: gem_effect(color),
        },
    }
}

/// Time left before `cooldown` has passed since `last`; zero when ready.
#[must_use]
pub fn remaining(last: Option<Duration>, now: Duration, cooldown: Duration) -> Duration {
    last.map_or(Duration::ZERO, |last| {
        cooldown.saturating_sub(now.saturating_sub(last))
    })
}

/// Time left on each of a player's cooldowns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CooldownReport {
    /// Signature ability.
    pub signature: Duration,
    /// Magic effect.
    pub magic: Duration,
    /// Dash, measured from activation through burst, sustain and recovery.
    pub dash: Duration,
    /// Melee swing.
    pub attack: Duration,
}

impl CooldownReport {
    /// Reports whether nothing is cooling down.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        *self == Self::default()
    }
}

/// Remaining cooldowns for display.
#[must_use]
pub fn cooldowns(player: &PlayerSnapshot, economy: &Economy, now: Duration) -> CooldownReport {
    CooldownReport {
        signature: remaining(
            player.last_signature_at,
            now,
            signature_cooldown(player, economy),
        ),
        magic: remaining(player.last_magic_at, now, magic_cooldown(player, economy)),
        dash: remaining(player.last_dash_at, now, stats::DASH_CYCLE),
        attack: remaining(
            player.last_attack_at,
            now,
            player.character.profile().attack_interval(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_counts_down_to_zero() {
        let cooldown = Duration::from_secs(4);
        assert_eq!(remaining(None, Duration::from_secs(1), cooldown), Duration::ZERO);
        assert_eq!(
            remaining(Some(Duration::from_secs(1)), Duration::from_secs(2), cooldown),
            Duration::from_secs(3)
        );
        assert_eq!(
            remaining(Some(Duration::from_secs(1)), Duration::from_secs(9), cooldown),
            Duration::ZERO
        );
    }

    #[test]
    fn gems_map_to_their_buffs() {
        assert!(matches!(
            gem_effect(GemColor::Blue),
            ConsumableEffect::Buff {
                kind: BuffKind::Shield,
                ..
            }
        ));
        assert_eq!(item_effect(ItemKind::HealthPotion), ConsumableEffect::Heal(50));
    }
}
