//! Player state stored inside the world.

use std::time::Duration;

use skulls_daggers_core::{
    stats::{self, Defenses},
    BuffKind, BuffSet, CharacterKind, DashPhase, Direction, MagicEffect, PlayerId,
    PlayerSnapshot, TileCoord,
};

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) id: PlayerId,
    pub(crate) character: CharacterKind,
    pub(crate) tile: TileCoord,
    pub(crate) facing: Direction,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) alive: bool,
    pub(crate) mana: Option<f32>,
    pub(crate) move_speed: f32,
    pub(crate) attacking: bool,
    pub(crate) attack_token: u64,
    pub(crate) last_attack_at: Option<Duration>,
    pub(crate) last_step_at: Option<Duration>,
    pub(crate) last_signature_at: Option<Duration>,
    pub(crate) signature_active: bool,
    pub(crate) signature_token: u64,
    pub(crate) last_magic_at: Option<Duration>,
    pub(crate) magic_active: Option<MagicEffect>,
    pub(crate) magic_token: u64,
    pub(crate) last_dash_at: Option<Duration>,
    pub(crate) dash_phase: Option<DashPhase>,
    pub(crate) dash_token: u64,
    pub(crate) buffs: BuffSet,
    pub(crate) rage_armed: bool,
    pub(crate) aura_active: bool,
}

impl Player {
    /// Fresh player at full health; `bonus_health` comes from shared upgrades.
    pub(crate) fn new(
        id: PlayerId,
        character: CharacterKind,
        tile: TileCoord,
        bonus_health: u32,
    ) -> Self {
        let profile = character.profile();
        let max_health = profile.max_health.saturating_add(bonus_health);
        Self {
            id,
            character,
            tile,
            facing: Direction::South,
            health: max_health,
            max_health,
            alive: true,
            mana: profile.mana.map(|mana| mana.max),
            move_speed: profile.move_speed,
            attacking: false,
            attack_token: 0,
            last_attack_at: None,
            last_step_at: None,
            last_signature_at: None,
            signature_active: false,
            signature_token: 0,
            last_magic_at: None,
            magic_active: None,
            magic_token: 0,
            last_dash_at: None,
            dash_phase: None,
            dash_token: 0,
            buffs: BuffSet::default(),
            rage_armed: false,
            aura_active: false,
        }
    }

    pub(crate) fn regenerate_mana(&mut self, dt: Duration) {
        let (Some(mana), Some(profile)) = (self.mana.as_mut(), self.character.profile().mana)
        else {
            return;
        };
        if !self.alive {
            return;
        }
        *mana = (*mana + profile.regen_per_second * dt.as_secs_f32()).min(profile.max);
    }

    pub(crate) fn step_interval(&self) -> Duration {
        stats::scale_interval(stats::BASE_STEP_INTERVAL, self.snapshot().effective_move_speed())
    }

    pub(crate) fn defenses(&self) -> Defenses {
        Defenses {
            shield: self.buffs.is_active(BuffKind::Shield),
            aura: self.aura_active,
        }
    }

    /// Heals up to the maximum, returning the amount restored.
    pub(crate) fn heal(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health);
        self.health - before
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            character: self.character,
            tile: self.tile,
            facing: self.facing,
            health: self.health,
            max_health: self.max_health,
            alive: self.alive,
            mana: self.mana,
            move_speed: self.move_speed,
            attacking: self.attacking,
            last_attack_at: self.last_attack_at,
            last_step_at: self.last_step_at,
            last_signature_at: self.last_signature_at,
            last_magic_at: self.last_magic_at,
            last_dash_at: self.last_dash_at,
            signature_active: self.signature_active,
            dash_phase: self.dash_phase,
            buffs: self.buffs,
            rage_armed: self.rage_armed,
            aura_active: self.aura_active,
        }
    }
}

/// Reports whether `interval` has fully elapsed since `last`.
pub(crate) fn elapsed(last: Option<Duration>, now: Duration, interval: Duration) -> bool {
    last.map_or(true, |last| now.saturating_sub(last) >= interval)
}
