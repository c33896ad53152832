//! Time-ordered queue of deferred world actions.

use std::{cmp::Ordering, cmp::Reverse, collections::BinaryHeap, time::Duration};

use skulls_daggers_core::{BuffKind, EnemyId, PlayerId, TileCoord};

/// Deferred mutation fired once the world clock reaches its due time.
///
/// Every action carries the guard it needs to detect that the state it
/// targets has moved on; stale actions are dropped when they fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScheduledAction {
    /// Removes a dead enemy from the registry.
    RemoveEnemy { enemy: EnemyId },
    /// Removes the dead boss from the arena.
    RemoveBoss,
    /// Expires a buff unless it was re-applied with a later end time.
    ExpireBuff {
        player: PlayerId,
        kind: BuffKind,
        ends_at: Duration,
    },
    /// Closes the signature window opened by the matching activation.
    EndSignature { player: PlayerId, token: u64 },
    /// Deactivates the magic effect opened by the matching activation.
    ExpireMagic { player: PlayerId, token: u64 },
    /// Moves a dash from burst to sustained speed.
    DashSustain { player: PlayerId, token: u64 },
    /// Ends a dash.
    DashEnd { player: PlayerId, token: u64 },
    /// Fallback reset of an attack whose completion notice never arrived.
    ResetAttack { player: PlayerId, token: u64 },
    /// Brings the announced boss into the arena.
    BossArrival { tile: TileCoord, level: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    fire_at: Duration,
    sequence: u64,
    action: ScheduledAction,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.fire_at, self.sequence).cmp(&(other.fire_at, other.sequence))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-queue keyed by `(fire_at, sequence)`.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    entries: BinaryHeap<Reverse<Entry>>,
    next_sequence: u64,
}

impl Schedule {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, fire_at: Duration, action: ScheduledAction) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.entries.push(Reverse(Entry {
            fire_at,
            sequence,
            action,
        }));
    }

    /// Pops the earliest action whose due time is at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<ScheduledAction> {
        let Reverse(head) = self.entries.peek()?;
        if head.fire_at > now {
            return None;
        }
        self.entries.pop().map(|Reverse(entry)| entry.action)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_then_insertion_order() {
        let mut schedule = Schedule::new();
        schedule.push(Duration::from_millis(300), ScheduledAction::RemoveBoss);
        schedule.push(
            Duration::from_millis(100),
            ScheduledAction::RemoveEnemy {
                enemy: EnemyId::new(2),
            },
        );
        schedule.push(
            Duration::from_millis(100),
            ScheduledAction::RemoveEnemy {
                enemy: EnemyId::new(1),
            },
        );

        assert_eq!(schedule.pop_due(Duration::from_millis(50)), None);
        assert_eq!(
            schedule.pop_due(Duration::from_millis(100)),
            Some(ScheduledAction::RemoveEnemy {
                enemy: EnemyId::new(2)
            })
        );
        assert_eq!(
            schedule.pop_due(Duration::from_millis(100)),
            Some(ScheduledAction::RemoveEnemy {
                enemy: EnemyId::new(1)
            })
        );
        assert_eq!(schedule.pop_due(Duration::from_millis(299)), None);
        assert_eq!(schedule.len(), 1);
        assert_eq!(
            schedule.pop_due(Duration::from_secs(1)),
            Some(ScheduledAction::RemoveBoss)
        );
    }
}
