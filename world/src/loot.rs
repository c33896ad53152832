//! Loot drops and breakable crates.

use std::collections::VecDeque;

use skulls_daggers_core::{
    stats::LOOT_CAP, CrateId, CrateSnapshot, LootId, LootKind, LootSnapshot, TileCoord,
};

#[derive(Clone, Copy, Debug)]
pub(crate) struct LootDrop {
    pub(crate) id: LootId,
    pub(crate) tile: TileCoord,
    pub(crate) kind: LootKind,
    pub(crate) amount: u32,
}

impl LootDrop {
    pub(crate) fn snapshot(&self) -> LootSnapshot {
        LootSnapshot {
            id: self.id,
            tile: self.tile,
            kind: self.kind,
            amount: self.amount,
        }
    }
}

/// Drops in creation order; the oldest drop is evicted first once the cap is exceeded.
#[derive(Debug, Default)]
pub(crate) struct LootField {
    drops: VecDeque<LootDrop>,
    next_id: u32,
}

impl LootField {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.drops.clear();
    }

    /// Places a drop and returns its identifier plus any drops evicted to respect the cap.
    pub(crate) fn place(
        &mut self,
        tile: TileCoord,
        kind: LootKind,
        amount: u32,
    ) -> (LootId, Vec<LootId>) {
        let id = LootId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.drops.push_back(LootDrop {
            id,
            tile,
            kind,
            amount,
        });

        let mut evicted = Vec::new();
        while self.drops.len() > LOOT_CAP {
            if let Some(oldest) = self.drops.pop_front() {
                evicted.push(oldest.id);
            }
        }
        (id, evicted)
    }

    pub(crate) fn get(&self, id: LootId) -> Option<&LootDrop> {
        self.drops.iter().find(|drop| drop.id == id)
    }

    pub(crate) fn take(&mut self, id: LootId) -> Option<LootDrop> {
        let index = self.drops.iter().position(|drop| drop.id == id)?;
        self.drops.remove(index)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LootDrop> {
        self.drops.iter()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Crate {
    pub(crate) id: CrateId,
    pub(crate) tile: TileCoord,
    pub(crate) broken: bool,
}

impl Crate {
    pub(crate) fn snapshot(&self) -> CrateSnapshot {
        CrateSnapshot {
            id: self.id,
            tile: self.tile,
            broken: self.broken,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Crates {
    entries: Vec<Crate>,
    next_id: u32,
}

impl Crates {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn place(&mut self, tile: TileCoord) -> CrateId {
        let id = CrateId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push(Crate {
            id,
            tile,
            broken: false,
        });
        id
    }

    pub(crate) fn get_mut(&mut self, id: CrateId) -> Option<&mut Crate> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    pub(crate) fn get(&self, id: CrateId) -> Option<&Crate> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Crate> {
        self.entries.iter()
    }
}
