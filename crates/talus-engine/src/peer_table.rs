use std::time::Instant;

use talus_channel::LosslessChannel;
use talus_link::PeerLink;
use talus_types::{PeerId, PeerStatus, Role};

use talus_transport::PeerAddress;

/// One entry in the engine's peer arena (REDESIGN FLAGS §9: dense,
/// generation-tagged index instead of a pointer graph).
pub struct PeerEntry {
    pub address: PeerAddress,
    pub link: PeerLink,
    pub channel: LosslessChannel,
    pub nickname: Vec<u8>,
    pub status: PeerStatus,
    pub role: Role,
    pub ignored: bool,
    pub last_seen: Instant,
    pub last_ping_sent: Instant,
}

enum Slot {
    Occupied(PeerEntry),
    Vacant,
}

/// Dense arena of peers, indexed by generation-tagged [`PeerId`]. A
/// vacated slot is reused, but its generation is bumped so a stale id
/// held past removal is detected instead of silently aliasing whoever
/// took the slot next.
#[derive(Default)]
pub struct PeerTable {
    slots: Vec<Slot>,
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: PeerEntry) -> PeerId {
        if let Some(index) = self.free.pop() {
            let generation = self.generations[index as usize];
            self.slots[index as usize] = Slot::Occupied(entry);
            return PeerId::new(index, generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied(entry));
        self.generations.push(0);
        PeerId::new(index, 0)
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerEntry> {
        if self.generations.get(id.index() as usize).copied()? != id.generation() {
            return None;
        }
        match self.slots.get(id.index() as usize)? {
            Slot::Occupied(entry) => Some(entry),
            Slot::Vacant => None,
        }
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut PeerEntry> {
        if self.generations.get(id.index() as usize).copied()? != id.generation() {
            return None;
        }
        match self.slots.get_mut(id.index() as usize)? {
            Slot::Occupied(entry) => Some(entry),
            Slot::Vacant => None,
        }
    }

    pub fn remove(&mut self, id: PeerId) -> Option<PeerEntry> {
        if self.generations.get(id.index() as usize).copied()? != id.generation() {
            return None;
        }
        let slot = self.slots.get_mut(id.index() as usize)?;
        let removed = std::mem::replace(slot, Slot::Vacant);
        let entry = match removed {
            Slot::Occupied(entry) => entry,
            Slot::Vacant => return None,
        };
        self.generations[id.index() as usize] = id.generation().wrapping_add(1);
        self.free.push(id.index());
        Some(entry)
    }

    pub fn find_by_address(&self, address: &PeerAddress) -> Option<PeerId> {
        self.iter().find(|(_, entry)| &entry.address == address).map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeerId, &PeerEntry)> {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| match slot {
            Slot::Occupied(entry) => Some((PeerId::new(index as u32, self.generations[index]), entry)),
            Slot::Vacant => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PeerId, &mut PeerEntry)> {
        let generations = &self.generations;
        self.slots.iter_mut().enumerate().filter_map(move |(index, slot)| match slot {
            Slot::Occupied(entry) => Some((PeerId::new(index as u32, generations[index]), entry)),
            Slot::Vacant => None,
        })
    }

    pub fn confirmed_count(&self) -> usize {
        self.iter().filter(|(_, entry)| entry.link.state().is_confirmed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(addr: u64) -> PeerEntry {
        PeerEntry {
            address: PeerAddress::Loopback(addr),
            link: PeerLink::new_responder(),
            channel: LosslessChannel::new(),
            nickname: Vec::new(),
            status: PeerStatus::Active,
            role: Role::User,
            ignored: false,
            last_seen: Instant::now(),
            last_ping_sent: Instant::now(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut table = PeerTable::new();
        let id = table.insert(entry(1));
        assert!(table.get(id).is_some());
    }

    #[test]
    fn test_stale_id_rejected_after_removal() {
        let mut table = PeerTable::new();
        let id = table.insert(entry(1));
        table.remove(id).expect("removed");
        assert!(table.get(id).is_none());
    }

    #[test]
    fn test_slot_reused_with_new_generation() {
        let mut table = PeerTable::new();
        let first = table.insert(entry(1));
        table.remove(first).expect("removed");
        let second = table.insert(entry(2));
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(table.get(first).is_none());
        assert!(table.get(second).is_some());
    }

    #[test]
    fn test_find_by_address() {
        let mut table = PeerTable::new();
        let id = table.insert(entry(42));
        let found = table.find_by_address(&PeerAddress::Loopback(42));
        assert_eq!(found, Some(id));
    }
}
