use serde::{Deserialize, Serialize};

/// A dense, generation-tagged index into `GroupEngine`'s peer arena.
///
/// Replaces the pointer-graph peer lists of the reference design
/// (REDESIGN FLAGS §9): peers are never referenced by pointer or shared
/// handle, only by this id. The generation counter is bumped whenever a
/// slot is reused, so a stale `PeerId` held past a peer's removal is
/// detected rather than silently aliasing a different peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId {
    index: u32,
    generation: u32,
}

impl PeerId {
    /// Construct a `PeerId` for a given arena slot and generation.
    ///
    /// Only `talus-engine`'s peer table should call this directly; it is
    /// `pub` so the table can live in its own module within that crate.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The arena slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// The generation this id was minted for.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Online presence status (§3 peer record).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerStatus {
    Active,
    Away,
    Busy,
}

impl Default for PeerStatus {
    fn default() -> Self {
        PeerStatus::Active
    }
}

/// Connection state machine for a peer link (§4.2).
///
/// ```text
/// Uninitialized -> HandshakeSent -> HandshakeAcked -> PeerInfoExchanged -> Confirmed
///                                                                       \-> Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    HandshakeSent,
    HandshakeAcked,
    PeerInfoExchanged,
    Confirmed,
    Failed,
}

impl ConnectionState {
    /// Only `Confirmed` links count toward the peer list and its
    /// checksum (§4.2).
    pub fn is_confirmed(self) -> bool {
        matches!(self, ConnectionState::Confirmed)
    }

    /// Whether this state is terminal (no further transitions expected).
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed)
    }
}
