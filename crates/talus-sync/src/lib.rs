//! # talus-sync
//!
//! Gossip-style convergence: periodic ping with a version vector, and the
//! sync request/response exchange that follows when two peers detect
//! divergence (§4.7).

mod announce;
mod ping;

pub use announce::{PeerAnnounce, SyncRequestFlags, CURRENT_SCHEMA_VERSION, SYNC_REQUEST, SYNC_RESPONSE};
pub use ping::{peer_list_checksum, OutOfSyncReason, VersionVector, PING};
