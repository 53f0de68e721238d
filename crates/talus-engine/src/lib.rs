//! # talus-engine
//!
//! The per-group state machine (§4, §6, §8): handshake, peer table,
//! moderation/topic/shared-state application, and the `iterate()` timer
//! loop. Everything above this crate supplies cryptography and wire
//! codecs; everything below it (a concrete [`talus_transport::TransportAdapter`])
//! is provided by the caller.

mod cbor;
mod config;
mod error;
mod group;
mod handler;
mod handshake_payloads;
mod packet;
mod peer_table;

pub(crate) use cbor::{cbor_from_slice, cbor_to_vec};

pub use config::EngineConfig;
pub use error::{EngineError, JoinFailReason, PeerExitReason, Result};
pub use group::{GroupEncKeys, GroupEngine};
pub use handler::{GroupHandler, MessageKind, NullHandler};

pub use talus_sync::VersionVector;
pub use talus_types::PeerId;
