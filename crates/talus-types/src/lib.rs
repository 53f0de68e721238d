//! # talus-types
//!
//! Shared domain types used across the Talus group-chat workspace.
//! Every structure here corresponds 1:1 to a concept named in the data
//! model: identity keys, roles, connection states, and the wire-format
//! size limits every component crate must agree on.

pub mod identity;
pub mod limits;
pub mod peer;
pub mod role;

pub use identity::{ChatId, EncPublicKey, SessionKey, SigPublicKey};
pub use peer::{ConnectionState, PeerId, PeerStatus};
pub use role::Role;
