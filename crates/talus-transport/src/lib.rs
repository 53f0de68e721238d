//! # talus-transport
//!
//! The boundary between [`talus_engine::GroupEngine`] and whatever
//! actually moves bytes between peers. The engine never knows if it is
//! talking to a DHT, an onion-routed relay, or a bare UDP socket — it
//! only knows [`TransportAdapter`].
//!
//! Two reference adapters live here: [`LoopbackHub`] (in-memory, for
//! tests and embedding) and [`UdpAdapter`] (real sockets, standing in
//! for the DHT/onion layer's "deliver bytes to an address" primitive).

mod loopback;
mod udp;

pub use loopback::{LoopbackHub, LoopbackNode};
pub use udp::UdpAdapter;

use talus_types::EncPublicKey;

/// Where a [`TransportAdapter`] should deliver bytes. Adapters are free
/// to interpret this however fits their medium; the engine only ever
/// treats it as an opaque destination handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PeerAddress {
    /// A raw socket address, used by [`UdpAdapter`].
    Socket(std::net::SocketAddr),
    /// A registered loopback node, used by [`LoopbackHub`] in tests.
    Loopback(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no route to destination")]
    Unreachable,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload too large for this transport")]
    PayloadTooLarge,
}

/// Thin boundary to the underlying packet-delivery layer (§4.9).
///
/// Implementations never interpret the bytes they carry — framing,
/// encryption, and retransmission all happen above this trait, inside
/// `talus-codec` and `talus-channel`. `send`/`poll_inbound` are
/// synchronous and non-blocking by contract, matching the engine's
/// single suspension point at `iterate()` (§5): an adapter that would
/// otherwise block buffers internally and drains on the next poll.
pub trait TransportAdapter {
    /// This adapter's own encryption public key, advertised to peers
    /// during the handshake.
    fn local_enc_pk(&self) -> EncPublicKey;

    /// Best-effort send. Never blocks; drops are silent at this layer
    /// (reliability is `talus-channel`'s job for lossless traffic).
    fn send(&mut self, dest: &PeerAddress, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Drain everything received since the last call.
    fn poll_inbound(&mut self) -> Vec<(PeerAddress, Vec<u8>)>;
}
