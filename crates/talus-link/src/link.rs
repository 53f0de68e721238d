use std::time::{Duration, Instant};

use talus_crypto::x25519::{X25519PublicKey, X25519StaticSecret};
use talus_types::identity::{EncPublicKey, SessionKey, SigPublicKey};
use talus_types::peer::ConnectionState;

/// Per-pair handshake and session-key state machine.
///
/// `PeerLink` never performs I/O. A transport-facing caller (`talus-engine`)
/// drives it: it feeds in plaintext-header fields learned from each
/// handshake packet and asks `PeerLink` for the key to seal or open the
/// next one.
pub struct PeerLink {
    state: ConnectionState,
    is_initiator: bool,
    own_ephemeral_secret: X25519StaticSecret,
    own_ephemeral_public: X25519PublicKey,
    peer_ephemeral_public: Option<X25519PublicKey>,
    peer_permanent_enc_pk: Option<EncPublicKey>,
    peer_permanent_sig_pk: Option<SigPublicKey>,
    session_key: Option<SessionKey>,
    last_progress: Instant,
}

impl PeerLink {
    /// Start a link as the initiating side, already knowing the peer's
    /// permanent encryption key (learned from a DHT announce or invite).
    pub fn new_initiator(peer_permanent_enc_pk: EncPublicKey) -> Self {
        let own_ephemeral_secret = X25519StaticSecret::random();
        let own_ephemeral_public = own_ephemeral_secret.public_key();
        Self {
            state: ConnectionState::Uninitialized,
            is_initiator: true,
            own_ephemeral_secret,
            own_ephemeral_public,
            peer_ephemeral_public: None,
            peer_permanent_enc_pk: Some(peer_permanent_enc_pk),
            peer_permanent_sig_pk: None,
            session_key: None,
            last_progress: Instant::now(),
        }
    }

    /// Start a link as the responding side. The peer's identity is learned
    /// from the first handshake packet's decrypted payload.
    pub fn new_responder() -> Self {
        let own_ephemeral_secret = X25519StaticSecret::random();
        let own_ephemeral_public = own_ephemeral_secret.public_key();
        Self {
            state: ConnectionState::Uninitialized,
            is_initiator: false,
            own_ephemeral_secret,
            own_ephemeral_public,
            peer_ephemeral_public: None,
            peer_permanent_enc_pk: None,
            peer_permanent_sig_pk: None,
            session_key: None,
            last_progress: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    /// This link's ephemeral encryption key, sent as `sender_enc_pk` in the
    /// plaintext outer header of every handshake packet.
    pub fn own_ephemeral_public(&self) -> EncPublicKey {
        self.own_ephemeral_public.to_bytes()
    }

    pub fn peer_permanent_enc_pk(&self) -> Option<EncPublicKey> {
        self.peer_permanent_enc_pk
    }

    pub fn peer_permanent_sig_pk(&self) -> Option<SigPublicKey> {
        self.peer_permanent_sig_pk
    }

    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Bootstrap key used to seal/open the first pair of handshake packets,
    /// before any ephemeral keys have been exchanged. Derived from this
    /// side's ephemeral secret and the peer's known permanent encryption
    /// key, so only the real key holder on the other end can open it.
    pub fn bootstrap_key(&self) -> Option<SessionKey> {
        let peer_permanent = self.peer_permanent_enc_pk?;
        let shared = self
            .own_ephemeral_secret
            .diffie_hellman(&X25519PublicKey::from_bytes(peer_permanent));
        Some(talus_crypto::blake3::derive_key(
            talus_crypto::blake3::contexts::SESSION_KEY,
            shared.as_bytes(),
        ))
    }

    /// Bootstrap key as computed by the responder side: DH(own permanent
    /// encryption secret, peer's ephemeral public key). Symmetric with
    /// [`PeerLink::bootstrap_key`] as computed by the initiator, since
    /// X25519 agreement is commutative: `DH(a, g^b) == DH(b, g^a)`. The
    /// responder needs this before it has recorded anything about the
    /// peer at all, so it takes its inputs directly rather than reading
    /// from `self`.
    pub fn responder_bootstrap_key(
        own_permanent_enc_secret: &X25519StaticSecret,
        peer_ephemeral_public: EncPublicKey,
    ) -> SessionKey {
        let shared = own_permanent_enc_secret
            .diffie_hellman(&X25519PublicKey::from_bytes(peer_ephemeral_public));
        talus_crypto::blake3::derive_key(talus_crypto::blake3::contexts::SESSION_KEY, shared.as_bytes())
    }

    /// Record the peer's permanent identity, learned from the decrypted
    /// `HandshakeHello` payload.
    pub fn record_peer_identity(&mut self, enc_pk: EncPublicKey, sig_pk: SigPublicKey) {
        self.peer_permanent_enc_pk = Some(enc_pk);
        self.peer_permanent_sig_pk = Some(sig_pk);
        self.touch();
    }

    /// Record the peer's ephemeral key, learned from a handshake packet's
    /// plaintext header. Once both ephemeral keys are known the final
    /// forward-secret session key is derived and installed.
    pub fn record_peer_ephemeral(&mut self, ephemeral: EncPublicKey) {
        let ephemeral = X25519PublicKey::from_bytes(ephemeral);
        let shared = self.own_ephemeral_secret.diffie_hellman(&ephemeral);
        self.session_key = Some(talus_crypto::blake3::derive_key(
            talus_crypto::blake3::contexts::SESSION_KEY,
            shared.as_bytes(),
        ));
        self.peer_ephemeral_public = Some(ephemeral);
        self.touch();
    }

    pub fn mark_handshake_sent(&mut self) {
        self.state = ConnectionState::HandshakeSent;
        self.touch();
    }

    pub fn mark_handshake_acked(&mut self) {
        self.state = ConnectionState::HandshakeAcked;
        self.touch();
    }

    pub fn mark_peer_info_exchanged(&mut self) {
        self.state = ConnectionState::PeerInfoExchanged;
        self.touch();
    }

    pub fn confirm(&mut self) {
        self.state = ConnectionState::Confirmed;
        self.touch();
    }

    pub fn fail(&mut self) {
        self.state = ConnectionState::Failed;
    }

    pub fn touch(&mut self) {
        self.last_progress = Instant::now();
    }

    pub fn last_progress(&self) -> Instant {
        self.last_progress
    }

    /// Whether this link has exceeded its timeout, with a shorter grace
    /// period while unconfirmed and the ~72s ping timeout once confirmed.
    pub fn is_timed_out(
        &self,
        now: Instant,
        unconfirmed_timeout: Duration,
        confirmed_timeout: Duration,
    ) -> bool {
        let elapsed = now.duration_since(self.last_progress);
        if self.state.is_confirmed() {
            elapsed > confirmed_timeout
        } else if self.state.is_terminal() {
            false
        } else {
            elapsed > unconfirmed_timeout
        }
    }
}
