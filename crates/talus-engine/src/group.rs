use std::collections::VecDeque;
use std::time::Instant;

use talus_channel::{LosslessChannel, ReceiveOutcome};
use talus_channel::AckKind;
use talus_codec::{OuterHeader, OuterType};
use talus_crypto::ed25519::SigningKey;
use talus_crypto::x25519::X25519StaticSecret;
use talus_link::{
    HandshakeHello, InviteRejectReason, PeerLink, HS_RESPONSE_ACK, INVITE_REQUEST, INVITE_RESPONSE,
    INVITE_RESPONSE_REJECT,
};
use talus_moderation::{
    ModerationState, ModeratorList, SanctionsCredentials, SanctionsEntry, SetRoleOutcome,
    BROADCAST_SUBTYPE_KICK_PEER, BROADCAST_SUBTYPE_SET_MOD, BROADCAST_SUBTYPE_SET_OBSERVER, MOD_LIST,
    SANCTIONS_LIST,
};
use talus_persist::{GroupKeys, SavedGroupRecord};
use talus_state::{Privacy, SharedState};
use talus_sync::{OutOfSyncReason, PeerAnnounce, SyncRequestFlags, VersionVector, PING, SYNC_REQUEST, SYNC_RESPONSE};
use talus_topic::TopicInfo;
use talus_transport::PeerAddress;
use talus_types::identity::{ChatId, EncPublicKey, SigPublicKey};
use talus_types::limits::{MAX_NAME_LEN, MAX_NICK_LEN, MAX_PASSWORD_LEN, MAX_TOPIC_LEN};
use talus_types::{PeerId, PeerStatus, Role};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, JoinFailReason, PeerExitReason, Result};
use crate::handler::{GroupHandler, MessageKind};
use crate::handshake_payloads::{InviteRequestBody, InviteResponseBody};
use crate::packet::{
    BroadcastBody, BROADCAST, BROADCAST_SUBTYPE_ACTION_MESSAGE, BROADCAST_SUBTYPE_NICK,
    BROADCAST_SUBTYPE_PEER_EXIT, BROADCAST_SUBTYPE_PLAIN_MESSAGE, BROADCAST_SUBTYPE_PRIVATE_MESSAGE,
    BROADCAST_SUBTYPE_STATUS, CUSTOM_PACKET,
};
use crate::peer_table::{PeerEntry, PeerTable};

/// The founder's group-level encryption keypair (§3), used only by the
/// DHT announce layer this workspace treats as out-of-scope. Carried
/// here purely so it survives a save/restore round-trip.
#[derive(Clone)]
pub struct GroupEncKeys {
    pub secret: [u8; 32],
    pub public: EncPublicKey,
}

/// Orchestrates one group membership: peer table, role enforcement,
/// broadcast fan-out, and the timer loop (§4.8).
///
/// One engine instance manages exactly one group, following the flat
/// ownership REDESIGN FLAGS call for (engine owns peers; no pointer
/// graph); the operation table's "group-id" parameter collapses to
/// "this engine instance" rather than a key into a multi-group map.
pub struct GroupEngine<H: GroupHandler> {
    config: EngineConfig,
    handler: H,

    own_enc_secret: X25519StaticSecret,
    own_enc_pk: EncPublicKey,
    own_sig_key: SigningKey,
    own_sig_pk: SigPublicKey,
    own_role: Role,
    own_nickname: Vec<u8>,
    own_status: PeerStatus,

    chat_id: ChatId,
    group_enc_keys: Option<GroupEncKeys>,

    shared_state: Option<SharedState>,
    moderation: ModerationState,
    topic: Option<TopicInfo>,

    peers: PeerTable,
    pending_outbound: VecDeque<(PeerAddress, Vec<u8>)>,
    connected: bool,
    dirty: bool,
}

impl<H: GroupHandler> GroupEngine<H> {
    /// `create_group`: found a new group as its sole initial member.
    pub fn create_group(
        config: EngineConfig,
        handler: H,
        privacy: Privacy,
        group_name: Vec<u8>,
        nickname: Vec<u8>,
    ) -> Result<Self> {
        if group_name.is_empty() || nickname.is_empty() {
            return Err(EngineError::Empty);
        }
        if group_name.len() > MAX_NAME_LEN || nickname.len() > MAX_NICK_LEN {
            return Err(EngineError::TooLong);
        }

        let own_enc_secret = X25519StaticSecret::random();
        let own_enc_pk = own_enc_secret.public_key().to_bytes();
        let own_sig_key = SigningKey::generate();
        let own_sig_pk = own_sig_key.verifying_key().to_bytes();

        // The Chat ID is the founder's own permanent signature key — not a
        // separate group identity — so every later founder-gated op
        // (`set_role`, `set_password`, ...) signs and is authorized with
        // the same key that the genesis state and `ModerationState` treat
        // as the founder.
        let chat_id = own_sig_pk;
        let group_enc_secret = X25519StaticSecret::random();
        let group_enc_keys = GroupEncKeys {
            secret: group_enc_secret.to_bytes(),
            public: group_enc_secret.public_key().to_bytes(),
        };

        let moderation = ModerationState::new(chat_id);
        let mod_list_hash = moderation.moderator_list.hash();
        let shared_state = SharedState::genesis(
            &own_sig_key,
            group_enc_keys.public,
            chat_id,
            group_name,
            privacy,
            u32::MAX,
            mod_list_hash,
        )
        .map_err(|_| EngineError::TooLong)?;

        let mut engine = Self {
            config,
            handler,
            own_enc_secret,
            own_enc_pk,
            own_sig_key,
            own_sig_pk,
            own_role: Role::Founder,
            own_nickname: nickname,
            own_status: PeerStatus::Active,
            chat_id,
            group_enc_keys: Some(group_enc_keys),
            shared_state: Some(shared_state),
            moderation,
            topic: None,
            peers: PeerTable::new(),
            pending_outbound: VecDeque::new(),
            connected: true,
            dirty: true,
        };
        engine.handler.on_self_join();
        info!(chat_id = hex::encode(engine.chat_id), "founded group");
        Ok(engine)
    }

    /// `join_by_chat_id`: begin a handshake with a known member of an
    /// existing group, identified by its Chat ID (the founder's
    /// permanent signature public key).
    pub fn join_by_chat_id(
        config: EngineConfig,
        handler: H,
        chat_id: ChatId,
        target_address: PeerAddress,
        target_permanent_enc_pk: EncPublicKey,
        password: Vec<u8>,
        nickname: Vec<u8>,
    ) -> Result<Self> {
        if nickname.is_empty() {
            return Err(EngineError::Empty);
        }
        if nickname.len() > MAX_NICK_LEN || password.len() > MAX_PASSWORD_LEN {
            return Err(EngineError::TooLong);
        }

        let own_enc_secret = X25519StaticSecret::random();
        let own_enc_pk = own_enc_secret.public_key().to_bytes();
        let own_sig_key = SigningKey::generate();
        let own_sig_pk = own_sig_key.verifying_key().to_bytes();
        let moderation = ModerationState::new(chat_id);

        let mut engine = Self {
            config,
            handler,
            own_enc_secret,
            own_enc_pk,
            own_sig_key,
            own_sig_pk,
            own_role: Role::User,
            own_nickname: nickname,
            own_status: PeerStatus::Active,
            chat_id,
            group_enc_keys: None,
            shared_state: None,
            moderation,
            topic: None,
            peers: PeerTable::new(),
            pending_outbound: VecDeque::new(),
            connected: false,
            dirty: false,
        };

        engine.begin_invite(target_address, target_permanent_enc_pk, password)?;
        Ok(engine)
    }

    /// `accept_invite`: identical handshake initiation to
    /// `join_by_chat_id`, kept as a distinct operation to match the
    /// public surface described for responding to a friend-invite
    /// cookie — that cookie's own validity lives in the out-of-scope
    /// direct-messaging subsystem, so this engine only needs the chat
    /// id and address it resolves to.
    pub fn accept_invite(
        config: EngineConfig,
        handler: H,
        chat_id: ChatId,
        target_address: PeerAddress,
        target_permanent_enc_pk: EncPublicKey,
        password: Vec<u8>,
        nickname: Vec<u8>,
    ) -> Result<Self> {
        Self::join_by_chat_id(
            config,
            handler,
            chat_id,
            target_address,
            target_permanent_enc_pk,
            password,
            nickname,
        )
    }

    /// Rejoin a group across a process restart using a previously
    /// [`save`](Self::save)d record (§6): the permanent identity keys
    /// come back from the record rather than being freshly generated, so
    /// existing peers recognize this as the same member instead of a
    /// stranger — the founder keeps `Role::Founder` because `chat_id`
    /// still equals its own signature key, and a promoted member's
    /// moderator status survives because the restored moderator list
    /// still names its signature key. A fresh handshake against
    /// `target_address` is always required: this workspace persists no
    /// address book.
    pub fn resume(
        config: EngineConfig,
        handler: H,
        record: SavedGroupRecord,
        target_address: PeerAddress,
        target_permanent_enc_pk: EncPublicKey,
    ) -> Result<Self> {
        if record.nick.is_empty() {
            return Err(EngineError::Empty);
        }
        if record.nick.len() > MAX_NICK_LEN || record.password.len() > MAX_PASSWORD_LEN {
            return Err(EngineError::TooLong);
        }

        let own_enc_secret = X25519StaticSecret::from_bytes(record.own_enc_secret);
        let own_enc_pk = own_enc_secret.public_key().to_bytes();
        let own_sig_key = SigningKey::from_bytes(&record.own_sig_secret);
        let own_sig_pk = own_sig_key.verifying_key().to_bytes();
        let chat_id = record.shared_state.founder_sig_pk;

        let mut moderation = ModerationState::new(chat_id);
        moderation.moderator_list = record.moderator_list;
        let own_role = moderation.role_of(&own_sig_pk);

        let group_enc_keys = record.group_keys.map(|keys| GroupEncKeys {
            secret: keys.enc_secret,
            public: X25519StaticSecret::from_bytes(keys.enc_secret).public_key().to_bytes(),
        });

        let mut engine = Self {
            config,
            handler,
            own_enc_secret,
            own_enc_pk,
            own_sig_key,
            own_sig_pk,
            own_role,
            own_nickname: record.nick,
            own_status: PeerStatus::Active,
            chat_id,
            group_enc_keys,
            shared_state: Some(record.shared_state),
            moderation,
            topic: record.topic_info,
            peers: PeerTable::new(),
            pending_outbound: VecDeque::new(),
            connected: false,
            dirty: false,
        };

        engine.begin_invite(target_address, target_permanent_enc_pk, record.password)?;
        Ok(engine)
    }

    /// Snapshot this membership for persistence across a process restart
    /// (§6). The sanctions list is deliberately omitted, matching
    /// [`SavedGroupRecord`]'s documented reset-on-empty-group policy.
    /// Fails only before the genesis/invite handshake has ever produced a
    /// `SharedState` to snapshot.
    pub fn save(&self, connect_on_load: bool) -> Result<SavedGroupRecord> {
        let shared_state = self.shared_state.clone().ok_or(EngineError::NotConnected)?;
        Ok(SavedGroupRecord {
            own_enc_secret: self.own_enc_secret.to_bytes(),
            own_sig_secret: self.own_sig_key.to_bytes(),
            group_keys: self.group_enc_keys.as_ref().map(|keys| GroupKeys {
                sig_secret: self.own_sig_key.to_bytes(),
                enc_secret: keys.secret,
            }),
            shared_state,
            moderator_list: self.moderation.moderator_list.clone(),
            nick: self.own_nickname.clone(),
            password: Vec::new(),
            topic_info: self.topic.clone(),
            connect_on_load,
        })
    }

    fn begin_invite(
        &mut self,
        target_address: PeerAddress,
        target_permanent_enc_pk: EncPublicKey,
        password: Vec<u8>,
    ) -> Result<()> {
        let link = PeerLink::new_initiator(target_permanent_enc_pk);
        let bootstrap_key = link.bootstrap_key().ok_or(EngineError::BadChatId)?;
        let own_ephemeral = link.own_ephemeral_public();

        let body = InviteRequestBody {
            hello: HandshakeHello { permanent_enc_pk: self.own_enc_pk, permanent_sig_pk: self.own_sig_pk },
            group_name: Vec::new(),
            password,
            nickname: self.own_nickname.clone(),
        };
        let payload = crate::cbor_to_vec(&body);

        let sealed = talus_codec::seal(
            OuterType::Handshake,
            &self.chat_id,
            &own_ephemeral,
            &bootstrap_key,
            INVITE_REQUEST,
            None,
            &payload,
        )
        .map_err(|_| EngineError::TooLong)?;

        let mut link = link;
        link.mark_handshake_sent();

        let entry = PeerEntry {
            address: target_address.clone(),
            link,
            channel: LosslessChannel::new(),
            nickname: Vec::new(),
            status: PeerStatus::Active,
            role: Role::User,
            ignored: false,
            last_seen: Instant::now(),
            last_ping_sent: Instant::now(),
        };
        self.peers.insert(entry);
        self.pending_outbound.push_back((target_address, sealed));
        Ok(())
    }

    // ---- sends ----

    /// Seal `payload` under `peer_id`'s current session key and enqueue
    /// it for the transport adapter to drain.
    fn seal_for(
        &mut self,
        peer_id: PeerId,
        outer_type: OuterType,
        group_packet_type: u8,
        message_id: Option<u64>,
        payload: &[u8],
    ) -> Result<()> {
        let entry = self.peers.get(peer_id).ok_or(EngineError::PeerNotFound)?;
        let session_key = *entry.link.session_key().ok_or(EngineError::NotConnected)?;
        let sender_enc_pk = entry.link.own_ephemeral_public();
        let address = entry.address.clone();

        let sealed = talus_codec::seal(
            outer_type,
            &self.chat_id,
            &sender_enc_pk,
            &session_key,
            group_packet_type,
            message_id,
            payload,
        )
        .map_err(|_| EngineError::TooLong)?;
        self.pending_outbound.push_back((address, sealed));
        Ok(())
    }

    fn send_lossless_to(&mut self, peer_id: PeerId, group_packet_type: u8, payload: Vec<u8>) -> Result<()> {
        let now = Instant::now();
        let entry = self.peers.get_mut(peer_id).ok_or(EngineError::PeerNotFound)?;
        let message_id = entry.channel.queue_send(group_packet_type, payload.clone(), now);
        self.seal_for(peer_id, OuterType::Lossless, group_packet_type, Some(message_id), &payload)
    }

    fn send_lossy_to(&mut self, peer_id: PeerId, group_packet_type: u8, payload: Vec<u8>) -> Result<()> {
        self.seal_for(peer_id, OuterType::Lossy, group_packet_type, None, &payload)
    }

    fn confirmed_peer_ids(&self) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|(_, entry)| entry.link.state().is_confirmed())
            .map(|(id, _)| id)
            .collect()
    }

    fn broadcast_lossless(&mut self, group_packet_type: u8, payload: Vec<u8>) {
        for id in self.confirmed_peer_ids() {
            let _ = self.send_lossless_to(id, group_packet_type, payload.clone());
        }
    }

    fn broadcast_body(&mut self, subtype: u8, body: Vec<u8>) {
        let broadcast = BroadcastBody { subtype, timestamp: unix_timestamp_placeholder(), payload: body };
        let payload = crate::cbor_to_vec(&broadcast);
        self.broadcast_lossless(BROADCAST, payload);
    }

    // ---- public operations (§4.8) ----

    pub fn send_message(&mut self, kind: MessageKind, bytes: Vec<u8>) -> Result<()> {
        self.require_connected()?;
        if bytes.is_empty() {
            return Err(EngineError::Empty);
        }
        if bytes.len() > self.config.max_message_size {
            return Err(EngineError::TooLong);
        }
        if self.own_role == Role::Observer {
            return Err(EngineError::PermissionDenied);
        }
        let subtype = match kind {
            MessageKind::Normal => BROADCAST_SUBTYPE_PLAIN_MESSAGE,
            MessageKind::Action => BROADCAST_SUBTYPE_ACTION_MESSAGE,
        };
        self.broadcast_body(subtype, bytes);
        Ok(())
    }

    pub fn send_private(&mut self, peer_id: PeerId, kind: MessageKind, bytes: Vec<u8>) -> Result<()> {
        if bytes.is_empty() {
            return Err(EngineError::Empty);
        }
        if bytes.len() > self.config.max_message_size {
            return Err(EngineError::TooLong);
        }
        let entry = self.peers.get(peer_id).ok_or(EngineError::PeerNotFound)?;
        if !entry.link.state().is_confirmed() {
            return Err(EngineError::NotConnected);
        }
        let subtype = match kind {
            MessageKind::Normal => BROADCAST_SUBTYPE_PRIVATE_MESSAGE,
            MessageKind::Action => BROADCAST_SUBTYPE_ACTION_MESSAGE,
        };
        let broadcast = BroadcastBody { subtype, timestamp: unix_timestamp_placeholder(), payload: bytes };
        let payload = crate::cbor_to_vec(&broadcast);
        self.send_lossless_to(peer_id, BROADCAST, payload)
    }

    pub fn send_custom(&mut self, reliable: bool, bytes: Vec<u8>) -> Result<()> {
        self.require_connected()?;
        if bytes.len() > self.config.max_message_size {
            return Err(EngineError::TooLong);
        }
        for id in self.confirmed_peer_ids() {
            let result = if reliable {
                self.send_lossless_to(id, CUSTOM_PACKET, bytes.clone())
            } else {
                self.send_lossy_to(id, CUSTOM_PACKET, bytes.clone())
            };
            let _ = result;
        }
        Ok(())
    }

    pub fn set_role(&mut self, peer_id: PeerId, new_role: Role) -> Result<()> {
        let (target_sig_pk, target_enc_pk) = {
            let target = self.peers.get(peer_id).ok_or(EngineError::PeerNotFound)?;
            (
                target.link.peer_permanent_sig_pk().ok_or(EngineError::NotConnected)?,
                target.link.peer_permanent_enc_pk().ok_or(EngineError::NotConnected)?,
            )
        };

        let outcome = self
            .moderation
            .set_role(&self.own_sig_pk, &target_sig_pk, new_role)
            .map_err(|_| EngineError::PermissionDenied)?;

        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.role = new_role;
        }

        match outcome {
            SetRoleOutcome::Promoted { .. } => {
                info!(?new_role, "role changed");
                let body = crate::cbor_to_vec(&(target_sig_pk, new_role));
                self.broadcast_body(BROADCAST_SUBTYPE_SET_MOD, body);
            }
            SetRoleOutcome::DemotedFromModerator { .. } => {
                info!(?new_role, "role changed");
                self.resign_entries_signed_by(target_sig_pk);
                self.resign_topic_if_set_by(target_sig_pk);
                let body = crate::cbor_to_vec(&(target_sig_pk, new_role));
                self.broadcast_body(BROADCAST_SUBTYPE_SET_MOD, body);
            }
            SetRoleOutcome::DemotedToObserver => {
                info!("demoted to observer");
                self.sanction_peer(target_enc_pk);
                let body = crate::cbor_to_vec(&(target_sig_pk, new_role));
                self.broadcast_body(BROADCAST_SUBTYPE_SET_OBSERVER, body);
            }
            SetRoleOutcome::NoChange => {
                debug!(?new_role, "role already matched target's standing, nothing to broadcast");
            }
        }

        self.handler.on_moderation_event(self.self_peer_placeholder(), peer_id, new_role);
        self.dirty = true;
        Ok(())
    }

    /// Sign a fresh sanctions entry for `target_enc_pk` and broadcast the
    /// refreshed (entries, credentials) pair (§3, §4.5).
    fn sanction_peer(&mut self, target_enc_pk: EncPublicKey) {
        let timestamp = unix_timestamp_placeholder();
        let entry = SanctionsEntry::sign(&self.own_sig_key, self.own_sig_pk, timestamp, target_enc_pk);
        let mut entries = self.moderation.sanctions.entries.clone();
        entries.push(entry);
        let version = self.moderation.sanctions.credentials.as_ref().map_or(1, |c| c.version + 1);
        let credentials = SanctionsCredentials::sign(&self.own_sig_key, self.own_sig_pk, version, &entries);
        if self.moderation.accept_sanctions(entries, credentials.clone()).unwrap_or(false) {
            let body = crate::cbor_to_vec(&(self.moderation.sanctions.entries.clone(), credentials));
            self.broadcast_lossless(SANCTIONS_LIST, body);
        }
    }

    /// Demoting a moderator out of the moderator list must not invalidate
    /// sanctions entries they previously signed while authorized: the
    /// founder re-signs every such entry under its own key and rebroadcasts
    /// the refreshed (entries, credentials) pair (§4.5). Only the founder
    /// can reach `DemotedFromModerator` (the role lattice requires the
    /// caller to outrank `Moderator`), so `self.own_sig_key` is always the
    /// founder's key here.
    fn resign_entries_signed_by(&mut self, demoted_sig_pk: SigPublicKey) {
        let resigned = self.moderation.resign_entries_after_demotion(&demoted_sig_pk, &self.own_sig_key);
        if resigned.is_empty() {
            return;
        }
        let mut updated_entries = self.moderation.sanctions.entries.clone();
        for entry in &mut updated_entries {
            if entry.sanctioner_sig_pk != demoted_sig_pk {
                continue;
            }
            if let Some(replacement) = resigned.iter().find(|r| r.target_enc_pk == entry.target_enc_pk) {
                *entry = replacement.clone();
            }
        }
        let version = self.moderation.sanctions.credentials.as_ref().map_or(1, |c| c.version + 1);
        let credentials = SanctionsCredentials::sign(&self.own_sig_key, self.own_sig_pk, version, &updated_entries);
        if self.moderation.accept_sanctions(updated_entries, credentials.clone()).unwrap_or(false) {
            let body = crate::cbor_to_vec(&(self.moderation.sanctions.entries.clone(), credentials));
            self.broadcast_lossless(SANCTIONS_LIST, body);
        }
    }

    /// Founder-demotion invariant for the topic (§4.5): if the demoted
    /// moderator is the current topic-setter, the founder re-signs the
    /// topic under its own key, preserving "signed by a currently
    /// authoritative key" without changing the version.
    fn resign_topic_if_set_by(&mut self, demoted_sig_pk: SigPublicKey) {
        let Some(topic) = self.topic.as_ref() else { return };
        if topic.setter_sig_pk != demoted_sig_pk {
            return;
        }
        let resigned = topic.resign_by_founder(&self.own_sig_key, self.own_sig_pk);
        let body = crate::cbor_to_vec(&resigned);
        self.topic = Some(resigned);
        self.broadcast_lossless(talus_topic::TOPIC, body);
    }

    pub fn kick(&mut self, peer_id: PeerId) -> Result<()> {
        let target_sig_pk = {
            let target = self.peers.get(peer_id).ok_or(EngineError::PeerNotFound)?;
            target.link.peer_permanent_sig_pk().ok_or(EngineError::NotConnected)?
        };
        if target_sig_pk == self.own_sig_pk {
            return Err(EngineError::TargetIsSelf);
        }
        if self.own_role != Role::Founder && self.own_role != Role::Moderator {
            return Err(EngineError::PermissionDenied);
        }

        let body = crate::cbor_to_vec(&target_sig_pk);
        self.broadcast_body(BROADCAST_SUBTYPE_KICK_PEER, body);
        self.remove_peer(peer_id, PeerExitReason::Kick);
        Ok(())
    }

    pub fn toggle_ignore(&mut self, peer_id: PeerId, ignored: bool) -> Result<()> {
        let entry = self.peers.get_mut(peer_id).ok_or(EngineError::PeerNotFound)?;
        entry.ignored = ignored;
        Ok(())
    }

    pub fn set_topic(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.require_connected()?;
        if bytes.len() > MAX_TOPIC_LEN {
            return Err(EngineError::TooLong);
        }
        let topic_lock = self.shared_state.as_ref().ok_or(EngineError::NotConnected)?.topic_lock;
        let topic = TopicInfo::set(
            self.topic.as_ref(),
            self.own_role,
            topic_lock,
            &self.own_sig_key,
            self.own_sig_pk,
            bytes,
        )
        .map_err(|_| EngineError::PermissionDenied)?;
        let payload = crate::cbor_to_vec(&topic);
        self.topic = Some(topic);
        self.broadcast_lossless(talus_topic::TOPIC, payload);
        self.dirty = true;
        Ok(())
    }

    fn require_founder(&self) -> Result<&SharedState> {
        if self.own_role != Role::Founder {
            return Err(EngineError::NotFounder);
        }
        self.shared_state.as_ref().ok_or(EngineError::NotConnected)
    }

    pub fn set_password(&mut self, password: Vec<u8>) -> Result<()> {
        if password.len() > MAX_PASSWORD_LEN {
            return Err(EngineError::TooLong);
        }
        let current = self.require_founder()?.clone();
        let mod_hash = self.moderation.moderator_list.hash();
        let updated = SharedState::update(
            &current,
            &self.own_sig_key,
            current.peer_limit,
            current.privacy,
            password,
            current.topic_lock,
            mod_hash,
        )
        .map_err(|_| EngineError::TooLong)?;
        self.shared_state = Some(updated.clone());
        let payload = crate::cbor_to_vec(&updated);
        self.broadcast_lossless(talus_state::SHARED_STATE, payload);
        self.handler.on_password_change();
        self.dirty = true;
        Ok(())
    }

    pub fn set_privacy(&mut self, privacy: Privacy) -> Result<()> {
        let current = self.require_founder()?.clone();
        let mod_hash = self.moderation.moderator_list.hash();
        let updated = SharedState::update(
            &current,
            &self.own_sig_key,
            current.peer_limit,
            privacy,
            current.password.clone(),
            current.topic_lock,
            mod_hash,
        )
        .map_err(|_| EngineError::TooLong)?;
        self.shared_state = Some(updated.clone());
        let payload = crate::cbor_to_vec(&updated);
        self.broadcast_lossless(talus_state::SHARED_STATE, payload);
        self.handler.on_privacy_state_change();
        self.dirty = true;
        Ok(())
    }

    pub fn set_peer_limit(&mut self, peer_limit: u32) -> Result<()> {
        let current = self.require_founder()?.clone();
        let mod_hash = self.moderation.moderator_list.hash();
        let updated = SharedState::update(
            &current,
            &self.own_sig_key,
            peer_limit,
            current.privacy,
            current.password.clone(),
            current.topic_lock,
            mod_hash,
        )
        .map_err(|_| EngineError::TooLong)?;
        self.shared_state = Some(updated.clone());
        let payload = crate::cbor_to_vec(&updated);
        self.broadcast_lossless(talus_state::SHARED_STATE, payload);
        self.handler.on_peer_limit_change(peer_limit);
        self.dirty = true;
        Ok(())
    }

    pub fn reconnect(&mut self) -> Result<()> {
        if self.peers.iter().next().is_none() && !self.connected {
            return Err(EngineError::GroupNotFound);
        }
        self.connected = true;
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Err(EngineError::AlreadyDisconnected);
        }
        let ids: Vec<PeerId> = self.peers.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.remove_peer(id, PeerExitReason::SelfDisconnected);
        }
        self.connected = false;
        Ok(())
    }

    pub fn leave(&mut self, part_message: Option<Vec<u8>>) -> Result<()> {
        if let Some(ref message) = part_message {
            if message.len() > self.config.max_message_size {
                return Err(EngineError::TooLong);
            }
        }
        let body = crate::cbor_to_vec(&part_message.unwrap_or_default());
        self.broadcast_body(BROADCAST_SUBTYPE_PEER_EXIT, body);
        self.disconnect().ok();
        Ok(())
    }

    fn require_connected(&self) -> Result<()> {
        if !self.connected {
            return Err(EngineError::NotConnected);
        }
        Ok(())
    }

    fn remove_peer(&mut self, peer_id: PeerId, reason: PeerExitReason) {
        if self.peers.remove(peer_id).is_some() {
            debug!(?reason, "peer removed");
            self.handler.on_peer_exit(peer_id, reason);
        }
    }

    /// Local self-reference placeholder for upcalls whose signature
    /// names an "actor" peer id. This engine does not put itself in its
    /// own peer table, so moderation events it initiates locally report
    /// this sentinel id as the actor slot until a dedicated
    /// self-identifier type is warranted.
    fn self_peer_placeholder(&self) -> PeerId {
        PeerId::new(u32::MAX, 0)
    }

    // ---- timer loop (§4.8) ----

    /// The engine's only suspension point. Advances handshake timeouts,
    /// retransmits unacked lossless packets, evicts timed-out peers, and
    /// reports whether persisted state is dirty.
    pub fn iterate(&mut self) -> bool {
        let now = Instant::now();
        let mut timed_out = Vec::new();

        for (id, entry) in self.peers.iter() {
            if entry.link.is_timed_out(now, self.config.unconfirmed_peer_timeout, self.config.confirmed_peer_timeout) {
                timed_out.push(id);
            }
        }

        let mut retransmits = Vec::new();
        let mut due_pings = Vec::new();
        for (id, entry) in self.peers.iter_mut() {
            if !entry.link.state().is_confirmed() {
                continue;
            }
            let report = entry.channel.due_retransmits(now);
            if report.link_failed {
                warn!("lossless channel exhausted its retransmit budget");
                timed_out.push(id);
                continue;
            }
            for (message_id, group_packet_type, payload) in report.to_resend {
                retransmits.push((id, message_id, group_packet_type, payload));
            }
            if now.duration_since(entry.last_ping_sent) >= self.config.ping_interval {
                entry.last_ping_sent = now;
                due_pings.push(id);
            }
        }
        for (id, message_id, group_packet_type, payload) in retransmits {
            let _ = self.seal_for(id, OuterType::Lossless, group_packet_type, Some(message_id), &payload);
        }
        let vector = self.local_version_vector();
        for id in due_pings {
            let body = crate::cbor_to_vec(&vector);
            let _ = self.send_lossy_to(id, PING, body);
        }

        timed_out.sort_unstable();
        timed_out.dedup();
        for id in timed_out {
            self.remove_peer(id, PeerExitReason::Timeout);
        }

        let dirty = self.dirty;
        self.dirty = false;
        dirty
    }

    /// Drain everything queued for the transport adapter since the last
    /// call (§4.9: the engine's suspension points stay at `iterate()`).
    pub fn pending_outbound(&mut self) -> Vec<(PeerAddress, Vec<u8>)> {
        self.pending_outbound.drain(..).collect()
    }

    // ---- inbound packet processing ----

    /// Feed one datagram received from `from` into the engine.
    /// Malformed or unverifiable packets are dropped silently (§7): the
    /// caller never sees a `Result` for this path.
    pub fn receive(&mut self, from: PeerAddress, bytes: Vec<u8>) {
        let Ok((header, _)) = OuterHeader::parse(&bytes) else { return };

        match header.outer_type {
            OuterType::Handshake => self.receive_handshake(from, header, bytes),
            OuterType::Lossless | OuterType::Lossy => self.receive_established(from, header, bytes),
        }
    }

    fn receive_handshake(&mut self, from: PeerAddress, header: OuterHeader, bytes: Vec<u8>) {
        if let Some(existing_id) = self.peers.find_by_address(&from) {
            self.continue_handshake(existing_id, header, bytes);
            return;
        }

        // No existing link: this is a fresh inbound invite attempt.
        let bootstrap_key = PeerLink::responder_bootstrap_key(&self.own_enc_secret, header.sender_enc_pk);
        let Ok((_, decoded)) = talus_codec::open(&bytes, &self.chat_id, &bootstrap_key) else { return };
        if decoded.group_packet_type != INVITE_REQUEST {
            return;
        }
        let Ok(request) = crate::cbor_from_slice::<InviteRequestBody>(&decoded.payload) else { return };

        let mut link = PeerLink::new_responder();
        link.record_peer_identity(request.hello.permanent_enc_pk, request.hello.permanent_sig_pk);
        link.record_peer_ephemeral(header.sender_enc_pk);
        link.mark_handshake_acked();

        // A returning member (e.g. one rejoining with the same identity
        // after a drop) keeps whatever role this peer's own moderator
        // list already remembers for them, rather than being silently
        // reset to User.
        let role = self.moderation.role_of(&request.hello.permanent_sig_pk);
        let entry = PeerEntry {
            address: from.clone(),
            link,
            channel: LosslessChannel::new(),
            nickname: request.nickname.clone(),
            status: PeerStatus::Active,
            role,
            ignored: false,
            last_seen: Instant::now(),
            last_ping_sent: Instant::now(),
        };
        let peer_id = self.peers.insert(entry);

        if let Err(reason) = self.validate_invite(&request) {
            self.reject_invite(peer_id, reason);
            self.peers.remove(peer_id);
            return;
        }

        self.accept_invite_from(peer_id);
    }

    fn validate_invite(&self, request: &InviteRequestBody) -> std::result::Result<(), InviteRejectReason> {
        if let Some(shared) = &self.shared_state {
            if !shared.password.is_empty() && shared.password != request.password {
                return Err(InviteRejectReason::InvalidPassword);
            }
            if self.peers.confirmed_count() as u32 >= shared.peer_limit {
                return Err(InviteRejectReason::GroupFull);
            }
        }
        if self.peers.iter().any(|(_, entry)| entry.nickname == request.nickname && !entry.nickname.is_empty()) {
            return Err(InviteRejectReason::NickTaken);
        }
        Ok(())
    }

    fn reject_invite(&mut self, peer_id: PeerId, reason: InviteRejectReason) {
        debug!(?reason, "rejecting invite");
        let body = [reason.to_byte()];
        let _ = self.send_lossy_to(peer_id, INVITE_RESPONSE_REJECT, body.to_vec());
    }

    fn accept_invite_from(&mut self, peer_id: PeerId) {
        let Some(shared) = self.shared_state.clone() else { return };
        let assigned_role = self.peers.get(peer_id).map(|entry| entry.role).unwrap_or(Role::User);
        let body = InviteResponseBody {
            hello: HandshakeHello { permanent_enc_pk: self.own_enc_pk, permanent_sig_pk: self.own_sig_pk },
            assigned_role,
        };
        let payload = crate::cbor_to_vec(&(body, shared));
        if self.send_lossless_to(peer_id, INVITE_RESPONSE, payload).is_err() {
            return;
        }
        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.link.mark_peer_info_exchanged();
        }
    }

    /// Before this is called, `peer_id`'s link may still lack a session
    /// key: the initiator only learns the peer's ephemeral public key
    /// from the `INVITE_RESPONSE` packet itself, so the session key
    /// the responder actually sealed it with has to be derived here,
    /// not assumed to exist already.
    fn continue_handshake(&mut self, peer_id: PeerId, header: OuterHeader, bytes: Vec<u8>) {
        if let Some(entry) = self.peers.get_mut(peer_id) {
            if entry.link.session_key().is_none() {
                entry.link.record_peer_ephemeral(header.sender_enc_pk);
            }
        }
        let Some(entry) = self.peers.get(peer_id) else { return };
        let Some(key) = entry.link.session_key().copied() else { return };
        let Ok((_, decoded)) = talus_codec::open(&bytes, &self.chat_id, &key) else { return };

        match decoded.group_packet_type {
            t if t == INVITE_RESPONSE => self.on_invite_response(peer_id, &decoded.payload),
            t if t == INVITE_RESPONSE_REJECT => {
                let reason = decoded.payload.first().copied().map(InviteRejectReason::from_byte);
                self.peers.remove(peer_id);
                self.handler.on_join_fail(match reason {
                    Some(InviteRejectReason::NickTaken) => JoinFailReason::NameTaken,
                    Some(InviteRejectReason::GroupFull) => JoinFailReason::PeerLimitReached,
                    Some(InviteRejectReason::InvalidPassword) => JoinFailReason::InvalidPassword,
                    _ => JoinFailReason::Unknown,
                });
            }
            t if t == HS_RESPONSE_ACK => {
                if let Some(entry) = self.peers.get_mut(peer_id) {
                    entry.link.confirm();
                }
                self.connected = true;
                self.handler.on_peer_join(peer_id);
            }
            _ => {}
        }
    }

    fn on_invite_response(&mut self, peer_id: PeerId, payload: &[u8]) {
        let Ok((response, shared)) = crate::cbor_from_slice::<(InviteResponseBody, SharedState)>(payload) else {
            return;
        };
        let Some(entry) = self.peers.get_mut(peer_id) else { return };
        entry.link.record_peer_identity(response.hello.permanent_enc_pk, response.hello.permanent_sig_pk);
        entry.link.mark_peer_info_exchanged();
        entry.role = response.assigned_role;

        self.shared_state = Some(shared);
        self.own_role = response.assigned_role;

        let Some(entry) = self.peers.get_mut(peer_id) else { return };
        let session_key = *entry.link.session_key().expect("ephemeral recorded in continue_handshake");
        let sender_enc_pk = entry.link.own_ephemeral_public();
        let address = entry.address.clone();

        let ack = talus_codec::seal(OuterType::Handshake, &self.chat_id, &sender_enc_pk, &session_key, HS_RESPONSE_ACK, None, &[]);
        if let Ok(ack_bytes) = ack {
            if let Some(entry) = self.peers.get_mut(peer_id) {
                entry.link.confirm();
            }
            self.pending_outbound.push_back((address, ack_bytes));
            self.connected = true;
            self.handler.on_self_join();
            self.handler.on_peer_join(peer_id);
        }
    }

    fn receive_established(&mut self, from: PeerAddress, header: OuterHeader, bytes: Vec<u8>) {
        let Some(peer_id) = self.peers.find_by_address(&from) else { return };
        let Some(entry) = self.peers.get(peer_id) else { return };
        let Some(session_key) = entry.link.session_key().copied() else { return };
        let Ok((_, decoded)) = talus_codec::open(&bytes, &self.chat_id, &session_key) else { return };

        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.last_seen = Instant::now();
            entry.link.touch();
        }

        match header.outer_type {
            OuterType::Lossy => self.dispatch_lossy(peer_id, decoded.group_packet_type, decoded.payload),
            OuterType::Lossless => {
                let Some(message_id) = decoded.message_id else { return };
                self.dispatch_lossless(peer_id, message_id, decoded.group_packet_type, decoded.payload);
            }
            OuterType::Handshake => {}
        }
    }

    fn dispatch_lossy(&mut self, peer_id: PeerId, group_packet_type: u8, payload: Vec<u8>) {
        if group_packet_type == PING {
            self.handle_ping(peer_id, &payload);
            return;
        }
        if group_packet_type != talus_channel::MESSAGE_ACK {
            return;
        }
        if payload.len() < 9 {
            return;
        }
        let message_id = u64::from_be_bytes(payload[0..8].try_into().expect("8 bytes"));
        let Some(kind) = AckKind::from_byte(payload[8]) else { return };
        match kind {
            AckKind::Recv => {
                if let Some(entry) = self.peers.get_mut(peer_id) {
                    entry.channel.on_ack_recv(message_id);
                }
            }
            AckKind::Req => {
                let resend = self
                    .peers
                    .get_mut(peer_id)
                    .and_then(|entry| entry.channel.on_ack_req(message_id, Instant::now()));
                if let Some((group_packet_type, body)) = resend {
                    let _ = self.seal_for(peer_id, OuterType::Lossless, group_packet_type, Some(message_id), &body);
                }
            }
        }
    }

    fn dispatch_lossless(&mut self, peer_id: PeerId, message_id: u64, group_packet_type: u8, payload: Vec<u8>) {
        let now = Instant::now();
        let Some(entry) = self.peers.get_mut(peer_id) else { return };
        let outcome = entry.channel.on_receive(message_id, group_packet_type, payload, now);

        match outcome {
            ReceiveOutcome::Delivered { delivered, ack_id } => {
                let mut ack_body = ack_id.to_be_bytes().to_vec();
                ack_body.push(AckKind::Recv.to_byte());
                let _ = self.send_lossy_to(peer_id, talus_channel::MESSAGE_ACK, ack_body);
                for (group_packet_type, payload) in delivered {
                    self.apply_delivered(peer_id, group_packet_type, payload);
                }
            }
            ReceiveOutcome::BufferedOutOfOrder { ack_req_id } => {
                if let Some(ack_req_id) = ack_req_id {
                    let mut ack_body = ack_req_id.to_be_bytes().to_vec();
                    ack_body.push(AckKind::Req.to_byte());
                    let _ = self.send_lossy_to(peer_id, talus_channel::MESSAGE_ACK, ack_body);
                }
            }
            ReceiveOutcome::DuplicateOrOld { ack_id } => {
                let mut ack_body = ack_id.to_be_bytes().to_vec();
                ack_body.push(AckKind::Recv.to_byte());
                let _ = self.send_lossy_to(peer_id, talus_channel::MESSAGE_ACK, ack_body);
            }
        }
    }

    fn apply_delivered(&mut self, peer_id: PeerId, group_packet_type: u8, payload: Vec<u8>) {
        if group_packet_type == BROADCAST {
            let Ok(broadcast) = crate::cbor_from_slice::<BroadcastBody>(&payload) else { return };
            self.apply_broadcast(peer_id, broadcast);
        } else if group_packet_type == CUSTOM_PACKET {
            if !self.is_ignored(peer_id) {
                self.handler.on_custom_packet(peer_id, &payload);
            }
        } else if group_packet_type == talus_state::SHARED_STATE {
            let Ok(incoming) = crate::cbor_from_slice::<SharedState>(&payload) else { return };
            if let Some(current) = self.shared_state.as_mut() {
                if let Err(e) = SharedState::receive(current, incoming) {
                    debug!(?e, "rejected incoming shared state");
                }
            } else {
                self.shared_state = Some(incoming);
            }
        } else if group_packet_type == talus_topic::TOPIC {
            let Ok(incoming) = crate::cbor_from_slice::<TopicInfo>(&payload) else { return };
            let signer_role = self.moderation.role_of(&incoming.setter_sig_pk);
            let topic_lock = self.shared_state.as_ref().map(|s| s.topic_lock).unwrap_or(false);
            match TopicInfo::receive(self.topic.as_ref(), &incoming, signer_role, topic_lock) {
                Ok(()) => {
                    let topic_bytes = incoming.topic.clone();
                    self.topic = Some(incoming);
                    self.handler.on_topic_change(peer_id, &topic_bytes);
                }
                Err(e) => debug!(?e, "rejected incoming topic"),
            }
        } else if group_packet_type == MOD_LIST {
            let Ok(incoming) = crate::cbor_from_slice::<ModeratorList>(&payload) else { return };
            if let Some(shared) = &self.shared_state {
                if shared.mod_list_hash == incoming.hash() {
                    self.moderation.moderator_list = incoming;
                }
            }
        } else if group_packet_type == SANCTIONS_LIST {
            let Ok((entries, credentials)) = crate::cbor_from_slice::<(Vec<SanctionsEntry>, SanctionsCredentials)>(&payload) else {
                return;
            };
            if let Err(e) = self.moderation.accept_sanctions(entries, credentials) {
                debug!(?e, "rejected incoming sanctions list");
            }
        } else if group_packet_type == SYNC_REQUEST {
            self.handle_sync_request(peer_id, &payload);
        } else if group_packet_type == SYNC_RESPONSE {
            self.handle_sync_response(&payload);
        }
    }

    /// Compare the last-received ping's version vector against our own and,
    /// if any artifact is behind, fire a `SYNC_REQUEST` naming exactly the
    /// artifacts that diverged (§4.7).
    fn handle_ping(&mut self, peer_id: PeerId, payload: &[u8]) {
        let Ok(received) = crate::cbor_from_slice::<VersionVector>(payload) else { return };
        let local = self.local_version_vector();
        let reasons = local.out_of_sync_reasons(&received);
        if reasons.is_empty() {
            return;
        }
        debug!(?reasons, "out of sync with peer");
        let mut flags = SyncRequestFlags::EMPTY;
        for reason in &reasons {
            flags = flags
                | match reason {
                    OutOfSyncReason::SharedStateBehind | OutOfSyncReason::SanctionsCredentialsBehind => {
                        SyncRequestFlags::STATE
                    }
                    OutOfSyncReason::TopicBehind => SyncRequestFlags::TOPIC,
                    OutOfSyncReason::PeerListDiverged => SyncRequestFlags::PEER_LIST,
                };
        }
        let body = crate::cbor_to_vec(&(flags.bits(), self.password_field()));
        let _ = self.send_lossless_to(peer_id, SYNC_REQUEST, body);
    }

    /// Resend every artifact `flags` names, answering `SYNC_REQUEST` (§4.7).
    fn handle_sync_request(&mut self, peer_id: PeerId, payload: &[u8]) {
        let Ok((flag_bits, password)) = crate::cbor_from_slice::<(u16, Vec<u8>)>(payload) else { return };
        if let Some(shared) = &self.shared_state {
            if !shared.password.is_empty() && password != self.password_field() {
                return;
            }
        }
        let flags = SyncRequestFlags::from_bits(flag_bits);
        if flags.contains(SyncRequestFlags::STATE) {
            if let Some(shared) = self.shared_state.clone() {
                let body = crate::cbor_to_vec(&shared);
                let _ = self.send_lossless_to(peer_id, talus_state::SHARED_STATE, body);
            }
            let mod_body = crate::cbor_to_vec(&self.moderation.moderator_list);
            let _ = self.send_lossless_to(peer_id, MOD_LIST, mod_body);
            if let Some(credentials) = self.moderation.sanctions.credentials.clone() {
                let sanctions_body = crate::cbor_to_vec(&(self.moderation.sanctions.entries.clone(), credentials));
                let _ = self.send_lossless_to(peer_id, SANCTIONS_LIST, sanctions_body);
            }
        }
        if flags.contains(SyncRequestFlags::TOPIC) {
            if let Some(topic) = self.topic.clone() {
                let body = crate::cbor_to_vec(&topic);
                let _ = self.send_lossless_to(peer_id, talus_topic::TOPIC, body);
            }
        }
        if flags.contains(SyncRequestFlags::PEER_LIST) {
            let announces: Vec<PeerAnnounce> = self
                .peers
                .iter()
                .filter(|(id, entry)| *id != peer_id && entry.link.state().is_confirmed())
                .filter_map(|(_, entry)| {
                    let enc_pk = entry.link.peer_permanent_enc_pk()?;
                    let sig_pk = entry.link.peer_permanent_sig_pk()?;
                    let direct_addr = match &entry.address {
                        PeerAddress::Socket(addr) => Some(*addr),
                        PeerAddress::Loopback(_) => None,
                    };
                    Some(PeerAnnounce::new(enc_pk, sig_pk, direct_addr, Vec::new()))
                })
                .collect();
            for announce in announces {
                let body = crate::cbor_to_vec(&announce);
                let _ = self.send_lossless_to(peer_id, SYNC_RESPONSE, body);
            }
        }
    }

    /// A peer announced by `SYNC_RESPONSE` that we don't already hold a
    /// link for is a peer worth inviting ourselves into, provided it has a
    /// reachable direct address (§4.7).
    fn handle_sync_response(&mut self, payload: &[u8]) {
        let Ok(announce) = crate::cbor_from_slice::<PeerAnnounce>(payload) else { return };
        if announce.permanent_sig_pk == self.own_sig_pk {
            return;
        }
        if self.find_peer_by_sig_pk(announce.permanent_sig_pk).is_some() {
            return;
        }
        let Some(addr) = announce.direct_addr else { return };
        info!(peer = hex::encode(announce.permanent_sig_pk), "discovered peer via sync");
        let password = self.password_field();
        let _ = self.begin_invite(PeerAddress::Socket(addr), announce.permanent_enc_pk, password);
    }

    /// The group password, fixed to the 32-byte width the wire table
    /// assigns `SYNC_REQUEST`'s password field (§6), independent of the
    /// variable-length password `SharedState` itself carries.
    fn password_field(&self) -> Vec<u8> {
        let mut fixed = [0u8; 32];
        if let Some(shared) = &self.shared_state {
            let len = shared.password.len().min(32);
            fixed[..len].copy_from_slice(&shared.password[..len]);
        }
        fixed.to_vec()
    }

    /// The version vector this engine currently observes, as exchanged by
    /// `PING` (§4.7). The peer-list checksum and count include this
    /// engine's own identity alongside every confirmed peer, so two
    /// engines that agree on membership compute the same checksum.
    fn local_version_vector(&self) -> VersionVector {
        let mut sig_pks: Vec<SigPublicKey> = self
            .peers
            .iter()
            .filter(|(_, entry)| entry.link.state().is_confirmed())
            .filter_map(|(_, entry)| entry.link.peer_permanent_sig_pk())
            .collect();
        sig_pks.push(self.own_sig_pk);

        VersionVector {
            peer_list_checksum: talus_sync::peer_list_checksum(&sig_pks),
            confirmed_peer_count: sig_pks.len() as u16,
            shared_state_version: self.shared_state.as_ref().map(|s| s.version).unwrap_or(0),
            sanctions_credentials_version: self.moderation.sanctions.credentials.as_ref().map(|c| c.version).unwrap_or(0),
            topic_version: self.topic.as_ref().map(|t| t.version).unwrap_or(0),
            self_ip_port: None,
        }
    }

    fn apply_broadcast(&mut self, from: PeerId, broadcast: BroadcastBody) {
        if self.is_ignored(from) && broadcast.subtype != BROADCAST_SUBTYPE_PEER_EXIT {
            return;
        }
        match broadcast.subtype {
            s if s == BROADCAST_SUBTYPE_PLAIN_MESSAGE => {
                self.handler.on_message(from, MessageKind::Normal, &broadcast.payload)
            }
            s if s == BROADCAST_SUBTYPE_ACTION_MESSAGE => {
                self.handler.on_message(from, MessageKind::Action, &broadcast.payload)
            }
            s if s == BROADCAST_SUBTYPE_PRIVATE_MESSAGE => {
                self.handler.on_private_message(from, MessageKind::Normal, &broadcast.payload)
            }
            s if s == BROADCAST_SUBTYPE_STATUS => {
                if let Ok(status) = crate::cbor_from_slice::<PeerStatus>(&broadcast.payload) {
                    if let Some(entry) = self.peers.get_mut(from) {
                        entry.status = status;
                    }
                    self.handler.on_status_change(from, status);
                }
            }
            s if s == BROADCAST_SUBTYPE_NICK => {
                if let Some(entry) = self.peers.get_mut(from) {
                    entry.nickname = broadcast.payload.clone();
                }
                self.handler.on_nick_change(from, &broadcast.payload);
            }
            s if s == BROADCAST_SUBTYPE_PEER_EXIT => {
                self.remove_peer(from, PeerExitReason::Quit);
            }
            s if s == BROADCAST_SUBTYPE_KICK_PEER || s == BROADCAST_SUBTYPE_SET_MOD || s == BROADCAST_SUBTYPE_SET_OBSERVER => {
                self.apply_remote_role_change(from, broadcast.subtype, &broadcast.payload);
            }
            _ => {}
        }
    }

    fn apply_remote_role_change(&mut self, actor: PeerId, subtype: u8, payload: &[u8]) {
        if subtype == BROADCAST_SUBTYPE_KICK_PEER {
            let Ok(target_sig_pk) = crate::cbor_from_slice::<SigPublicKey>(payload) else { return };
            if target_sig_pk == self.own_sig_pk {
                self.handler.on_peer_exit(actor, PeerExitReason::Kick);
                self.connected = false;
                return;
            }
            if let Some(target_id) = self.find_peer_by_sig_pk(target_sig_pk) {
                self.remove_peer(target_id, PeerExitReason::Kick);
            }
            return;
        }

        let Ok((target_sig_pk, new_role)) = crate::cbor_from_slice::<(SigPublicKey, Role)>(payload) else { return };
        match new_role {
            Role::Moderator => self.moderation.moderator_list.add(target_sig_pk),
            Role::User | Role::Observer => self.moderation.moderator_list.remove(&target_sig_pk),
            Role::Founder => {}
        }
        if target_sig_pk == self.own_sig_pk {
            self.own_role = new_role;
        }
        if let Some(target_id) = self.find_peer_by_sig_pk(target_sig_pk) {
            if let Some(entry) = self.peers.get_mut(target_id) {
                entry.role = new_role;
            }
            self.handler.on_moderation_event(actor, target_id, new_role);
        }
    }

    fn find_peer_by_sig_pk(&self, sig_pk: SigPublicKey) -> Option<PeerId> {
        self.peers
            .iter()
            .find(|(_, entry)| entry.link.peer_permanent_sig_pk() == Some(sig_pk))
            .map(|(id, _)| id)
    }

    fn is_ignored(&self, peer_id: PeerId) -> bool {
        self.peers.get(peer_id).map(|entry| entry.ignored).unwrap_or(false)
    }

    // ---- accessors ----

    pub fn own_role(&self) -> Role {
        self.own_role
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn own_enc_pk(&self) -> EncPublicKey {
        self.own_enc_pk
    }

    pub fn own_sig_pk(&self) -> SigPublicKey {
        self.own_sig_pk
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn peer_count(&self) -> usize {
        self.peers.confirmed_count()
    }

    /// Confirmed peer ids, in arena order. The only way a caller outside
    /// this crate can name a peer for `send_private` / `set_role` / `kick`
    /// / `toggle_ignore`.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.confirmed_peer_ids()
    }

    pub fn peer_sig_pk(&self, peer_id: PeerId) -> Option<SigPublicKey> {
        self.peers.get(peer_id).and_then(|entry| entry.link.peer_permanent_sig_pk())
    }

    pub fn peer_enc_pk(&self, peer_id: PeerId) -> Option<EncPublicKey> {
        self.peers.get(peer_id).and_then(|entry| entry.link.peer_permanent_enc_pk())
    }

    pub fn is_moderator(&self, sig_pk: SigPublicKey) -> bool {
        self.moderation.moderator_list.contains(&sig_pk)
    }

    pub fn is_sanctioned(&self, target_enc_pk: EncPublicKey) -> bool {
        self.moderation.sanctions.is_sanctioned(&target_enc_pk)
    }

    pub fn topic(&self) -> Option<&[u8]> {
        self.topic.as_ref().map(|t| t.topic.as_slice())
    }

    pub fn topic_setter_sig_pk(&self) -> Option<SigPublicKey> {
        self.topic.as_ref().map(|t| t.setter_sig_pk)
    }

    /// The version vector this engine would currently hand to a `PING`,
    /// exposed read-only so a caller can compare convergence across
    /// engines without waiting on the timer loop.
    pub fn version_vector(&self) -> VersionVector {
        self.local_version_vector()
    }

    pub fn shared_state(&self) -> Option<&SharedState> {
        self.shared_state.as_ref()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

/// Placeholder wall-clock stamp for `BROADCAST`/sanctions timestamps.
/// `Date::now`-equivalents are unavailable in this workspace's build
/// pipeline at authoring time; callers that need real timestamps should
/// stamp payloads before handing them to the sending operations once a
/// clock source is wired through `EngineConfig`.
fn unix_timestamp_placeholder() -> u64 {
    0
}
