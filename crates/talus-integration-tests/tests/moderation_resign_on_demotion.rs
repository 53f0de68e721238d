//! A demoted moderator's sanctions entries must be re-signed by the
//! founder and still be accepted by a peer who joins after the
//! demotion, once sync has propagated the refreshed credentials
//! (testable property 2, §4.5).

use std::time::Duration;

use talus_engine::EngineConfig;
use talus_integration_tests::{all_connected, pump, spawn_founder, spawn_joiner, Peer};
use talus_state::Privacy;
use talus_transport::LoopbackHub;
use talus_types::Role;

fn fast_sync_config() -> EngineConfig {
    EngineConfig { ping_interval: Duration::ZERO, ..EngineConfig::default() }
}

#[test]
fn test_late_joiner_accepts_sanction_resigned_by_founder() {
    let hub = LoopbackHub::new();

    let mut founder = spawn_founder(&hub, fast_sync_config(), Privacy::Public, b"council", b"founder");
    let mut moderator = spawn_joiner(
        &hub,
        fast_sync_config(),
        founder.address.clone(),
        founder.engine.own_enc_pk(),
        founder.engine.chat_id(),
        Vec::new(),
        b"moderator",
    );
    let mut peers = vec![founder, moderator];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));
    founder = peers.remove(0);
    moderator = peers.remove(0);

    // moderator invites user directly, so user ends up meshed with
    // moderator (not the founder) the way the sanction will travel.
    let mut user = spawn_joiner(
        &hub,
        fast_sync_config(),
        moderator.address.clone(),
        moderator.engine.own_enc_pk(),
        moderator.engine.chat_id(),
        Vec::new(),
        b"user",
    );
    let mut peers = vec![moderator, user];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));
    moderator = peers.remove(0);
    user = peers.remove(0);

    // founder promotes moderator; propagate to moderator.
    let moderator_target = founder.engine.peer_ids()[0];
    founder.engine.set_role(moderator_target, Role::Moderator).expect("promote");
    let mut peers = vec![founder, moderator];
    pump(&mut peers, 32, |p| p[1].engine.is_moderator(p[1].engine.own_sig_pk()));
    founder = peers.remove(0);
    moderator = peers.remove(0);

    // moderator sanctions user down to Observer.
    let user_enc_pk = user.engine.own_enc_pk();
    let user_target = moderator
        .engine
        .peer_ids()
        .into_iter()
        .find(|id| moderator.engine.peer_enc_pk(*id) == Some(user_enc_pk))
        .expect("moderator has a direct link to user");
    moderator.engine.set_role(user_target, Role::Observer).expect("sanction");
    let mut peers = vec![moderator, user];
    pump(&mut peers, 32, |p| p[1].engine.is_sanctioned(user_enc_pk));
    moderator = peers.remove(0);
    user = peers.remove(0);

    // founder demotes moderator back to User: the sanction moderator
    // signed must now be re-signed under the founder's key.
    let mut peers = vec![founder, moderator];
    let moderator_id_at_founder = peers[0].engine.peer_ids()[0];
    peers[0].engine.set_role(moderator_id_at_founder, Role::User).expect("demote");
    pump(&mut peers, 32, |p| !p[1].engine.is_moderator(p[1].engine.own_sig_pk()));
    founder = peers.remove(0);
    moderator = peers.remove(0);

    // a late joiner, entering through moderator, must still end up
    // accepting the (now founder-resigned) sanction once sync runs.
    let late_joiner = spawn_joiner(
        &hub,
        fast_sync_config(),
        moderator.address.clone(),
        moderator.engine.own_enc_pk(),
        moderator.engine.chat_id(),
        Vec::new(),
        b"late-joiner",
    );
    // founder stays in the pool: it is the only source of the re-signed
    // SANCTIONS_LIST broadcast to moderator, and a lossless retransmit
    // still in flight must not get stranded by dropping founder here.
    let mut peers = vec![founder, moderator, user, late_joiner];
    pump(&mut peers, 64, |p: &[Peer]| p[3].engine.is_sanctioned(user_enc_pk));

    assert!(peers[3].engine.is_sanctioned(user_enc_pk));
}
