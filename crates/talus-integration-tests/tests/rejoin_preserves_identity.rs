//! Saving and resuming a membership across a simulated process restart
//! preserves the peer's permanent identity and earned role — a promoted
//! moderator who drops and rejoins is recognized, not treated as a new
//! stranger (testable property 7, §6).

use talus_engine::EngineConfig;
use talus_integration_tests::{all_connected, pump, resume_peer, spawn_founder, spawn_joiner};
use talus_state::Privacy;
use talus_transport::LoopbackHub;
use talus_types::Role;

#[test]
fn test_promoted_member_keeps_identity_and_role_across_rejoin() {
    let hub = LoopbackHub::new();

    let mut founder = spawn_founder(&hub, EngineConfig::default(), Privacy::Public, b"archive", b"founder");
    let mut member = spawn_joiner(
        &hub,
        EngineConfig::default(),
        founder.address.clone(),
        founder.engine.own_enc_pk(),
        founder.engine.chat_id(),
        Vec::new(),
        b"member",
    );
    let mut peers = vec![founder, member];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));
    founder = peers.remove(0);
    member = peers.remove(0);

    let member_target = founder.engine.peer_ids()[0];
    founder.engine.set_role(member_target, Role::Moderator).expect("promote");
    let mut peers = vec![founder, member];
    pump(&mut peers, 32, |p| p[1].engine.is_moderator(p[1].engine.own_sig_pk()));
    founder = peers.remove(0);
    member = peers.remove(0);
    assert_eq!(member.engine.own_role(), Role::Moderator);

    let record = member.engine.save(true).expect("save ok");
    let member_enc_pk = member.engine.own_enc_pk();
    let member_sig_pk = member.engine.own_sig_pk();

    // `leave` (not a bare `disconnect`) so founder is told to drop the
    // stale peer entry before the same identity reconnects.
    member.engine.leave(None).expect("leave ok");
    let mut peers = vec![founder, member];
    pump(&mut peers, 32, |p| p[0].engine.peer_count() == 0);
    founder = peers.remove(0);
    let _dropped_member = peers.remove(0);

    let resumed = resume_peer(&hub, EngineConfig::default(), record, founder.address.clone(), founder.engine.own_enc_pk());
    assert_eq!(resumed.engine.own_enc_pk(), member_enc_pk);
    assert_eq!(resumed.engine.own_sig_pk(), member_sig_pk);

    let mut peers = vec![founder, resumed];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));

    assert_eq!(peers[1].engine.own_role(), Role::Moderator, "rejoining moderator must not be demoted to User");
    assert!(peers[0].engine.is_moderator(member_sig_pk));
}
