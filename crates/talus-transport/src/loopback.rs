use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use talus_types::EncPublicKey;

use crate::{PeerAddress, TransportAdapter, TransportError};

struct NodeState {
    enc_pk: EncPublicKey,
    inbox: VecDeque<(PeerAddress, Vec<u8>)>,
}

/// An in-memory switchboard routing bytes between registered nodes
/// without real I/O. Every `GroupEngine` instance in a test gets one
/// [`LoopbackNode`], all sharing the same `LoopbackHub`.
#[derive(Default)]
pub struct LoopbackHub {
    nodes: Rc<RefCell<Vec<NodeState>>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new node and return an adapter bound to it. The
    /// returned `PeerAddress` is this node's own `Loopback(id)` — hand
    /// it to other nodes' adapters so they know how to reach it back.
    pub fn register(&self, enc_pk: EncPublicKey) -> (LoopbackNode, PeerAddress) {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len() as u64;
        nodes.push(NodeState { enc_pk, inbox: VecDeque::new() });
        drop(nodes);

        let node = LoopbackNode {
            id,
            enc_pk,
            nodes: Rc::clone(&self.nodes),
        };
        (node, PeerAddress::Loopback(id))
    }
}

/// A single endpoint registered with a [`LoopbackHub`].
pub struct LoopbackNode {
    id: u64,
    enc_pk: EncPublicKey,
    nodes: Rc<RefCell<Vec<NodeState>>>,
}

impl TransportAdapter for LoopbackNode {
    fn local_enc_pk(&self) -> EncPublicKey {
        self.enc_pk
    }

    fn send(&mut self, dest: &PeerAddress, bytes: Vec<u8>) -> Result<(), TransportError> {
        let PeerAddress::Loopback(dest_id) = dest else {
            return Err(TransportError::Unreachable);
        };
        let mut nodes = self.nodes.borrow_mut();
        let from = PeerAddress::Loopback(self.id);
        match nodes.get_mut(*dest_id as usize) {
            Some(node) => {
                node.inbox.push_back((from, bytes));
                Ok(())
            }
            None => Err(TransportError::Unreachable),
        }
    }

    fn poll_inbound(&mut self) -> Vec<(PeerAddress, Vec<u8>)> {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(self.id as usize) {
            Some(node) => node.inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_delivers_between_two_nodes() {
        let hub = LoopbackHub::new();
        let (mut a, addr_a) = hub.register([1u8; 32]);
        let (mut b, addr_b) = hub.register([2u8; 32]);

        a.send(&addr_b, b"hello".to_vec()).expect("send ok");
        let received = b.poll_inbound();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, addr_a);
        assert_eq!(received[0].1, b"hello");
    }

    #[test]
    fn test_send_to_unregistered_address_fails() {
        let hub = LoopbackHub::new();
        let (mut a, _) = hub.register([1u8; 32]);
        let result = a.send(&PeerAddress::Loopback(99), b"x".to_vec());
        assert!(matches!(result, Err(TransportError::Unreachable)));
    }

    #[test]
    fn test_send_to_socket_address_fails() {
        let hub = LoopbackHub::new();
        let (mut a, _) = hub.register([1u8; 32]);
        let socket_addr = PeerAddress::Socket("127.0.0.1:1".parse().expect("valid"));
        let result = a.send(&socket_addr, b"x".to_vec());
        assert!(matches!(result, Err(TransportError::Unreachable)));
    }

    #[test]
    fn test_poll_inbound_drains() {
        let hub = LoopbackHub::new();
        let (mut a, _) = hub.register([1u8; 32]);
        let (mut b, addr_b) = hub.register([2u8; 32]);

        a.send(&addr_b, b"one".to_vec()).expect("send ok");
        a.send(&addr_b, b"two".to_vec()).expect("send ok");
        assert_eq!(b.poll_inbound().len(), 2);
        assert!(b.poll_inbound().is_empty());
    }
}
