//! Transport Capability
//!
//! The core does not own a socket. It talks to an opaque `Transport` that
//! can send to a peer, broadcast, and hand back whatever arrived since the
//! last poll. UDP, TCP, relays - all external; tests use the in-memory hub
//! below.
//!
//! Threading: the engine model is single-threaded cooperative. A transport
//! driven by its own I/O thread must marshal received data into the game
//! loop thread before `poll` returns it.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// Opaque peer identifier assigned by the transport.
pub type PeerId = u64;

/// Delivery guarantee requested for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    /// Delivered exactly once, in send order (commands, control plane).
    ReliableOrdered,
    /// Fire and forget (ping/pong).
    Unreliable,
}

/// The wire capability the network service is built over.
pub trait Transport {
    /// This endpoint's peer id.
    fn local_peer(&self) -> PeerId;

    /// Send to one peer.
    fn send(&mut self, peer: PeerId, bytes: &[u8], reliability: Reliability);

    /// Send to every other peer.
    fn broadcast(&mut self, bytes: &[u8], reliability: Reliability);

    /// Drain everything received since the last poll into `out` as
    /// (sender, bytes) pairs, preserving per-peer order.
    fn poll(&mut self, out: &mut Vec<(PeerId, Vec<u8>)>);
}

// =============================================================================
// IN-MEMORY HUB (loopback transport for tests and local sessions)
// =============================================================================

#[derive(Default)]
struct HubInner {
    next_peer: PeerId,
    queues: BTreeMap<PeerId, VecDeque<(PeerId, Vec<u8>)>>,
}

/// A process-local message hub. Every endpoint created from the same hub
/// can reach every other; delivery is immediate and ordered, which makes
/// the reliable/unreliable distinction a no-op here.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Rc<RefCell<HubInner>>,
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new endpoint attached to this hub.
    pub fn endpoint(&self) -> MemoryTransport {
        let mut inner = self.inner.borrow_mut();
        let peer = inner.next_peer;
        inner.next_peer += 1;
        inner.queues.insert(peer, VecDeque::new());
        MemoryTransport {
            hub: Rc::clone(&self.inner),
            peer,
        }
    }
}

/// One endpoint of a `MemoryHub`.
pub struct MemoryTransport {
    hub: Rc<RefCell<HubInner>>,
    peer: PeerId,
}

impl Transport for MemoryTransport {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn send(&mut self, peer: PeerId, bytes: &[u8], _reliability: Reliability) {
        let mut inner = self.hub.borrow_mut();
        if let Some(queue) = inner.queues.get_mut(&peer) {
            queue.push_back((self.peer, bytes.to_vec()));
        }
    }

    fn broadcast(&mut self, bytes: &[u8], _reliability: Reliability) {
        let mut inner = self.hub.borrow_mut();
        let from = self.peer;
        for (peer, queue) in inner.queues.iter_mut() {
            if *peer != from {
                queue.push_back((from, bytes.to_vec()));
            }
        }
    }

    fn poll(&mut self, out: &mut Vec<(PeerId, Vec<u8>)>) {
        let mut inner = self.hub.borrow_mut();
        if let Some(queue) = inner.queues.get_mut(&self.peer) {
            out.extend(queue.drain(..));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
