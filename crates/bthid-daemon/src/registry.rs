//! Connected interrupt peers and report fan-out.
//!
//! Every interrupt-channel connection is registered here with its own
//! unbounded FIFO queue. [`ClientRegistry::publish`] copies a report onto
//! every queue under the registry lock, so fan-out never races a peer being
//! added or removed. Each queue is drained by the one delivery task that owns
//! the matching [`PeerClient`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bthid_bluetooth::PeerAddr;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

/// Registry-assigned peer identity. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

struct Peer {
    address: PeerAddr,
    queue: mpsc::UnboundedSender<Bytes>,
}

struct Inner {
    next_id: u64,
    peers: BTreeMap<PeerId, Peer>,
    count: watch::Sender<usize>,
}

/// Shared set of connected interrupt peers.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                peers: BTreeMap::new(),
                count,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a peer with an empty queue. The returned guard unregisters the
    /// peer when dropped.
    pub fn register(&self, address: PeerAddr) -> PeerClient {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = PeerId(inner.next_id);
        inner.next_id += 1;
        inner.peers.insert(id, Peer { address, queue: tx });
        let len = inner.peers.len();
        inner.count.send_replace(len);
        drop(inner);

        debug!(%id, peer = %address, "registered");
        PeerClient {
            id,
            address,
            queue: rx,
            registry: self.clone(),
        }
    }

    /// Remove a peer. Returns whether it was still registered.
    pub fn unregister(&self, id: PeerId) -> bool {
        let mut inner = self.lock();
        let removed = inner.peers.remove(&id);
        let len = inner.peers.len();
        inner.count.send_replace(len);
        drop(inner);

        if let Some(peer) = &removed {
            debug!(%id, peer = %peer.address, "unregistered");
        }
        removed.is_some()
    }

    /// Enqueue `report` for every registered peer. Returns the number of
    /// queues it was placed on.
    pub fn publish(&self, report: &Bytes) -> usize {
        let inner = self.lock();
        let mut delivered = 0;
        for (id, peer) in &inner.peers {
            if peer.queue.send(report.clone()).is_ok() {
                delivered += 1;
            } else {
                trace!(%id, "queue closed, skipping");
            }
        }
        trace!(len = report.len(), peers = delivered, "published report");
        delivered
    }

    pub fn len(&self) -> usize {
        self.lock().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses of the registered peers, in registration order.
    pub fn peers(&self) -> Vec<PeerAddr> {
        self.lock().peers.values().map(|p| p.address).collect()
    }

    /// Watch the number of registered peers.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.lock().count.subscribe()
    }
}

/// A registered peer's end of its queue.
///
/// Dropping it removes the peer from the registry before the queue itself
/// is released.
pub struct PeerClient {
    id: PeerId,
    address: PeerAddr,
    queue: mpsc::UnboundedReceiver<Bytes>,
    registry: ClientRegistry,
}

impl PeerClient {
    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn address(&self) -> PeerAddr {
        self.address
    }

    /// Next queued report, in enqueue order.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.queue.recv().await
    }
}

impl Drop for PeerClient {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bthid_bluetooth::PSM_INTERRUPT;
    use bthid_types::BdAddr;

    fn addr(last: u8) -> PeerAddr {
        PeerAddr {
            address: BdAddr::new([0, 0, 0, 0, 0, last]),
            psm: PSM_INTERRUPT,
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_peer_in_order() {
        let registry = ClientRegistry::new();
        let mut a = registry.register(addr(1));
        let mut b = registry.register(addr(2));

        for n in 0u8..3 {
            assert_eq!(registry.publish(&Bytes::from(vec![0xA1, n])), 2);
        }
        for peer in [&mut a, &mut b] {
            for n in 0u8..3 {
                assert_eq!(peer.recv().await.unwrap().as_ref(), &[0xA1, n]);
            }
        }
    }

    #[test]
    fn publish_with_no_peers_is_a_no_op() {
        let registry = ClientRegistry::new();
        assert_eq!(registry.publish(&Bytes::from_static(&[0xA1, 0x01])), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn late_registration_misses_earlier_reports() {
        let registry = ClientRegistry::new();
        registry.publish(&Bytes::from_static(&[0x01]));
        let mut late = registry.register(addr(1));
        registry.publish(&Bytes::from_static(&[0x02]));
        assert_eq!(late.queue.try_recv().unwrap().as_ref(), &[0x02]);
        assert!(late.queue.try_recv().is_err());
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ClientRegistry::new();
        let a = registry.register(addr(1));
        let mut b = registry.register(addr(2));

        assert!(registry.unregister(a.id()));
        assert!(!registry.unregister(a.id()));
        assert_eq!(registry.peers(), vec![addr(2)]);

        registry.publish(&Bytes::from_static(&[0x07]));
        assert_eq!(b.queue.try_recv().unwrap().as_ref(), &[0x07]);

        drop(a);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn drop_guard_unregisters() {
        let registry = ClientRegistry::new();
        let peer = registry.register(addr(9));
        let id = peer.id();
        assert_eq!(registry.len(), 1);
        drop(peer);
        assert!(registry.is_empty());
        assert!(!registry.unregister(id));
    }

    #[test]
    fn ids_are_not_reused() {
        let registry = ClientRegistry::new();
        let first = registry.register(addr(1)).id();
        let second = registry.register(addr(1)).id();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn count_watch_follows_membership() {
        let registry = ClientRegistry::new();
        let mut count = registry.subscribe();
        let peer = registry.register(addr(1));
        count.wait_for(|n| *n == 1).await.unwrap();
        drop(peer);
        count.wait_for(|n| *n == 0).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_register_and_publish() {
        let registry = ClientRegistry::new();
        let mut stable = registry.register(addr(0));

        let churn = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for n in 0..200u32 {
                    let peer = registry.register(addr((n % 250) as u8 + 1));
                    tokio::task::yield_now().await;
                    drop(peer);
                }
            })
        };
        let publisher = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for n in 0..200u32 {
                    assert!(registry.publish(&Bytes::from(n.to_be_bytes().to_vec())) >= 1);
                    tokio::task::yield_now().await;
                }
            })
        };
        churn.await.unwrap();
        publisher.await.unwrap();

        for n in 0..200u32 {
            assert_eq!(stable.recv().await.unwrap().as_ref(), &n.to_be_bytes());
        }
        assert_eq!(registry.len(), 1);
    }
}
