//! HID control and interrupt channel servers.
//!
//! Each accept loop owns a [`JoinSet`] of per-connection tasks, reaping them
//! as they finish and waiting for all of them on shutdown. A failing
//! connection never stops its accept loop.

use std::time::Duration;

use bthid_bluetooth::{PacketConnection, PacketListener, PeerAddr, MAX_PACKET_SIZE};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::registry::{ClientRegistry, PeerClient};

/// Pause after a failed accept before trying again.
pub(crate) const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accept control-channel connections and drain them.
///
/// Nothing received on the control channel is interpreted.
pub async fn serve_control(listener: Box<dyn PacketListener>, cancel: CancellationToken) {
    let psm = listener.psm();
    info!(psm, "control channel listening");
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((conn, peer)) => {
                    info!(%peer, "control peer connected");
                    tasks.spawn(drain_control(conn, peer, cancel.child_token()));
                }
                Err(e) => {
                    warn!(psm, error = %e, "control accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(joined),
        }
    }

    drop(listener);
    while let Some(joined) = tasks.join_next().await {
        reap(joined);
    }
    info!(psm, "control channel closed");
}

/// Accept interrupt-channel connections, register each with `registry`, and
/// deliver queued reports to it until it goes away.
pub async fn serve_interrupt(
    listener: Box<dyn PacketListener>,
    registry: ClientRegistry,
    cancel: CancellationToken,
) {
    let psm = listener.psm();
    info!(psm, "interrupt channel listening");
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((conn, peer)) => {
                    let client = registry.register(peer);
                    info!(%peer, id = %client.id(), peers = registry.len(), "interrupt peer connected");
                    tasks.spawn(deliver(conn, client, cancel.child_token()));
                }
                Err(e) => {
                    warn!(psm, error = %e, "interrupt accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(joined),
        }
    }

    drop(listener);
    while let Some(joined) = tasks.join_next().await {
        reap(joined);
    }
    info!(psm, "interrupt channel closed");
}

fn reap(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            warn!(error = %e, "connection task panicked");
        }
    }
}

async fn drain_control(
    conn: Box<dyn PacketConnection>,
    peer: PeerAddr,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            received = conn.recv(&mut buf) => match received {
                Ok(0) => break,
                Ok(len) => trace!(%peer, len, "discarding control packet"),
                Err(e) => {
                    debug!(%peer, error = %e, "control read failed");
                    break;
                }
            },
        }
    }
    drop(conn);
    info!(%peer, "control peer disconnected");
}

/// Write every queued report to `conn` in order.
///
/// Packets the host sends on the interrupt channel (LED output reports and
/// the like) are read and discarded, which is also how a closed peer is
/// noticed while the queue is idle.
async fn deliver(conn: Box<dyn PacketConnection>, mut client: PeerClient, cancel: CancellationToken) {
    let peer = client.address();
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            report = client.recv() => {
                let Some(report) = report else { break };
                // A peer that stops draining its socket must not hold up shutdown.
                tokio::select! {
                    () = cancel.cancelled() => break,
                    sent = conn.send(&report) => {
                        if let Err(e) = sent {
                            warn!(%peer, error = %e, "report delivery failed");
                            break;
                        }
                        trace!(%peer, len = report.len(), "report delivered");
                    }
                }
            }
            received = conn.recv(&mut buf) => match received {
                Ok(0) => break,
                Ok(len) => trace!(%peer, len, "discarding interrupt packet"),
                Err(e) => {
                    debug!(%peer, error = %e, "interrupt read failed");
                    break;
                }
            },
        }
    }

    let id = client.id();
    // Leave the registry before the connection is released.
    drop(client);
    drop(conn);
    info!(%peer, %id, "interrupt peer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bthid_bluetooth::{BluetoothError, PSM_INTERRUPT};
    use bthid_types::BdAddr;
    use bytes::Bytes;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn host() -> PeerAddr {
        PeerAddr {
            address: BdAddr::new([0xB8, 0x27, 0xEB, 0, 0, 1]),
            psm: PSM_INTERRUPT,
        }
    }

    /// A connected host whose socket never drains and never closes.
    struct StalledConnection;

    #[async_trait]
    impl PacketConnection for StalledConnection {
        async fn send(&self, _packet: &[u8]) -> Result<(), BluetoothError> {
            std::future::pending().await
        }

        async fn recv(&self, _buf: &mut [u8]) -> Result<usize, BluetoothError> {
            std::future::pending().await
        }
    }

    /// Hands out one connection, then waits forever.
    struct SingleListener {
        conn: Mutex<Option<Box<dyn PacketConnection>>>,
    }

    #[async_trait]
    impl PacketListener for SingleListener {
        async fn accept(&self) -> Result<(Box<dyn PacketConnection>, PeerAddr), BluetoothError> {
            let next = self.conn.lock().unwrap().take();
            match next {
                Some(conn) => Ok((conn, host())),
                None => std::future::pending().await,
            }
        }

        fn psm(&self) -> u16 {
            PSM_INTERRUPT
        }
    }

    /// Fails every accept, counting the attempts.
    struct FailingListener {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PacketListener for FailingListener {
        async fn accept(&self) -> Result<(Box<dyn PacketConnection>, PeerAddr), BluetoothError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(BluetoothError::Unavailable)
        }

        fn psm(&self) -> u16 {
            PSM_INTERRUPT
        }
    }

    #[tokio::test]
    async fn shutdown_does_not_wait_on_a_stalled_write() {
        let registry = ClientRegistry::new();
        let mut peers = registry.subscribe();
        let listener = SingleListener {
            conn: Mutex::new(Some(Box::new(StalledConnection))),
        };
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve_interrupt(
            Box::new(listener),
            registry.clone(),
            cancel.clone(),
        ));

        tokio::time::timeout(TIMEOUT, peers.wait_for(|n| *n == 1))
            .await
            .expect("peer never registered")
            .unwrap();
        assert_eq!(registry.publish(&Bytes::from_static(&[0xA1, 0x01])), 1);
        // Let the delivery task pick the report up and block in send.
        tokio::time::sleep(Duration::from_millis(20)).await;

        cancel.cancel();
        tokio::time::timeout(TIMEOUT, server)
            .await
            .expect("interrupt server did not stop")
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failing_accept_backs_off() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let listener = FailingListener {
            attempts: Arc::clone(&attempts),
        };
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve_control(Box::new(listener), cancel.clone()));

        tokio::time::sleep(ACCEPT_RETRY_DELAY * 3 + ACCEPT_RETRY_DELAY / 2).await;
        cancel.cancel();
        tokio::time::timeout(TIMEOUT, server)
            .await
            .expect("control server did not stop")
            .unwrap();

        let attempts = attempts.load(Ordering::SeqCst);
        assert!((1..=5).contains(&attempts), "{attempts} accept attempts");
    }
}
