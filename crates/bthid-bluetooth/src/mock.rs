//! In-memory Bluetooth backend for testing.
//!
//! [`MockBluetooth`] stands in for BlueZ; tests drive the remote side through
//! a [`MockBluetoothHandle`], which opens [`MockPeer`] connections to
//! whatever PSMs the daemon is listening on.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bthid_types::BdAddr;
use tokio::sync::{mpsc, Notify};

use crate::error::BluetoothError;
use crate::{BluetoothBackend, PacketConnection, PacketListener, PeerAddr, ProfileRegistration};

/// Address the mock adapter reports.
pub const MOCK_ADAPTER_ADDRESS: BdAddr = BdAddr::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);

type Incoming = (MockConnection, PeerAddr);

#[derive(Default)]
struct MockState {
    registration: Option<ProfileRegistration>,
    listeners: HashMap<u16, mpsc::UnboundedSender<Incoming>>,
    denied_psms: HashSet<u16>,
    fail_register: bool,
    next_peer: u8,
    shutdown: bool,
}

/// Mock control plane and L2CAP sockets.
pub struct MockBluetooth {
    state: Arc<Mutex<MockState>>,
    session_lost: Arc<Notify>,
}

impl MockBluetooth {
    /// Create a mock backend and a handle for driving it from tests.
    pub fn new() -> (Self, MockBluetoothHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let session_lost = Arc::new(Notify::new());
        let handle = MockBluetoothHandle {
            state: Arc::clone(&state),
            session_lost: Arc::clone(&session_lost),
        };
        (
            Self {
                state,
                session_lost,
            },
            handle,
        )
    }
}

#[async_trait]
impl BluetoothBackend for MockBluetooth {
    async fn register(
        &mut self,
        registration: &ProfileRegistration,
    ) -> Result<BdAddr, BluetoothError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_register {
            return Err(BluetoothError::Session("mock bluetoothd unreachable".into()));
        }
        state.registration = Some(registration.clone());
        Ok(MOCK_ADAPTER_ADDRESS)
    }

    async fn listen(
        &mut self,
        _address: BdAddr,
        psm: u16,
    ) -> Result<Box<dyn PacketListener>, BluetoothError> {
        let mut state = self.state.lock().unwrap();
        if state.denied_psms.contains(&psm) {
            return Err(BluetoothError::bind(
                psm,
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        if state.listeners.contains_key(&psm) {
            return Err(BluetoothError::bind(
                psm,
                io::Error::from(io::ErrorKind::AddrInUse),
            ));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.listeners.insert(psm, tx);
        Ok(Box::new(MockListener {
            psm,
            incoming: tokio::sync::Mutex::new(rx),
            state: Arc::clone(&self.state),
        }))
    }

    async fn serve(&mut self) -> Result<(), BluetoothError> {
        self.session_lost.notified().await;
        Err(BluetoothError::Session("mock session lost".into()))
    }

    async fn shutdown(&mut self) -> Result<(), BluetoothError> {
        self.state.lock().unwrap().shutdown = true;
        Ok(())
    }
}

struct MockListener {
    psm: u16,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Incoming>>,
    state: Arc<Mutex<MockState>>,
}

impl Drop for MockListener {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.listeners.remove(&self.psm);
        }
    }
}

#[async_trait]
impl PacketListener for MockListener {
    async fn accept(&self) -> Result<(Box<dyn PacketConnection>, PeerAddr), BluetoothError> {
        let mut incoming = self.incoming.lock().await;
        match incoming.recv().await {
            Some((conn, peer)) => Ok((Box::new(conn), peer)),
            None => Err(BluetoothError::Io(io::ErrorKind::ConnectionAborted.into())),
        }
    }

    fn psm(&self) -> u16 {
        self.psm
    }
}

/// Daemon side of a mock connection.
struct MockConnection {
    to_peer: mpsc::UnboundedSender<Vec<u8>>,
    from_peer: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

#[async_trait]
impl PacketConnection for MockConnection {
    async fn send(&self, packet: &[u8]) -> Result<(), BluetoothError> {
        self.to_peer
            .send(packet.to_vec())
            .map_err(|_| BluetoothError::Io(io::ErrorKind::BrokenPipe.into()))
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, BluetoothError> {
        let mut from_peer = self.from_peer.lock().await;
        match from_peer.recv().await {
            Some(packet) => {
                let len = packet.len().min(buf.len());
                buf[..len].copy_from_slice(&packet[..len]);
                Ok(len)
            }
            None => Ok(0),
        }
    }
}

/// Remote side of a mock connection, held by the test.
///
/// Dropping it (or calling [`MockPeer::close`]) is seen by the daemon as the
/// peer disconnecting.
pub struct MockPeer {
    address: PeerAddr,
    to_daemon: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_daemon: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockPeer {
    pub fn address(&self) -> PeerAddr {
        self.address
    }

    /// Next packet written by the daemon, or `None` once the daemon has
    /// closed the connection.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_daemon.recv().await
    }

    /// A packet already delivered, without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_daemon.try_recv().ok()
    }

    pub fn send(&self, packet: &[u8]) -> Result<(), BluetoothError> {
        self.to_daemon
            .as_ref()
            .ok_or_else(|| BluetoothError::Io(io::ErrorKind::NotConnected.into()))?
            .send(packet.to_vec())
            .map_err(|_| BluetoothError::Io(io::ErrorKind::BrokenPipe.into()))
    }

    /// Half-close: stop sending but keep reading what the daemon writes.
    pub fn shutdown_write(&mut self) {
        self.to_daemon = None;
    }

    pub fn close(self) {
        drop(self);
    }
}

/// Clonable handle for driving and observing [`MockBluetooth`] from tests.
#[derive(Clone)]
pub struct MockBluetoothHandle {
    state: Arc<Mutex<MockState>>,
    session_lost: Arc<Notify>,
}

impl MockBluetoothHandle {
    /// Open a connection to the daemon's listener on `psm`.
    pub fn connect(&self, psm: u16) -> Result<MockPeer, BluetoothError> {
        let mut state = self.state.lock().unwrap();
        let listener = state
            .listeners
            .get(&psm)
            .cloned()
            .ok_or_else(|| BluetoothError::Io(io::ErrorKind::ConnectionRefused.into()))?;
        state.next_peer = state.next_peer.wrapping_add(1);
        let address = PeerAddr {
            address: BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, state.next_peer]),
            psm,
        };
        drop(state);

        let (to_peer, from_daemon) = mpsc::unbounded_channel();
        let (to_daemon, from_peer) = mpsc::unbounded_channel();
        let conn = MockConnection {
            to_peer,
            from_peer: tokio::sync::Mutex::new(from_peer),
        };
        listener
            .send((conn, address))
            .map_err(|_| BluetoothError::Io(io::ErrorKind::ConnectionRefused.into()))?;

        Ok(MockPeer {
            address,
            to_daemon: Some(to_daemon),
            from_daemon,
        })
    }

    /// Whether anything is listening on `psm`.
    pub fn is_listening(&self, psm: u16) -> bool {
        self.state.lock().unwrap().listeners.contains_key(&psm)
    }

    /// The registration passed to `register`, if any.
    pub fn registration(&self) -> Option<ProfileRegistration> {
        self.state.lock().unwrap().registration.clone()
    }

    /// Make `listen` on `psm` fail as if the process lacked privilege.
    pub fn deny_psm(&self, psm: u16) {
        self.state.lock().unwrap().denied_psms.insert(psm);
    }

    /// Make `register` fail as if `bluetoothd` were unreachable.
    pub fn fail_register(&self) {
        self.state.lock().unwrap().fail_register = true;
    }

    /// End the control-plane session.
    pub fn lose_session(&self) {
        self.session_lost.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }
}
