//! Bluetooth control plane and L2CAP transport for bthid.
//!
//! This crate defines the [`BluetoothBackend`] trait the daemon drives at
//! startup (profile, adapter and agent setup) and the [`PacketListener`] /
//! [`PacketConnection`] pair it uses for the HID control and interrupt
//! channels. The BlueZ backend lives behind the `bluez` feature; an
//! in-memory backend for tests behind `mock`.

use std::fmt;

use async_trait::async_trait;
use bthid_types::BdAddr;
use uuid::Uuid;

pub mod error;
pub mod sdp;

#[cfg(feature = "bluez")]
pub mod bluez;

#[cfg(feature = "mock")]
pub mod mock;

pub use error::BluetoothError;

/// L2CAP PSM of the HID control channel.
pub const PSM_CONTROL: u16 = 0x0011;

/// L2CAP PSM of the HID interrupt channel.
pub const PSM_INTERRUPT: u16 = 0x0013;

/// Bluetooth HID service class UUID.
pub const HID_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1124_0000_1000_8000_0080_5f9b_34fb);

/// PIN answered to legacy pairing requests.
pub const PAIRING_PIN: &str = "0000";

/// Passkey answered to SSP passkey requests.
pub const PAIRING_PASSKEY: u32 = 123_456;

/// Maximum size of one L2CAP packet read from a peer.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Remote end of an L2CAP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    pub address: BdAddr,
    pub psm: u16,
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:#06x}", self.address, self.psm)
    }
}

/// Everything needed to advertise the HID service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRegistration {
    pub uuid: Uuid,
    /// Object path requested for the profile.
    pub profile_path: String,
    /// Object path requested for the pairing agent.
    pub agent_path: String,
    /// SDP record XML with the report descriptor filled in.
    pub service_record: String,
}

/// The adapter control plane.
///
/// `register` runs the whole startup sequence: profile, adapter
/// configuration, pairing agent. It returns the adapter address the L2CAP
/// ports must bind to.
#[async_trait]
pub trait BluetoothBackend: Send + 'static {
    async fn register(&mut self, registration: &ProfileRegistration)
        -> Result<BdAddr, BluetoothError>;

    /// Bind and listen on `psm` at `address`.
    async fn listen(
        &mut self,
        address: BdAddr,
        psm: u16,
    ) -> Result<Box<dyn PacketListener>, BluetoothError>;

    /// Service the control-plane session until it ends.
    ///
    /// Returns an error when the session is lost. The daemon drops this
    /// future on shutdown.
    async fn serve(&mut self) -> Result<(), BluetoothError>;

    /// Release the profile and agent.
    async fn shutdown(&mut self) -> Result<(), BluetoothError>;
}

/// A bound sequential-packet listener.
#[async_trait]
pub trait PacketListener: Send + Sync {
    async fn accept(&self) -> Result<(Box<dyn PacketConnection>, PeerAddr), BluetoothError>;

    fn psm(&self) -> u16;
}

/// One accepted sequential-packet connection.
///
/// Each `send` and `recv` carries exactly one packet. Both take `&self` so a
/// delivery loop can write while it watches for the peer closing.
#[async_trait]
pub trait PacketConnection: Send + Sync {
    async fn send(&self, packet: &[u8]) -> Result<(), BluetoothError>;

    /// Receive one packet into `buf`. `Ok(0)` means the peer closed.
    async fn recv(&self, buf: &mut [u8]) -> Result<usize, BluetoothError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hid_uuid_string_form() {
        assert_eq!(
            HID_SERVICE_UUID.to_string(),
            "00001124-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn peer_addr_display() {
        let peer = PeerAddr {
            address: BdAddr::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]),
            psm: PSM_INTERRUPT,
        };
        assert_eq!(peer.to_string(), "00:1A:7D:DA:71:13/0x0013");
    }
}
