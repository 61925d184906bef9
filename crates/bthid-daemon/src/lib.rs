//! Core daemon for bthid.
//!
//! Advertises the HID service through a [`BluetoothBackend`], serves the HID
//! control and interrupt L2CAP channels, and fans every report received on
//! the TCP ingress port out to all connected interrupt peers.
//!
//! [`BluetoothBackend`]: bthid_bluetooth::BluetoothBackend

pub mod config;
pub mod daemon;
pub mod error;
pub mod ingress;
pub mod l2cap;
pub mod registry;
pub mod setup;

pub use config::Config;
pub use daemon::Daemon;
pub use error::DaemonError;
pub use registry::{ClientRegistry, PeerClient, PeerId};
