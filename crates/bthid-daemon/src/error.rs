//! Daemon errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("insufficient privilege to bind L2CAP PSM {psm:#06x} (run as root or grant CAP_NET_BIND_SERVICE)")]
    InsufficientPrivilege { psm: u16 },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] bthid_bluetooth::BluetoothError),

    #[error("protocol error: {0}")]
    Protocol(#[from] bthid_protocol::ProtocolError),

    #[error("descriptor error: {0}")]
    Types(#[from] bthid_types::TypesError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
