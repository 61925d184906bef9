//! Bluetooth subsystem errors.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BluetoothError {
    #[error("bluetooth daemon unavailable: {0}")]
    Session(String),

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("profile registration failed: {0}")]
    Profile(String),

    #[error("agent registration failed: {0}")]
    Agent(String),

    #[error("insufficient privilege to bind L2CAP PSM {psm:#06x}")]
    PermissionDenied { psm: u16 },

    #[error("failed to bind L2CAP PSM {psm:#06x}: {source}")]
    Bind {
        psm: u16,
        #[source]
        source: io::Error,
    },

    #[error("backend not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BluetoothError {
    /// Classify a bind failure, separating missing privilege from other
    /// socket errors.
    pub fn bind(psm: u16, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { psm }
        } else {
            Self::Bind { psm, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_classifies_permission_denied() {
        let err = BluetoothError::bind(0x11, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, BluetoothError::PermissionDenied { psm: 0x11 }));

        let err = BluetoothError::bind(0x13, io::Error::from(io::ErrorKind::AddrInUse));
        assert!(matches!(err, BluetoothError::Bind { psm: 0x13, .. }));
        assert!(err.to_string().contains("0x0013"));
    }
}
