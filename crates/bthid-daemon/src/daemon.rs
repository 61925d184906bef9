//! Core daemon orchestration.
//!
//! Startup is strictly ordered: build the descriptor, register the service
//! with the control plane, bind both L2CAP channels to the adapter address,
//! then bind the TCP ingress port. Any failure before [`Daemon::run`] is
//! fatal. Once running, the daemon only stops when its shutdown token is
//! cancelled.

use std::net::SocketAddr;
use std::sync::Arc;

use bthid_bluetooth::{
    sdp, BluetoothBackend, BluetoothError, PacketListener, ProfileRegistration, PSM_CONTROL,
    PSM_INTERRUPT,
};
use bthid_types::{BdAddr, DescriptorRegistry};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::DaemonError;
use crate::registry::ClientRegistry;
use crate::{ingress, l2cap};

/// The Bluetooth HID bridge.
pub struct Daemon {
    backend: Box<dyn BluetoothBackend>,
    descriptors: Arc<DescriptorRegistry>,
    registry: ClientRegistry,
    control: Box<dyn PacketListener>,
    interrupt: Box<dyn PacketListener>,
    ingress: TcpListener,
    adapter_address: BdAddr,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Run the startup sequence and bind every listener.
    pub async fn start(
        config: &Config,
        mut backend: Box<dyn BluetoothBackend>,
    ) -> Result<Self, DaemonError> {
        let descriptors = config.descriptor_registry()?;
        info!(
            classes = ?descriptors.classes(),
            len = descriptors.composite_descriptor().len(),
            "report descriptor composed"
        );

        let registration = ProfileRegistration {
            uuid: config.bluetooth.uuid,
            profile_path: config.bluetooth.profile.clone(),
            agent_path: config.bluetooth.agent.clone(),
            service_record: sdp::service_record(&descriptors.descriptor_hex()),
        };
        let adapter_address = backend.register(&registration).await?;

        let control = backend
            .listen(adapter_address, PSM_CONTROL)
            .await
            .map_err(listen_error)?;
        let interrupt = backend
            .listen(adapter_address, PSM_INTERRUPT)
            .await
            .map_err(listen_error)?;
        info!(address = %adapter_address, "L2CAP channels bound");

        let ingress_addr = config.server.address();
        let ingress = TcpListener::bind((config.server.host.as_str(), config.server.port))
            .await
            .map_err(|source| DaemonError::Bind {
                addr: ingress_addr,
                source,
            })?;

        Ok(Self {
            backend,
            descriptors: Arc::new(descriptors),
            registry: ClientRegistry::new(),
            control,
            interrupt,
            ingress,
            adapter_address,
            shutdown: CancellationToken::new(),
        })
    }

    /// Address the TCP ingress port is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, DaemonError> {
        Ok(self.ingress.local_addr()?)
    }

    pub fn adapter_address(&self) -> BdAddr {
        self.adapter_address
    }

    /// Handle on the connected interrupt peers.
    pub fn registry(&self) -> ClientRegistry {
        self.registry.clone()
    }

    /// Cancelling this token stops the daemon.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until the shutdown token is cancelled, then close every
    /// listener and connection and release the control-plane registration.
    pub async fn run(self) -> Result<(), DaemonError> {
        let Self {
            mut backend,
            descriptors,
            registry,
            control,
            interrupt,
            ingress,
            shutdown,
            ..
        } = self;

        let mut servers = JoinSet::new();
        servers.spawn(l2cap::serve_control(control, shutdown.child_token()));
        servers.spawn(l2cap::serve_interrupt(
            interrupt,
            registry.clone(),
            shutdown.child_token(),
        ));
        servers.spawn(ingress::serve_ingress(
            ingress,
            registry.clone(),
            descriptors,
            shutdown.child_token(),
        ));

        let session_cancel = shutdown.child_token();
        let session = tokio::spawn(async move {
            tokio::select! {
                () = session_cancel.cancelled() => {}
                result = backend.serve() => match result {
                    Ok(()) => info!("control-plane session ended"),
                    Err(e) => warn!(error = %e, "control-plane session lost, bridge keeps running"),
                },
            }
            session_cancel.cancelled().await;
            if let Err(e) = backend.shutdown().await {
                warn!(error = %e, "failed to release bluetooth registration");
            }
        });

        info!("daemon running");
        shutdown.cancelled().await;
        info!("shutting down");

        while let Some(joined) = servers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "server task failed");
            }
        }
        if let Err(e) = session.await {
            warn!(error = %e, "control-plane task failed");
        }

        info!(peers = registry.len(), "daemon stopped");
        Ok(())
    }
}

fn listen_error(e: BluetoothError) -> DaemonError {
    match e {
        BluetoothError::PermissionDenied { psm } => DaemonError::InsufficientPrivilege { psm },
        other => DaemonError::Bluetooth(other),
    }
}
