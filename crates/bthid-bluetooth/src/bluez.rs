//! BlueZ backend over D-Bus, with kernel L2CAP sequential-packet sockets.

use async_trait::async_trait;
use bluer::agent::{Agent, AgentHandle};
use bluer::l2cap::{SeqPacket, SeqPacketListener, SocketAddr};
use bluer::rfcomm::{Profile, ProfileHandle, ReqError, Role};
use bluer::{Adapter, Address, AddressType, Session};
use bthid_types::BdAddr;
use futures::StreamExt;
use tracing::{debug, info};

use crate::error::BluetoothError;
use crate::{
    BluetoothBackend, PacketConnection, PacketListener, PeerAddr, ProfileRegistration,
    PAIRING_PASSKEY, PAIRING_PIN,
};

/// Control plane backed by `bluetoothd`.
///
/// The profile and agent stay registered for as long as their handles are
/// held; [`BluetoothBackend::shutdown`] or dropping the backend releases them.
pub struct BluezBackend {
    session: Session,
    adapter: Adapter,
    profile: Option<ProfileHandle>,
    agent: Option<AgentHandle>,
}

impl BluezBackend {
    /// Connect to `bluetoothd` on the system bus and select an adapter by
    /// name, or the default adapter.
    pub async fn connect(adapter: Option<&str>) -> Result<Self, BluetoothError> {
        let session = Session::new()
            .await
            .map_err(|e| BluetoothError::Session(e.to_string()))?;
        let adapter = match adapter {
            Some(name) => session.adapter(name),
            None => session.default_adapter().await,
        }
        .map_err(|e| BluetoothError::Adapter(e.to_string()))?;
        info!(adapter = adapter.name(), "connected to bluetoothd");
        Ok(Self {
            session,
            adapter,
            profile: None,
            agent: None,
        })
    }
}

/// Power the adapter on if needed and make it discoverable and pairable with
/// no timeout.
async fn configure_adapter(adapter: &Adapter) -> Result<(), BluetoothError> {
    if !adapter.is_powered().await.map_err(adapter_error)? {
        info!(adapter = adapter.name(), "powering on adapter");
        adapter.set_powered(true).await.map_err(adapter_error)?;
    }
    adapter
        .set_discoverable_timeout(0)
        .await
        .map_err(adapter_error)?;
    adapter.set_pairable_timeout(0).await.map_err(adapter_error)?;
    adapter.set_discoverable(true).await.map_err(adapter_error)?;
    adapter.set_pairable(true).await.map_err(adapter_error)?;
    info!(adapter = adapter.name(), "adapter discoverable and pairable");
    Ok(())
}

fn adapter_error(e: bluer::Error) -> BluetoothError {
    BluetoothError::Adapter(e.to_string())
}

/// An agent that accepts every pairing and authorization request.
fn pairing_agent() -> Agent {
    Agent {
        request_default: true,
        request_pin_code: Some(Box::new(|req| {
            Box::pin(async move {
                info!(adapter = %req.adapter, device = %req.device, "pin code requested");
                Ok(PAIRING_PIN.to_string())
            })
        })),
        display_pin_code: Some(Box::new(|req| {
            Box::pin(async move {
                info!(device = %req.device, pin = %req.pincode, "display pin code");
                Ok(())
            })
        })),
        request_passkey: Some(Box::new(|req| {
            Box::pin(async move {
                info!(adapter = %req.adapter, device = %req.device, "passkey requested");
                Ok(PAIRING_PASSKEY)
            })
        })),
        display_passkey: Some(Box::new(|req| {
            Box::pin(async move {
                info!(
                    device = %req.device,
                    passkey = req.passkey,
                    entered = req.entered,
                    "display passkey"
                );
                Ok(())
            })
        })),
        request_confirmation: Some(Box::new(|req| {
            Box::pin(async move {
                info!(device = %req.device, passkey = req.passkey, "confirming passkey");
                Ok(())
            })
        })),
        request_authorization: Some(Box::new(|req| {
            Box::pin(async move {
                info!(device = %req.device, "authorizing pairing");
                Ok(())
            })
        })),
        authorize_service: Some(Box::new(|req| {
            Box::pin(async move {
                info!(device = %req.device, service = %req.service, "authorizing service");
                Ok(())
            })
        })),
        ..Default::default()
    }
}

#[async_trait]
impl BluetoothBackend for BluezBackend {
    async fn register(
        &mut self,
        registration: &ProfileRegistration,
    ) -> Result<BdAddr, BluetoothError> {
        // bluer exports the profile and agent under object paths it allocates.
        debug!(
            profile = %registration.profile_path,
            agent = %registration.agent_path,
            "requested object paths"
        );

        let profile = Profile {
            uuid: registration.uuid,
            name: Some("bthid".to_string()),
            role: Some(Role::Server),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(true),
            service_record: Some(registration.service_record.clone()),
            ..Default::default()
        };
        let handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(|e| BluetoothError::Profile(e.to_string()))?;
        self.profile = Some(handle);
        info!(uuid = %registration.uuid, "HID profile registered");

        configure_adapter(&self.adapter).await?;

        let agent = self
            .session
            .register_agent(pairing_agent())
            .await
            .map_err(|e| BluetoothError::Agent(e.to_string()))?;
        self.agent = Some(agent);
        info!("pairing agent registered");

        let address = self.adapter.address().await.map_err(adapter_error)?;
        info!(%address, "adapter address");
        Ok(BdAddr::new(address.0))
    }

    async fn listen(
        &mut self,
        address: BdAddr,
        psm: u16,
    ) -> Result<Box<dyn PacketListener>, BluetoothError> {
        let local = SocketAddr::new(Address::new(address.octets()), AddressType::BrEdr, psm);
        let listener = SeqPacketListener::bind(local)
            .await
            .map_err(|e| BluetoothError::bind(psm, e))?;
        Ok(Box::new(BluezListener { listener, psm }))
    }

    async fn serve(&mut self) -> Result<(), BluetoothError> {
        let Some(profile) = self.profile.as_mut() else {
            return Err(BluetoothError::Profile("profile not registered".to_string()));
        };
        // The HID channels are served on fixed PSMs, so profile-level
        // connections are refused.
        while let Some(request) = profile.next().await {
            debug!(device = %request.device(), "rejecting profile connect request");
            request.reject(ReqError::Rejected);
        }
        Err(BluetoothError::Session(
            "profile request stream closed".to_string(),
        ))
    }

    async fn shutdown(&mut self) -> Result<(), BluetoothError> {
        if self.agent.take().is_some() {
            info!("pairing agent released");
        }
        if self.profile.take().is_some() {
            info!("HID profile released");
        }
        Ok(())
    }
}

struct BluezListener {
    listener: SeqPacketListener,
    psm: u16,
}

#[async_trait]
impl PacketListener for BluezListener {
    async fn accept(&self) -> Result<(Box<dyn PacketConnection>, PeerAddr), BluetoothError> {
        let (conn, remote) = self.listener.accept().await?;
        let peer = PeerAddr {
            address: BdAddr::new(remote.addr.0),
            psm: self.psm,
        };
        Ok((Box::new(BluezConnection { conn }), peer))
    }

    fn psm(&self) -> u16 {
        self.psm
    }
}

struct BluezConnection {
    conn: SeqPacket,
}

#[async_trait]
impl PacketConnection for BluezConnection {
    async fn send(&self, packet: &[u8]) -> Result<(), BluetoothError> {
        self.conn.send(packet).await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, BluetoothError> {
        Ok(self.conn.recv(buf).await?)
    }
}
