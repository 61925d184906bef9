//! Producer side of the ingress protocol.

use std::net::SocketAddr;

use bthid_types::HidReport;
use futures::SinkExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace};

use crate::codec::ReportCodec;
use crate::error::ProtocolError;

/// Writes reports to a running daemon's ingress port, one hex line each.
pub struct ReportSender {
    sink: FramedWrite<TcpStream, ReportCodec>,
    peer: SocketAddr,
}

impl ReportSender {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ProtocolError::Connection(e.to_string()))?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        debug!(%peer, "connected to ingress");
        Ok(Self {
            sink: FramedWrite::new(stream, ReportCodec::new()),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Encode and send a typed report.
    pub async fn send(&mut self, report: &impl HidReport) -> Result<(), ProtocolError> {
        self.send_raw(&report.encode()).await
    }

    /// Send already-encoded report bytes.
    pub async fn send_raw(&mut self, report: &[u8]) -> Result<(), ProtocolError> {
        self.sink.send(report).await?;
        trace!(len = report.len(), "sent report");
        Ok(())
    }

    /// Flush, then shut down the write half so the daemon sees end of stream.
    pub async fn close(mut self) -> Result<(), ProtocolError> {
        SinkExt::<&[u8]>::close(&mut self.sink).await
    }
}
