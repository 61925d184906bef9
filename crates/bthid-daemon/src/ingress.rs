//! TCP ingress: producers submit hex-encoded reports, one per line.

use std::net::SocketAddr;
use std::sync::Arc;

use bthid_protocol::ReportCodec;
use bthid_types::DescriptorRegistry;
use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::l2cap::ACCEPT_RETRY_DELAY;
use crate::registry::ClientRegistry;

/// Accept producers until cancelled, one task per connection.
pub async fn serve_ingress(
    listener: TcpListener,
    registry: ClientRegistry,
    descriptors: Arc<DescriptorRegistry>,
    cancel: CancellationToken,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "ingress listening");
    }
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "producer connected");
                    tasks.spawn(handle_producer(
                        stream,
                        addr,
                        registry.clone(),
                        Arc::clone(&descriptors),
                        cancel.child_token(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "ingress accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "producer task failed");
                }
            }
        }
    }

    drop(listener);
    while tasks.join_next().await.is_some() {}
    info!("ingress closed");
}

async fn handle_producer(
    stream: TcpStream,
    addr: SocketAddr,
    registry: ClientRegistry,
    descriptors: Arc<DescriptorRegistry>,
    cancel: CancellationToken,
) {
    let mut frames = FramedRead::new(stream, ReportCodec::new());
    let mut forwarded: u64 = 0;

    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = frames.next() => frame,
        };
        match frame {
            // An empty line marks end of stream.
            Some(Ok(report)) if report.is_empty() => break,
            Some(Ok(report)) => {
                if let Err(e) = descriptors.validate(&report) {
                    debug!(%addr, error = %e, "forwarding report that does not match the descriptor");
                }
                let peers = registry.publish(&report);
                forwarded += 1;
                trace!(%addr, len = report.len(), peers, "report forwarded");
            }
            Some(Err(e)) => {
                warn!(%addr, error = %e, "malformed frame, closing producer");
                break;
            }
            None => break,
        }
    }

    debug!(%addr, forwarded, "producer disconnected");
}
