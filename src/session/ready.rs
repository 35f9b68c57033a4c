//! Ready handler: steady-state dispatch.
//!
//! Routes client responses to their registered waiters by opaque,
//! consumes server pushes advertising new topology, and periodically
//! refreshes the configuration view against peers that do not push.
//! Per-command statuses surface through the waiters; only transport and
//! codec failures end the session here.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::MissedTickBehavior;

use crate::config::ClusterConfig;
use crate::protocol::{
    encode_request, map_status, Frame, FrameBuffer, Magic, Opcode, ServerOpcode, Status,
};
use crate::registry::Reply;

use super::{Shared, CONFIG_POLL_INTERVAL, READ_BUFFER_SIZE};

/// Drive the steady state until shutdown, peer close, or a fatal error.
pub(super) async fn run(shared: &Arc<Shared>, mut read: OwnedReadHalf, mut parser: FrameBuffer) {
    let mut handler = ReadyHandler {
        shared: shared.clone(),
    };

    // Peers that do not proactively push stay current through a periodic
    // fetch; the first tick fires immediately.
    let gcccp = shared.supports_gcccp();
    let mut refresh = tokio::time::interval(CONFIG_POLL_INTERVAL);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        tokio::select! {
            _ = shared.cancel_token.cancelled() => return,

            _ = refresh.tick(), if gcccp => {
                handler.fetch_config().await;
            }

            result = read.read(&mut buf) => match result {
                Ok(0) => {
                    tracing::error!("connection closed by peer");
                    return;
                }
                Ok(n) => {
                    parser.feed(&buf[..n]);
                    loop {
                        match parser.next() {
                            Ok(Some(frame)) => {
                                handler.handle(frame);
                                if shared.is_stopped() {
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(err) => {
                                tracing::error!(error = %err, "fatal codec failure");
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "i/o error while reading from the socket");
                    return;
                }
            },
        }
    }
}

struct ReadyHandler {
    shared: Arc<Shared>,
}

impl ReadyHandler {
    fn handle(&mut self, frame: Frame) {
        match frame.magic {
            Magic::ClientResponse | Magic::AltClientResponse => self.on_client_response(frame),
            Magic::ServerRequest => self.on_server_request(frame),
            Magic::ClientRequest | Magic::AltClientRequest | Magic::ServerResponse => {
                tracing::warn!(
                    magic = %frame.magic,
                    opcode = frame.opcode,
                    opaque = frame.opaque,
                    "unexpected magic in steady state"
                );
            }
        }
    }

    fn on_client_response(&mut self, frame: Frame) {
        let Some(opcode) = Opcode::decode(frame.opcode) else {
            tracing::warn!(opcode = frame.opcode, "unexpected client response");
            return;
        };

        // Topology responses update the view before any waiter observes
        // the completion.
        if opcode == Opcode::GetClusterConfig {
            if Status::decode(frame.specific) == Some(Status::Success) {
                match ClusterConfig::parse(&frame.value) {
                    Ok(config) => self.shared.update_configuration(config),
                    Err(err) => {
                        tracing::warn!(error = %err, "unparseable configuration in response")
                    }
                }
            } else {
                tracing::warn!(status = frame.specific, "unexpected get_cluster_config status");
            }
        }

        if !opcode.is_routable() {
            tracing::warn!(%opcode, opaque = frame.opaque, "unexpected client response");
            return;
        }

        match self.shared.registry().complete(frame.opaque) {
            Some((tx, enqueued_at)) => {
                let status = map_status(opcode, frame.specific);
                tracing::debug!(
                    opaque = frame.opaque,
                    status = frame.specific,
                    elapsed_us = enqueued_at.elapsed().as_micros() as u64,
                    "invoking operation waiter"
                );
                let _ = tx.send(Reply::Response { status, frame });
            }
            None => {
                tracing::debug!(
                    opcode = frame.opcode,
                    opaque = frame.opaque,
                    "orphan response"
                );
            }
        }
    }

    fn on_server_request(&mut self, frame: Frame) {
        let Some(opcode) = ServerOpcode::decode(frame.opcode) else {
            tracing::warn!(opcode = frame.opcode, "unexpected server request");
            return;
        };
        match opcode {
            ServerOpcode::ClusterMapChangeNotification => {
                // Body: extras = protocol revision, key = bucket name,
                // value = embedded configuration (may be empty).
                let notified_bucket = String::from_utf8_lossy(&frame.key).into_owned();
                if frame.value.is_empty() {
                    tracing::debug!("notification without embedded configuration");
                    return;
                }
                let config = match ClusterConfig::parse(&frame.value) {
                    Ok(config) => config,
                    Err(err) => {
                        tracing::warn!(error = %err, "unparseable configuration in notification");
                        return;
                    }
                };

                let session_bucket = self.shared.bucket_name();
                let applies = (config.bucket.is_none() && notified_bucket.is_empty())
                    || matches!(
                        &session_bucket,
                        Some(own) if !notified_bucket.is_empty() && *own == notified_bucket
                    );
                if applies {
                    self.shared.update_configuration(config);
                } else {
                    tracing::debug!(
                        bucket = %notified_bucket,
                        "notification for another bucket, ignoring"
                    );
                }
            }
        }
    }

    /// Self-handling topology fetch riding the session's own send path:
    /// the response updates the view before routing, so the waiter is
    /// dropped immediately.
    async fn fetch_config(&mut self) {
        let opaque = self.shared.next_opaque();
        let frame = encode_request(
            Opcode::GetClusterConfig as u8,
            opaque,
            0,
            0,
            b"",
            b"",
            b"",
        );
        tracing::debug!(opaque, "refreshing configuration");
        let _ = self.shared.send(opaque, frame).await;
    }
}
