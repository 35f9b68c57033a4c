//! Bootstrap handler: the negotiation sub-protocol.
//!
//! Runs over the freshly connected socket, pipelined: HELLO, SASL list,
//! SASL exchange, then (on authentication) error map, bucket selection
//! and the initial topology fetch. Frames are dispatched purely on
//! opcode, never on opaque sequencing, so the pipelining is safe even
//! when a phase's responses interleave.
//!
//! Any failure here is terminal: the session stops and the error
//! surfaces through the bootstrap continuation.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;

use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use crate::error_map::ErrorMap;
use crate::protocol::{encode_request, Frame, FrameBuffer, Opcode, ServerFeature, Status};
use crate::sasl::{ClientContext, SaslStatus};
use crate::writer::WriterHandle;

use super::{Shared, READ_BUFFER_SIZE};

/// Error map format version requested from the peer.
const ERROR_MAP_VERSION: u16 = 2;

/// Drive the negotiation to completion over `read`/`writer`.
pub(super) async fn run(
    shared: &Arc<Shared>,
    read: &mut OwnedReadHalf,
    parser: &mut FrameBuffer,
    writer: &WriterHandle,
) -> Result<()> {
    let mut handler = BootstrapHandler::new(shared.clone());
    handler.send_opening(writer).await?;

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        while let Some(frame) = parser.next()? {
            if let Progress::Complete = handler.handle(frame, writer).await? {
                return Ok(());
            }
        }
        let n = read.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::ClosedByPeer);
        }
        parser.feed(&buf[..n]);
    }
}

enum Progress {
    Continue,
    Complete,
}

struct BootstrapHandler {
    shared: Arc<Shared>,
    sasl: ClientContext,
    authenticated: bool,
}

impl BootstrapHandler {
    fn new(shared: Arc<Shared>) -> Self {
        let (username, password) = shared.credentials();
        Self {
            shared,
            sasl: ClientContext::new(username, password),
            authenticated: false,
        }
    }

    /// Pipeline the opening requests: HELLO, SASL-LIST-MECHS, SASL-AUTH.
    async fn send_opening(&mut self, writer: &WriterHandle) -> Result<()> {
        let user_agent = serde_json::json!({
            "a": concat!("kvwire/", env!("CARGO_PKG_VERSION")),
            "i": format!("{}/{}", self.shared.client_id(), self.shared.session_id()),
        })
        .to_string();
        let mut features = Vec::with_capacity(ServerFeature::requested().len() * 2);
        for feature in ServerFeature::requested() {
            features.extend_from_slice(&(*feature as u16).to_be_bytes());
        }
        tracing::debug!(user_agent = %user_agent, "requesting features");
        writer
            .send(encode_request(
                Opcode::Hello as u8,
                self.shared.next_opaque(),
                0,
                0,
                b"",
                user_agent.as_bytes(),
                &features,
            ))
            .await?;

        writer
            .send(encode_request(
                Opcode::SaslListMechs as u8,
                self.shared.next_opaque(),
                0,
                0,
                b"",
                b"",
                b"",
            ))
            .await?;

        let (_, payload) = self.sasl.start();
        tracing::debug!(mechanism = self.sasl.name(), "starting authentication");
        writer
            .send(encode_request(
                Opcode::SaslAuth as u8,
                self.shared.next_opaque(),
                0,
                0,
                b"",
                self.sasl.name().as_bytes(),
                &payload,
            ))
            .await?;
        Ok(())
    }

    /// On authentication, pipeline the remaining bootstrap requests.
    async fn auth_success(&mut self, writer: &WriterHandle) -> Result<()> {
        if self.authenticated {
            return Ok(());
        }
        self.authenticated = true;

        if self.shared.supports(ServerFeature::Xerror) {
            writer
                .send(encode_request(
                    Opcode::GetErrorMap as u8,
                    self.shared.next_opaque(),
                    0,
                    0,
                    b"",
                    b"",
                    &ERROR_MAP_VERSION.to_be_bytes(),
                ))
                .await?;
        }
        if let Some(bucket) = self.shared.bucket_name() {
            writer
                .send(encode_request(
                    Opcode::SelectBucket as u8,
                    self.shared.next_opaque(),
                    0,
                    0,
                    b"",
                    bucket.as_bytes(),
                    b"",
                ))
                .await?;
        }
        writer
            .send(encode_request(
                Opcode::GetClusterConfig as u8,
                self.shared.next_opaque(),
                0,
                0,
                b"",
                b"",
                b"",
            ))
            .await?;
        Ok(())
    }

    async fn handle(&mut self, frame: Frame, writer: &WriterHandle) -> Result<Progress> {
        let Some(opcode) = Opcode::decode(frame.opcode) else {
            tracing::warn!(opcode = frame.opcode, "unexpected message during bootstrap");
            return Err(Error::ProtocolError(format!(
                "unexpected opcode {:#04x} during bootstrap",
                frame.opcode
            )));
        };
        let status = Status::decode(frame.specific);

        match opcode {
            Opcode::Hello => {
                if status != Some(Status::Success) {
                    tracing::warn!(status = frame.specific, "hello rejected during bootstrap");
                    return Err(Error::HandshakeFailure);
                }
                let features = decode_features(&frame.value);
                tracing::debug!(
                    features = %format_features(&features),
                    "negotiated features"
                );
                self.shared.set_features(features);
            }

            Opcode::SaslListMechs => {
                if status != Some(Status::Success) {
                    tracing::warn!(status = frame.specific, "sasl_list_mechs failed");
                    return Err(Error::AuthenticationFailure);
                }
                // Informational: the mechanism was chosen from the client
                // preference list before this arrived.
                tracing::debug!(
                    mechanisms = %String::from_utf8_lossy(&frame.value),
                    "peer mechanisms"
                );
            }

            Opcode::SaslAuth => match status {
                Some(Status::Success) => self.auth_success(writer).await?,
                Some(Status::AuthContinue) => {
                    let (code, payload) = self.sasl.step(&frame.value);
                    match code {
                        SaslStatus::Ok => self.auth_success(writer).await?,
                        SaslStatus::Continue => {
                            writer
                                .send(encode_request(
                                    Opcode::SaslStep as u8,
                                    self.shared.next_opaque(),
                                    0,
                                    0,
                                    b"",
                                    self.sasl.name().as_bytes(),
                                    &payload,
                                ))
                                .await?;
                        }
                        SaslStatus::Fail => {
                            tracing::error!(
                                mechanism = self.sasl.name(),
                                "unable to authenticate"
                            );
                            return Err(Error::AuthenticationFailure);
                        }
                    }
                }
                _ => {
                    tracing::warn!(status = frame.specific, "sasl_auth failed");
                    return Err(Error::AuthenticationFailure);
                }
            },

            Opcode::SaslStep => {
                if status != Some(Status::Success) {
                    return Err(Error::AuthenticationFailure);
                }
                self.auth_success(writer).await?;
            }

            Opcode::GetErrorMap => {
                if status != Some(Status::Success) {
                    tracing::warn!(status = frame.specific, "get_error_map failed");
                    return Err(Error::ProtocolError(format!(
                        "get_error_map failed with status {:#06x}",
                        frame.specific
                    )));
                }
                self.shared.set_error_map(ErrorMap::parse(&frame.value)?);
            }

            Opcode::SelectBucket => match status {
                Some(Status::Success) => {
                    tracing::debug!(
                        bucket = %self.shared.bucket_name().unwrap_or_default(),
                        "selected bucket"
                    );
                }
                Some(Status::NoAccess) => {
                    tracing::debug!(
                        bucket = %self.shared.bucket_name().unwrap_or_default(),
                        "unable to select bucket, it probably does not exist"
                    );
                    return Err(Error::BucketNotFound);
                }
                _ => {
                    tracing::warn!(status = frame.specific, "select_bucket failed");
                    return Err(Error::BucketNotFound);
                }
            },

            Opcode::GetClusterConfig => match status {
                Some(Status::Success) => {
                    self.shared
                        .update_configuration(ClusterConfig::parse(&frame.value)?);
                    return Ok(Progress::Complete);
                }
                Some(Status::NoBucket) if self.shared.bucket_name().is_none() => {
                    // Bucket-less session against a pre-GCCCP peer: no
                    // cluster-level configuration is available until a
                    // bucket is opened.
                    self.shared.set_gcccp(false);
                    tracing::warn!(
                        "peer does not support cluster-level configuration, \
                         installing synthetic view"
                    );
                    let addr = self
                        .shared
                        .endpoint_addr()
                        .expect("bootstrap runs on a connected session");
                    self.shared
                        .update_configuration(ClusterConfig::synthetic(addr));
                    return Ok(Progress::Complete);
                }
                _ => {
                    tracing::warn!(status = frame.specific, "get_cluster_config failed");
                    return Err(Error::ProtocolError(format!(
                        "get_cluster_config failed with status {:#06x}",
                        frame.specific
                    )));
                }
            },

            other => {
                tracing::warn!(opcode = %other, "unexpected message during bootstrap");
                return Err(Error::ProtocolError(format!(
                    "unexpected opcode {other} during bootstrap"
                )));
            }
        }
        Ok(Progress::Continue)
    }
}

/// Retain the intersection of requested and acknowledged features.
fn decode_features(value: &[u8]) -> Vec<ServerFeature> {
    let requested = ServerFeature::requested();
    value
        .chunks_exact(2)
        .filter_map(|chunk| ServerFeature::decode(u16::from_be_bytes([chunk[0], chunk[1]])))
        .filter(|feature| requested.contains(feature))
        .collect()
}

fn format_features(features: &[ServerFeature]) -> String {
    features
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Magic;
    use crate::session::SessionOptions;
    use crate::writer::{spawn_writer_task, WriterConfig};
    use bytes::Bytes;

    fn shared(bucket: Option<&str>) -> Arc<Shared> {
        let mut options = SessionOptions::new("client-1").credentials("user", "pass");
        if let Some(bucket) = bucket {
            options = options.bucket(bucket);
        }
        let shared = Arc::new(Shared::new(options));
        shared.set_endpoint_addr("127.0.0.1:11210".parse().unwrap());
        shared
    }

    fn test_writer() -> WriterHandle {
        let (client, _server) = tokio::io::duplex(64 * 1024);
        let (writer, _task) = spawn_writer_task(client, WriterConfig::default());
        writer
    }

    fn response(opcode: Opcode, status: u16, value: &[u8]) -> Frame {
        Frame {
            magic: Magic::ClientResponse,
            opcode: opcode as u8,
            datatype: 0,
            specific: status,
            opaque: 1,
            cas: 0,
            framing_extras: Bytes::new(),
            extras: Bytes::new(),
            key: Bytes::new(),
            value: Bytes::copy_from_slice(value),
        }
    }

    fn feature_bytes(features: &[ServerFeature]) -> Vec<u8> {
        features
            .iter()
            .flat_map(|f| (*f as u16).to_be_bytes())
            .collect()
    }

    #[tokio::test]
    async fn hello_response_stores_feature_intersection() {
        let shared = shared(None);
        let mut handler = BootstrapHandler::new(shared.clone());
        let writer = test_writer();

        // Acknowledge two requested features plus one the client never
        // asked for.
        let mut value = feature_bytes(&[ServerFeature::Xerror, ServerFeature::Collections]);
        value.extend_from_slice(&(ServerFeature::Tls as u16).to_be_bytes());

        let frame = response(Opcode::Hello, Status::Success as u16, &value);
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Ok(Progress::Continue)
        ));

        assert!(shared.supports(ServerFeature::Xerror));
        assert!(shared.supports(ServerFeature::Collections));
        assert!(!shared.supports(ServerFeature::Tls));
        assert!(!shared.supports(ServerFeature::Snappy));
    }

    #[tokio::test]
    async fn hello_failure_is_handshake_failure() {
        let mut handler = BootstrapHandler::new(shared(None));
        let writer = test_writer();

        let frame = response(Opcode::Hello, Status::Internal as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::HandshakeFailure)
        ));
    }

    #[tokio::test]
    async fn sasl_auth_failure_is_authentication_failure() {
        let mut handler = BootstrapHandler::new(shared(None));
        let writer = test_writer();

        let frame = response(Opcode::SaslAuth, Status::AuthError as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::AuthenticationFailure)
        ));
    }

    #[tokio::test]
    async fn select_bucket_no_access_is_bucket_not_found() {
        let mut handler = BootstrapHandler::new(shared(Some("travel-sample")));
        let writer = test_writer();

        let frame = response(Opcode::SelectBucket, Status::NoAccess as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::BucketNotFound)
        ));
    }

    #[tokio::test]
    async fn select_bucket_other_failures_are_bucket_not_found() {
        let mut handler = BootstrapHandler::new(shared(Some("travel-sample")));
        let writer = test_writer();

        let frame = response(Opcode::SelectBucket, Status::TempFailure as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::BucketNotFound)
        ));
    }

    #[tokio::test]
    async fn config_success_completes_bootstrap() {
        let shared = shared(Some("travel-sample"));
        let mut handler = BootstrapHandler::new(shared.clone());
        let writer = test_writer();

        let config = br#"{"rev": 17, "name": "travel-sample", "nodesExt": [{}, {}]}"#;
        let frame = response(Opcode::GetClusterConfig, Status::Success as u16, config);
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Ok(Progress::Complete)
        ));
        assert_eq!(shared.config().unwrap().rev, 17);
    }

    #[tokio::test]
    async fn no_bucket_without_bucket_falls_back_to_synthetic_config() {
        let shared = shared(None);
        let mut handler = BootstrapHandler::new(shared.clone());
        let writer = test_writer();

        let frame = response(Opcode::GetClusterConfig, Status::NoBucket as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Ok(Progress::Complete)
        ));

        assert!(!shared.supports_gcccp());
        let config = shared.config().unwrap();
        assert_eq!(config.rev, 0);
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.nodes[0].hostname, "127.0.0.1");
    }

    #[tokio::test]
    async fn no_bucket_with_bucket_configured_is_protocol_error() {
        let mut handler = BootstrapHandler::new(shared(Some("travel-sample")));
        let writer = test_writer();

        let frame = response(Opcode::GetClusterConfig, Status::NoBucket as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::ProtocolError(_))
        ));
    }

    #[tokio::test]
    async fn data_plane_opcode_during_bootstrap_is_protocol_error() {
        let mut handler = BootstrapHandler::new(shared(None));
        let writer = test_writer();

        let frame = response(Opcode::Get, Status::Success as u16, b"");
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::ProtocolError(_))
        ));
    }

    #[tokio::test]
    async fn unknown_opcode_during_bootstrap_is_protocol_error() {
        let mut handler = BootstrapHandler::new(shared(None));
        let writer = test_writer();

        let mut frame = response(Opcode::Get, Status::Success as u16, b"");
        frame.opcode = 0xee;
        assert!(matches!(
            handler.handle(frame, &writer).await,
            Err(Error::ProtocolError(_))
        ));
    }

    #[test]
    fn decode_features_keeps_only_requested() {
        let mut value = feature_bytes(&[ServerFeature::Xerror]);
        value.extend_from_slice(&0x7fu16.to_be_bytes()); // unknown code
        let features = decode_features(&value);
        assert_eq!(features, vec![ServerFeature::Xerror]);
    }
}
