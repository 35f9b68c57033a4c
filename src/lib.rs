//! # kvwire
//!
//! Client-side session for the memcached binary protocol, speaking to a
//! single node of a bucket-oriented distributed database.
//!
//! A [`Session`] owns one TCP connection: it negotiates features,
//! authenticates via SASL, selects a bucket, fetches the cluster
//! topology, and then multiplexes many in-flight commands over the same
//! connection by opaque identifiers while reacting to server pushes that
//! advertise new topology.
//!
//! ## Architecture
//!
//! - **Protocol layer** ([`protocol`]): 24-byte header codec, frame
//!   buffer for partial reads, status translation
//! - **Session layer** ([`session`]): bootstrap state machine, opaque
//!   registry, backpressure-aware write pipeline, reconnect across a
//!   candidate list
//!
//! ## Example
//!
//! ```ignore
//! use kvwire::{Session, SessionOptions};
//! use kvwire::protocol::{encode_request, Opcode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(
//!         SessionOptions::new("client-1")
//!             .endpoint("db.example", 11210)
//!             .credentials("Administrator", "password")
//!             .bucket("travel-sample"),
//!     );
//!     let config = session.bootstrap().await?;
//!     println!("connected, topology rev {}", config.rev);
//!
//!     let opaque = session.next_opaque();
//!     let get = encode_request(Opcode::Get as u8, opaque, 0, 0, b"", b"airport_1254", b"");
//!     let reply = session.send(opaque, get).await.await?;
//!     println!("{reply:?}");
//!
//!     session.stop();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod error_map;
pub mod protocol;
pub mod sasl;
pub mod session;

mod collections;
mod endpoints;
mod registry;
mod transport;
mod writer;

pub use config::ClusterConfig;
pub use error::{Error, Result};
pub use error_map::ErrorMap;
pub use registry::Reply;
pub use session::{Session, SessionOptions, SessionState};
