//! TCP dial helpers.
//!
//! Resolution and connection establishment with a per-attempt deadline.
//! Sockets are configured with `TCP_NODELAY` and keep-alive before use;
//! the data plane is latency-sensitive and frames are already batched by
//! the writer task.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpSocket, TcpStream};

use crate::error::{Error, Result};

/// Resolve a hostname to its candidate socket addresses.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let authority = format!("{host}:{port}");
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|err| Error::ResolveFailed {
            authority: authority.clone(),
            reason: err.to_string(),
        })?
        .collect();
    if addrs.is_empty() {
        return Err(Error::ResolveFailed {
            authority,
            reason: "no addresses returned".to_string(),
        });
    }
    Ok(addrs)
}

/// Dial one address under a connect deadline.
///
/// Deadline expiry abandons the in-flight connect, which the caller
/// treats like any other dial failure and advances its cursor.
pub(crate) async fn connect(addr: SocketAddr, deadline: Duration) -> Result<TcpStream> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }?;
    socket.set_keepalive(true)?;

    let stream = match tokio::time::timeout(deadline, socket.connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            return Err(Error::ConnectFailed {
                addr: addr.to_string(),
                reason: err.to_string(),
            })
        }
        Err(_) => {
            return Err(Error::ConnectFailed {
                addr: addr.to_string(),
                reason: "connect deadline expired".to_string(),
            })
        }
    };
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_loopback() {
        let addrs = resolve("localhost", 11210).await.unwrap();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|addr| addr.port() == 11210));
    }

    #[tokio::test]
    async fn connect_to_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let stream = connect(addr, Duration::from_secs(1)).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn connect_refused_is_connect_failed() {
        // Bind then drop to obtain a port that actively refuses.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(addr, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::ConnectFailed { .. })));
    }
}
