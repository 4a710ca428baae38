use crate::error::{AmpError, Result};
use crate::types::DeviceEndpoint;
use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

/// Send-only datagram transport.
///
/// The amplifier never replies, so a successful `send` only means the local
/// network stack accepted the datagram.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram to the endpoint
    async fn send(&self, payload: &[u8], endpoint: &DeviceEndpoint) -> Result<()>;
}

/// UDP transport with one unconnected socket per address family
pub struct UdpTransport {
    v4: UdpSocket,
    v6: Option<UdpSocket>,
    send_timeout: Duration,
}

impl UdpTransport {
    /// Bind ephemeral local sockets
    pub async fn bind(send_timeout: Duration) -> Result<Self> {
        let v4 = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        let v6 = match UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)).await {
            Ok(socket) => Some(socket),
            Err(e) => {
                tracing::debug!("IPv6 unavailable, sending over IPv4 only: {}", e);
                None
            }
        };
        tracing::info!("UDP transport bound on {}", v4.local_addr()?);

        Ok(Self {
            v4,
            v6,
            send_timeout,
        })
    }

    async fn resolve(&self, endpoint: &DeviceEndpoint) -> Result<SocketAddr> {
        let mut addrs = lookup_host((endpoint.host.as_str(), endpoint.port)).await?;
        let v6_usable = self.v6.is_some();
        addrs
            .find(|addr| addr.is_ipv4() || v6_usable)
            .ok_or_else(|| {
                AmpError::Transport(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no usable address for {}", endpoint),
                ))
            })
    }

    async fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<()> {
        let socket = match (addr, &self.v6) {
            (SocketAddr::V6(_), Some(v6)) => v6,
            _ => &self.v4,
        };
        let sent = socket.send_to(payload, addr).await?;
        if sent != payload.len() {
            return Err(AmpError::Transport(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, payload.len()),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, payload: &[u8], endpoint: &DeviceEndpoint) -> Result<()> {
        let send = async {
            let addr = self.resolve(endpoint).await?;
            tracing::debug!("Sending to {}: {}", addr, String::from_utf8_lossy(payload));
            self.send_to(payload, addr).await
        };

        match timeout(self.send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(AmpError::SendTimeout(
                u64::try_from(self.send_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_exact_payload() {
        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let transport = UdpTransport::bind(Duration::from_secs(1)).await.unwrap();
        transport
            .send(b"0s2a01 c4.amp.out 1 002", &DeviceEndpoint::new("127.0.0.1", port))
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = timeout(Duration::from_secs(1), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"0s2a01 c4.amp.out 1 002");
    }

    #[tokio::test]
    async fn unresolvable_host_is_transport_error() {
        let transport = UdpTransport::bind(Duration::from_secs(2)).await.unwrap();
        let err = transport
            .send(b"x", &DeviceEndpoint::new("no-such-host.invalid", 8750))
            .await
            .unwrap_err();
        assert!(err.is_transport(), "{:?}", err);
    }
}
