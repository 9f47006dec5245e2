//! Outbound OSC transport

use std::{
    future::Future,
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use rosc::{encoder, OscMessage, OscPacket, OscType};
use thiserror::Error;
use tokio::net::UdpSocket;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode OSC message for {path}: {reason}")]
    Encode { path: String, reason: String },
    #[error("failed to send OSC message")]
    Io(#[from] io::Error),
}

/// Something that can deliver routed messages to the display.
pub trait MessageSender {
    fn send(
        &mut self,
        path: &str,
        args: Vec<OscType>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Sends each message as a single OSC packet over UDP.
#[derive(Debug)]
pub struct OscSender {
    socket: UdpSocket,
}

impl OscSender {
    /// Bind an ephemeral local port and point it at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or connected.
    pub async fn connect(target: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        tracing::info!(%target, "OSC sender ready");
        Ok(Self { socket })
    }
}

impl MessageSender for OscSender {
    async fn send(&mut self, path: &str, args: Vec<OscType>) -> Result<(), TransportError> {
        let packet = OscPacket::Message(OscMessage {
            addr: path.to_owned(),
            args,
        });
        let buf = encoder::encode(&packet).map_err(|e| TransportError::Encode {
            path: path.to_owned(),
            reason: format!("{e:?}"),
        })?;
        self.socket.send(&buf).await?;
        Ok(())
    }
}
