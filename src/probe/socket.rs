//! ICMPv6 socket creation.
//!
//! Uses unprivileged ICMP datagram sockets ("ping sockets"). The kernel
//! fills the checksum, rewrites the echo identifier to the socket's own
//! id, and only delivers echo replies carrying that id.

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{Error, Result};

/// Open an ICMPv6 datagram socket on `interface`, bound to `bind`.
///
/// `bind` must carry the interface's scope id. The returned socket is
/// closed when dropped.
pub fn open_icmpv6_socket(
    interface: &str,
    bind: SocketAddr,
    bind_device: bool,
) -> Result<UdpSocket> {
    let open_err = |e: std::io::Error| Error::SocketOpen {
        interface: interface.to_string(),
        reason: e.to_string(),
    };

    let socket =
        Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::ICMPV6)).map_err(open_err)?;

    if bind_device {
        bind_to_device(&socket, interface);
    }

    socket.bind(&bind.into()).map_err(open_err)?;
    socket.set_nonblocking(true).map_err(open_err)?;

    UdpSocket::from_std(socket.into()).map_err(open_err)
}

/// Pin the socket to an interface. Failure only weakens the binding,
/// the scope id still selects the egress interface.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn bind_to_device(socket: &Socket, interface: &str) {
    // SO_BINDTODEVICE requires CAP_NET_RAW or root
    if let Err(e) = socket.bind_device(Some(interface.as_bytes())) {
        debug!(
            "SO_BINDTODEVICE failed for {}: {}, relying on scope id",
            interface, e
        );
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn bind_to_device(_socket: &Socket, interface: &str) {
    debug!(
        "device binding not supported here, relying on scope id for {}",
        interface
    );
}
