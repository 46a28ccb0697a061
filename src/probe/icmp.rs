//! ICMPv6 Echo prober.

use std::net::{SocketAddr, SocketAddrV6};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{EchoMessage, Icmpv6Message};
use crate::types::{Link, NoReplyReason, ProbeOutcome};
use crate::util::if_nametoindex;
use crate::ECHO_PAYLOAD;

use super::{echo_identifier, open_icmpv6_socket, wire_sequence, ProbeConfig, Prober};

/// Receive buffer size. Larger replies are truncated, which is fine since
/// only the echo header is inspected.
const RECV_BUFFER_SIZE: usize = 1500;

/// Prober that uses a fresh ICMPv6 datagram socket per probe.
#[derive(Debug, Clone)]
pub struct IcmpProber {
    config: ProbeConfig,
    identifier: u16,
}

impl IcmpProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            identifier: echo_identifier(),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Interface index that scopes the source link's address.
    fn scope_id(link: &Link) -> Result<u32> {
        if link.index() != 0 {
            return Ok(link.index());
        }
        if_nametoindex(link.name()).ok_or_else(|| Error::UnknownInterface(link.name().to_string()))
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn probe(
        &self,
        source: &Link,
        candidate: &Link,
        sequence: u64,
    ) -> Result<ProbeOutcome> {
        let scope_id = Self::scope_id(source)?;
        let (bind, dest) = echo_endpoints(source, candidate, scope_id);
        let socket = open_icmpv6_socket(source.name(), bind, self.config.bind_device)?;

        let request = EchoMessage::request(self.identifier, wire_sequence(sequence), ECHO_PAYLOAD);
        let wire = request.encode()?;

        trace!(
            "echo request {} -> {} id={} seq={}",
            source,
            dest,
            request.identifier,
            request.sequence
        );

        let expected = self.config.verify_sequence.then_some(request.sequence);
        let outcome = exchange(
            &socket,
            source.name(),
            dest,
            &wire,
            expected,
            self.config.timeout,
        )
        .await?;

        match outcome {
            ProbeOutcome::Connected { rtt } => {
                debug!("{} -> {}: reply in {:?}", source.name(), candidate.name(), rtt);
            }
            ProbeOutcome::NoReply(reason) => {
                debug!("{} -> {}: {}", source.name(), candidate.name(), reason);
            }
        }

        Ok(outcome)
    }
}

/// Local bind address and destination for an echo from `source` to
/// `candidate`.
///
/// Both carry `scope_id`, the *source* interface's index: a link-local
/// destination is only reachable through the interface it is sent from.
pub fn echo_endpoints(
    source: &Link,
    candidate: &Link,
    scope_id: u32,
) -> (SocketAddr, SocketAddr) {
    let bind = SocketAddrV6::new(source.address(), 0, 0, scope_id);
    let dest = SocketAddrV6::new(candidate.address(), 0, 0, scope_id);
    (SocketAddr::V6(bind), SocketAddr::V6(dest))
}

/// Send one request on `socket` and wait at most `timeout` for one reply.
///
/// Only a send failure is an error. Whatever happens after the request is
/// on the wire is folded into the returned outcome.
pub async fn exchange(
    socket: &UdpSocket,
    interface: &str,
    dest: SocketAddr,
    request: &[u8],
    expected_sequence: Option<u16>,
    timeout: Duration,
) -> Result<ProbeOutcome> {
    let started = Instant::now();

    socket
        .send_to(request, dest)
        .await
        .map_err(|e| Error::Send {
            interface: interface.to_string(),
            dest,
            reason: e.to_string(),
        })?;

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let (len, from) = match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Err(_) => return Ok(ProbeOutcome::NoReply(NoReplyReason::Timeout)),
        Ok(Err(e)) => {
            debug!("receive on {} failed: {}", interface, e);
            return Ok(ProbeOutcome::NoReply(NoReplyReason::ReceiveFailed));
        }
        Ok(Ok(received)) => received,
    };

    trace!("{} bytes from {} on {}", len, from, interface);
    Ok(classify_reply(&buf[..len], expected_sequence, started.elapsed()))
}

/// Decide what a received datagram means for the probe.
pub fn classify_reply(data: &[u8], expected_sequence: Option<u16>, rtt: Duration) -> ProbeOutcome {
    let msg = match Icmpv6Message::parse(data) {
        Ok(msg) => msg,
        Err(e) => {
            trace!("unparseable reply: {}", e);
            return ProbeOutcome::NoReply(NoReplyReason::Malformed);
        }
    };

    if !msg.is_echo_reply() {
        if msg.kind.is_error() {
            trace!("ICMPv6 error {:?} code {}", msg.kind, msg.code);
        }
        return ProbeOutcome::NoReply(NoReplyReason::UnexpectedType(msg.kind.as_u8()));
    }

    if let (Some(expected), Some(echo)) = (expected_sequence, msg.echo.as_ref()) {
        if echo.sequence != expected {
            return ProbeOutcome::NoReply(NoReplyReason::SequenceMismatch {
                expected,
                got: echo.sequence,
            });
        }
    }

    ProbeOutcome::Connected { rtt }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RTT: Duration = Duration::from_micros(80);

    #[test]
    fn test_echo_endpoints_use_source_scope() {
        let source = Link::new("eth0", "fe80::1".parse().unwrap())
            .unwrap()
            .with_index(2);
        let candidate = Link::new("eth1", "fe80::2".parse().unwrap())
            .unwrap()
            .with_index(3);

        let (bind, dest) = echo_endpoints(&source, &candidate, source.index());

        let SocketAddr::V6(bind) = bind else {
            panic!("bind address is not IPv6: {bind}");
        };
        let SocketAddr::V6(dest) = dest else {
            panic!("destination is not IPv6: {dest}");
        };
        assert_eq!(*bind.ip(), source.address());
        assert_eq!(bind.port(), 0);
        assert_eq!(bind.scope_id(), 2);
        assert_eq!(*dest.ip(), candidate.address());
        assert_eq!(dest.scope_id(), 2);
        assert_ne!(dest.scope_id(), candidate.index());
    }

    fn reply(sequence: u16) -> Vec<u8> {
        EchoMessage::request(0x0101, sequence, ECHO_PAYLOAD)
            .reply_to()
            .encode()
            .unwrap()
    }

    #[test]
    fn test_classify_matching_reply() {
        assert_eq!(
            classify_reply(&reply(5), Some(5), RTT),
            ProbeOutcome::Connected { rtt: RTT }
        );
    }

    #[test]
    fn test_classify_sequence_mismatch() {
        assert_eq!(
            classify_reply(&reply(4), Some(5), RTT),
            ProbeOutcome::NoReply(NoReplyReason::SequenceMismatch {
                expected: 5,
                got: 4
            })
        );
        // Without verification any echo reply counts
        assert!(classify_reply(&reply(4), None, RTT).is_connected());
    }

    #[test]
    fn test_classify_wrong_type() {
        let request = EchoMessage::request(1, 5, ECHO_PAYLOAD).encode().unwrap();
        assert_eq!(
            classify_reply(&request, Some(5), RTT),
            ProbeOutcome::NoReply(NoReplyReason::UnexpectedType(128))
        );

        let unreachable = [1u8, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            classify_reply(&unreachable, None, RTT),
            ProbeOutcome::NoReply(NoReplyReason::UnexpectedType(1))
        );
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(
            classify_reply(&[0x45], Some(1), RTT),
            ProbeOutcome::NoReply(NoReplyReason::Malformed)
        );
        assert_eq!(
            classify_reply(&[129, 0, 0, 0, 0], None, RTT),
            ProbeOutcome::NoReply(NoReplyReason::Malformed)
        );
    }

    #[test]
    fn test_scope_id_prefers_known_index() {
        let link = Link::new("does-not-exist0", "fe80::1".parse().unwrap())
            .unwrap()
            .with_index(7);
        assert_eq!(IcmpProber::scope_id(&link).unwrap(), 7);

        let link = Link::new("does-not-exist0", "fe80::1".parse().unwrap()).unwrap();
        assert!(matches!(
            IcmpProber::scope_id(&link),
            Err(Error::UnknownInterface(_))
        ));
    }
}
