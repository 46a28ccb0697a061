//! Core types used throughout Loopy.

use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::UNKNOWN;

/// Check whether an address is a unicast link-local address (`fe80::/10`).
pub fn is_link_local_unicast(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Best-effort descriptive metadata for an interface.
///
/// Display-only. Any field that could not be read holds [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Kernel driver name (e.g. `ixgbe`).
    pub driver: String,
    /// Human-readable link speed (e.g. `10 Gbps`).
    pub speed: String,
    /// Underlying bus path (e.g. PCI address `0000:03:00.0`).
    pub bus_path: String,
}

impl LinkMetadata {
    pub fn new(
        driver: impl Into<String>,
        speed: impl Into<String>,
        bus_path: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            speed: speed.into(),
            bus_path: bus_path.into(),
        }
    }

    /// Metadata with every field set to the unknown sentinel.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN, UNKNOWN)
    }
}

impl Default for LinkMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One usable local endpoint: an interface paired with one of its
/// link-local IPv6 addresses.
///
/// A `Link` can only be built from a link-local unicast address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    name: String,
    index: u32,
    address: Ipv6Addr,
    mac: Option<String>,
    metadata: LinkMetadata,
}

impl Link {
    /// Create a link, or `None` if `address` is not link-local unicast.
    pub fn new(name: impl Into<String>, address: Ipv6Addr) -> Option<Self> {
        if !is_link_local_unicast(&address) {
            return None;
        }

        Some(Self {
            name: name.into(),
            index: 0,
            address,
            mac: None,
            metadata: LinkMetadata::unknown(),
        })
    }

    /// Set the interface index used as the scope id.
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Set the hardware address shown in the Addresses section.
    pub fn with_mac(mut self, mac: Option<String>) -> Self {
        self.mac = mac;
        self
    }

    pub fn with_metadata(mut self, metadata: LinkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface index, or 0 if it was not known at discovery time.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn address(&self) -> Ipv6Addr {
        self.address
    }

    pub fn mac(&self) -> Option<&str> {
        self.mac.as_deref()
    }

    pub fn metadata(&self) -> &LinkMetadata {
        &self.metadata
    }

    pub fn driver(&self) -> &str {
        &self.metadata.driver
    }

    pub fn speed(&self) -> &str {
        &self.metadata.speed
    }

    pub fn bus_path(&self) -> &str {
        &self.metadata.bus_path
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%{}", self.address, self.name)
    }
}

/// Direction-independent identity of an unordered interface pair.
///
/// Names are ordered byte-wise, so `PairKey::new(a, b) == PairKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey([String; 2]);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self([a.to_string(), b.to_string()])
        } else {
            Self([b.to_string(), a.to_string()])
        }
    }

    /// Key for the pair of interfaces behind two links.
    pub fn for_links(a: &Link, b: &Link) -> Self {
        Self::new(a.name(), b.name())
    }

    /// The lexicographically smaller name.
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    /// The lexicographically larger name.
    pub fn second(&self) -> &str {
        &self.0[1]
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.0[0], self.0[1])
    }
}

/// Why a probe did not confirm connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoReplyReason {
    /// Nothing arrived within the wait bound.
    Timeout,
    /// The receive call itself failed.
    ReceiveFailed,
    /// Something arrived but did not parse as ICMPv6.
    Malformed,
    /// A valid ICMPv6 message that is not an Echo Reply.
    UnexpectedType(u8),
    /// An Echo Reply for a different request.
    SequenceMismatch { expected: u16, got: u16 },
}

impl fmt::Display for NoReplyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoReplyReason::Timeout => write!(f, "timeout"),
            NoReplyReason::ReceiveFailed => write!(f, "receive failed"),
            NoReplyReason::Malformed => write!(f, "malformed reply"),
            NoReplyReason::UnexpectedType(t) => write!(f, "unexpected ICMPv6 type {t}"),
            NoReplyReason::SequenceMismatch { expected, got } => {
                write!(f, "sequence mismatch: expected {expected}, got {got}")
            }
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A matching Echo Reply arrived.
    Connected { rtt: Duration },
    /// No matching reply. Never an error.
    NoReply(NoReplyReason),
}

impl ProbeOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ProbeOutcome::Connected { .. })
    }

    pub fn rtt(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Connected { rtt } => Some(*rtt),
            ProbeOutcome::NoReply(_) => None,
        }
    }
}

/// One confirmed connection, as reported in the Connectivity section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    /// Interface the probe was sent from.
    pub source: String,
    pub source_driver: String,
    /// Interface whose address answered.
    pub peer: String,
    pub peer_driver: String,
    /// Link speed of the source interface.
    pub speed: String,
    pub rtt: Duration,
}

impl ConnectionReport {
    pub fn new(source: &Link, peer: &Link, rtt: Duration) -> Self {
        Self {
            source: source.name().to_string(),
            source_driver: source.driver().to_string(),
            peer: peer.name().to_string(),
            peer_driver: peer.driver().to_string(),
            speed: source.speed().to_string(),
            rtt,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.source, &self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_link_requires_link_local() {
        assert!(Link::new("eth0", addr("fe80::1")).is_some());
        assert!(Link::new("eth0", addr("febf::1")).is_some());
        assert!(Link::new("eth0", addr("fec0::1")).is_none());
        assert!(Link::new("eth0", addr("2001:db8::1")).is_none());
        assert!(Link::new("lo", addr("::1")).is_none());
        assert!(Link::new("eth0", addr("ff02::1")).is_none());
    }

    #[test]
    fn test_link_defaults_to_unknown_metadata() {
        let link = Link::new("eth0", addr("fe80::1")).unwrap();
        assert_eq!(link.driver(), UNKNOWN);
        assert_eq!(link.speed(), UNKNOWN);
        assert_eq!(link.bus_path(), UNKNOWN);
        assert_eq!(link.index(), 0);
        assert_eq!(link.to_string(), "fe80::1%eth0");
    }

    #[test]
    fn test_pair_key_symmetry() {
        let names = ["eth0", "eth1", "eth10", "enp3s0f1", "a", "", "ETH0"];
        for a in names {
            for b in names {
                assert_eq!(PairKey::new(a, b), PairKey::new(b, a), "{a} / {b}");
            }
        }
    }

    #[test]
    fn test_pair_key_order_is_bytewise() {
        let key = PairKey::new("eth2", "eth10");
        assert_eq!(key.first(), "eth10");
        assert_eq!(key.second(), "eth2");
        assert_eq!(key.to_string(), "eth10<->eth2");
    }

    #[test]
    fn test_probe_outcome() {
        let ok = ProbeOutcome::Connected {
            rtt: Duration::from_micros(250),
        };
        assert!(ok.is_connected());
        assert_eq!(ok.rtt(), Some(Duration::from_micros(250)));

        let miss = ProbeOutcome::NoReply(NoReplyReason::Timeout);
        assert!(!miss.is_connected());
        assert_eq!(miss.rtt(), None);
    }

    #[test]
    fn test_connection_report_uses_source_speed() {
        let a = Link::new("eth0", addr("fe80::1"))
            .unwrap()
            .with_metadata(LinkMetadata::new("ixgbe", "10 Gbps", "0000:03:00.0"));
        let b = Link::new("eth1", addr("fe80::2"))
            .unwrap()
            .with_metadata(LinkMetadata::new("igb", "1 Gbps", "0000:04:00.0"));

        let report = ConnectionReport::new(&b, &a, Duration::from_millis(1));
        assert_eq!(report.speed, "1 Gbps");
        assert_eq!(report.source_driver, "igb");
        assert_eq!(report.peer_driver, "ixgbe");
        assert_eq!(report.key(), PairKey::new("eth0", "eth1"));
    }
}
