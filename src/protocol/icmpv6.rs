//! ICMPv6 message encoding and parsing (RFC 4443).
//!
//! Only the Echo Request/Reply bodies are interpreted. Every other type
//! is parsed down to its type/code so the probe can tell what it got.

use byteorder::{BigEndian, ByteOrder};

use crate::error::ProtocolError;

use super::{ECHO_HEADER_SIZE, ICMPV6_HEADER_SIZE, MAX_ECHO_PAYLOAD};

/// ICMPv6 message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icmpv6Type {
    DestinationUnreachable,
    PacketTooBig,
    TimeExceeded,
    ParameterProblem,
    EchoRequest,
    EchoReply,
    RouterSolicitation,
    RouterAdvertisement,
    NeighborSolicitation,
    NeighborAdvertisement,
    Redirect,
    Other(u8),
}

impl Icmpv6Type {
    /// Get the wire value.
    pub fn as_u8(self) -> u8 {
        match self {
            Icmpv6Type::DestinationUnreachable => 1,
            Icmpv6Type::PacketTooBig => 2,
            Icmpv6Type::TimeExceeded => 3,
            Icmpv6Type::ParameterProblem => 4,
            Icmpv6Type::EchoRequest => 128,
            Icmpv6Type::EchoReply => 129,
            Icmpv6Type::RouterSolicitation => 133,
            Icmpv6Type::RouterAdvertisement => 134,
            Icmpv6Type::NeighborSolicitation => 135,
            Icmpv6Type::NeighborAdvertisement => 136,
            Icmpv6Type::Redirect => 137,
            Icmpv6Type::Other(n) => n,
        }
    }

    /// Create from the wire value.
    pub fn from_u8(n: u8) -> Self {
        match n {
            1 => Icmpv6Type::DestinationUnreachable,
            2 => Icmpv6Type::PacketTooBig,
            3 => Icmpv6Type::TimeExceeded,
            4 => Icmpv6Type::ParameterProblem,
            128 => Icmpv6Type::EchoRequest,
            129 => Icmpv6Type::EchoReply,
            133 => Icmpv6Type::RouterSolicitation,
            134 => Icmpv6Type::RouterAdvertisement,
            135 => Icmpv6Type::NeighborSolicitation,
            136 => Icmpv6Type::NeighborAdvertisement,
            137 => Icmpv6Type::Redirect,
            _ => Icmpv6Type::Other(n),
        }
    }

    /// Error messages have the high bit of the type clear.
    pub fn is_error(self) -> bool {
        self.as_u8() < 128
    }

    pub fn is_echo(self) -> bool {
        matches!(self, Icmpv6Type::EchoRequest | Icmpv6Type::EchoReply)
    }
}

/// An ICMPv6 Echo Request or Echo Reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoMessage {
    pub kind: Icmpv6Type,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoMessage {
    /// Create an Echo Request.
    pub fn request(identifier: u16, sequence: u16, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: Icmpv6Type::EchoRequest,
            code: 0,
            identifier,
            sequence,
            payload: payload.into(),
        }
    }

    /// Create the Echo Reply a peer would send back for this message.
    pub fn reply_to(&self) -> Self {
        Self {
            kind: Icmpv6Type::EchoReply,
            code: 0,
            identifier: self.identifier,
            sequence: self.sequence,
            payload: self.payload.clone(),
        }
    }

    /// Encode to bytes.
    ///
    /// The checksum field is left zero. The kernel computes the ICMPv6
    /// checksum for ICMPv6 sockets since it covers the IPv6 pseudo-header.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.payload.len() > MAX_ECHO_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_ECHO_PAYLOAD,
            });
        }

        let mut buf = vec![0u8; ECHO_HEADER_SIZE + self.payload.len()];
        buf[0] = self.kind.as_u8();
        buf[1] = self.code;
        BigEndian::write_u16(&mut buf[4..6], self.identifier);
        BigEndian::write_u16(&mut buf[6..8], self.sequence);
        buf[ECHO_HEADER_SIZE..].copy_from_slice(&self.payload);
        Ok(buf)
    }
}

/// A parsed ICMPv6 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmpv6Message {
    pub kind: Icmpv6Type,
    pub code: u8,
    pub checksum: u16,
    /// Present for Echo Request and Echo Reply only.
    pub echo: Option<EchoMessage>,
}

impl Icmpv6Message {
    /// Parse an ICMPv6 message (without the IPv6 header).
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < ICMPV6_HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                len: buf.len(),
                needed: ICMPV6_HEADER_SIZE,
            });
        }

        let kind = Icmpv6Type::from_u8(buf[0]);
        let code = buf[1];
        let checksum = BigEndian::read_u16(&buf[2..4]);

        let echo = if kind.is_echo() {
            if buf.len() < ECHO_HEADER_SIZE {
                return Err(ProtocolError::Truncated {
                    len: buf.len(),
                    needed: ECHO_HEADER_SIZE,
                });
            }
            Some(EchoMessage {
                kind,
                code,
                identifier: BigEndian::read_u16(&buf[4..6]),
                sequence: BigEndian::read_u16(&buf[6..8]),
                payload: buf[ECHO_HEADER_SIZE..].to_vec(),
            })
        } else {
            None
        };

        Ok(Self {
            kind,
            code,
            checksum,
            echo,
        })
    }

    pub fn is_echo_reply(&self) -> bool {
        self.kind == Icmpv6Type::EchoReply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_echo_request() {
        let msg = EchoMessage::request(0x1234, 7, b"Loopy?".to_vec());
        let buf = msg.encode().unwrap();

        assert_eq!(buf.len(), 14);
        assert_eq!(buf[0], 128);
        assert_eq!(buf[1], 0);
        assert_eq!(&buf[2..4], &[0, 0]);
        assert_eq!(&buf[4..6], &[0x12, 0x34]);
        assert_eq!(&buf[6..8], &[0x00, 0x07]);
        assert_eq!(&buf[8..], b"Loopy?");
    }

    #[test]
    fn test_parse_echo_reply() {
        let reply = EchoMessage::request(42, 300, b"Loopy?".to_vec()).reply_to();
        let mut buf = reply.encode().unwrap();
        // Kernel-filled checksum on the way back
        buf[2] = 0xab;
        buf[3] = 0xcd;

        let msg = Icmpv6Message::parse(&buf).unwrap();
        assert!(msg.is_echo_reply());
        assert_eq!(msg.checksum, 0xabcd);
        let echo = msg.echo.unwrap();
        assert_eq!(echo.identifier, 42);
        assert_eq!(echo.sequence, 300);
        assert_eq!(echo.payload, b"Loopy?");
    }

    #[test]
    fn test_parse_non_echo_type() {
        // Neighbor Solicitation: type, code, checksum, reserved, target
        let mut buf = vec![135, 0, 0x12, 0x34, 0, 0, 0, 0];
        buf.extend_from_slice(&[0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);

        let msg = Icmpv6Message::parse(&buf).unwrap();
        assert_eq!(msg.kind, Icmpv6Type::NeighborSolicitation);
        assert!(!msg.is_echo_reply());
        assert!(msg.echo.is_none());
    }

    #[test]
    fn test_parse_destination_unreachable() {
        let buf = [1, 3, 0, 0, 0, 0, 0, 0];
        let msg = Icmpv6Message::parse(&buf).unwrap();
        assert_eq!(msg.kind, Icmpv6Type::DestinationUnreachable);
        assert_eq!(msg.code, 3);
        assert!(msg.kind.is_error());
    }

    #[test]
    fn test_parse_truncated() {
        assert_eq!(
            Icmpv6Message::parse(&[129, 0]),
            Err(ProtocolError::Truncated { len: 2, needed: 4 })
        );
        // Echo Reply header cut short before the sequence number
        assert_eq!(
            Icmpv6Message::parse(&[129, 0, 0, 0, 0, 1]),
            Err(ProtocolError::Truncated { len: 6, needed: 8 })
        );
        assert!(Icmpv6Message::parse(&[]).is_err());
    }

    #[test]
    fn test_payload_too_large() {
        let msg = EchoMessage::request(1, 1, vec![0u8; MAX_ECHO_PAYLOAD + 1]);
        assert_eq!(
            msg.encode(),
            Err(ProtocolError::PayloadTooLarge {
                size: MAX_ECHO_PAYLOAD + 1,
                max: MAX_ECHO_PAYLOAD,
            })
        );
    }

    #[test]
    fn test_type_mapping() {
        for n in 0..=255u8 {
            assert_eq!(Icmpv6Type::from_u8(n).as_u8(), n);
        }
        assert_eq!(Icmpv6Type::from_u8(200), Icmpv6Type::Other(200));
        assert!(!Icmpv6Type::EchoReply.is_error());
    }
}
