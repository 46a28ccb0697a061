//! ICMPv6 wire format.
//!
//! Message layout (RFC 4443):
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |     Code      |          Checksum             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           Identifier          |        Sequence Number        |  (echo only)
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Data ...
//! +-+-+-+-+-
//! ```

mod icmpv6;

pub use icmpv6::{EchoMessage, Icmpv6Message, Icmpv6Type};

/// Type + code + checksum.
pub const ICMPV6_HEADER_SIZE: usize = 4;

/// Common header plus identifier and sequence number.
pub const ECHO_HEADER_SIZE: usize = 8;

/// Largest echo payload that fits the IPv6 minimum MTU (1280 - 40 - 8).
pub const MAX_ECHO_PAYLOAD: usize = 1232;
