//! # Loopy
//!
//! Link-layer connectivity verifier for multi-homed hosts.
//!
//! For every pair of local interfaces carrying an IPv6 link-local address,
//! Loopy sends an ICMPv6 Echo Request out of one interface to the other
//! interface's address and reports the pairs that answer. This finds
//! interfaces wired to each other, whether through a switch, a patch cable
//! or an accidental loop.
//!
//! ## Flow
//!
//! ```text
//!  discover_links ──► ConnectivityChecker ──► Prober (ICMPv6 echo)
//!                            │
//!                            ▼
//!                       Aggregator ──► ReportSink
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)] // 16-bit wire fields
#![allow(clippy::option_if_let_else)]
#![allow(clippy::use_self)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::future_not_send)]

pub mod check;
pub mod config;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

use std::time::Duration;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default wait for an Echo Reply.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Payload carried by every Echo Request.
pub const ECHO_PAYLOAD: &[u8] = b"Loopy?";

/// Placeholder for metadata that could not be read.
pub const UNKNOWN: &str = "???";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::check::{
        Aggregator, CheckSummary, ConnectivityChecker, ReportSink, ReportWriter,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::probe::{IcmpProber, ProbeConfig, Prober, SequenceCounter};
    pub use crate::types::*;
    pub use crate::util::{
        discover_links, AddressProvider, DiscoveryConfig, MetadataProvider, SysfsMetadata,
        SystemAddressProvider,
    };
}
