//! Connectivity probing between two links.
//!
//! A probe sends one ICMPv6 Echo Request out of the source link, addressed
//! to the candidate link's address, and waits a bounded time for the reply.

mod icmp;
mod socket;

pub use icmp::{classify_reply, echo_endpoints, exchange, IcmpProber};
pub use socket::open_icmpv6_socket;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Link, ProbeOutcome};
use crate::DEFAULT_PROBE_TIMEOUT;

/// Upper bound accepted for the reply wait.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// How long to wait for an Echo Reply.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Only accept replies whose sequence number matches the request.
    #[serde(default = "default_verify_sequence")]
    pub verify_sequence: bool,

    /// Number of interface pairs probed in parallel (1 = sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Also pin the socket to the interface with SO_BINDTODEVICE (Linux only).
    #[serde(default)]
    pub bind_device: bool,
}

fn default_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}
fn default_verify_sequence() -> bool {
    true
}
fn default_concurrency() -> usize {
    1
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            verify_sequence: default_verify_sequence(),
            concurrency: default_concurrency(),
            bind_device: false,
        }
    }
}

impl ProbeConfig {
    /// Validate probe settings.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("probe timeout must be positive".into()));
        }
        if self.timeout > MAX_PROBE_TIMEOUT {
            return Err(Error::InvalidConfig(format!(
                "probe timeout {:?} exceeds maximum {:?}",
                self.timeout, MAX_PROBE_TIMEOUT
            )));
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig("concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

/// Something that can test whether `source` reaches `candidate`.
///
/// `sequence` comes from the run's [`SequenceCounter`]. Negative outcomes
/// are returned as [`ProbeOutcome::NoReply`]; an `Err` means the run
/// cannot continue.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, source: &Link, candidate: &Link, sequence: u64)
        -> Result<ProbeOutcome>;
}

/// Run-wide echo sequence counter.
///
/// Values start at 1 and strictly increase. The wire field only carries
/// the low 16 bits.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    last: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sequence value.
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of values handed out so far.
    pub fn allocated(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

/// Echo identifier for this process: the pid truncated to 16 bits.
pub fn echo_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Truncate a run sequence value to the 16-bit wire field.
pub fn wire_sequence(sequence: u64) -> u16 {
    (sequence & 0xffff) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counter_monotonic() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.allocated(), 0);

        let values: Vec<u64> = (0..1000).map(|_| counter.next()).collect();
        assert_eq!(values[0], 1);
        assert!(values.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(counter.allocated(), 1000);
    }

    #[test]
    fn test_sequence_counter_shared_across_threads() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let counter = Arc::new(SequenceCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..250).map(|_| counter.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "sequence {value} reused");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_wire_sequence_wraps() {
        assert_eq!(wire_sequence(1), 1);
        assert_eq!(wire_sequence(0xffff), 0xffff);
        assert_eq!(wire_sequence(0x1_0002), 2);
    }

    #[test]
    fn test_echo_identifier_is_stable() {
        assert_eq!(echo_identifier(), echo_identifier());
        assert_eq!(u32::from(echo_identifier()), std::process::id() & 0xffff);
    }

    #[test]
    fn test_probe_config_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(100));
        assert!(config.verify_sequence);
        assert_eq!(config.concurrency, 1);
        assert!(!config.bind_device);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_probe_config_validation() {
        let mut config = ProbeConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.timeout = Duration::from_secs(11);
        assert!(config.validate().is_err());

        config.timeout = Duration::from_millis(250);
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }
}
