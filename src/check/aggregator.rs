//! Deduplicating record of confirmed connections.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::types::{ConnectionReport, Link, PairKey, ProbeOutcome};

use super::ReportSink;

/// Owns the set of interface pairs already confirmed connected.
///
/// Each unordered pair is emitted at most once, whichever direction
/// succeeds first.
#[derive(Debug)]
pub struct Aggregator<S: ReportSink> {
    completed: HashSet<PairKey>,
    sink: S,
}

impl<S: ReportSink> Aggregator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            completed: HashSet::new(),
            sink,
        }
    }

    /// Check whether a pair has already been confirmed.
    pub fn is_completed(&self, key: &PairKey) -> bool {
        self.completed.contains(key)
    }

    /// Feed one probe outcome.
    ///
    /// Returns `true` if this call confirmed a new pair and emitted a line.
    pub fn record(
        &mut self,
        source: &Link,
        candidate: &Link,
        outcome: &ProbeOutcome,
    ) -> Result<bool> {
        let ProbeOutcome::Connected { rtt } = *outcome else {
            return Ok(false);
        };

        let key = PairKey::for_links(source, candidate);
        if !self.completed.insert(key) {
            debug!("{} -> {} already reported", source.name(), candidate.name());
            return Ok(false);
        }

        self.sink.emit(&ConnectionReport::new(source, candidate, rtt))?;
        Ok(true)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Confirmed pairs in canonical order.
    pub fn completed(&self) -> Vec<PairKey> {
        let mut keys: Vec<_> = self.completed.iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
