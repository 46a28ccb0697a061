//! Pairwise connectivity check.
//!
//! Walks every ordered pair of links, probes the ones whose interface pair
//! is not yet confirmed, and hands outcomes to the [`Aggregator`].

mod aggregator;
mod report;

pub use aggregator::Aggregator;
pub use report::{format_address_line, format_connection_line, ReportSink, ReportWriter};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::error::Result;
use crate::probe::{Prober, SequenceCounter};
use crate::types::{Link, PairKey, ProbeOutcome};

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Links taking part.
    pub links: usize,
    /// Ordered pairs considered.
    pub pairs_total: usize,
    /// Probes actually sent.
    pub probes_sent: usize,
    /// Ordered pairs skipped because the interface pair was already confirmed.
    pub skipped: usize,
    /// Distinct interface pairs confirmed connected.
    pub connected: usize,
    pub elapsed: Duration,
}

/// Drives probes over all link pairs.
pub struct ConnectivityChecker<P: Prober> {
    prober: P,
    sequence: SequenceCounter,
    concurrency: usize,
}

impl<P: Prober> ConnectivityChecker<P> {
    /// Create a sequential checker.
    pub fn new(prober: P) -> Self {
        Self {
            prober,
            sequence: SequenceCounter::new(),
            concurrency: 1,
        }
    }

    /// Probe up to `concurrency` interface pairs at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Sequence values allocated so far.
    pub fn sequences_allocated(&self) -> u64 {
        self.sequence.allocated()
    }

    /// Check every pair of `links`.
    ///
    /// Stops at the first probe error. Pairs confirmed before that point
    /// have already reached the aggregator's sink.
    pub async fn run<S: ReportSink>(
        &self,
        links: &[Link],
        aggregator: &mut Aggregator<S>,
    ) -> Result<CheckSummary> {
        let started = Instant::now();
        let before = aggregator.completed_count();

        let mut summary = if self.concurrency > 1 {
            self.run_concurrent(links, aggregator).await?
        } else {
            self.run_sequential(links, aggregator).await?
        };

        summary.links = links.len();
        summary.connected = aggregator.completed_count() - before;
        summary.elapsed = started.elapsed();

        info!(
            "checked {} links: {} probes, {} pairs connected in {:?}",
            summary.links, summary.probes_sent, summary.connected, summary.elapsed
        );
        Ok(summary)
    }

    async fn run_sequential<S: ReportSink>(
        &self,
        links: &[Link],
        aggregator: &mut Aggregator<S>,
    ) -> Result<CheckSummary> {
        let mut summary = CheckSummary::default();

        for (source, candidate) in ordered_pairs(links) {
            summary.pairs_total += 1;

            if aggregator.is_completed(&PairKey::for_links(source, candidate)) {
                summary.skipped += 1;
                continue;
            }

            let outcome = self.probe_once(source, candidate).await?;
            summary.probes_sent += 1;
            aggregator.record(source, candidate, &outcome)?;
        }

        Ok(summary)
    }

    /// Each interface pair is owned by exactly one task, which tries its
    /// directions in enumeration order until one succeeds. Outcomes are
    /// recorded here, on the driving task, in pair order.
    async fn run_concurrent<S: ReportSink>(
        &self,
        links: &[Link],
        aggregator: &mut Aggregator<S>,
    ) -> Result<CheckSummary> {
        let mut summary = CheckSummary::default();
        let mut groups: Vec<(PairKey, Vec<(&Link, &Link)>)> = Vec::new();
        let mut slots: HashMap<PairKey, usize> = HashMap::new();

        for (source, candidate) in ordered_pairs(links) {
            summary.pairs_total += 1;

            let key = PairKey::for_links(source, candidate);
            if aggregator.is_completed(&key) {
                summary.skipped += 1;
                continue;
            }

            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push((source, candidate));
        }

        debug!(
            "probing {} interface pairs, {} at a time",
            groups.len(),
            self.concurrency
        );

        let mut results = stream::iter(groups)
            .map(|(key, directions)| async move {
                let mut sent = 0;
                for (source, candidate) in directions.iter().copied() {
                    let outcome = self.probe_once(source, candidate).await?;
                    sent += 1;
                    if outcome.is_connected() {
                        return Ok((key, sent, Some((source, candidate, outcome))));
                    }
                }
                Ok::<_, crate::Error>((key, sent, None))
            })
            .buffered(self.concurrency);

        while let Some(result) = results.next().await {
            let (key, sent, confirmed) = result?;
            summary.probes_sent += sent;
            if let Some((source, candidate, outcome)) = confirmed {
                aggregator.record(source, candidate, &outcome)?;
            } else {
                debug!("{} not connected", key);
            }
        }

        // Directions never tried count as skipped, as they would be sequentially.
        summary.skipped = summary.pairs_total - summary.probes_sent;
        Ok(summary)
    }

    async fn probe_once(&self, source: &Link, candidate: &Link) -> Result<ProbeOutcome> {
        let sequence = self.sequence.next();
        self.prober.probe(source, candidate, sequence).await
    }
}

/// All ordered pairs `(links[i], links[j])` with `i != j`, in enumeration
/// order.
///
/// Two addresses on the same interface still form a pair; their key is
/// `[name, name]`.
pub fn ordered_pairs(links: &[Link]) -> impl Iterator<Item = (&Link, &Link)> {
    links.iter().enumerate().flat_map(move |(i, source)| {
        links
            .iter()
            .enumerate()
            .filter(move |&(j, _)| i != j)
            .map(move |(_, candidate)| (source, candidate))
    })
}
