//! Human-readable report lines.

use std::io::Write;

use crate::error::Result;
use crate::types::{ConnectionReport, Link};
use crate::util::expand_ipv6;

/// Destination for confirmed connections.
pub trait ReportSink {
    fn emit(&mut self, report: &ConnectionReport) -> Result<()>;
}

impl ReportSink for Vec<ConnectionReport> {
    fn emit(&mut self, report: &ConnectionReport) -> Result<()> {
        self.push(report.clone());
        Ok(())
    }
}

/// Writes each connection as one table line as soon as it is confirmed.
#[derive(Debug)]
pub struct ReportWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Number of lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ReportWriter<W> {
    fn emit(&mut self, report: &ConnectionReport) -> Result<()> {
        writeln!(self.out, "{}", format_connection_line(report))?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// One line of the Addresses section.
pub fn format_address_line(link: &Link) -> String {
    format!(
        "\t{:<14} {}  {}  {}  {:<10}",
        link.name(),
        expand_ipv6(&link.address()),
        link.mac().unwrap_or(""),
        link.bus_path(),
        link.driver()
    )
}

/// One line of the Connectivity section.
pub fn format_connection_line(report: &ConnectionReport) -> String {
    format!(
        "\t{:<14} {:<10} | {:<14} {:<10} | {:>8}",
        report.source, report.source_driver, report.peer, report.peer_driver, report.speed
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::LinkMetadata;

    fn link(name: &str, addr: &str, driver: &str, speed: &str) -> Link {
        Link::new(name, addr.parse().unwrap())
            .unwrap()
            .with_metadata(LinkMetadata::new(driver, speed, "0000:03:00.0"))
    }

    #[test]
    fn test_format_connection_line() {
        let report = ConnectionReport::new(
            &link("eth0", "fe80::1", "ixgbe", "10 Gbps"),
            &link("eth1", "fe80::2", "ixgbe", "10 Gbps"),
            Duration::from_micros(90),
        );
        assert_eq!(
            format_connection_line(&report),
            "\teth0           ixgbe      | eth1           ixgbe      |  10 Gbps"
        );
    }

    #[test]
    fn test_format_address_line() {
        let l = link("eth0", "fe80::1", "ixgbe", "10 Gbps")
            .with_mac(Some("00:1b:21:aa:bb:0c".into()));
        assert_eq!(
            format_address_line(&l),
            concat!(
                "\teth0           fe80:0000:0000:0000:0000:0000:0000:0001  ",
                "00:1b:21:aa:bb:0c  0000:03:00.0  ixgbe     "
            )
        );
    }

    #[test]
    fn test_report_writer() {
        let report = ConnectionReport::new(
            &link("eth0", "fe80::1", "igb", "1 Gbps"),
            &link("eth1", "fe80::2", "igb", "1 Gbps"),
            Duration::from_micros(90),
        );

        let mut writer = ReportWriter::new(Vec::new());
        writer.emit(&report).unwrap();
        assert_eq!(writer.written(), 1);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, format!("{}\n", format_connection_line(&report)));
    }
}
