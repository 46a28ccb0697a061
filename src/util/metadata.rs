//! Interface hardware metadata from sysfs.
//!
//! Everything here is best effort. A missing file or unparsable value
//! becomes the `???` sentinel and never stops a run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::LinkMetadata;
use crate::UNKNOWN;

/// Default sysfs directory holding one entry per network interface.
pub const SYSFS_NET: &str = "/sys/class/net";

/// Source of descriptive interface metadata.
pub trait MetadataProvider: Send + Sync {
    /// Look up metadata for `interface`. Never fails.
    fn metadata(&self, interface: &str) -> LinkMetadata;

    /// Hardware address of `interface` as the system writes it, if it has
    /// one. Not limited to 6-byte MACs (InfiniBand uses 20 bytes).
    fn hardware_address(&self, interface: &str) -> Option<String>;
}

/// Reads metadata from `/sys/class/net/<interface>`.
#[derive(Debug, Clone)]
pub struct SysfsMetadata {
    root: PathBuf,
}

impl SysfsMetadata {
    pub fn new() -> Self {
        Self::with_root(SYSFS_NET)
    }

    /// Use a different directory in place of `/sys/class/net`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn iface_path(&self, interface: &str) -> PathBuf {
        self.root.join(interface)
    }

    /// Driver name: basename of the `device/driver` symlink.
    pub fn driver(&self, interface: &str) -> String {
        link_basename(&self.iface_path(interface).join("device").join("driver"))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Link speed from the `speed` attribute (Mb/s).
    pub fn speed(&self, interface: &str) -> String {
        let path = self.iface_path(interface).join("speed");
        match fs::read_to_string(&path) {
            Ok(raw) => format_speed(raw.trim()).unwrap_or_else(|| {
                debug!("unusable speed {:?} for {}", raw.trim(), interface);
                UNKNOWN.to_string()
            }),
            Err(e) => {
                debug!("cannot read {}: {}", path.display(), e);
                UNKNOWN.to_string()
            }
        }
    }

    /// Bus path: basename of the `device` symlink (a PCI address for PCI NICs).
    pub fn bus_path(&self, interface: &str) -> String {
        link_basename(&self.iface_path(interface).join("device"))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

impl Default for SysfsMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for SysfsMetadata {
    fn metadata(&self, interface: &str) -> LinkMetadata {
        LinkMetadata::new(
            self.driver(interface),
            self.speed(interface),
            self.bus_path(interface),
        )
    }

    fn hardware_address(&self, interface: &str) -> Option<String> {
        let raw = fs::read_to_string(self.iface_path(interface).join("address")).ok()?;
        let addr = raw.trim();
        (!addr.is_empty()).then(|| addr.to_string())
    }
}

fn link_basename(path: &Path) -> Option<String> {
    match fs::read_link(path) {
        Ok(target) => target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        Err(e) => {
            debug!("cannot read link {}: {}", path.display(), e);
            None
        }
    }
}

/// Turn a sysfs speed value in Mb/s into a display label.
///
/// Gigabit and faster speeds are shown in whole Gbps. Unknown speeds
/// (`-1` on a link without carrier) yield `None`.
pub fn format_speed(mbps: &str) -> Option<String> {
    let speed: u32 = mbps.parse().ok()?;
    if speed >= 1000 {
        Some(format!("{:.0} Gbps", f64::from(speed) / 1000.0))
    } else {
        Some(format!("{speed} Mbps"))
    }
}
