//! Network interface discovery.
//!
//! Enumerates local interfaces and turns every IPv6 link-local unicast
//! address into a [`Link`].

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::types::{is_link_local_unicast, Link, LinkMetadata};

use super::{natural_cmp, MetadataProvider};

/// One address assigned to one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub index: u32,
    pub address: IpAddr,
}

impl InterfaceAddress {
    pub fn new(name: impl Into<String>, index: u32, address: IpAddr) -> Self {
        Self {
            name: name.into(),
            index,
            address,
        }
    }
}

/// Source of (interface, address) pairs for the local host.
pub trait AddressProvider: Send + Sync {
    fn addresses(&self) -> Result<Vec<InterfaceAddress>>;
}

/// Enumerates addresses with `getifaddrs(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAddressProvider;

impl AddressProvider for SystemAddressProvider {
    fn addresses(&self) -> Result<Vec<InterfaceAddress>> {
        get_interface_addresses()
    }
}

/// Which interfaces take part in discovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Only consider these interfaces (empty = all).
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// Never consider these interfaces.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl DiscoveryConfig {
    /// Check whether an interface passes the include/exclude lists.
    pub fn allows(&self, name: &str) -> bool {
        (self.interfaces.is_empty() || self.interfaces.iter().any(|i| i == name))
            && !self.exclude.iter().any(|i| i == name)
    }
}

/// Build the list of links, in natural interface-name order.
///
/// Addresses that are not IPv6 link-local unicast are skipped. Metadata is
/// looked up once per interface.
pub fn discover_links(
    provider: &dyn AddressProvider,
    metadata: &dyn MetadataProvider,
    config: &DiscoveryConfig,
) -> Result<Vec<Link>> {
    let mut addresses = provider.addresses()?;
    // Stable sort keeps each interface's addresses in reported order.
    addresses.sort_by(|a, b| natural_cmp(&a.name, &b.name));

    let mut cache: HashMap<String, (LinkMetadata, Option<String>)> = HashMap::new();
    let mut links = Vec::new();

    for entry in addresses {
        if !config.allows(&entry.name) {
            trace!("skipping filtered interface {}", entry.name);
            continue;
        }

        let IpAddr::V6(v6) = entry.address else {
            continue;
        };
        if !is_link_local_unicast(&v6) {
            continue;
        }

        let (meta, mac) = cache
            .entry(entry.name.clone())
            .or_insert_with(|| {
                (
                    metadata.metadata(&entry.name),
                    metadata.hardware_address(&entry.name),
                )
            })
            .clone();

        if let Some(link) = Link::new(entry.name.clone(), v6) {
            debug!("discovered link {} ({})", link, meta.driver);
            links.push(link.with_index(entry.index).with_mac(mac).with_metadata(meta));
        }
    }

    Ok(links)
}

/// Get every (interface, address) pair on the host.
#[cfg(unix)]
pub fn get_interface_addresses() -> Result<Vec<InterfaceAddress>> {
    use std::ffi::CStr;

    let mut addresses = Vec::new();

    unsafe {
        let mut ifaddrs: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(std::ptr::addr_of_mut!(ifaddrs)) != 0 {
            return Err(Error::Discovery(
                std::io::Error::last_os_error().to_string(),
            ));
        }

        let mut current = ifaddrs;
        while !current.is_null() {
            let ifa = &*current;

            if !ifa.ifa_name.is_null() && !ifa.ifa_addr.is_null() {
                let name = CStr::from_ptr(ifa.ifa_name).to_string_lossy().into_owned();
                let family = i32::from((*ifa.ifa_addr).sa_family);

                #[allow(clippy::cast_ptr_alignment)]
                let address = match family {
                    libc::AF_INET => {
                        let sockaddr = ifa.ifa_addr.cast::<libc::sockaddr_in>();
                        Some(IpAddr::V4(std::net::Ipv4Addr::from(u32::from_be(
                            (*sockaddr).sin_addr.s_addr,
                        ))))
                    }
                    libc::AF_INET6 => {
                        let sockaddr = ifa.ifa_addr.cast::<libc::sockaddr_in6>();
                        Some(IpAddr::V6(std::net::Ipv6Addr::from(
                            (*sockaddr).sin6_addr.s6_addr,
                        )))
                    }
                    _ => None,
                };

                if let Some(address) = address {
                    let index = super::if_nametoindex(&name).unwrap_or(0);
                    addresses.push(InterfaceAddress {
                        name,
                        index,
                        address,
                    });
                }
            }

            current = ifa.ifa_next;
        }

        libc::freeifaddrs(ifaddrs);
    }

    Ok(addresses)
}

#[cfg(not(unix))]
pub fn get_interface_addresses() -> Result<Vec<InterfaceAddress>> {
    Err(Error::Discovery("interface enumeration not supported on this platform".into()))
}
