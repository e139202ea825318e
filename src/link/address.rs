//! Self-address resolution.
//!
//! [`AddressResolver`] walks an ordered list of [`ResolutionStrategy`]
//! values and returns the first address one of them yields. The chain is
//! plain data built from configuration, and interface enumeration sits
//! behind [`InterfaceSource`] so the whole chain can be exercised without
//! touching the host's network stack.

use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};

use crate::error::RouterError;

/// One address assigned to a local network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    /// Interface name (e.g. `eth0`).
    pub name: String,
    /// Assigned address.
    pub ip: IpAddr,
    /// Network prefix length derived from the netmask.
    pub prefix_len: u8,
    /// Whether the address belongs to a loopback interface.
    pub loopback: bool,
}

/// Lists the host's interface addresses.
pub trait InterfaceSource: Send + Sync + fmt::Debug {
    /// Returns every address currently assigned to a local interface.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the operating system query fails.
    fn interfaces(&self) -> std::io::Result<Vec<InterfaceAddr>>;
}

/// Reads interfaces from the operating system via `if-addrs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> std::io::Result<Vec<InterfaceAddr>> {
        let addrs = if_addrs::get_if_addrs()?
            .into_iter()
            .map(|iface| {
                let loopback = iface.is_loopback();
                let (ip, prefix_len) = match &iface.addr {
                    if_addrs::IfAddr::V4(v4) => {
                        (IpAddr::V4(v4.ip), u32::from(v4.netmask).count_ones())
                    }
                    if_addrs::IfAddr::V6(v6) => {
                        (IpAddr::V6(v6.ip), u128::from(v6.netmask).count_ones())
                    }
                };
                InterfaceAddr {
                    name: iface.name,
                    ip,
                    prefix_len: u8::try_from(prefix_len).unwrap_or(u8::MAX),
                    loopback,
                }
            })
            .collect();
        Ok(addrs)
    }
}

/// One step of the self-address fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// First non-loopback IPv4 address on a network of exactly
    /// `prefix_len` bits.
    LocalInterface {
        /// Expected network prefix length, 24 for a typical site LAN.
        prefix_len: u8,
    },
    /// A configured hostname. Skipped when `hostname` is `None` or blank.
    Hostname {
        /// Where the value came from, for logs (e.g. `DEVELOPMENT_HOSTNAME`).
        label: String,
        /// The configured value, if any.
        hostname: Option<String>,
    },
}

impl ResolutionStrategy {
    /// Convenience constructor for [`ResolutionStrategy::Hostname`].
    #[must_use]
    pub fn hostname(label: impl Into<String>, hostname: Option<String>) -> Self {
        Self::Hostname {
            label: label.into(),
            hostname,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::LocalInterface { prefix_len } => format!("local interface /{prefix_len}"),
            Self::Hostname { label, .. } => label.clone(),
        }
    }
}

/// Determines this node's own reachable address, once.
#[derive(Debug)]
pub struct AddressResolver {
    strategies: Vec<ResolutionStrategy>,
    interfaces: Arc<dyn InterfaceSource>,
    resolved: OnceLock<String>,
}

impl AddressResolver {
    /// Creates a resolver over an explicit strategy chain.
    #[must_use]
    pub fn new(strategies: Vec<ResolutionStrategy>, interfaces: Arc<dyn InterfaceSource>) -> Self {
        Self {
            strategies,
            interfaces,
            resolved: OnceLock::new(),
        }
    }

    /// Returns this node's address, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Configuration`] if no strategy yields an
    /// address. The node must not start serving in that case.
    pub fn resolve(&self) -> Result<String, RouterError> {
        if let Some(address) = self.resolved.get() {
            return Ok(address.clone());
        }
        let address = self.run_chain()?;
        Ok(self.resolved.get_or_init(|| address).clone())
    }

    fn run_chain(&self) -> Result<String, RouterError> {
        for (position, strategy) in self.strategies.iter().enumerate() {
            let found = match strategy {
                ResolutionStrategy::LocalInterface { prefix_len } => {
                    self.scan_interfaces(*prefix_len)
                }
                ResolutionStrategy::Hostname { hostname, .. } => hostname
                    .as_deref()
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string),
            };
            match found {
                Some(address) if position == 0 => {
                    tracing::info!(%address, via = %strategy.describe(), "resolved self address");
                    return Ok(address);
                }
                Some(address) => {
                    tracing::warn!(
                        %address,
                        via = %strategy.describe(),
                        "using fallback self address"
                    );
                    return Ok(address);
                }
                None => {
                    tracing::debug!(
                        via = %strategy.describe(),
                        "self address strategy yielded nothing"
                    );
                }
            }
        }
        let tried: Vec<String> = self.strategies.iter().map(ResolutionStrategy::describe).collect();
        Err(RouterError::Configuration(format!(
            "cannot determine self address (tried: {})",
            if tried.is_empty() {
                "nothing".to_string()
            } else {
                tried.join(", ")
            }
        )))
    }

    fn scan_interfaces(&self, prefix_len: u8) -> Option<String> {
        let interfaces = match self.interfaces.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::warn!(error = %e, "failed to enumerate network interfaces");
                return None;
            }
        };
        interfaces
            .into_iter()
            .find(|iface| {
                !iface.loopback
                    && !iface.ip.is_loopback()
                    && iface.ip.is_ipv4()
                    && iface.prefix_len == prefix_len
            })
            .map(|iface| iface.ip.to_string())
    }
}
