//! Source-address admission via exact and CIDR whitelist entries.
//!
//! An empty whitelist allows every address (deployments may run without
//! network restriction). A non-empty whitelist admits an address only when it
//! matches an entry exactly or falls inside a configured block. Containment
//! uses real bit-prefix matching on parsed addresses for both IPv4 and IPv6;
//! string-prefix comparison is not correct for variable-length prefixes.

use crate::error::{AdmissionError, AdmissionResult};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::warn;

/// An address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrBlock {
    /// Parse `addr/prefix` notation, e.g. `10.0.0.0/8` or `fd00::/16`.
    pub fn parse(entry: &str) -> AdmissionResult<Self> {
        let (addr, prefix) =
            entry
                .split_once('/')
                .ok_or_else(|| AdmissionError::InvalidWhitelistEntry {
                    entry: entry.to_string(),
                    reason: "missing prefix length".to_string(),
                })?;

        let network: IpAddr =
            addr.parse()
                .map_err(|e| AdmissionError::InvalidWhitelistEntry {
                    entry: entry.to_string(),
                    reason: format!("bad network address: {e}"),
                })?;

        let prefix_len: u8 = prefix
            .parse()
            .map_err(|e| AdmissionError::InvalidWhitelistEntry {
                entry: entry.to_string(),
                reason: format!("bad prefix length: {e}"),
            })?;

        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max_prefix {
            return Err(AdmissionError::InvalidPrefixLength {
                entry: entry.to_string(),
                prefix_len,
            });
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Whether `ip` falls inside this block. Address families never mix.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                Self::v4_prefix(net, self.prefix_len) == Self::v4_prefix(ip, self.prefix_len)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                Self::v6_prefix(net, self.prefix_len) == Self::v6_prefix(ip, self.prefix_len)
            }
            _ => false,
        }
    }

    fn v4_prefix(addr: Ipv4Addr, prefix_len: u8) -> u32 {
        let bits = u32::from(addr);
        if prefix_len == 0 {
            0
        } else {
            bits & (u32::MAX << (32 - u32::from(prefix_len)))
        }
    }

    fn v6_prefix(addr: Ipv6Addr, prefix_len: u8) -> u128 {
        let bits = u128::from(addr);
        if prefix_len == 0 {
            0
        } else {
            bits & (u128::MAX << (128 - u32::from(prefix_len)))
        }
    }
}

/// Network-range based request admission.
pub struct IpWhitelist {
    exact: Vec<IpAddr>,
    blocks: Vec<CidrBlock>,
}

impl IpWhitelist {
    /// Build from configuration entries; entries containing `/` are CIDR
    /// blocks, anything else must parse as a single address. An empty slice
    /// yields an allow-all whitelist.
    pub fn new(entries: &[String]) -> AdmissionResult<Self> {
        let mut exact = Vec::new();
        let mut blocks = Vec::new();

        for entry in entries {
            if entry.contains('/') {
                blocks.push(CidrBlock::parse(entry)?);
            } else {
                let addr: IpAddr =
                    entry
                        .parse()
                        .map_err(|e| AdmissionError::InvalidWhitelistEntry {
                            entry: entry.clone(),
                            reason: format!("bad address: {e}"),
                        })?;
                exact.push(addr);
            }
        }

        Ok(Self { exact, blocks })
    }

    /// Allow-all whitelist.
    pub fn allow_all() -> Self {
        Self {
            exact: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.blocks.is_empty()
    }

    /// Check a client address. Unparseable addresses are rejected whenever a
    /// whitelist is configured.
    pub fn is_allowed(&self, client_addr: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        let ip: IpAddr = match client_addr.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(client_addr, "Rejecting unparseable client address");
                return false;
            }
        };

        if self.exact.contains(&ip) {
            return true;
        }
        if self.blocks.iter().any(|block| block.contains(ip)) {
            return true;
        }

        warn!(client_addr, "Client address not in whitelist");
        false
    }
}
