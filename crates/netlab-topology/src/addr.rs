//! Link-layer and network-layer addressing.
//!
//! [`MacAddr`] is a plain 48-bit hardware address. [`Ipv4Cidr`] keeps the
//! host address together with its prefix length, so a single value describes
//! both "this interface is 10.0.1.5" and "it lives on 10.0.1.0/24".

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 48-bit MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// The broadcast address `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Derive a stable address for an interface that was never assigned one.
    ///
    /// The result is a locally administered unicast address, so it can never
    /// collide with a vendor OUI.
    pub fn derive(device: &str, interface: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(device.as_bytes());
        hasher.update(b"/");
        hasher.update(interface.as_bytes());
        let hash = hasher.finalize();

        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&hash.as_bytes()[..6]);
        bytes[0] = (bytes[0] | 0x02) & 0xfe;
        MacAddr(bytes)
    }

    /// True for the all-ones broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(Error::InvalidMac(s.to_string()));
        }
        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(Error::InvalidMac(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| Error::InvalidMac(s.to_string()))?;
        }
        Ok(MacAddr(bytes))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

/// An IPv4 address with a prefix length (`10.0.1.5/24`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// The default route, `0.0.0.0/0`.
    pub const DEFAULT_ROUTE: Ipv4Cidr = Ipv4Cidr {
        addr: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    /// Create from an address and prefix length.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::InvalidAddress(format!("{addr}/{prefix}")));
        }
        Ok(Self { addr, prefix })
    }

    /// Create from an address and a dotted-quad netmask such as `255.255.255.0`.
    ///
    /// Non-contiguous masks are rejected.
    pub fn from_mask(addr: Ipv4Addr, mask: Ipv4Addr) -> Result<Self> {
        let bits = u32::from(mask);
        let prefix = bits.leading_ones();
        if bits.checked_shl(prefix).unwrap_or(0) != 0 {
            return Err(Error::InvalidAddress(format!("{addr} {mask}")));
        }
        Self::new(addr, prefix as u8)
    }

    /// The host address.
    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    /// The prefix length.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The netmask as a dotted quad.
    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.mask_bits())
    }

    /// The network this address belongs to, with host bits cleared.
    pub fn network(&self) -> Ipv4Cidr {
        Ipv4Cidr {
            addr: Ipv4Addr::from(u32::from(self.addr) & self.mask_bits()),
            prefix: self.prefix,
        }
    }

    /// Whether `ip` falls inside this prefix.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = self.mask_bits();
        u32::from(ip) & mask == u32::from(self.addr) & mask
    }

    fn mask_bits(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidAddress(s.to_string());
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: Ipv4Addr = addr.trim().parse().map_err(|_| invalid())?;
                let prefix: u8 = prefix.trim().parse().map_err(|_| invalid())?;
                Self::new(addr, prefix)
            }
            None => {
                let addr: Ipv4Addr = s.trim().parse().map_err(|_| invalid())?;
                Self::new(addr, 32)
            }
        }
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}
