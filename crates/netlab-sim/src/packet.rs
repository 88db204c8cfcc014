//! The synthetic packet that travels the topology.

use std::fmt;
use std::net::Ipv4Addr;

use netlab_topology::MacAddr;
use serde::{Deserialize, Serialize};

/// EtherType for IPv4 payloads.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// A unique packet identifier, allocated per simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkt-{}", self.0)
    }
}

/// Layer-3 protocol carried by the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpProtocol {
    Icmp,
    Tcp,
    Udp,
}

impl IpProtocol {
    /// IANA protocol number.
    pub fn number(&self) -> u8 {
        match self {
            IpProtocol::Icmp => 1,
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
        }
    }
}

/// Ethernet frame fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2Header {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub ether_type: u16,
}

/// IPv4 header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3Header {
    pub src_ip: Option<Ipv4Addr>,
    pub dst_ip: Option<Ipv4Addr>,
    pub ttl: u8,
    pub protocol: IpProtocol,
}

/// A packet in flight.
///
/// Created when a ping starts, rewritten on every hop, and gone once it
/// arrives or is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub id: PacketId,
    pub l2: L2Header,
    pub l3: L3Header,
    /// Hops traversed so far
    pub hops: u32,
}

impl Packet {
    /// An ICMP echo request. The frame starts out addressed to broadcast
    /// until the first hop names its peer.
    pub fn echo_request(
        id: PacketId,
        src_mac: MacAddr,
        src_ip: Option<Ipv4Addr>,
        dst_ip: Option<Ipv4Addr>,
        ttl: u8,
    ) -> Self {
        Self {
            id,
            l2: L2Header {
                src_mac,
                dst_mac: MacAddr::BROADCAST,
                ether_type: ETHERTYPE_IPV4,
            },
            l3: L3Header {
                src_ip,
                dst_ip,
                ttl,
                protocol: IpProtocol::Icmp,
            },
            hops: 0,
        }
    }

    /// Re-address the frame for the link being traversed and age the packet
    /// by one hop. Returns the remaining TTL.
    pub fn traverse(&mut self, src_mac: MacAddr, dst_mac: MacAddr) -> u8 {
        self.l2.src_mac = src_mac;
        self.l2.dst_mac = dst_mac;
        self.l3.ttl = self.l3.ttl.saturating_sub(1);
        self.hops += 1;
        self.l3.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.l3.ttl == 0
    }
}
