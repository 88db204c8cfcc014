//! Shared fixtures for the end-to-end tests.

use std::path::{Path, PathBuf};

use netlab_sim::{EventBus, EventRecorder, SimulationConfig, Simulator};
use netlab_topology::{Device, DeviceKind, Edge, Endpoint, Interface, Ipv4Cidr, LinkMedia};

pub fn cidr(s: &str) -> Ipv4Cidr {
    s.parse().unwrap_or_else(|_| panic!("bad fixture address {s}"))
}

/// A PC with one copper port `eth0` on `edge`.
pub fn host(id: &str, ip: &str, edge: &str) -> Device {
    Device::new(id, DeviceKind::Pc, &id.to_uppercase())
        .with_interface(Interface::new("eth0", LinkMedia::Copper).with_ip(cidr(ip)).with_edge(edge))
}

/// An L2 switch with one port `p{n}` per edge, in order.
pub fn switch(id: &str, label: &str, edges: &[&str]) -> Device {
    edges.iter().enumerate().fold(Device::new(id, DeviceKind::SwitchL2, label), |dev, (n, edge)| {
        dev.with_interface(Interface::new(format!("p{n}"), LinkMedia::Copper).with_edge(*edge))
    })
}

pub fn link(id: &str, a: (&str, &str), b: (&str, &str)) -> Edge {
    Edge::new(id, Endpoint::new(a.0, a.1), Endpoint::new(b.0, b.1))
}

/// Host A -- Switch -- Host B. The switch-to-B edge is valid only when
/// `valid` is set.
pub fn two_hosts_one_switch(valid: bool) -> (Vec<Device>, Vec<Edge>) {
    let devices = vec![
        host("a", "10.0.0.1/24", "e1"),
        switch("sw", "SW1", &["e1", "e2"]),
        host("b", "10.0.0.2/24", "e2"),
    ];
    let mut e2 = link("e2", ("sw", "p1"), ("b", "eth0"));
    e2.valid = valid;
    (devices, vec![link("e1", ("a", "eth0"), ("sw", "p0")), e2])
}

/// Host A -- R1 -- Host B with the router's ports unaddressed.
pub fn unconfigured_router() -> (Vec<Device>, Vec<Edge>) {
    let router = Device::new("r1", DeviceKind::Router, "R1")
        .with_interface(Interface::new("g0", LinkMedia::Copper).with_edge("e1"))
        .with_interface(Interface::new("g1", LinkMedia::Copper).with_edge("e2"));
    let devices = vec![host("a", "10.0.0.1/24", "e1"), router, host("b", "10.0.1.2/24", "e2")];
    let edges = vec![
        link("e1", ("a", "eth0"), ("r1", "g0")),
        link("e2", ("r1", "g1"), ("b", "eth0")),
    ];
    (devices, edges)
}

/// A simulator on a fresh bus with a recorder attached.
pub fn simulator(config: SimulationConfig) -> (Simulator, EventRecorder) {
    netlab_logging::init_for_tests();
    let bus = EventBus::new();
    let recorder = EventRecorder::attach(&bus);
    (Simulator::new(bus, config), recorder)
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}
