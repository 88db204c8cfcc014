//! Ping scenarios through the public simulator API.

use std::time::Duration;

use netlab_integration_tests::{fixture, simulator, two_hosts_one_switch};
use netlab_sim::{
    load_topology, EventKind, PathResolver, SimEvent, SimulationConfig, SimulationSpeed,
};
use netlab_topology::DeviceId;

fn ids(path: &[DeviceId]) -> Vec<&str> {
    path.iter().map(DeviceId::as_str).collect()
}

#[test]
fn ping_across_a_switch() {
    let (sim, recorder) = simulator(SimulationConfig::headless());
    let (devices, edges) = two_hosts_one_switch(true);
    sim.initialize(devices, edges);

    let summary = tokio_test::block_on(sim.execute_ping("a", "b"));

    assert!(summary.success, "{:?}", summary.errors);
    assert_eq!(ids(&summary.path), ["a", "sw", "b"]);
    assert_eq!(summary.total_packets, 1);

    let packet_events: Vec<_> = recorder
        .kinds()
        .into_iter()
        .filter(|k| matches!(k, EventKind::PacketMove | EventKind::PacketArrive))
        .collect();
    assert_eq!(
        packet_events,
        [EventKind::PacketMove, EventKind::PacketMove, EventKind::PacketArrive]
    );
}

#[test]
fn invalid_link_means_no_route() {
    let (sim, recorder) = simulator(SimulationConfig::headless());
    let (devices, edges) = two_hosts_one_switch(false);
    sim.initialize(devices, edges);

    let summary = tokio_test::block_on(sim.execute_ping("a", "b"));

    assert!(!summary.success);
    assert!(summary.errors.iter().any(|e| e.contains("no route")), "{:?}", summary.errors);
    assert_eq!(recorder.count(EventKind::PacketMove), 0);
    assert_eq!(recorder.count(EventKind::SimComplete), 1);
}

#[test]
fn self_ping_fails_for_every_device() {
    let topology = load_topology(&fixture("campus.json")).unwrap();
    let (sim, recorder) = simulator(SimulationConfig::headless());
    let ids: Vec<_> = topology.devices().iter().map(|d| d.id.clone()).collect();
    sim.initialize_topology(topology);

    for id in &ids {
        let summary = tokio_test::block_on(sim.execute_ping(id.as_str(), id.as_str()));
        assert!(!summary.success);
        assert!(summary.errors[0].contains("same device"), "{:?}", summary.errors);
    }
    assert_eq!(recorder.count(EventKind::PacketMove), 0);
    assert_eq!(recorder.count(EventKind::SimStart), 0);
}

#[test]
fn campus_paths_are_minimal_and_stable() {
    let topology = load_topology(&fixture("campus.json")).unwrap();
    let resolver = PathResolver::new(&topology);

    let path = resolver.resolve("pc-1", "srv-1").unwrap();
    assert_eq!(ids(&path.devices), ["pc-1", "acc-1", "core-1", "srv-acc", "srv-1"]);
    assert_eq!(resolver.resolve("pc-1", "srv-1").unwrap(), path);
    for hop in &path.hops {
        let edge = topology.edge(hop.edge.as_str()).unwrap();
        assert!(topology.is_traversable(edge));
    }

    let local = resolver.resolve("pc-2", "pc-1").unwrap();
    assert_eq!(ids(&local.devices), ["pc-2", "acc-1", "pc-1"]);
}

#[test]
fn failed_uplink_reroutes_through_second_core() {
    let topology = load_topology(&fixture("campus.json")).unwrap();
    let (sim, _recorder) = simulator(SimulationConfig::headless());
    sim.initialize_topology(topology);

    sim.set_edge_valid("l3", false).unwrap();
    let summary = tokio_test::block_on(sim.execute_ping("pc-1", "srv-1"));

    assert!(summary.success, "{:?}", summary.errors);
    assert_eq!(ids(&summary.path), ["pc-1", "acc-1", "core-2", "srv-acc", "srv-1"]);
    assert!(sim
        .console_log()
        .iter()
        .any(|e| e.message.contains("CORE-2: route lookup for 10.20.0.50")));
}

#[test]
fn short_ttl_drops_exactly_once() {
    let (sim, recorder) = simulator(SimulationConfig::headless().with_ttl(1));
    let (devices, edges) = two_hosts_one_switch(true);
    sim.initialize(devices, edges);

    let summary = tokio_test::block_on(sim.execute_ping("a", "b"));
    assert!(!summary.success);

    let events = recorder.events();
    let packet = events
        .iter()
        .find(|e| e.kind() == EventKind::PacketDrop)
        .and_then(SimEvent::packet_id)
        .unwrap();
    let about_packet = |kind| {
        events
            .iter()
            .filter(|e| e.kind() == kind && e.packet_id() == Some(packet))
            .count()
    };
    assert_eq!(about_packet(EventKind::PacketDrop), 1);
    assert_eq!(about_packet(EventKind::PacketArrive), 0);
}

#[tokio::test(start_paused = true)]
async fn reset_silences_the_cancelled_packet() {
    let (sim, recorder) = simulator(SimulationConfig::default().with_speed(SimulationSpeed::Slow));
    let (devices, edges) = two_hosts_one_switch(true);
    sim.initialize(devices, edges);

    let handle = {
        let sim = sim.clone();
        tokio::spawn(async move { sim.execute_ping("a", "b").await })
    };
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let packet = recorder
        .events()
        .iter()
        .find_map(|e| match e {
            SimEvent::PacketMove { packet, .. } => Some(*packet),
            _ => None,
        })
        .unwrap();
    sim.reset();
    let cut = recorder.events().len();

    let summary = handle.await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(!summary.success);
    let late: Vec<_> = recorder.events()[cut..]
        .iter()
        .filter(|e| e.packet_id() == Some(packet))
        .cloned()
        .collect();
    assert!(late.is_empty(), "events after reset: {late:?}");
    assert!(!sim.state().is_running);
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_hop_durations() {
    let (sim, recorder) = simulator(SimulationConfig::default());
    let (devices, edges) = two_hosts_one_switch(true);
    sim.initialize(devices, edges);

    let summary = sim.execute_ping("a", "b").await;

    assert!(summary.success);
    assert_eq!(summary.total_latency_ms, 2000);
    assert_eq!(summary.total_ticks, 20);
    assert_eq!(recorder.count(EventKind::SimTick), 20);
}
