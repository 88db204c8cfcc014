//! The simulation orchestrator.
//!
//! A [`Simulator`] owns at most one active run. It resolves a path over its
//! own snapshot, steps a packet across every hop while publishing events on
//! the bus, and finishes with a [`SimulationSummary`].
//!
//! Each hop suspends on the [`HopScheduler`]. `reset()` and `initialize()`
//! cancel the pending hop and clear the active run id; every event of a run
//! is published only while that run is still the active one, so a cancelled
//! run goes silent immediately.
//!
//! Run events and cancellation are serialized by one reentrant lock. A
//! `reset()` from another thread waits for the dispatch in progress; a
//! handler may still reset the simulator from inside a dispatch.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use netlab_topology::{Device, DeviceId, Edge, MacAddr, Topology};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::events::{ConsoleEntry, ConsoleLevel, SimEvent};
use crate::forwarding::{local_mac, peer_mac, ForwardingState, MacTable};
use crate::packet::{Packet, PacketId};
use crate::resolver::{Hop, PathResolver, ResolvedPath};
use crate::run::{RunId, RunStatus, SimulationRun, SimulationState, SimulationSummary};
use crate::scheduler::HopScheduler;
use crate::speed::SimulationSpeed;

/// Mutable simulator state, guarded by one lock that is never held across
/// an await or an event dispatch.
#[derive(Debug, Default)]
struct Core {
    topology: Arc<Topology>,
    forwarding: ForwardingState,
    speed: SimulationSpeed,
    current: Option<SimulationRun>,
    active: Option<RunId>,
    console: Vec<ConsoleEntry>,
    next_run: u64,
    next_packet: u64,
}

#[derive(Debug)]
struct Shared {
    bus: EventBus,
    config: SimulationConfig,
    scheduler: HopScheduler,
    core: Mutex<Core>,
    /// Held across every run event dispatch and every cancellation. Taken
    /// before `core`, never while holding it.
    emission: ReentrantMutex<()>,
}

/// Everything a started run needs, fixed at launch.
struct RunPlan {
    run: RunId,
    topology: Arc<Topology>,
    path: ResolvedPath,
    source: DeviceId,
    target: DeviceId,
    source_label: String,
    target_label: String,
    source_ip: Option<Ipv4Addr>,
    target_ip: Option<Ipv4Addr>,
}

/// Drives ping runs over a topology snapshot.
///
/// Cloning yields another handle to the same simulator, which is how a
/// caller keeps control (`reset`, `state`) while a run is in flight.
#[derive(Debug, Clone)]
pub struct Simulator {
    shared: Arc<Shared>,
}

impl Simulator {
    pub fn new(bus: EventBus, config: SimulationConfig) -> Self {
        let core = Core {
            speed: config.default_speed,
            ..Default::default()
        };
        Self {
            shared: Arc::new(Shared {
                bus,
                config,
                scheduler: HopScheduler::new(),
                core: Mutex::new(core),
                emission: ReentrantMutex::new(()),
            }),
        }
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        self.shared.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emitting(&self) -> ReentrantMutexGuard<'_, ()> {
        self.shared.emission.lock()
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }

    /// The simulator's current snapshot.
    pub fn topology(&self) -> Arc<Topology> {
        Arc::clone(&self.core().topology)
    }

    /// Replace the snapshot with one built from `devices` and `edges`.
    pub fn initialize(&self, devices: Vec<Device>, edges: Vec<Edge>) {
        self.initialize_topology(Topology::new(devices, edges));
    }

    /// Replace the snapshot.
    ///
    /// Cancels any active run, forgets learned MAC addresses and reports
    /// every consistency issue of the new snapshot as a `console:warn`.
    pub fn initialize_topology(&self, topology: Topology) {
        let issues = topology.validate();
        let _emitting = self.emitting();
        let (cancelled, devices, edges) = {
            let mut core = self.core();
            let cancelled = core.active.take();
            core.current = None;
            core.console.clear();
            core.forwarding.clear();
            let counts = (topology.device_count(), topology.edges().len());
            core.topology = Arc::new(topology);
            (cancelled, counts.0, counts.1)
        };
        self.shared.scheduler.cancel_all();
        info!(devices, edges, issues = issues.len(), cancelled = ?cancelled, "simulator initialized");

        for issue in issues {
            self.publish(SimEvent::ConsoleWarn {
                message: issue.to_string(),
            });
        }
    }

    pub fn set_speed(&self, speed: SimulationSpeed) {
        self.core().speed = speed;
        debug!(%speed, "speed changed");
    }

    pub fn speed(&self) -> SimulationSpeed {
        self.core().speed
    }

    /// Cancel the active run, discard buffered console lines and emit
    /// `sim:reset`.
    pub fn reset(&self) {
        let _emitting = self.emitting();
        let cancelled = {
            let mut core = self.core();
            core.current = None;
            core.console.clear();
            core.forwarding.clear();
            core.active.take()
        };
        self.shared.scheduler.cancel_all();
        info!(cancelled = ?cancelled, "simulator reset");
        self.shared.bus.emit(SimEvent::SimReset);
    }

    /// Snapshot for external consumers. Safe to call mid-run.
    pub fn state(&self) -> SimulationState {
        let core = self.core();
        SimulationState {
            is_running: core.active.is_some(),
            speed: core.speed,
            current_run: core.current.clone(),
        }
    }

    /// Console lines published since the last reset or initialize.
    pub fn console_log(&self) -> Vec<ConsoleEntry> {
        self.core().console.clone()
    }

    /// The MAC table a switch has learned so far.
    pub fn mac_table(&self, device: &str) -> Option<MacTable> {
        self.core().forwarding.mac_table(device).cloned()
    }

    /// Flip the validity flag of an edge in the simulator's own snapshot.
    ///
    /// A run whose next hop crosses an edge that is no longer traversable
    /// drops its packet there.
    pub fn set_edge_valid(&self, edge: &str, valid: bool) -> Result<()> {
        let mut core = self.core();
        Arc::make_mut(&mut core.topology).set_edge_valid(edge, valid)?;
        info!(edge, valid, "edge validity changed");
        Ok(())
    }

    /// Ping `target` from `source`.
    ///
    /// Never fails: configuration errors, routing failures, drops,
    /// cancellation and a concurrent run all come back as an unsuccessful
    /// summary. A ping issued while another run is active is rejected
    /// without emitting anything.
    pub async fn execute_ping(&self, source: &str, target: &str) -> SimulationSummary {
        let plan = match self.launch(source, target) {
            Ok(plan) => plan,
            Err(summary) => return summary,
        };

        let _active = ActiveRun {
            sim: self,
            run: plan.run,
        };
        match self.drive(&plan).await {
            Ok(summary) => summary,
            Err(err) => {
                info!(run = %plan.run, %err, "run cancelled");
                let mut summary = SimulationSummary::failure(err.to_string());
                summary.path = plan.path.devices.clone();
                summary
            }
        }
    }

    /// Validate the request and resolve the path. On success the run is
    /// active when this returns.
    fn launch(&self, source: &str, target: &str) -> std::result::Result<RunPlan, SimulationSummary> {
        let mut core = self.core();
        if core.active.is_some() {
            warn!(%source, %target, "ping rejected, a run is already active");
            return Err(SimulationSummary::failure(Error::AlreadyRunning.to_string()));
        }

        core.next_run += 1;
        let run = RunId(core.next_run);
        let topology = Arc::clone(&core.topology);

        if let Err(err) = check_endpoints(&topology, source, target) {
            drop(core);
            warn!(%run, %source, %target, %err, "ping not started");
            let summary = SimulationSummary::failure(err.to_string());
            self.publish(SimEvent::ConsoleError {
                message: err.to_string(),
            });
            self.shared.bus.emit(SimEvent::SimComplete {
                run,
                summary: summary.clone(),
            });
            return Err(summary);
        }

        let mut record = SimulationRun::new(run, source.into(), target.into());
        let path = match PathResolver::new(&topology).resolve(source, target) {
            Ok(path) => path,
            Err(failure) => {
                let message = Error::from(failure).to_string();
                record.status = RunStatus::Failed;
                record.errors.push(message.clone());
                let summary = record.summary();
                core.current = Some(record);
                drop(core);

                info!(%run, %source, %target, reason = %message, "no route");
                self.publish(SimEvent::ConsoleError {
                    message: message.clone(),
                });
                self.shared.bus.emit(SimEvent::Announce {
                    message: format!(
                        "Ping from {} to {} failed: {}",
                        label(&topology, source),
                        label(&topology, target),
                        message
                    ),
                });
                self.shared.bus.emit(SimEvent::SimComplete {
                    run,
                    summary: summary.clone(),
                });
                return Err(summary);
            }
        };

        record.path = path.devices.clone();
        core.current = Some(record);
        core.active = Some(run);
        drop(core);

        let (source_dev, target_dev) = (topology.device(source), topology.device(target));
        Ok(RunPlan {
            run,
            source: source.into(),
            target: target.into(),
            source_label: label(&topology, source),
            target_label: label(&topology, target),
            source_ip: source_dev.and_then(Device::primary_ip),
            target_ip: target_dev.and_then(Device::primary_ip),
            topology,
            path,
        })
    }

    async fn drive(&self, plan: &RunPlan) -> Result<SimulationSummary> {
        let run = plan.run;
        let hop_count = plan.path.hop_count();
        info!(%run, source = %plan.source, target = %plan.target, hops = hop_count, "ping started");

        self.emit(run, SimEvent::SimStart {
            run,
            source: plan.source.clone(),
            target: plan.target.clone(),
            path: plan.path.devices.clone(),
        })?;
        self.emit(run, SimEvent::Announce {
            message: format!(
                "Ping started from {} to {}, {} hops",
                plan.source_label, plan.target_label, hop_count
            ),
        })?;
        self.emit(run, SimEvent::ConsoleLog {
            message: format!(
                "PING {} ({}) -> {} ({}): path {}",
                plan.source_label,
                display_ip(plan.source_ip),
                plan.target_label,
                display_ip(plan.target_ip),
                describe_path(&plan.topology, &plan.path)
            ),
        })?;

        let tick = Duration::from_millis(self.shared.config.tick_ms);
        for _ in 0..self.shared.config.ping_count.max(1) {
            let mut packet = self.new_packet(plan)?;
            self.emit(run, SimEvent::PacketInspect {
                run,
                device: plan.source.clone(),
                packet: packet.clone(),
            })?;

            let mut elapsed_ms = 0;
            for (index, hop) in plan.path.hops.iter().enumerate() {
                let last = index + 1 == hop_count;
                let (lines, link_up) = self.step(plan, hop, &mut packet)?;
                for message in lines {
                    self.emit(run, SimEvent::ConsoleLog { message })?;
                }
                self.emit(run, SimEvent::PacketInspect {
                    run,
                    device: hop.to.clone(),
                    packet: packet.clone(),
                })?;

                if !link_up {
                    let explanation = format!(
                        "link {} between {} and {} is no longer traversable",
                        hop.edge,
                        label(&plan.topology, hop.from.as_str()),
                        label(&plan.topology, hop.to.as_str())
                    );
                    return self.drop_packet(plan, &packet, &hop.from, Some(hop), "link down", explanation);
                }

                let duration = self.record_hop(run)?;
                let duration_ms = duration.as_millis() as u64;
                elapsed_ms += duration_ms;
                debug!(%run, packet_id = %packet.id, hop = index, from = %hop.from, to = %hop.to, duration_ms, "hop");
                self.emit(run, SimEvent::PacketMove {
                    run,
                    packet: packet.id,
                    edge: hop.edge.clone(),
                    from: hop.from.clone(),
                    to: hop.to.clone(),
                    hop: index,
                    duration_ms,
                })?;

                self.shared
                    .scheduler
                    .wait(packet.id, duration, tick, || {
                        let _ = self.tick(run);
                    })
                    .await?;

                // the packet has reached hop.to and dies there
                if packet.is_expired() && !last {
                    let explanation = format!(
                        "TTL reached 0 at {} after {} hops, {} hops short of {}",
                        label(&plan.topology, hop.to.as_str()),
                        packet.hops,
                        hop_count - index - 1,
                        plan.target_label
                    );
                    return self.drop_packet(plan, &packet, &hop.to, None, "TTL expired", explanation);
                }
            }

            self.emit(run, SimEvent::PacketArrive {
                run,
                packet: packet.id,
                device: plan.target.clone(),
                hops: packet.hops,
            })?;
            self.emit(run, SimEvent::ConsoleLog {
                message: format!(
                    "Reply from {}: hops={} time={}ms ttl={}",
                    plan.target_ip
                        .map_or_else(|| plan.target_label.clone(), |ip| ip.to_string()),
                    packet.hops,
                    elapsed_ms,
                    packet.l3.ttl
                ),
            })?;
        }

        self.finish(plan, None)
    }

    /// Narrate the hop, rewrite the packet for the link and check that the
    /// link is still usable in the current snapshot.
    fn step(&self, plan: &RunPlan, hop: &Hop, packet: &mut Packet) -> Result<(Vec<String>, bool)> {
        let mut guard = self.active_core(plan.run)?;
        let core = &mut *guard;

        let mut lines = core.forwarding.egress_narration(&plan.topology, hop, packet);
        packet.traverse(local_mac(&plan.topology, hop), peer_mac(&plan.topology, hop));
        if let Some(learned) = core.forwarding.ingress_learning(&plan.topology, hop, packet) {
            lines.push(learned);
        }

        let link_up = core
            .topology
            .edge(hop.edge.as_str())
            .is_some_and(|edge| core.topology.is_traversable(edge));
        Ok((lines, link_up))
    }

    fn new_packet(&self, plan: &RunPlan) -> Result<Packet> {
        let mut core = self.active_core(plan.run)?;
        core.next_packet += 1;
        let id = PacketId(core.next_packet);
        if let Some(record) = core.current.as_mut() {
            record.packets.push(id);
        }

        let src_mac = plan.path.hops.first().map_or_else(
            || MacAddr::derive(plan.source.as_str(), ""),
            |hop| local_mac(&plan.topology, hop),
        );
        Ok(Packet::echo_request(
            id,
            src_mac,
            plan.source_ip,
            plan.target_ip,
            self.shared.config.initial_ttl,
        ))
    }

    /// Record the next hop's duration at the current speed.
    fn record_hop(&self, run: RunId) -> Result<Duration> {
        let mut core = self.active_core(run)?;
        let duration = core.speed.hop_duration(self.shared.config.base_hop_ms);
        if let Some(record) = core.current.as_mut() {
            record.hop_durations_ms.push(duration.as_millis() as u64);
        }
        Ok(duration)
    }

    fn tick(&self, run: RunId) -> Result<()> {
        let _emitting = self.emitting();
        let tick = {
            let mut core = self.active_core(run)?;
            let record = core.current.as_mut().ok_or(Error::Cancelled)?;
            record.ticks += 1;
            record.ticks
        };
        self.shared.bus.emit(SimEvent::SimTick { run, tick });
        Ok(())
    }

    fn drop_packet(
        &self,
        plan: &RunPlan,
        packet: &Packet,
        device: &DeviceId,
        hop: Option<&Hop>,
        reason: &str,
        explanation: String,
    ) -> Result<SimulationSummary> {
        let run = plan.run;
        let error = Error::Dropped {
            device: device.clone(),
            reason: reason.to_string(),
        };
        info!(%run, packet_id = %packet.id, %device, reason, "packet dropped");

        self.emit(run, SimEvent::PacketDrop {
            run,
            packet: packet.id,
            device: device.clone(),
            edge: hop.map(|h| h.edge.clone()),
            reason: reason.to_string(),
            explanation: explanation.clone(),
        })?;
        self.emit(run, SimEvent::ConsoleError {
            message: format!("{error}: {explanation}"),
        })?;
        self.finish(plan, Some(error.to_string()))
    }

    /// Move the run to its terminal state, then announce and complete.
    fn finish(&self, plan: &RunPlan, error: Option<String>) -> Result<SimulationSummary> {
        let run = plan.run;
        let _emitting = self.emitting();
        let summary = {
            let mut core = self.active_core(run)?;
            let record = core.current.as_mut().ok_or(Error::Cancelled)?;
            match &error {
                Some(message) => {
                    record.status = RunStatus::Failed;
                    record.errors.push(message.clone());
                }
                None => record.status = RunStatus::Completed,
            }
            let summary = record.summary();
            core.active = None;
            summary
        };

        let message = match &error {
            None => format!(
                "Ping from {} to {} succeeded, {} hops in {} ms",
                plan.source_label,
                plan.target_label,
                plan.path.hop_count(),
                summary.total_latency_ms
            ),
            Some(err) => format!(
                "Ping from {} to {} failed: {}",
                plan.source_label, plan.target_label, err
            ),
        };
        info!(%run, success = summary.success, latency_ms = summary.total_latency_ms, "ping finished");

        self.shared.bus.emit(SimEvent::Announce { message });
        self.shared.bus.emit(SimEvent::SimComplete {
            run,
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Lock the core, failing if `run` is no longer the active run.
    fn active_core(&self, run: RunId) -> Result<MutexGuard<'_, Core>> {
        let core = self.core();
        if core.active == Some(run) {
            Ok(core)
        } else {
            Err(Error::Cancelled)
        }
    }

    /// Publish an event of `run`, if it is still active.
    fn emit(&self, run: RunId, event: SimEvent) -> Result<()> {
        let _emitting = self.emitting();
        {
            let mut core = self.active_core(run)?;
            if let Some(entry) = console_entry(&event) {
                core.console.push(entry);
            }
        }
        self.shared.bus.emit(event);
        Ok(())
    }

    /// Publish an event outside any run.
    fn publish(&self, event: SimEvent) {
        if let Some(entry) = console_entry(&event) {
            self.core().console.push(entry);
        }
        self.shared.bus.emit(event);
    }
}

/// Releases the run if `execute_ping` is dropped before the run ends.
struct ActiveRun<'a> {
    sim: &'a Simulator,
    run: RunId,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let mut core = self.sim.core();
        if core.active != Some(self.run) {
            return;
        }
        core.active = None;
        if let Some(record) = core.current.as_mut() {
            record.status = RunStatus::Failed;
            record.errors.push(Error::Abandoned.to_string());
        }
        drop(core);
        warn!(run = %self.run, "run abandoned before completion");
    }
}

fn check_endpoints(topology: &Topology, source: &str, target: &str) -> Result<()> {
    if !topology.contains_device(source) {
        return Err(Error::UnknownSource(source.into()));
    }
    if !topology.contains_device(target) {
        return Err(Error::UnknownTarget(target.into()));
    }
    if source == target {
        return Err(Error::SameEndpoints(source.into()));
    }
    Ok(())
}

fn console_entry(event: &SimEvent) -> Option<ConsoleEntry> {
    let (level, message) = match event {
        SimEvent::ConsoleLog { message } => (ConsoleLevel::Log, message),
        SimEvent::ConsoleWarn { message } => (ConsoleLevel::Warn, message),
        SimEvent::ConsoleError { message } => (ConsoleLevel::Error, message),
        _ => return None,
    };
    Some(ConsoleEntry {
        level,
        message: message.clone(),
    })
}

fn label(topology: &Topology, id: &str) -> String {
    topology
        .device(id)
        .map_or_else(|| id.to_string(), |d| d.label.clone())
}

fn display_ip(ip: Option<Ipv4Addr>) -> String {
    ip.map_or_else(|| "no address".to_string(), |ip| ip.to_string())
}

fn describe_path(topology: &Topology, path: &ResolvedPath) -> String {
    path.devices
        .iter()
        .map(|id| label(topology, id.as_str()))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventRecorder;
    use crate::events::EventKind;
    use netlab_topology::{DeviceKind, Endpoint, Interface, Ipv4Cidr, LinkMedia};
    use tokio::time::Instant;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    fn host(id: &str, ip: &str, edge: &str) -> Device {
        Device::new(id, DeviceKind::Pc, &id.to_uppercase()).with_interface(
            Interface::new("eth0", LinkMedia::Copper)
                .with_ip(cidr(ip))
                .with_edge(edge),
        )
    }

    fn switch(id: &str, ports: &[&str]) -> Device {
        ports.iter().enumerate().fold(
            Device::new(id, DeviceKind::SwitchL2, "SW1"),
            |dev, (n, edge)| {
                dev.with_interface(Interface::new(format!("p{n}"), LinkMedia::Copper).with_edge(*edge))
            },
        )
    }

    /// A -- SW -- B, both edges valid unless `switch_to_b_valid` is false.
    fn lan(switch_to_b_valid: bool) -> (Vec<Device>, Vec<Edge>) {
        let devices = vec![
            host("a", "10.0.0.1/24", "e1"),
            switch("sw", &["e1", "e2"]),
            host("b", "10.0.0.2/24", "e2"),
        ];
        let mut e2 = Edge::new("e2", Endpoint::new("sw", "p1"), Endpoint::new("b", "eth0"));
        if !switch_to_b_valid {
            e2 = e2.invalid();
        }
        let edges = vec![
            Edge::new("e1", Endpoint::new("a", "eth0"), Endpoint::new("sw", "p0")),
            e2,
        ];
        (devices, edges)
    }

    /// A -- SW -- R1 -- SW2 -- B across two subnets.
    fn routed() -> (Vec<Device>, Vec<Edge>) {
        let router = Device::new("r1", DeviceKind::Router, "R1")
            .with_interface(
                Interface::new("g0", LinkMedia::Copper)
                    .with_ip(cidr("10.0.0.254/24"))
                    .with_edge("e2"),
            )
            .with_interface(
                Interface::new("g1", LinkMedia::Copper)
                    .with_ip(cidr("10.0.1.254/24"))
                    .with_edge("e3"),
            );
        let devices = vec![
            host("a", "10.0.0.1/24", "e1"),
            switch("sw", &["e1", "e2"]),
            router,
            Device::new("sw2", DeviceKind::SwitchL2, "SW2")
                .with_interface(Interface::new("p0", LinkMedia::Copper).with_edge("e3"))
                .with_interface(Interface::new("p1", LinkMedia::Copper).with_edge("e4")),
            host("b", "10.0.1.2/24", "e4"),
        ];
        let edges = vec![
            Edge::new("e1", Endpoint::new("a", "eth0"), Endpoint::new("sw", "p0")),
            Edge::new("e2", Endpoint::new("sw", "p1"), Endpoint::new("r1", "g0")),
            Edge::new("e3", Endpoint::new("r1", "g1"), Endpoint::new("sw2", "p0")),
            Edge::new("e4", Endpoint::new("sw2", "p1"), Endpoint::new("b", "eth0")),
        ];
        (devices, edges)
    }

    fn simulator(config: SimulationConfig) -> (Simulator, EventRecorder) {
        let bus = EventBus::new();
        let recorder = EventRecorder::attach(&bus);
        (Simulator::new(bus, config), recorder)
    }

    fn instant() -> (Simulator, EventRecorder) {
        simulator(SimulationConfig::headless())
    }

    #[test]
    fn ping_across_switch_succeeds() {
        let (sim, recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let summary = tokio_test::block_on(sim.execute_ping("a", "b"));

        assert!(summary.success, "{:?}", summary.errors);
        assert_eq!(summary.path, vec![DeviceId::from("a"), "sw".into(), "b".into()]);
        assert_eq!(summary.total_packets, 1);
        assert_eq!(summary.total_latency_ms, 0);
        assert_eq!(recorder.count(EventKind::PacketMove), 2);
        assert_eq!(recorder.count(EventKind::PacketArrive), 1);
        assert_eq!(recorder.count(EventKind::PacketDrop), 0);

        let kinds = recorder.kinds();
        assert_eq!(kinds.first(), Some(&EventKind::SimStart));
        assert_eq!(kinds.last(), Some(&EventKind::SimComplete));
        let transitions: Vec<_> = kinds
            .iter()
            .filter(|k| matches!(k, EventKind::PacketMove | EventKind::PacketArrive))
            .collect();
        assert_eq!(
            transitions,
            vec![&EventKind::PacketMove, &EventKind::PacketMove, &EventKind::PacketArrive]
        );

        let state = sim.state();
        assert!(!state.is_running);
        assert_eq!(state.status(), RunStatus::Completed);
    }

    #[test]
    fn switch_learns_and_floods() {
        let (sim, _recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        tokio_test::block_on(sim.execute_ping("a", "b"));

        let table = sim.mac_table("sw").unwrap();
        assert_eq!(table.len(), 1);
        let log = sim.console_log();
        assert!(log.iter().any(|e| e.message.contains("learned")));
        assert!(log.iter().any(|e| e.message.contains("flooding")));
        assert!(log.iter().any(|e| e.message.starts_with("Reply from 10.0.0.2")));
    }

    #[test]
    fn same_endpoints_fail_fast() {
        let (sim, recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let summary = tokio_test::block_on(sim.execute_ping("a", "a"));

        assert!(!summary.success);
        assert!(summary.errors[0].contains("same device"));
        assert_eq!(recorder.count(EventKind::PacketMove), 0);
        assert_eq!(recorder.count(EventKind::SimStart), 0);
        assert_eq!(recorder.kinds().last(), Some(&EventKind::SimComplete));
        assert!(sim.state().current_run.is_none());
    }

    #[test]
    fn unknown_endpoints_fail_fast() {
        let (sim, _recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let summary = tokio_test::block_on(sim.execute_ping("ghost", "b"));
        assert!(summary.errors[0].contains("source device ghost"));
        let summary = tokio_test::block_on(sim.execute_ping("a", "ghost"));
        assert!(summary.errors[0].contains("target device ghost"));
    }

    #[test]
    fn invalid_edge_means_no_route() {
        let (sim, recorder) = instant();
        let (devices, edges) = lan(false);
        sim.initialize(devices, edges);

        let summary = tokio_test::block_on(sim.execute_ping("a", "b"));

        assert!(!summary.success);
        assert!(summary.errors.iter().any(|e| e.contains("no route")));
        assert_eq!(recorder.count(EventKind::PacketMove), 0);
        assert_eq!(recorder.count(EventKind::ConsoleError), 1);
        assert_eq!(recorder.kinds().last(), Some(&EventKind::SimComplete));
        assert_eq!(sim.state().status(), RunStatus::Failed);
    }

    #[test]
    fn ttl_exhaustion_drops_exactly_once() {
        let (sim, recorder) = simulator(SimulationConfig::headless().with_ttl(1));
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let summary = tokio_test::block_on(sim.execute_ping("a", "b"));

        assert!(!summary.success);
        assert!(summary.errors[0].contains("TTL expired"));
        assert_eq!(recorder.count(EventKind::PacketDrop), 1);
        assert_eq!(recorder.count(EventKind::PacketArrive), 0);
        assert_eq!(recorder.count(EventKind::PacketMove), 1);
        let kinds = recorder.kinds();
        let moved = kinds.iter().position(|k| *k == EventKind::PacketMove).unwrap();
        let dropped = kinds.iter().position(|k| *k == EventKind::PacketDrop).unwrap();
        assert!(moved < dropped);

        let drop = recorder
            .events()
            .into_iter()
            .find(|e| e.kind() == EventKind::PacketDrop)
            .unwrap();
        match drop {
            SimEvent::PacketDrop { device, edge, .. } => {
                assert_eq!(device, "sw");
                assert_eq!(edge, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ttl_equal_to_hop_count_arrives() {
        let (sim, recorder) = simulator(SimulationConfig::headless().with_ttl(2));
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        assert!(tokio_test::block_on(sim.execute_ping("a", "b")).success);
        assert_eq!(recorder.count(EventKind::PacketDrop), 0);
    }

    #[test]
    fn routed_ping_narrates_lookup() {
        let (sim, recorder) = instant();
        let (devices, edges) = routed();
        sim.initialize(devices, edges);

        let summary = tokio_test::block_on(sim.execute_ping("a", "b"));

        assert!(summary.success, "{:?}", summary.errors);
        assert_eq!(summary.path.len(), 5);
        assert_eq!(recorder.count(EventKind::PacketMove), 4);
        assert!(sim
            .console_log()
            .iter()
            .any(|e| e.message.contains("R1: route lookup for 10.0.1.2 matched connected 10.0.1.0/24 on g1")));
    }

    #[tokio::test(start_paused = true)]
    async fn hops_take_time_at_normal_speed() {
        let (sim, recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let started = Instant::now();
        let summary = sim.execute_ping("a", "b").await;

        assert!(summary.success);
        assert_eq!(summary.total_latency_ms, 2000);
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
        assert_eq!(summary.total_ticks, 20);
        assert_eq!(recorder.count(EventKind::SimTick), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_scales_hop_duration() {
        let (sim, _recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        sim.set_speed(SimulationSpeed::Fast);
        assert_eq!(sim.execute_ping("a", "b").await.total_latency_ms, 1000);
        sim.set_speed(SimulationSpeed::Slow);
        assert_eq!(sim.execute_ping("a", "b").await.total_latency_ms, 4000);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_mid_run_silences_the_run() {
        let (sim, recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let handle = {
            let sim = sim.clone();
            tokio::spawn(async move { sim.execute_ping("a", "b").await })
        };
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let mid = sim.state();
        assert!(mid.is_running);
        assert_eq!(mid.current_run.as_ref().unwrap().hop_durations_ms.len(), 2);

        sim.reset();
        let reset_at = recorder.events().len();
        let summary = handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!summary.success);
        assert_eq!(summary.errors, vec!["simulation reset".to_string()]);
        let events = recorder.events();
        assert_eq!(events[reset_at - 1], SimEvent::SimReset);
        assert!(events[reset_at..].is_empty(), "events after reset: {:?}", &events[reset_at..]);
        assert_eq!(recorder.count(EventKind::PacketArrive), 0);
        assert_eq!(recorder.count(EventKind::SimComplete), 0);

        let state = sim.state();
        assert!(!state.is_running);
        assert!(state.current_run.is_none());
        assert!(sim.console_log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_ping_is_rejected() {
        let (sim, recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let handle = {
            let sim = sim.clone();
            tokio::spawn(async move { sim.execute_ping("a", "b").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let before = recorder.events().len();
        let rejected = sim.execute_ping("b", "a").await;
        assert!(!rejected.success);
        assert_eq!(rejected.errors, vec!["simulation already running".to_string()]);
        assert_eq!(recorder.events().len(), before);

        let first = handle.await.unwrap();
        assert!(first.success);
        assert_eq!(recorder.count(EventKind::SimComplete), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn link_failure_mid_run_drops_packet() {
        let (sim, recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let handle = {
            let sim = sim.clone();
            tokio::spawn(async move { sim.execute_ping("a", "b").await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        sim.set_edge_valid("e2", false).unwrap();

        let summary = handle.await.unwrap();
        assert!(!summary.success);
        assert!(summary.errors[0].contains("link down"));
        assert_eq!(recorder.count(EventKind::PacketMove), 1);
        assert_eq!(recorder.count(EventKind::PacketDrop), 1);
        assert_eq!(recorder.count(EventKind::PacketArrive), 0);
        assert_eq!(recorder.kinds().last(), Some(&EventKind::SimComplete));
    }

    #[tokio::test(start_paused = true)]
    async fn ping_count_sends_successive_packets() {
        let (sim, recorder) = simulator(SimulationConfig::default().with_ping_count(3));
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let summary = sim.execute_ping("a", "b").await;

        assert!(summary.success);
        assert_eq!(summary.total_packets, 3);
        assert_eq!(summary.total_latency_ms, 6000);
        assert_eq!(recorder.count(EventKind::PacketArrive), 3);

        let mut ids: Vec<_> = recorder
            .events()
            .iter()
            .filter(|e| e.kind() == EventKind::PacketArrive)
            .filter_map(SimEvent::packet_id)
            .collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_cancels_and_reports_issues() {
        let (sim, recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices.clone(), edges.clone());

        let handle = {
            let sim = sim.clone();
            tokio::spawn(async move { sim.execute_ping("a", "b").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        // unbind b's port so the snapshot carries an asymmetric binding
        let mut devices = devices;
        devices[2].interfaces[0].connected_edge_id = None;
        sim.initialize(devices, edges);

        let summary = handle.await.unwrap();
        assert_eq!(summary.errors, vec!["simulation reset".to_string()]);
        assert_eq!(recorder.count(EventKind::ConsoleWarn), 1);
        assert!(sim.console_log()[0].message.contains("does not record link e2"));
        assert!(!sim.state().is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_ping_releases_the_run() {
        let (sim, recorder) = simulator(SimulationConfig::default());
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let abandoned = tokio::time::timeout(Duration::from_millis(500), sim.execute_ping("a", "b")).await;
        assert!(abandoned.is_err());

        let state = sim.state();
        assert!(!state.is_running);
        assert_eq!(state.status(), RunStatus::Failed);
        assert_eq!(
            state.current_run.unwrap().errors,
            vec!["simulation abandoned before completion".to_string()]
        );
        assert_eq!(sim.shared.scheduler.pending_count(), 0);
        assert_eq!(recorder.count(EventKind::SimComplete), 0);

        let summary = sim.execute_ping("a", "b").await;
        assert!(summary.success, "{:?}", summary.errors);
        assert_eq!(recorder.count(EventKind::SimComplete), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reset_from_another_thread_silences_the_run() {
        let (sim, recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        let pinger = {
            let sim = sim.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    sim.execute_ping("a", "b").await;
                }
            })
        };
        for _ in 0..25 {
            tokio::task::yield_now().await;
            let sim = sim.clone();
            tokio::task::spawn_blocking(move || sim.reset()).await.unwrap();
        }
        pinger.await.unwrap();

        // runs are sequential, so the last run started before a reset is
        // the only one it can cancel
        let events = recorder.events();
        let mut started = None;
        for (index, event) in events.iter().enumerate() {
            match event {
                SimEvent::SimStart { run, .. } => started = Some(*run),
                SimEvent::SimReset => {
                    if let Some(run) = started.take() {
                        let late: Vec<_> = events[index..].iter().filter(|e| e.run() == Some(run)).collect();
                        assert!(late.is_empty(), "{run} emitted after reset: {late:?}");
                    }
                }
                _ => {}
            }
        }
        assert!(!sim.state().is_running);
    }

    #[test]
    fn set_edge_valid_rejects_unknown_edge() {
        let (sim, _recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);

        assert!(matches!(sim.set_edge_valid("nope", false), Err(Error::Topology(_))));
        sim.set_edge_valid("e2", false).unwrap();
        assert!(!tokio_test::block_on(sim.execute_ping("a", "b")).success);
        sim.set_edge_valid("e2", true).unwrap();
        assert!(tokio_test::block_on(sim.execute_ping("a", "b")).success);
    }

    #[test]
    fn reset_emits_and_clears() {
        let (sim, recorder) = instant();
        let (devices, edges) = lan(true);
        sim.initialize(devices, edges);
        tokio_test::block_on(sim.execute_ping("a", "b"));

        sim.reset();
        assert_eq!(recorder.kinds().last(), Some(&EventKind::SimReset));
        assert!(sim.console_log().is_empty());
        assert!(sim.mac_table("sw").is_none());
        assert_eq!(sim.state().status(), RunStatus::Idle);
    }
}
