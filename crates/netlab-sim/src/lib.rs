//! netlab Simulation
//!
//! Steps a synthetic ping through a topology snapshot, hop by hop, and
//! reports everything that happens as events.
//!
//! # Architecture
//!
//! - **Event bus**: owned publish/subscribe registry, the only channel from
//!   the engine to its consumers
//! - **Path resolver**: fewest-hop BFS with switch, router and firewall
//!   forwarding rules
//! - **Simulator**: owns one run at a time, suspends on a cancellable hop
//!   timer per packet, publishes lifecycle, packet and console events
//!
//! # Usage
//!
//! ```ignore
//! let bus = EventBus::new();
//! let recorder = EventRecorder::attach(&bus);
//! let sim = Simulator::new(bus, SimulationConfig::headless());
//!
//! sim.initialize(devices, edges);
//! let summary = sim.execute_ping("pc-a", "pc-b").await;
//! assert!(summary.success);
//! ```

mod bus;
mod config;
mod error;
mod events;
mod forwarding;
mod packet;
mod resolver;
mod run;
mod scheduler;
mod simulator;
mod speed;

pub use bus::{EventBus, EventRecorder, Subscription};
pub use config::{load_topology, SimulationConfig};
pub use error::{Error, Result};
pub use events::{ConsoleEntry, ConsoleLevel, EventKind, SimEvent};
pub use forwarding::{ForwardingState, MacTable};
pub use packet::{IpProtocol, L2Header, L3Header, Packet, PacketId, ETHERTYPE_IPV4};
pub use resolver::{Hop, PathResolver, ResolvedPath, RouteFailure};
pub use run::{RunId, RunStatus, SimulationRun, SimulationState, SimulationSummary};
pub use scheduler::HopScheduler;
pub use simulator::Simulator;
pub use speed::SimulationSpeed;
