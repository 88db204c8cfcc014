//! netlab headless ping
//!
//! Load a topology file, ping between two devices and print every event as
//! a JSON line, followed by the summary.
//!
//! ```text
//! netlab-ping <topology.json> <source> <target> [slow|normal|fast|instant]
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use netlab_logging::LogConfig;
use netlab_sim::{load_topology, EventBus, EventKind, SimulationConfig, SimulationSpeed, Simulator};

const USAGE: &str = "usage: netlab-ping <topology.json> <source> <target> [slow|normal|fast|instant]";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    netlab_logging::init(&LogConfig::from_env()?)?;

    let args: Vec<String> = env::args().skip(1).collect();
    let [path, source, target, rest @ ..] = args.as_slice() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };

    let mut config = SimulationConfig::from_env()?;
    if let Some(speed) = rest.first() {
        config = config.with_speed(speed.parse::<SimulationSpeed>()?);
    }

    let topology = load_topology(&PathBuf::from(path))?;
    tracing::info!(
        devices = topology.device_count(),
        edges = topology.edges().len(),
        speed = %config.default_speed,
        "starting ping"
    );

    let bus = EventBus::new();
    for kind in EventKind::ALL {
        // subscriptions live as long as the bus
        let _ = bus.on(kind, |event| match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(%err, "could not serialize event"),
        });
    }

    let sim = Simulator::new(bus.clone(), config);
    sim.initialize_topology(topology);
    let summary = sim.execute_ping(source, target).await;
    bus.shutdown();

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(if summary.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
