use aodv_core::{EventSink, NodeId, ProtocolEvent, SimConfig, Simulation};
use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const FRAME: f32 = 1.0 / 60.0;

/// Headless driver for the AODV discovery simulator.
#[derive(Parser, Debug)]
#[command(name = "aodv-sim", version, about)]
struct Args {
    /// Number of nodes to place (3..=99). Overrides the config file.
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Node that originates the route request.
    #[arg(short, long, default_value_t = 0)]
    source: NodeId,

    /// Target node; defaults to the highest node id.
    #[arg(short, long)]
    destination: Option<NodeId>,

    /// RNG seed for placement, mobility and route error picks.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with simulation parameters.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Let nodes drift and re-link while the flood runs.
    #[arg(long)]
    mobility: bool,

    /// Animation speed multiplier.
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Break a link on the best path this many simulated seconds after delivery.
    #[arg(long)]
    route_error_after: Option<f64>,

    /// Give up after this many simulated seconds.
    #[arg(long, default_value_t = 600.0)]
    max_seconds: f64,

    /// Write the packet capture report to this file.
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Drop the remembered best path before the repair flood.
    #[arg(long)]
    reset_best_on_rerequest: bool,

    /// Print the final session status as JSON.
    #[arg(long)]
    json: bool,
}

struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, event: &ProtocolEvent) {
        info!("{}", event);
    }
}

fn load_config(args: &Args) -> anyhow::Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(nodes) = args.nodes {
        config = config.with_node_count(nodes);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.reset_best_on_rerequest {
        config.reset_best_on_rerequest = true;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let mut sim = Simulation::new(config)?;
    sim.subscribe(Box::new(LogSink));
    sim.set_mobility(args.mobility);
    sim.set_animation_speed(args.speed)?;

    let destination = args
        .destination
        .unwrap_or((sim.topology.len() - 1) as NodeId);
    sim.set_source(args.source)?;
    sim.set_destination(destination)?;
    sim.start_simulation()?;

    let end = sim.time + args.max_seconds;
    let mut repair_at = None;
    let mut repaired = false;
    while sim.time < end {
        sim.tick(FRAME);
        if sim.router.is_running() {
            continue;
        }
        match (args.route_error_after, repair_at) {
            (Some(after), None) if !repaired && sim.status().delivered => {
                repair_at = Some(sim.time + after);
            }
            (_, Some(at)) if sim.time >= at => {
                repair_at = None;
                repaired = true;
                if let Err(err) = sim.trigger_route_error() {
                    info!("route error not raised: {}", err);
                }
            }
            (_, Some(_)) => {}
            _ => break,
        }
    }

    let status = sim.status();
    if status.running {
        bail!(
            "discovery {} -> {} still running after {:.1}s",
            args.source,
            destination,
            args.max_seconds
        );
    }

    if let Some(path) = &args.capture {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        sim.capture()
            .write_report(&mut out, sim.source, sim.destination)?;
        out.flush()?;
        info!("wrote {} capture rows to {}", sim.capture().len(), path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!(
            "{} -> {}: {} after {:.2}s",
            args.source,
            destination,
            if status.delivered { "delivered" } else { "no route" },
            sim.time
        );
        if !status.best_path.is_empty() {
            let hops: Vec<String> = status.best_path.iter().map(|n| n.to_string()).collect();
            println!(
                "best path: {} ({} hops, {} candidate routes)",
                hops.join(" -> "),
                status.best_hop_count.unwrap_or(0),
                status.discovered_paths
            );
        }
        println!("events: {}", sim.events().total);
    }
    Ok(())
}
