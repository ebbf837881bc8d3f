use log::{debug, info};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aodv::{AodvRouter, RouterCmd, RouterPolicy};
use crate::capture::Capture;
use crate::config::SimConfig;
use crate::error::{CommandError, ConfigError};
use crate::events::{EventKind, EventLog, Notice, ProtocolEvent};
use crate::packet::PacketKind;
use crate::scheduler::Scheduler;
use crate::session::SessionStatus;
use crate::topology::{NodeSnapshot, Position, Topology};
use crate::traits::{EventSink, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketSnapshot {
    pub id: u64,
    pub kind: PacketKind,
    pub position: Option<Position>,
    pub hop_count: usize,
    pub active: bool,
}

/// The whole simulator: topology, discovery state, packet queues, and the
/// event streams. The presentation layer drives it through the command
/// methods and `tick`, and reads it back through the snapshot methods.
pub struct Simulation {
    pub time: f64,
    pub config: SimConfig,
    pub topology: Topology,
    pub router: AodvRouter,
    pub scheduler: Scheduler,
    pub log: EventLog,
    pub capture: Capture,
    pub source: Option<NodeId>,
    pub destination: Option<NodeId>,
    pub mobility: bool,
    pub speed_multiplier: f32,
    sinks: Vec<Box<dyn EventSink>>,
    rng: StdRng,
}

impl Simulation {
    /// Builds a random topology of `config.node_count` nodes.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = Self::rng_for(&config);
        let topology = Topology::build(&config, &mut rng);
        Ok(Self::assemble(config, topology, rng))
    }

    /// Uses a prepared topology instead of generating one.
    pub fn with_topology(config: SimConfig, topology: Topology) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = Self::rng_for(&config);
        Ok(Self::assemble(config, topology, rng))
    }

    fn rng_for(config: &SimConfig) -> StdRng {
        match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn assemble(config: SimConfig, topology: Topology, rng: StdRng) -> Self {
        Self {
            time: 0.0,
            router: AodvRouter::new(RouterPolicy::from(&config)),
            scheduler: Scheduler::new(config.max_active_packets),
            log: EventLog::new(config.event_log_capacity),
            capture: Capture::new(),
            topology,
            source: None,
            destination: None,
            mobility: false,
            speed_multiplier: 1.0,
            sinks: Vec::new(),
            rng,
            config,
        }
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    fn emit(&mut self, notice: Notice) {
        let event = ProtocolEvent::stamp(self.time, notice);
        self.log.record(&event);
        self.capture.record(&event);
        for sink in &mut self.sinks {
            sink.record(&event);
        }
    }

    fn apply(&mut self, cmds: Vec<RouterCmd>) {
        for cmd in cmds {
            match cmd {
                RouterCmd::Send(packet) => self.scheduler.enqueue(packet),
                RouterCmd::Emit(notice) => self.emit(notice),
            }
        }
    }

    fn reject(&mut self, err: CommandError) -> Result<(), CommandError> {
        debug!("command rejected: {err}");
        self.emit(Notice::new(EventKind::CommandRejected).detail(err.to_string()));
        Err(err)
    }

    // Commands

    pub fn build_topology(&mut self, node_count: usize) -> Result<(), CommandError> {
        if !(crate::MIN_NODES..=crate::MAX_NODES).contains(&node_count) {
            return self.reject(CommandError::NodeCountOutOfRange(node_count));
        }
        self.config.node_count = node_count;
        self.topology = Topology::build(&self.config, &mut self.rng);
        if self.mobility {
            self.topology
                .set_mobility(true, self.config.mobility_speed, &mut self.rng);
        }
        self.source = None;
        self.destination = None;
        self.reset_simulation();
        self.emit(Notice::new(EventKind::TopologyBuilt).detail(format!("{node_count} nodes")));
        Ok(())
    }

    pub fn set_source(&mut self, id: NodeId) -> Result<(), CommandError> {
        if !self.topology.contains(id) {
            return self.reject(CommandError::UnknownNode(id));
        }
        if (self.source.is_some() && self.destination.is_some()) || self.destination == Some(id) {
            self.destination = None;
        }
        self.source = Some(id);
        Ok(())
    }

    pub fn set_destination(&mut self, id: NodeId) -> Result<(), CommandError> {
        if !self.topology.contains(id) {
            return self.reject(CommandError::UnknownNode(id));
        }
        if self.source == Some(id) {
            return self.reject(CommandError::SameEndpoints(id));
        }
        self.destination = Some(id);
        Ok(())
    }

    pub fn start_simulation(&mut self) -> Result<(), CommandError> {
        let (Some(source), Some(destination)) = (self.source, self.destination) else {
            return self.reject(CommandError::MissingEndpoints);
        };
        let cmds = match self
            .router
            .start_discovery(source, destination, &mut self.topology)
        {
            Ok(cmds) => cmds,
            Err(err) => return self.reject(err),
        };
        self.clear_streams();
        info!(
            "discovery {} -> {} over {} nodes",
            source,
            destination,
            self.topology.len()
        );
        self.apply(cmds);
        Ok(())
    }

    /// Drops every packet and all session state. The topology is kept.
    pub fn reset_simulation(&mut self) {
        self.router.reset(&mut self.topology);
        self.clear_streams();
    }

    fn clear_streams(&mut self) {
        self.scheduler.clear();
        self.log.reset();
        self.capture.reset();
        for sink in &mut self.sinks {
            sink.clear();
        }
    }

    pub fn set_mobility(&mut self, enabled: bool) {
        self.mobility = enabled;
        self.topology
            .set_mobility(enabled, self.config.mobility_speed, &mut self.rng);
        self.emit(Notice::new(EventKind::MobilityChanged { enabled }));
    }

    pub fn set_animation_speed(&mut self, factor: f32) -> Result<(), CommandError> {
        if !factor.is_finite() || factor <= 0.0 {
            return self.reject(CommandError::InvalidSpeed(factor));
        }
        self.speed_multiplier = factor;
        Ok(())
    }

    pub fn trigger_route_error(&mut self) -> Result<(), CommandError> {
        match self.router.raise_route_error(&mut self.rng) {
            Ok(cmds) => {
                self.apply(cmds);
                Ok(())
            }
            Err(err) => self.reject(err),
        }
    }

    /// Advances the simulation by `dt` seconds, capped at `max_tick_seconds`.
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() {
            return;
        }
        let dt = dt.clamp(0.0, self.config.max_tick_seconds);
        self.time += dt as f64;

        if self.mobility {
            self.topology.tick(dt, &self.config);
        }
        if !self.router.is_running() {
            return;
        }

        let completed = self.scheduler.advance(dt, self.speed_multiplier);
        for packet in completed {
            let cmds = self.router.on_arrival(packet, &mut self.topology);
            self.apply(cmds);
        }
        self.scheduler.refill();

        if self.scheduler.is_idle() && self.router.is_running() {
            let cmds = self.router.on_drained();
            self.apply(cmds);
        }
        if self.router.session.is_complete() {
            info!(
                "discovery finished: delivered={} path={:?}",
                self.router.session.delivered, self.router.session.best_path
            );
        }
    }

    pub fn run_until_complete(&mut self, step: f32, max_seconds: f64) -> bool {
        let end = self.time + max_seconds;
        while self.router.is_running() && self.time < end {
            self.tick(step);
        }
        self.router.session.is_complete()
    }

    // Queries

    pub fn topology_snapshot(&self) -> Vec<NodeSnapshot> {
        self.topology.snapshot()
    }

    pub fn packet_snapshots(&self) -> Vec<PacketSnapshot> {
        self.scheduler
            .iter()
            .map(|(p, active)| PacketSnapshot {
                id: p.id,
                kind: p.kind,
                position: p.current_position(&self.topology),
                hop_count: p.hop_count(),
                active,
            })
            .collect()
    }

    pub fn status(&self) -> SessionStatus {
        let mut status = self.router.session.status();
        status.source = self.source;
        status.destination = self.destination;
        status
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }
}
