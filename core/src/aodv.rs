//! Route discovery state machine.
//!
//! The router never touches the packet queues directly. Like a component
//! handling an event, each handler returns the packets to send and the
//! notices to report, and the engine applies them in order.

use log::{debug, trace};
use rand::Rng;

use crate::config::SimConfig;
use crate::error::CommandError;
use crate::events::{EventKind, Notice};
use crate::packet::{InFlightPacket, PacketKind};
use crate::session::{DiscoverySession, Phase};
use crate::topology::Topology;
use crate::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum RouterCmd {
    Send(InFlightPacket),
    Emit(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterPolicy {
    pub packet_speed: f32,
    pub satisfied_path_count: usize,
    pub satisfied_hop_count: usize,
    pub reset_best_on_rerequest: bool,
}

impl From<&SimConfig> for RouterPolicy {
    fn from(config: &SimConfig) -> Self {
        Self {
            packet_speed: config.packet_speed,
            satisfied_path_count: config.satisfied_path_count,
            satisfied_hop_count: config.satisfied_hop_count,
            reset_best_on_rerequest: config.reset_best_on_rerequest,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AodvRouter {
    pub session: DiscoverySession,
    pub policy: RouterPolicy,
    next_discovery_id: u64,
    next_packet_id: u64,
}

impl AodvRouter {
    pub fn new(policy: RouterPolicy) -> Self {
        Self {
            session: DiscoverySession::default(),
            policy,
            next_discovery_id: 1,
            next_packet_id: 1,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Drops the session. Discovery ids keep counting up.
    pub fn reset(&mut self, topology: &mut Topology) {
        self.session = DiscoverySession::default();
        topology.clear_forwarded();
    }

    fn packet(&mut self, kind: PacketKind, path: Vec<NodeId>) -> InFlightPacket {
        let id = self.next_packet_id;
        self.next_packet_id += 1;
        InFlightPacket::new(id, kind, path, self.policy.packet_speed)
            .in_flood(self.session.discovery_id)
    }

    pub fn start_discovery(
        &mut self,
        source: NodeId,
        destination: NodeId,
        topology: &mut Topology,
    ) -> Result<Vec<RouterCmd>, CommandError> {
        if topology.len() < 2 {
            return Err(CommandError::TopologyTooSmall(topology.len()));
        }
        for id in [source, destination] {
            if !topology.contains(id) {
                return Err(CommandError::UnknownNode(id));
            }
        }
        if source == destination {
            return Err(CommandError::SameEndpoints(source));
        }

        self.reset(topology);
        self.session = DiscoverySession::begin(source, destination);
        let mut cmds = vec![
            RouterCmd::Emit(
                Notice::new(EventKind::SimulationStarted)
                    .link(source, destination)
                    .detail(format!("Network: {} nodes", topology.len())),
            ),
        ];
        cmds.extend(self.flood(topology));
        Ok(cmds)
    }

    /// Seeds a fresh flood from the session source under a new discovery id.
    fn flood(&mut self, topology: &mut Topology) -> Vec<RouterCmd> {
        let Some(source) = self.session.source else {
            return Vec::new();
        };
        let discovery_id = self.next_discovery_id;
        self.next_discovery_id += 1;
        self.session.discovery_id = discovery_id;
        self.session.satisfied = false;
        self.session.phase = Phase::Flooding;
        topology.mark_forwarded(source, source, discovery_id);
        debug!("flood {discovery_id} from node {source}");

        let mut cmds = Vec::new();
        let neighbors = topology.neighbors(source).to_vec();
        for neighbor in neighbors {
            let path = vec![source, neighbor];
            self.session.request_paths.push(path.clone());
            cmds.push(RouterCmd::Send(self.packet(PacketKind::RouteRequest, path)));
            cmds.push(RouterCmd::Emit(
                Notice::new(EventKind::RequestSent)
                    .link(source, neighbor)
                    .hops(1)
                    .packet(PacketKind::RouteRequest),
            ));
        }
        cmds
    }

    /// Handles a packet that reached the end of its path.
    pub fn on_arrival(&mut self, packet: InFlightPacket, topology: &mut Topology) -> Vec<RouterCmd> {
        trace!(
            "{} #{} arrived at {:?} via {:?}",
            packet.kind.label(),
            packet.id,
            packet.terminal(),
            packet.path
        );
        match packet.kind {
            PacketKind::RouteRequest if packet.discovery_id != self.session.discovery_id => {
                trace!(
                    "dropping RREQ #{} of flood {} during flood {}",
                    packet.id,
                    packet.discovery_id,
                    self.session.discovery_id
                );
                Vec::new()
            }
            PacketKind::RouteRequest => self.on_request(packet.path, topology),
            PacketKind::RouteReply => self.on_reply(packet.path),
            PacketKind::Data => self.on_data(packet.path),
            PacketKind::RouteError { link } => self.on_route_error(link, packet.path, topology),
        }
    }

    fn on_request(&mut self, path: Vec<NodeId>, topology: &mut Topology) -> Vec<RouterCmd> {
        let mut cmds = Vec::new();
        let (Some(source), Some(destination), Some(&node)) =
            (self.session.source, self.session.destination, path.last())
        else {
            return cmds;
        };

        if node == destination {
            let hops = path.len() - 1;
            if self.session.offer_route(&path) {
                cmds.push(RouterCmd::Emit(
                    Notice::new(EventKind::BetterPathFound)
                        .link(path[0], destination)
                        .hops(hops)
                        .packet(PacketKind::RouteRequest),
                ));
                let reply: Vec<NodeId> = path.iter().rev().copied().collect();
                cmds.push(RouterCmd::Emit(
                    Notice::new(EventKind::ReplySent)
                        .link(reply[0], reply[1])
                        .hops(hops)
                        .packet(PacketKind::RouteReply),
                ));
                cmds.push(RouterCmd::Send(self.packet(PacketKind::RouteReply, reply)));
            }

            let best = self.session.best_hop_count.unwrap_or(usize::MAX);
            if !self.session.satisfied
                && (self.session.routes.len() >= self.policy.satisfied_path_count
                    || best <= self.policy.satisfied_hop_count)
            {
                self.session.satisfied = true;
                debug!("flood {} satisfied", self.session.discovery_id);
                cmds.push(RouterCmd::Emit(Notice::new(EventKind::DiscoverySatisfied {
                    paths: self.session.routes.len(),
                })));
            }
        }

        if self.session.satisfied {
            return cmds;
        }

        let discovery_id = self.session.discovery_id;
        let neighbors = topology.neighbors(node).to_vec();
        for neighbor in neighbors {
            if path.contains(&neighbor) || !topology.mark_forwarded(neighbor, source, discovery_id) {
                continue;
            }
            let mut next = path.clone();
            next.push(neighbor);
            let hops = next.len() - 1;
            self.session.request_paths.push(next.clone());
            cmds.push(RouterCmd::Send(self.packet(PacketKind::RouteRequest, next)));
            cmds.push(RouterCmd::Emit(
                Notice::new(EventKind::RequestForwarded)
                    .link(node, neighbor)
                    .hops(hops)
                    .packet(PacketKind::RouteRequest),
            ));
        }
        cmds
    }

    fn on_reply(&mut self, path: Vec<NodeId>) -> Vec<RouterCmd> {
        let node = path[path.len() - 1];
        if Some(node) == self.session.source {
            let mut cmds = vec![RouterCmd::Emit(
                Notice::new(EventKind::ReplyReachedSource).packet(PacketKind::RouteReply),
            )];
            cmds.extend(self.send_data());
            return cmds;
        }
        vec![RouterCmd::Emit(
            Notice::new(EventKind::ReplyForwarded)
                .link(path[path.len() - 2], node)
                .hops(path.len() - 1)
                .packet(PacketKind::RouteReply),
        )]
    }

    fn on_data(&mut self, path: Vec<NodeId>) -> Vec<RouterCmd> {
        let node = path[path.len() - 1];
        if Some(node) == self.session.destination {
            self.session.phase = Phase::Complete;
            self.session.delivered = true;
            debug!("data delivered along {path:?}");
            return vec![RouterCmd::Emit(
                Notice::new(EventKind::DataDelivered)
                    .hops(path.len() - 1)
                    .packet(PacketKind::Data),
            )];
        }
        vec![RouterCmd::Emit(
            Notice::new(EventKind::DataForwarded)
                .link(path[path.len() - 2], node)
                .hops(path.len() - 1)
                .packet(PacketKind::Data),
        )]
    }

    fn on_route_error(
        &mut self,
        link: (NodeId, NodeId),
        path: Vec<NodeId>,
        topology: &mut Topology,
    ) -> Vec<RouterCmd> {
        let mut cmds = vec![RouterCmd::Emit(
            Notice::new(EventKind::RouteErrorProcessed)
                .link(link.0, link.1)
                .hops(1)
                .packet(PacketKind::RouteError { link }),
        )];
        if path.last().copied() == self.session.source {
            if self.policy.reset_best_on_rerequest {
                self.session.forget_best();
            }
            cmds.push(RouterCmd::Emit(Notice::new(EventKind::Rediscovery)));
            cmds.extend(self.flood(topology));
        }
        cmds
    }

    fn send_data(&mut self) -> Vec<RouterCmd> {
        if self.session.best_path.len() < 2 {
            return Vec::new();
        }
        self.session.phase = Phase::DataTransfer;
        let path = self.session.best_path.clone();
        vec![
            RouterCmd::Emit(
                Notice::new(EventKind::DataSent)
                    .link(path[0], path[1])
                    .hops(path.len() - 1)
                    .packet(PacketKind::Data),
            ),
            RouterCmd::Send(self.packet(PacketKind::Data, path)),
        ]
    }

    /// Breaks a random link of the best path. The error packet walks the
    /// upstream part of the path back to the source.
    pub fn raise_route_error<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<RouterCmd>, CommandError> {
        let best = &self.session.best_path;
        if best.len() < 3 {
            return Err(CommandError::NoEstablishedRoute);
        }
        let index = rng.gen_range(1..=best.len() - 2);
        let link = (best[index - 1], best[index]);
        let upstream: Vec<NodeId> = best[..=index].iter().rev().copied().collect();
        debug!("breaking link {link:?} at index {index}");

        self.session.phase = Phase::Repairing;
        self.session.delivered = false;
        let kind = PacketKind::RouteError { link };
        Ok(vec![
            RouterCmd::Emit(
                Notice::new(EventKind::RouteErrorRaised)
                    .link(link.0, link.1)
                    .hops(1)
                    .packet(kind),
            ),
            RouterCmd::Send(self.packet(kind, upstream)),
        ])
    }

    /// Called once nothing is queued or in flight while the session runs.
    pub fn on_drained(&mut self) -> Vec<RouterCmd> {
        if self.session.best_path.len() >= 2 {
            return self.send_data();
        }
        self.session.phase = Phase::Complete;
        self.session.delivered = false;
        debug!("flood {} drained without a route", self.session.discovery_id);
        vec![RouterCmd::Emit(Notice::new(EventKind::NoRoute))]
    }
}
