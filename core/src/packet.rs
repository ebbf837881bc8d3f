use serde::{Deserialize, Serialize};

use crate::topology::{Position, Topology};
use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    RouteRequest,
    RouteReply,
    Data,
    /// Carries the link whose break it reports.
    RouteError { link: (NodeId, NodeId) },
}

impl PacketKind {
    pub fn label(&self) -> &'static str {
        match self {
            PacketKind::RouteRequest => "RREQ",
            PacketKind::RouteReply => "RREP",
            PacketKind::Data => "DATA",
            PacketKind::RouteError { .. } => "RERR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PacketKind::RouteRequest => "Route Request",
            PacketKind::RouteReply => "Route Reply",
            PacketKind::Data => "Data",
            PacketKind::RouteError { .. } => "Route Error",
        }
    }
}

/// A packet moving hop by hop along a fixed path.
///
/// `progress` is the fraction of the current segment covered; `speed` is in
/// segments per second, so travel time does not depend on node spacing.
/// `discovery_id` is the flood that was current when the packet was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InFlightPacket {
    pub id: u64,
    pub kind: PacketKind,
    pub discovery_id: u64,
    pub path: Vec<NodeId>,
    pub hop_index: usize,
    pub progress: f32,
    pub speed: f32,
    pub completed: bool,
}

impl InFlightPacket {
    pub fn new(id: u64, kind: PacketKind, path: Vec<NodeId>, speed: f32) -> Self {
        debug_assert!(path.len() >= 2, "packet path needs at least two nodes");
        Self {
            id,
            kind,
            discovery_id: 0,
            path,
            hop_index: 0,
            progress: 0.0,
            speed,
            completed: false,
        }
    }

    pub fn in_flood(mut self, discovery_id: u64) -> Self {
        self.discovery_id = discovery_id;
        self
    }

    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Last node of the path, where the packet gets handled.
    pub fn terminal(&self) -> Option<NodeId> {
        self.path.last().copied()
    }

    /// Moves the packet forward. Returns true on the call that reaches a new hop.
    pub fn advance(&mut self, dt: f32, speed_multiplier: f32) -> bool {
        if self.completed {
            return false;
        }
        self.progress += self.speed * speed_multiplier * dt;
        if self.progress < 1.0 {
            return false;
        }

        self.hop_index += 1;
        self.progress = 0.0;
        if self.hop_index >= self.path.len().saturating_sub(1) {
            self.hop_index = self.path.len().saturating_sub(1);
            self.completed = true;
            self.progress = 1.0;
        }
        true
    }

    pub fn current_position(&self, topology: &Topology) -> Option<Position> {
        if self.completed || self.hop_index + 1 >= self.path.len() {
            return self.terminal().and_then(|id| topology.position(id));
        }
        let from = topology.position(self.path[self.hop_index])?;
        let to = topology.position(self.path[self.hop_index + 1])?;
        Some(from.lerp(&to, self.progress))
    }
}
