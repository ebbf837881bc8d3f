use serde::{Deserialize, Serialize};

use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Idle,
    Flooding,
    DataTransfer,
    /// A route error is on its way back to the source.
    Repairing,
    Complete,
}

impl Phase {
    pub fn is_running(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::Complete)
    }
}

/// State of the single discovery the engine runs at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverySession {
    pub source: Option<NodeId>,
    pub destination: Option<NodeId>,
    pub phase: Phase,
    pub discovery_id: u64,
    pub best_path: Vec<NodeId>,
    pub best_hop_count: Option<usize>,
    /// Every request path that reached the destination.
    pub routes: Vec<Vec<NodeId>>,
    /// Every request path spawned, delivered or not.
    pub request_paths: Vec<Vec<NodeId>>,
    pub satisfied: bool,
    pub delivered: bool,
}

impl DiscoverySession {
    pub fn begin(source: NodeId, destination: NodeId) -> Self {
        Self {
            source: Some(source),
            destination: Some(destination),
            phase: Phase::Flooding,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Records a request that reached the destination. Returns true if it
    /// beats the best path so far.
    pub fn offer_route(&mut self, path: &[NodeId]) -> bool {
        self.routes.push(path.to_vec());
        let hops = path.len().saturating_sub(1);
        if self.best_hop_count.map_or(true, |best| hops < best) {
            self.best_hop_count = Some(hops);
            self.best_path = path.to_vec();
            true
        } else {
            false
        }
    }

    pub fn forget_best(&mut self) {
        self.best_path.clear();
        self.best_hop_count = None;
        self.routes.clear();
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            source: self.source,
            destination: self.destination,
            phase: self.phase,
            running: self.is_running(),
            complete: self.is_complete(),
            delivered: self.delivered,
            discovery_id: self.discovery_id,
            best_path: self.best_path.clone(),
            best_hop_count: self.best_hop_count,
            discovered_paths: self.routes.len(),
            satisfied: self.satisfied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub source: Option<NodeId>,
    pub destination: Option<NodeId>,
    pub phase: Phase,
    pub running: bool,
    pub complete: bool,
    pub delivered: bool,
    pub discovery_id: u64,
    pub best_path: Vec<NodeId>,
    pub best_hop_count: Option<usize>,
    pub discovered_paths: usize,
    pub satisfied: bool,
}
