use std::collections::HashSet;

use log::{debug, info};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::NodeId;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

/// A radio node. `forwarded` holds the (source, discovery id) floods this
/// node has already been handed, so each flood passes through it once.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub velocity: Option<Velocity>,
    pub range: f32,
    pub neighbors: Vec<NodeId>,
    pub forwarded: HashSet<(NodeId, u64)>,
}

impl Node {
    pub fn new(id: NodeId, position: Position, range: f32) -> Self {
        Self {
            id,
            position,
            velocity: None,
            range,
            neighbors: Vec::new(),
            forwarded: HashSet::new(),
        }
    }

    pub fn add_neighbor(&mut self, other: NodeId) {
        if other != self.id && !self.neighbors.contains(&other) {
            self.neighbors.push(other);
        }
    }

    pub fn has_forwarded(&self, source: NodeId, discovery_id: u64) -> bool {
        self.forwarded.contains(&(source, discovery_id))
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.is_some()
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub position: Position,
    pub range: f32,
    pub neighbors: Vec<NodeId>,
    pub moving: bool,
}

pub fn canonical_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Node set with range-derived adjacency plus the long links added at build time.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    extra_links: HashSet<(NodeId, NodeId)>,
}

impl Topology {
    /// Random placement followed by range adjacency and a single pass of
    /// probabilistic long links. Placement separation is best effort: once
    /// the attempt budget is spent the remaining nodes land anywhere.
    pub fn build<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let count = config.node_count;
        let (min_x, max_x) = (config.placement_margin, config.area_width - config.placement_margin);
        let (min_y, max_y) = (config.placement_margin, config.area_height - config.placement_margin);

        let mut positions: Vec<Position> = Vec::with_capacity(count);
        let mut attempts = count * config.placement_attempts_per_node;
        while positions.len() < count && attempts > 0 {
            let candidate = Position::new(rng.gen_range(min_x..=max_x), rng.gen_range(min_y..=max_y));
            let too_close = positions
                .iter()
                .any(|p| p.distance_to(&candidate) < config.min_separation);
            if !too_close {
                positions.push(candidate);
            }
            attempts -= 1;
        }
        if positions.len() < count {
            debug!(
                "placement budget exhausted after {} nodes; placing {} without separation",
                positions.len(),
                count - positions.len()
            );
            while positions.len() < count {
                positions.push(Position::new(rng.gen_range(min_x..=max_x), rng.gen_range(min_y..=max_y)));
            }
        }

        let mut topology = Self {
            nodes: positions
                .into_iter()
                .enumerate()
                .map(|(i, p)| Node::new(i as NodeId, p, config.radio_range))
                .collect(),
            extra_links: HashSet::new(),
        };
        topology.recompute_range_neighbors();
        let basic: usize = topology.nodes.iter().map(|n| n.neighbors.len()).sum();

        let (low, high) = config.long_link_band;
        for i in 0..topology.nodes.len() {
            for j in (i + 1)..topology.nodes.len() {
                let a = &topology.nodes[i];
                let d = a.position.distance_to(&topology.nodes[j].position);
                if d >= a.range * low
                    && d <= a.range * high
                    && rng.gen_bool(config.long_link_probability)
                {
                    topology.link(i as NodeId, j as NodeId);
                }
            }
        }

        info!(
            "built topology: {} nodes, {} range links, {} extra links",
            topology.nodes.len(),
            basic,
            topology.extra_links.len()
        );
        topology
    }

    /// Explicit topology: every link is symmetric and recorded as an extra link.
    pub fn from_links(positions: Vec<Position>, range: f32, links: &[(NodeId, NodeId)]) -> Self {
        let mut topology = Self {
            nodes: positions
                .into_iter()
                .enumerate()
                .map(|(i, p)| Node::new(i as NodeId, p, range))
                .collect(),
            extra_links: HashSet::new(),
        };
        for &(a, b) in links {
            if a != b && topology.contains(a) && topology.contains(b) {
                topology.link(a, b);
            }
        }
        topology
    }

    fn link(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a as usize].add_neighbor(b);
        self.nodes[b as usize].add_neighbor(a);
        self.extra_links.insert(canonical_key(a, b));
    }

    fn recompute_range_neighbors(&mut self) {
        let positions: Vec<Position> = self.nodes.iter().map(|n| n.position).collect();
        for node in &mut self.nodes {
            node.neighbors.clear();
            for (j, pos) in positions.iter().enumerate() {
                let other = j as NodeId;
                if other != node.id && node.position.distance_to(pos) <= node.range {
                    node.neighbors.push(other);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        (id as usize) < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id as usize)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.neighbors.as_slice()).unwrap_or(&[])
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.node(id).map(|n| n.position)
    }

    pub fn is_extra_link(&self, a: NodeId, b: NodeId) -> bool {
        self.extra_links.contains(&canonical_key(a, b))
    }

    pub fn extra_links(&self) -> &HashSet<(NodeId, NodeId)> {
        &self.extra_links
    }

    pub fn is_mobile(&self) -> bool {
        self.nodes.iter().any(Node::is_moving)
    }

    /// Marks `node` as having forwarded the flood. Returns false if it already had.
    pub fn mark_forwarded(&mut self, node: NodeId, source: NodeId, discovery_id: u64) -> bool {
        match self.node_mut(node) {
            Some(n) => n.forwarded.insert((source, discovery_id)),
            None => false,
        }
    }

    pub fn clear_forwarded(&mut self) {
        for node in &mut self.nodes {
            node.forwarded.clear();
        }
    }

    pub fn set_mobility<R: Rng + ?Sized>(&mut self, enabled: bool, speed: f32, rng: &mut R) {
        for node in &mut self.nodes {
            node.velocity = if enabled {
                Some(Velocity {
                    vx: rng.gen_range(-speed..=speed),
                    vy: rng.gen_range(-speed..=speed),
                })
            } else {
                None
            };
        }
    }

    /// Integrates moving nodes and rebuilds adjacency from range alone.
    /// Long links from build time do not survive a mobile tick.
    pub fn tick(&mut self, dt: f32, config: &SimConfig) {
        if !self.is_mobile() {
            return;
        }
        let margin = config.bounce_margin;
        let (max_x, max_y) = (config.area_width - margin, config.area_height - margin);

        for node in &mut self.nodes {
            let Some(v) = node.velocity.as_mut() else {
                continue;
            };
            node.position.x += v.vx * dt * config.mobility_scale;
            node.position.y += v.vy * dt * config.mobility_scale;

            if node.position.x < margin || node.position.x > max_x {
                v.vx = -v.vx;
            }
            if node.position.y < margin || node.position.y > max_y {
                v.vy = -v.vy;
            }
            node.position.x = node.position.x.clamp(margin, max_x);
            node.position.y = node.position.y.clamp(margin, max_y);
        }
        self.recompute_range_neighbors();
    }

    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .iter()
            .map(|n| NodeSnapshot {
                id: n.id,
                position: n.position,
                range: n.range,
                neighbors: n.neighbors.clone(),
                moving: n.is_moving(),
            })
            .collect()
    }
}
