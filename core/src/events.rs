use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::packet::PacketKind;
use crate::traits::EventSink;
use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SimulationStarted,
    TopologyBuilt,
    MobilityChanged { enabled: bool },
    RequestSent,
    RequestForwarded,
    BetterPathFound,
    DiscoverySatisfied { paths: usize },
    ReplySent,
    ReplyForwarded,
    ReplyReachedSource,
    DataSent,
    DataForwarded,
    DataDelivered,
    RouteErrorRaised,
    RouteErrorProcessed,
    Rediscovery,
    NoRoute,
    CommandRejected,
}

impl EventKind {
    /// Packet family this event belongs to, if any.
    pub fn packet_label(&self) -> Option<&'static str> {
        use EventKind::*;
        match self {
            RequestSent | RequestForwarded | BetterPathFound => Some("RREQ"),
            ReplySent | ReplyForwarded | ReplyReachedSource => Some("RREP"),
            DataSent | DataForwarded | DataDelivered => Some("DATA"),
            RouteErrorRaised | RouteErrorProcessed => Some("RERR"),
            _ => None,
        }
    }

    /// Events that correspond to a packet going over a link.
    pub fn is_transmission(&self) -> bool {
        use EventKind::*;
        matches!(
            self,
            RequestSent
                | RequestForwarded
                | ReplySent
                | ReplyForwarded
                | DataSent
                | DataForwarded
                | RouteErrorRaised
                | RouteErrorProcessed
        )
    }

    fn text(&self) -> String {
        use EventKind::*;
        match self {
            SimulationStarted => "Simulation started".into(),
            TopologyBuilt => "Topology built".into(),
            MobilityChanged { enabled: true } => "Node mobility ENABLED".into(),
            MobilityChanged { enabled: false } => "Node mobility DISABLED".into(),
            RequestSent => "Route Request sent".into(),
            RequestForwarded => "Route Request forwarded".into(),
            BetterPathFound => "Better path found".into(),
            DiscoverySatisfied { paths } => format!("Stopping RREQ - Found {paths} paths"),
            ReplySent => "Route Reply sent back".into(),
            ReplyForwarded => "Route Reply forwarded".into(),
            ReplyReachedSource => "Route Reply reached source".into(),
            DataSent => "Data transmission started".into(),
            DataForwarded => "Data forwarded".into(),
            DataDelivered => "Data reached destination!".into(),
            RouteErrorRaised => "Simulating Route Error - Link break".into(),
            RouteErrorProcessed => "Route Error processed".into(),
            Rediscovery => "Initiating new route discovery due to RERR".into(),
            NoRoute => "Discovery finished without a route".into(),
            CommandRejected => "Command rejected".into(),
        }
    }
}

/// What the router wants reported. The engine stamps it with time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: EventKind,
    pub link: Option<(NodeId, NodeId)>,
    pub hop_count: Option<usize>,
    pub packet: Option<PacketKind>,
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            link: None,
            hop_count: None,
            packet: None,
            detail: None,
        }
    }

    pub fn link(mut self, from: NodeId, to: NodeId) -> Self {
        self.link = Some((from, to));
        self
    }

    pub fn hops(mut self, hop_count: usize) -> Self {
        self.hop_count = Some(hop_count);
        self
    }

    pub fn packet(mut self, packet: PacketKind) -> Self {
        self.packet = Some(packet);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    /// Simulated seconds since the engine was created.
    pub time: f64,
    pub kind: EventKind,
    pub link: Option<(NodeId, NodeId)>,
    pub hop_count: Option<usize>,
    pub packet: Option<PacketKind>,
    pub detail: Option<String>,
}

impl ProtocolEvent {
    pub fn stamp(time: f64, notice: Notice) -> Self {
        Self {
            time,
            kind: notice.kind,
            link: notice.link,
            hop_count: notice.hop_count,
            packet: notice.packet,
            detail: notice.detail,
        }
    }
}

pub fn format_clock(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let (h, rem) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    let (s, ms) = (rem / 1000, rem % 1000);
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", format_clock(self.time))?;
        if let Some(label) = self.kind.packet_label() {
            write!(f, "{label}: ")?;
        }
        write!(f, "{}", self.kind.text())?;
        if let Some(detail) = &self.detail {
            write!(f, " - {detail}")?;
        }
        if let Some((from, to)) = self.link {
            write!(f, " (Node {from} → Node {to})")?;
        }
        if let Some(hops) = self.hop_count {
            write!(f, " [Hops: {hops}]")?;
        }
        Ok(())
    }
}

/// Bounded display log; the oldest entry drops once capacity is reached.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub entries: VecDeque<ProtocolEvent>,
    pub capacity: usize,
    pub total: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, event: ProtocolEvent) {
        self.entries.push_back(event);
        self.total += 1;
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtocolEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.total = 0;
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: &ProtocolEvent) {
        self.push(event.clone());
    }

    fn clear(&mut self) {
        self.reset();
    }
}
