pub mod aodv;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod packet;
pub mod scheduler;
pub mod session;
pub mod topology;
pub mod traits;

pub use aodv::{AodvRouter, RouterCmd, RouterPolicy};
pub use capture::{Capture, CaptureRecord};
pub use config::SimConfig;
pub use engine::{PacketSnapshot, Simulation};
pub use error::{CommandError, ConfigError};
pub use events::{EventKind, EventLog, Notice, ProtocolEvent};
pub use packet::{InFlightPacket, PacketKind};
pub use scheduler::Scheduler;
pub use session::{DiscoverySession, Phase, SessionStatus};
pub use topology::{canonical_key, Node, NodeSnapshot, Position, Topology, Velocity};
pub use traits::{EventSink, NodeId};

/// Valid node counts for `Simulation::build_topology`.
pub const MIN_NODES: usize = 3;
pub const MAX_NODES: usize = 99;

/// Path-segment fractions per second for a packet at 1.0x animation speed.
pub const DEFAULT_PACKET_SPEED: f32 = 0.8;
