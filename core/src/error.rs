//! Error types for engine commands and configuration loading.

use crate::traits::NodeId;
use thiserror::Error;

/// A command the engine refused. Rejected commands leave state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("node count {0} outside {min}..={max}", min = crate::MIN_NODES, max = crate::MAX_NODES)]
    NodeCountOutOfRange(usize),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("source and destination must differ (both {0})")]
    SameEndpoints(NodeId),

    #[error("source and destination must both be set")]
    MissingEndpoints,

    #[error("topology has {0} node(s); discovery needs at least 2")]
    TopologyTooSmall(usize),

    #[error("no established route of at least 3 nodes")]
    NoEstablishedRoute,

    #[error("animation speed {0} must be finite and positive")]
    InvalidSpeed(f32),
}

/// Failure to load or validate a [`SimConfig`](crate::SimConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
