use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable of the simulator. Missing fields in JSON fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub node_count: usize,
    pub area_width: f32,
    pub area_height: f32,
    pub placement_margin: f32,
    pub bounce_margin: f32,
    pub min_separation: f32,
    pub placement_attempts_per_node: usize,
    pub radio_range: f32,
    /// Distance band, as fractions of range, eligible for extra long links.
    pub long_link_band: (f32, f32),
    pub long_link_probability: f64,
    pub mobility_speed: f32,
    pub mobility_scale: f32,
    pub packet_speed: f32,
    pub max_active_packets: usize,
    pub max_tick_seconds: f32,
    pub satisfied_path_count: usize,
    pub satisfied_hop_count: usize,
    pub event_log_capacity: usize,
    /// Forget the previous best path when a route error restarts discovery.
    pub reset_best_on_rerequest: bool,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: 15,
            area_width: 1300.0,
            area_height: 900.0,
            placement_margin: 60.0,
            bounce_margin: 50.0,
            min_separation: 40.0,
            placement_attempts_per_node: 10,
            radio_range: 130.0,
            long_link_band: (0.8, 1.2),
            long_link_probability: 0.3,
            mobility_speed: 0.5,
            mobility_scale: 8.0,
            packet_speed: crate::DEFAULT_PACKET_SPEED,
            max_active_packets: 5,
            max_tick_seconds: 0.033,
            satisfied_path_count: 5,
            satisfied_hop_count: 2,
            event_log_capacity: 20,
            reset_best_on_rerequest: false,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_node_count(mut self, count: usize) -> Self {
        self.node_count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(crate::MIN_NODES..=crate::MAX_NODES).contains(&self.node_count) {
            return Err(ConfigError::Invalid(format!(
                "node_count {} outside {}..={}",
                self.node_count,
                crate::MIN_NODES,
                crate::MAX_NODES
            )));
        }
        if !(self.area_width > 2.0 * self.placement_margin
            && self.area_height > 2.0 * self.placement_margin)
        {
            return Err(ConfigError::Invalid(
                "area must be larger than twice the placement margin".into(),
            ));
        }
        if !(self.bounce_margin >= 0.0
            && self.area_width > 2.0 * self.bounce_margin
            && self.area_height > 2.0 * self.bounce_margin)
        {
            return Err(ConfigError::Invalid(format!(
                "bounce_margin {} does not fit a {}x{} area",
                self.bounce_margin, self.area_width, self.area_height
            )));
        }
        if !(self.radio_range > 0.0 && self.packet_speed > 0.0) {
            return Err(ConfigError::Invalid(
                "radio_range and packet_speed must be positive".into(),
            ));
        }
        if !(self.mobility_speed >= 0.0 && self.mobility_speed.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "mobility_speed {} must be finite and non-negative",
                self.mobility_speed
            )));
        }
        if !(self.max_tick_seconds > 0.0) {
            return Err(ConfigError::Invalid(
                "max_tick_seconds must be positive".into(),
            ));
        }
        let (low, high) = self.long_link_band;
        if !(low >= 0.0 && low <= high) {
            return Err(ConfigError::Invalid(format!(
                "long_link_band ({low}, {high}) is empty"
            )));
        }
        if self.max_active_packets == 0 || self.event_log_capacity == 0 {
            return Err(ConfigError::Invalid(
                "max_active_packets and event_log_capacity must be non-zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.long_link_probability) {
            return Err(ConfigError::Invalid(
                "long_link_probability must be within 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}
