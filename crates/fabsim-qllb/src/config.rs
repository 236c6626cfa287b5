//! Run configuration and its validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed configuration, detected before the run starts.
///
/// This is the only error class in the system: the simulated core itself
/// has no I/O failures, no network faults and no partial failures, since
/// packets are never dropped and every resource operation eventually
/// succeeds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// The topology has no spine links or no leaf switches.
    #[error("empty topology: {0}")]
    EmptyTopology(&'static str),
    /// A rate or duration parameter that must be strictly positive is not.
    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The packet size range is zero or inverted.
    #[error("invalid packet size range [{min}, {max}] bytes")]
    InvalidPacketSizeRange {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },
    /// The route-install delay is negative.
    #[error("install delay must be non-negative, got {0}")]
    NegativeInstallDelay(f64),
}

/// Configuration of one simulated run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Number of spine links.
    pub spine_count: usize,
    /// Number of leaf switches. Every leaf reaches every spine link.
    pub leaf_count: usize,
    /// Hosts attached to each leaf. Zero is valid and yields a run with no
    /// traffic and undefined metrics.
    pub hosts_per_leaf: usize,
    /// Service rate of each spine link.
    pub link_rate: f64,
    /// Packet budget of each host: it generates exactly this many packets.
    pub flows_per_host: u64,
    /// Packet generation rate (lambda) of each host.
    pub flow_rate: f64,
    /// Inclusive packet size range in bytes.
    pub packet_size_range: (u64, u64),
    /// Queue-length normalization ceiling in the utility formula.
    pub qmax: f64,
    /// Fixed route-install delay (control-plane FlowMod latency); zero disables it.
    pub install_delay: f64,
    /// Telemetry sampling interval in seconds (used for utilization derivation).
    pub sample_interval: f64,
    /// Total simulated duration in seconds.
    pub sim_time: f64,
    /// Random seed; runs with identical configuration and seed are identical.
    pub seed: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            spine_count: 2,
            leaf_count: 4,
            hosts_per_leaf: 1,
            link_rate: 20.0,
            flows_per_host: 100,
            flow_rate: 5.0,
            packet_size_range: (500, 1500),
            qmax: 100.0,
            install_delay: 0.0,
            sample_interval: 0.2,
            sim_time: 10.0,
            seed: 42,
        }
    }
}

impl FabricConfig {
    /// Validates the configuration. Called at experiment construction, so a
    /// malformed configuration is rejected before the run starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.spine_count == 0 {
            return Err(ConfigurationError::EmptyTopology("no spine links"));
        }
        if self.leaf_count == 0 {
            return Err(ConfigurationError::EmptyTopology("no leaf switches"));
        }
        for (name, value) in [
            ("link_rate", self.link_rate),
            ("flow_rate", self.flow_rate),
            ("qmax", self.qmax),
            ("sample_interval", self.sample_interval),
            ("sim_time", self.sim_time),
        ] {
            if value <= 0. {
                return Err(ConfigurationError::NonPositiveParameter { name, value });
            }
        }
        let (min, max) = self.packet_size_range;
        if min == 0 || min > max {
            return Err(ConfigurationError::InvalidPacketSizeRange { min, max });
        }
        if self.install_delay < 0. {
            return Err(ConfigurationError::NegativeInstallDelay(self.install_delay));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(FabricConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_spines_is_empty_topology() {
        let config = FabricConfig {
            spine_count: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::EmptyTopology("no spine links"))
        );
    }

    #[test]
    fn zero_leaves_is_empty_topology() {
        let config = FabricConfig {
            leaf_count: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::EmptyTopology("no leaf switches"))
        );
    }

    #[test]
    fn non_positive_rates_are_rejected() {
        let config = FabricConfig {
            link_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::NonPositiveParameter { name: "link_rate", .. })
        ));

        let config = FabricConfig {
            flow_rate: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::NonPositiveParameter { name: "flow_rate", .. })
        ));
    }

    #[test]
    fn inverted_size_range_is_rejected() {
        let config = FabricConfig {
            packet_size_range: (1500, 500),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidPacketSizeRange { min: 1500, max: 500 })
        );
    }

    #[test]
    fn zero_hosts_is_valid() {
        let config = FabricConfig {
            hosts_per_leaf: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
