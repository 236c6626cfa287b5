//! Leaf-spine fabric simulation with queue-length-aware load balancing (QLLB).
//!
//! The crate models a two-tier data-center fabric: hosts attached to leaf
//! switches generate Poisson traffic, a QLLB controller picks the spine
//! uplink for every flow from live queue telemetry and per-flow QoS weights,
//! and each uplink is an M/M/1 single-server FIFO queue. A telemetry
//! collector accumulates queue, utilization, latency and loss histories and
//! derives the four run-level metrics (AQL, AL, PLR, CU).
//!
//! The simulation is driven by the event engine from `fabsim-core`; all
//! randomness flows through the engine's seeded generator, so runs with the
//! same configuration and seed produce identical results.

pub mod config;
pub mod controller;
pub mod experiment;
pub mod host;
pub mod link;
pub mod packet;
pub mod qos;
pub mod sink;
pub mod switch;
pub mod telemetry;
pub mod topology;

pub use config::{ConfigurationError, FabricConfig};
pub use controller::QllbController;
pub use experiment::{FabricExperiment, RunSummary};
pub use host::Host;
pub use link::Link;
pub use packet::Packet;
pub use qos::{QosClassifier, QosWeights, TrafficClass};
pub use sink::Sink;
pub use switch::LeafSwitch;
pub use telemetry::TelemetryCollector;
pub use topology::{FabricTopology, FlowStats, PortStats, TopologyView};
