//! Traffic classification and QoS weights.

use serde::Serialize;

use fabsim_core::SimulationContext;

use crate::packet::Packet;

/// Service class of a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TrafficClass {
    /// Latency-sensitive traffic.
    High,
    /// Balanced traffic.
    Medium,
    /// Queue/reliability-oriented traffic.
    Low,
}

/// Utility weights `(w_Q, w_W, w_R)` of a traffic class.
///
/// By convention the three weights sum to 1.0.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct QosWeights {
    /// Weight of the queue-occupancy term.
    pub queue: f64,
    /// Weight of the latency term.
    pub latency: f64,
    /// Weight of the reliability term.
    pub reliability: f64,
}

/// Assigns a service class to each flow and maps classes to fixed weights.
#[derive(Default)]
pub struct QosClassifier {}

impl QosClassifier {
    /// Creates a new classifier.
    pub fn new() -> Self {
        Self {}
    }

    /// Determines the class of a flow.
    ///
    /// The source policy draws the class uniformly at random: it is a
    /// placeholder for real flow-inspection logic, and any deterministic
    /// classification rule is a legitimate replacement. The draw comes from
    /// the simulation-wide generator so runs stay reproducible.
    pub fn classify(&self, _packet: &Packet, ctx: &mut SimulationContext) -> TrafficClass {
        match ctx.gen_range(0..3u32) {
            0 => TrafficClass::High,
            1 => TrafficClass::Medium,
            _ => TrafficClass::Low,
        }
    }

    /// Returns the fixed weight triple of a class.
    pub fn weights(&self, class: TrafficClass) -> QosWeights {
        match class {
            TrafficClass::High => QosWeights {
                queue: 0.2,
                latency: 0.6,
                reliability: 0.2,
            },
            TrafficClass::Medium => QosWeights {
                queue: 0.4,
                latency: 0.4,
                reliability: 0.2,
            },
            TrafficClass::Low => QosWeights {
                queue: 0.6,
                latency: 0.2,
                reliability: 0.2,
            },
        }
    }

    /// Classifies the flow and returns the weights of its class.
    pub fn get_weights(&self, packet: &Packet, ctx: &mut SimulationContext) -> QosWeights {
        let class = self.classify(packet, ctx);
        self.weights(class)
    }
}
