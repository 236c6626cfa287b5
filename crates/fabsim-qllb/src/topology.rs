//! Topology polling interface and its simulated implementation.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use crate::switch::LeafSwitch;

/// Byte counters of one switch port.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PortStats {
    /// Transmitted bytes since the previous poll.
    pub tx_bytes: u64,
}

/// Send/receive counters and measured latency of one flow.
#[derive(Clone, Debug, Serialize)]
pub struct FlowStats {
    /// Packets sent by the flow source.
    pub packets_sent: u64,
    /// Packets received at the flow destination.
    pub packets_received: u64,
    /// Measured flow latency in seconds.
    pub latency: f64,
}

/// Polling capability required from any collaborator providing live
/// queue/port/flow data: the simulated fabric here, or an SDN controller
/// adapter over real switches.
///
/// Ordered maps keep every observation deterministic across runs.
pub trait TopologyView {
    /// Current per-port queue lengths of a switch.
    fn queue_stats(&self, switch: &str) -> BTreeMap<usize, usize>;

    /// Current per-port byte counters of a switch.
    fn port_stats(&self, switch: &str) -> BTreeMap<usize, PortStats>;

    /// Current per-flow counters of a switch.
    fn flow_stats(&self, switch: &str) -> BTreeMap<String, FlowStats>;

    /// Installs a route for a flow on a switch. A no-op is permitted in pure
    /// simulation; a network-emulation backend would issue a FlowMod here.
    fn install_route(&mut self, switch: &str, flow: &str, port: usize);
}

/// [`TopologyView`] over the simulated leaf switches.
///
/// Queue lengths are read live from the spine links. The packet-level model
/// moves no real bytes and keeps no per-flow counters, so port and flow
/// stats are empty and route installation is a no-op.
#[derive(Default)]
pub struct FabricTopology {
    leaves: BTreeMap<String, Rc<LeafSwitch>>,
}

impl FabricTopology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a leaf switch.
    pub fn add_leaf(&mut self, leaf: Rc<LeafSwitch>) {
        self.leaves.insert(leaf.name().to_owned(), leaf);
    }

    /// Names of all registered switches.
    pub fn switch_names(&self) -> Vec<String> {
        self.leaves.keys().cloned().collect()
    }
}

impl TopologyView for FabricTopology {
    fn queue_stats(&self, switch: &str) -> BTreeMap<usize, usize> {
        self.leaves
            .get(switch)
            .map(|leaf| leaf.port_queue_lengths())
            .unwrap_or_default()
    }

    fn port_stats(&self, _switch: &str) -> BTreeMap<usize, PortStats> {
        BTreeMap::new()
    }

    fn flow_stats(&self, _switch: &str) -> BTreeMap<String, FlowStats> {
        BTreeMap::new()
    }

    fn install_route(&mut self, _switch: &str, _flow: &str, _port: usize) {}
}
