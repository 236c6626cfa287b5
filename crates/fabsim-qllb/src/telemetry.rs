//! Telemetry collection and derived run-level metrics.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use crate::topology::{PortStats, TopologyView};

/// Assumed port capacity for utilization computation, 100 Mbit/s.
pub const PORT_CAPACITY_BPS: f64 = 1e8;

/// A polled port observation with derived utilization.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PortSample {
    /// Transmitted bytes reported by the switch.
    pub tx_bytes: u64,
    /// Utilization percentage over the sampling interval.
    pub utilization: f64,
}

/// A polled flow observation with derived packet loss.
#[derive(Clone, Debug, Serialize)]
pub struct FlowSample {
    /// Packets sent by the flow source.
    pub packets_sent: u64,
    /// Packets received at the flow destination.
    pub packets_received: u64,
    /// Measured flow latency in seconds.
    pub latency: f64,
    /// Loss percentage derived from the send/receive counters.
    pub packet_loss: f64,
}

/// Collects queue, port and flow telemetry from a [`TopologyView`] and keeps
/// append-only histories from which the four run-level metrics are derived:
/// average queue length (AQL), average latency (AL), packet loss rate (PLR)
/// and channel utilization (CU).
///
/// Latency samples arrive over two provenance paths: polled through
/// [`collect_flow_stats`](Self::collect_flow_stats) on topologies with flow
/// counters, and pushed via [`record_latency`](Self::record_latency) by the
/// controller after each simulated flow completes. The packet-level fabric
/// exercises only the pushed path; both are part of the contract.
pub struct TelemetryCollector {
    topology: Rc<RefCell<dyn TopologyView>>,
    sample_interval: f64,

    // Latest raw snapshots per switch.
    queue_stats: BTreeMap<String, BTreeMap<usize, usize>>,
    port_stats: BTreeMap<String, BTreeMap<usize, PortSample>>,
    flow_stats: BTreeMap<String, BTreeMap<String, FlowSample>>,

    // Histories for derived metrics, append-only for the run's lifetime.
    queue_history: BTreeMap<String, Vec<f64>>,
    util_history: BTreeMap<String, Vec<f64>>,
    latency_samples: Vec<f64>,
    loss_samples: Vec<f64>,
}

impl TelemetryCollector {
    /// Creates a collector polling the given topology with the given
    /// sampling interval (seconds).
    pub fn new(topology: Rc<RefCell<dyn TopologyView>>, sample_interval: f64) -> Self {
        Self {
            topology,
            sample_interval,
            queue_stats: BTreeMap::new(),
            port_stats: BTreeMap::new(),
            flow_stats: BTreeMap::new(),
            queue_history: BTreeMap::new(),
            util_history: BTreeMap::new(),
            latency_samples: Vec::new(),
            loss_samples: Vec::new(),
        }
    }

    /// Polls current per-port queue lengths of a switch, stores the snapshot
    /// and appends the snapshot mean to the switch's queue history.
    pub fn collect_queue_stats(&mut self, switch: &str) -> BTreeMap<usize, usize> {
        let stats = self.topology.borrow().queue_stats(switch);
        if !stats.is_empty() {
            let avg = stats.values().sum::<usize>() as f64 / stats.len() as f64;
            self.queue_history.entry(switch.to_owned()).or_default().push(avg);
        }
        self.queue_stats.insert(switch.to_owned(), stats.clone());
        stats
    }

    /// Polls port byte counters of a switch, derives per-port utilization
    /// against [`PORT_CAPACITY_BPS`] and appends the mean to the switch's
    /// utilization history.
    pub fn collect_port_stats(&mut self, switch: &str) -> BTreeMap<usize, PortSample> {
        let stats = self.topology.borrow().port_stats(switch);
        let samples: BTreeMap<usize, PortSample> = stats
            .iter()
            .map(|(&port, &PortStats { tx_bytes })| {
                let utilization = (tx_bytes as f64 * 8.) / (self.sample_interval * PORT_CAPACITY_BPS) * 100.;
                (port, PortSample { tx_bytes, utilization })
            })
            .collect();
        if !samples.is_empty() {
            let avg = samples.values().map(|s| s.utilization).sum::<f64>() / samples.len() as f64;
            self.util_history.entry(switch.to_owned()).or_default().push(avg);
        }
        self.port_stats.insert(switch.to_owned(), samples.clone());
        samples
    }

    /// Polls flow counters of a switch, derives per-flow loss and appends
    /// the mean loss and mean latency samples.
    pub fn collect_flow_stats(&mut self, switch: &str) -> BTreeMap<String, FlowSample> {
        let stats = self.topology.borrow().flow_stats(switch);
        let samples: BTreeMap<String, FlowSample> = stats
            .into_iter()
            .map(|(flow, fs)| {
                let packet_loss = if fs.packets_sent > 0 {
                    (fs.packets_sent - fs.packets_received.min(fs.packets_sent)) as f64
                        / fs.packets_sent as f64
                        * 100.
                } else {
                    0.
                };
                (
                    flow,
                    FlowSample {
                        packets_sent: fs.packets_sent,
                        packets_received: fs.packets_received,
                        latency: fs.latency,
                        packet_loss,
                    },
                )
            })
            .collect();
        if !samples.is_empty() {
            let n = samples.len() as f64;
            self.loss_samples
                .push(samples.values().map(|s| s.packet_loss).sum::<f64>() / n);
            self.latency_samples
                .push(samples.values().map(|s| s.latency).sum::<f64>() / n);
        }
        self.flow_stats.insert(switch.to_owned(), samples.clone());
        samples
    }

    /// Polls all stats for every listed switch.
    pub fn collect_all(&mut self, switch_ids: &[String]) {
        for switch in switch_ids {
            self.collect_queue_stats(switch);
            self.collect_port_stats(switch);
            self.collect_flow_stats(switch);
        }
    }

    /// Appends one completed-flow latency sample (the pushed provenance path,
    /// used by the controller in the simulated fabric).
    pub fn record_latency(&mut self, latency: f64) {
        self.latency_samples.push(latency);
    }

    /// Latest queue-length snapshot of a switch, if it was ever polled.
    pub fn latest_queue_stats(&self, switch: &str) -> Option<&BTreeMap<usize, usize>> {
        self.queue_stats.get(switch)
    }

    /// Average Queue Length of a switch: the mean of its queue history, or
    /// `None` if the switch was never polled (never zero, to keep "no
    /// traffic yet" distinct from "empty queue").
    pub fn compute_aql(&self, switch: &str) -> Option<f64> {
        mean(self.queue_history.get(switch).map_or(&[][..], |h| h))
    }

    /// Average Latency across all recorded samples, or `None` if there are none.
    pub fn compute_al(&self) -> Option<f64> {
        mean(&self.latency_samples)
    }

    /// Packet Loss Rate (%) across all recorded samples, or `None` if there are none.
    pub fn compute_plr(&self) -> Option<f64> {
        mean(&self.loss_samples)
    }

    /// Average Channel Utilization (%) of a switch, or `None` if its
    /// utilization history is empty.
    pub fn compute_cu(&self, switch: &str) -> Option<f64> {
        mean(self.util_history.get(switch).map_or(&[][..], |h| h))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn mean_is_arithmetic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
