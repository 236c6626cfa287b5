//! Building and running one fabric simulation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use fabsim_core::{log_info, Simulation};

use crate::config::{ConfigurationError, FabricConfig};
use crate::controller::QllbController;
use crate::host::Host;
use crate::link::Link;
use crate::qos::QosClassifier;
use crate::sink::Sink;
use crate::switch::LeafSwitch;
use crate::telemetry::TelemetryCollector;
use crate::topology::{FabricTopology, TopologyView};

/// Final run-level metrics, consumable by an external export/plot collaborator.
///
/// All values derived from empty histories are reported as `None`
/// ("undefined"), never as zero. Per-switch maps are ordered, so serializing
/// the summary of two runs with identical configuration and seed yields
/// byte-identical output.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Mean end-to-end latency over completed flows.
    pub mean_latency: Option<f64>,
    /// 95th-percentile (nearest-rank) end-to-end latency over completed flows.
    pub p95_latency: Option<f64>,
    /// Average queue length per switch (AQL).
    pub average_queue_length: BTreeMap<String, Option<f64>>,
    /// Overall average latency from the telemetry collector (AL).
    pub average_latency: Option<f64>,
    /// Overall packet loss rate (PLR); undefined in the lossless core.
    pub packet_loss_rate: Option<f64>,
    /// Average channel utilization per switch (CU).
    pub channel_utilization: BTreeMap<String, Option<f64>>,
    /// Number of flows that completed within the simulated duration.
    pub completed_flows: usize,
}

/// One leaf-spine fabric experiment: validates the configuration at
/// construction, then builds, wires and runs the simulation on demand.
pub struct FabricExperiment {
    config: FabricConfig,
}

impl FabricExperiment {
    /// Creates an experiment, rejecting a malformed configuration.
    pub fn new(config: FabricConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the experiment configuration.
    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    /// Runs the simulation for the configured duration and returns the
    /// collected metrics.
    pub fn run(&self) -> RunSummary {
        let config = &self.config;
        let mut sim = Simulation::new(config.seed);

        let sink = Rc::new(RefCell::new(Sink::new(sim.create_context("sink"))));
        let sink_id = sim.add_handler("sink", sink.clone());

        let mut spines = Vec::new();
        for i in 0..config.spine_count {
            let name = format!("s{}", i + 1);
            let link = Rc::new(RefCell::new(Link::new(config.link_rate, sim.create_context(&name))));
            sim.add_handler(&name, link.clone());
            spines.push(link);
        }

        let topology = Rc::new(RefCell::new(FabricTopology::new()));
        let mut leaves = Vec::new();
        for i in 0..config.leaf_count {
            let leaf = Rc::new(LeafSwitch::new(format!("leaf{}", i + 1), spines.clone()));
            topology.borrow_mut().add_leaf(leaf.clone());
            leaves.push(leaf);
        }
        let switch_names = topology.borrow().switch_names();
        let view: Rc<RefCell<dyn TopologyView>> = topology;

        let telemetry = Rc::new(RefCell::new(TelemetryCollector::new(
            view.clone(),
            config.sample_interval,
        )));

        let controller = Rc::new(RefCell::new(QllbController::new(
            sim.create_context("controller"),
            telemetry.clone(),
            view,
            QosClassifier::new(),
            sink.clone(),
            config.qmax,
            config.install_delay,
        )));
        let controller_id = sim.add_handler("controller", controller.clone());

        let mut host_num = 0;
        for leaf in &leaves {
            for _ in 0..config.hosts_per_leaf {
                host_num += 1;
                let name = format!("h{}", host_num);
                let host = Rc::new(RefCell::new(Host::new(
                    sim.create_context(&name),
                    controller_id,
                    sink_id,
                    config.flow_rate,
                    config.flows_per_host,
                    config.packet_size_range,
                )));
                let host_id = sim.add_handler(&name, host.clone());
                controller.borrow_mut().attach_host(host_id, leaf.clone());
                host.borrow_mut().start();
            }
        }

        let root = sim.create_context("experiment");
        log_info!(
            root,
            "starting run: {} spines, {} leaves, {} hosts",
            config.spine_count,
            config.leaf_count,
            host_num
        );

        sim.step_for_duration(config.sim_time);

        let metrics = controller.borrow().metrics().to_vec();
        let telemetry = telemetry.borrow();
        let summary = RunSummary {
            mean_latency: mean(&metrics),
            p95_latency: percentile(&metrics, 0.95),
            average_queue_length: switch_names
                .iter()
                .map(|name| (name.clone(), telemetry.compute_aql(name)))
                .collect(),
            average_latency: telemetry.compute_al(),
            packet_loss_rate: telemetry.compute_plr(),
            channel_utilization: switch_names
                .iter()
                .map(|name| (name.clone(), telemetry.compute_cu(name)))
                .collect(),
            completed_flows: metrics.len(),
        };
        log_info!(root, "run finished: {} flows completed", summary.completed_flows);
        summary
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// Nearest-rank percentile over an unsorted sample.
fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((q * sorted.len() as f64).ceil() as usize).max(1);
    Some(sorted[rank - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_empty_is_none() {
        assert_eq!(percentile(&[], 0.95), None);
    }

    #[test]
    fn percentile_nearest_rank() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&values, 0.95), Some(95.0));
        assert_eq!(percentile(&values, 0.5), Some(50.0));
    }

    #[test]
    fn percentile_single_value() {
        assert_eq!(percentile(&[7.0], 0.95), Some(7.0));
    }
}
