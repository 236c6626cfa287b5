//! Queue-length-aware load-balancing controller.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use fabsim_core::{cast, log_debug, Event, EventHandler, Id, SimulationContext};

use crate::packet::Packet;
use crate::qos::QosClassifier;
use crate::sink::{PacketReceived, Sink};
use crate::switch::LeafSwitch;
use crate::telemetry::TelemetryCollector;
use crate::topology::TopologyView;

/// Guards the latency term of the utility against division by zero.
const UTILITY_EPS: f64 = 1e-6;

/// Request to route and forward a freshly generated packet.
///
/// Emitted by hosts; each request starts an independent controller process
/// for its flow.
#[derive(Clone, Serialize)]
pub struct DispatchRequest {
    /// The packet to dispatch.
    pub packet: Packet,
}

// Fires after the configured route-install delay (control-plane FlowMod latency).
#[derive(Clone, Serialize)]
struct RouteInstalled {
    packet: Packet,
    port: usize,
}

/// Routes each flow over the spine port with the highest utility
/// `U = w_Q * (1 - Q/qmax) + w_W * (1/(W+eps)) + w_R * R`, where `Q` is the
/// just-polled queue length of the port. `W` and `R` are fixed placeholders
/// (1.0): live per-flow latency/loss feedback is not wired into the
/// packet-level path, which makes the latency and reliability weights inert
/// here — a known limitation of the reference behavior, kept as an explicit
/// extension point rather than silently "fixed".
///
/// Per dispatched flow the controller runs a single linear sequence of
/// suspension points: route selection, the optional install delay, link
/// admission, and the wait for sink completion. There is no timeout on a
/// flow: one that never reaches its sink stalls its own process forever
/// without affecting others.
pub struct QllbController {
    ctx: SimulationContext,
    telemetry: Rc<RefCell<TelemetryCollector>>,
    topology: Rc<RefCell<dyn TopologyView>>,
    classifier: QosClassifier,
    sink: Rc<RefCell<Sink>>,
    host_leaf: HashMap<Id, Rc<LeafSwitch>>,
    qmax: f64,
    install_delay: f64,
    metrics: Vec<f64>,
}

impl QllbController {
    /// Creates a new controller.
    ///
    /// Panics if `qmax` is not positive (checked earlier by config validation).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: SimulationContext,
        telemetry: Rc<RefCell<TelemetryCollector>>,
        topology: Rc<RefCell<dyn TopologyView>>,
        classifier: QosClassifier,
        sink: Rc<RefCell<Sink>>,
        qmax: f64,
        install_delay: f64,
    ) -> Self {
        assert!(qmax > 0., "qmax must be positive");
        assert!(install_delay >= 0., "install delay must be non-negative");
        Self {
            ctx,
            telemetry,
            topology,
            classifier,
            sink,
            host_leaf: HashMap::new(),
            qmax,
            install_delay,
            metrics: Vec::new(),
        }
    }

    /// Binds a host to the leaf switch its traffic enters the fabric through.
    pub fn attach_host(&mut self, host: Id, leaf: Rc<LeafSwitch>) {
        self.host_leaf.insert(host, leaf);
    }

    /// Selects the outgoing port for a flow on the given leaf.
    ///
    /// Triggers a fresh queue-stats poll for the leaf, then scores ports
    /// `1..=N` in order under a strict `>` comparison, so ties resolve to
    /// the lowest port index. The queue term may go negative when the
    /// observed queue length exceeds `qmax`; the port with the highest
    /// overall utility still wins.
    pub fn select_route(&mut self, packet: &Packet, leaf: &LeafSwitch) -> usize {
        let queues = self.telemetry.borrow_mut().collect_queue_stats(leaf.name());
        let weights = self.classifier.get_weights(packet, &mut self.ctx);

        let mut best_port = 0;
        let mut best_utility = f64::NEG_INFINITY;
        for port in 1..=leaf.port_count() {
            let queue_len = queues.get(&port).copied().unwrap_or(0) as f64;
            let (w, r) = (1.0, 1.0); // placeholder latency/loss feedback
            let utility = weights.queue * (1. - queue_len / self.qmax)
                + weights.latency * (1. / (w + UTILITY_EPS))
                + weights.reliability * r;
            if utility > best_utility {
                best_utility = utility;
                best_port = port;
            }
        }
        best_port
    }

    /// Completed-flow latencies, in completion order.
    pub fn metrics(&self) -> &[f64] {
        &self.metrics
    }

    fn dispatch(&mut self, packet: Packet) {
        let leaf = self
            .host_leaf
            .get(&packet.src)
            .expect("dispatch from host not attached to any leaf")
            .clone();
        let port = self.select_route(&packet, &leaf);
        log_debug!(self.ctx, "selected port {} on {} for flow {}", port, leaf.name(), packet.id);
        self.topology.borrow_mut().install_route(leaf.name(), &packet.id, port);
        if self.install_delay > 0. {
            self.ctx.emit_self(RouteInstalled { packet, port }, self.install_delay);
        } else {
            self.forward(packet, port);
        }
    }

    fn forward(&mut self, packet: Packet, port: usize) {
        let leaf = self
            .host_leaf
            .get(&packet.src)
            .expect("dispatch from host not attached to any leaf")
            .clone();
        leaf.put(packet, port);
        // await the corresponding completion at the sink
        self.sink.borrow_mut().get(self.ctx.id());
    }

    fn complete(&mut self, packet: Packet) {
        let latency = packet.link_departure.unwrap() - packet.created;
        log_debug!(self.ctx, "flow {} completed, latency {:.6}", packet.id, latency);
        self.metrics.push(latency);
        self.telemetry.borrow_mut().record_latency(latency);
    }
}

impl EventHandler for QllbController {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            DispatchRequest { packet } => {
                self.dispatch(packet);
            }
            RouteInstalled { packet, port } => {
                self.forward(packet, port);
            }
            PacketReceived { packet } => {
                self.complete(packet);
            }
        })
    }
}
