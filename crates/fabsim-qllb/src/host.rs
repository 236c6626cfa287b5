//! Poisson traffic generator bound to one leaf switch.

use rand_distr::Exp;
use serde::Serialize;

use fabsim_core::{cast, log_debug, Event, EventHandler, Id, SimulationContext};

use crate::controller::DispatchRequest;
use crate::packet::Packet;

#[derive(Clone, Serialize)]
struct NextArrival {}

/// Generates exactly `count` packets with exponential inter-arrival delays
/// and uniformly distributed sizes, handing each one to the controller as an
/// independent concurrent process (fire-and-forget: the next arrival is
/// scheduled without waiting for the previous flow to complete).
pub struct Host {
    ctx: SimulationContext,
    controller: Id,
    sink: Id,
    interarrival_dist: Exp<f64>,
    count: u64,
    sent: u64,
    size_range: (u64, u64),
}

impl Host {
    /// Creates a new host.
    ///
    /// Panics if the flow rate is not positive (checked earlier by config validation).
    pub fn new(
        ctx: SimulationContext,
        controller: Id,
        sink: Id,
        flow_rate: f64,
        count: u64,
        size_range: (u64, u64),
    ) -> Self {
        assert!(flow_rate > 0., "host flow rate must be positive");
        Self {
            ctx,
            controller,
            sink,
            interarrival_dist: Exp::new(flow_rate).unwrap(),
            count,
            sent: 0,
            size_range,
        }
    }

    /// Schedules the first arrival. Does nothing if the packet budget is zero.
    pub fn start(&mut self) {
        if self.count > 0 {
            self.schedule_next_arrival();
        }
    }

    fn schedule_next_arrival(&mut self) {
        let delay = self.ctx.sample_from_distribution(&self.interarrival_dist);
        self.ctx.emit_self(NextArrival {}, delay);
    }

    fn generate(&mut self) {
        let (min_size, max_size) = self.size_range;
        let size = self.ctx.gen_range(min_size..=max_size);
        let packet = Packet::new(
            format!("{}-{}", self.ctx.name(), self.sent),
            self.ctx.id(),
            self.sink,
            size,
            self.ctx.time(),
        );
        log_debug!(self.ctx, "generated packet {} (size={}B)", packet.id, size);
        self.ctx.emit_now(DispatchRequest { packet }, self.controller);
        self.sent += 1;
        if self.sent < self.count {
            self.schedule_next_arrival();
        }
    }
}

impl EventHandler for Host {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            NextArrival {} => {
                self.generate();
            }
        })
    }
}
