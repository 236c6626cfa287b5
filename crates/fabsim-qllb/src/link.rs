//! Spine uplink modeled as an M/M/1 queueing resource.

use std::collections::VecDeque;

use rand_distr::Exp;
use serde::Serialize;

use fabsim_core::{cast, log_debug, Event, EventHandler, SimulationContext};

use crate::packet::Packet;
use crate::sink::PacketDelivered;

#[derive(Clone, Serialize)]
struct ServiceFinished {}

/// A single-server FIFO queue with exponential service time.
///
/// `put` admission is non-blocking and always succeeds; the in-system packet
/// count (queued plus in-service) is observable immediately after `put` and
/// is what queue-length telemetry reads. Packets are never dropped. A served
/// packet is delivered to the sink addressed by its `dst` field.
pub struct Link {
    service_dist: Exp<f64>,
    queue: VecDeque<Packet>,
    in_service: Option<Packet>,
    ctx: SimulationContext,
}

impl Link {
    /// Creates a new link with the specified service rate.
    ///
    /// Panics if the rate is not positive (checked earlier by config validation).
    pub fn new(rate: f64, ctx: SimulationContext) -> Self {
        assert!(rate > 0., "link service rate must be positive");
        Self {
            service_dist: Exp::new(rate).unwrap(),
            queue: VecDeque::new(),
            in_service: None,
            ctx,
        }
    }

    /// Admits a packet to the waiting queue, stamping its link entry time.
    pub fn put(&mut self, mut packet: Packet) {
        packet.link_entry = Some(self.ctx.time());
        self.queue.push_back(packet);
        log_debug!(
            self.ctx,
            "packet {} enqueued (queue={})",
            self.queue.back().unwrap().id,
            self.queue_length()
        );
        if self.in_service.is_none() {
            self.start_service();
        }
    }

    /// Returns the in-system packet count: queued plus in-service.
    pub fn queue_length(&self) -> usize {
        self.queue.len() + self.in_service.is_some() as usize
    }

    // Takes the head packet into service and schedules its completion.
    // The service duration is an exponential draw scaled by packet size.
    fn start_service(&mut self) {
        if let Some(packet) = self.queue.pop_front() {
            let service_time = self.ctx.sample_from_distribution(&self.service_dist) * (packet.size as f64 / 1000.);
            self.in_service = Some(packet);
            self.ctx.emit_self(ServiceFinished {}, service_time);
        }
    }
}

impl EventHandler for Link {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            ServiceFinished {} => {
                let mut packet = self.in_service.take().unwrap();
                packet.link_departure = Some(self.ctx.time());
                log_debug!(self.ctx, "packet {} sent to sink", packet.id);
                let dst = packet.dst;
                self.ctx.emit_now(PacketDelivered { packet }, dst);
                self.start_service();
            }
        })
    }
}
