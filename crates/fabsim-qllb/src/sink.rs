//! Terminal collection point for completed packets.

use std::collections::VecDeque;

use serde::Serialize;

use fabsim_core::{cast, Event, EventHandler, Id, SimulationContext};

/// Event carrying a served packet from a link to its destination sink.
#[derive(Clone, Serialize)]
pub struct PacketDelivered {
    /// The served packet, with both link timestamps set.
    pub packet: crate::packet::Packet,
}

/// Event delivering a completed packet to a waiting getter.
#[derive(Clone, Serialize)]
pub struct PacketReceived {
    /// The completed packet, with both link timestamps set.
    pub packet: crate::packet::Packet,
}

/// A FIFO rendezvous queue between links and the controller.
///
/// `put` hands the packet off to the oldest registered waiter, or appends it
/// to the backlog when nobody is waiting. `get` returns the backlog head
/// immediately, or registers the requester as a waiter to be resumed by a
/// later `put`. Both sides preserve FIFO order. Links address the sink by
/// component id, so it must be registered as the handler of that id.
pub struct Sink {
    ctx: SimulationContext,
    backlog: VecDeque<crate::packet::Packet>,
    waiters: VecDeque<Id>,
}

impl Sink {
    /// Creates a new empty sink.
    pub fn new(ctx: SimulationContext) -> Self {
        Self {
            ctx,
            backlog: VecDeque::new(),
            waiters: VecDeque::new(),
        }
    }

    /// Returns the sink component id.
    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Delivers a completed packet, resuming the oldest waiter if any.
    pub fn put(&mut self, packet: crate::packet::Packet) {
        if let Some(waiter) = self.waiters.pop_front() {
            self.ctx.emit(PacketReceived { packet }, waiter, 0.);
        } else {
            self.backlog.push_back(packet);
        }
    }

    /// Requests one packet: resumes `requester` immediately if the backlog is
    /// non-empty, otherwise suspends it until the next delivery.
    pub fn get(&mut self, requester: Id) {
        if let Some(packet) = self.backlog.pop_front() {
            self.ctx.emit(PacketReceived { packet }, requester, 0.);
        } else {
            self.waiters.push_back(requester);
        }
    }

    /// Number of delivered packets not yet claimed by a getter.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Number of getters waiting for a delivery.
    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }
}

impl EventHandler for Sink {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            PacketDelivered { packet } => {
                self.put(packet);
            }
        })
    }
}
