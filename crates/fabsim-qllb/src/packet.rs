//! Simulated traffic unit.

use serde::Serialize;

use fabsim_core::Id;

/// One simulated unit of traffic from a host to a sink.
///
/// Created by a [`Host`](crate::Host), stamped with link entry/departure
/// times by the serving [`Link`](crate::Link), and destroyed by the
/// controller once its end-to-end latency has been recorded.
#[derive(Clone, Serialize)]
pub struct Packet {
    /// Flow identifier, `<host>-<seq>`.
    pub id: String,
    /// Component id of the originating host.
    pub src: Id,
    /// Component id of the destination sink; the serving link delivers
    /// the packet there once service finishes.
    pub dst: Id,
    /// Payload size in bytes.
    pub size: u64,
    /// Creation (generation) time.
    pub created: f64,
    /// Time the packet was admitted to the serving link's queue.
    pub link_entry: Option<f64>,
    /// Time the packet finished service on the link.
    pub link_departure: Option<f64>,
}

impl Packet {
    /// Creates a new packet stamped with its creation time.
    pub fn new(id: String, src: Id, dst: Id, size: u64, created: f64) -> Self {
        Self {
            id,
            src,
            dst,
            size,
            created,
            link_entry: None,
            link_departure: None,
        }
    }
}
