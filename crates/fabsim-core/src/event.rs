//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Unique event identifier, assigned in scheduling order.
///
/// Because identifiers grow monotonically, they double as the FIFO
/// tie-break between events scheduled at the same simulated time.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Payloads must be serializable (for logging) and downcastable to their
/// concrete type (for dispatch via the [`cast!`](crate::cast!) macro).
/// It is blanket-implemented for any serializable static type.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// A scheduled simulation event: time, sequence and payload.
pub struct Event {
    /// Unique identifier (also the submission sequence number).
    pub id: EventId,
    /// Simulated time at which the event fires.
    pub time: f64,
    /// Identifier of the component that produced the event.
    pub src: Id,
    /// Identifier of the component the event is delivered to.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted comparison so that BinaryHeap pops the earliest event first,
// with equal-time events ordered by ascending id (submission order).
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
