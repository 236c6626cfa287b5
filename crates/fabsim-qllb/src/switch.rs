//! Leaf switch: a stateless forwarding shim over its spine uplinks.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::link::Link;
use crate::packet::Packet;

/// A leaf switch with an ordered list of reachable spine links.
///
/// Ports are numbered `1..=N` by link position. The switch carries no state
/// beyond this static mapping.
pub struct LeafSwitch {
    name: String,
    links: Vec<Rc<RefCell<Link>>>,
}

impl LeafSwitch {
    /// Creates a new leaf switch over the given links.
    ///
    /// Panics if the link list is empty.
    pub fn new(name: String, links: Vec<Rc<RefCell<Link>>>) -> Self {
        assert!(!links.is_empty(), "leaf switch must have at least one uplink");
        Self { name, links }
    }

    /// Returns the switch name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of uplink ports.
    pub fn port_count(&self) -> usize {
        self.links.len()
    }

    /// Forwards a packet to the link behind the given port (pure delegation).
    ///
    /// Panics if the port is outside `1..=N`.
    pub fn put(&self, packet: Packet, port: usize) {
        assert!(
            (1..=self.links.len()).contains(&port),
            "port {} out of range 1..={}",
            port,
            self.links.len()
        );
        self.links[port - 1].borrow_mut().put(packet);
    }

    /// Current per-port queue lengths, keyed by port number.
    pub fn port_queue_lengths(&self) -> BTreeMap<usize, usize> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, link)| (i + 1, link.borrow().queue_length()))
            .collect()
    }
}
