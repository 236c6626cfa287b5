//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
///
/// A component implementing this trait is registered in the simulation via
/// [`Simulation::add_handler`](crate::Simulation::add_handler) and receives
/// all events destined to it, one at a time, in simulated-time order.
pub trait EventHandler {
    /// Processes the event.
    fn on(&mut self, event: Event);
}

/// Enables the use of pattern matching syntax for processing different types of events
/// by downcasting the event payload from [`EventData`](crate::event::EventData) to user-defined types.
///
/// Match arms need not be exhaustive. However, if the event payload does not match any of the
/// specified arms, the macro will log the event as unhandled under the `ERROR` level.
///
/// # Examples
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use serde::Serialize;
/// use fabsim_core::{cast, Event, EventHandler, Simulation, SimulationContext};
///
/// #[derive(Clone, Serialize)]
/// pub struct SomeEvent {
///     value: u32,
/// }
///
/// pub struct Component {
///     state: u32,
///     ctx: SimulationContext,
/// }
///
/// impl EventHandler for Component {
///     fn on(&mut self, event: Event) {
///         cast!(match event.data {
///             SomeEvent { value } => {
///                 self.state = value;
///             }
///         })
///     }
/// }
///
/// let mut sim = Simulation::new(123);
/// let mut client_ctx = sim.create_context("client");
/// let comp_ctx = sim.create_context("comp");
/// let comp = Rc::new(RefCell::new(Component { state: 0, ctx: comp_ctx }));
/// let comp_id = sim.add_handler("comp", comp.clone());
/// client_ctx.emit(SomeEvent { value: 16 }, comp_id, 1.2);
/// sim.step_until_no_events();
/// assert_eq!(comp.borrow().state, 16);
/// ```
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}
