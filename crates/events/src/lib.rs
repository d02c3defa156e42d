//! Change notifications for the city catalog.
//!
//! Every committed catalog mutation is described by a domain event, wrapped in an
//! [`EventEnvelope`] carrying the city scope and a publication sequence number, and
//! fanned out through an [`EventBus`]. The store remains the source of truth; the bus is
//! for distribution only.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
