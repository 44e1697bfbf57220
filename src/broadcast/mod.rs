//! Live distribution of derived metrics to observers.
//!
//! An observer subscribes through the [`Hub`], which opens the container's stats stream,
//! registers a delivery channel in the [`Registry`] and spawns a [`Relay`] task. The
//! observer consumes a [`MetricStream`]. Whichever side finishes first tears the
//! [`Session`] down exactly once: the registry entry is removed, the channel closes and
//! the stats stream is released.

mod hub;
mod registry;
mod relay;
mod session;

pub use hub::Hub;
pub use registry::{Registry, Subscriber, SubscriberHandle};
pub use relay::{Relay, SessionEnd};
pub use session::{MetricStream, Session};
