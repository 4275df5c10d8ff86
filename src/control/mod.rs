//! Control surface: events, devices, layered routing and the poll loop.
//!
//! Everything the crate knows about physical controls goes through the
//! [`ControlDevice`] trait; the hardware transport itself lives outside.

mod device;
mod event;
mod layered;
mod poll;

pub use device::ControlDevice;
pub use event::{ControlEvent, ControlEventListener};
pub use layered::{LayerSelector, LayeredRouter};
pub use poll::{Bindings, Poller, POLL_INTERVAL};
