//! Control events and the listener capability.
//!
//! Events are produced once per poll tick per device and dispatched
//! immediately; they are never queued or persisted.

use crate::error::Result;

/// A single control-surface event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// The encoder's push button was pressed.
    ButtonPressed,
    /// The encoder was turned by the accumulated number of detents since
    /// the last read-and-clear. Negative is counter-clockwise.
    EncoderTurned(i32),
}

/// Capability reacting to control events.
///
/// Implementations are stateless with respect to device identity; they close
/// over whichever parameter set they affect. Handlers return `Err` to report
/// a fault, which callers contain per-listener: one failing handler never
/// stops dispatch to other bindings.
pub trait ControlEventListener: Send {
    /// Called when the bound device reports a button press.
    fn on_button_pressed(&mut self) -> Result<()>;

    /// Called when the bound device reports rotation, with the delta read
    /// from the device at dispatch time.
    fn on_encoder_turned(&mut self, delta: i32) -> Result<()>;

    /// Fan a [`ControlEvent`] out to the matching handler.
    fn dispatch(&mut self, event: ControlEvent) -> Result<()> {
        match event {
            ControlEvent::ButtonPressed => self.on_button_pressed(),
            ControlEvent::EncoderTurned(delta) => self.on_encoder_turned(delta),
        }
    }
}
