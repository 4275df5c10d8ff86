//! The control-device capability consumed by the poll loop.
//!
//! The physical transport (I²C register reads against the encoder board)
//! lives outside this crate; the core only sees this trait. Tests drive it
//! with in-memory simulations.

use crate::error::DeviceError;

/// A polled rotary-encoder control with a push button.
///
/// All state reads are fallible with an explicit [`DeviceError`] channel so
/// "device absent" and "transient bus fault" are distinguishable from a
/// reading that is genuinely zero or false. Implementations must make
/// `delta(true)` an atomic read-and-clear: once it returns D, a subsequent
/// read returns only movement accumulated after the clear, never D again.
pub trait ControlDevice: Send + Sync {
    /// Whether the encoder's button is currently pressed.
    fn is_pressed(&self) -> Result<bool, DeviceError>;

    /// Whether the encoder has rotated since the delta was last cleared.
    fn has_moved(&self) -> Result<bool, DeviceError>;

    /// The accumulated rotation delta in detents. When `clear` is true the
    /// accumulator is zeroed as part of the same read.
    fn delta(&self, clear: bool) -> Result<i32, DeviceError>;

    /// Liveness probe. A disconnected device makes the poll loop skip the
    /// binding for the tick; it is not an error by itself.
    fn is_connected(&self) -> bool;
}
