//! The fixed-period poll loop turning device state into dispatched events.
//!
//! Each effect with control bindings owns one [`Poller`]. The poll cadence
//! (reference 100 ms) is orders of magnitude slower than the signal path, so
//! the loop runs on its own thread and only ever touches parameters through
//! atomic publication. Transport faults downgrade the affected binding's tick
//! to a no-event no-op; they are logged, never propagated.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use tracing::warn;

use crate::control::device::ControlDevice;
use crate::control::event::{ControlEvent, ControlEventListener};
use crate::dsp::EffectInfo;

/// Reference polling period for control surfaces.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Binding {
    device: Arc<dyn ControlDevice>,
    listener: Box<dyn ControlEventListener>,
}

/// Ordered device-to-listener bindings for one effect.
///
/// Built up before the poll thread is spawned; the set is fixed once polling
/// starts (effects are constructed with their bindings and never rebound at
/// runtime).
#[derive(Default)]
pub struct Bindings {
    bindings: Vec<Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one device to one listener. Rebinding the same device (by `Arc`
    /// identity) replaces its prior listener.
    pub fn bind(&mut self, device: Arc<dyn ControlDevice>, listener: Box<dyn ControlEventListener>) {
        if let Some(existing) = self
            .bindings
            .iter_mut()
            .find(|b| Arc::ptr_eq(&b.device, &device))
        {
            existing.listener = listener;
        } else {
            self.bindings.push(Binding { device, listener });
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// One poll tick: read every bound device and dispatch the resulting
    /// events. Device faults and listener faults are contained per-binding.
    fn tick(&mut self) {
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            if !binding.device.is_connected() {
                warn!(binding = index, "control device disconnected; skipping tick");
                continue;
            }

            match binding.device.is_pressed() {
                Ok(true) => {
                    if let Err(error) = binding.listener.dispatch(ControlEvent::ButtonPressed) {
                        warn!(binding = index, %error, "button listener failed");
                    }
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(binding = index, %error, "button read failed; skipping binding");
                    continue;
                }
            }

            match binding.device.has_moved() {
                Ok(true) => {
                    // Read-and-clear is atomic on the device side; whatever
                    // delta comes back is the one dispatched.
                    match binding.device.delta(true) {
                        Ok(delta) => {
                            if let Err(error) =
                                binding.listener.dispatch(ControlEvent::EncoderTurned(delta))
                            {
                                warn!(binding = index, %error, "encoder listener failed");
                            }
                        }
                        Err(error) => {
                            warn!(binding = index, %error, "delta read failed; event dropped")
                        }
                    }
                }
                Ok(false) => {}
                Err(error) => warn!(binding = index, %error, "movement read failed"),
            }
        }
    }
}

/// Owns the poll thread for one effect and cancels it on drop.
///
/// The zero-capacity stop channel doubles as the timer: `recv_timeout` is the
/// fixed-period wait, and a send (or the sender dropping) wakes the thread
/// immediately for shutdown, so teardown never waits out a full period.
pub struct Poller {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the poll thread. Each period, if the owning effect is selected,
    /// one [`Bindings::tick`] runs; when unselected the tick is skipped
    /// entirely: no reads, no delta clears, nothing queued for replay.
    pub fn spawn(state: Arc<EffectInfo>, mut bindings: Bindings, period: Duration) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(format!("poll-{}", state.id()))
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if state.is_selected() {
                            bindings.tick();
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .expect("failed to spawn poll thread");

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Dropping the sender disconnects the channel; the explicit send
        // just wakes the thread without waiting for the next timeout.
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
