//! Layered control routing.
//!
//! Physical controls are scarce relative to logical parameters. A
//! [`LayeredRouter`] multiplexes one control's events over several listeners:
//! every event goes to exactly the active layer, and advancing/retreating the
//! active layer cycles through them. Inactive layers never observe events;
//! nothing is buffered or replayed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::control::event::ControlEventListener;
use crate::error::{Result, StompboxError};

/// Cloneable handle selecting the active layer of a [`LayeredRouter`].
///
/// Layer switches are rare relative to dispatch, so a single atomic index is
/// enough: switches serialize against dispatch and dispatchers always see the
/// latest committed layer. Typically cloned out of the router and wired to a
/// dedicated button's listener by the integrator.
#[derive(Debug, Clone)]
pub struct LayerSelector {
    active: Arc<AtomicUsize>,
    count: usize,
}

impl LayerSelector {
    fn new(count: usize) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            count,
        }
    }

    /// Number of layers. Fixed at router construction, always >= 1.
    pub fn layer_count(&self) -> usize {
        self.count
    }

    /// Index of the currently active layer, always in `[0, layer_count)`.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Cycle forward to the next layer, wrapping at the end.
    pub fn advance(&self) {
        self.step(1);
    }

    /// Cycle back to the previous layer, wrapping at the start.
    pub fn retreat(&self) {
        // +count-1 keeps the modular arithmetic in unsigned range
        self.step(self.count - 1);
    }

    fn step(&self, by: usize) {
        let count = self.count;
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some((cur + by) % count)
            })
            .ok();
    }
}

/// Routes every incoming control event to exactly one of its layers.
///
/// The layer stack is fixed after construction (length >= 1). Dispatch never
/// fails: a fault inside the active layer's handler is logged and confined to
/// that handler, leaving the active-layer state and the other layers
/// untouched.
pub struct LayeredRouter {
    layers: Vec<Box<dyn ControlEventListener>>,
    selector: LayerSelector,
}

impl LayeredRouter {
    /// Build a router over the given listener layers.
    ///
    /// Returns [`StompboxError::EmptyLayerStack`] for an empty stack; a
    /// router with nothing to route to is a configuration error.
    pub fn new(layers: Vec<Box<dyn ControlEventListener>>) -> Result<Self> {
        if layers.is_empty() {
            return Err(StompboxError::EmptyLayerStack);
        }
        let selector = LayerSelector::new(layers.len());
        Ok(Self { layers, selector })
    }

    /// Handle to switch the active layer, safe to use from any thread.
    pub fn selector(&self) -> LayerSelector {
        self.selector.clone()
    }

    fn forward<F>(&mut self, what: &'static str, f: F)
    where
        F: FnOnce(&mut dyn ControlEventListener) -> Result<()>,
    {
        let layer = self.selector.active();
        if let Err(error) = f(self.layers[layer].as_mut()) {
            warn!(layer, %error, "layer {what} handler failed; event dropped");
        }
    }
}

impl ControlEventListener for LayeredRouter {
    fn on_button_pressed(&mut self) -> Result<()> {
        self.forward("button", |l| l.on_button_pressed());
        Ok(())
    }

    fn on_encoder_turned(&mut self, delta: i32) -> Result<()> {
        self.forward("encoder", |l| l.on_encoder_turned(delta));
        Ok(())
    }
}
