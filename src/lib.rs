//! Stompbox - control-routed real-time effect chain core
//!
//! Maps polled rotary-encoder controls to the parameters of a chain of
//! real-time audio effects and composes those effects into one
//! signal-processing pipeline.
//!
//! # Architecture
//!
//! Two cadences share each effect:
//! - a slow fixed-period poll loop ([`control::Poller`]) that turns device
//!   state into control events and mutates parameters through atomic
//!   snapshots ([`dsp::ParamCell`]);
//! - a fast signal path ([`dsp::EffectChain::apply_effects`]) that reads one
//!   consistent parameter snapshot per sample and never blocks on the
//!   control side.
//!
//! Scarce physical knobs address many logical parameters through
//! [`control::LayeredRouter`], which forwards every event to exactly the
//! active layer. The hardware transport itself stays outside the crate,
//! behind [`control::ControlDevice`].

pub mod control;
pub mod dsp;
pub mod error;

pub use error::{DeviceError, Result, StompboxError};
