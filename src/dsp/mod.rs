//! DSP Effects Library
//!
//! The effect/parameter data model and the reference effects. All effects
//! implement the [`Effect`] trait and are composed by [`EffectChain`].

mod chain;
mod clean;
mod distortion;
mod effect;
mod params;

pub use chain::EffectChain;
pub use clean::Clean;
pub use distortion::{ClipMode, Distortion, DistortionParams, ParamTarget};
pub use effect::{Effect, EffectInfo};
pub use params::ParamCell;
