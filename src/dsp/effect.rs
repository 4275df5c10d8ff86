//! Effect trait definition
//!
//! Base trait for every unit of the signal chain.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::error::Result;

/// State common to all effects, shared between the effect and its poll
/// thread as `Arc<EffectInfo>`.
///
/// `enabled` gates participation in chain execution; `selected` gates whether
/// the effect's poll loop dispatches control events. The two are independent:
/// an effect can be audible while another effect's knobs are live, and vice
/// versa.
#[derive(Debug)]
pub struct EffectInfo {
    id: String,
    enabled: AtomicBool,
    selected: AtomicBool,
}

impl EffectInfo {
    /// Fresh instance state: enabled, not selected, random UUID id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enabled: AtomicBool::new(true),
            selected: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_selected(&self) -> bool {
        self.selected.load(Ordering::Acquire)
    }

    pub fn set_selected(&self, selected: bool) {
        self.selected.store(selected, Ordering::Release);
    }
}

impl Default for EffectInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Base trait for all signal-chain effects.
///
/// Effects are shared as `Arc<dyn Effect>` between the chain, the integrator
/// and their own poll thread, so every method takes `&self`; mutable state
/// lives behind atomics or [`ParamCell`](crate::dsp::ParamCell).
pub trait Effect: Send + Sync {
    /// Transform one sample. Pure with respect to everything except the
    /// current parameter snapshot: no side effects, safe to call while the
    /// poll loop is mutating parameters, and it must never block on the
    /// control path.
    fn apply_effect(&self, input: f32) -> Result<f32>;

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Get the unique instance ID
    fn id(&self) -> &str;

    /// Check if effect participates in chain execution
    fn is_enabled(&self) -> bool;

    /// Enable or disable the effect in the chain
    fn set_enabled(&self, enabled: bool);

    /// Check if this effect's control bindings are live
    fn is_selected(&self) -> bool;

    /// Select or deselect this effect's control bindings
    fn set_selected(&self, selected: bool);

    /// Get all parameters as JSON (for UI/integrator introspection)
    fn params(&self) -> Value;

    /// Set a single parameter by name.
    ///
    /// This is the fail-fast configuration surface: unknown names, wrong
    /// value types and unknown mode tags are errors, never silent defaults.
    fn set_param(&self, name: &str, value: &Value) -> Result<()>;
}

/// Helper macro to implement common Effect trait methods
#[macro_export]
macro_rules! impl_effect_common {
    ($type:ty, $effect_type:expr, $display_name:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn id(&self) -> &str {
            self.info.id()
        }

        fn is_enabled(&self) -> bool {
            self.info.is_enabled()
        }

        fn set_enabled(&self, enabled: bool) {
            self.info.set_enabled(enabled);
        }

        fn is_selected(&self) -> bool {
            self.info.is_selected()
        }

        fn set_selected(&self, selected: bool) {
            self.info.set_selected(selected);
        }
    };
}
