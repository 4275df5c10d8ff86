//! Effect Chain management
//!
//! An ordered composition of effects: each enabled member transforms the
//! running sample in sequence, disabled members pass it through. Chain order
//! is fixed by construction. Execution is single-threaded and sequential;
//! each stage is cheap relative to the control-loop period.

use std::sync::Arc;

use tracing::debug;

use super::effect::Effect;
use crate::error::{Result, StompboxError};

/// Ordered sequence of shared effects.
///
/// The chain does not own its effects beyond the shared `Arc`: the same
/// instances stay reachable by whatever assembled the rig (e.g. to wire layer
/// selectors or toggle flags).
pub struct EffectChain {
    effects: Vec<Arc<dyn Effect>>,
}

impl EffectChain {
    /// Build a chain. The given order is the execution order.
    pub fn new(effects: Vec<Arc<dyn Effect>>) -> Self {
        Self { effects }
    }

    /// Run one sample through the chain.
    ///
    /// Folds left-to-right over enabled effects; an empty or all-disabled
    /// chain returns the input unchanged. A failing transform, or a stage
    /// emitting NaN/Inf, aborts the whole evaluation for this sample.
    pub fn apply_effects(&self, input: f32) -> Result<f32> {
        let mut signal = input;
        for effect in &self.effects {
            if !effect.is_enabled() {
                continue;
            }
            signal = effect.apply_effect(signal)?;
            if !signal.is_finite() {
                return Err(StompboxError::NonFiniteSignal {
                    effect_id: effect.id().to_string(),
                });
            }
        }
        Ok(signal)
    }

    /// Mark exactly one effect as selected (its knobs go live) and deselect
    /// every other member.
    pub fn select(&self, effect_id: &str) -> Result<()> {
        let target = self
            .effects
            .iter()
            .find(|e| e.id() == effect_id)
            .ok_or_else(|| StompboxError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })?;

        for effect in &self.effects {
            if effect.id() != effect_id {
                effect.set_selected(false);
            }
        }
        target.set_selected(true);
        debug!(effect = %target.display_name(), id = effect_id, "effect selected");
        Ok(())
    }

    /// Get a reference to an effect by ID
    pub fn get(&self, effect_id: &str) -> Option<&Arc<dyn Effect>> {
        self.effects.iter().find(|e| e.id() == effect_id)
    }

    /// Get the number of effects in the chain
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Iterate over effects in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Effect>> {
        self.effects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::effect::EffectInfo;
    use crate::impl_effect_common;
    use serde_json::{json, Value};

    /// Multiplies the signal by a fixed factor; enough structure to observe
    /// composition order and enable/disable behavior.
    struct Scale {
        info: EffectInfo,
        factor: f32,
    }

    impl Scale {
        fn new(factor: f32) -> Arc<Self> {
            Arc::new(Self {
                info: EffectInfo::new(),
                factor,
            })
        }
    }

    impl Effect for Scale {
        impl_effect_common!(Scale, "scale", "Scale");

        fn apply_effect(&self, input: f32) -> Result<f32> {
            Ok(input * self.factor)
        }

        fn params(&self) -> Value {
            json!({ "factor": self.factor })
        }

        fn set_param(&self, name: &str, _value: &Value) -> Result<()> {
            Err(StompboxError::UnknownParam {
                effect: "scale".to_string(),
                name: name.to_string(),
            })
        }
    }

    struct Exploding {
        info: EffectInfo,
    }

    impl Effect for Exploding {
        impl_effect_common!(Exploding, "exploding", "Exploding");

        fn apply_effect(&self, _input: f32) -> Result<f32> {
            Ok(f32::NAN)
        }

        fn params(&self) -> Value {
            json!({})
        }

        fn set_param(&self, name: &str, _value: &Value) -> Result<()> {
            Err(StompboxError::UnknownParam {
                effect: "exploding".to_string(),
                name: name.to_string(),
            })
        }
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = EffectChain::new(Vec::new());
        assert!(chain.is_empty());
        assert_eq!(chain.apply_effects(0.25).unwrap(), 0.25);
    }

    #[test]
    fn test_all_disabled_chain_is_identity() {
        let a = Scale::new(2.0);
        let b = Scale::new(3.0);
        a.set_enabled(false);
        b.set_enabled(false);
        let chain = EffectChain::new(vec![a, b]);
        assert_eq!(chain.apply_effects(0.5).unwrap(), 0.5);
    }

    #[test]
    fn test_chain_composes_in_order() {
        let chain = EffectChain::new(vec![Scale::new(2.0), Scale::new(3.0)]);
        assert_eq!(chain.apply_effects(1.5).unwrap(), 9.0);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_disabling_one_effect_removes_exactly_its_contribution() {
        let double = Scale::new(2.0);
        let triple = Scale::new(3.0);
        let chain = EffectChain::new(vec![Arc::clone(&double) as _, Arc::clone(&triple) as _]);

        assert_eq!(chain.apply_effects(1.0).unwrap(), 6.0);

        triple.set_enabled(false);
        assert_eq!(chain.apply_effects(1.0).unwrap(), 2.0);

        triple.set_enabled(true);
        double.set_enabled(false);
        assert_eq!(chain.apply_effects(1.0).unwrap(), 3.0);
    }

    #[test]
    fn test_non_finite_stage_aborts_chain() {
        let exploding = Arc::new(Exploding {
            info: EffectInfo::new(),
        });
        let id = exploding.id().to_string();
        let chain = EffectChain::new(vec![exploding as _, Scale::new(2.0) as _]);

        match chain.apply_effects(1.0) {
            Err(StompboxError::NonFiniteSignal { effect_id }) => assert_eq!(effect_id, id),
            other => panic!("expected NonFiniteSignal, got {other:?}"),
        }
    }

    #[test]
    fn test_select_is_exclusive() {
        let a = Scale::new(1.0);
        let b = Scale::new(1.0);
        let c = Scale::new(1.0);
        let chain = EffectChain::new(vec![
            Arc::clone(&a) as _,
            Arc::clone(&b) as _,
            Arc::clone(&c) as _,
        ]);

        chain.select(b.id()).unwrap();
        assert!(!a.is_selected() && b.is_selected() && !c.is_selected());

        chain.select(c.id()).unwrap();
        assert!(!a.is_selected() && !b.is_selected() && c.is_selected());
    }

    #[test]
    fn test_select_unknown_id_fails() {
        let chain = EffectChain::new(vec![Scale::new(1.0)]);
        assert!(matches!(
            chain.select("no-such-effect"),
            Err(StompboxError::EffectNotFound { .. })
        ));
    }

    #[test]
    fn test_get_by_id() {
        let a = Scale::new(2.0);
        let chain = EffectChain::new(vec![Arc::clone(&a) as _]);
        assert!(chain.get(a.id()).is_some());
        assert!(chain.get("missing").is_none());
    }
}
