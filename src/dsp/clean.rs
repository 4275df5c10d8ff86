//! Clean (bypass) effect.

use serde_json::{json, Value};

use super::effect::{Effect, EffectInfo};
use crate::error::{Result, StompboxError};
use crate::impl_effect_common;

/// Identity effect: passes every sample through unchanged.
///
/// Has no parameters and no control bindings, so it spawns no poll thread.
/// Useful as the neutral slot in a chain and as a baseline in tests.
#[derive(Debug, Default)]
pub struct Clean {
    info: EffectInfo,
}

impl Clean {
    pub fn new() -> Self {
        Self {
            info: EffectInfo::new(),
        }
    }
}

impl Effect for Clean {
    impl_effect_common!(Clean, "clean", "Clean");

    fn apply_effect(&self, input: f32) -> Result<f32> {
        Ok(input)
    }

    fn params(&self) -> Value {
        json!({ "enabled": self.is_enabled() })
    }

    fn set_param(&self, name: &str, value: &Value) -> Result<()> {
        match name {
            "enabled" => {
                let v = value.as_bool().ok_or_else(|| StompboxError::InvalidParamValue {
                    name: name.to_string(),
                    reason: format!("expected bool, got {value:?}"),
                })?;
                self.set_enabled(v);
                Ok(())
            }
            _ => Err(StompboxError::UnknownParam {
                effect: "clean".to_string(),
                name: name.to_string(),
            }),
        }
    }
}
