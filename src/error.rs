//! Error handling for stompbox.
//!
//! Faults fall into three classes with different propagation rules:
//! transport faults (recovered locally by the poll loop), configuration
//! errors (fatal at construction or `set_param`), and listener faults
//! (contained per-binding). Nothing here may ever reach the audio path
//! as a panic or a block.

use thiserror::Error;

/// Result type alias for stompbox operations
pub type Result<T> = std::result::Result<T, StompboxError>;

/// Transport-level fault reported by a [`ControlDevice`](crate::control::ControlDevice).
///
/// Distinguishes "device absent" from "transient bus fault"; a reading that
/// is genuinely zero is an `Ok(0)`, never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device not connected")]
    NotConnected,

    #[error("bus fault: {reason}")]
    Bus { reason: String },
}

/// Main error type for stompbox operations
#[derive(Error, Debug)]
pub enum StompboxError {
    // Transport faults
    #[error("control device fault: {0}")]
    Device(#[from] DeviceError),

    // Configuration errors
    #[error("unknown clipping mode: {mode} (expected 'soft' or 'hard')")]
    UnknownClipMode { mode: String },

    #[error("unknown parameter '{name}' for effect {effect}")]
    UnknownParam { effect: String, name: String },

    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParamValue { name: String, reason: String },

    #[error("layered router requires at least one layer")]
    EmptyLayerStack,

    // Chain errors
    #[error("effect not found in chain: {effect_id}")]
    EffectNotFound { effect_id: String },

    #[error("effect produced non-finite output (NaN/Inf): {effect_id}")]
    NonFiniteSignal { effect_id: String },

    // Listener faults
    #[error("control listener failed: {reason}")]
    Listener { reason: String },
}

impl StompboxError {
    /// Whether the fault is recovered locally (logged and skipped for the
    /// tick) rather than surfaced to the assembler.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StompboxError::Device(_) | StompboxError::Listener { .. }
        )
    }
}
