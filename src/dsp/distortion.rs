//! Distortion Effect
//!
//! The reference control-bound effect: two rotary encoders drive five logical
//! parameters through layered routing, and the per-sample transform runs the
//! fixed stage order gain -> clipping -> tone shaping -> compression ->
//! output level. The transform is stateless between samples; everything it
//! reads comes from a single parameter snapshot taken at the start of the
//! call, so a concurrent knob turn can never produce a mixed pre/post
//! parameter set.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::control::{Bindings, ControlDevice, ControlEventListener, LayerSelector, LayeredRouter, Poller, POLL_INTERVAL};
use crate::dsp::effect::{Effect, EffectInfo};
use crate::dsp::params::ParamCell;
use crate::error::{Result, StompboxError};
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Fixed sample rate the tone filters are parameterized against.
const SAMPLE_RATE: f32 = 44_100.0;

/// Drive (pre-clipping gain) range
const MIN_DRIVE: f32 = 0.0;
const MAX_DRIVE: f32 = 10.0;

/// Output level range
const MIN_LEVEL: f32 = 0.0;
const MAX_LEVEL: f32 = 10.0;

/// Clipping threshold range (full-scale-ish integer amplitudes, matching the
/// encoder-counted parameter scale)
const MIN_CLIP_THRESHOLD: f32 = 1.0;
const MAX_CLIP_THRESHOLD: f32 = 32_767.0;

/// Tone filter frequency range in Hz
const MIN_FREQ_HZ: f32 = 20.0;
const MAX_FREQ_HZ: f32 = 20_000.0;

/// Compression threshold range
const MIN_COMP_THRESHOLD: f32 = 1.0;
const MAX_COMP_THRESHOLD: f32 = 32_767.0;

/// Compression ratio range (1 = no compression)
const MIN_COMP_RATIO: f32 = 1.0;
const MAX_COMP_RATIO: f32 = 20.0;

// ============================================================================
// Clipping mode
// ============================================================================

/// Clipping variants applied after the gain stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Saturating, continuous: `threshold * tanh(signal / threshold)`
    #[default]
    Soft,
    /// Clamp to `[-threshold, threshold]`, boundary inclusive
    Hard,
}

impl ClipMode {
    /// Parse a mode tag. Anything but `soft`/`hard` is a configuration
    /// error: a silently-wrong clipping mode is worse than a setup abort.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "soft" => Ok(ClipMode::Soft),
            "hard" => Ok(ClipMode::Hard),
            other => Err(StompboxError::UnknownClipMode {
                mode: other.to_string(),
            }),
        }
    }

    /// Get string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipMode::Soft => "soft",
            ClipMode::Hard => "hard",
        }
    }

    /// Get display name for the clipping mode
    pub fn display_name(&self) -> &'static str {
        match self {
            ClipMode::Soft => "Soft",
            ClipMode::Hard => "Hard",
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// The distortion parameter set, published atomically as one snapshot.
///
/// Mutated by encoder listeners on the poll thread (and by `set_param` at
/// assembly time); read once per sample by the transform. Every mutation path
/// goes through [`DistortionParams::clamped`], so stored values are always in
/// range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DistortionParams {
    /// Pre-clipping gain multiplier
    pub drive: f32,
    /// Post-compression output level multiplier
    pub level: f32,
    /// Clipping variant
    pub clip_mode: ClipMode,
    /// Clipping threshold (amplitude units)
    pub clip_threshold: f32,
    /// Low-pass cutoff for the bass band, Hz
    pub bass_hz: f32,
    /// Band-pass center for the mid band, Hz (unity quality factor)
    pub mid_hz: f32,
    /// High-pass cutoff for the treble band, Hz
    pub treble_hz: f32,
    /// Compression threshold (amplitude units)
    pub comp_threshold: f32,
    /// Compression ratio; excess above the threshold is divided by this
    pub comp_ratio: f32,
}

impl Default for DistortionParams {
    fn default() -> Self {
        Self {
            drive: 1.0,
            level: 1.0,
            clip_mode: ClipMode::Soft,
            clip_threshold: 100.0,
            bass_hz: 250.0,
            mid_hz: 1_000.0,
            treble_hz: 4_000.0,
            comp_threshold: 80.0,
            comp_ratio: 4.0,
        }
    }
}

impl DistortionParams {
    /// Clamp every field to its documented range.
    pub fn clamped(mut self) -> Self {
        self.drive = self.drive.clamp(MIN_DRIVE, MAX_DRIVE);
        self.level = self.level.clamp(MIN_LEVEL, MAX_LEVEL);
        self.clip_threshold = self.clip_threshold.clamp(MIN_CLIP_THRESHOLD, MAX_CLIP_THRESHOLD);
        self.bass_hz = self.bass_hz.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ);
        self.mid_hz = self.mid_hz.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ);
        self.treble_hz = self.treble_hz.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ);
        self.comp_threshold = self.comp_threshold.clamp(MIN_COMP_THRESHOLD, MAX_COMP_THRESHOLD);
        self.comp_ratio = self.comp_ratio.clamp(MIN_COMP_RATIO, MAX_COMP_RATIO);
        self
    }

    /// Step one logical parameter by a signed amount, clamped.
    pub fn stepped(mut self, target: ParamTarget, amount: f32) -> Self {
        match target {
            ParamTarget::Drive => self.drive += amount,
            ParamTarget::Level => self.level += amount,
            ParamTarget::BassCutoff => self.bass_hz += amount,
            ParamTarget::MidCenter => self.mid_hz += amount,
            ParamTarget::TrebleCutoff => self.treble_hz += amount,
        }
        self.clamped()
    }
}

/// Logical parameters addressable by an encoder layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTarget {
    Drive,
    Level,
    BassCutoff,
    MidCenter,
    TrebleCutoff,
}

impl ParamTarget {
    /// Per-detent increment. Frequencies move in coarser steps than the
    /// unit-scale drive/level knobs.
    fn step(&self) -> f32 {
        match self {
            ParamTarget::Drive | ParamTarget::Level => 0.1,
            ParamTarget::BassCutoff => 10.0,
            ParamTarget::MidCenter => 50.0,
            ParamTarget::TrebleCutoff => 100.0,
        }
    }
}

// ============================================================================
// Transform stages
// ============================================================================

/// Saturating clip: continuous, output magnitude strictly below the
/// threshold for finite input, approaching it as the input grows.
#[inline]
fn soft_clip(signal: f32, threshold: f32) -> f32 {
    threshold * (signal / threshold).tanh()
}

/// Hard clip: clamp to `[-threshold, threshold]`, boundary inclusive.
#[inline]
fn hard_clip(signal: f32, threshold: f32) -> f32 {
    signal.clamp(-threshold, threshold)
}

/// First-order low-pass response factor at the fixed sample rate.
#[inline]
fn filter_alpha(freq_hz: f32) -> f32 {
    (-std::f32::consts::TAU * freq_hz / SAMPLE_RATE).exp()
}

/// Low-pass response for the bass band.
#[inline]
fn low_pass(signal: f32, cutoff_hz: f32) -> f32 {
    filter_alpha(cutoff_hz) * signal
}

/// Band-pass-like response for the mid band, unity quality factor.
#[inline]
fn band_pass(signal: f32, center_hz: f32) -> f32 {
    (1.0 - filter_alpha(center_hz)) * signal
}

/// High-pass response for the treble band: the signal minus its low-passed
/// part.
#[inline]
fn high_pass(signal: f32, cutoff_hz: f32) -> f32 {
    signal - low_pass(signal, cutoff_hz)
}

/// Three independent first-order bands, recombined additively. Not
/// phase-accurate; the sum is not renormalized and no clipping is reapplied
/// afterwards.
#[inline]
fn tone_shape(signal: f32, p: &DistortionParams) -> f32 {
    low_pass(signal, p.bass_hz) + band_pass(signal, p.mid_hz) + high_pass(signal, p.treble_hz)
}

/// Above the threshold, the excess is attenuated by `1/ratio`; at or below
/// it the signal passes through. Positive side only, no soft knee.
#[inline]
fn compress(signal: f32, threshold: f32, ratio: f32) -> f32 {
    if signal > threshold {
        threshold + (signal - threshold) / ratio
    } else {
        signal
    }
}

/// The full per-sample transform over one parameter snapshot.
fn transform(p: &DistortionParams, input: f32) -> f32 {
    let signal = input * p.drive;

    let signal = match p.clip_mode {
        ClipMode::Soft => soft_clip(signal, p.clip_threshold),
        ClipMode::Hard => hard_clip(signal, p.clip_threshold),
    };

    let signal = tone_shape(signal, p);
    let signal = compress(signal, p.comp_threshold, p.comp_ratio);

    signal * p.level
}

// ============================================================================
// Encoder listeners
// ============================================================================

/// Steps exactly one logical parameter by the encoder delta.
///
/// Holds a non-owning handle to the effect's parameter cell; the effect
/// itself stays the owner of its parameter set. Button presses are accepted
/// and ignored (reserved, e.g. for a future clip-mode toggle).
struct ParamStepListener {
    params: Arc<ParamCell<DistortionParams>>,
    target: ParamTarget,
    step: f32,
}

impl ParamStepListener {
    fn new(params: &Arc<ParamCell<DistortionParams>>, target: ParamTarget) -> Self {
        Self {
            params: Arc::clone(params),
            target,
            step: target.step(),
        }
    }
}

impl ControlEventListener for ParamStepListener {
    fn on_button_pressed(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_encoder_turned(&mut self, delta: i32) -> Result<()> {
        if delta != 0 {
            let target = self.target;
            let amount = delta as f32 * self.step;
            self.params.update(|p| p.stepped(target, amount));
        }
        Ok(())
    }
}

// ============================================================================
// Distortion Effect
// ============================================================================

/// Control-bound distortion effect.
///
/// # Parameters
/// - `drive`: pre-clipping gain (0.0 to 10.0)
/// - `level`: output level (0.0 to 10.0)
/// - `clip_mode` / `clip_threshold`: Soft (`threshold * tanh(x/threshold)`)
///   or Hard (clamp to `[-threshold, threshold]`)
/// - `bass_hz` / `mid_hz` / `treble_hz`: tone band frequencies (20 Hz to 20 kHz)
/// - `comp_threshold` / `comp_ratio`: compression knee and ratio
///
/// # Control wiring
/// The level encoder cycles over [drive, level]; the tone encoder cycles
/// over [bass, mid, treble]. Advancing the layers (e.g. from a dedicated
/// button) goes through the [`LayerSelector`] handles this effect exposes;
/// wiring them up is the integrator's job.
pub struct Distortion {
    info: Arc<EffectInfo>,
    params: Arc<ParamCell<DistortionParams>>,
    level_selector: Option<LayerSelector>,
    tone_selector: Option<LayerSelector>,
    // Kept for its Drop: cancels and joins the poll thread.
    _poller: Option<Poller>,
}

impl Distortion {
    /// Build a distortion bound to its two encoders, polling at the
    /// reference [`POLL_INTERVAL`].
    pub fn new(
        level_encoder: Arc<dyn ControlDevice>,
        tone_encoder: Arc<dyn ControlDevice>,
    ) -> Result<Self> {
        Self::with_period(level_encoder, tone_encoder, POLL_INTERVAL)
    }

    /// Like [`Distortion::new`] with an explicit poll period (tests use
    /// short ones).
    pub fn with_period(
        level_encoder: Arc<dyn ControlDevice>,
        tone_encoder: Arc<dyn ControlDevice>,
        period: Duration,
    ) -> Result<Self> {
        let info = Arc::new(EffectInfo::new());
        let params = Arc::new(ParamCell::new(DistortionParams::default()));

        let level_router = LayeredRouter::new(vec![
            Box::new(ParamStepListener::new(&params, ParamTarget::Drive)) as _,
            Box::new(ParamStepListener::new(&params, ParamTarget::Level)) as _,
        ])?;
        let tone_router = LayeredRouter::new(vec![
            Box::new(ParamStepListener::new(&params, ParamTarget::BassCutoff)) as _,
            Box::new(ParamStepListener::new(&params, ParamTarget::MidCenter)) as _,
            Box::new(ParamStepListener::new(&params, ParamTarget::TrebleCutoff)) as _,
        ])?;
        let level_selector = level_router.selector();
        let tone_selector = tone_router.selector();

        let mut bindings = Bindings::new();
        bindings.bind(level_encoder, Box::new(level_router));
        bindings.bind(tone_encoder, Box::new(tone_router));

        let poller = Poller::spawn(Arc::clone(&info), bindings, period);

        Ok(Self {
            info,
            params,
            level_selector: Some(level_selector),
            tone_selector: Some(tone_selector),
            _poller: Some(poller),
        })
    }

    /// A distortion with no control bindings and no poll thread; parameters
    /// move only through [`Effect::set_param`]. For signal-only rigs and
    /// tests.
    pub fn unbound() -> Self {
        Self {
            info: Arc::new(EffectInfo::new()),
            params: Arc::new(ParamCell::new(DistortionParams::default())),
            level_selector: None,
            tone_selector: None,
            _poller: None,
        }
    }

    /// Current parameter snapshot.
    pub fn params_snapshot(&self) -> DistortionParams {
        self.params.load()
    }

    /// Replace the whole parameter set (clamped).
    pub fn set_params(&self, params: DistortionParams) {
        self.params.store(params.clamped());
    }

    /// Layer handle for the level encoder ([drive, level]); `None` when
    /// built [`unbound`](Distortion::unbound).
    pub fn level_selector(&self) -> Option<&LayerSelector> {
        self.level_selector.as_ref()
    }

    /// Layer handle for the tone encoder ([bass, mid, treble]).
    pub fn tone_selector(&self) -> Option<&LayerSelector> {
        self.tone_selector.as_ref()
    }

    fn numeric(name: &str, value: &Value) -> Result<f32> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| StompboxError::InvalidParamValue {
                name: name.to_string(),
                reason: format!("expected number, got {value:?}"),
            })
    }
}

impl Effect for Distortion {
    impl_effect_common!(Distortion, "distortion", "Distortion");

    fn apply_effect(&self, input: f32) -> Result<f32> {
        // One snapshot per sample; every stage reads the same set.
        let p = self.params.load();
        Ok(transform(&p, input))
    }

    fn params(&self) -> Value {
        let p = self.params.load();
        json!({
            "drive": p.drive,
            "level": p.level,
            "clip_mode": p.clip_mode.as_str(),
            "clip_mode_display": p.clip_mode.display_name(),
            "clip_threshold": p.clip_threshold,
            "bass_hz": p.bass_hz,
            "mid_hz": p.mid_hz,
            "treble_hz": p.treble_hz,
            "comp_threshold": p.comp_threshold,
            "comp_ratio": p.comp_ratio,
            "enabled": self.is_enabled(),
        })
    }

    fn set_param(&self, name: &str, value: &Value) -> Result<()> {
        match name {
            "drive" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.drive = v;
                    p.clamped()
                });
                Ok(())
            }
            "level" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.level = v;
                    p.clamped()
                });
                Ok(())
            }
            "clip_mode" => {
                let tag = value.as_str().ok_or_else(|| StompboxError::InvalidParamValue {
                    name: name.to_string(),
                    reason: format!("expected string, got {value:?}"),
                })?;
                let mode = ClipMode::from_str(tag)?;
                self.params.update(|mut p| {
                    p.clip_mode = mode;
                    p
                });
                Ok(())
            }
            "clip_threshold" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.clip_threshold = v;
                    p.clamped()
                });
                Ok(())
            }
            "bass_hz" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.bass_hz = v;
                    p.clamped()
                });
                Ok(())
            }
            "mid_hz" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.mid_hz = v;
                    p.clamped()
                });
                Ok(())
            }
            "treble_hz" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.treble_hz = v;
                    p.clamped()
                });
                Ok(())
            }
            "comp_threshold" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.comp_threshold = v;
                    p.clamped()
                });
                Ok(())
            }
            "comp_ratio" => {
                let v = Self::numeric(name, value)?;
                self.params.update(|mut p| {
                    p.comp_ratio = v;
                    p.clamped()
                });
                Ok(())
            }
            "enabled" => {
                let v = value.as_bool().ok_or_else(|| StompboxError::InvalidParamValue {
                    name: name.to_string(),
                    reason: format!("expected bool, got {value:?}"),
                })?;
                self.set_enabled(v);
                Ok(())
            }
            _ => Err(StompboxError::UnknownParam {
                effect: "distortion".to_string(),
                name: name.to_string(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    // ========================================================================
    // ClipMode Tests
    // ========================================================================

    #[test]
    fn test_clip_mode_from_str() {
        assert_eq!(ClipMode::from_str("soft").unwrap(), ClipMode::Soft);
        assert_eq!(ClipMode::from_str("Hard").unwrap(), ClipMode::Hard);
        assert_eq!(ClipMode::from_str("SOFT").unwrap(), ClipMode::Soft);
    }

    #[test]
    fn test_clip_mode_unknown_tag_is_fatal() {
        assert!(matches!(
            ClipMode::from_str("medium"),
            Err(StompboxError::UnknownClipMode { mode }) if mode == "medium"
        ));
    }

    #[test]
    fn test_clip_mode_round_trip() {
        assert_eq!(ClipMode::Soft.as_str(), "soft");
        assert_eq!(ClipMode::Hard.as_str(), "hard");
        assert_eq!(ClipMode::Hard.display_name(), "Hard");
    }

    // ========================================================================
    // Stage Tests
    // ========================================================================

    #[test_case(150.0, 100.0; "positive overshoot")]
    #[test_case(-150.0, -100.0; "negative overshoot")]
    #[test_case(50.0, 50.0; "inside threshold")]
    #[test_case(100.0, 100.0; "boundary inclusive")]
    fn test_hard_clip(input: f32, expected: f32) {
        assert_eq!(hard_clip(input, 100.0), expected);
    }

    #[test]
    fn test_soft_clip_stays_strictly_below_threshold() {
        // Strict up to the point where f32 tanh rounds to 1.0 (|x| ~ 8.4);
        // beyond that the output equals the threshold exactly.
        for input in [1.0, 50.0, 100.0, 250.0, 800.0] {
            let out = soft_clip(input, 100.0);
            assert!(out < 100.0, "soft_clip({input}) = {out} not < 100");
            assert!(soft_clip(-input, 100.0) > -100.0);
        }
    }

    #[test]
    fn test_soft_clip_saturates_toward_threshold() {
        assert!(soft_clip(1.0e9, 100.0) > 99.999);
        // Near-linear for small signals
        assert_relative_eq!(soft_clip(1.0, 100.0), 1.0, epsilon = 1.0e-3);
    }

    #[test]
    fn test_soft_clip_is_odd() {
        assert_relative_eq!(soft_clip(-42.0, 100.0), -soft_clip(42.0, 100.0));
    }

    #[test]
    fn test_filter_alpha_in_unit_interval() {
        for freq in [MIN_FREQ_HZ, 250.0, 1_000.0, MAX_FREQ_HZ] {
            let alpha = filter_alpha(freq);
            assert!(alpha > 0.0 && alpha < 1.0, "alpha({freq}) = {alpha}");
        }
        // Higher cutoff leaks less through the low-pass
        assert!(filter_alpha(4_000.0) < filter_alpha(250.0));
    }

    #[test]
    fn test_low_pass_plus_high_pass_is_identity() {
        let x = 37.5;
        assert_relative_eq!(low_pass(x, 800.0) + high_pass(x, 800.0), x);
    }

    #[test]
    fn test_compress_below_threshold_passes_through() {
        assert_eq!(compress(79.0, 80.0, 4.0), 79.0);
        assert_eq!(compress(80.0, 80.0, 4.0), 80.0);
        assert_eq!(compress(-500.0, 80.0, 4.0), -500.0);
    }

    #[test]
    fn test_compress_attenuates_excess() {
        // 100 over the knee at ratio 4 leaves 25 over
        assert_relative_eq!(compress(180.0, 80.0, 4.0), 105.0);
    }

    // ========================================================================
    // Parameter Tests
    // ========================================================================

    #[test]
    fn test_default_params_are_in_range() {
        let p = DistortionParams::default();
        assert_eq!(p.clamped(), p);
    }

    #[test]
    fn test_clamped_pins_out_of_range_fields() {
        let p = DistortionParams {
            drive: -5.0,
            level: 99.0,
            bass_hz: 1.0,
            treble_hz: 1.0e6,
            comp_ratio: 0.0,
            ..DistortionParams::default()
        }
        .clamped();
        assert_eq!(p.drive, MIN_DRIVE);
        assert_eq!(p.level, MAX_LEVEL);
        assert_eq!(p.bass_hz, MIN_FREQ_HZ);
        assert_eq!(p.treble_hz, MAX_FREQ_HZ);
        assert_eq!(p.comp_ratio, MIN_COMP_RATIO);
    }

    #[test]
    fn test_stepped_moves_only_its_target() {
        let before = DistortionParams::default();
        let after = before.stepped(ParamTarget::Drive, 0.5);
        assert_relative_eq!(after.drive, before.drive + 0.5);
        assert_eq!(after.level, before.level);
        assert_eq!(after.bass_hz, before.bass_hz);

        let after = before.stepped(ParamTarget::MidCenter, -100.0);
        assert_relative_eq!(after.mid_hz, before.mid_hz - 100.0);
        assert_eq!(after.drive, before.drive);
    }

    #[test]
    fn test_stepped_clamps_at_bounds() {
        let p = DistortionParams::default().stepped(ParamTarget::Drive, 1.0e6);
        assert_eq!(p.drive, MAX_DRIVE);
        let p = p.stepped(ParamTarget::Drive, -1.0e6);
        assert_eq!(p.drive, MIN_DRIVE);
    }

    // ========================================================================
    // Listener Tests
    // ========================================================================

    #[test]
    fn test_listener_steps_its_parameter_by_delta() {
        let params = Arc::new(ParamCell::new(DistortionParams::default()));
        let mut listener = ParamStepListener::new(&params, ParamTarget::Drive);

        listener.on_encoder_turned(3).unwrap();
        assert_relative_eq!(params.load().drive, 1.0 + 3.0 * 0.1);

        listener.on_encoder_turned(-5).unwrap();
        assert_relative_eq!(params.load().drive, 1.0 - 2.0 * 0.1);
    }

    #[test]
    fn test_drive_and_level_listeners_move_different_fields() {
        let params = Arc::new(ParamCell::new(DistortionParams::default()));
        let mut drive = ParamStepListener::new(&params, ParamTarget::Drive);
        let mut level = ParamStepListener::new(&params, ParamTarget::Level);

        drive.on_encoder_turned(2).unwrap();
        level.on_encoder_turned(-2).unwrap();

        let p = params.load();
        assert_relative_eq!(p.drive, 1.2);
        assert_relative_eq!(p.level, 0.8);
    }

    #[test]
    fn test_listener_button_press_is_reserved_noop() {
        let params = Arc::new(ParamCell::new(DistortionParams::default()));
        let mut listener = ParamStepListener::new(&params, ParamTarget::Level);
        listener.on_button_pressed().unwrap();
        assert_eq!(params.load(), DistortionParams::default());
    }

    #[test]
    fn test_listener_zero_delta_is_noop() {
        let params = Arc::new(ParamCell::new(DistortionParams::default()));
        let mut listener = ParamStepListener::new(&params, ParamTarget::TrebleCutoff);
        listener.on_encoder_turned(0).unwrap();
        assert_eq!(params.load(), DistortionParams::default());
    }

    // ========================================================================
    // Transform Tests
    // ========================================================================

    fn hard_clip_only() -> DistortionParams {
        // Tone bands and compression configured to be inert enough to watch
        // the clipping stage: the transform output is the tone-shaped clip.
        DistortionParams {
            clip_mode: ClipMode::Hard,
            comp_threshold: MAX_COMP_THRESHOLD,
            ..DistortionParams::default()
        }
    }

    #[test]
    fn test_transform_hard_clip_boundaries() {
        let p = hard_clip_only();
        // Fold the tone stage out by comparing against it directly.
        let expect = |x: f32| tone_shape(hard_clip(x, p.clip_threshold), &p);
        assert_relative_eq!(transform(&p, 150.0), expect(150.0));
        assert_relative_eq!(transform(&p, -150.0), expect(-150.0));
        assert_relative_eq!(transform(&p, 50.0), expect(50.0));
        // Overshooting inputs saturate to the same post-clip value
        assert_relative_eq!(transform(&p, 150.0), transform(&p, 99_999.0));
    }

    #[test]
    fn test_transform_drive_scales_preclip_signal() {
        let p = DistortionParams {
            drive: 2.0,
            ..hard_clip_only()
        };
        let base = DistortionParams {
            drive: 1.0,
            ..hard_clip_only()
        };
        // Below the clip threshold the stages are linear in the input
        assert_relative_eq!(transform(&p, 10.0), transform(&base, 20.0));
    }

    #[test]
    fn test_transform_level_scales_output() {
        let loud = DistortionParams {
            level: 2.0,
            ..DistortionParams::default()
        };
        let base = DistortionParams::default();
        assert_relative_eq!(transform(&loud, 30.0), 2.0 * transform(&base, 30.0));
    }

    #[test]
    fn test_transform_is_finite_over_parameter_extremes() {
        let extremes = [
            DistortionParams::default(),
            DistortionParams {
                drive: MAX_DRIVE,
                level: MAX_LEVEL,
                clip_mode: ClipMode::Soft,
                clip_threshold: MAX_CLIP_THRESHOLD,
                ..DistortionParams::default()
            },
            DistortionParams {
                drive: MIN_DRIVE,
                comp_ratio: MAX_COMP_RATIO,
                ..DistortionParams::default()
            },
        ];
        for p in extremes {
            for input in [-32_768.0, -1.0, 0.0, 1.0, 32_767.0] {
                assert!(transform(&p, input).is_finite());
            }
        }
    }

    #[test]
    fn test_transform_zero_drive_silences() {
        let p = DistortionParams {
            drive: 0.0,
            ..DistortionParams::default()
        };
        assert_eq!(transform(&p, 1_000.0), 0.0);
    }

    // ========================================================================
    // Effect Surface Tests
    // ========================================================================

    #[test]
    fn test_apply_effect_uses_current_snapshot() {
        let dist = Distortion::unbound();
        let before = dist.apply_effect(50.0).unwrap();

        dist.set_param("drive", &json!(2.0)).unwrap();
        let after = dist.apply_effect(50.0).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_set_param_round_trips_through_params_json() {
        let dist = Distortion::unbound();
        dist.set_param("clip_mode", &json!("hard")).unwrap();
        dist.set_param("clip_threshold", &json!(200.0)).unwrap();
        dist.set_param("comp_ratio", &json!(8.0)).unwrap();

        let params = dist.params();
        assert_eq!(params["clip_mode"].as_str().unwrap(), "hard");
        assert_relative_eq!(params["clip_threshold"].as_f64().unwrap(), 200.0);
        assert_relative_eq!(params["comp_ratio"].as_f64().unwrap(), 8.0);
    }

    #[test]
    fn test_set_param_clamps() {
        let dist = Distortion::unbound();
        dist.set_param("drive", &json!(1.0e9)).unwrap();
        assert_eq!(dist.params_snapshot().drive, MAX_DRIVE);
    }

    #[test]
    fn test_set_param_rejects_unknown_clip_mode() {
        let dist = Distortion::unbound();
        let err = dist.set_param("clip_mode", &json!("fuzzy")).unwrap_err();
        assert!(matches!(err, StompboxError::UnknownClipMode { .. }));
        assert!(!err.is_recoverable());
        // Failed configuration leaves the mode untouched
        assert_eq!(dist.params_snapshot().clip_mode, ClipMode::Soft);
    }

    #[test]
    fn test_set_param_rejects_bad_types_and_names() {
        let dist = Distortion::unbound();
        assert!(matches!(
            dist.set_param("drive", &json!("loud")),
            Err(StompboxError::InvalidParamValue { .. })
        ));
        assert!(matches!(
            dist.set_param("resonance", &json!(1.0)),
            Err(StompboxError::UnknownParam { .. })
        ));
    }

    #[test]
    fn test_effect_identity() {
        let dist = Distortion::unbound();
        assert_eq!(dist.effect_type(), "distortion");
        assert_eq!(dist.display_name(), "Distortion");
        assert!(!dist.id().is_empty());
    }

    #[test]
    fn test_unbound_has_no_selectors() {
        let dist = Distortion::unbound();
        assert!(dist.level_selector().is_none());
        assert!(dist.tone_selector().is_none());
    }
}
