//! Normative G.723.1 frame geometry and codebook dimensions.

/// Samples per 30 ms frame at 8 kHz
pub const FRAME_LEN: usize = 240;

/// Subframes per frame
pub const SUBFRAMES: usize = 4;

/// Samples per 7.5 ms subframe
pub const SUBFRAME_LEN: usize = 60;

/// Linear prediction order
pub const LPC_ORDER: usize = 10;

/// Minimum pitch lag in samples
pub const PITCH_MIN: usize = 18;

/// Maximum pitch lag in samples
pub const PITCH_MAX: usize = 146;

/// Taps in the adaptive-codebook pitch predictor
pub const PITCH_ORDER: usize = 5;

/// Pulse grid spacing of the fixed codebook
pub const GRID_SIZE: usize = 2;

/// Maximum fixed-codebook pulses per subframe
pub const PULSE_MAX: usize = 6;

/// Fixed-codebook gain quantizer levels
pub const GAIN_LEVELS: usize = 24;

/// LSP vector-quantizer bands
pub const LSP_BANDS: usize = 3;

/// Initial seed of the comfort-noise random generator
pub const CNG_RANDOM_SEED: i32 = 12345;
