//! ITU-T G.723.1 dual-rate speech decoder.
//!
//! Implements the fixed-point decoding pipeline of the G.723.1
//! recommendation: bitstream unpacking, LSP inverse quantization and
//! interpolation, multipulse (6.3 kbit/s) and algebraic (5.3 kbit/s)
//! fixed-codebook excitation, 5-tap adaptive-codebook pitch prediction,
//! LP synthesis, pitch and formant post-filtering, frame-erasure
//! concealment and comfort-noise generation for silence periods.
//!
//! Every 30 ms frame decodes to 240 samples of 8 kHz mono signed 16-bit
//! PCM. Frame sizes on the wire are 24 bytes (active, 6.3 kbit/s),
//! 20 bytes (active, 5.3 kbit/s), 4 bytes (SID) and 1 byte
//! (untransmitted).

mod bitstream;
mod cng;
mod concealment;
mod constants;
mod decoder;
mod dsp;
mod excitation;
mod filtering;
mod lsp;
mod postfilter;
mod tables;

pub use bitstream::{frame_size_for, FrameType, Rate};
pub use constants::FRAME_LEN;
pub use decoder::G7231Decoder;

/// Human-readable codec description.
pub fn codec_info() -> &'static str {
    "ITU-T G.723.1 - dual rate speech decoder (6.3/5.3 kbit/s) with CNG"
}
