//! # g7231-codec: ITU-T G.723.1 Speech Decoder
//!
//! A bit-exact fixed-point implementation of the ITU-T G.723.1 dual-rate
//! speech decoder. Each 30 ms frame of compressed speech is converted
//! into 240 linear PCM samples (8 kHz, mono, signed 16-bit).
//!
//! ## Features
//!
//! - Both active bitrates: 6.3 kbit/s (MP-MLQ) and 5.3 kbit/s (ACELP)
//! - Silence Insertion Descriptor (SID) frames and comfort-noise
//!   generation for discontinuous transmission
//! - Frame-erasure concealment with 3-state attenuation and muting
//! - Pitch and formant post-filtering (switchable)
//! - Deterministic, saturation-safe fixed-point arithmetic throughout
//!
//! ## Usage
//!
//! ```rust
//! use g7231_codec::codecs::g723_1::G7231Decoder;
//! use g7231_codec::types::DecoderConfig;
//!
//! let mut decoder = G7231Decoder::new(DecoderConfig::default())?;
//!
//! // A 1-byte untransmitted frame keeps comfort noise running
//! let packet = [0x03u8];
//! let mut pcm = Vec::new();
//! let consumed = decoder.decode_frame(&packet, &mut pcm)?;
//!
//! assert_eq!(consumed, 1);
//! assert_eq!(pcm.len(), 240);
//! # Ok::<(), g7231_codec::error::CodecError>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`error::Result`]. A corrupted bitstream is not
//! an error: the decoder conceals the frame (or falls back to comfort
//! noise) and keeps producing output, as the recommendation requires.
//! Truncated packets are skipped with a logged warning.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codecs;
pub mod error;
pub mod types;

// Re-export commonly used types and traits
pub use codecs::g723_1::{FrameType, G7231Decoder, Rate};
pub use error::{CodecError, Result};
pub use types::{AudioDecoder, CodecInfo, DecoderConfig};

/// Version information for the codec library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the codec library
///
/// Installs a default tracing subscriber if none is set. Safe to call
/// multiple times.
pub fn init() {
    let _ = tracing_subscriber::fmt::try_init();
    tracing::info!("g7231-codec v{} initialized", VERSION);
}
