//! Frame unpacking for the G.723.1 serialized bitstream.
//!
//! Bits are consumed LSB-first within each octet. The first two bits of
//! every frame select the frame type and, for active frames, the rate.
//! Forbidden pitch codes and out-of-range adaptive-codebook gains make
//! the frame invalid; the caller then conceals it instead of failing.

use crate::error::{CodecError, Result};

use super::constants::{GAIN_LEVELS, LSP_BANDS, PITCH_MIN, SUBFRAMES, SUBFRAME_LEN};
use super::tables::FRAME_SIZE;

/// Frame classification carried in the two info bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Active speech at the given rate
    Active(Rate),
    /// Silence Insertion Descriptor (comfort-noise parameters)
    Sid,
    /// Untransmitted frame; comfort noise continues
    Untransmitted,
}

impl FrameType {
    /// True for active speech frames at either rate.
    pub fn is_active(self) -> bool {
        matches!(self, FrameType::Active(_))
    }
}

/// Active-frame bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    /// 6.3 kbit/s (multipulse maximum-likelihood quantization)
    Rate6300,
    /// 5.3 kbit/s (algebraic codebook)
    Rate5300,
}

impl Rate {
    /// Table index used by the rate-dependent constants.
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Rate::Rate6300 => 0,
            Rate::Rate5300 => 1,
        }
    }
}

/// Size in bytes of a serialized frame starting with `first_byte`.
pub fn frame_size_for(first_byte: u8) -> usize {
    FRAME_SIZE[(first_byte & 3) as usize]
}

/// Decoded per-subframe parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subframe {
    /// Fine pitch-lag offset selector (0..=3, meaning -1..=+2)
    pub ad_cb_lag: usize,
    /// Adaptive-codebook gain index
    pub ad_cb_gain: usize,
    /// Dirac-train overlay flag (6.3 kbit/s, short lags only)
    pub dirac_train: bool,
    /// Pulse sign bitmap
    pub pulse_sign: i32,
    /// Pulse grid selector (even/odd positions)
    pub grid_index: usize,
    /// Fixed-codebook gain index
    pub amp_index: usize,
    /// Combined pulse-position index
    pub pulse_pos: i32,
}

/// All parameters carried by one frame, plus the frame classification.
///
/// The decoder keeps this struct across frames: comfort-noise generation
/// re-randomizes the subframe parameters in place between packets.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    /// Parsed frame type
    pub cur_frame_type: FrameType,
    /// Rate of the most recent active frame
    pub cur_rate: Rate,
    /// LSP vector-quantizer indices, one per band
    pub lsp_index: [usize; LSP_BANDS],
    /// Pitch lags for subframe pairs (0, 1) and (2, 3)
    pub pitch_lag: [usize; 2],
    /// Per-subframe excitation parameters
    pub subframe: [Subframe; 4],
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            cur_frame_type: FrameType::Untransmitted,
            cur_rate: Rate::Rate6300,
            lsp_index: [0; 3],
            pitch_lag: [0; 2],
            subframe: [Subframe::default(); 4],
        }
    }
}

/// LSB-first bit cursor over a frame payload.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read `n` bits (n <= 32); the first bit read becomes the LSB of
    /// the result. Reads past the end yield zero bits.
    pub fn get_bits(&mut self, n: u32) -> u32 {
        let mut value = 0u32;
        for i in 0..n {
            let bit_pos = self.pos + i as usize;
            let byte = self.data.get(bit_pos >> 3).copied().unwrap_or(0);
            let bit = (byte >> (bit_pos & 7)) & 1;
            value |= (bit as u32) << i;
        }
        self.pos += n as usize;
        value
    }

    pub fn skip_bits(&mut self, n: u32) {
        self.pos += n as usize;
    }
}

/// Unpack one frame into `params`.
///
/// Returns `Err(InvalidPayload)` on a forbidden pitch code or an
/// out-of-range adaptive-codebook gain; the parameters written so far
/// are left in place so the caller can run concealment over them.
pub(crate) fn unpack_bitstream(params: &mut FrameParams, buf: &[u8]) -> Result<()> {
    let mut gb = BitReader::new(buf);

    let info_bits = gb.get_bits(2);

    if info_bits == 3 {
        params.cur_frame_type = FrameType::Untransmitted;
        return Ok(());
    }

    // Three 8-bit LSP indices, transmitted high band first
    params.lsp_index[2] = gb.get_bits(8) as usize;
    params.lsp_index[1] = gb.get_bits(8) as usize;
    params.lsp_index[0] = gb.get_bits(8) as usize;

    if info_bits == 2 {
        params.cur_frame_type = FrameType::Sid;
        params.subframe[0].amp_index = gb.get_bits(6) as usize;
        return Ok(());
    }

    params.cur_rate = if info_bits == 0 {
        Rate::Rate6300
    } else {
        Rate::Rate5300
    };
    params.cur_frame_type = FrameType::Active(params.cur_rate);

    for half in 0..2 {
        let lag = gb.get_bits(7) as usize;
        if lag > 123 {
            return Err(CodecError::invalid_payload(format!(
                "forbidden pitch code {}",
                lag
            )));
        }
        params.pitch_lag[half] = lag + PITCH_MIN;
        params.subframe[2 * half + 1].ad_cb_lag = gb.get_bits(2) as usize;
    }
    params.subframe[0].ad_cb_lag = 1;
    params.subframe[2].ad_cb_lag = 1;

    for i in 0..SUBFRAMES {
        let mut combined = gb.get_bits(12) as usize;
        let mut ad_cb_len = 170;
        params.subframe[i].dirac_train = false;
        if params.cur_rate == Rate::Rate6300 && params.pitch_lag[i >> 1] < SUBFRAME_LEN - 2 {
            params.subframe[i].dirac_train = combined >> 11 != 0;
            combined &= 0x7FF;
            ad_cb_len = 85;
        }
        let ad_cb_gain = combined / GAIN_LEVELS;
        if ad_cb_gain >= ad_cb_len {
            return Err(CodecError::invalid_payload(format!(
                "adaptive codebook gain {} out of range",
                ad_cb_gain
            )));
        }
        params.subframe[i].ad_cb_gain = ad_cb_gain;
        params.subframe[i].amp_index = combined - ad_cb_gain * GAIN_LEVELS;
    }

    for i in 0..SUBFRAMES {
        params.subframe[i].grid_index = gb.get_bits(1) as usize;
    }

    if params.cur_rate == Rate::Rate6300 {
        gb.skip_bits(1); // reserved

        // The 13-bit combined index splits base-810/90/9 across subframes
        let mut temp = gb.get_bits(13) as i32;
        params.subframe[0].pulse_pos = temp / 810;
        temp -= params.subframe[0].pulse_pos * 810;
        params.subframe[1].pulse_pos = temp / 90;
        temp -= params.subframe[1].pulse_pos * 90;
        params.subframe[2].pulse_pos = temp / 9;
        params.subframe[3].pulse_pos = temp - params.subframe[2].pulse_pos * 9;

        params.subframe[0].pulse_pos =
            (params.subframe[0].pulse_pos << 16) + gb.get_bits(16) as i32;
        params.subframe[1].pulse_pos =
            (params.subframe[1].pulse_pos << 14) + gb.get_bits(14) as i32;
        params.subframe[2].pulse_pos =
            (params.subframe[2].pulse_pos << 16) + gb.get_bits(16) as i32;
        params.subframe[3].pulse_pos =
            (params.subframe[3].pulse_pos << 14) + gb.get_bits(14) as i32;

        params.subframe[0].pulse_sign = gb.get_bits(6) as i32;
        params.subframe[1].pulse_sign = gb.get_bits(5) as i32;
        params.subframe[2].pulse_sign = gb.get_bits(6) as i32;
        params.subframe[3].pulse_sign = gb.get_bits(5) as i32;
    } else {
        for i in 0..SUBFRAMES {
            params.subframe[i].pulse_pos = gb.get_bits(12) as i32;
        }
        for i in 0..SUBFRAMES {
            params.subframe[i].pulse_sign = gb.get_bits(4) as i32;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_reader_lsb_first() {
        // 0b0000_0001, 0b1000_0000
        let data = [0x01u8, 0x80];
        let mut gb = BitReader::new(&data);
        assert_eq!(gb.get_bits(1), 1);
        assert_eq!(gb.get_bits(7), 0);
        assert_eq!(gb.get_bits(7), 0);
        assert_eq!(gb.get_bits(1), 1);
    }

    #[test]
    fn test_bit_reader_cross_byte_field() {
        // Field of 12 bits spanning two bytes: stream bits 0..12
        let data = [0xABu8, 0x0F];
        let mut gb = BitReader::new(&data);
        assert_eq!(gb.get_bits(12), 0xFAB);
    }

    #[test]
    fn test_untransmitted_frame() {
        let mut params = FrameParams::default();
        unpack_bitstream(&mut params, &[0x03]).unwrap();
        assert_eq!(params.cur_frame_type, FrameType::Untransmitted);
    }

    #[test]
    fn test_sid_frame_reads_amp_index() {
        // info = 0b10, lsp bytes 0x11 0x22 0x33, amp = 0b101010
        let mut bits = Vec::new();
        let mut push = |value: u32, n: u32| {
            for i in 0..n {
                bits.push((value >> i) & 1);
            }
        };
        push(2, 2);
        push(0x11, 8);
        push(0x22, 8);
        push(0x33, 8);
        push(0x2A, 6);
        let mut data = vec![0u8; 4];
        for (i, b) in bits.iter().enumerate() {
            data[i / 8] |= (*b as u8) << (i % 8);
        }

        let mut params = FrameParams::default();
        unpack_bitstream(&mut params, &data).unwrap();
        assert_eq!(params.cur_frame_type, FrameType::Sid);
        // reverse field order: band 2 first
        assert_eq!(params.lsp_index, [0x33, 0x22, 0x11]);
        assert_eq!(params.subframe[0].amp_index, 0x2A);
    }

    #[test]
    fn test_active_all_zero_payload() {
        let data = [0u8; 24];
        let mut params = FrameParams::default();
        unpack_bitstream(&mut params, &data).unwrap();
        assert_eq!(params.cur_frame_type, FrameType::Active(Rate::Rate6300));
        assert_eq!(params.pitch_lag, [PITCH_MIN, PITCH_MIN]);
        assert_eq!(params.subframe[0].ad_cb_lag, 1);
        assert_eq!(params.subframe[2].ad_cb_lag, 1);
        for sf in &params.subframe {
            assert_eq!(sf.ad_cb_gain, 0);
            assert_eq!(sf.amp_index, 0);
            assert_eq!(sf.pulse_pos, 0);
        }
    }

    #[test]
    fn test_forbidden_pitch_code() {
        // info = 0 (active 6.3), lsp zeros, pitch field = 124
        let mut data = [0u8; 24];
        // pitch field occupies stream bits 26..33
        let forbidden = 124u32;
        for i in 0..7 {
            let bit = (forbidden >> i) & 1;
            let pos = 26 + i as usize;
            data[pos / 8] |= (bit as u8) << (pos % 8);
        }
        let mut params = FrameParams::default();
        assert!(unpack_bitstream(&mut params, &data).is_err());
    }

    #[test]
    fn test_frame_size_for() {
        assert_eq!(frame_size_for(0x00), 24);
        assert_eq!(frame_size_for(0x01), 20);
        assert_eq!(frame_size_for(0x02), 4);
        assert_eq!(frame_size_for(0x03), 1);
        assert_eq!(frame_size_for(0xFF), 1);
    }
}
