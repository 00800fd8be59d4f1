//! G.723.1 decoder state and per-frame orchestration.

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::types::{AudioDecoder, CodecInfo, DecoderConfig};

use super::bitstream::{frame_size_for, unpack_bitstream, FrameParams, FrameType, Rate};
use super::cng::{estimate_sid_gain, generate_noise, sid_gain_from_index};
use super::concealment::{comp_interp_index, residual_interp};
use super::constants::{
    CNG_RANDOM_SEED, FRAME_LEN, LPC_ORDER, PITCH_MAX, SUBFRAMES, SUBFRAME_LEN,
};
use super::dsp::{clip_i16, weighted_vector_sum};
use super::excitation::{gen_acb_excitation, gen_fcb_excitation};
use super::filtering::lp_synthesis;
use super::lsp::{inverse_quant, lsp_interpolate};
use super::postfilter::{comp_ppf_coeff, FormantPostfilter, PpfParam};
use super::tables::{DC_LSP, FIXED_CB_GAIN, FRAME_SIZE};

/// Excitation scratch: pitch history, one frame, and the fixed-codebook
/// spill slack.
const EXC_LEN: usize = PITCH_MAX + FRAME_LEN + 4;
/// Synthesis scratch: filter memory, one frame, pitch history and slack.
const AUDIO_LEN: usize = FRAME_LEN + LPC_ORDER + PITCH_MAX + 4;

/// Resolve the frame type the decoder actually processes.
///
/// A frame that failed to parse is treated as a lost active frame while
/// the stream was in active mode, and as an untransmitted (comfort
/// noise) frame otherwise.
pub(crate) fn remap_frame_type(
    parsed: Option<FrameType>,
    past: FrameType,
    cur_rate: Rate,
) -> FrameType {
    match parsed {
        Some(frame_type) => frame_type,
        None if past.is_active() => FrameType::Active(cur_rate),
        None => FrameType::Untransmitted,
    }
}

/// ITU-T G.723.1 dual-rate speech decoder.
///
/// One instance holds all inter-frame state; feed it one serialized
/// frame at a time and collect 240 PCM samples per frame.
pub struct G7231Decoder {
    params: FrameParams,
    past_frame_type: FrameType,
    erased_frames: u32,

    prev_lsp: [i16; LPC_ORDER],
    sid_lsp: [i16; LPC_ORDER],
    prev_excitation: [i16; PITCH_MAX],
    excitation: [i16; EXC_LEN],
    synth_mem: [i16; LPC_ORDER],
    formant_pf: FormantPostfilter,

    random_seed: i32,
    cng_random_seed: i32,
    interp_index: usize,
    interp_gain: i32,
    sid_gain: i32,
    cur_gain: i32,
    postfilter: bool,

    // Persistent synthesis scratch; its tail doubles as comfort-noise
    // history between frames.
    audio: [i16; AUDIO_LEN],
}

impl G7231Decoder {
    /// Create a decoder with fresh state.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        debug!(postfilter = config.postfilter, "creating G.723.1 decoder");
        Ok(Self::with_config(config))
    }

    fn with_config(config: DecoderConfig) -> Self {
        Self {
            params: FrameParams::default(),
            past_frame_type: FrameType::Sid,
            erased_frames: 0,

            prev_lsp: DC_LSP,
            sid_lsp: DC_LSP,
            prev_excitation: [0; PITCH_MAX],
            excitation: [0; EXC_LEN],
            synth_mem: [0; LPC_ORDER],
            formant_pf: FormantPostfilter::new(),

            random_seed: 0,
            cng_random_seed: CNG_RANDOM_SEED,
            interp_index: 0,
            interp_gain: 0,
            sid_gain: 0,
            cur_gain: 0,
            postfilter: config.postfilter,

            audio: [0; AUDIO_LEN],
        }
    }

    /// Whether the post-filter chain is enabled.
    pub fn postfilter(&self) -> bool {
        self.postfilter
    }

    /// Toggle the post-filter chain.
    pub fn set_postfilter(&mut self, enabled: bool) {
        self.postfilter = enabled;
    }

    /// Frame type the previous packet resolved to.
    pub fn last_frame_type(&self) -> FrameType {
        self.past_frame_type
    }

    /// Decode one frame, appending exactly [`FRAME_LEN`] samples to
    /// `out` (or nothing for a skipped short packet).
    ///
    /// Returns the number of input bytes consumed. A corrupted payload
    /// is concealed, not reported as an error.
    pub fn decode_frame(&mut self, data: &[u8], out: &mut Vec<i16>) -> Result<usize> {
        if data.is_empty() {
            warn!("empty packet - skipping");
            return Ok(0);
        }
        let dec_mode = (data[0] & 3) as usize;
        if data.len() < FRAME_SIZE[dec_mode] {
            warn!(
                "expected {} bytes, got {} - skipping packet",
                FRAME_SIZE[dec_mode],
                data.len()
            );
            return Ok(data.len());
        }

        let parsed = match unpack_bitstream(&mut self.params, data) {
            Ok(()) => Some(self.params.cur_frame_type),
            Err(err) => {
                trace!("bad frame: {}", err);
                None
            }
        };
        let bad_frame = parsed.is_none();
        self.params.cur_frame_type =
            remap_frame_type(parsed, self.past_frame_type, self.params.cur_rate);

        let start = out.len();
        out.resize(start + FRAME_LEN, 0);
        let out_frame = &mut out[start..];

        let mut lpc = [0i16; SUBFRAMES * LPC_ORDER];
        // True when the synthesis input comes straight from the
        // excitation buffer (active frame with the post-filter off).
        let mut synth_from_excitation = false;

        if self.params.cur_frame_type.is_active() {
            if !bad_frame {
                self.erased_frames = 0;
            } else if self.erased_frames != 3 {
                self.erased_frames += 1;
            }

            let mut cur_lsp = [0i16; LPC_ORDER];
            inverse_quant(&mut cur_lsp, &self.prev_lsp, &self.params.lsp_index, bad_frame);
            lsp_interpolate(&mut lpc, &cur_lsp, &self.prev_lsp);
            self.prev_lsp = cur_lsp;

            self.excitation[..PITCH_MAX].copy_from_slice(&self.prev_excitation);
            if self.erased_frames == 0 {
                self.interp_gain = FIXED_CB_GAIN[(self.params.subframe[2].amp_index
                    + self.params.subframe[3].amp_index)
                    >> 1] as i32;

                for i in 0..SUBFRAMES {
                    let subfrm = self.params.subframe[i];
                    let pitch_lag = self.params.pitch_lag[i >> 1];
                    let vec_start = PITCH_MAX + i * SUBFRAME_LEN;

                    gen_fcb_excitation(
                        &mut self.excitation[vec_start..],
                        &subfrm,
                        self.params.cur_rate,
                        pitch_lag,
                        i,
                    );
                    let acb = gen_acb_excitation(
                        &self.excitation,
                        i * SUBFRAME_LEN,
                        pitch_lag,
                        &subfrm,
                        self.params.cur_rate,
                    );
                    for j in 0..SUBFRAME_LEN {
                        let fcb = clip_i16((self.excitation[vec_start + j] as i32) << 1);
                        self.excitation[vec_start + j] = clip_i16(fcb as i32 + acb[j] as i32);
                    }
                }

                let (interp_index, exc_eng, scale) = comp_interp_index(
                    &mut self.audio,
                    &self.excitation[..FRAME_LEN + PITCH_MAX],
                    self.params.pitch_lag[1],
                );
                self.interp_index = interp_index;
                self.sid_gain = exc_eng;
                self.cur_gain = scale;

                if self.postfilter {
                    let mut ppf = [PpfParam::default(); SUBFRAMES];
                    for (j, param) in ppf.iter_mut().enumerate() {
                        *param = comp_ppf_coeff(
                            &self.audio,
                            PITCH_MAX + j * SUBFRAME_LEN,
                            self.params.pitch_lag[j >> 1],
                            self.params.cur_rate,
                        );
                    }
                    for (j, param) in ppf.iter().enumerate() {
                        let i = j * SUBFRAME_LEN;
                        let direct = PITCH_MAX + i;
                        let delayed = (direct as i32 + param.index) as usize;
                        weighted_vector_sum(
                            &mut self.audio[LPC_ORDER + i..LPC_ORDER + i + SUBFRAME_LEN],
                            &self.excitation[direct..],
                            &self.excitation[delayed..],
                            param.sc_gain as i32,
                            param.opt_gain as i32,
                            1 << 14,
                            15,
                            SUBFRAME_LEN,
                        );
                    }
                } else {
                    synth_from_excitation = true;
                }

                self.prev_excitation
                    .copy_from_slice(&self.excitation[FRAME_LEN..FRAME_LEN + PITCH_MAX]);
            } else {
                self.interp_gain = (self.interp_gain * 3 + 2) >> 2;
                if self.erased_frames == 3 {
                    // Mute: zero the output and every signal memory so a
                    // following good frame starts from silence
                    self.excitation.fill(0);
                    self.prev_excitation.fill(0);
                    self.audio.fill(0);
                    self.synth_mem.fill(0);
                    out_frame.fill(0);

                    self.cng_random_seed = CNG_RANDOM_SEED;
                    self.past_frame_type = self.params.cur_frame_type;
                    return Ok(FRAME_SIZE[dec_mode]);
                }

                residual_interp(
                    &mut self.excitation,
                    &mut self.audio[LPC_ORDER..],
                    self.interp_index,
                    self.interp_gain,
                    &mut self.random_seed,
                );
                self.prev_excitation.copy_from_slice(
                    &self.audio[LPC_ORDER + FRAME_LEN - PITCH_MAX..LPC_ORDER + FRAME_LEN],
                );
            }
            self.cng_random_seed = CNG_RANDOM_SEED;
        } else {
            if self.params.cur_frame_type == FrameType::Sid {
                self.sid_gain = sid_gain_from_index(self.params.subframe[0].amp_index);
                inverse_quant(
                    &mut self.sid_lsp,
                    &self.prev_lsp,
                    &self.params.lsp_index,
                    false,
                );
            } else if self.past_frame_type.is_active() {
                self.sid_gain = estimate_sid_gain(self.cur_gain, self.sid_gain);
            }

            if self.past_frame_type.is_active() {
                self.cur_gain = self.sid_gain;
            } else {
                self.cur_gain = (self.cur_gain * 7 + self.sid_gain) >> 3;
            }
            generate_noise(
                &mut self.params,
                &mut self.cng_random_seed,
                self.cur_gain,
                &mut self.audio,
                &mut self.prev_excitation,
            );
            lsp_interpolate(&mut lpc, &self.sid_lsp, &self.prev_lsp);
            self.prev_lsp = self.sid_lsp;
        }

        self.past_frame_type = self.params.cur_frame_type;

        self.audio[..LPC_ORDER].copy_from_slice(&self.synth_mem);
        for j in 0..SUBFRAMES {
            let offset = LPC_ORDER + j * SUBFRAME_LEN;
            let mut src = [0i16; SUBFRAME_LEN];
            if synth_from_excitation {
                src.copy_from_slice(
                    &self.excitation[PITCH_MAX + j * SUBFRAME_LEN..][..SUBFRAME_LEN],
                );
            } else {
                src.copy_from_slice(&self.audio[offset..offset + SUBFRAME_LEN]);
            }
            lp_synthesis(&mut self.audio, offset, &lpc[j * LPC_ORDER..], &src);
        }
        self.synth_mem
            .copy_from_slice(&self.audio[FRAME_LEN..FRAME_LEN + LPC_ORDER]);

        if self.postfilter {
            self.formant_pf.process(&lpc, &mut self.audio, out_frame);
        } else {
            // Un-postfiltered output compensates the synthesis headroom
            for (i, sample) in out_frame.iter_mut().enumerate() {
                *sample = clip_i16((self.audio[LPC_ORDER + i] as i32) << 1);
            }
        }

        trace!(
            frame_type = ?self.params.cur_frame_type,
            bad_frame,
            erased = self.erased_frames,
            "decoded frame"
        );
        Ok(FRAME_SIZE[dec_mode])
    }

    /// Size in bytes of the frame starting with `first_byte`.
    pub fn frame_size(first_byte: u8) -> usize {
        frame_size_for(first_byte)
    }
}

impl AudioDecoder for G7231Decoder {
    fn decode(&mut self, data: &[u8], out: &mut Vec<i16>) -> Result<usize> {
        self.decode_frame(data, out)
    }

    fn reset(&mut self) {
        *self = Self::with_config(DecoderConfig {
            postfilter: self.postfilter,
        });
    }

    fn info(&self) -> CodecInfo {
        CodecInfo {
            name: "G.723.1",
            sample_rate: 8000,
            channels: 1,
            frame_samples: FRAME_LEN,
        }
    }
}
