//! Comfort-noise generation for SID and untransmitted frames.
//!
//! Noise excitation is built from randomized pitch lags, adaptive
//! codebook gains and a sparse pulse pattern whose amplitude is solved
//! from the target gain with a fixed-point quadratic. The SID gain is
//! either transmitted (6-bit index) or estimated from the last active
//! frame's excitation energy.

use super::bitstream::FrameParams;
use super::constants::{FRAME_LEN, LPC_ORDER, PITCH_MAX, SUBFRAMES, SUBFRAME_LEN};
use super::dsp::{clip, clip_i16, clip_i32, log2_floor, square_root};
use super::excitation::gen_acb_excitation;
use super::tables::{CNG_ADAPTIVE_CB_LAG, CNG_BSEG, CNG_FILT, PULSES};

/// Multiplicative congruential generator used by all comfort-noise
/// randomization; returns a value in `[0, base)`.
#[inline]
pub(crate) fn cng_rand(state: &mut i32, base: i32) -> i32 {
    *state = (state.wrapping_mul(521).wrapping_add(259)) & 0xFFFF;
    (*state & 0x7FFF) * base >> 15
}

/// Map a transmitted 6-bit SID gain index to its gain magnitude.
pub(crate) fn sid_gain_from_index(index: usize) -> i32 {
    let gain = index as i32;
    if gain < 0x10 {
        gain << 6
    } else if gain < 0x20 {
        (gain - 8) << 7
    } else {
        (gain - 20) << 8
    }
}

/// Estimate a SID gain index from the last active frame's excitation
/// energy (`sid_gain`) and its scale factor (`cur_gain`), via an
/// iterative square root over the segmented gain table.
pub(crate) fn estimate_sid_gain(cur_gain: i32, sid_gain: i32) -> i32 {
    let shift = 16 - cur_gain * 2;
    let t = if shift > 0 {
        sid_gain.wrapping_shl(shift as u32)
    } else {
        sid_gain.wrapping_shr(-shift as u32)
    };
    let x = t.wrapping_mul(CNG_FILT[0] as i32) >> 16;

    if x >= CNG_BSEG[2] {
        return 0x3F;
    }

    let (shift, seg): (i32, i32) = if x >= CNG_BSEG[1] {
        (4, 3)
    } else {
        (3, (x >= CNG_BSEG[0]) as i32)
    };
    let seg2 = seg.min(3);

    let mut val = 1i32 << shift;
    let mut val_add = val >> 1;
    for _ in 0..shift {
        let t = seg * 32 + (val << seg2);
        if x >= t * t {
            val += val_add;
        } else {
            val -= val_add;
        }
        val_add >>= 1;
    }

    let t = seg * 32 + (val << seg2);
    let y = t * t - x;
    if y <= 0 {
        let t = seg * 32 + ((val + 1) << seg2);
        let t = t * t - x;
        val = ((seg2 - 1) << 4) + val;
        if t >= y {
            val += 1;
        }
    } else {
        let t = seg * 32 + ((val - 1) << seg2);
        let t = t * t - x;
        val = ((seg2 - 1) << 4) + val;
        if t >= y {
            val -= 1;
        }
    }
    val
}

/// Synthesize one frame of comfort-noise excitation.
///
/// Randomizes the frame parameters in place, composes the adaptive
/// codebook part over subframe pairs inside the persistent `audio`
/// scratch (whose tail doubles as history between frames), injects the
/// solved pulse amplitudes and refreshes the excitation history.
pub(crate) fn generate_noise(
    params: &mut FrameParams,
    cng_seed: &mut i32,
    cur_gain: i32,
    audio: &mut [i16],
    prev_excitation: &mut [i16; PITCH_MAX],
) {
    params.pitch_lag[0] = (cng_rand(cng_seed, 21) + 123) as usize;
    params.pitch_lag[1] = (cng_rand(cng_seed, 19) + 123) as usize;

    for i in 0..SUBFRAMES {
        params.subframe[i].ad_cb_gain = (cng_rand(cng_seed, 50) + 1) as usize;
        params.subframe[i].ad_cb_lag = CNG_ADAPTIVE_CB_LAG[i] as usize;
    }

    let mut off = [0usize; SUBFRAMES];
    let mut signs = [0i32; SUBFRAMES / 2 * 11];
    let mut pos = [0usize; SUBFRAMES / 2 * 11];

    for i in 0..SUBFRAMES / 2 {
        let mut t = cng_rand(cng_seed, 1 << 13);
        off[i * 2] = (t & 1) as usize;
        off[i * 2 + 1] = (((t >> 1) & 1) as usize) + SUBFRAME_LEN;
        t >>= 2;
        for j in 0..11 {
            signs[i * 11 + j] = ((t & 1) * 2 - 1) << 14;
            t >>= 1;
        }
    }

    // Draw pulse positions without replacement from a shrinking pool
    let mut idx = 0;
    for i in 0..SUBFRAMES {
        let mut pool = [0i32; SUBFRAME_LEN / 2];
        for (j, slot) in pool.iter_mut().enumerate() {
            *slot = j as i32;
        }
        let mut t = (SUBFRAME_LEN / 2) as i32;
        for _ in 0..PULSES[i] {
            let idx2 = cng_rand(cng_seed, t) as usize;
            pos[idx] = pool[idx2] as usize * 2 + off[i];
            t -= 1;
            pool[idx2] = pool[t as usize];
            idx += 1;
        }
    }

    audio[LPC_ORDER..LPC_ORDER + PITCH_MAX].copy_from_slice(prev_excitation);
    let mut base = LPC_ORDER;
    for pair in 0..SUBFRAMES / 2 {
        let i = pair * 2;

        let acb = gen_acb_excitation(
            audio,
            base,
            params.pitch_lag[pair],
            &params.subframe[i],
            params.cur_rate,
        );
        audio[base..base + SUBFRAME_LEN].copy_from_slice(&acb);
        let acb = gen_acb_excitation(
            audio,
            base + SUBFRAME_LEN,
            params.pitch_lag[pair],
            &params.subframe[i + 1],
            params.cur_rate,
        );
        audio[base + SUBFRAME_LEN..base + 2 * SUBFRAME_LEN].copy_from_slice(&acb);

        let mut t = 0i32;
        for j in 0..SUBFRAME_LEN * 2 {
            t |= (audio[base + j] as i32).abs();
        }
        let t = t.min(0x7FFF);
        let shift = if t == 0 {
            0
        } else {
            (-10 + log2_floor(t as u32)).max(-2)
        };

        let mut sum = 0i64;
        let mut tmp = [0i32; SUBFRAME_LEN * 2];
        if shift < 0 {
            for j in 0..SUBFRAME_LEN * 2 {
                let t = (audio[base + j] as i32) << -shift;
                sum += (t * t) as i64;
                tmp[j] = t;
            }
        } else {
            for j in 0..SUBFRAME_LEN * 2 {
                let t = (audio[base + j] as i32) >> shift;
                sum += (t * t) as i64;
                tmp[j] = t;
            }
        }

        let mut b0 = 0i32;
        for j in 0..11 {
            let k = pair * 11 + j;
            b0 = b0.wrapping_add(tmp[pos[k]].wrapping_mul(signs[k]));
        }
        // approximated division by 11
        let b0 = ((b0.wrapping_mul(2) as i64 * 2979 + (1 << 29)) >> 30) as i32;

        let mut c = cur_gain.wrapping_mul(cur_gain.wrapping_mul(SUBFRAME_LEN as i32) >> 5);
        let energy_shift = shift * 2 + 3;
        if energy_shift >= 0 {
            c >>= energy_shift;
        } else {
            c <<= -energy_shift;
        }
        let c = (((clip_i32(sum << 1) - c) as i64 * 2979) >> 15) as i32;

        let delta = b0.wrapping_mul(b0).wrapping_mul(2).wrapping_sub(c);
        let mut x = if delta <= 0 {
            -b0
        } else {
            let delta = square_root(delta) as i32;
            let x = delta - b0;
            let t = delta + b0;
            if t.abs() < x.abs() {
                -t
            } else {
                x
            }
        };
        let shift = shift + 1;
        if shift < 0 {
            x >>= -shift;
        } else {
            x = x.wrapping_shl(shift as u32);
        }
        let x = clip(x, -10000, 10000);

        for j in 0..11 {
            let k = pair * 11 + j;
            let p = base + pos[k];
            audio[p] = clip_i16(audio[p] as i32 + (x * signs[k] >> 15));
        }

        // The decoded pair doubles as history for the next one
        audio.copy_within(base..base + 2 * SUBFRAME_LEN, base + PITCH_MAX);
        base += 2 * SUBFRAME_LEN;
    }

    prev_excitation.copy_from_slice(&audio[LPC_ORDER + FRAME_LEN..][..PITCH_MAX]);
}
