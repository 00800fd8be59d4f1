//! Frame-erasure concealment.
//!
//! On a good frame the decoder classifies the excitation as voiced or
//! unvoiced and remembers an interpolation lag and gain. When a frame is
//! lost, a voiced signal is rebuilt by attenuated repetition of the last
//! pitch period; an unvoiced one by attenuated pseudo-random noise.
//! After three consecutive erasures the output is muted entirely.

use super::constants::{FRAME_LEN, LPC_ORDER, PITCH_MAX, SUBFRAME_LEN};
use super::dsp::{autocorr_max, dot_product, sat_add32, scale_vector};

/// Classify the frame and derive the residual-interpolation lag.
///
/// Returns `(interp_index, exc_eng, scale)`: the backward lag if the
/// frame is voiced (0 otherwise), the excitation energy estimate and its
/// scale factor. The scaled excitation is left in `audio` for the pitch
/// post-filter to analyze.
pub(crate) fn comp_interp_index(
    audio: &mut [i16],
    excitation: &[i16],
    pitch_lag: usize,
) -> (usize, i32, i32) {
    let offset = PITCH_MAX + 2 * SUBFRAME_LEN;

    let scale = scale_vector(
        &mut audio[LPC_ORDER..LPC_ORDER + FRAME_LEN + PITCH_MAX],
        excitation,
        FRAME_LEN + PITCH_MAX,
    );
    let base = LPC_ORDER + offset;

    // Maximum backward cross-correlation over the last two subframes
    let mut ccr = 0i32;
    let index = autocorr_max(audio, offset, &mut ccr, pitch_lag, SUBFRAME_LEN * 2, -1);
    let ccr = sat_add32(ccr, 1 << 15) >> 16;

    let tgt_eng = dot_product(&audio[base..], &audio[base..], SUBFRAME_LEN * 2);
    let exc_eng = sat_add32(tgt_eng, 1 << 15) >> 16;

    if ccr <= 0 {
        return (0, exc_eng, scale);
    }

    let best_eng = dot_product(
        &audio[base - index..],
        &audio[base - index..],
        SUBFRAME_LEN * 2,
    );
    let best_eng = sat_add32(best_eng, 1 << 15) >> 16;

    let temp = best_eng * exc_eng >> 3;
    if temp < ccr * ccr {
        (index, exc_eng, scale)
    } else {
        (0, exc_eng, scale)
    }
}

/// Regenerate a lost frame into `out`.
///
/// Voiced frames repeat the last `lag` excitation samples at 3/4
/// amplitude; unvoiced frames emit scaled noise and zero the excitation
/// history.
pub(crate) fn residual_interp(
    excitation: &mut [i16],
    out: &mut [i16],
    lag: usize,
    gain: i32,
    rseed: &mut i32,
) {
    if lag > 0 {
        // Voiced: attenuated period, then tiled across the frame
        for i in 0..lag {
            let v = excitation[PITCH_MAX + i - lag] as i32 * 3 >> 2;
            out[i] = v as i16;
        }
        for i in lag..FRAME_LEN {
            out[i] = out[i - lag];
        }
    } else {
        // Unvoiced: attenuated noise
        for sample in out.iter_mut().take(FRAME_LEN) {
            *rseed = rseed.wrapping_mul(521).wrapping_add(259);
            *sample = (gain.wrapping_mul(*rseed) >> 15) as i16;
        }
        excitation[..FRAME_LEN + PITCH_MAX].fill(0);
    }
}
