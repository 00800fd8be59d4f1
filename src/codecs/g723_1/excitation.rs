//! Fixed- and adaptive-codebook excitation reconstruction.
//!
//! At 6.3 kbit/s the fixed codebook is a multipulse vector addressed by
//! a combinatorial position index; at 5.3 kbit/s it is a regular pulse
//! grid with optional harmonic enhancement. The adaptive codebook
//! rebuilds the pitch-predicted part from the excitation history with a
//! 5-tap predictor, reading cyclically when the lag is shorter than the
//! subframe.

use super::bitstream::{Rate, Subframe};
use super::constants::{GRID_SIZE, PITCH_MAX, PITCH_ORDER, PULSE_MAX, SUBFRAME_LEN};
use super::dsp::{dot_product, sat_dadd32};
use super::tables::{
    ADAPTIVE_CB_GAIN170, ADAPTIVE_CB_GAIN85, COMBINATORIAL_TABLE, FIXED_CB_GAIN, MAX_POS,
    PITCH_CONTRIB, PULSES,
};

/// Overlay `buf` with copies of itself delayed by multiples of the
/// pitch lag (used for short-lag 6.3 kbit/s subframes).
fn gen_dirac_train(buf: &mut [i16], pitch_lag: usize) {
    let mut vector = [0i16; SUBFRAME_LEN];
    vector.copy_from_slice(&buf[..SUBFRAME_LEN]);

    let mut i = pitch_lag;
    while i < SUBFRAME_LEN {
        for j in 0..SUBFRAME_LEN - i {
            buf[i + j] = (buf[i + j] as i32 + vector[j] as i32) as i16;
        }
        i += pitch_lag;
    }
}

/// Reconstruct the fixed-codebook excitation for one subframe.
///
/// `vector` must provide at least `SUBFRAME_LEN + 4` samples: the
/// 5.3 kbit/s pulse grid can address up to position 63 and the extra
/// samples spill into the next subframe's region, as the excitation
/// buffer layout expects.
pub(crate) fn gen_fcb_excitation(
    vector: &mut [i16],
    subfrm: &Subframe,
    cur_rate: Rate,
    pitch_lag: usize,
    index: usize,
) {
    vector[..SUBFRAME_LEN].fill(0);

    if cur_rate == Rate::Rate6300 {
        if subfrm.pulse_pos >= MAX_POS[index] {
            return;
        }

        // Decode amplitudes and positions by repeated subtraction
        let mut j = PULSE_MAX - PULSES[index];
        let mut temp = subfrm.pulse_pos;
        for i in 0..SUBFRAME_LEN / GRID_SIZE {
            temp -= COMBINATORIAL_TABLE[j][i];
            if temp >= 0 {
                continue;
            }
            temp += COMBINATORIAL_TABLE[j][i];
            j += 1;
            let amp = FIXED_CB_GAIN[subfrm.amp_index];
            vector[subfrm.grid_index + GRID_SIZE * i] =
                if subfrm.pulse_sign & (1 << (PULSE_MAX - j)) != 0 {
                    -amp
                } else {
                    amp
                };
            if j == PULSE_MAX {
                break;
            }
        }
        if subfrm.dirac_train {
            gen_dirac_train(vector, pitch_lag);
        }
    } else {
        let cb_gain = FIXED_CB_GAIN[subfrm.amp_index];
        let cb_shift = subfrm.grid_index;
        let mut cb_sign = subfrm.pulse_sign;
        let mut cb_pos = subfrm.pulse_pos;

        for i in (0..8).step_by(2) {
            let offset = (((cb_pos & 7) << 3) as usize) + cb_shift + i;
            vector[offset] = if cb_sign & 1 != 0 { cb_gain } else { -cb_gain };
            cb_pos >>= 3;
            cb_sign >>= 1;
        }

        // Enhance harmonic components
        let lag = (PITCH_CONTRIB[subfrm.ad_cb_gain << 1] as i32
            + pitch_lag as i32
            + subfrm.ad_cb_lag as i32
            - 1) as usize;
        let beta = PITCH_CONTRIB[(subfrm.ad_cb_gain << 1) + 1] as i32;

        if lag < SUBFRAME_LEN - 2 {
            for i in lag..SUBFRAME_LEN {
                let add = (beta * vector[i - lag] as i32) >> 15;
                vector[i] = (vector[i] as i32 + add) as i16;
            }
        }
    }
}

/// Compose the delayed residual window for the 5-tap pitch predictor.
///
/// The first two samples are read directly; from the third on, reads
/// wrap modulo the lag so short lags repeat the most recent period.
fn get_residual(residual: &mut [i16; SUBFRAME_LEN + PITCH_ORDER - 1], buf: &[i16], offset: usize, lag: usize) {
    residual[0] = buf[offset];
    residual[1] = buf[offset + 1];

    let offset = offset + 2;
    for i in 2..SUBFRAME_LEN + PITCH_ORDER - 1 {
        residual[i] = buf[offset + (i - 2) % lag];
    }
}

/// Generate the adaptive-codebook excitation for one subframe.
///
/// `buf` is the backing excitation buffer and `base` the index where the
/// 146-sample history for this subframe ends-begins (the history occupies
/// `buf[base..base + PITCH_MAX]`; reads may reach slightly below `base`
/// for the longest lags, mirroring the reference buffer layout).
pub(crate) fn gen_acb_excitation(
    buf: &[i16],
    base: usize,
    pitch_lag: usize,
    subfrm: &Subframe,
    cur_rate: Rate,
) -> [i16; SUBFRAME_LEN] {
    let mut residual = [0i16; SUBFRAME_LEN + PITCH_ORDER - 1];
    let lag = pitch_lag + subfrm.ad_cb_lag - 1;

    let offset = (base + PITCH_MAX - PITCH_ORDER / 2) - lag;
    get_residual(&mut residual, buf, offset, lag);

    let cb_table: &[i16] = if cur_rate == Rate::Rate6300 && pitch_lag < SUBFRAME_LEN - 2 {
        &ADAPTIVE_CB_GAIN85
    } else {
        &ADAPTIVE_CB_GAIN170
    };
    let cb = &cb_table[subfrm.ad_cb_gain * 20..subfrm.ad_cb_gain * 20 + PITCH_ORDER];

    let mut vector = [0i16; SUBFRAME_LEN];
    for i in 0..SUBFRAME_LEN {
        let sum = dot_product(&residual[i..i + PITCH_ORDER], cb, PITCH_ORDER);
        vector[i] = (sat_dadd32(1 << 15, sum) >> 16) as i16;
    }
    vector
}
