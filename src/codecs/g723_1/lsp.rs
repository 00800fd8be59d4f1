//! LSP inverse quantization and conversion to LPC coefficients.
//!
//! The three transmitted codebook indices select per-band LSP residuals;
//! a fixed predictor pulls the result toward the previous frame's vector
//! and the long-term DC vector. A stability pass then enforces minimum
//! separation between adjacent LSPs, falling back to the previous vector
//! when ten iterations cannot repair the ordering. Conversion to direct
//! form goes through the sum/difference polynomials evaluated in Q25.

use super::constants::{LPC_ORDER, SUBFRAMES};
use super::dsp::{clip_i32, mull2, sat_dadd32, weighted_vector_sum};
use super::tables::{COS_TAB, DC_LSP, LSP_BAND0, LSP_BAND1, LSP_BAND2};

/// Dequantize the transmitted LSP indices into `cur_lsp`.
///
/// On a bad frame the indices are ignored and a stronger predictor pulls
/// the vector toward the previous one.
pub(crate) fn inverse_quant(
    cur_lsp: &mut [i16; LPC_ORDER],
    prev_lsp: &[i16; LPC_ORDER],
    lsp_index: &[usize; 3],
    bad_frame: bool,
) {
    let (min_dist, pred, index): (i32, i32, [usize; 3]) = if !bad_frame {
        (0x100, 12288, *lsp_index)
    } else {
        (0x200, 23552, [0; 3])
    };

    let band0 = &LSP_BAND0[index[0]];
    let band1 = &LSP_BAND1[index[1]];
    let band2 = &LSP_BAND2[index[2]];
    cur_lsp[0] = band0[0];
    cur_lsp[1] = band0[1];
    cur_lsp[2] = band0[2];
    cur_lsp[3] = band1[0];
    cur_lsp[4] = band1[1];
    cur_lsp[5] = band1[2];
    cur_lsp[6] = band2[0];
    cur_lsp[7] = band2[1];
    cur_lsp[8] = band2[2];
    cur_lsp[9] = band2[3];

    // Predicted vector plus DC component
    for i in 0..LPC_ORDER {
        let temp = ((prev_lsp[i] as i32 - DC_LSP[i] as i32) * pred + (1 << 14)) >> 15;
        cur_lsp[i] = (cur_lsp[i] as i32 + DC_LSP[i] as i32 + temp) as i16;
    }

    let mut stable = false;
    for _ in 0..LPC_ORDER {
        cur_lsp[0] = cur_lsp[0].max(0x180);
        cur_lsp[LPC_ORDER - 1] = cur_lsp[LPC_ORDER - 1].min(0x7E00);

        for j in 1..LPC_ORDER {
            let temp = min_dist + cur_lsp[j - 1] as i32 - cur_lsp[j] as i32;
            if temp > 0 {
                let temp = temp >> 1;
                cur_lsp[j - 1] = (cur_lsp[j - 1] as i32 - temp) as i16;
                cur_lsp[j] = (cur_lsp[j] as i32 + temp) as i16;
            }
        }

        stable = true;
        for j in 1..LPC_ORDER {
            let temp = cur_lsp[j - 1] as i32 + min_dist - cur_lsp[j] as i32 - 4;
            if temp > 0 {
                stable = false;
                break;
            }
        }
        if stable {
            break;
        }
    }
    if !stable {
        cur_lsp.copy_from_slice(prev_lsp);
    }
}

/// Convert one LSP vector (Q15, in place) to LPC coefficients.
pub(crate) fn lsp2lpc(lpc: &mut [i16]) {
    debug_assert_eq!(lpc.len(), LPC_ORDER);

    // Negative cosine, Q14, linearly interpolated from the table
    for value in lpc.iter_mut() {
        let index = (*value >> 7) as usize;
        let offset = (*value & 0x7F) as i32;
        let temp1 = (COS_TAB[index] as i32) << 16;
        let temp2 =
            ((COS_TAB[index + 1] as i32 - COS_TAB[index] as i32) * ((offset << 8) + 0x80)) << 1;

        *value = -((sat_dadd32(1 << 15, temp1.wrapping_add(temp2)) >> 16) as i16);
    }

    let mut f1 = [0i32; LPC_ORDER / 2 + 1];
    let mut f2 = [0i32; LPC_ORDER / 2 + 1];

    // Sum and difference polynomials, initialized in Q28
    f1[0] = 1 << 28;
    f1[1] = ((lpc[0] as i32) << 14) + ((lpc[2] as i32) << 14);
    f1[2] = lpc[0] as i32 * lpc[2] as i32 + (2 << 28);

    f2[0] = 1 << 28;
    f2[1] = ((lpc[1] as i32) << 14) + ((lpc[3] as i32) << 14);
    f2[2] = lpc[1] as i32 * lpc[3] as i32 + (2 << 28);

    // Each iteration halves the scale, leaving the result in Q25
    for i in 2..LPC_ORDER / 2 {
        f1[i + 1] = f1[i - 1].wrapping_add(mull2(f1[i], lpc[2 * i] as i32));
        f2[i + 1] = f2[i - 1].wrapping_add(mull2(f2[i], lpc[2 * i + 1] as i32));

        for j in (2..=i).rev() {
            f1[j] = mull2(f1[j - 1], lpc[2 * i] as i32)
                .wrapping_add(f1[j] >> 1)
                .wrapping_add(f1[j - 2] >> 1);
            f2[j] = mull2(f2[j - 1], lpc[2 * i + 1] as i32)
                .wrapping_add(f2[j] >> 1)
                .wrapping_add(f2[j - 2] >> 1);
        }

        f1[0] >>= 1;
        f2[0] >>= 1;
        f1[1] = ((((lpc[2 * i] as i32) << 16) >> i) + f1[1]) >> 1;
        f2[1] = ((((lpc[2 * i + 1] as i32) << 16) >> i) + f2[1]) >> 1;
    }

    for i in 0..LPC_ORDER / 2 {
        let ff1 = f1[i + 1] as i64 + f1[i] as i64;
        let ff2 = f2[i + 1] as i64 - f2[i] as i64;

        lpc[i] = (clip_i32(((ff1 + ff2) << 3) + (1 << 15)) >> 16) as i16;
        lpc[LPC_ORDER - i - 1] = (clip_i32(((ff1 - ff2) << 3) + (1 << 15)) >> 16) as i16;
    }
}

/// Produce the four per-subframe LPC sets by interpolating between the
/// previous and current LSP vectors with weights 1/4, 1/2, 3/4, 1.
pub(crate) fn lsp_interpolate(
    lpc: &mut [i16; SUBFRAMES * LPC_ORDER],
    cur_lsp: &[i16; LPC_ORDER],
    prev_lsp: &[i16; LPC_ORDER],
) {
    let (s0, rest) = lpc.split_at_mut(LPC_ORDER);
    let (s1, rest) = rest.split_at_mut(LPC_ORDER);
    let (s2, s3) = rest.split_at_mut(LPC_ORDER);

    weighted_vector_sum(s0, cur_lsp, prev_lsp, 4096, 12288, 1 << 13, 14, LPC_ORDER);
    weighted_vector_sum(s1, cur_lsp, prev_lsp, 8192, 8192, 1 << 13, 14, LPC_ORDER);
    weighted_vector_sum(s2, cur_lsp, prev_lsp, 12288, 4096, 1 << 13, 14, LPC_ORDER);
    s3.copy_from_slice(cur_lsp);

    for subframe in lpc.chunks_exact_mut(LPC_ORDER) {
        lsp2lpc(subframe);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_stable(lsp: &[i16; LPC_ORDER]) -> bool {
        (1..LPC_ORDER).all(|j| lsp[j] as i32 - lsp[j - 1] as i32 >= 4)
    }

    #[test]
    fn test_zero_indices_from_dc_yield_dc() {
        let mut cur = [0i16; LPC_ORDER];
        inverse_quant(&mut cur, &DC_LSP, &[0; 3], false);
        assert_eq!(cur, DC_LSP);
    }

    #[test]
    fn test_bad_frame_ignores_indices() {
        let mut a = [0i16; LPC_ORDER];
        let mut b = [0i16; LPC_ORDER];
        inverse_quant(&mut a, &DC_LSP, &[0; 3], true);
        inverse_quant(&mut b, &DC_LSP, &[17, 201, 96], true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_dequantized_vector_is_stable_or_previous() {
        for &idx in &[[0usize, 0, 0], [1, 2, 3], [255, 255, 255], [40, 199, 250]] {
            let mut cur = [0i16; LPC_ORDER];
            inverse_quant(&mut cur, &DC_LSP, &idx, false);
            assert!(
                is_stable(&cur) || cur == DC_LSP,
                "unstable output for indices {:?}: {:?}",
                idx,
                cur
            );
        }
    }

    #[test]
    fn test_lsp2lpc_dc_vector() {
        // Pinned conversion of the long-term DC vector; guards the
        // cosine interpolation and the polynomial recurrences.
        let mut lpc = DC_LSP;
        lsp2lpc(&mut lpc);
        assert_eq!(
            lpc,
            [-6798, 4183, -4180, 3778, -2915, 3231, -1891, 2172, -1428, 1052]
        );
    }

    #[test]
    fn test_interpolation_endpoint_matches_direct_conversion() {
        let mut cur = [0i16; LPC_ORDER];
        inverse_quant(&mut cur, &DC_LSP, &[10, 20, 30], false);

        let mut lpc = [0i16; SUBFRAMES * LPC_ORDER];
        lsp_interpolate(&mut lpc, &cur, &DC_LSP);

        let mut direct = cur;
        lsp2lpc(&mut direct);
        assert_eq!(&lpc[3 * LPC_ORDER..], &direct);
    }
}
