//! Short-term LP synthesis filtering.

use super::constants::{LPC_ORDER, SUBFRAME_LEN};
use super::dsp::clip_i16;

/// Run the 10th-order all-pole synthesis filter for one subframe.
///
/// `buf[offset - LPC_ORDER..offset]` supplies the filter memory and the
/// output is written to `buf[offset..offset + SUBFRAME_LEN]`, so chained
/// subframes feed each other naturally. The excitation input `src` is
/// scaled down by one bit on output; the caller compensates when the
/// post-filter is bypassed. The accumulator intentionally wraps, like
/// the reference arithmetic it mirrors.
pub(crate) fn lp_synthesis(buf: &mut [i16], offset: usize, lpc: &[i16], src: &[i16]) {
    debug_assert!(lpc.len() >= LPC_ORDER);
    debug_assert!(offset >= LPC_ORDER);

    for n in 0..SUBFRAME_LEN {
        let mut sum: i32 = 1 << 12;
        for i in 1..=LPC_ORDER {
            sum = sum.wrapping_sub(
                (lpc[i - 1] as i32).wrapping_mul(buf[offset + n - i] as i32),
            );
        }
        buf[offset + n] = clip_i16(((sum >> 12) + src[n] as i32) >> 1);
    }
}
