//! Register map and parameter encoding of the clock generator.
//!
//! Only the registers this crate touches are listed. PLL and multisynth
//! ratios are stored as the `P1`/`P2`/`P3` triple in an 8-byte block:
//!
//! ```text
//! byte 0: P3[15:8]
//! byte 1: P3[7:0]
//! byte 2: R_DIV[6:4] | DIVBY4[3:2] | P1[17:16]   (R_DIV/DIVBY4 multisynth only)
//! byte 3: P1[15:8]
//! byte 4: P1[7:0]
//! byte 5: P3[19:16] << 4 | P2[19:16]
//! byte 6: P2[15:8]
//! byte 7: P2[7:0]
//! ```

use crate::params::{DIVIDER_RANGE, FRACTIONAL_DENOMINATOR, MAX_R_DIV_SHIFT, MULTIPLIER_RANGE};

/// Device status register.
pub const REG_DEVICE_STATUS: u8 = 0;
/// PLL A loss-of-lock bit in [`REG_DEVICE_STATUS`].
pub const STATUS_LOL_A: u8 = 0x20;
/// CLK0 output control register.
pub const REG_CLK0_CONTROL: u8 = 16;
/// CLK0 control value: output powered down.
pub const CLK0_POWER_DOWN: u8 = 0x80;
/// CLK0 control value: powered, integer mode, multisynth source, PLL A, 8 mA.
pub const CLK0_ENABLE_PLL_A: u8 = 0x4F;
/// First register of the PLL A parameter block.
pub const REG_PLL_A_BASE: u8 = 26;
/// First register of the multisynth 0 parameter block.
pub const REG_MS0_BASE: u8 = 42;
/// PLL soft-reset register.
pub const REG_PLL_RESET: u8 = 177;
/// Soft-reset both PLLs.
pub const PLL_RESET_BOTH: u8 = 0xA0;
/// Length of a parameter block in bytes.
pub const PARAM_BLOCK_LEN: usize = 8;

const DIVBY4_BITS: u8 = 0x0C;

/// PLL feedback ratio `multiplier + numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllRatio {
    /// Integer part.
    pub multiplier: u32,
    /// Fractional numerator.
    pub numerator: u32,
    /// Fractional denominator.
    pub denominator: u32,
}

/// Integer output divider followed by the power-of-two R divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDivider {
    /// Even integer multisynth divider.
    pub divider: u32,
    /// R divider exponent (output is divided by `2^r_div_shift`).
    pub r_div_shift: u8,
}

fn pack(p1: u32, p2: u32, p3: u32, extra: u8) -> [u8; PARAM_BLOCK_LEN] {
    let [_, p1_hi, p1_mid, p1_lo] = p1.to_be_bytes();
    let [_, p2_hi, p2_mid, p2_lo] = p2.to_be_bytes();
    let [_, p3_hi, p3_mid, p3_lo] = p3.to_be_bytes();
    [
        p3_mid,
        p3_lo,
        (p1_hi & 0x03) | extra,
        p1_mid,
        p1_lo,
        ((p3_hi & 0x0F) << 4) | (p2_hi & 0x0F),
        p2_mid,
        p2_lo,
    ]
}

fn unpack(block: &[u8; PARAM_BLOCK_LEN]) -> (u32, u32, u32) {
    let [b0, b1, b2, b3, b4, b5, b6, b7] = *block;
    let p1 = u32::from_be_bytes([0, b2 & 0x03, b3, b4]);
    let p2 = u32::from_be_bytes([0, b5 & 0x0F, b6, b7]);
    let p3 = u32::from_be_bytes([0, b5 >> 4, b0, b1]);
    (p1, p2, p3)
}

/// Encode a PLL feedback ratio.
///
/// `P1 = 128a + floor(128b/c) - 512`, `P2 = 128b - c*floor(128b/c)`, `P3 = c`.
///
/// Returns `None` unless `a` is in [`MULTIPLIER_RANGE`] and
/// `b < c <= FRACTIONAL_DENOMINATOR`.
#[must_use]
pub fn encode_pll_registers(ratio: PllRatio) -> Option<[u8; PARAM_BLOCK_LEN]> {
    let PllRatio {
        multiplier,
        numerator,
        denominator,
    } = ratio;
    if !MULTIPLIER_RANGE.contains(&multiplier)
        || denominator == 0
        || denominator > FRACTIONAL_DENOMINATOR
        || numerator >= denominator
    {
        return None;
    }
    let scaled = numerator.checked_mul(128)?;
    let frac = scaled / denominator;
    let p1 = multiplier.checked_mul(128)?.checked_add(frac)?.checked_sub(512)?;
    let p2 = scaled.checked_sub(denominator.checked_mul(frac)?)?;
    Some(pack(p1, p2, denominator, 0))
}

/// Decode a PLL parameter block back into its feedback ratio.
///
/// Returns `None` for a block with a zero denominator.
#[must_use]
pub fn decode_pll_registers(block: &[u8; PARAM_BLOCK_LEN]) -> Option<PllRatio> {
    let (p1, p2, p3) = unpack(block);
    if p3 == 0 {
        return None;
    }
    // (P1 + 512) * c + P2 == 128 * (a * c + b)
    let scaled = (u64::from(p1) + 512) * u64::from(p3) + u64::from(p2);
    let total = scaled / 128;
    let c = u64::from(p3);
    Some(PllRatio {
        multiplier: u32::try_from(total / c).ok()?,
        numerator: u32::try_from(total % c).ok()?,
        denominator: p3,
    })
}

/// Encode an integer multisynth divider with its R divider.
///
/// Divide-by-4 uses the dedicated `DIVBY4` mode. Returns `None` for a
/// divider outside [`DIVIDER_RANGE`] or a shift above [`MAX_R_DIV_SHIFT`].
#[must_use]
pub fn encode_multisynth_registers(output: OutputDivider) -> Option<[u8; PARAM_BLOCK_LEN]> {
    if !DIVIDER_RANGE.contains(&output.divider) || output.r_div_shift > MAX_R_DIV_SHIFT {
        return None;
    }
    let r_bits = output.r_div_shift << 4;
    if output.divider == 4 {
        return Some(pack(0, 0, 1, r_bits | DIVBY4_BITS));
    }
    let p1 = output.divider.checked_mul(128)?.checked_sub(512)?;
    Some(pack(p1, 0, 1, r_bits))
}

/// Decode a multisynth parameter block written by [`encode_multisynth_registers`].
#[must_use]
pub fn decode_multisynth_registers(block: &[u8; PARAM_BLOCK_LEN]) -> OutputDivider {
    let [_, _, b2, ..] = *block;
    let r_div_shift = (b2 >> 4) & 0x07;
    if b2 & DIVBY4_BITS == DIVBY4_BITS {
        return OutputDivider {
            divider: 4,
            r_div_shift,
        };
    }
    let (p1, _, _) = unpack(block);
    OutputDivider {
        divider: (p1 + 512) / 128,
        r_div_shift,
    }
}

/// Prefix a parameter block with its start register for a burst write.
#[must_use]
pub fn burst(base: u8, block: &[u8; PARAM_BLOCK_LEN]) -> [u8; PARAM_BLOCK_LEN + 1] {
    let mut out = [0u8; PARAM_BLOCK_LEN + 1];
    if let Some((first, rest)) = out.split_first_mut() {
        *first = base;
        rest.copy_from_slice(block);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_pll_encoding() {
        let block = encode_pll_registers(PllRatio {
            multiplier: 32,
            numerator: 0,
            denominator: 1_048_575,
        });
        // P1 = 128 * 32 - 512 = 3584 = 0x0E00, P3 = 0xFFFFF
        assert_eq!(
            block,
            Some([0xFF, 0xFF, 0x00, 0x0E, 0x00, 0xF0, 0x00, 0x00])
        );
    }

    #[test]
    fn test_fractional_pll_decodes() {
        let ratio = PllRatio {
            multiplier: 33,
            numerator: 192_837,
            denominator: 1_048_575,
        };
        let block = encode_pll_registers(ratio);
        assert_eq!(block.and_then(|b| decode_pll_registers(&b)), Some(ratio));
    }

    #[test]
    fn test_zero_denominator_rejected() {
        assert_eq!(decode_pll_registers(&[0u8; PARAM_BLOCK_LEN]), None);
    }

    #[test]
    fn test_multisynth_r_divider_bits() {
        let block = encode_multisynth_registers(OutputDivider {
            divider: 900,
            r_div_shift: 3,
        });
        // P1 = 128 * 900 - 512 = 114688 = 0x1C000
        assert_eq!(
            block,
            Some([0x00, 0x01, 0x31, 0xC0, 0x00, 0x00, 0x00, 0x00])
        );
    }

    #[test]
    fn test_divide_by_four_mode() -> Result<(), Box<dyn std::error::Error>> {
        let output = OutputDivider {
            divider: 4,
            r_div_shift: 0,
        };
        let block = encode_multisynth_registers(output).ok_or("divide-by-4 rejected")?;
        let [_, _, mode, ..] = block;
        assert_eq!(mode & DIVBY4_BITS, DIVBY4_BITS);
        assert_eq!(decode_multisynth_registers(&block), output);
        Ok(())
    }

    #[test]
    fn test_invalid_pll_ratio_rejected() {
        let ratio = |multiplier, numerator, denominator| PllRatio {
            multiplier,
            numerator,
            denominator,
        };
        assert_eq!(encode_pll_registers(ratio(33, 0, 0)), None);
        assert_eq!(encode_pll_registers(ratio(3, 0, 1)), None);
        assert_eq!(encode_pll_registers(ratio(91, 0, 1)), None);
        assert_eq!(encode_pll_registers(ratio(33, 5, 5)), None);
        assert_eq!(encode_pll_registers(ratio(33, 0, 1 << 20)), None);
        assert_eq!(encode_pll_registers(ratio(u32::MAX, u32::MAX, u32::MAX)), None);
    }

    #[test]
    fn test_invalid_output_divider_rejected() {
        let output = |divider, r_div_shift| OutputDivider {
            divider,
            r_div_shift,
        };
        assert_eq!(encode_multisynth_registers(output(0, 0)), None);
        assert_eq!(encode_multisynth_registers(output(2, 0)), None);
        assert_eq!(encode_multisynth_registers(output(2050, 0)), None);
        assert_eq!(encode_multisynth_registers(output(u32::MAX, 0)), None);
        assert_eq!(encode_multisynth_registers(output(36, 8)), None);
        assert!(encode_multisynth_registers(output(2048, 7)).is_some());
    }

    #[test]
    fn test_burst_prefix() {
        let out = burst(REG_MS0_BASE, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(out, [42, 1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
