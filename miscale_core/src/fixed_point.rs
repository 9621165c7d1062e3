//! Fixed-point gram arithmetic helpers.
//!
//! The stabilization window holds weights as integer grams (`i32`) so that spread
//! checks and means are exact; conversion to kilograms happens at the edges.

/// Grams per kilogram.
pub const GRAMS_PER_KG: i32 = 1_000;

/// Quantize a kilogram value to integer grams, rounding to nearest and clamping to
/// the `i32` range. Non-finite values (NaN/±Inf) map to 0.
#[inline]
pub fn kg_to_grams(kg: f32) -> i32 {
    if !kg.is_finite() {
        return 0;
    }
    let scaled = (f64::from(kg) * f64::from(GRAMS_PER_KG)).round();
    if scaled >= f64::from(i32::MAX) {
        i32::MAX
    } else if scaled <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        scaled as i32
    }
}

/// Integer grams to kilograms rounded to 0.01 kg.
#[inline]
pub fn grams_to_kg_centi(g: i32) -> f32 {
    let centi = div_round_nearest_i64(i64::from(g), 10);
    (centi as f32) / 100.0
}

/// Round to a fixed number of decimals, half away from zero.
#[inline]
pub fn round_to(x: f32, decimals: i32) -> f32 {
    let p = 10f32.powi(decimals);
    (x * p).round() / p
}

/// Integer division rounded to nearest, ties away from zero. `den` must be > 0.
#[inline]
pub fn div_round_nearest_i64(num: i64, den: i64) -> i64 {
    debug_assert!(den > 0, "div_round_nearest_i64: den must be > 0");
    let half = den / 2;
    if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    }
}

/// Absolute difference of two i32 values as u32 without overflow.
///
/// Uses 64-bit intermediates to avoid overflow during subtraction.
/// For any `i32` inputs, `|a - b| <= u32::MAX`, so the cast is always lossless.
#[inline]
pub fn abs_diff_i32_u32(a: i32, b: i32) -> u32 {
    let diff = i64::from(a) - i64::from(b);
    let mag = diff.unsigned_abs();
    debug_assert!(
        mag <= u64::from(u32::MAX),
        "abs_diff_i32_u32: magnitude out of u32 range: {mag}"
    );
    mag as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_diff_handles_extremes_losslessly() {
        let v = abs_diff_i32_u32(i32::MIN, i32::MAX);
        assert_eq!(v, u32::MAX);
    }

    #[test]
    fn abs_diff_simple_pairs() {
        assert_eq!(abs_diff_i32_u32(123, -456), 579);
        assert_eq!(abs_diff_i32_u32(-456, 123), 579);
        assert_eq!(abs_diff_i32_u32(0, 0), 0);
    }

    #[test]
    fn kg_grams_conversions_round() {
        assert_eq!(kg_to_grams(70.05), 70_050);
        assert_eq!(kg_to_grams(69.98), 69_980);
        assert_eq!(kg_to_grams(f32::NAN), 0);
        assert!((grams_to_kg_centi(70_017) - 70.02).abs() < 1e-4);
        assert!((grams_to_kg_centi(70_014) - 70.01).abs() < 1e-4);
    }

    #[test]
    fn div_round_ties_away_from_zero() {
        assert_eq!(div_round_nearest_i64(5, 10), 1);
        assert_eq!(div_round_nearest_i64(-5, 10), -1);
        assert_eq!(div_round_nearest_i64(14, 10), 1);
        assert_eq!(div_round_nearest_i64(210_052, 3), 70_017);
    }

    #[test]
    fn round_to_one_decimal() {
        assert!((round_to(22.857, 1) - 22.9).abs() < 1e-4);
        assert!((round_to(22.84, 1) - 22.8).abs() < 1e-4);
    }
}
