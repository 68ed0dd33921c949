use web3::types::U256;

/// Largest power of ten that still fits into a `U256`.
const MAX_EXP10: usize = 77;

/// Renders a raw on-chain integer amount as a decimal string scaled down by
/// `10^decimals`.
///
/// The conversion is exact: the integer and fractional parts are split with
/// `U256` arithmetic, trailing zeros are dropped and no exponent notation is
/// ever produced.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let scale = decimals as usize;

    if scale == 0 || raw.is_zero() {
        return raw.to_string();
    }

    let (whole, fraction) = if scale <= MAX_EXP10 {
        raw.div_mod(U256::exp10(scale))
    } else {
        (U256::zero(), raw)
    };

    if fraction.is_zero() {
        return whole.to_string();
    }

    let fraction = format!("{:0>scale$}", fraction.to_string());

    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
