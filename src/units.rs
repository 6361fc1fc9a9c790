use alloy_primitives::U256;
use std::fmt;

/// Native token amounts are carried on-chain as integers scaled by 10^18.
pub const WEI_DECIMALS: u8 = 18;
pub const DISPLAY_DECIMALS: u8 = 4;

/// An amount of the native token, held in wei.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EthAmount(U256);

impl EthAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    pub const fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub fn from_wei_u128(wei: u128) -> Self {
        Self(U256::from(wei))
    }

    pub fn wei(self) -> U256 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Decimal rendering with `decimals` fractional digits, rounded half-up.
    ///
    /// Done in integer arithmetic so large balances never lose whole-token precision.
    pub fn format_fixed(self, decimals: u8) -> String {
        let decimals = decimals.min(WEI_DECIMALS);
        let ten = U256::from(10u8);
        let unit = ten.pow(U256::from(WEI_DECIMALS - decimals));
        let half = unit / U256::from(2u8);
        let scaled = self.0.saturating_add(half) / unit;
        if decimals == 0 {
            return scaled.to_string();
        }
        let denom = ten.pow(U256::from(decimals));
        let whole = scaled / denom;
        let frac = (scaled % denom).to_string();
        format!("{whole}.{frac:0>width$}", width = decimals as usize)
    }
}

impl fmt::Display for EthAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_fixed(DISPLAY_DECIMALS))
    }
}

/// Parses a JSON-RPC hex quantity such as `"0x1a"`. `"0x"` is read as zero.
pub fn parse_quantity(raw: &str) -> Option<U256> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

pub fn format_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn format_fixed__renders_tenth_of_an_eth() {
        let amount = EthAmount::from_wei_u128(100_000_000_000_000_000);
        assert_eq!("0.1000", amount.to_string());
    }

    #[test]
    fn format_fixed__rounds_half_up_at_display_precision() {
        let amount = EthAmount::from_wei_u128(1_234_560_000_000_000_000);
        assert_eq!("1.2346", amount.to_string());
        let amount = EthAmount::from_wei_u128(1_234_549_999_999_999_999);
        assert_eq!("1.2345", amount.to_string());
    }

    #[test]
    fn format_fixed__keeps_whole_tokens_beyond_f64_precision() {
        let wei = U256::from(123_456_789_012_345_678u128) * U256::from(10u128.pow(18));
        let amount = EthAmount::from_wei(wei);
        assert_eq!("123456789012345678.0000", amount.to_string());
    }

    #[test]
    fn format_fixed__zero() {
        assert_eq!("0.0000", EthAmount::ZERO.to_string());
        assert_eq!("0", EthAmount::ZERO.format_fixed(0));
    }

    #[test]
    fn parse_quantity__accepts_prefixed_and_empty_hex() {
        assert_eq!(Some(U256::from(1u8)), parse_quantity("0x1"));
        assert_eq!(Some(U256::from(0x2105u64)), parse_quantity("0x2105"));
        assert_eq!(Some(U256::ZERO), parse_quantity("0x"));
        assert_eq!(None, parse_quantity("0xzz"));
    }

    #[test]
    fn format_quantity__is_minimal_hex() {
        assert_eq!("0x0", format_quantity(U256::ZERO));
        assert_eq!("0x5af3107a4000", format_quantity(U256::from(100_000_000_000_000u64)));
    }
}
