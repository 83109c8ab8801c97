use std::fmt;

use alloy::primitives::{I256, U256};
use fastnum::{
    D128, UD128, bint, dec128,
    decimal::{Context, Decimal, RoundingMode, UnsignedDecimal},
};

use crate::error::DexError;

/// Number of decimals of the protocol fixed-point wire form.
pub const BASE_DECIMALS: u8 = 18;

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub const fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    /// Converter for 18-decimal protocol values.
    pub const fn base() -> Self {
        Self::new(BASE_DECIMALS)
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> Option<UnsignedDecimal<N>> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())?;
        Some(UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        ))
    }

    /// Exact fixed-point form. `None` if `value` is not finite, has more
    /// fractional digits than the converter or does not fit in 256 bits.
    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> Option<U256> {
        if !value.is_finite() {
            return None;
        }
        self.scale_digits(
            &value.digits().to_radix_le(256),
            value.fractional_digits_count(),
        )
    }

    /// Magnitude of a signed decimal in fixed-point form. The sign is dropped,
    /// the protocol carries it out-of-band.
    pub fn to_magnitude<const N: usize>(&self, value: Decimal<N>) -> Option<U256> {
        if !value.is_finite() {
            return None;
        }
        self.scale_digits(
            &value.digits().to_radix_le(256),
            value.fractional_digits_count(),
        )
    }

    fn scale_digits(&self, digits_le: &[u8], scale: i16) -> Option<U256> {
        let digits = U256::try_from_le_slice(digits_le)?;
        if digits.is_zero() {
            return Some(U256::ZERO);
        }
        let shift = self.decimals - i32::from(scale);
        let power = U256::from(10).checked_pow(U256::from(shift.unsigned_abs()))?;
        if shift >= 0 {
            digits.checked_mul(power)
        } else {
            (digits % power).is_zero().then(|| digits / power)
        }
    }
}

/// Non-negative price, e.g. `100` quote units per base unit.
///
/// Only values with an exact 18-decimal form can be constructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Price {
    value: UD128,
    solidity: U256,
}

impl Price {
    pub const ZERO: Self = Self {
        value: UD128::ZERO,
        solidity: U256::ZERO,
    };

    pub fn new(value: UD128) -> Result<Self, DexError> {
        let solidity = Converter::base().to_unsigned(value).ok_or_else(|| {
            DexError::InvalidArgument(format!(
                "price {value} has no {BASE_DECIMALS}-decimal integer form"
            ))
        })?;
        Ok(Self { value, solidity })
    }

    pub fn value(&self) -> UD128 {
        self.value
    }

    /// 18-decimal integer form.
    pub fn to_solidity(&self) -> U256 {
        self.solidity
    }

    pub fn from_solidity(solidity: U256) -> Option<Self> {
        let value = Converter::base().from_unsigned(solidity)?;
        Some(Self { value, solidity })
    }
}

impl TryFrom<UD128> for Price {
    type Error = DexError;

    fn try_from(value: UD128) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// Fee rate as a fraction of the notional, negative for rebates.
///
/// Only values with an exact 18-decimal form can be constructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Fee {
    value: D128,
    magnitude: U256,
}

impl Fee {
    pub const ZERO: Self = Self {
        value: D128::ZERO,
        magnitude: U256::ZERO,
    };

    pub fn new(value: D128) -> Result<Self, DexError> {
        let magnitude = Converter::base().to_magnitude(value).ok_or_else(|| {
            DexError::InvalidArgument(format!(
                "fee {value} has no {BASE_DECIMALS}-decimal integer form"
            ))
        })?;
        Ok(Self { value, magnitude })
    }

    /// `value` with its known 18-decimal magnitude, for constants.
    pub(crate) const fn exact(value: D128, magnitude: u64) -> Self {
        Self {
            value,
            magnitude: U256::from_limbs([magnitude, 0, 0, 0]),
        }
    }

    /// `bips / 10_000`, e.g. `Fee::from_bips(dec128!(20))` is `0.002`.
    pub fn from_bips(bips: D128) -> Result<Self, DexError> {
        Self::new(bips / dec128!(10000))
    }

    pub fn value(&self) -> D128 {
        self.value
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    /// 18-decimal magnitude, see [`Self::is_negative`] for the sign.
    pub fn to_solidity(&self) -> U256 {
        self.magnitude
    }

    /// 18-decimal signed form.
    pub fn to_signed_solidity(&self) -> I256 {
        let magnitude = I256::from_raw(self.magnitude);
        if self.is_negative() {
            magnitude.saturating_neg()
        } else {
            magnitude
        }
    }
}

impl TryFrom<D128> for Fee {
    type Error = DexError;

    fn try_from(value: D128) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

#[cfg(test)]
mod tests {
    use fastnum::udec128;

    use super::*;

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned(U256::from(1234567890)),
            Some(udec128!(1234567890))
        );
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(1234567890)),
            Some(udec128!(1234.56789))
        );
        assert_eq!(
            Converter::new(12).from_unsigned(U256::from(1234567890)),
            Some(udec128!(0.00123456789))
        );
        assert_eq!(Converter::new(0).from_unsigned::<2>(U256::MAX), None);
    }

    #[test]
    fn test_numeric_converter_to_unsigned() {
        assert_eq!(
            Converter::new(6).to_unsigned(udec128!(1234.56789)),
            Some(U256::from(1_234_567_890u64))
        );
        assert_eq!(
            Converter::new(0).to_unsigned(udec128!(5e3)),
            Some(U256::from(5000))
        );
        // trailing zeros beyond the scale are exact
        assert_eq!(
            Converter::new(2).to_unsigned(udec128!(1.2300)),
            Some(U256::from(123))
        );
        assert_eq!(Converter::new(2).to_unsigned(udec128!(1.234)), None);
        assert_eq!(Converter::new(2).to_unsigned(udec128!(0)), Some(U256::ZERO));
        assert_eq!(
            Converter::new(2).to_magnitude(dec128!(-1.5)),
            Some(U256::from(150))
        );
    }

    #[test]
    fn test_price_solidity_form() {
        let price = Price::new(udec128!(100)).unwrap();
        assert_eq!(price.to_solidity(), U256::from(100u128 * 10u128.pow(18)));
        assert_eq!(
            Price::new(udec128!(987.65432)).unwrap().to_solidity(),
            U256::from(987_654_320_000_000_000_000u128)
        );
        assert_eq!(Price::from_solidity(price.to_solidity()), Some(price));
    }

    #[test]
    fn test_large_price_is_exact() {
        // 1e21 * 1e18 does not fit in 128 bits
        let price = Price::new(udec128!(1000000000000000000000)).unwrap();
        assert_eq!(
            price.to_solidity(),
            U256::from(10u64).pow(U256::from(39))
        );
        assert_eq!(
            Price::new(udec128!(5e50)).unwrap().to_solidity(),
            U256::from(5) * U256::from(10u64).pow(U256::from(68))
        );
    }

    #[test]
    fn test_unrepresentable_values_are_rejected() {
        assert!(matches!(
            Price::new(udec128!(0.0000000000000000001)),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(matches!(
            Price::new(udec128!(1e70)),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(matches!(
            Fee::new(dec128!(0.0020000000000000001)),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(matches!(
            Fee::from_bips(dec128!(0.000000000000001)),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(Fee::new(dec128!(-0.000000000000000001)).is_ok());
    }

    #[test]
    fn test_fee_solidity_form() {
        let fee = Fee::from_bips(dec128!(20)).unwrap();
        assert_eq!(fee.value(), dec128!(0.002));
        assert_eq!(fee.to_solidity(), U256::from(2_000_000_000_000_000u64));
        assert!(!fee.is_negative());

        let rebate = Fee::from_bips(dec128!(-2.5)).unwrap();
        assert!(rebate.is_negative());
        assert_eq!(rebate.to_solidity(), U256::from(250_000_000_000_000u64));
        assert_eq!(
            rebate.to_signed_solidity(),
            I256::try_from(-250_000_000_000_000i64).unwrap()
        );
        assert_eq!(Fee::exact(dec128!(-0.00025), 250_000_000_000_000), rebate);
    }
}
