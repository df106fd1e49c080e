use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{Result, ScheduleError};

/// three letter iso currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");
    pub const KES: CurrencyCode = CurrencyCode(*b"KES");

    pub fn as_str(&self) -> &str {
        // constructed only from ascii uppercase bytes
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!("currency code must be three letters, got {s:?}"),
            });
        }
        let mut code = [0u8; 3];
        for (slot, b) in code.iter_mut().zip(bytes) {
            *slot = b.to_ascii_uppercase();
        }
        Ok(CurrencyCode(code))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// rounding applied whenever a money amount is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    HalfEven,
    HalfUp,
    HalfDown,
    Up,
    Down,
    Ceiling,
    Floor,
}

impl RoundingMode {
    pub fn strategy(&self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Ceiling => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

/// currency configuration as supplied by the host's currency provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonetaryCurrency {
    pub code: CurrencyCode,
    pub decimal_places: u32,
    /// installment amounts are rounded to a multiple of this when set
    pub in_multiples_of: Option<u32>,
    #[serde(default)]
    pub rounding: RoundingMode,
}

impl MonetaryCurrency {
    pub fn new(code: CurrencyCode, decimal_places: u32) -> Self {
        Self {
            code,
            decimal_places,
            in_multiples_of: None,
            rounding: RoundingMode::HalfEven,
        }
    }

    pub fn usd() -> Self {
        Self::new(CurrencyCode::USD, 2)
    }

    pub fn with_multiples_of(mut self, multiple: u32) -> Self {
        self.in_multiples_of = Some(multiple);
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// round a raw amount to this currency's scale
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimal_places, self.rounding.strategy())
    }
}

/// money amount bound to a currency, always held at the currency's scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: MonetaryCurrency,
}

impl Money {
    /// create from decimal, rounding to the currency scale
    pub fn of(currency: MonetaryCurrency, amount: Decimal) -> Self {
        Money {
            amount: currency.round(amount),
            currency,
        }
    }

    pub fn zero(currency: MonetaryCurrency) -> Self {
        Money {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// create from integer amount (dollars, euros, etc)
    pub fn from_major(currency: MonetaryCurrency, amount: i64) -> Self {
        Money::of(currency, Decimal::from(amount))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(currency: MonetaryCurrency, s: &str) -> Result<Self> {
        let amount = Decimal::from_str(s).map_err(|e| ScheduleError::InvalidConfiguration {
            message: format!("invalid amount {s:?}: {e}"),
        })?;
        Ok(Money::of(currency, amount))
    }

    /// zero in the same currency
    pub fn to_zero(&self) -> Self {
        Money::zero(self.currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> MonetaryCurrency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money {
            amount: self.amount.abs(),
            currency: self.currency,
        }
    }

    pub fn min(self, other: Self) -> Self {
        if other < self { other } else { self }
    }

    pub fn max(self, other: Self) -> Self {
        if other > self { other } else { self }
    }

    /// multiply and round back to the currency scale
    pub fn multiplied_by(&self, factor: Decimal) -> Self {
        Money::of(self.currency, self.amount * factor)
    }

    /// divide and round back to the currency scale
    pub fn divided_by(&self, divisor: Decimal) -> Result<Self> {
        let amount = self
            .amount
            .checked_div(divisor)
            .ok_or_else(|| ScheduleError::CalculationError {
                message: format!("cannot divide {} by {}", self, divisor),
            })?;
        Ok(Money::of(self.currency, amount))
    }

    /// round to the nearest multiple, half away from zero
    pub fn round_to_multiples_of(&self, multiple: u32) -> Self {
        if multiple == 0 {
            return *self;
        }
        let m = Decimal::from(multiple);
        let units = (self.amount / m).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Money::of(self.currency, units * m)
    }

    pub fn checked_add(self, other: Money) -> Result<Money> {
        self.ensure_same_currency(&other)?;
        Ok(Money::of(self.currency, self.amount + other.amount))
    }

    pub fn checked_sub(self, other: Money) -> Result<Money> {
        self.ensure_same_currency(&other)?;
        Ok(Money::of(self.currency, self.amount - other.amount))
    }

    /// sum amounts in a currency, zero when empty
    pub fn total<I: IntoIterator<Item = Money>>(currency: MonetaryCurrency, items: I) -> Money {
        items.into_iter().fold(Money::zero(currency), |acc, m| acc + m)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency.code != other.currency.code {
            return Err(ScheduleError::CurrencyMismatch {
                expected: self.currency.code,
                found: other.currency.code,
            });
        }
        Ok(())
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency.code != other.currency.code {
            return None;
        }
        Some(self.amount.cmp(&other.amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency.code, self.amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        debug_assert_eq!(self.currency.code, other.currency.code);
        Money::of(self.currency, self.amount + other.amount)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        debug_assert_eq!(self.currency.code, other.currency.code);
        Money::of(self.currency, self.amount - other.amount)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money {
            amount: -self.amount,
            currency: self.currency,
        }
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        self.multiplied_by(other)
    }
}

/// annual nominal rate held as a percentage (12 means 12%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from percentage (e.g., 12 for 12%)
    pub fn from_percentage(p: Decimal) -> Self {
        Rate(p)
    }

    /// create from fraction (e.g., 0.12 for 12%)
    pub fn from_fraction(f: Decimal) -> Self {
        Rate(f * Decimal::ONE_HUNDRED)
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
