use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calendar::{days_between, PaymentPeriodsInOneYearCalculator};
use crate::decimal::Money;
use crate::errors::Result;
use crate::terms::LoanTerms;
use crate::types::{DaysInMonthType, InterestCalculationPeriodMethod, PeriodFrequency};

const DAYS_IN_YEAR: i64 = 365;

/// derives per-period rates from the annual nominal rate. all rates returned
/// are fractions, not percentages
#[derive(Debug, Clone, Copy)]
pub struct PeriodicInterestRateCalculator<'a> {
    terms: &'a LoanTerms,
    periods: PaymentPeriodsInOneYearCalculator,
}

impl<'a> PeriodicInterestRateCalculator<'a> {
    pub fn new(terms: &'a LoanTerms) -> Self {
        Self {
            terms,
            periods: PaymentPeriodsInOneYearCalculator::new(),
        }
    }

    pub fn daily_rate(&self) -> Decimal {
        self.terms.annual_nominal_interest_rate().as_fraction() / Decimal::from(DAYS_IN_YEAR)
    }

    /// rate for one repayment period under the same-as-repayment method
    pub fn nominal_periodic_rate(&self) -> Decimal {
        let periods_in_year = Decimal::from(self.periods.periods_per_year(self.terms.repayment_frequency()));
        self.terms.annual_nominal_interest_rate().as_fraction() / periods_in_year
            * Decimal::from(self.terms.repayment_every())
    }

    /// days the daily method charges for a period of `actual_days`
    pub fn days_charged_for_period(&self, actual_days: i64) -> i64 {
        self.fixed_days_per_period().unwrap_or(actual_days)
    }

    /// period length when the day-count conventions pin it regardless of the calendar
    fn fixed_days_per_period(&self) -> Option<i64> {
        let every = i64::from(self.terms.repayment_every());
        match self.terms.repayment_frequency() {
            PeriodFrequency::Months => match self.terms.days_in_month() {
                DaysInMonthType::Days30 => Some(30 * every),
                DaysInMonthType::Actual => None,
            },
            PeriodFrequency::Years => self.terms.days_in_year().fixed_days().map(|days| i64::from(days) * every),
            PeriodFrequency::Days | PeriodFrequency::Weeks => None,
        }
    }

    /// rate for a repayment period spanning `actual_days`
    pub fn periodic_rate(&self, actual_days: i64) -> Decimal {
        match self.terms.interest_calculation_period_method() {
            InterestCalculationPeriodMethod::SameAsRepaymentPeriod => self.nominal_periodic_rate(),
            InterestCalculationPeriodMethod::Daily => {
                self.daily_rate() * Decimal::from(self.days_charged_for_period(actual_days).max(0))
            }
        }
    }

    /// rate fed to the annuity formula: a regular period with 30-day months
    /// and 365-day years
    pub fn installment_rate(&self) -> Decimal {
        match self.terms.interest_calculation_period_method() {
            InterestCalculationPeriodMethod::SameAsRepaymentPeriod => self.nominal_periodic_rate(),
            InterestCalculationPeriodMethod::Daily => {
                let every = i64::from(self.terms.repayment_every());
                let days = match self.terms.repayment_frequency() {
                    PeriodFrequency::Days => every,
                    PeriodFrequency::Weeks => 7 * every,
                    PeriodFrequency::Months => 30 * every,
                    PeriodFrequency::Years => DAYS_IN_YEAR * every,
                };
                self.daily_rate() * Decimal::from(days)
            }
        }
    }

    /// rate for an arbitrary sub-span of a period. a span of whole repayment
    /// periods is charged like that many periods: the periodic rate, or under
    /// the daily method the fixed period length when 30-day months or a fixed
    /// year apply. anything else is charged by actual days
    pub fn rate_for_span(&self, from: NaiveDate, to: NaiveDate) -> Result<Decimal> {
        if to <= from {
            return Ok(Decimal::ZERO);
        }
        if let Some(periods) = self.whole_periods_between(from, to)? {
            let periods = Decimal::from(periods);
            match self.terms.interest_calculation_period_method() {
                InterestCalculationPeriodMethod::SameAsRepaymentPeriod => {
                    return Ok(self.nominal_periodic_rate() * periods);
                }
                InterestCalculationPeriodMethod::Daily => {
                    if let Some(days) = self.fixed_days_per_period() {
                        return Ok(self.daily_rate() * Decimal::from(days) * periods);
                    }
                }
            }
        }
        Ok(self.daily_rate() * Decimal::from(days_between(from, to)))
    }

    fn whole_periods_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Option<u32>> {
        let frequency = self.terms.repayment_frequency();
        let every = self.terms.repayment_every();
        let mut periods = 1u32;
        loop {
            let Some(units) = periods.checked_mul(every) else {
                return Ok(None);
            };
            let stepped = frequency.add_to(from, units)?;
            if stepped == to {
                return Ok(Some(periods));
            }
            if stepped > to {
                return Ok(None);
            }
            periods += 1;
        }
    }

    /// interest on `balance` at `rate`, rounded to the currency
    pub fn interest_on(&self, balance: Money, rate: Decimal) -> Money {
        balance.multiplied_by(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{MonetaryCurrency, Rate};
    use crate::types::{DaysInYearType, InterestMethod};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn terms(method: InterestCalculationPeriodMethod, frequency: PeriodFrequency) -> LoanTerms {
        LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 10_000))
            .annual_interest_rate(Rate::from_percentage(dec!(36.5)))
            .interest_method(InterestMethod::DecliningBalance)
            .interest_calculation_period_method(method)
            .repayments(12, 1, frequency)
            .expected_disbursement_date(date(2024, 1, 1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_same_as_repayment_rate() {
        let t = terms(InterestCalculationPeriodMethod::SameAsRepaymentPeriod, PeriodFrequency::Months);
        let calc = PeriodicInterestRateCalculator::new(&t);
        let expected = dec!(0.365) / dec!(12);
        assert_eq!(calc.periodic_rate(16), expected);
        assert_eq!(calc.periodic_rate(31), expected);
        assert_eq!(calc.installment_rate(), expected);
    }

    #[test]
    fn test_daily_rate_by_actual_days() {
        let t = terms(InterestCalculationPeriodMethod::Daily, PeriodFrequency::Months);
        let calc = PeriodicInterestRateCalculator::new(&t);
        assert_eq!(calc.daily_rate(), dec!(0.001));
        assert_eq!(calc.periodic_rate(31), dec!(0.031));
        assert_eq!(calc.installment_rate(), dec!(0.030));
    }

    #[test]
    fn test_daily_rate_with_thirty_day_months() {
        let t = LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 10_000))
            .annual_interest_rate(Rate::from_percentage(dec!(36.5)))
            .interest_calculation_period_method(InterestCalculationPeriodMethod::Daily)
            .days_in_month(DaysInMonthType::Days30)
            .repayments(12, 2, PeriodFrequency::Months)
            .expected_disbursement_date(date(2024, 1, 1))
            .build()
            .unwrap();
        let calc = PeriodicInterestRateCalculator::new(&t);
        assert_eq!(calc.days_charged_for_period(60), 60);
        assert_eq!(calc.days_charged_for_period(62), 60);
        assert_eq!(calc.periodic_rate(62), dec!(0.060));
    }

    #[test]
    fn test_span_of_whole_months_uses_thirty_days() {
        let t = LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 10_000))
            .annual_interest_rate(Rate::from_percentage(dec!(36.5)))
            .interest_calculation_period_method(InterestCalculationPeriodMethod::Daily)
            .days_in_month(DaysInMonthType::Days30)
            .repayments(12, 1, PeriodFrequency::Months)
            .expected_disbursement_date(date(2024, 1, 1))
            .build()
            .unwrap();
        let calc = PeriodicInterestRateCalculator::new(&t);

        // february has 29 days in 2024 but is charged as 30
        let february = calc.rate_for_span(date(2024, 2, 1), date(2024, 3, 1)).unwrap();
        assert_eq!(february, dec!(0.030));
        assert_eq!(february, calc.periodic_rate(29));

        let ten_days = calc.rate_for_span(date(2024, 2, 1), date(2024, 2, 11)).unwrap();
        assert_eq!(ten_days, dec!(0.010));
    }

    #[test]
    fn test_yearly_periods_use_fixed_year_length() {
        let t = LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 10_000))
            .annual_interest_rate(Rate::from_percentage(dec!(36.5)))
            .interest_calculation_period_method(InterestCalculationPeriodMethod::Daily)
            .days_in_year(DaysInYearType::Days360)
            .repayments(3, 1, PeriodFrequency::Years)
            .expected_disbursement_date(date(2024, 1, 1))
            .build()
            .unwrap();
        let calc = PeriodicInterestRateCalculator::new(&t);
        assert_eq!(calc.days_charged_for_period(366), 360);
    }

    #[test]
    fn test_rate_for_span() {
        let t = terms(InterestCalculationPeriodMethod::SameAsRepaymentPeriod, PeriodFrequency::Months);
        let calc = PeriodicInterestRateCalculator::new(&t);

        // whole months use the periodic rate
        let two_months = calc.rate_for_span(date(2024, 1, 15), date(2024, 3, 15)).unwrap();
        assert_eq!(two_months, dec!(0.365) / dec!(12) * dec!(2));

        // partial spans fall back to days
        let ten_days = calc.rate_for_span(date(2024, 1, 15), date(2024, 1, 25)).unwrap();
        assert_eq!(ten_days, dec!(0.010));

        assert_eq!(calc.rate_for_span(date(2024, 1, 25), date(2024, 1, 15)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_interest_on_rounds() {
        let t = terms(InterestCalculationPeriodMethod::Daily, PeriodFrequency::Months);
        let calc = PeriodicInterestRateCalculator::new(&t);
        let balance = Money::from_str_exact(MonetaryCurrency::usd(), "1234.56").unwrap();
        assert_eq!(calc.interest_on(balance, dec!(0.031)).amount(), dec!(38.27));
    }
}
