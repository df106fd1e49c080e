use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::{Result, ScheduleError};
use crate::terms::LoanTerms;
use crate::types::PeriodFrequency;

/// whole days between two dates, negative when `to` is before `from`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// converts period frequencies to yearly counts and interest-free dates to
/// fractions of a repayment period
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentPeriodsInOneYearCalculator;

impl PaymentPeriodsInOneYearCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn periods_per_year(&self, frequency: PeriodFrequency) -> u32 {
        match frequency {
            PeriodFrequency::Days => 365,
            PeriodFrequency::Weeks => 52,
            PeriodFrequency::Months => 12,
            PeriodFrequency::Years => 1,
        }
    }

    /// express `days` as a fraction of one repayment period
    pub fn repayment_period_fraction(&self, frequency: PeriodFrequency, every: u32, days: i64) -> Decimal {
        let days = Decimal::from(days.max(0));
        let every = Decimal::from(every);
        match frequency {
            // raw day periods scale by `every` rather than divide
            PeriodFrequency::Days => days * every,
            PeriodFrequency::Weeks => days / (Decimal::from(7) * every),
            PeriodFrequency::Months => days / (Decimal::from(30) * every),
            PeriodFrequency::Years => days / (Decimal::from(365) * every),
        }
    }

    /// fraction of the period `[period_start, due_date]` that falls before
    /// interest starts being charged; zero when the date is outside it
    pub fn portion_of_period_interest_charging_grace(
        &self,
        period_start: NaiveDate,
        due_date: NaiveDate,
        interest_charged_from: Option<NaiveDate>,
        frequency: PeriodFrequency,
        every: u32,
    ) -> Decimal {
        match interest_charged_from {
            Some(from) if from > period_start && from <= due_date => {
                self.repayment_period_fraction(frequency, every, days_between(period_start, from))
            }
            _ => Decimal::ZERO,
        }
    }

    /// whole repayment periods that end before `interest_charged_from`, plus
    /// the fraction of the period it falls in
    pub fn repayment_period_as_fraction_of_days(
        &self,
        frequency: PeriodFrequency,
        every: u32,
        interest_charged_from: NaiveDate,
        due_dates: &[NaiveDate],
        disbursement_date: NaiveDate,
    ) -> Decimal {
        if interest_charged_from <= disbursement_date {
            return Decimal::ZERO;
        }

        let mut period_start = disbursement_date;
        let mut skipped = Decimal::ZERO;
        for &due_date in due_dates {
            if interest_charged_from <= due_date {
                return skipped
                    + self.portion_of_period_interest_charging_grace(
                        period_start,
                        due_date,
                        Some(interest_charged_from),
                        frequency,
                        every,
                    );
            }
            skipped += Decimal::ONE;
            period_start = due_date;
        }
        skipped
    }
}

/// produces the due dates of a loan from its repayment terms
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduledDateGenerator;

impl ScheduledDateGenerator {
    pub fn new() -> Self {
        Self
    }

    /// first due date: the explicit start date if given, otherwise one step
    /// after disbursement
    pub fn first_repayment_date(&self, terms: &LoanTerms) -> Result<NaiveDate> {
        match terms
            .repayments_starting_from()
            .or(terms.calculated_repayments_starting_from())
        {
            Some(date) => Ok(date),
            None => terms
                .repayment_frequency()
                .add_to(terms.expected_disbursement_date(), terms.repayment_every()),
        }
    }

    /// all due dates, one per installment.
    ///
    /// Day and week periods step from the previous due date. Month and year
    /// periods step from the first due date so a month-end schedule keeps
    /// landing on month ends after a short month.
    pub fn generate(&self, terms: &LoanTerms) -> Result<Vec<NaiveDate>> {
        // terms only hold start dates after disbursement
        let first = self.first_repayment_date(terms)?;

        let frequency = terms.repayment_frequency();
        let every = terms.repayment_every();
        let count = terms.number_of_repayments() as usize;

        let mut dates = Vec::with_capacity(count);
        dates.push(first);
        for k in 1..terms.number_of_repayments() {
            let next = match frequency {
                PeriodFrequency::Days | PeriodFrequency::Weeks => {
                    let previous = dates[dates.len() - 1];
                    frequency.add_to(previous, every)?
                }
                PeriodFrequency::Months | PeriodFrequency::Years => {
                    let steps = k.checked_mul(every).ok_or_else(|| ScheduleError::InvalidDate {
                        message: format!("repayment {} is out of range", k + 1),
                    })?;
                    frequency.add_to(first, steps)?
                }
            };
            dates.push(next);
        }
        Ok(dates)
    }

    /// disbursement date that would make the first period regular
    pub fn ideal_disbursement_date(&self, terms: &LoanTerms, due_dates: &[NaiveDate]) -> Result<NaiveDate> {
        let first = due_dates.first().copied().ok_or_else(|| ScheduleError::InvalidDate {
            message: "no due dates to derive an ideal disbursement date from".to_string(),
        })?;
        terms
            .repayment_frequency()
            .subtract_from(first, terms.repayment_every())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{MonetaryCurrency, Money, Rate};
    use crate::types::{AmortizationMethod, InterestMethod};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_terms(disbursed: NaiveDate, first: Option<NaiveDate>, n: u32) -> LoanTerms {
        let mut builder = LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 12_000))
            .annual_interest_rate(Rate::from_percentage(dec!(12)))
            .interest_method(InterestMethod::DecliningBalance)
            .amortization_method(AmortizationMethod::EqualInstallments)
            .repayments(n, 1, PeriodFrequency::Months)
            .expected_disbursement_date(disbursed);
        if let Some(first) = first {
            builder = builder.repayments_starting_from(first);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_periods_per_year() {
        let calc = PaymentPeriodsInOneYearCalculator::new();
        assert_eq!(calc.periods_per_year(PeriodFrequency::Days), 365);
        assert_eq!(calc.periods_per_year(PeriodFrequency::Weeks), 52);
        assert_eq!(calc.periods_per_year(PeriodFrequency::Months), 12);
        assert_eq!(calc.periods_per_year(PeriodFrequency::Years), 1);
    }

    #[test]
    fn test_repayment_period_fraction() {
        let calc = PaymentPeriodsInOneYearCalculator::new();
        assert_eq!(calc.repayment_period_fraction(PeriodFrequency::Months, 1, 15), dec!(0.5));
        assert_eq!(calc.repayment_period_fraction(PeriodFrequency::Months, 2, 15), dec!(0.25));
        assert_eq!(calc.repayment_period_fraction(PeriodFrequency::Weeks, 1, 7), Decimal::ONE);
        assert_eq!(calc.repayment_period_fraction(PeriodFrequency::Days, 2, 3), dec!(6));
        assert_eq!(calc.repayment_period_fraction(PeriodFrequency::Years, 1, 73), dec!(0.2));
    }

    #[test]
    fn test_portion_of_period_grace_outside_period_is_zero() {
        let calc = PaymentPeriodsInOneYearCalculator::new();
        let start = date(2024, 1, 1);
        let due = date(2024, 2, 1);
        assert_eq!(
            calc.portion_of_period_interest_charging_grace(start, due, None, PeriodFrequency::Months, 1),
            Decimal::ZERO
        );
        assert_eq!(
            calc.portion_of_period_interest_charging_grace(
                start,
                due,
                Some(date(2024, 3, 1)),
                PeriodFrequency::Months,
                1
            ),
            Decimal::ZERO
        );
        assert_eq!(
            calc.portion_of_period_interest_charging_grace(
                start,
                due,
                Some(date(2024, 1, 16)),
                PeriodFrequency::Months,
                1
            ),
            dec!(0.5)
        );
    }

    #[test]
    fn test_fraction_of_days_counts_skipped_periods() {
        let calc = PaymentPeriodsInOneYearCalculator::new();
        let disbursed = date(2024, 1, 1);
        let dues = [date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)];

        // inside period 3, 15 days after it started
        let fraction = calc.repayment_period_as_fraction_of_days(
            PeriodFrequency::Months,
            1,
            date(2024, 3, 16),
            &dues,
            disbursed,
        );
        assert_eq!(fraction, dec!(2.5));

        // on or before disbursement means no grace at all
        let fraction =
            calc.repayment_period_as_fraction_of_days(PeriodFrequency::Months, 1, disbursed, &dues, disbursed);
        assert_eq!(fraction, Decimal::ZERO);
    }

    #[test]
    fn test_generate_monthly_dates() {
        let terms = monthly_terms(date(2024, 1, 1), None, 3);
        let dates = ScheduledDateGenerator::new().generate(&terms).unwrap();
        assert_eq!(dates, vec![date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]);
    }

    #[test]
    fn test_irregular_first_period_does_not_propagate() {
        let terms = monthly_terms(date(2024, 1, 15), Some(date(2024, 1, 31)), 4);
        let generator = ScheduledDateGenerator::new();
        let dates = generator.generate(&terms).unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]
        );
        assert_eq!(days_between(terms.expected_disbursement_date(), dates[0]), 16);

        let ideal = generator.ideal_disbursement_date(&terms, &dates).unwrap();
        assert_eq!(ideal, date(2023, 12, 31));
    }

    #[test]
    fn test_weekly_dates_step_from_previous() {
        let terms = LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 1_000))
            .annual_interest_rate(Rate::from_percentage(dec!(10)))
            .interest_method(InterestMethod::Flat)
            .amortization_method(AmortizationMethod::EqualPrincipal)
            .repayments(3, 2, PeriodFrequency::Weeks)
            .expected_disbursement_date(date(2024, 1, 1))
            .build()
            .unwrap();
        let dates = ScheduledDateGenerator::new().generate(&terms).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 15), date(2024, 1, 29), date(2024, 2, 12)]);
    }

    #[test]
    fn test_first_repayment_before_disbursement_rejected() {
        let result = LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 12_000))
            .annual_interest_rate(Rate::from_percentage(dec!(12)))
            .repayments(3, 1, PeriodFrequency::Months)
            .expected_disbursement_date(date(2024, 1, 15))
            .repayments_starting_from(date(2024, 1, 10))
            .build();
        assert!(matches!(result, Err(ScheduleError::InvalidDate { .. })));
    }
}
