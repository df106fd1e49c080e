use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::financial::pmt;
use crate::interest::{InterestMethodStrategy, PeriodContext, PeriodicInterestRateCalculator, PrincipalInterest};
use crate::types::AmortizationMethod;

/// interest on the outstanding balance each period
#[derive(Debug, Clone)]
pub struct DecliningBalanceStrategy {
    amortization: AmortizationMethod,
    /// level installment, recomputed after any zero-principal period
    fixed_installment: Option<Money>,
    fixed_principal: Option<Money>,
}

impl DecliningBalanceStrategy {
    pub fn new(amortization: AmortizationMethod) -> Self {
        Self {
            amortization,
            fixed_installment: None,
            fixed_principal: None,
        }
    }

    /// forget cached installment amounts after the balance moved unexpectedly
    pub fn reset_installment(&mut self) {
        self.fixed_installment = None;
        self.fixed_principal = None;
    }

    /// split a period given its interest before grace and the balance the
    /// principal is amortized from
    pub fn split(&mut self, ctx: &PeriodContext<'_>, interest_before_grace: Money) -> Result<PrincipalInterest> {
        let terms = ctx.terms;
        let zero = ctx.outstanding_balance.to_zero();
        let (interest, brought_forward) = apply_interest_grace(ctx, interest_before_grace);

        let principal = if terms.is_principal_grace_period(ctx.period_number) {
            zero
        } else {
            match self.amortization {
                AmortizationMethod::EqualInstallments => {
                    let installment = self.installment_amount(ctx)?;
                    (installment - interest).max(zero)
                }
                AmortizationMethod::EqualPrincipal => self.principal_per_period(ctx)?,
            }
        };

        if principal.is_zero() {
            self.fixed_installment = None;
        }

        Ok(PrincipalInterest::new(principal, interest, brought_forward))
    }

    fn installment_amount(&mut self, ctx: &PeriodContext<'_>) -> Result<Money> {
        if let Some(installment) = self.fixed_installment {
            return Ok(installment);
        }
        let terms = ctx.terms;
        let installment = match terms.fixed_emi_amount() {
            Some(emi) => emi,
            None => {
                let remaining = terms.number_of_repayments() - (ctx.period_number - 1);
                let rate = PeriodicInterestRateCalculator::new(terms).installment_rate();
                let amount = annuity(rate, remaining, ctx.outstanding_balance)?;
                match terms.installment_amount_in_multiples_of() {
                    Some(multiple) => amount.round_to_multiples_of(multiple),
                    None => amount,
                }
            }
        };
        self.fixed_installment = Some(installment);
        Ok(installment)
    }

    fn principal_per_period(&mut self, ctx: &PeriodContext<'_>) -> Result<Money> {
        if let Some(principal) = self.fixed_principal {
            return Ok(principal);
        }
        let terms = ctx.terms;
        let paid_or_grace = (ctx.period_number - 1).max(terms.grace().principal);
        let remaining = terms
            .number_of_repayments()
            .checked_sub(paid_or_grace)
            .filter(|n| *n > 0)
            .ok_or(ScheduleError::NoPaymentPeriods {
                field: "principal grace",
            })?;
        let principal = ctx.outstanding_balance.divided_by(Decimal::from(remaining))?;
        self.fixed_principal = Some(principal);
        Ok(principal)
    }
}

impl InterestMethodStrategy for DecliningBalanceStrategy {
    fn name(&self) -> &'static str {
        "declining balance"
    }

    fn principal_interest_for_period(&mut self, ctx: &PeriodContext<'_>) -> Result<PrincipalInterest> {
        let calc = PeriodicInterestRateCalculator::new(ctx.terms);
        let rate = calc.periodic_rate(ctx.days_in_period_for_interest());
        let interest = calc.interest_on(ctx.outstanding_balance, rate);
        self.split(ctx, interest)
    }
}

/// level payment amortizing `balance` over `periods` at `rate`
fn annuity(rate: Decimal, periods: u32, balance: Money) -> Result<Money> {
    let to_f64 = |value: Decimal| {
        value.to_f64().ok_or_else(|| ScheduleError::CalculationError {
            message: format!("{value} does not fit a float"),
        })
    };
    let payment = pmt(to_f64(rate)?, f64::from(periods), -to_f64(balance.amount())?, 0.0, false);
    let payment = Decimal::from_f64(payment).ok_or_else(|| ScheduleError::CalculationError {
        message: format!("installment {payment} is not a finite amount"),
    })?;
    Ok(Money::of(balance.currency(), payment))
}

/// apply whole-period and fractional grace to a period's interest.
///
/// Returns the interest due now and the deferred interest still owed after
/// this period. Charging grace waives the whole period. Interest-free days
/// waive their share of the period once it passes the partial grace
/// threshold; what is left is deferred during payment grace and paid with
/// anything already deferred otherwise.
fn apply_interest_grace(ctx: &PeriodContext<'_>, interest_before_grace: Money) -> (Money, Money) {
    let terms = ctx.terms;
    let k = ctx.period_number;
    let zero = interest_before_grace.to_zero();
    let brought_forward = ctx.interest_brought_forward;

    if terms.is_interest_free_grace_period(k) {
        return (zero, brought_forward);
    }

    let charged = interest_before_grace - interest_before_grace.multiplied_by(waived_share(ctx));
    if terms.is_interest_payment_grace_period(k) {
        (zero, brought_forward + charged)
    } else if charged.is_positive() {
        (brought_forward + charged, zero)
    } else {
        (zero, brought_forward)
    }
}

/// share of the period's interest waived by interest-free days
fn waived_share(ctx: &PeriodContext<'_>) -> Decimal {
    if ctx.terms.interest_charged_from().is_none() {
        return Decimal::ZERO;
    }
    if ctx.grace_fraction >= Decimal::ONE {
        Decimal::ONE
    } else if ctx.grace_fraction > ctx.settings.partial_grace_threshold {
        ctx.grace_fraction
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleSettings;
    use crate::decimal::{MonetaryCurrency, Rate};
    use crate::terms::{LoanTerms, LoanTermsBuilder};
    use crate::types::{InterestMethod, PeriodFrequency};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd(amount: i64) -> Money {
        Money::from_major(MonetaryCurrency::usd(), amount)
    }

    fn builder(amortization: AmortizationMethod) -> LoanTermsBuilder {
        LoanTerms::builder()
            .principal(usd(100_000))
            .annual_interest_rate(Rate::from_percentage(dec!(12)))
            .interest_method(InterestMethod::DecliningBalance)
            .amortization_method(amortization)
            .repayments(12, 1, PeriodFrequency::Months)
            .expected_disbursement_date(date(2024, 1, 1))
    }

    /// generate every period with a plain running balance
    fn run(terms: &LoanTerms, settings: &ScheduleSettings, fractions: &[Decimal]) -> Vec<PrincipalInterest> {
        let fees = BTreeMap::new();
        let mut strategy = DecliningBalanceStrategy::new(terms.amortization_method());
        let mut balance = terms.principal();
        let mut brought_forward = balance.to_zero();
        let mut start = date(2024, 1, 1);
        let mut out = Vec::new();
        for k in 1..=terms.number_of_repayments() {
            let due = PeriodFrequency::Months.add_to(date(2024, 1, 1), k).unwrap();
            let ctx = PeriodContext {
                terms,
                settings,
                period_number: k,
                period_start: start,
                interest_start: start,
                due_date: due,
                loan_end_date: date(2025, 1, 1),
                grace_fraction: fractions.get(k as usize - 1).copied().unwrap_or(Decimal::ZERO),
                outstanding_balance: balance,
                interest_brought_forward: brought_forward,
                fees_by_date: &fees,
            };
            let pi = strategy.principal_interest_for_period(&ctx).unwrap();
            balance -= pi.principal;
            brought_forward = pi.interest_brought_forward;
            start = due;
            out.push(pi);
        }
        out
    }

    #[test]
    fn test_level_installment() {
        let terms = builder(AmortizationMethod::EqualInstallments).build().unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);

        assert_eq!(periods[0].interest, usd(1_000));
        assert_eq!(periods[0].principal.amount(), dec!(7884.88));
        for pair in periods.windows(2).take(10) {
            assert_eq!(pair[0].principal + pair[0].interest, pair[1].principal + pair[1].interest);
            assert!(pair[1].interest < pair[0].interest);
            assert!(pair[1].principal > pair[0].principal);
        }
    }

    #[test]
    fn test_equal_principal() {
        let terms = builder(AmortizationMethod::EqualPrincipal)
            .principal(usd(12_000))
            .annual_interest_rate(Rate::ZERO)
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);
        assert!(periods.iter().all(|p| p.principal == usd(1_000) && p.interest.is_zero()));
    }

    #[test]
    fn test_principal_grace_recomputes_installment() {
        let terms = builder(AmortizationMethod::EqualInstallments)
            .principal_grace(2)
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);
        assert!(periods[..2].iter().all(|p| p.principal.is_zero()));
        assert_eq!(periods[0].interest, usd(1_000));

        // remaining 10 periods amortize the untouched balance
        let expected = annuity(dec!(0.01), 10, usd(100_000)).unwrap();
        assert_eq!(periods[2].principal + periods[2].interest, expected);
    }

    #[test]
    fn test_payment_grace_defers_interest() {
        let terms = builder(AmortizationMethod::EqualPrincipal).interest_payment_grace(2).build().unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);
        assert!(periods[0].interest.is_zero());
        assert!(periods[1].interest.is_zero());
        // 1000.00 on the full balance, then 916.67 on 91666.67
        assert_eq!(periods[1].interest_brought_forward.amount(), dec!(1916.67));
        // 833.33 on 83333.34 plus both deferred amounts
        assert_eq!(periods[2].interest.amount(), dec!(2750.00));
        assert!(periods[2].interest_brought_forward.is_zero());
    }

    #[test]
    fn test_charging_grace_waives_interest() {
        let terms = builder(AmortizationMethod::EqualPrincipal)
            .interest_payment_grace(2)
            .interest_charging_grace(2)
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);
        assert!(periods[..2].iter().all(|p| p.interest.is_zero()));
        assert!(periods[1].interest_brought_forward.is_zero());
        assert_eq!(periods[2].interest.amount(), dec!(833.33));
    }

    #[test]
    fn test_fractional_grace() {
        let terms = builder(AmortizationMethod::EqualPrincipal)
            .interest_charged_from(date(2024, 2, 16))
            .build()
            .unwrap();
        let settings = ScheduleSettings::default();
        // one whole period, then half, then a sliver under the threshold
        let periods = run(&terms, &settings, &[Decimal::ONE, dec!(0.5), dec!(0.2)]);
        assert!(periods[0].interest.is_zero());
        assert!(periods[0].interest_brought_forward.is_zero());
        let second_full = Money::of(MonetaryCurrency::usd(), dec!(91666.67) * dec!(0.01));
        assert_eq!(periods[1].interest, second_full - second_full.multiplied_by(dec!(0.5)));
        let third_full = Money::of(MonetaryCurrency::usd(), dec!(83333.34) * dec!(0.01));
        assert_eq!(periods[2].interest, third_full);
    }

    #[test]
    fn test_payment_grace_keeps_interest_outside_free_days() {
        // a sliver under the threshold changes nothing
        let terms = builder(AmortizationMethod::EqualPrincipal)
            .interest_payment_grace(2)
            .interest_charged_from(date(2024, 1, 4))
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[dec!(0.1)]);
        assert!(periods[0].interest.is_zero());
        assert_eq!(periods[0].interest_brought_forward, usd(1_000));
        assert_eq!(periods[2].interest.amount(), dec!(2750.00));

        // half the first period is free, the other half is deferred
        let terms = builder(AmortizationMethod::EqualPrincipal)
            .interest_payment_grace(2)
            .interest_charged_from(date(2024, 1, 16))
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[dec!(0.5)]);
        assert_eq!(periods[0].interest_brought_forward, usd(500));
        assert_eq!(periods[1].interest_brought_forward.amount(), dec!(1416.67));
        assert_eq!(periods[2].interest.amount(), dec!(2250.00));
        assert!(periods[2].interest_brought_forward.is_zero());
    }

    #[test]
    fn test_threshold_is_policy() {
        let terms = builder(AmortizationMethod::EqualPrincipal)
            .interest_charged_from(date(2024, 1, 7))
            .build()
            .unwrap();
        let settings = ScheduleSettings {
            partial_grace_threshold: dec!(0.1),
            ..ScheduleSettings::default()
        };
        let periods = run(&terms, &settings, &[dec!(0.2)]);
        assert_eq!(periods[0].interest, usd(800));
    }

    #[test]
    fn test_fixed_emi_and_multiples() {
        let terms = builder(AmortizationMethod::EqualInstallments)
            .fixed_emi_amount(usd(9_000))
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);
        assert_eq!(periods[0].principal, usd(8_000));

        let terms = builder(AmortizationMethod::EqualInstallments)
            .installment_amount_in_multiples_of(100)
            .build()
            .unwrap();
        let periods = run(&terms, &ScheduleSettings::default(), &[]);
        assert_eq!(periods[0].principal + periods[0].interest, usd(8_900));
    }

    #[test]
    fn test_annuity_zero_rate() {
        assert_eq!(annuity(Decimal::ZERO, 4, usd(1_000)).unwrap(), usd(250));
    }
}
