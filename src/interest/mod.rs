pub mod declining;
pub mod flat;
pub mod rate;
pub mod variation;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calendar::days_between;
use crate::config::ScheduleSettings;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::PrincipalVariation;
use crate::terms::LoanTerms;
use crate::types::InterestMethod;

pub use declining::DecliningBalanceStrategy;
pub use flat::FlatInterestStrategy;
pub use rate::PeriodicInterestRateCalculator;
pub use variation::PrincipalVariationStrategy;

/// principal and interest split for one repayment period
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalInterest {
    pub principal: Money,
    pub interest: Money,
    /// deferred interest still owed after this period
    pub interest_brought_forward: Money,
    /// principal variations applied inside the period, in date order
    pub variations: Vec<(NaiveDate, PrincipalVariation)>,
}

impl PrincipalInterest {
    pub fn new(principal: Money, interest: Money, interest_brought_forward: Money) -> Self {
        Self {
            principal,
            interest,
            interest_brought_forward,
            variations: Vec::new(),
        }
    }
}

/// everything a strategy needs to know about the period being generated
#[derive(Debug, Clone, Copy)]
pub struct PeriodContext<'a> {
    pub terms: &'a LoanTerms,
    pub settings: &'a ScheduleSettings,
    pub period_number: u32,
    pub period_start: NaiveDate,
    /// later than `period_start` when interest starts inside the period
    pub interest_start: NaiveDate,
    pub due_date: NaiveDate,
    pub loan_end_date: NaiveDate,
    /// share of this period still covered by interest-free days
    pub grace_fraction: Decimal,
    pub outstanding_balance: Money,
    pub interest_brought_forward: Money,
    /// fees with a fixed due date, for fee compounding
    pub fees_by_date: &'a BTreeMap<NaiveDate, Money>,
}

impl PeriodContext<'_> {
    pub fn days_in_period(&self) -> i64 {
        days_between(self.period_start, self.due_date)
    }

    pub fn days_in_period_for_interest(&self) -> i64 {
        days_between(self.interest_start, self.due_date)
    }
}

/// per-period interest method
pub trait InterestMethodStrategy {
    fn name(&self) -> &'static str;

    fn principal_interest_for_period(&mut self, ctx: &PeriodContext<'_>) -> Result<PrincipalInterest>;
}

/// pick the strategy for a loan's interest method
pub fn strategy_for(terms: &LoanTerms) -> Box<dyn InterestMethodStrategy> {
    match terms.interest_method() {
        InterestMethod::Flat => Box::new(FlatInterestStrategy::new(terms.amortization_method())),
        InterestMethod::DecliningBalance if terms.has_principal_variations_or_compounding() => {
            Box::new(PrincipalVariationStrategy::new(terms))
        }
        InterestMethod::DecliningBalance => Box::new(DecliningBalanceStrategy::new(terms.amortization_method())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{MonetaryCurrency, Rate};
    use crate::types::{AmortizationMethod, PeriodFrequency};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn builder(method: InterestMethod) -> crate::terms::LoanTermsBuilder {
        LoanTerms::builder()
            .principal(Money::from_major(MonetaryCurrency::usd(), 1_000))
            .annual_interest_rate(Rate::from_percentage(dec!(10)))
            .interest_method(method)
            .amortization_method(AmortizationMethod::EqualInstallments)
            .repayments(4, 1, PeriodFrequency::Months)
            .expected_disbursement_date(date(2024, 1, 1))
    }

    #[test]
    fn test_factory_selects_strategy() {
        let flat = builder(InterestMethod::Flat).build().unwrap();
        assert_eq!(strategy_for(&flat).name(), "flat");

        let declining = builder(InterestMethod::DecliningBalance).build().unwrap();
        assert_eq!(strategy_for(&declining).name(), "declining balance");

        let varied = builder(InterestMethod::DecliningBalance)
            .prepayment(date(2024, 2, 10), Money::from_major(MonetaryCurrency::usd(), 100))
            .build()
            .unwrap();
        assert_eq!(strategy_for(&varied).name(), "declining balance with principal variations");
    }

    #[test]
    fn test_context_day_counts() {
        let terms = builder(InterestMethod::Flat).build().unwrap();
        let settings = ScheduleSettings::default();
        let fees = BTreeMap::new();
        let zero = Money::zero(terms.currency());
        let ctx = PeriodContext {
            terms: &terms,
            settings: &settings,
            period_number: 1,
            period_start: date(2024, 1, 1),
            interest_start: date(2024, 1, 11),
            due_date: date(2024, 2, 1),
            loan_end_date: date(2024, 5, 1),
            grace_fraction: Decimal::ZERO,
            outstanding_balance: terms.principal(),
            interest_brought_forward: zero,
            fees_by_date: &fees,
        };
        assert_eq!(ctx.days_in_period(), 31);
        assert_eq!(ctx.days_in_period_for_interest(), 21);
    }
}
