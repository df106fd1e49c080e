use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

pub type ChargeId = Uuid;

/// the amounts a charge may be calculated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeBasis {
    pub principal_disbursed: Money,
    pub total_interest: Money,
    pub installment_principal: Money,
    pub installment_interest: Money,
}

impl ChargeBasis {
    /// basis for charges evaluated against the whole loan
    pub fn for_loan(principal_disbursed: Money, total_interest: Money) -> Self {
        Self {
            principal_disbursed,
            total_interest,
            installment_principal: principal_disbursed.to_zero(),
            installment_interest: principal_disbursed.to_zero(),
        }
    }

    pub fn with_installment(mut self, principal: Money, interest: Money) -> Self {
        self.installment_principal = principal;
        self.installment_interest = interest;
        self
    }
}

/// dates a repayment period collects charges for.
///
/// A charge due on `d` belongs to the period when `start < d <= end`. The
/// first period also includes its start so nothing dated on the disbursement
/// day is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub includes_start: bool,
}

impl ChargeWindow {
    pub fn for_period(start: NaiveDate, end: NaiveDate, is_first_period: bool) -> Self {
        Self {
            start,
            end,
            includes_start: is_first_period,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let after_start = if self.includes_start {
            date >= self.start
        } else {
            date > self.start
        };
        after_start && date <= self.end
    }
}

/// charge attached to a loan, as supplied by the host
pub trait LoanCharge {
    fn is_due_at_disbursement(&self) -> bool;

    fn is_fee_charge(&self) -> bool;

    fn is_penalty_charge(&self) -> bool {
        !self.is_fee_charge()
    }

    /// amount due each time the charge applies
    fn amount(&self, basis: &ChargeBasis) -> Money;

    /// whether the charge falls due inside a repayment period
    fn is_due_within(&self, window: &ChargeWindow) -> bool;

    /// charges computed from the loan's total interest can only be evaluated
    /// once every installment exists
    fn depends_on_total_interest(&self) -> bool {
        false
    }

    /// fixed due date, when the charge has one
    fn due_date(&self) -> Option<NaiveDate> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeKind {
    Fee,
    Penalty,
}

/// when a charge falls due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeTiming {
    Disbursement,
    SpecifiedDueDate(NaiveDate),
    /// every installment
    Installment,
}

/// how the amount is computed; percentages are 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeCalculation {
    Flat(Money),
    PercentOfAmount(Decimal),
    PercentOfInterest(Decimal),
    PercentOfAmountAndInterest(Decimal),
}

impl ChargeCalculation {
    pub fn involves_interest(&self) -> bool {
        matches!(
            self,
            ChargeCalculation::PercentOfInterest(_) | ChargeCalculation::PercentOfAmountAndInterest(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub name: String,
    pub kind: ChargeKind,
    pub timing: ChargeTiming,
    pub calculation: ChargeCalculation,
}

impl Charge {
    pub fn new(name: impl Into<String>, kind: ChargeKind, timing: ChargeTiming, calculation: ChargeCalculation) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            timing,
            calculation,
        }
    }

    pub fn fee(name: impl Into<String>, timing: ChargeTiming, calculation: ChargeCalculation) -> Self {
        Self::new(name, ChargeKind::Fee, timing, calculation)
    }

    pub fn penalty(name: impl Into<String>, timing: ChargeTiming, calculation: ChargeCalculation) -> Self {
        Self::new(name, ChargeKind::Penalty, timing, calculation)
    }
}

fn percent_of(base: Money, percentage: Decimal) -> Money {
    base.multiplied_by(percentage / Decimal::ONE_HUNDRED)
}

impl LoanCharge for Charge {
    fn is_due_at_disbursement(&self) -> bool {
        self.timing == ChargeTiming::Disbursement
    }

    fn is_fee_charge(&self) -> bool {
        self.kind == ChargeKind::Fee
    }

    fn amount(&self, basis: &ChargeBasis) -> Money {
        let (amount_base, interest_base) = match self.timing {
            ChargeTiming::Installment => (basis.installment_principal, basis.installment_interest),
            ChargeTiming::Disbursement | ChargeTiming::SpecifiedDueDate(_) => {
                (basis.principal_disbursed, basis.total_interest)
            }
        };
        match self.calculation {
            ChargeCalculation::Flat(amount) => amount,
            ChargeCalculation::PercentOfAmount(p) => percent_of(amount_base, p),
            ChargeCalculation::PercentOfInterest(p) => percent_of(interest_base, p),
            ChargeCalculation::PercentOfAmountAndInterest(p) => percent_of(amount_base + interest_base, p),
        }
    }

    fn is_due_within(&self, window: &ChargeWindow) -> bool {
        match self.timing {
            ChargeTiming::Disbursement => false,
            ChargeTiming::SpecifiedDueDate(date) => window.contains(date),
            ChargeTiming::Installment => true,
        }
    }

    fn depends_on_total_interest(&self) -> bool {
        self.timing != ChargeTiming::Installment && self.calculation.involves_interest()
    }

    fn due_date(&self) -> Option<NaiveDate> {
        match self.timing {
            ChargeTiming::SpecifiedDueDate(date) => Some(date),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::MonetaryCurrency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd(amount: i64) -> Money {
        Money::from_major(MonetaryCurrency::usd(), amount)
    }

    #[test]
    fn test_window_boundaries() {
        let first = ChargeWindow::for_period(date(2024, 1, 1), date(2024, 2, 1), true);
        assert!(first.contains(date(2024, 1, 1)));
        assert!(first.contains(date(2024, 2, 1)));
        assert!(!first.contains(date(2024, 2, 2)));

        let later = ChargeWindow::for_period(date(2024, 2, 1), date(2024, 3, 1), false);
        assert!(!later.contains(date(2024, 2, 1)));
        assert!(later.contains(date(2024, 2, 2)));
        assert!(later.contains(date(2024, 3, 1)));
    }

    #[test]
    fn test_flat_specified_due_date_charge() {
        let charge = Charge::penalty(
            "late document fee",
            ChargeTiming::SpecifiedDueDate(date(2024, 2, 15)),
            ChargeCalculation::Flat(usd(25)),
        );
        let basis = ChargeBasis::for_loan(usd(10_000), usd(0));
        assert!(charge.is_penalty_charge());
        assert!(!charge.is_due_at_disbursement());
        assert_eq!(charge.amount(&basis), usd(25));
        assert_eq!(charge.due_date(), Some(date(2024, 2, 15)));
        assert!(charge.is_due_within(&ChargeWindow::for_period(date(2024, 2, 1), date(2024, 3, 1), false)));
        assert!(!charge.is_due_within(&ChargeWindow::for_period(date(2024, 1, 1), date(2024, 2, 1), true)));
    }

    #[test]
    fn test_percentage_charges() {
        let basis = ChargeBasis::for_loan(usd(10_000), usd(1_200)).with_installment(usd(800), usd(100));

        let origination = Charge::fee(
            "origination",
            ChargeTiming::Disbursement,
            ChargeCalculation::PercentOfAmount(dec!(2)),
        );
        assert!(origination.is_due_at_disbursement());
        assert_eq!(origination.amount(&basis), usd(200));
        assert!(!origination.depends_on_total_interest());

        let service = Charge::fee(
            "service",
            ChargeTiming::Installment,
            ChargeCalculation::PercentOfAmountAndInterest(dec!(1)),
        );
        assert_eq!(service.amount(&basis), usd(9));
        assert!(!service.depends_on_total_interest());

        let insurance = Charge::fee(
            "insurance",
            ChargeTiming::SpecifiedDueDate(date(2024, 6, 1)),
            ChargeCalculation::PercentOfInterest(dec!(10)),
        );
        assert!(insurance.depends_on_total_interest());
        assert_eq!(insurance.amount(&basis), usd(120));
    }

    #[test]
    fn test_charge_ids_are_unique() {
        let a = Charge::fee("a", ChargeTiming::Installment, ChargeCalculation::Flat(usd(1)));
        let b = Charge::fee("a", ChargeTiming::Installment, ChargeCalculation::Flat(usd(1)));
        assert_ne!(a.id, b.id);
    }
}
