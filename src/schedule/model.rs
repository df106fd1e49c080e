use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{MonetaryCurrency, Money};
use crate::schedule::period::{DisbursementPeriod, LoanSchedulePeriod, RepaymentPeriod};

/// generated schedule with its term totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanScheduleModel {
    pub currency: MonetaryCurrency,
    /// disbursement first, then rows in date order
    pub periods: Vec<LoanSchedulePeriod>,
    pub loan_term_in_days: i64,
    pub total_principal_disbursed: Money,
    /// principal due across installments, excluding prepayments
    pub total_principal_expected: Money,
    pub total_principal_prepaid: Money,
    pub total_interest_charged: Money,
    pub total_fee_charges_charged: Money,
    pub total_penalty_charges_charged: Money,
    pub total_repayment_expected: Money,
    pub total_outstanding: Money,
}

impl LoanScheduleModel {
    /// compute term totals from finished rows
    pub fn from_periods(currency: MonetaryCurrency, periods: Vec<LoanSchedulePeriod>, total_principal_prepaid: Money) -> Self {
        let disbursements = || periods.iter().filter_map(LoanSchedulePeriod::as_disbursement);
        let repayments = || periods.iter().filter_map(LoanSchedulePeriod::as_repayment);

        let total_principal_disbursed = Money::total(currency, disbursements().map(|d| d.principal_disbursed));
        let charges_at_disbursement = Money::total(currency, disbursements().map(|d| d.charges_due_at_disbursement));
        let total_principal_expected = Money::total(currency, repayments().map(|r| r.principal_due));
        let total_interest_charged = Money::total(currency, repayments().map(|r| r.interest_due));
        let total_fee_charges_charged =
            charges_at_disbursement + Money::total(currency, repayments().map(|r| r.fee_charges_due));
        let total_penalty_charges_charged = Money::total(currency, repayments().map(|r| r.penalty_charges_due));
        let loan_term_in_days = repayments().map(RepaymentPeriod::days).sum();

        let total_repayment_expected =
            total_principal_expected + total_interest_charged + total_fee_charges_charged + total_penalty_charges_charged;

        Self {
            currency,
            loan_term_in_days,
            total_principal_disbursed,
            total_principal_expected,
            total_principal_prepaid,
            total_interest_charged,
            total_fee_charges_charged,
            total_penalty_charges_charged,
            total_repayment_expected,
            // nothing has been repaid at generation time
            total_outstanding: total_repayment_expected,
            periods,
        }
    }

    pub fn repayment_periods(&self) -> impl Iterator<Item = &RepaymentPeriod> + '_ {
        self.periods.iter().filter_map(LoanSchedulePeriod::as_repayment)
    }

    pub fn disbursement_periods(&self) -> impl Iterator<Item = &DisbursementPeriod> + '_ {
        self.periods.iter().filter_map(LoanSchedulePeriod::as_disbursement)
    }

    pub fn number_of_installments(&self) -> usize {
        self.periods.iter().filter(|p| p.is_repayment()).count()
    }

    /// installment by its 1-based number
    pub fn installment(&self, period_number: u32) -> Option<&RepaymentPeriod> {
        self.repayment_periods().find(|r| r.period_number == period_number)
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.repayment_periods().last().map(|r| r.due_date)
    }

    /// balance after the last installment; zero for a complete schedule
    pub fn final_balance(&self) -> Money {
        self.repayment_periods()
            .last()
            .map(|r| r.outstanding_balance)
            .unwrap_or_else(|| Money::zero(self.currency))
    }
}
