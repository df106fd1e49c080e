use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::days_between;
use crate::decimal::Money;

/// one row of a generated schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanSchedulePeriod {
    Disbursement(DisbursementPeriod),
    Repayment(RepaymentPeriod),
}

impl LoanSchedulePeriod {
    pub fn date(&self) -> NaiveDate {
        match self {
            LoanSchedulePeriod::Disbursement(d) => d.disbursement_date,
            LoanSchedulePeriod::Repayment(r) => r.due_date,
        }
    }

    pub fn as_repayment(&self) -> Option<&RepaymentPeriod> {
        match self {
            LoanSchedulePeriod::Repayment(r) => Some(r),
            LoanSchedulePeriod::Disbursement(_) => None,
        }
    }

    pub fn as_disbursement(&self) -> Option<&DisbursementPeriod> {
        match self {
            LoanSchedulePeriod::Disbursement(d) => Some(d),
            LoanSchedulePeriod::Repayment(_) => None,
        }
    }

    pub fn is_repayment(&self) -> bool {
        matches!(self, LoanSchedulePeriod::Repayment(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementPeriod {
    pub disbursement_date: NaiveDate,
    pub principal_disbursed: Money,
    pub charges_due_at_disbursement: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentPeriod {
    /// 1-based installment number
    pub period_number: u32,
    pub from_date: NaiveDate,
    pub due_date: NaiveDate,
    pub principal_due: Money,
    pub interest_due: Money,
    pub fee_charges_due: Money,
    pub penalty_charges_due: Money,
    /// principal still owed after this installment
    pub outstanding_balance: Money,
    pub total_due: Money,
}

impl RepaymentPeriod {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        period_number: u32,
        from_date: NaiveDate,
        due_date: NaiveDate,
        principal_due: Money,
        interest_due: Money,
        fee_charges_due: Money,
        penalty_charges_due: Money,
        outstanding_balance: Money,
    ) -> Self {
        Self {
            period_number,
            from_date,
            due_date,
            principal_due,
            interest_due,
            fee_charges_due,
            penalty_charges_due,
            outstanding_balance,
            total_due: principal_due + interest_due + fee_charges_due + penalty_charges_due,
        }
    }

    /// add charges evaluated after the period was generated
    pub fn add_charges(&mut self, fees: Money, penalties: Money) {
        self.fee_charges_due += fees;
        self.penalty_charges_due += penalties;
        self.total_due = self.principal_due + self.interest_due + self.fee_charges_due + self.penalty_charges_due;
    }

    pub fn days(&self) -> i64 {
        days_between(self.from_date, self.due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::MonetaryCurrency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd(amount: i64) -> Money {
        Money::from_major(MonetaryCurrency::usd(), amount)
    }

    #[test]
    fn test_total_due_tracks_charges() {
        let mut period = RepaymentPeriod::new(
            1,
            date(2024, 1, 1),
            date(2024, 2, 1),
            usd(800),
            usd(100),
            usd(10),
            usd(0),
            usd(9_200),
        );
        assert_eq!(period.total_due, usd(910));
        assert_eq!(period.days(), 31);

        period.add_charges(usd(5), usd(20));
        assert_eq!(period.fee_charges_due, usd(15));
        assert_eq!(period.total_due, usd(935));
    }

    #[test]
    fn test_serialized_rows_are_tagged() {
        let row = LoanSchedulePeriod::Disbursement(DisbursementPeriod {
            disbursement_date: date(2024, 1, 1),
            principal_disbursed: usd(1_000),
            charges_due_at_disbursement: usd(0),
        });
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "disbursement");
        assert_eq!(json["disbursement_date"], "2024-01-01");

        let back: LoanSchedulePeriod = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
        assert!(!back.is_repayment());
        assert_eq!(back.date(), date(2024, 1, 1));
    }
}
