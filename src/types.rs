use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScheduleError};

/// unit of a repayment, loan term or interest rate period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodFrequency {
    Days,
    Weeks,
    Months,
    Years,
}

impl PeriodFrequency {
    /// parse the wire code (0 days, 1 weeks, 2 months, 3 years)
    pub fn from_code(field: &'static str, code: i32) -> Result<Self> {
        match code {
            0 => Ok(PeriodFrequency::Days),
            1 => Ok(PeriodFrequency::Weeks),
            2 => Ok(PeriodFrequency::Months),
            3 => Ok(PeriodFrequency::Years),
            _ => Err(ScheduleError::UnrecognizedCode { field, code }),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PeriodFrequency::Days => 0,
            PeriodFrequency::Weeks => 1,
            PeriodFrequency::Months => 2,
            PeriodFrequency::Years => 3,
        }
    }

    /// move `date` forward by `units` of this frequency
    pub fn add_to(&self, date: NaiveDate, units: u32) -> Result<NaiveDate> {
        let moved = match self {
            PeriodFrequency::Days => date.checked_add_days(chrono::Days::new(u64::from(units))),
            PeriodFrequency::Weeks => date.checked_add_days(chrono::Days::new(7 * u64::from(units))),
            PeriodFrequency::Months => date.checked_add_months(Months::new(units)),
            PeriodFrequency::Years => units
                .checked_mul(12)
                .and_then(|m| date.checked_add_months(Months::new(m))),
        };
        moved.ok_or_else(|| ScheduleError::InvalidDate {
            message: format!("{date} + {units} {self:?} is out of range"),
        })
    }

    /// move `date` back by `units` of this frequency
    pub fn subtract_from(&self, date: NaiveDate, units: u32) -> Result<NaiveDate> {
        let moved = match self {
            PeriodFrequency::Days => date.checked_sub_days(chrono::Days::new(u64::from(units))),
            PeriodFrequency::Weeks => date.checked_sub_days(chrono::Days::new(7 * u64::from(units))),
            PeriodFrequency::Months => date.checked_sub_months(Months::new(units)),
            PeriodFrequency::Years => units
                .checked_mul(12)
                .and_then(|m| date.checked_sub_months(Months::new(m))),
        };
        moved.ok_or_else(|| ScheduleError::InvalidDate {
            message: format!("{date} - {units} {self:?} is out of range"),
        })
    }
}

/// how interest is charged over the life of the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterestMethod {
    /// interest on the outstanding balance each period
    DecliningBalance,
    /// interest computed once on the original principal and spread evenly
    Flat,
}

impl InterestMethod {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(InterestMethod::DecliningBalance),
            1 => Ok(InterestMethod::Flat),
            _ => Err(ScheduleError::UnrecognizedCode {
                field: "interest method",
                code,
            }),
        }
    }
}

/// amortization method for term loans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmortizationMethod {
    /// same principal every period, interest on top
    EqualPrincipal,
    /// level total installment throughout the term
    EqualInstallments,
}

impl AmortizationMethod {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(AmortizationMethod::EqualPrincipal),
            1 => Ok(AmortizationMethod::EqualInstallments),
            _ => Err(ScheduleError::UnrecognizedCode {
                field: "amortization method",
                code,
            }),
        }
    }
}

/// period over which declining-balance interest is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterestCalculationPeriodMethod {
    /// daily rate times the days in the period
    Daily,
    /// one periodic rate per repayment period
    SameAsRepaymentPeriod,
}

impl InterestCalculationPeriodMethod {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(InterestCalculationPeriodMethod::Daily),
            1 => Ok(InterestCalculationPeriodMethod::SameAsRepaymentPeriod),
            _ => Err(ScheduleError::UnrecognizedCode {
                field: "interest calculation period method",
                code,
            }),
        }
    }
}

/// days counted for a monthly period under the daily method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DaysInMonthType {
    #[default]
    Actual,
    Days30,
}

/// days counted for a yearly period under the daily method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DaysInYearType {
    #[default]
    Actual,
    Days360,
    Days364,
    Days365,
}

impl DaysInYearType {
    pub fn fixed_days(&self) -> Option<u32> {
        match self {
            DaysInYearType::Actual => None,
            DaysInYearType::Days360 => Some(360),
            DaysInYearType::Days364 => Some(364),
            DaysInYearType::Days365 => Some(365),
        }
    }
}

/// what is folded into the interest-bearing balance on compounding dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompoundingMethod {
    Interest,
    Fee,
    InterestAndFee,
}

impl CompoundingMethod {
    pub fn compounds_interest(&self) -> bool {
        matches!(self, CompoundingMethod::Interest | CompoundingMethod::InterestAndFee)
    }

    pub fn compounds_fee(&self) -> bool {
        matches!(self, CompoundingMethod::Fee | CompoundingMethod::InterestAndFee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invalid_codes_are_rejected() {
        assert_eq!(
            PeriodFrequency::from_code("repayment frequency", 4),
            Err(ScheduleError::UnrecognizedCode {
                field: "repayment frequency",
                code: 4
            })
        );
        assert!(InterestMethod::from_code(-1).is_err());
        assert!(AmortizationMethod::from_code(2).is_err());
        assert!(InterestCalculationPeriodMethod::from_code(7).is_err());
    }

    #[test]
    fn test_codes_round_trip() {
        for code in 0..4 {
            let freq = PeriodFrequency::from_code("f", code).unwrap();
            assert_eq!(freq.code(), code);
        }
        assert_eq!(InterestMethod::from_code(1).unwrap(), InterestMethod::Flat);
        assert_eq!(
            AmortizationMethod::from_code(1).unwrap(),
            AmortizationMethod::EqualInstallments
        );
    }

    #[test]
    fn test_add_to_clamps_month_end() {
        let jan31 = date(2024, 1, 31);
        assert_eq!(PeriodFrequency::Months.add_to(jan31, 1).unwrap(), date(2024, 2, 29));
        assert_eq!(PeriodFrequency::Months.add_to(jan31, 2).unwrap(), date(2024, 3, 31));
        assert_eq!(PeriodFrequency::Weeks.add_to(jan31, 2).unwrap(), date(2024, 2, 14));
        assert_eq!(PeriodFrequency::Days.add_to(jan31, 30).unwrap(), date(2024, 3, 1));
        assert_eq!(PeriodFrequency::Years.add_to(date(2024, 2, 29), 1).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn test_subtract_from() {
        assert_eq!(
            PeriodFrequency::Months.subtract_from(date(2024, 1, 31), 1).unwrap(),
            date(2023, 12, 31)
        );
        assert_eq!(
            PeriodFrequency::Weeks.subtract_from(date(2024, 1, 14), 1).unwrap(),
            date(2024, 1, 7)
        );
    }
}
