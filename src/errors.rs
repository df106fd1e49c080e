use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::CurrencyCode;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("unrecognized {field} code: {code}")]
    UnrecognizedCode {
        field: &'static str,
        code: i32,
    },

    #[error("invalid {field}: {value} must be less than number of repayments {number_of_repayments}")]
    InvalidGrace {
        field: &'static str,
        value: u32,
        number_of_repayments: u32,
    },

    #[error("no payment periods left for {field} after grace")]
    NoPaymentPeriods {
        field: &'static str,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid principal variation on {date}: {message}")]
    InvalidVariation {
        date: NaiveDate,
        message: String,
    },

    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        found: CurrencyCode,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
