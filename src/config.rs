use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{MonetaryCurrency, Money, Rate};
use crate::errors::{Result, ScheduleError};
use crate::terms::{CompoundingConfig, GraceSettings, LoanTerms};
use crate::types::{
    AmortizationMethod, DaysInMonthType, DaysInYearType, InterestCalculationPeriodMethod, InterestMethod,
    PeriodFrequency,
};

/// engine policy that is not part of a loan contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// interest-free fractions of a period at or below this are ignored
    pub partial_grace_threshold: Decimal,
    /// put interest still deferred after the last installment into it
    pub fold_leftover_deferred_interest: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            partial_grace_threshold: dec!(0.25),
            fold_leftover_deferred_interest: true,
        }
    }
}

/// dated principal change as it arrives on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationConfig {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// wire-level loan terms. enum fields are integer codes and are only checked
/// when converted with [`LoanTermsConfig::into_terms`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTermsConfig {
    pub currency: MonetaryCurrency,
    pub principal: Decimal,
    pub annual_nominal_interest_rate: Decimal,
    #[serde(default)]
    pub interest_rate_per_period: Option<Decimal>,
    #[serde(default)]
    pub interest_rate_frequency_type: Option<i32>,
    /// 0 declining balance, 1 flat
    pub interest_method: i32,
    /// 0 daily, 1 same as repayment period
    pub interest_calculation_period_method: i32,
    /// 0 equal principal, 1 equal installments
    pub amortization_method: i32,
    #[serde(default)]
    pub loan_term_frequency: Option<u32>,
    #[serde(default)]
    pub loan_term_frequency_type: Option<i32>,
    pub number_of_repayments: u32,
    pub repayment_every: u32,
    /// 0 days, 1 weeks, 2 months, 3 years
    pub repayment_frequency_type: i32,
    pub expected_disbursement_date: NaiveDate,
    #[serde(default)]
    pub repayments_starting_from_date: Option<NaiveDate>,
    #[serde(default)]
    pub calculated_repayments_starting_from_date: Option<NaiveDate>,
    #[serde(default)]
    pub grace_on_principal_payment: i32,
    #[serde(default)]
    pub grace_on_interest_payment: i32,
    #[serde(default)]
    pub grace_on_interest_charged: i32,
    #[serde(default)]
    pub interest_charged_from_date: Option<NaiveDate>,
    #[serde(default)]
    pub in_arrears_tolerance: Option<Decimal>,
    #[serde(default)]
    pub days_in_month: DaysInMonthType,
    #[serde(default)]
    pub days_in_year: DaysInYearType,
    #[serde(default)]
    pub installment_amount_in_multiples_of: Option<u32>,
    #[serde(default)]
    pub fixed_emi_amount: Option<Decimal>,
    #[serde(default)]
    pub disbursements: Vec<VariationConfig>,
    #[serde(default)]
    pub prepayments: Vec<VariationConfig>,
    #[serde(default)]
    pub compounding: Option<CompoundingConfig>,
}

impl LoanTermsConfig {
    /// monthly declining-balance loan with level installments
    pub fn monthly_installment_loan(
        currency: MonetaryCurrency,
        principal: Decimal,
        annual_rate: Decimal,
        months: u32,
        disbursement_date: NaiveDate,
    ) -> Self {
        Self {
            currency,
            principal,
            annual_nominal_interest_rate: annual_rate,
            interest_rate_per_period: None,
            interest_rate_frequency_type: None,
            interest_method: 0,
            interest_calculation_period_method: 1,
            amortization_method: 1,
            loan_term_frequency: Some(months),
            loan_term_frequency_type: Some(2),
            number_of_repayments: months,
            repayment_every: 1,
            repayment_frequency_type: 2,
            expected_disbursement_date: disbursement_date,
            repayments_starting_from_date: None,
            calculated_repayments_starting_from_date: None,
            grace_on_principal_payment: 0,
            grace_on_interest_payment: 0,
            grace_on_interest_charged: 0,
            interest_charged_from_date: None,
            in_arrears_tolerance: None,
            days_in_month: DaysInMonthType::Actual,
            days_in_year: DaysInYearType::Actual,
            installment_amount_in_multiples_of: None,
            fixed_emi_amount: None,
            disbursements: Vec::new(),
            prepayments: Vec::new(),
            compounding: None,
        }
    }

    /// flat-rate loan repaid weekly in equal principal installments
    pub fn flat_rate_loan(
        currency: MonetaryCurrency,
        principal: Decimal,
        annual_rate: Decimal,
        weeks: u32,
        disbursement_date: NaiveDate,
    ) -> Self {
        Self {
            interest_method: 1,
            amortization_method: 0,
            loan_term_frequency: Some(weeks),
            loan_term_frequency_type: Some(1),
            repayment_frequency_type: 1,
            number_of_repayments: weeks,
            ..Self::monthly_installment_loan(currency, principal, annual_rate, weeks, disbursement_date)
        }
    }

    /// check every code and build validated terms
    pub fn into_terms(self) -> Result<LoanTerms> {
        let repayment_frequency = PeriodFrequency::from_code("repayment frequency", self.repayment_frequency_type)?;
        let interest_method = InterestMethod::from_code(self.interest_method)?;
        let amortization_method = AmortizationMethod::from_code(self.amortization_method)?;
        let interest_calculation_period_method =
            InterestCalculationPeriodMethod::from_code(self.interest_calculation_period_method)?;

        let grace = GraceSettings {
            principal: grace_count("principal grace", self.grace_on_principal_payment)?,
            interest_payment: grace_count("interest payment grace", self.grace_on_interest_payment)?,
            interest_charging: grace_count("interest charging grace", self.grace_on_interest_charged)?,
        };

        let currency = self.currency;
        let mut builder = LoanTerms::builder()
            .principal(Money::of(currency, self.principal))
            .annual_interest_rate(Rate::from_percentage(self.annual_nominal_interest_rate))
            .interest_method(interest_method)
            .interest_calculation_period_method(interest_calculation_period_method)
            .amortization_method(amortization_method)
            .repayments(self.number_of_repayments, self.repayment_every, repayment_frequency)
            .expected_disbursement_date(self.expected_disbursement_date)
            .grace(grace)
            .days_in_month(self.days_in_month)
            .days_in_year(self.days_in_year);

        if let Some(rate) = self.interest_rate_per_period {
            let code = self.interest_rate_frequency_type.unwrap_or(self.repayment_frequency_type);
            let frequency = PeriodFrequency::from_code("interest rate frequency", code)?;
            builder = builder.interest_rate_per_period(Rate::from_percentage(rate), frequency);
        }
        if let Some(term) = self.loan_term_frequency {
            let code = self.loan_term_frequency_type.unwrap_or(self.repayment_frequency_type);
            let frequency = PeriodFrequency::from_code("loan term frequency", code)?;
            builder = builder.loan_term(term, frequency);
        }
        if let Some(date) = self.repayments_starting_from_date {
            builder = builder.repayments_starting_from(date);
        }
        if let Some(date) = self.calculated_repayments_starting_from_date {
            builder = builder.calculated_repayments_starting_from(date);
        }
        if let Some(date) = self.interest_charged_from_date {
            builder = builder.interest_charged_from(date);
        }
        if let Some(tolerance) = self.in_arrears_tolerance {
            builder = builder.in_arrears_tolerance(Money::of(currency, tolerance));
        }
        if let Some(multiple) = self.installment_amount_in_multiples_of {
            builder = builder.installment_amount_in_multiples_of(multiple);
        }
        if let Some(emi) = self.fixed_emi_amount {
            builder = builder.fixed_emi_amount(Money::of(currency, emi));
        }
        for tranche in self.disbursements {
            builder = builder.disbursement_tranche(tranche.date, Money::of(currency, tranche.amount));
        }
        for prepayment in self.prepayments {
            builder = builder.prepayment(prepayment.date, Money::of(currency, prepayment.amount));
        }
        if let Some(compounding) = self.compounding {
            builder = builder.compounding(compounding);
        }

        builder.build()
    }
}

fn grace_count(field: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| ScheduleError::InvalidConfiguration {
        message: format!("{field} cannot be negative, got {value}"),
    })
}
