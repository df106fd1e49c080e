use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{days_between, PaymentPeriodsInOneYearCalculator};
use crate::decimal::{MonetaryCurrency, Money, Rate};
use crate::errors::{Result, ScheduleError};
use crate::events::{PrincipalVariation, VariationLedger};
use crate::types::{
    AmortizationMethod, CompoundingMethod, DaysInMonthType, DaysInYearType, InterestCalculationPeriodMethod,
    InterestMethod, PeriodFrequency,
};

/// leading periods where principal, interest payment or interest charging is
/// suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraceSettings {
    /// periods with no principal due
    pub principal: u32,
    /// periods whose interest is deferred to the first period after them
    pub interest_payment: u32,
    /// periods whose interest is waived outright
    pub interest_charging: u32,
}

/// when and what gets compounded into the interest-bearing balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundingConfig {
    pub method: CompoundingMethod,
    pub frequency: PeriodFrequency,
    pub every: u32,
}

/// validated contractual terms of a single loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    currency: MonetaryCurrency,
    principal: Money,
    annual_nominal_interest_rate: Rate,
    interest_rate_per_period: Rate,
    interest_rate_frequency: PeriodFrequency,
    interest_method: InterestMethod,
    interest_calculation_period_method: InterestCalculationPeriodMethod,
    amortization_method: AmortizationMethod,
    loan_term_frequency: u32,
    loan_term_frequency_type: PeriodFrequency,
    number_of_repayments: u32,
    repayment_every: u32,
    repayment_frequency: PeriodFrequency,
    expected_disbursement_date: NaiveDate,
    repayments_starting_from: Option<NaiveDate>,
    calculated_repayments_starting_from: Option<NaiveDate>,
    grace: GraceSettings,
    interest_charged_from: Option<NaiveDate>,
    in_arrears_tolerance: Money,
    days_in_month: DaysInMonthType,
    days_in_year: DaysInYearType,
    installment_amount_in_multiples_of: Option<u32>,
    fixed_emi_amount: Option<Money>,
    variations: VariationLedger,
    compounding: Option<CompoundingConfig>,
}

impl LoanTerms {
    pub fn builder() -> LoanTermsBuilder {
        LoanTermsBuilder::new()
    }

    pub fn currency(&self) -> MonetaryCurrency {
        self.currency
    }

    /// principal paid out on the expected disbursement date
    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn annual_nominal_interest_rate(&self) -> Rate {
        self.annual_nominal_interest_rate
    }

    pub fn interest_rate_per_period(&self) -> Rate {
        self.interest_rate_per_period
    }

    pub fn interest_rate_frequency(&self) -> PeriodFrequency {
        self.interest_rate_frequency
    }

    pub fn interest_method(&self) -> InterestMethod {
        self.interest_method
    }

    pub fn interest_calculation_period_method(&self) -> InterestCalculationPeriodMethod {
        self.interest_calculation_period_method
    }

    pub fn amortization_method(&self) -> AmortizationMethod {
        self.amortization_method
    }

    pub fn loan_term_frequency(&self) -> u32 {
        self.loan_term_frequency
    }

    pub fn loan_term_frequency_type(&self) -> PeriodFrequency {
        self.loan_term_frequency_type
    }

    pub fn number_of_repayments(&self) -> u32 {
        self.number_of_repayments
    }

    pub fn repayment_every(&self) -> u32 {
        self.repayment_every
    }

    pub fn repayment_frequency(&self) -> PeriodFrequency {
        self.repayment_frequency
    }

    pub fn expected_disbursement_date(&self) -> NaiveDate {
        self.expected_disbursement_date
    }

    pub fn repayments_starting_from(&self) -> Option<NaiveDate> {
        self.repayments_starting_from
    }

    pub fn calculated_repayments_starting_from(&self) -> Option<NaiveDate> {
        self.calculated_repayments_starting_from
    }

    pub fn grace(&self) -> GraceSettings {
        self.grace
    }

    pub fn interest_charged_from(&self) -> Option<NaiveDate> {
        self.interest_charged_from
    }

    /// carried through for downstream arrears handling, not used in generation
    pub fn in_arrears_tolerance(&self) -> Money {
        self.in_arrears_tolerance
    }

    pub fn days_in_month(&self) -> DaysInMonthType {
        self.days_in_month
    }

    pub fn days_in_year(&self) -> DaysInYearType {
        self.days_in_year
    }

    pub fn installment_amount_in_multiples_of(&self) -> Option<u32> {
        self.installment_amount_in_multiples_of
    }

    pub fn fixed_emi_amount(&self) -> Option<Money> {
        self.fixed_emi_amount
    }

    pub fn variations(&self) -> &VariationLedger {
        &self.variations
    }

    pub fn compounding(&self) -> Option<CompoundingConfig> {
        self.compounding
    }

    /// whether the advanced declining-balance path is needed
    pub fn has_principal_variations_or_compounding(&self) -> bool {
        !self.variations.is_empty() || self.compounding.is_some()
    }

    pub fn is_last_period(&self, period_number: u32) -> bool {
        period_number == self.number_of_repayments
    }

    pub fn is_principal_grace_period(&self, period_number: u32) -> bool {
        period_number <= self.grace.principal
    }

    pub fn is_interest_payment_grace_period(&self, period_number: u32) -> bool {
        period_number <= self.grace.interest_payment
    }

    pub fn is_first_period_after_interest_payment_grace(&self, period_number: u32) -> bool {
        self.grace.interest_payment > 0 && period_number == self.grace.interest_payment + 1
    }

    /// interest charging grace: interest for the period is waived
    pub fn is_interest_free_grace_period(&self, period_number: u32) -> bool {
        period_number <= self.grace.interest_charging
    }

    pub fn number_of_principal_payment_periods(&self) -> Result<u32> {
        match self.number_of_repayments.checked_sub(self.grace.principal) {
            Some(n) if n > 0 => Ok(n),
            _ => Err(ScheduleError::NoPaymentPeriods {
                field: "principal grace",
            }),
        }
    }

    /// periods that actually carry an interest payment
    pub fn number_of_interest_due_periods(&self) -> Result<u32> {
        let grace = self.grace.interest_charging.max(self.grace.interest_payment);
        match self.number_of_repayments.checked_sub(grace) {
            Some(n) if n > 0 => Ok(n),
            _ => Err(ScheduleError::NoPaymentPeriods {
                field: "interest grace",
            }),
        }
    }

    /// periods per year used to derive the rate, 365 under the daily method
    pub fn periods_in_one_year(&self, calculator: &PaymentPeriodsInOneYearCalculator) -> u32 {
        match self.interest_calculation_period_method {
            InterestCalculationPeriodMethod::Daily => calculator.periods_per_year(PeriodFrequency::Days),
            InterestCalculationPeriodMethod::SameAsRepaymentPeriod => {
                calculator.periods_per_year(self.repayment_frequency)
            }
        }
    }

    /// length of the loan term in rate periods; days from interest start to
    /// the last due date under the daily method
    pub fn periods_in_loan_term(&self, loan_end_date: NaiveDate) -> Decimal {
        match self.interest_calculation_period_method {
            InterestCalculationPeriodMethod::Daily => {
                let start = match self.interest_charged_from {
                    Some(from) if from > self.expected_disbursement_date => from,
                    _ => self.expected_disbursement_date,
                };
                Decimal::from(days_between(start, loan_end_date).max(0))
            }
            InterestCalculationPeriodMethod::SameAsRepaymentPeriod => Decimal::from(self.loan_term_frequency),
        }
    }

    /// flat rate for the whole term, as a fraction
    pub fn flat_interest_rate_for_loan_term(
        &self,
        calculator: &PaymentPeriodsInOneYearCalculator,
        loan_end_date: NaiveDate,
    ) -> Decimal {
        let periods_in_year = Decimal::from(self.periods_in_one_year(calculator));
        self.annual_nominal_interest_rate.as_percentage() / periods_in_year / Decimal::ONE_HUNDRED
            * self.periods_in_loan_term(loan_end_date)
    }

    /// closed-form flat interest over the term before any grace is applied
    pub fn total_flat_interest_without_grace(
        &self,
        calculator: &PaymentPeriodsInOneYearCalculator,
        loan_end_date: NaiveDate,
    ) -> Money {
        self.principal
            .multiplied_by(self.flat_interest_rate_for_loan_term(calculator, loan_end_date))
    }

    /// flat interest share of one installment before grace
    pub fn flat_interest_per_installment(
        &self,
        calculator: &PaymentPeriodsInOneYearCalculator,
        loan_end_date: NaiveDate,
    ) -> Result<Money> {
        self.total_flat_interest_without_grace(calculator, loan_end_date)
            .divided_by(Decimal::from(self.number_of_repayments))
    }

    /// total interest the schedule must charge; only flat loans have one up front
    pub fn total_interest_charged(
        &self,
        calculator: &PaymentPeriodsInOneYearCalculator,
        loan_end_date: NaiveDate,
    ) -> Result<Option<Money>> {
        match self.interest_method {
            InterestMethod::Flat => {
                let total = self.total_flat_interest_without_grace(calculator, loan_end_date);
                let per_installment = self.flat_interest_per_installment(calculator, loan_end_date)?;
                let waived = per_installment.multiplied_by(Decimal::from(self.grace.interest_charging));
                Ok(Some(total - waived))
            }
            InterestMethod::DecliningBalance => Ok(None),
        }
    }

    /// even principal share, ignoring principal grace periods
    pub fn flat_principal_per_period(&self, principal: Money) -> Result<Money> {
        let periods = self.number_of_principal_payment_periods()?;
        principal.divided_by(Decimal::from(periods))
    }

    /// reconcile a period's principal against the principal disbursed so far.
    ///
    /// `cumulative` includes this period's principal. The last period absorbs
    /// any difference; an earlier period is cut back when it would overshoot.
    pub fn adjust_principal_if_last_period(
        &self,
        principal_for_period: Money,
        cumulative: Money,
        total_principal: Money,
        period_number: u32,
    ) -> Money {
        reconcile_against_total(
            principal_for_period,
            cumulative,
            total_principal,
            self.is_last_period(period_number),
        )
    }

    /// same reconciliation for interest, against the closed-form total
    pub fn adjust_interest_if_last_period(
        &self,
        interest_for_period: Money,
        cumulative: Money,
        total_interest: Money,
        period_number: u32,
    ) -> Money {
        reconcile_against_total(
            interest_for_period,
            cumulative,
            total_interest,
            self.is_last_period(period_number),
        )
    }
}

fn reconcile_against_total(amount: Money, cumulative: Money, total: Money, is_last: bool) -> Money {
    let remaining = total - cumulative;
    if is_last {
        amount + remaining
    } else if remaining.is_negative() {
        (amount + remaining).max(amount.to_zero())
    } else {
        amount
    }
}

/// builder for loan terms
#[derive(Debug, Clone, Default)]
pub struct LoanTermsBuilder {
    principal: Option<Money>,
    annual_interest_rate: Option<Rate>,
    interest_rate_per_period: Option<(Rate, PeriodFrequency)>,
    interest_method: Option<InterestMethod>,
    interest_calculation_period_method: Option<InterestCalculationPeriodMethod>,
    amortization_method: Option<AmortizationMethod>,
    loan_term: Option<(u32, PeriodFrequency)>,
    repayments: Option<(u32, u32, PeriodFrequency)>,
    expected_disbursement_date: Option<NaiveDate>,
    repayments_starting_from: Option<NaiveDate>,
    calculated_repayments_starting_from: Option<NaiveDate>,
    grace: GraceSettings,
    interest_charged_from: Option<NaiveDate>,
    in_arrears_tolerance: Option<Money>,
    days_in_month: DaysInMonthType,
    days_in_year: DaysInYearType,
    installment_amount_in_multiples_of: Option<u32>,
    fixed_emi_amount: Option<Money>,
    variations: Vec<(NaiveDate, PrincipalVariation)>,
    compounding: Option<CompoundingConfig>,
}

impl LoanTermsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn annual_interest_rate(mut self, rate: Rate) -> Self {
        self.annual_interest_rate = Some(rate);
        self
    }

    /// nominal rate as quoted per `frequency`; the annual rate is derived
    /// from it when not given
    pub fn interest_rate_per_period(mut self, rate: Rate, frequency: PeriodFrequency) -> Self {
        self.interest_rate_per_period = Some((rate, frequency));
        self
    }

    pub fn interest_method(mut self, method: InterestMethod) -> Self {
        self.interest_method = Some(method);
        self
    }

    pub fn interest_calculation_period_method(mut self, method: InterestCalculationPeriodMethod) -> Self {
        self.interest_calculation_period_method = Some(method);
        self
    }

    pub fn amortization_method(mut self, method: AmortizationMethod) -> Self {
        self.amortization_method = Some(method);
        self
    }

    pub fn loan_term(mut self, frequency: u32, frequency_type: PeriodFrequency) -> Self {
        self.loan_term = Some((frequency, frequency_type));
        self
    }

    /// `number` installments, one every `every` units of `frequency`
    pub fn repayments(mut self, number: u32, every: u32, frequency: PeriodFrequency) -> Self {
        self.repayments = Some((number, every, frequency));
        self
    }

    pub fn expected_disbursement_date(mut self, date: NaiveDate) -> Self {
        self.expected_disbursement_date = Some(date);
        self
    }

    pub fn repayments_starting_from(mut self, date: NaiveDate) -> Self {
        self.repayments_starting_from = Some(date);
        self
    }

    pub fn calculated_repayments_starting_from(mut self, date: NaiveDate) -> Self {
        self.calculated_repayments_starting_from = Some(date);
        self
    }

    pub fn principal_grace(mut self, periods: u32) -> Self {
        self.grace.principal = periods;
        self
    }

    pub fn interest_payment_grace(mut self, periods: u32) -> Self {
        self.grace.interest_payment = periods;
        self
    }

    pub fn interest_charging_grace(mut self, periods: u32) -> Self {
        self.grace.interest_charging = periods;
        self
    }

    pub fn grace(mut self, grace: GraceSettings) -> Self {
        self.grace = grace;
        self
    }

    pub fn interest_charged_from(mut self, date: NaiveDate) -> Self {
        self.interest_charged_from = Some(date);
        self
    }

    pub fn in_arrears_tolerance(mut self, tolerance: Money) -> Self {
        self.in_arrears_tolerance = Some(tolerance);
        self
    }

    pub fn days_in_month(mut self, days: DaysInMonthType) -> Self {
        self.days_in_month = days;
        self
    }

    pub fn days_in_year(mut self, days: DaysInYearType) -> Self {
        self.days_in_year = days;
        self
    }

    pub fn installment_amount_in_multiples_of(mut self, multiple: u32) -> Self {
        self.installment_amount_in_multiples_of = Some(multiple);
        self
    }

    pub fn fixed_emi_amount(mut self, emi: Money) -> Self {
        self.fixed_emi_amount = Some(emi);
        self
    }

    pub fn disbursement_tranche(mut self, date: NaiveDate, amount: Money) -> Self {
        self.variations.push((date, PrincipalVariation::Disbursement { amount }));
        self
    }

    pub fn prepayment(mut self, date: NaiveDate, amount: Money) -> Self {
        self.variations.push((date, PrincipalVariation::Prepayment { amount }));
        self
    }

    pub fn compounding(mut self, config: CompoundingConfig) -> Self {
        self.compounding = Some(config);
        self
    }

    pub fn build(self) -> Result<LoanTerms> {
        let principal = self.principal.ok_or(ScheduleError::InvalidConfiguration {
            message: "principal required".to_string(),
        })?;
        let currency = principal.currency();
        if !principal.is_positive() {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!("principal must be positive, got {principal}"),
            });
        }

        let expected_disbursement_date = self.expected_disbursement_date.ok_or(ScheduleError::InvalidConfiguration {
            message: "expected disbursement date required".to_string(),
        })?;

        let (number_of_repayments, repayment_every, repayment_frequency) =
            self.repayments.ok_or(ScheduleError::InvalidConfiguration {
                message: "repayment schedule required".to_string(),
            })?;
        if number_of_repayments == 0 {
            return Err(ScheduleError::NoPaymentPeriods {
                field: "number of repayments",
            });
        }
        if repayment_every == 0 {
            return Err(ScheduleError::InvalidConfiguration {
                message: "repayment every must be at least 1".to_string(),
            });
        }

        let calculator = PaymentPeriodsInOneYearCalculator::new();
        let (annual_nominal_interest_rate, interest_rate_per_period, interest_rate_frequency) =
            match (self.annual_interest_rate, self.interest_rate_per_period) {
                (Some(annual), Some((per_period, frequency))) => (annual, per_period, frequency),
                (Some(annual), None) => (annual, annual, PeriodFrequency::Years),
                (None, Some((per_period, frequency))) => {
                    let periods = Decimal::from(calculator.periods_per_year(frequency));
                    (
                        Rate::from_percentage(per_period.as_percentage() * periods),
                        per_period,
                        frequency,
                    )
                }
                (None, None) => {
                    return Err(ScheduleError::InvalidConfiguration {
                        message: "interest rate required".to_string(),
                    })
                }
            };
        if annual_nominal_interest_rate < Rate::ZERO || interest_rate_per_period < Rate::ZERO {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!("interest rate cannot be negative, got {annual_nominal_interest_rate}"),
            });
        }

        for (field, value) in [
            ("principal grace", self.grace.principal),
            ("interest payment grace", self.grace.interest_payment),
            ("interest charging grace", self.grace.interest_charging),
        ] {
            if value >= number_of_repayments {
                return Err(ScheduleError::InvalidGrace {
                    field,
                    value,
                    number_of_repayments,
                });
            }
        }

        let (loan_term_frequency, loan_term_frequency_type) = self
            .loan_term
            .unwrap_or((number_of_repayments.saturating_mul(repayment_every), repayment_frequency));
        if loan_term_frequency == 0 {
            return Err(ScheduleError::InvalidConfiguration {
                message: "loan term must be at least one period".to_string(),
            });
        }
        if loan_term_frequency_type != repayment_frequency {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!(
                    "loan term in {loan_term_frequency_type:?} does not match repayments in {repayment_frequency:?}"
                ),
            });
        }
        let covered = number_of_repayments.saturating_mul(repayment_every);
        if loan_term_frequency < covered {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!(
                    "loan term of {loan_term_frequency} is shorter than {number_of_repayments} repayments every {repayment_every}"
                ),
            });
        }

        for date in [self.repayments_starting_from, self.calculated_repayments_starting_from]
            .into_iter()
            .flatten()
        {
            if date <= expected_disbursement_date {
                return Err(ScheduleError::InvalidDate {
                    message: format!("repayments starting {date} must fall after disbursement {expected_disbursement_date}"),
                });
            }
        }

        if let Some(from) = self.interest_charged_from {
            if from < expected_disbursement_date {
                return Err(ScheduleError::InvalidDate {
                    message: format!("interest charged from {from} precedes disbursement {expected_disbursement_date}"),
                });
            }
        }

        let in_arrears_tolerance = match self.in_arrears_tolerance {
            Some(tolerance) => {
                ensure_currency(currency, tolerance)?;
                if tolerance.is_negative() {
                    return Err(ScheduleError::InvalidConfiguration {
                        message: "in arrears tolerance cannot be negative".to_string(),
                    });
                }
                tolerance
            }
            None => Money::zero(currency),
        };

        if let Some(emi) = self.fixed_emi_amount {
            ensure_currency(currency, emi)?;
            if !emi.is_positive() {
                return Err(ScheduleError::InvalidConfiguration {
                    message: format!("fixed installment must be positive, got {emi}"),
                });
            }
        }

        let interest_method = self.interest_method.unwrap_or(InterestMethod::DecliningBalance);

        let mut variations = VariationLedger::new();
        for (date, variation) in self.variations {
            ensure_currency(currency, variation.amount())?;
            if !variation.amount().is_positive() {
                return Err(ScheduleError::InvalidVariation {
                    date,
                    message: format!("amount must be positive, got {}", variation.amount()),
                });
            }
            if date <= expected_disbursement_date {
                return Err(ScheduleError::InvalidVariation {
                    date,
                    message: "variations on or before disbursement belong in the principal".to_string(),
                });
            }
            variations.record(date, variation);
        }
        if let Some(date) = variations.last_date() {
            let available = principal.checked_add(variations.total_disbursed(currency))?;
            let prepaid = variations.total_prepaid(currency);
            if prepaid > available {
                return Err(ScheduleError::InvalidVariation {
                    date,
                    message: format!("prepayments of {prepaid} exceed the {available} disbursed"),
                });
            }
        }

        if let Some(compounding) = self.compounding {
            if compounding.every == 0 {
                return Err(ScheduleError::InvalidConfiguration {
                    message: "compounding every must be at least 1".to_string(),
                });
            }
        }

        if interest_method == InterestMethod::Flat && (!variations.is_empty() || self.compounding.is_some()) {
            return Err(ScheduleError::InvalidConfiguration {
                message: "principal variations and compounding need declining balance interest".to_string(),
            });
        }

        Ok(LoanTerms {
            currency,
            principal,
            annual_nominal_interest_rate,
            interest_rate_per_period,
            interest_rate_frequency,
            interest_method,
            interest_calculation_period_method: self
                .interest_calculation_period_method
                .unwrap_or(InterestCalculationPeriodMethod::SameAsRepaymentPeriod),
            amortization_method: self
                .amortization_method
                .unwrap_or(AmortizationMethod::EqualInstallments),
            loan_term_frequency,
            loan_term_frequency_type,
            number_of_repayments,
            repayment_every,
            repayment_frequency,
            expected_disbursement_date,
            repayments_starting_from: self.repayments_starting_from,
            calculated_repayments_starting_from: self.calculated_repayments_starting_from,
            grace: self.grace,
            interest_charged_from: self.interest_charged_from,
            in_arrears_tolerance,
            days_in_month: self.days_in_month,
            days_in_year: self.days_in_year,
            installment_amount_in_multiples_of: self
                .installment_amount_in_multiples_of
                .or(currency.in_multiples_of),
            fixed_emi_amount: self.fixed_emi_amount,
            variations,
            compounding: self.compounding,
        })
    }
}

fn ensure_currency(expected: MonetaryCurrency, money: Money) -> Result<()> {
    if money.currency().code != expected.code {
        return Err(ScheduleError::CurrencyMismatch {
            expected: expected.code,
            found: money.currency().code,
        });
    }
    Ok(())
}
