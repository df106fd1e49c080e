use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::calendar::{PaymentPeriodsInOneYearCalculator, ScheduledDateGenerator};
use crate::charges::{ChargeBasis, ChargeWindow, LoanCharge};
use crate::config::ScheduleSettings;
use crate::decimal::{MonetaryCurrency, Money};
use crate::errors::Result;
use crate::events::PrincipalVariation;
use crate::interest::{strategy_for, PeriodContext};
use crate::schedule::model::LoanScheduleModel;
use crate::schedule::period::{DisbursementPeriod, LoanSchedulePeriod, RepaymentPeriod};
use crate::terms::LoanTerms;

/// running totals carried from one period to the next
#[derive(Debug)]
struct ScheduleAccumulator {
    outstanding_balance: Money,
    /// principal paid down so far, prepayments included
    cumulative_principal: Money,
    cumulative_interest: Money,
    total_disbursed: Money,
    total_prepaid: Money,
    interest_brought_forward: Money,
    /// interest-free periods still to run, fractional for the last one
    remaining_grace_fraction: Decimal,
    periods: Vec<LoanSchedulePeriod>,
}

impl ScheduleAccumulator {
    fn new(principal: Money, capacity: usize) -> Self {
        let zero = principal.to_zero();
        Self {
            outstanding_balance: principal,
            cumulative_principal: zero,
            cumulative_interest: zero,
            total_disbursed: principal,
            total_prepaid: zero,
            interest_brought_forward: zero,
            remaining_grace_fraction: Decimal::ZERO,
            periods: Vec::with_capacity(capacity + 1),
        }
    }

    fn apply_variation(&mut self, date: NaiveDate, variation: PrincipalVariation) {
        match variation {
            PrincipalVariation::Disbursement { amount } => {
                self.total_disbursed += amount;
                self.periods.push(LoanSchedulePeriod::Disbursement(DisbursementPeriod {
                    disbursement_date: date,
                    principal_disbursed: amount,
                    charges_due_at_disbursement: amount.to_zero(),
                }));
            }
            PrincipalVariation::Prepayment { amount } => {
                self.total_prepaid += amount;
                self.cumulative_principal += amount;
            }
        }
        self.outstanding_balance += variation.delta();
    }
}

/// generates a full repayment schedule from loan terms
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanScheduleGenerator {
    dates: ScheduledDateGenerator,
    periods: PaymentPeriodsInOneYearCalculator,
    settings: ScheduleSettings,
}

impl LoanScheduleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ScheduleSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// generate the schedule for `terms` with `charges` attached.
    ///
    /// The first row is always the initial disbursement. Tranche
    /// disbursements appear in date order before the installment they fall
    /// into. Generation is deterministic: the same terms and charges always
    /// give the same model.
    pub fn generate<C: LoanCharge>(&self, terms: &LoanTerms, charges: &[C]) -> Result<LoanScheduleModel> {
        let currency = terms.currency();
        let due_dates = self.dates.generate(terms)?;
        let loan_end_date = due_dates
            .last()
            .copied()
            .unwrap_or_else(|| terms.expected_disbursement_date());
        let ideal_disbursement_date = self.dates.ideal_disbursement_date(terms, &due_dates)?;
        let total_interest_expected = terms.total_interest_charged(&self.periods, loan_end_date)?;
        let fees_by_date = fees_by_date(terms, charges);

        let mut strategy = strategy_for(terms);
        debug!(
            strategy = strategy.name(),
            repayments = due_dates.len(),
            %loan_end_date,
            "generating loan schedule"
        );

        let mut acc = ScheduleAccumulator::new(terms.principal(), due_dates.len());
        if let Some(from) = terms.interest_charged_from() {
            acc.remaining_grace_fraction = self.periods.repayment_period_as_fraction_of_days(
                terms.repayment_frequency(),
                terms.repayment_every(),
                from,
                &due_dates,
                terms.expected_disbursement_date(),
            );
        }

        let mut period_start = terms.expected_disbursement_date();
        for (index, &due_date) in due_dates.iter().enumerate() {
            let period_number = index as u32 + 1;
            let interest_start = interest_start_for_period(
                period_start,
                due_date,
                ideal_disbursement_date,
                terms.interest_charged_from(),
            );
            if interest_start != period_start && Some(interest_start) == terms.interest_charged_from() {
                // the late start already excludes the interest-free days
                acc.remaining_grace_fraction = Decimal::ZERO;
            }

            let ctx = PeriodContext {
                terms,
                settings: &self.settings,
                period_number,
                period_start,
                interest_start,
                due_date,
                loan_end_date,
                grace_fraction: acc.remaining_grace_fraction,
                outstanding_balance: acc.outstanding_balance,
                interest_brought_forward: acc.interest_brought_forward,
                fees_by_date: &fees_by_date,
            };
            let split = strategy.principal_interest_for_period(&ctx)?;
            for &(date, variation) in &split.variations {
                acc.apply_variation(date, variation);
            }

            let mut interest = split.interest;
            let mut brought_forward = split.interest_brought_forward;
            if terms.is_last_period(period_number)
                && brought_forward.is_positive()
                && self.settings.fold_leftover_deferred_interest
            {
                warn!(
                    period = period_number,
                    deferred = %brought_forward,
                    "deferred interest left at maturity added to the last installment"
                );
                interest += brought_forward;
                brought_forward = brought_forward.to_zero();
            }

            let principal = terms.adjust_principal_if_last_period(
                split.principal,
                acc.cumulative_principal + split.principal,
                acc.total_disbursed,
                period_number,
            );
            if let Some(total_interest) = total_interest_expected {
                interest = terms.adjust_interest_if_last_period(
                    interest,
                    acc.cumulative_interest + interest,
                    total_interest,
                    period_number,
                );
            }

            acc.cumulative_principal += principal;
            acc.cumulative_interest += interest;
            acc.outstanding_balance = acc.outstanding_balance.checked_sub(principal)?;
            acc.interest_brought_forward = brought_forward;

            let window = ChargeWindow::for_period(period_start, due_date, period_number == 1);
            let basis = ChargeBasis::for_loan(acc.total_disbursed, interest.to_zero()).with_installment(principal, interest);
            let (fees, penalties) = charges_within(charges, &window, &basis, currency, |c| !c.depends_on_total_interest())?;

            let row = RepaymentPeriod::new(
                period_number,
                period_start,
                due_date,
                principal,
                interest,
                fees,
                penalties,
                acc.outstanding_balance,
            );
            debug!(
                period = period_number,
                %due_date,
                principal = %row.principal_due,
                interest = %row.interest_due,
                balance = %row.outstanding_balance,
                "installment generated"
            );
            acc.periods.push(LoanSchedulePeriod::Repayment(row));

            acc.remaining_grace_fraction = if acc.remaining_grace_fraction >= Decimal::ONE {
                acc.remaining_grace_fraction - Decimal::ONE
            } else {
                Decimal::ZERO
            };
            period_start = due_date;
        }

        let loan_basis = ChargeBasis::for_loan(terms.principal(), acc.cumulative_interest);
        for row in acc.periods.iter_mut() {
            if let LoanSchedulePeriod::Repayment(period) = row {
                let window = ChargeWindow::for_period(period.from_date, period.due_date, period.period_number == 1);
                let (fees, penalties) =
                    charges_within(charges, &window, &loan_basis, currency, |c| c.depends_on_total_interest())?;
                if !(fees.is_zero() && penalties.is_zero()) {
                    period.add_charges(fees, penalties);
                }
            }
        }

        let mut at_disbursement = Money::zero(currency);
        for charge in charges.iter().filter(|c| c.is_due_at_disbursement()) {
            at_disbursement = at_disbursement.checked_add(charge.amount(&loan_basis))?;
        }
        acc.periods.insert(
            0,
            LoanSchedulePeriod::Disbursement(DisbursementPeriod {
                disbursement_date: terms.expected_disbursement_date(),
                principal_disbursed: terms.principal(),
                charges_due_at_disbursement: at_disbursement,
            }),
        );

        let model = LoanScheduleModel::from_periods(currency, acc.periods, acc.total_prepaid);
        info!(
            installments = model.number_of_installments(),
            principal = %model.total_principal_disbursed,
            interest = %model.total_interest_charged,
            total = %model.total_repayment_expected,
            "loan schedule generated"
        );
        Ok(model)
    }
}

/// generate with default settings
pub fn generate_schedule<C: LoanCharge>(terms: &LoanTerms, charges: &[C]) -> Result<LoanScheduleModel> {
    LoanScheduleGenerator::new().generate(terms, charges)
}

/// date interest starts accruing for a period.
///
/// A first period longer than a regular one only charges interest from the
/// ideal disbursement date, or from the interest start date when that falls
/// inside the period.
fn interest_start_for_period(
    period_start: NaiveDate,
    due_date: NaiveDate,
    ideal_disbursement_date: NaiveDate,
    interest_charged_from: Option<NaiveDate>,
) -> NaiveDate {
    if period_start >= ideal_disbursement_date {
        return period_start;
    }
    match interest_charged_from {
        Some(from) if from > period_start && from < due_date => from,
        _ => ideal_disbursement_date,
    }
}

/// fees with a fixed due date, summed per day, for fee compounding
fn fees_by_date<C: LoanCharge>(terms: &LoanTerms, charges: &[C]) -> BTreeMap<NaiveDate, Money> {
    let basis = ChargeBasis::for_loan(terms.principal(), terms.principal().to_zero());
    let mut fees: BTreeMap<NaiveDate, Money> = BTreeMap::new();
    for charge in charges
        .iter()
        .filter(|c| c.is_fee_charge() && !c.depends_on_total_interest())
    {
        if let Some(date) = charge.due_date() {
            let amount = charge.amount(&basis);
            fees.entry(date)
                .and_modify(|total| *total += amount)
                .or_insert(amount);
        }
    }
    fees
}

/// fees and penalties of the selected charges due inside `window`. charge
/// amounts come from the host and must be in the loan's currency
fn charges_within<C: LoanCharge>(
    charges: &[C],
    window: &ChargeWindow,
    basis: &ChargeBasis,
    currency: MonetaryCurrency,
    select: impl Fn(&C) -> bool,
) -> Result<(Money, Money)> {
    let mut fees = Money::zero(currency);
    let mut penalties = Money::zero(currency);
    for charge in charges
        .iter()
        .filter(|c| !c.is_due_at_disbursement() && select(*c) && c.is_due_within(window))
    {
        let amount = charge.amount(basis);
        if charge.is_fee_charge() {
            fees = fees.checked_add(amount)?;
        } else if charge.is_penalty_charge() {
            penalties = penalties.checked_add(amount)?;
        }
    }
    Ok((fees, penalties))
}
