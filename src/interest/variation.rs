use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::events::{CompoundingLedger, PrincipalVariation};
use crate::interest::{
    DecliningBalanceStrategy, InterestMethodStrategy, PeriodContext, PeriodicInterestRateCalculator, PrincipalInterest,
};
use crate::terms::{CompoundingConfig, LoanTerms};

/// a date inside a period where the interest-bearing balance changes
#[derive(Debug, Default)]
struct Checkpoint {
    variations: Vec<PrincipalVariation>,
    compounds: bool,
}

/// declining balance that accrues interest piecewise across tranche
/// disbursements, prepayments and compounding dates
#[derive(Debug, Clone)]
pub struct PrincipalVariationStrategy {
    base: DecliningBalanceStrategy,
    compounding: Option<CompoundingConfig>,
    ledger: CompoundingLedger,
}

impl PrincipalVariationStrategy {
    pub fn new(terms: &LoanTerms) -> Self {
        Self {
            base: DecliningBalanceStrategy::new(terms.amortization_method()),
            compounding: terms.compounding(),
            ledger: CompoundingLedger::new(terms.currency()),
        }
    }

    /// every compounding entry recorded so far, reversals included
    pub fn compounding_ledger(&self) -> &CompoundingLedger {
        &self.ledger
    }

    fn checkpoints(&self, ctx: &PeriodContext<'_>) -> Result<BTreeMap<NaiveDate, Checkpoint>> {
        let mut checkpoints: BTreeMap<NaiveDate, Checkpoint> = BTreeMap::new();
        for (date, variation) in ctx.terms.variations().within(ctx.period_start, ctx.due_date) {
            checkpoints.entry(date).or_default().variations.push(*variation);
        }
        if let Some(config) = self.compounding {
            for date in compounding_dates(&config, ctx.period_start, ctx.due_date)? {
                if date > ctx.interest_start {
                    checkpoints.entry(date).or_default().compounds = true;
                }
            }
        }
        Ok(checkpoints)
    }

    fn amount_to_compound(
        &self,
        ctx: &PeriodContext<'_>,
        config: &CompoundingConfig,
        interest_since_last: Decimal,
        window: (NaiveDate, NaiveDate),
    ) -> Money {
        let currency = ctx.terms.currency();
        let mut amount = Money::zero(currency);
        if config.method.compounds_interest() {
            amount += Money::of(currency, interest_since_last);
        }
        if config.method.compounds_fee() {
            let fees = ctx
                .fees_by_date
                .range((Bound::Excluded(window.0), Bound::Included(window.1)))
                .map(|(_, fee)| *fee);
            amount += Money::total(currency, fees);
        }
        amount
    }
}

impl InterestMethodStrategy for PrincipalVariationStrategy {
    fn name(&self) -> &'static str {
        "declining balance with principal variations"
    }

    fn principal_interest_for_period(&mut self, ctx: &PeriodContext<'_>) -> Result<PrincipalInterest> {
        let checkpoints = self.checkpoints(ctx)?;
        if checkpoints.is_empty() {
            return self.base.principal_interest_for_period(ctx);
        }

        let calc = PeriodicInterestRateCalculator::new(ctx.terms);
        let mut balance = ctx.outstanding_balance;
        let mut cursor = ctx.interest_start;
        let mut accrued = Decimal::ZERO;
        let mut since_compounding = Decimal::ZERO;
        let mut last_compounding = ctx.period_start;
        let mut applied = Vec::new();

        for (&date, checkpoint) in &checkpoints {
            if date > cursor {
                // unrounded so the sub-period sum rounds once
                let bearing = balance + self.ledger.balance_on(cursor);
                let interest = bearing.amount() * calc.rate_for_span(cursor, date)?;
                accrued += interest;
                since_compounding += interest;
                cursor = date;
            }

            for variation in &checkpoint.variations {
                balance += variation.delta();
                if balance.is_negative() {
                    return Err(ScheduleError::InvalidVariation {
                        date,
                        message: format!("{} exceeds the outstanding principal", variation.amount()),
                    });
                }
                debug!(
                    period = ctx.period_number,
                    %date,
                    delta = %variation.delta(),
                    %balance,
                    "principal variation applied"
                );
                applied.push((date, *variation));
            }

            if checkpoint.compounds {
                if let Some(config) = self.compounding {
                    let amount = self.amount_to_compound(ctx, &config, since_compounding, (last_compounding, date));
                    self.ledger.record(date, amount);
                    since_compounding = Decimal::ZERO;
                    last_compounding = date;
                }
            }
        }

        if ctx.due_date > cursor {
            let bearing = balance + self.ledger.balance_on(cursor);
            accrued += bearing.amount() * calc.rate_for_span(cursor, ctx.due_date)?;
        }

        // the due date is the rest date for everything compounded this period
        let reversed = self.ledger.reverse_at(ctx.due_date);
        if !reversed.is_zero() {
            debug!(period = ctx.period_number, %reversed, "compounding reversed at rest date");
        }

        if !applied.is_empty() {
            self.base.reset_installment();
        }

        let adjusted = PeriodContext {
            outstanding_balance: balance,
            ..*ctx
        };
        let interest = Money::of(ctx.terms.currency(), accrued);
        let mut result = self.base.split(&adjusted, interest)?;
        result.variations = applied;
        Ok(result)
    }
}

/// compounding dates strictly inside `(start, end)`, stepped from `start`
pub fn compounding_dates(config: &CompoundingConfig, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::new();
    let mut step = 1u32;
    loop {
        let units = step.checked_mul(config.every).ok_or_else(|| ScheduleError::InvalidDate {
            message: format!("compounding step {step} out of range"),
        })?;
        let date = config.frequency.add_to(start, units)?;
        if date >= end {
            return Ok(dates);
        }
        dates.push(date);
        step += 1;
    }
}
