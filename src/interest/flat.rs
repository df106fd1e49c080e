use crate::calendar::PaymentPeriodsInOneYearCalculator;
use crate::errors::Result;
use crate::interest::{InterestMethodStrategy, PeriodContext, PrincipalInterest};
use crate::types::AmortizationMethod;

/// interest computed once on the original principal and spread over the term
#[derive(Debug, Clone)]
pub struct FlatInterestStrategy {
    amortization: AmortizationMethod,
    periods: PaymentPeriodsInOneYearCalculator,
}

impl FlatInterestStrategy {
    pub fn new(amortization: AmortizationMethod) -> Self {
        Self {
            amortization,
            periods: PaymentPeriodsInOneYearCalculator::new(),
        }
    }
}

impl InterestMethodStrategy for FlatInterestStrategy {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn principal_interest_for_period(&mut self, ctx: &PeriodContext<'_>) -> Result<PrincipalInterest> {
        let terms = ctx.terms;
        let k = ctx.period_number;
        let zero = ctx.outstanding_balance.to_zero();

        let principal = if terms.is_principal_grace_period(k) {
            zero
        } else {
            terms.flat_principal_per_period(terms.principal())?
        };

        let mut brought_forward = ctx.interest_brought_forward;
        let interest = match self.amortization {
            AmortizationMethod::EqualPrincipal => {
                let share = terms.flat_interest_per_installment(&self.periods, ctx.loan_end_date)?;
                if terms.is_interest_free_grace_period(k) {
                    zero
                } else if terms.is_interest_payment_grace_period(k) {
                    brought_forward += share;
                    zero
                } else if terms.is_first_period_after_interest_payment_grace(k) {
                    let due = share + brought_forward;
                    brought_forward = zero;
                    due
                } else {
                    share
                }
            }
            // level installments: only the periods that carry interest share it
            AmortizationMethod::EqualInstallments => {
                if terms.is_interest_free_grace_period(k) || terms.is_interest_payment_grace_period(k) {
                    zero
                } else {
                    let total = terms
                        .total_interest_charged(&self.periods, ctx.loan_end_date)?
                        .unwrap_or(zero);
                    total.divided_by(terms.number_of_interest_due_periods()?.into())?
                }
            }
        };

        Ok(PrincipalInterest::new(principal, interest, brought_forward))
    }
}
