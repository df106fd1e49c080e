use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal::{MonetaryCurrency, Money};

/// mid-term change to the outstanding principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalVariation {
    /// additional tranche paid out to the borrower
    Disbursement { amount: Money },
    /// principal repaid ahead of schedule
    Prepayment { amount: Money },
}

impl PrincipalVariation {
    pub fn amount(&self) -> Money {
        match self {
            PrincipalVariation::Disbursement { amount } | PrincipalVariation::Prepayment { amount } => *amount,
        }
    }

    /// signed effect on the outstanding balance
    pub fn delta(&self) -> Money {
        match self {
            PrincipalVariation::Disbursement { amount } => *amount,
            PrincipalVariation::Prepayment { amount } => -*amount,
        }
    }

    pub fn is_disbursement(&self) -> bool {
        matches!(self, PrincipalVariation::Disbursement { .. })
    }
}

/// date-ordered principal variations for one loan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariationLedger {
    entries: BTreeMap<NaiveDate, Vec<PrincipalVariation>>,
}

impl VariationLedger {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, date: NaiveDate, variation: PrincipalVariation) {
        self.entries.entry(date).or_default().push(variation);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// number of individual variations
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &PrincipalVariation)> + '_ {
        self.entries
            .iter()
            .flat_map(|(date, vars)| vars.iter().map(move |v| (*date, v)))
    }

    /// variations dated in `(start, end]`, in date order
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = (NaiveDate, &PrincipalVariation)> + '_ {
        let range = if start < end {
            self.entries.range(start..=end)
        } else {
            self.entries.range(end..end)
        };
        range
            .filter(move |(date, _)| **date > start)
            .flat_map(|(date, vars)| vars.iter().map(move |v| (*date, v)))
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.keys().next_back().copied()
    }

    pub fn total_disbursed(&self, currency: MonetaryCurrency) -> Money {
        Money::total(
            currency,
            self.iter().filter(|(_, v)| v.is_disbursement()).map(|(_, v)| v.amount()),
        )
    }

    pub fn total_prepaid(&self, currency: MonetaryCurrency) -> Money {
        Money::total(
            currency,
            self.iter().filter(|(_, v)| !v.is_disbursement()).map(|(_, v)| v.amount()),
        )
    }
}

/// amounts folded into the interest-bearing balance, keyed by the date they
/// take effect; reversals are negative entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundingLedger {
    currency: MonetaryCurrency,
    entries: BTreeMap<NaiveDate, Money>,
}

impl CompoundingLedger {
    pub fn new(currency: MonetaryCurrency) -> Self {
        Self {
            currency,
            entries: BTreeMap::new(),
        }
    }

    /// add `amount` to whatever is already recorded on `date`
    pub fn record(&mut self, date: NaiveDate, amount: Money) {
        if amount.is_zero() {
            return;
        }
        let currency = self.currency;
        let slot = self.entries.entry(date).or_insert_with(|| Money::zero(currency));
        *slot += amount;
        debug!(%date, %amount, "compounding entry recorded");
    }

    /// net compounded amount in effect on `date`
    pub fn balance_on(&self, date: NaiveDate) -> Money {
        Money::total(self.currency, self.entries.range(..=date).map(|(_, m)| *m))
    }

    /// net of every entry, regardless of date
    pub fn outstanding(&self) -> Money {
        Money::total(self.currency, self.entries.values().copied())
    }

    /// undo everything compounded up to `rest_date` with one negative entry
    /// on that date; returns the amount reversed
    pub fn reverse_at(&mut self, rest_date: NaiveDate) -> Money {
        let net = self.balance_on(rest_date);
        if !net.is_zero() {
            self.record(rest_date, -net);
        }
        net
    }

    pub fn entries(&self) -> impl Iterator<Item = (NaiveDate, Money)> + '_ {
        self.entries.iter().map(|(d, m)| (*d, *m))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
