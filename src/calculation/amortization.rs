//! Fixed-payment loan amortization.
//!
//! Computes the level periodic payment of an amortizing loan and generates
//! its period-by-period ledger lazily. Aggregate totals come from the
//! closed-form payment, never from summing a (possibly truncated) preview.
//!
//! ## Payment formula
//!
//! - `rate > 0`: `payment = P * r * (1 + r)^n / ((1 + r)^n - 1)`
//! - `rate == 0`: `payment = P / n`
//!
//! Invalid terms (non-positive principal, negative rate, zero periods) and
//! terms whose compounding factor overflows produce no schedule at all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Money, Rate};

/// The terms of an amortizing loan. Only constructible from valid values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    principal: Money,
    periodic_rate: Rate,
    number_of_periods: u32,
}

impl LoanTerms {
    /// Returns `None` unless `principal > 0`, `periodic_rate >= 0` and
    /// `number_of_periods > 0`.
    pub fn new(principal: Money, periodic_rate: Rate, number_of_periods: u32) -> Option<Self> {
        if principal <= Decimal::ZERO || periodic_rate < Decimal::ZERO || number_of_periods == 0 {
            return None;
        }
        Some(Self {
            principal,
            periodic_rate,
            number_of_periods,
        })
    }

    /// The amount borrowed.
    pub fn principal(&self) -> Money {
        self.principal
    }

    /// Interest rate per period as a fraction.
    pub fn periodic_rate(&self) -> Rate {
        self.periodic_rate
    }

    /// Number of payments.
    pub fn number_of_periods(&self) -> u32 {
        self.number_of_periods
    }
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    /// 1-based period number.
    pub period: u32,
    /// The level payment.
    pub payment: Money,
    /// Part of the payment that reduces the balance.
    pub principal_portion: Money,
    /// Part of the payment that is interest on the opening balance.
    pub interest_portion: Money,
    /// Balance after this payment, never negative.
    pub remaining_balance: Money,
}

/// Principal and interest paid during one year of the loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    /// 1-based year number.
    pub year: u32,
    /// Number of payments made in the year.
    pub payments: u32,
    /// Principal repaid in the year.
    pub principal_paid: Money,
    /// Interest paid in the year.
    pub interest_paid: Money,
    /// Balance at the end of the year.
    pub closing_balance: Money,
}

/// A computed schedule. The ledger is regenerated on every call to
/// [`AmortizationSchedule::entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    terms: LoanTerms,
    payment: Money,
    total_paid: Money,
    total_interest: Money,
}

/// Integer power by repeated squaring. Returns `None` on overflow.
fn checked_pow(base: Decimal, exponent: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    let mut remaining = exponent;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result.checked_mul(square)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = square.checked_mul(square)?;
        }
    }
    Some(result)
}

/// The level payment for `terms`, or `None` if the computation overflows.
pub fn periodic_payment(terms: &LoanTerms) -> Option<Money> {
    let n = Decimal::from(terms.number_of_periods);
    let rate = terms.periodic_rate;
    if rate.is_zero() {
        return terms.principal.checked_div(n);
    }

    let factor = checked_pow(Decimal::ONE + rate, terms.number_of_periods)?;
    let denominator = factor - Decimal::ONE;
    if denominator <= Decimal::ZERO {
        return None;
    }
    terms
        .principal
        .checked_mul(rate)?
        .checked_mul(factor)?
        .checked_div(denominator)
}

/// Builds the schedule for `terms`.
///
/// # Example
///
/// ```
/// use finance_calc_engine::calculation::{LoanTerms, schedule};
/// use rust_decimal::Decimal;
///
/// let terms = LoanTerms::new(Decimal::from(12000), Decimal::ZERO, 12).unwrap();
/// let schedule = schedule(&terms).unwrap();
/// assert_eq!(schedule.payment(), Decimal::from(1000));
/// assert_eq!(schedule.entries().count(), 12);
/// ```
pub fn schedule(terms: &LoanTerms) -> Option<AmortizationSchedule> {
    let payment = periodic_payment(terms)?;
    let total_paid = payment.checked_mul(Decimal::from(terms.number_of_periods))?;
    Some(AmortizationSchedule {
        terms: *terms,
        payment,
        total_paid,
        total_interest: (total_paid - terms.principal).max(Decimal::ZERO),
    })
}

/// Convenience wrapper validating raw values before scheduling.
pub fn amortize(principal: Money, periodic_rate: Rate, number_of_periods: u32) -> Option<AmortizationSchedule> {
    LoanTerms::new(principal, periodic_rate, number_of_periods).and_then(|terms| schedule(&terms))
}

impl AmortizationSchedule {
    /// The terms the schedule was built from.
    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    /// The level periodic payment.
    pub fn payment(&self) -> Money {
        self.payment
    }

    /// `payment * number_of_periods`.
    pub fn total_paid(&self) -> Money {
        self.total_paid
    }

    /// `total_paid - principal`.
    pub fn total_interest(&self) -> Money {
        self.total_interest
    }

    /// A fresh iterator over the full ledger.
    pub fn entries(&self) -> AmortizationEntries {
        AmortizationEntries {
            rate: self.terms.periodic_rate,
            payment: self.payment,
            balance: self.terms.principal,
            period: 0,
            total_periods: self.terms.number_of_periods,
        }
    }

    /// The first `window` entries (or all, if the loan is shorter).
    pub fn preview(&self, window: u32) -> Vec<AmortizationEntry> {
        self.entries().take(window as usize).collect()
    }

    /// Rolls the full ledger up into years of `periods_per_year` payments.
    pub fn yearly_summary(&self, periods_per_year: u32) -> Vec<YearSummary> {
        let periods_per_year = periods_per_year.max(1);
        let mut years: Vec<YearSummary> = Vec::new();
        for entry in self.entries() {
            let year = (entry.period - 1) / periods_per_year + 1;
            match years.last_mut() {
                Some(summary) if summary.year == year => {
                    summary.payments += 1;
                    summary.principal_paid += entry.principal_portion;
                    summary.interest_paid += entry.interest_portion;
                    summary.closing_balance = entry.remaining_balance;
                }
                _ => years.push(YearSummary {
                    year,
                    payments: 1,
                    principal_paid: entry.principal_portion,
                    interest_paid: entry.interest_portion,
                    closing_balance: entry.remaining_balance,
                }),
            }
        }
        years
    }
}

/// Lazy iterator over the ledger.
#[derive(Debug, Clone)]
pub struct AmortizationEntries {
    rate: Rate,
    payment: Money,
    balance: Money,
    period: u32,
    total_periods: u32,
}

impl Iterator for AmortizationEntries {
    type Item = AmortizationEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.period >= self.total_periods {
            return None;
        }
        self.period += 1;

        let interest_portion = self.balance * self.rate;
        let principal_portion = self.payment - interest_portion;
        // The final payment absorbs any rounding residue.
        let remaining_balance = if self.period == self.total_periods {
            Decimal::ZERO
        } else {
            (self.balance - principal_portion).max(Decimal::ZERO)
        };
        self.balance = remaining_balance;

        Some(AmortizationEntry {
            period: self.period,
            payment: self.payment,
            principal_portion,
            interest_portion,
            remaining_balance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_periods - self.period) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AmortizationEntries {}
