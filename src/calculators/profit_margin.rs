//! Profit margin calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, Money, as_percent, checked_ratio, round_money};

use super::not_computable;

/// `part` as a percentage of `whole`, rounded to two places; zero when
/// `whole` is zero.
fn percent_of(part: Money, whole: Money) -> EngineResult<Decimal> {
    checked_ratio(part, whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or_else(|| not_computable("Cost and revenue are too far apart to compare"))
}

/// The profit margin breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitMarginBreakdown {
    /// Cost of the goods or service.
    pub cost: Money,
    /// Selling price or revenue.
    pub revenue: Money,
    /// Revenue less cost; negative for a loss.
    pub gross_profit: Money,
    /// Gross profit as a percentage of revenue.
    pub margin_percent: Decimal,
    /// Gross profit as a percentage of cost.
    pub markup_percent: Decimal,
    /// The requested margin, in percent.
    pub target_margin_percent: Option<Decimal>,
    /// Price that achieves the target margin on the same cost. Absent when no
    /// target was given or the target is 100% or more.
    pub target_price: Option<Money>,
}

pub(crate) fn calculate(reader: &mut InputReader<'_>, audit: &mut AuditLog) -> EngineResult<ProfitMarginBreakdown> {
    let cost = reader.money("cost");
    let revenue = reader.money("revenue");
    let target = reader
        .is_present("target_margin_percent")
        .then(|| reader.percent("target_margin_percent"));

    let gross_profit = revenue - cost;
    let margin_percent = percent_of(gross_profit, revenue)?;
    let markup_percent = percent_of(gross_profit, cost)?;
    let target_price = match target.filter(|t| *t < Decimal::ONE) {
        Some(t) => Some(
            cost.checked_div(Decimal::ONE - t)
                .map(round_money)
                .ok_or_else(|| not_computable("The target margin is too close to 100% to price"))?,
        ),
        None => None,
    };

    audit.record(
        "profit_margin",
        "Profit Margin",
        "(revenue - cost) / revenue",
        serde_json::json!({
            "cost": cost,
            "revenue": revenue,
            "target_margin": target,
        }),
        serde_json::json!({
            "gross_profit": round_money(gross_profit),
            "margin_percent": margin_percent,
            "markup_percent": markup_percent,
            "target_price": target_price,
        }),
        format!(
            "Profit of {} is {}% of revenue and {}% of cost",
            round_money(gross_profit),
            margin_percent,
            markup_percent
        ),
    );

    Ok(ProfitMarginBreakdown {
        cost: round_money(cost),
        revenue: round_money(revenue),
        gross_profit: round_money(gross_profit),
        margin_percent,
        markup_percent,
        target_margin_percent: target.map(as_percent),
        target_price,
    })
}
