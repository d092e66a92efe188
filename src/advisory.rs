//! Payload for the external advisory service.
//!
//! The advisory service receives a flat summary of a finished calculation
//! and returns free-form text. This module only builds the summary; it never
//! waits on the service.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::PremiumBreakdown;
use crate::calculators::CalculatorOutput;
use crate::models::{CalculationResult, as_percent};

/// A single summary value: a number or a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdvisoryValue {
    /// A JSON number.
    Number(serde_json::Number),
    /// A label such as a filing status or plan tier.
    Text(String),
}

impl From<Decimal> for AdvisoryValue {
    fn from(value: Decimal) -> Self {
        let text = value.normalize().to_string();
        match text.parse::<serde_json::Number>() {
            Ok(number) => AdvisoryValue::Number(number),
            Err(_) => AdvisoryValue::Text(text),
        }
    }
}

impl From<u32> for AdvisoryValue {
    fn from(value: u32) -> Self {
        AdvisoryValue::Number(value.into())
    }
}

impl From<&str> for AdvisoryValue {
    fn from(value: &str) -> Self {
        AdvisoryValue::Text(value.to_string())
    }
}

impl From<String> for AdvisoryValue {
    fn from(value: String) -> Self {
        AdvisoryValue::Text(value)
    }
}

/// The request sent to the advisory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    /// The calculator's snake_case name.
    pub calculator_type: String,
    /// Headline inputs and results.
    pub data: BTreeMap<String, AdvisoryValue>,
}

#[derive(Default)]
struct Summary(BTreeMap<String, AdvisoryValue>);

impl Summary {
    fn put(&mut self, key: &str, value: impl Into<AdvisoryValue>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    fn label<T: Serialize>(&mut self, key: &str, value: &T) -> &mut Self {
        if let Ok(serde_json::Value::String(text)) = serde_json::to_value(value) {
            self.put(key, text);
        }
        self
    }

    fn premium(&mut self, premium: &PremiumBreakdown) -> &mut Self {
        self.put("base_premium", premium.base_premium)
            .put("annual_premium", premium.final_annual_premium)
            .put("monthly_premium", premium.final_monthly_premium)
    }
}

impl From<&CalculationResult> for AdvisoryRequest {
    fn from(result: &CalculationResult) -> Self {
        let mut data = Summary::default();
        data.put("tax_year", AdvisoryValue::Number(result.tax_year.into()));

        match &result.output {
            CalculatorOutput::Paycheck(pay) => {
                data.label("pay_frequency", &pay.pay_frequency)
                    .label("filing_status", &pay.filing_status)
                    .put("gross_pay", pay.gross_pay)
                    .put("federal_income_tax", pay.federal_income_tax)
                    .put("social_security", pay.social_security)
                    .put("medicare", pay.medicare)
                    .put("state_tax", pay.state_tax)
                    .put("total_taxes", pay.total_taxes)
                    .put("net_pay", pay.net_pay)
                    .put("effective_tax_rate_percent", as_percent(pay.effective_tax_rate));
                if let Some(state) = &pay.state {
                    data.put("state", state.as_str());
                }
            }
            CalculatorOutput::Salary(salary) => {
                data.label("salary_period", &salary.salary_period)
                    .put("annual", salary.equivalents.annual)
                    .put("monthly", salary.equivalents.monthly)
                    .put("hourly", salary.equivalents.hourly)
                    .put("total_taxes", salary.annual_taxes.total_taxes)
                    .put("net_annual", salary.net_annual)
                    .put("net_monthly", salary.net_monthly)
                    .put("effective_tax_rate_percent", as_percent(salary.effective_tax_rate));
            }
            CalculatorOutput::Loan(loan) => {
                data.put("principal", loan.principal)
                    .put("annual_rate_percent", as_percent(loan.annual_rate))
                    .put("term_months", loan.term_months)
                    .put("monthly_payment", loan.payment)
                    .put("total_paid", loan.total_paid)
                    .put("total_interest", loan.total_interest);
            }
            CalculatorOutput::ProfitMargin(margin) => {
                data.put("cost", margin.cost)
                    .put("revenue", margin.revenue)
                    .put("gross_profit", margin.gross_profit)
                    .put("margin_percent", margin.margin_percent)
                    .put("markup_percent", margin.markup_percent);
                if let Some(price) = margin.target_price {
                    data.put("target_price", price);
                }
            }
            CalculatorOutput::LifeInsurance(quote) => {
                data.put("age", quote.age)
                    .put("coverage_amount", quote.coverage_amount)
                    .put("term_years", quote.term_years)
                    .label("health_rating", &quote.health_rating)
                    .premium(&quote.premium);
            }
            CalculatorOutput::HealthInsurance(quote) => {
                data.put("age", quote.age)
                    .put("household_size", quote.subsidy.household_size)
                    .label("plan_tier", &quote.plan_tier)
                    .premium(&quote.premium)
                    .put("annual_subsidy", quote.subsidy.annual_subsidy)
                    .put("net_annual_premium", quote.net_annual_premium)
                    .put("net_monthly_premium", quote.net_monthly_premium);
            }
            CalculatorOutput::TravelInsurance(quote) => {
                data.put("trip_cost", quote.trip_cost)
                    .put("trip_days", quote.trip_days)
                    .put("travelers", quote.travelers)
                    .label("destination", &quote.destination)
                    .label("coverage_level", &quote.coverage_level)
                    .premium(&quote.premium);
            }
            CalculatorOutput::BusinessInsurance(quote) => {
                data.put("annual_revenue", quote.annual_revenue)
                    .put("employees", quote.employees)
                    .label("industry", &quote.industry)
                    .put("coverage_limit", quote.coverage_limit)
                    .premium(&quote.premium);
            }
            CalculatorOutput::NotComputable { message } => {
                data.put("not_computable", message.as_str());
            }
        }

        AdvisoryRequest {
            calculator_type: result.calculator.as_str().to_string(),
            data: data.0,
        }
    }
}
