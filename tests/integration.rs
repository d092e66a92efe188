//! End-to-end tests for the financial calculation engine.
//!
//! This suite drives the HTTP router with the shipped US rate tables and covers:
//! - Paycheck withholding and the Social Security wage cap
//! - Salary conversion
//! - Loan amortization
//! - Profit margin
//! - Insurance premiums and the health subsidy
//! - Stored results and advisory payloads
//! - Error cases

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use tower::ServiceExt;

use finance_calc_engine::api::{AppState, create_router};
use finance_calc_engine::config::ConfigLoader;

// =============================================================================
// Test Helpers
// =============================================================================

fn create_test_state() -> AppState {
    let config = ConfigLoader::load("./config/us").expect("Failed to load config");
    AppState::new(config)
}

fn create_router_for_test() -> Router {
    create_router(create_test_state())
}

/// Normalize decimal string by removing trailing zeros after decimal point
fn normalize_decimal(s: &str) -> String {
    Decimal::from_str(s).unwrap().normalize().to_string()
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();
    (status, json)
}

async fn post_calculate(router: Router, calculator: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/calculate/{}", calculator))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

fn assert_amount(value: &Value, expected: &str) {
    let actual = value
        .as_str()
        .unwrap_or_else(|| panic!("Expected a decimal string, got {}", value));
    assert_eq!(
        normalize_decimal(actual),
        normalize_decimal(expected),
        "Expected {}, got {}",
        expected,
        actual
    );
}

fn reference_paycheck() -> Value {
    json!({
        "tax_year": 2024,
        "annual_salary": 75000,
        "pay_frequency": "biweekly",
        "retirement_percent": 5,
        "state": "CA",
        "filing_status": "single"
    })
}

// =============================================================================
// SECTION 1: Paycheck
// =============================================================================

#[tokio::test]
async fn test_paycheck_reference_biweekly_california() {
    let (status, result) = post_calculate(create_router_for_test(), "paycheck", reference_paycheck()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["tax_year"], 2024);
    let output = &result["output"];
    assert_eq!(output["kind"], "paycheck");
    assert_amount(&output["gross_pay"], "2884.62");
    assert_amount(&output["federal_income_tax"], "289.08");
    assert_amount(&output["social_security"], "178.85");
    assert_amount(&output["medicare"], "41.83");
    assert_amount(&output["state_tax"], "254.86");
    assert_amount(&output["net_pay"], "1975.78");
}

#[tokio::test]
async fn test_paycheck_accepts_formatted_numbers() {
    let mut body = reference_paycheck();
    body["annual_salary"] = json!("$75,000");

    let (_, result) = post_calculate(create_router_for_test(), "paycheck", body).await;
    assert_amount(&result["output"]["net_pay"], "1975.78");
    assert!(result["audit_trace"]["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_paycheck_federal_bracket_lines() {
    let (_, result) = post_calculate(create_router_for_test(), "paycheck", reference_paycheck()).await;

    let federal = &result["output"]["federal"];
    assert_amount(&federal["annual_taxable_income"], "56650");
    assert_amount(&federal["annual_tax"], "7516");
    assert_eq!(federal["bracket_lines"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_paycheck_projection_reaches_social_security_cap() {
    let body = json!({
        "tax_year": 2024,
        "annual_salary": 260000,
        "pay_frequency": "biweekly"
    });

    let (_, result) = post_calculate(create_router_for_test(), "paycheck", body).await;
    let output = &result["output"];
    assert_eq!(output["social_security_cap_period"], 17);

    let projection = output["projection"].as_array().unwrap();
    assert_eq!(projection.len(), 26);
    assert_amount(&projection[16]["social_security"], "533.20");
    assert_amount(&projection[17]["social_security"], "0");
    assert_eq!(projection[17]["social_security_cap_reached"], true);
}

#[tokio::test]
async fn test_paycheck_unknown_state_warns() {
    let mut body = reference_paycheck();
    body["state"] = json!("ZZ");

    let (status, result) = post_calculate(create_router_for_test(), "paycheck", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_amount(&result["output"]["state_tax"], "0");
    let warnings = result["audit_trace"]["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w["code"] == "UNKNOWN_STATE"));
}

#[tokio::test]
async fn test_paycheck_defaults_to_latest_tax_year() {
    let mut body = reference_paycheck();
    body.as_object_mut().unwrap().remove("tax_year");

    let (_, result) = post_calculate(create_router_for_test(), "paycheck", body).await;
    assert_eq!(result["tax_year"], 2025);
}

#[tokio::test]
async fn test_paycheck_later_year_resolves_to_latest_tables() {
    let mut body = reference_paycheck();
    body["tax_year"] = json!(2031);

    let (status, result) = post_calculate(create_router_for_test(), "paycheck", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["tax_year"], 2025);
}

#[tokio::test]
async fn test_paycheck_audit_trace_is_numbered() {
    let (_, result) = post_calculate(create_router_for_test(), "paycheck", reference_paycheck()).await;

    let steps = result["audit_trace"]["steps"].as_array().unwrap();
    assert!(!steps.is_empty());
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step["step_number"], (i + 1) as u64);
    }
    assert_eq!(steps[0]["rule_id"], "gross_pay");
}

// =============================================================================
// SECTION 2: Salary
// =============================================================================

#[tokio::test]
async fn test_salary_hourly_conversion() {
    let body = json!({ "tax_year": 2024, "salary_amount": 30, "salary_period": "hourly" });

    let (_, result) = post_calculate(create_router_for_test(), "salary", body).await;
    let equivalents = &result["output"]["equivalents"];
    assert_amount(&equivalents["annual"], "62400");
    assert_amount(&equivalents["monthly"], "5200");
    assert_amount(&equivalents["biweekly"], "2400");
}

#[tokio::test]
async fn test_salary_net_after_taxes_in_texas() {
    let body = json!({ "tax_year": 2024, "salary_amount": "75,000", "state": "TX" });

    let (_, result) = post_calculate(create_router_for_test(), "salary", body).await;
    assert_amount(&result["output"]["net_annual"], "60921.50");
    assert_amount(&result["output"]["net_monthly"], "5076.79");
}

// =============================================================================
// SECTION 3: Loan
// =============================================================================

#[tokio::test]
async fn test_loan_emi_and_totals() {
    let body = json!({ "principal": "2,500,000", "annual_rate": 8.5, "term_years": 20 });

    let (_, result) = post_calculate(create_router_for_test(), "loan", body).await;
    let output = &result["output"];
    assert_eq!(output["kind"], "loan");
    assert_eq!(output["term_months"], 240);
    assert_amount(&output["payment"], "21695.58");
    assert_amount(&output["total_interest"], "2706939.40");
    assert_eq!(output["preview"].as_array().unwrap().len(), 12);
    assert_eq!(output["yearly_summary"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_loan_first_row_splits_interest_and_principal() {
    let body = json!({ "principal": 2500000, "annual_rate": "8.5", "term_months": 240 });

    let (_, result) = post_calculate(create_router_for_test(), "loan", body).await;
    let first = &result["output"]["preview"][0];
    assert_amount(&first["interest_portion"], "17708.33");
    assert_amount(&first["principal_portion"], "3987.25");
}

#[tokio::test]
async fn test_loan_zero_rate_is_straight_line() {
    let body = json!({ "principal": 12000, "annual_rate": 0, "term_months": 12 });

    let (_, result) = post_calculate(create_router_for_test(), "loan", body).await;
    assert_amount(&result["output"]["payment"], "1000");
    assert_amount(&result["output"]["total_interest"], "0");
}

#[tokio::test]
async fn test_loan_without_principal_is_not_computable() {
    let body = json!({ "principal": "", "annual_rate": 7, "term_years": 5 });

    let (status, result) = post_calculate(create_router_for_test(), "loan", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["output"]["kind"], "not_computable");
    assert!(result["output"]["message"].as_str().is_some());
}

// =============================================================================
// SECTION 4: Profit Margin
// =============================================================================

#[tokio::test]
async fn test_profit_margin_with_target() {
    let body = json!({ "cost": 60, "revenue": 100, "target_margin_percent": 50 });

    let (_, result) = post_calculate(create_router_for_test(), "profit-margin", body).await;
    let output = &result["output"];
    assert_amount(&output["margin_percent"], "40");
    assert_amount(&output["markup_percent"], "66.67");
    assert_amount(&output["target_price"], "120");
}

#[tokio::test]
async fn test_profit_margin_invalid_cost_is_defaulted() {
    let body = json!({ "cost": "abc", "revenue": 100 });

    let (_, result) = post_calculate(create_router_for_test(), "profit_margin", body).await;
    assert_amount(&result["output"]["gross_profit"], "100");
    let warnings = result["audit_trace"]["warnings"].as_array().unwrap();
    assert_eq!(warnings[0]["code"], "INPUT_DEFAULTED");
}

// =============================================================================
// SECTION 5: Insurance Premiums
// =============================================================================

#[tokio::test]
async fn test_life_insurance_smoker_with_rider() {
    let body = json!({
        "age": 35,
        "coverage_amount": 500000,
        "gender": "male",
        "smoker": true,
        "critical_illness_rider": "yes"
    });

    let (_, result) = post_calculate(create_router_for_test(), "life_insurance", body).await;
    let premium = &result["output"]["premium"];
    assert_amount(&premium["adjusted_premium"], "1306.25");
    assert_amount(&premium["final_annual_premium"], "1523.75");
    assert_amount(&premium["final_monthly_premium"], "126.98");
}

#[tokio::test]
async fn test_life_insurance_lists_every_factor() {
    let body = json!({ "age": 35, "coverage_amount": 500000 });

    let (_, result) = post_calculate(create_router_for_test(), "life_insurance", body).await;
    let contributions = result["output"]["premium"]["contributions"].as_array().unwrap();
    assert_eq!(contributions.len(), 9);
    let applied: Vec<&str> = contributions
        .iter()
        .filter(|c| c["applied"] == true)
        .map(|c| c["factor_id"].as_str().unwrap())
        .collect();
    assert_eq!(applied, vec!["policy_fee"]);
}

#[tokio::test]
async fn test_health_insurance_subsidy() {
    let body = json!({ "tax_year": 2024, "age": 40, "household_income": 30000 });

    let (_, result) = post_calculate(create_router_for_test(), "health_insurance", body).await;
    let output = &result["output"];
    assert_amount(&output["premium"]["final_annual_premium"], "6129");
    assert_eq!(output["subsidy"]["resolution"]["eligible"], true);
    assert_eq!(output["subsidy"]["resolution"]["tier"], 2);
    assert_amount(&output["subsidy"]["annual_subsidy"], "4596.75");
    assert_amount(&output["net_monthly_premium"], "127.69");
}

#[tokio::test]
async fn test_health_insurance_high_income_is_ineligible() {
    let body = json!({ "tax_year": 2024, "age": 40, "household_income": 120000 });

    let (_, result) = post_calculate(create_router_for_test(), "health_insurance", body).await;
    let output = &result["output"];
    assert_eq!(output["subsidy"]["resolution"]["eligible"], false);
    assert_amount(&output["subsidy"]["annual_subsidy"], "0");
    assert_amount(&output["net_annual_premium"], "6129");
}

#[tokio::test]
async fn test_travel_insurance_europe_trip() {
    let body = json!({
        "trip_cost": 4000,
        "trip_days": 10,
        "oldest_age": 30,
        "destination": "europe"
    });

    let (_, result) = post_calculate(create_router_for_test(), "travel_insurance", body).await;
    assert_amount(&result["output"]["premium"]["final_annual_premium"], "220");
}

#[tokio::test]
async fn test_business_insurance_construction_with_cyber() {
    let body = json!({
        "annual_revenue": 500000,
        "employees": 5,
        "industry": "construction",
        "cyber_liability": true
    });

    let (_, result) = post_calculate(create_router_for_test(), "business_insurance", body).await;
    assert_amount(&result["output"]["premium"]["final_annual_premium"], "5082.50");
}

#[tokio::test]
async fn test_unknown_option_falls_back_with_warning() {
    let body = json!({ "age": 35, "coverage_amount": 500000, "health_rating": "superb" });

    let (_, result) = post_calculate(create_router_for_test(), "life_insurance", body).await;
    assert_eq!(result["output"]["health_rating"], "good");
    let warnings = result["audit_trace"]["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w["code"] == "UNKNOWN_OPTION"));
}

// =============================================================================
// SECTION 6: Stored Results and Advisory Payloads
// =============================================================================

#[tokio::test]
async fn test_result_is_stored_and_fetchable() {
    let state = create_test_state();
    let (_, created) =
        post_calculate(create_router(state.clone()), "paycheck", reference_paycheck()).await;
    let id = created["calculation_id"].as_str().unwrap();

    let (status, fetched) = get_json(create_router(state), &format!("/results/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_advisory_payload_for_stored_result() {
    let state = create_test_state();
    let (_, created) =
        post_calculate(create_router(state.clone()), "paycheck", reference_paycheck()).await;
    let id = created["calculation_id"].as_str().unwrap();

    let (status, advisory) = get_json(create_router(state), &format!("/results/{}/advisory", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advisory["calculatorType"], "paycheck");
    assert_eq!(advisory["data"]["net_pay"], json!(1975.78));
    assert_eq!(advisory["data"]["state"], "CA");
    assert_eq!(advisory["data"]["filing_status"], "single");
}

#[tokio::test]
async fn test_unknown_result_id_returns_404() {
    let (status, error) = get_json(create_router_for_test(), "/results/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "RESULT_NOT_FOUND");
}

#[tokio::test]
async fn test_calculator_catalog() {
    let (status, catalog) = get_json(create_router_for_test(), "/calculators").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(catalog["jurisdiction"], "US");
    assert_eq!(catalog["tax_years"], json!([2024, 2025]));
    assert_eq!(catalog["calculators"][0], "paycheck");
    assert_eq!(catalog["calculators"].as_array().unwrap().len(), 8);
}

// =============================================================================
// SECTION 7: Error Cases
// =============================================================================

#[tokio::test]
async fn test_error_malformed_json() {
    let router = create_router_for_test();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/calculate/paycheck")
                .header("Content-Type", "application/json")
                .body(Body::from("{invalid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    let (status, error) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "MALFORMED_JSON");
}

#[tokio::test]
async fn test_error_body_is_not_an_object() {
    let (status, error) = post_calculate(create_router_for_test(), "loan", json!([1, 2, 3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "MALFORMED_JSON");
}

#[tokio::test]
async fn test_error_unknown_calculator() {
    let (status, error) = post_calculate(create_router_for_test(), "crypto_mining", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "UNKNOWN_CALCULATOR");
}

#[tokio::test]
async fn test_error_tax_year_before_tables() {
    let mut body = reference_paycheck();
    body["tax_year"] = json!(2010);

    let (status, error) = post_calculate(create_router_for_test(), "paycheck", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "TAX_YEAR_NOT_FOUND");
}

#[tokio::test]
async fn test_every_calculator_accepts_an_empty_form() {
    let state = create_test_state();
    for calculator in [
        "paycheck",
        "salary",
        "loan",
        "profit_margin",
        "life_insurance",
        "health_insurance",
        "travel_insurance",
        "business_insurance",
    ] {
        let (status, result) = post_calculate(create_router(state.clone()), calculator, json!({})).await;
        assert_eq!(status, StatusCode::OK, "calculator {}", calculator);
        assert_eq!(result["calculator"], calculator);
    }
}

#[tokio::test]
async fn test_extreme_values_never_fail_a_request() {
    let state = create_test_state();
    let cases = [
        ("paycheck", json!({ "hourly_rate": "7e28" })),
        ("paycheck", json!({ "hourly_rate": "900000000000000", "hours_per_week": "900000000000000" })),
        ("salary", json!({ "salary_amount": "7e28", "salary_period": "hourly" })),
        ("profit_margin", json!({ "cost": "1e14", "revenue": "1e-20" })),
        ("health_insurance", json!({ "children": 20_000_000, "dental": true })),
        ("health_insurance", json!({ "adults": 4_000_000_000u64, "children": 1_000_000_000 })),
        ("travel_insurance", json!({ "trip_cost": "1e15", "travelers": 1_000_000, "trip_days": 1_000_000 })),
        ("business_insurance", json!({ "annual_revenue": "1e15", "employees": 1_000_000, "prior_claims": 1_000_000 })),
    ];

    for (calculator, body) in cases {
        let (status, result) = post_calculate(create_router(state.clone()), calculator, body.clone()).await;
        assert_eq!(status, StatusCode::OK, "{} with {}", calculator, body);
        assert_eq!(result["calculator"], calculator);
    }
}

#[tokio::test]
async fn test_oversized_hourly_pay_reports_not_computable() {
    let (status, result) = post_calculate(
        create_router_for_test(),
        "paycheck",
        json!({ "hourly_rate": "900000000000000", "hours_per_week": "900000000000000" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["output"]["kind"], "not_computable");
}
