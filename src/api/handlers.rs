//! HTTP request handlers for the calculation API.
//!
//! This module contains the handler functions for all API endpoints.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::advisory::AdvisoryRequest;
use crate::calculators::{CalculatorKind, calculate};
use crate::models::CalculationResult;

use super::request::CalculationRequest;
use super::response::{ApiError, ApiErrorResponse, CalculatorCatalog};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate/:calculator", post(calculate_handler))
        .route("/calculators", get(list_calculators_handler))
        .route("/results/:id", get(get_result_handler))
        .route("/results/:id/advisory", get(advisory_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], Json(body)).into_response()
}

fn error_response(error: ApiErrorResponse) -> Response {
    json_response(error.status, error.error)
}

fn rejection_to_error(rejection: JsonRejection, correlation_id: Uuid) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            ApiError::malformed_json(body_text)
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    }
}

/// Handler for `POST /calculate/{calculator}`.
///
/// Runs the calculator, stores the result and returns it. A form that cannot
/// be computed still returns 200 with a `not_computable` output.
async fn calculate_handler(
    State(state): State<AppState>,
    Path(calculator): Path<String>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, calculator = %calculator, "Processing calculation request");

    let kind = match calculator.parse::<CalculatorKind>() {
        Ok(kind) => kind,
        Err(err) => {
            warn!(correlation_id = %correlation_id, calculator = %calculator, "Unknown calculator");
            return error_response(err.into());
        }
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return json_response(StatusCode::BAD_REQUEST, rejection_to_error(rejection, correlation_id));
        }
    };

    let config = state.config();
    let tables = match request.tax_year {
        None => config.latest(),
        Some(year) => match config.tables_for(year) {
            Ok(tables) => tables,
            Err(err) => {
                warn!(correlation_id = %correlation_id, tax_year = year, "No rate tables for tax year");
                return error_response(err.into());
            }
        },
    };

    let result = calculate(kind, &request.inputs, tables);
    if let Err(err) = state.results().put(result.clone()) {
        warn!(correlation_id = %correlation_id, error = %err, "Failed to store result");
        return error_response(err.into());
    }

    info!(
        correlation_id = %correlation_id,
        calculation_id = %result.calculation_id,
        calculator = %kind,
        computable = result.is_computable(),
        warnings = result.audit_trace.warnings.len(),
        duration_us = result.audit_trace.duration_us,
        "Calculation stored"
    );
    json_response(StatusCode::OK, result)
}

/// Handler for `GET /calculators`.
async fn list_calculators_handler(State(state): State<AppState>) -> Response {
    let config = state.config();
    json_response(
        StatusCode::OK,
        CalculatorCatalog {
            jurisdiction: config.metadata().code.clone(),
            tax_years: config.tax_years(),
            calculators: CalculatorKind::ALL.to_vec(),
        },
    )
}

fn find_result(state: &AppState, id: &str) -> Result<CalculationResult, ApiErrorResponse> {
    let not_found = || ApiErrorResponse::new(StatusCode::NOT_FOUND, ApiError::result_not_found(id));
    let id = Uuid::parse_str(id).map_err(|_| not_found())?;
    state.results().get(id).ok_or_else(not_found)
}

/// Handler for `GET /results/{id}`.
async fn get_result_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match find_result(&state, &id) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => {
            info!(result_id = %id, "Result not found");
            error_response(err)
        }
    }
}

/// Handler for `GET /results/{id}/advisory`.
///
/// Returns the summary handed to the advisory service for a stored result.
async fn advisory_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match find_result(&state, &id) {
        Ok(result) => json_response(StatusCode::OK, AdvisoryRequest::from(&result)),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tower::ServiceExt;

    use crate::calculators::CalculatorOutput;
    use crate::config::ConfigLoader;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/us").expect("Failed to load config");
        AppState::new(config)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_loan_calculation_returns_result() {
        let router = create_router(create_test_state());
        let body = r#"{ "principal": "2500000", "annual_rate": 8.5, "term_years": 20 }"#;

        let (status, body) = send(router, post("/calculate/loan", body)).await;
        assert_eq!(status, StatusCode::OK);

        let result: CalculationResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.calculator, CalculatorKind::Loan);
        match result.output {
            CalculatorOutput::Loan(loan) => {
                assert_eq!(loan.payment, Decimal::from_str("21695.58").unwrap())
            }
            other => panic!("Expected loan output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());

        let (status, body) = send(router, post("/calculate/loan", "{invalid json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_unknown_calculator_returns_404() {
        let router = create_router(create_test_state());

        let (status, body) = send(router, post("/calculate/mortgage_refi", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "UNKNOWN_CALCULATOR");
    }

    #[tokio::test]
    async fn test_unknown_tax_year_returns_400() {
        let router = create_router(create_test_state());

        let (status, body) = send(router, post("/calculate/salary", r#"{ "tax_year": 2001 }"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "TAX_YEAR_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_stored_result_can_be_fetched() {
        let state = create_test_state();
        let body = r#"{ "cost": 60, "revenue": 100 }"#;

        let (_, body) = send(create_router(state.clone()), post("/calculate/profit_margin", body)).await;
        let created: CalculationResult = serde_json::from_slice(&body).unwrap();

        let uri = format!("/results/{}", created.calculation_id);
        let (status, body) = send(create_router(state), get_request(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: CalculationResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_missing_result_returns_404() {
        let router = create_router(create_test_state());
        let uri = format!("/results/{}", Uuid::new_v4());

        let (status, body) = send(router, get_request(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "RESULT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_calculators() {
        let router = create_router(create_test_state());

        let (status, body) = send(router, get_request("/calculators")).await;
        assert_eq!(status, StatusCode::OK);
        let catalog: CalculatorCatalog = serde_json::from_slice(&body).unwrap();
        assert_eq!(catalog.jurisdiction, "US");
        assert_eq!(catalog.tax_years, vec![2024, 2025]);
        assert_eq!(catalog.calculators.len(), 8);
    }

    #[tokio::test]
    async fn test_bounded_store_forgets_oldest_result() {
        use crate::store::InMemoryResultStore;
        use std::sync::Arc;

        let config = ConfigLoader::load("./config/us").expect("Failed to load config");
        let state = AppState::with_store(config, Arc::new(InMemoryResultStore::with_capacity(2)));
        let body = r#"{ "cost": 60, "revenue": 100 }"#;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (_, body) = send(create_router(state.clone()), post("/calculate/profit_margin", body)).await;
            let created: CalculationResult = serde_json::from_slice(&body).unwrap();
            ids.push(created.calculation_id);
        }
        assert_eq!(state.results().len(), 2);

        let (status, _) = send(create_router(state.clone()), get_request(&format!("/results/{}", ids[0]))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(create_router(state), get_request(&format!("/results/{}", ids[2]))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
