//! HTTP API module for the financial calculation engine.
//!
//! This module provides the REST API endpoints for running calculators,
//! fetching stored results and building advisory payloads.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::CalculationRequest;
pub use response::{ApiError, ApiErrorResponse, CalculatorCatalog};
pub use state::AppState;
