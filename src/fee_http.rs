//! HTTP fee-estimation endpoint.
//!
//! The relay engine does not depend on this endpoint at all. This is a thin
//! seam so a real deployment can expose one without touching the engine — it
//! shares only the sender's gas-estimation path, which is already
//! mutex-guarded internally.

use axum::{Json, Router, routing::get};
use serde::Serialize;

#[derive(Serialize)]
struct FeeEstimateResponse {
    gas_price: u128,
}

/// Builds the router for the fee-estimation endpoint. `gas_price` is the
/// same configured value the Tx Builder/Sender uses.
pub fn router(gas_price: u128) -> Router {
    Router::new().route(
        "/fee",
        get(move || async move { Json(FeeEstimateResponse { gas_price }) }),
    )
}
