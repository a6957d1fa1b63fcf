//! # Request Handlers
//!
//! Axum request handlers for the checkout API.
//! Every response uses the `{success, ...}` envelope the browser client expects.

use crate::auth::{AdminUser, AuthPayload, LoginRequest, MaybeUser, SignupRequest};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use pay_core::{
    CreateOrderRequest, CreateOrderResponse, Event, EventListing, EventQuery, NewEvent,
    PaymentError, VerificationOutcome, VerifyPaymentRequest,
};
use serde::Serialize;
use tracing::{error, instrument, warn};

// =============================================================================
// Response Envelopes
// =============================================================================

/// `{success, data}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// `{success, message, data?}`
#[derive(Debug, Serialize)]
pub struct MessageResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    if err.is_internal() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, status = code, "request rejected");
    }

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(err.public_message())))
}

/// Malformed JSON gets the same envelope as a validation failure
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        payment_error_to_response(PaymentError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    })
}

/// Same for a query string that does not parse
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(value)| value).map_err(|rejection| {
        payment_error_to_response(PaymentError::InvalidInput(format!(
            "Invalid query parameters: {}",
            rejection.body_text()
        )))
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "event-checkout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a Razorpay order for an event
#[instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<DataResponse<CreateOrderResponse>>, ApiError> {
    let request = json_body(body)?;

    let order = state
        .checkout
        .create_order(&request)
        .await
        .map_err(payment_error_to_response)?;

    Ok(DataResponse::ok(order))
}

/// Verify the checkout widget's payment callback
///
/// A signature mismatch is a normal `200` with `success: false`.
#[instrument(skip(state, body))]
pub async fn verify_payment(
    State(state): State<AppState>,
    body: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerificationOutcome>, ApiError> {
    let request = json_body(body)?;

    let outcome = state
        .checkout
        .verify_payment(&request)
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(outcome))
}

#[instrument(skip(state, caller, query))]
pub async fn find_events(
    State(state): State<AppState>,
    caller: MaybeUser,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Json<DataResponse<EventListing>>, ApiError> {
    let query = query_params(query)?;
    let is_admin = caller.is_admin(&state);

    let listing = state
        .catalog
        .find(&query, is_admin)
        .await
        .map_err(payment_error_to_response)?;

    Ok(DataResponse::ok(listing))
}

#[instrument(skip(state, admin, body), fields(admin = %admin.0.email))]
pub async fn create_event(
    State(state): State<AppState>,
    admin: AdminUser,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Vec<Event>>>), ApiError> {
    let new_event = json_body(body)?;

    let event = state
        .catalog
        .create(&new_event)
        .await
        .map_err(payment_error_to_response)?;

    Ok((StatusCode::CREATED, DataResponse::ok(vec![event])))
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse<AuthPayload>>), ApiError> {
    let request = json_body(body)?;

    let payload = state
        .accounts
        .signup(&request)
        .await
        .map_err(payment_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message: "User created successfully".to_string(),
            data: Some(payload),
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<MessageResponse<AuthPayload>>, ApiError> {
    let request = json_body(body)?;

    let payload = state
        .accounts
        .login(&request)
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Login successful".to_string(),
        data: Some(payload),
    }))
}
