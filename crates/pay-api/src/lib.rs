//! # pay-api
//!
//! HTTP API layer for event-checkout-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout endpoints (order creation, payment verification)
//! - Event listing/creation and account endpoints
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/payment/createOrder` | Create a Razorpay order for an event |
//! | POST | `/api/v1/payment/verifyPayment` | Verify the checkout callback signature |
//! | GET | `/api/v1/events/findByParams` | List events (admin report with a bearer token) |
//! | POST | `/api/v1/events` | Create an event (admin) |
//! | POST | `/api/v1/users` | Sign up |
//! | POST | `/api/v1/users/login` | Log in |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
