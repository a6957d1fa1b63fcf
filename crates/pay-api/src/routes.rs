//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Permissive when no origins are configured; otherwise an exact allow-list
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Create the main application router
///
/// Routes:
/// - GET  /health
/// - POST /api/v1/payment/createOrder
/// - POST /api/v1/payment/verifyPayment
/// - GET  /api/v1/events/findByParams
/// - POST /api/v1/events (admin)
/// - POST /api/v1/users
/// - POST /api/v1/users/login
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let payment_routes = Router::new()
        .route("/createOrder", post(handlers::create_order))
        .route("/verifyPayment", post(handlers::verify_payment));

    let event_routes = Router::new()
        .route("/", post(handlers::create_event))
        .route("/findByParams", get(handlers::find_events));

    let user_routes = Router::new()
        .route("/", post(handlers::signup))
        .route("/login", post(handlers::login));

    let api_routes = Router::new()
        .nest("/payment", payment_routes)
        .nest("/events", event_routes)
        .nest("/users", user_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use pay_core::memory::{MemoryStore, RecordingNotifier, StubGateway};
    use pay_core::{compute_payment_signature, PurchaseStatus};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const SECRET: &str = "test_key_secret";
    const ADMIN: &str = "admin@example.com";

    struct Harness {
        server: TestServer,
        store: Arc<MemoryStore>,
        gateway: Arc<StubGateway>,
        notifier: Arc<RecordingNotifier>,
    }

    fn config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            environment: "test".into(),
            allowed_origins: vec![],
            admin_emails: vec![ADMIN.into()],
            jwt_secret: "jwt-test-secret".into(),
            jwt_ttl_minutes: None,
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let state = AppState::from_parts(
            config(),
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            notifier.clone(),
            SECRET,
        );
        let server = TestServer::new(create_router(state)).unwrap();

        Harness {
            server,
            store,
            gateway,
            notifier,
        }
    }

    async fn settle_notifications() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn token_for(server: &TestServer, name: &str, email: &str) -> String {
        let response = server
            .post("/api/v1/users")
            .json(&json!({"name": name, "email": email, "password": "secret1"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let response = h.server.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "event-checkout");
    }

    #[tokio::test]
    async fn test_create_order() {
        let h = harness();
        let event = h.store.seed_event(Decimal::new(50000, 2), "GST Workshop", false);

        let response = h
            .server
            .post("/api/v1/payment/createOrder")
            .json(&json!({
                "customer_name": "Asha",
                "mobile": "9800000000",
                "email": "asha@example.com",
                "event_id": event.id.to_string(),
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["amount"], 50000);
        assert_eq!(body["data"]["currency"], "INR");
        assert_eq!(body["data"]["keyId"], "rzp_test_stub");
        assert_eq!(body["data"]["prefill"]["contact"], "9800000000");
        assert!(!body.to_string().contains(SECRET));

        let order_id = body["data"]["orderId"].as_str().unwrap();
        let purchase = h.store.purchase(order_id).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Attempted);
    }

    #[tokio::test]
    async fn test_create_order_missing_fields() {
        let h = harness();

        let response = h
            .server
            .post("/api/v1/payment/createOrder")
            .json(&json!({"customer_name": "Asha", "email": "asha@example.com"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing required fields: mobile, event_id");
        assert_eq!(h.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_order_unknown_event() {
        let h = harness();

        let response = h
            .server
            .post("/api/v1/payment/createOrder")
            .json(&json!({
                "customer_name": "Asha",
                "mobile": "9800000000",
                "email": "asha@example.com",
                "event_id": uuid::Uuid::new_v4().to_string(),
            }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(h.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_uses_envelope() {
        let h = harness();

        let response = h
            .server
            .post("/api/v1/payment/verifyPayment")
            .content_type("application/json")
            .text("{not json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_checkout_then_verify() {
        let h = harness();
        let event = h.store.seed_event(Decimal::new(50000, 2), "GST Workshop", false);

        let created: Value = h
            .server
            .post("/api/v1/payment/createOrder")
            .json(&json!({
                "customer_name": "Asha",
                "mobile": "9800000000",
                "email": "asha@example.com",
                "event_id": event.id.to_string(),
            }))
            .await
            .json();
        let order_id = created["data"]["orderId"].as_str().unwrap().to_string();
        let signature = compute_payment_signature(SECRET, &order_id, "pay_001").unwrap();

        let response = h
            .server
            .post("/api/v1/payment/verifyPayment")
            .json(&json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_001",
                "razorpay_signature": signature,
            }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({"success": true, "message": "Payment verified"}));

        let purchase = h.store.purchase(&order_id).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Paid);

        settle_notifications().await;
        let sent = h.notifier.confirmations();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_title, "GST Workshop");
    }

    #[tokio::test]
    async fn test_tampered_signature() {
        let h = harness();
        let event = h.store.seed_event(Decimal::new(50000, 2), "GST Workshop", false);

        let created: Value = h
            .server
            .post("/api/v1/payment/createOrder")
            .json(&json!({
                "customer_name": "Asha",
                "mobile": "9800000000",
                "email": "asha@example.com",
                "event_id": event.id.to_string(),
            }))
            .await
            .json();
        let order_id = created["data"]["orderId"].as_str().unwrap().to_string();

        let response = h
            .server
            .post("/api/v1/payment/verifyPayment")
            .json(&json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_001",
                "razorpay_signature": "deadbeef",
            }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "success": false,
            "message": "Payment verification failed"
        }));
        assert_eq!(
            h.store.purchase(&order_id).unwrap().status,
            PurchaseStatus::Failed
        );

        settle_notifications().await;
        assert!(h.notifier.confirmations().is_empty());
    }

    #[tokio::test]
    async fn test_verify_missing_fields() {
        let h = harness();

        let response = h
            .server
            .post("/api/v1/payment/verifyPayment")
            .json(&json!({"razorpay_order_id": "order_1"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Missing razorpay verification fields");
    }

    #[tokio::test]
    async fn test_find_events_hides_hidden_for_anonymous() {
        let h = harness();
        h.store.seed_event(Decimal::new(50000, 2), "Visible", false);
        h.store.seed_event(Decimal::new(90000, 2), "Hidden", true);

        let response = h
            .server
            .get("/api/v1/events/findByParams")
            .add_query_param("ishidden", "true")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Visible");
    }

    #[tokio::test]
    async fn test_find_events_admin_report() {
        let h = harness();
        h.store.seed_event(Decimal::new(50000, 2), "Visible", false);
        h.store.seed_event(Decimal::new(90000, 2), "Hidden", true);
        let token = token_for(&h.server, "Admin", ADMIN).await;

        let response = h
            .server
            .get("/api/v1/events/findByParams")
            .authorization_bearer(&token)
            .add_query_param("showcustomerdetails", "true")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["total_registrations"], 0);
        assert!(data[0]["successfulPayment"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_events_query_flags() {
        let h = harness();
        h.store.seed_event(Decimal::new(50000, 2), "Visible", false);
        h.store.seed_event(Decimal::new(90000, 2), "Hidden", true);
        let token = token_for(&h.server, "Admin", ADMIN).await;

        let response = h
            .server
            .get("/api/v1/events/findByParams")
            .authorization_bearer(&token)
            .add_query_param("ishidden", "TRUE")
            .add_query_param("showcustomerdetails", "True")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Hidden");
        assert_eq!(data[0]["total_registrations"], 0);

        let response = h
            .server
            .get("/api/v1/events/findByParams")
            .add_query_param("ishidden", "yes")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid query parameters"));
    }

    #[tokio::test]
    async fn test_invalid_token_is_anonymous() {
        let h = harness();
        h.store.seed_event(Decimal::new(90000, 2), "Hidden", true);

        let response = h
            .server
            .get("/api/v1/events/findByParams")
            .authorization_bearer("garbage")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_event_requires_admin() {
        let h = harness();
        let event = json!({
            "price": "750.00",
            "title": "Tax Filing Clinic",
            "description": ["Bring your forms"],
            "eventDate": "2025-04-10",
            "eventTime": "11:00 IST",
            "eventDuration": 90,
        });

        let response = h.server.post("/api/v1/events").json(&event).await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let user_token = token_for(&h.server, "Mohit", "mohit@example.com").await;
        let response = h
            .server
            .post("/api/v1/events")
            .authorization_bearer(&user_token)
            .json(&event)
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let admin_token = token_for(&h.server, "Admin", ADMIN).await;
        let response = h
            .server
            .post("/api/v1/events")
            .authorization_bearer(&admin_token)
            .json(&event)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"][0]["title"], "Tax Filing Clinic");
        assert_eq!(body["data"][0]["is_hidden"], true);
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let h = harness();

        let response = h
            .server
            .post("/api/v1/users")
            .json(&json!({"name": "Mohit", "email": "Mohit@Example.com", "password": "secret1"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["message"], "User created successfully");
        assert_eq!(body["data"]["user"]["email"], "mohit@example.com");
        assert!(body["data"]["user"].get("password_hash").is_none());

        let response = h
            .server
            .post("/api/v1/users")
            .json(&json!({"name": "Again", "email": "mohit@example.com", "password": "secret2"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = h
            .server
            .post("/api/v1/users/login")
            .json(&json!({"email": "mohit@example.com", "password": "secret1"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Login successful");
        assert!(body["data"]["token"].as_str().is_some());

        let response = h
            .server
            .post("/api/v1/users/login")
            .json(&json!({"email": "mohit@example.com", "password": "wrong!!"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({
            "success": false,
            "message": "Invalid email or password"
        }));
    }

    #[test]
    fn test_cors_layer_accepts_lists() {
        let _ = cors_layer(&[]);
        let _ = cors_layer(&["https://events.example.com".to_string(), "bad\norigin".to_string()]);
    }
}
