//! # Event Checkout
//!
//! Event registration and Razorpay payment backend.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export DATABASE_URL=postgres://localhost/events
//! export RAZORPAY_KEY_ID=rzp_test_...
//! export RAZORPAY_KEY_SECRET=...
//! export JWT_SECRET=...
//!
//! # Run the server
//! event-checkout
//! ```

use pay_api::{routes, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    print_banner();

    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment gateway key: {}", state.checkout.key_id());
    if state.config.admin_emails.is_empty() {
        warn!("ADMIN_EMAILS is empty; event creation is disabled");
    }
    if state.config.allowed_origins.is_empty() {
        warn!("ALLOWED_ORIGINS is empty; CORS is permissive");
    }

    let app = routes::create_router(state);

    info!("Event checkout listening on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Create order: POST http://{}/api/v1/payment/createOrder", addr);
        info!("Verify payment: POST http://{}/api/v1/payment/verifyPayment", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

fn print_banner() {
    println!(
        r#"
  Event Checkout
  ━━━━━━━━━━━━━━━━━━━━━━━
  Registrations & Razorpay payments
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
