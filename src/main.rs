mod app;
mod auth;
mod catalog;
mod clock;
mod config;
mod donations;
mod email;
mod error;
mod reviews;
mod state;
mod users;

use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "discnote=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    spawn_pending_sweeper(app_state.clone());

    let app = app::build_app(app_state);
    app::serve(app).await
}

/// Periodically evicts expired pending registrations. Cadence = one OTP
/// window, so an abandoned signup lingers at most one extra window.
fn spawn_pending_sweeper(state: state::AppState) {
    let period = Duration::from_secs((state.config.otp_ttl_minutes as u64) * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match state.pending.delete_expired(state.clock.now()).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(swept = n, "expired pending registrations evicted"),
                Err(e) => tracing::warn!(error = %e, "pending sweep failed"),
            }
        }
    });
}
