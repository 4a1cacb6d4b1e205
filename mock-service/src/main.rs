use mock_service::{run, tps_measure_task, MockState};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `MOCK_ADDR` (default `0.0.0.0:8000`), `MOCK_DELAY_MS` and `MOCK_MAX_TPS` tune the service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_service=info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("MOCK_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;

    let mut state = MockState::new();
    if let Ok(delay) = std::env::var("MOCK_DELAY_MS") {
        state = state.with_delay(Duration::from_millis(delay.parse()?));
    }
    if let Ok(tps) = std::env::var("MOCK_MAX_TPS") {
        state = state.with_rate_limit(tps.parse()?);
    }

    tokio::task::spawn(async { tps_measure_task().await });
    run(addr, state).await
}
