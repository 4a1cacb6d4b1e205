use mock_service::MockState;
use std::sync::OnceLock;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;
use vidload::driver::TargetClient;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("vidload=debug,mock_service=debug,axum::rejection=trace")
            .try_init();
    });
}

/// Start a fresh mock service and return a client pointed at it.
#[allow(unused)]
pub async fn mock(state: MockState) -> anyhow::Result<TargetClient> {
    init();
    let addr = mock_service::spawn(state).await?;
    Ok(TargetClient::new(&format!("http://{addr}"))?)
}
