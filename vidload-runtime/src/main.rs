use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vidload_runtime::VidloadRuntime;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vidload=info,vidload_runtime=info"));
    FmtSubscriber::builder().with_env_filter(filter).init();

    match VidloadRuntime::new().with_args().run().await {
        Ok(report) => {
            println!("{report}");
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(2)
        }
    }
}
