mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use mock_service::MockState;
    use std::time::Duration;
    use vidload::driver::{DriverError, TargetClient};
    use vidload_core::{Credentials, ResponseStatus};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn login_then_authenticated_fetch() -> anyhow::Result<()> {
        let client = mock(MockState::new()).await?;

        let login = client
            .login(&Credentials::new("test3@anb.com", "Test123!"), TIMEOUT)
            .await;
        assert!(login.outcome.success());
        let token = login.result?;
        assert!(!token.is_empty());

        let videos = client.my_videos(&token, TIMEOUT).await;
        assert!(videos.outcome.success());
        assert_eq!(videos.outcome.status(), &ResponseStatus::Http(200));
        Ok(())
    }

    #[tokio::test]
    async fn bad_tokens_are_failed_outcomes() -> anyhow::Result<()> {
        let client = mock(MockState::new()).await?;

        for token in ["", "not-a-token", "line\nbreak"] {
            let exchange = client.my_videos(token, TIMEOUT).await;
            assert!(!exchange.outcome.success(), "token {token:?}");
            assert!(exchange.result.is_err());
        }

        let unauthorized = client.my_videos("not-a-token", TIMEOUT).await;
        assert!(matches!(
            unauthorized.result,
            Err(DriverError::UnexpectedStatus {
                expected: 200,
                actual: 401
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_yields_no_token() -> anyhow::Result<()> {
        let client = mock(MockState::new()).await?;
        let login = client
            .login(&Credentials::new("test1@anb.com", "wrong"), TIMEOUT)
            .await;
        assert!(!login.outcome.success());
        assert_eq!(login.outcome.status(), &ResponseStatus::Http(401));
        Ok(())
    }

    #[tokio::test]
    async fn slow_service_times_out() -> anyhow::Result<()> {
        let client = mock(MockState::new().with_delay(Duration::from_millis(500))).await?;
        let health = client.health(Duration::from_millis(50)).await;

        assert!(!health.outcome.success());
        assert!(matches!(health.outcome.status(), ResponseStatus::Transport(_)));
        assert!(matches!(health.result, Err(DriverError::Timeout)));
        Ok(())
    }

    #[tokio::test]
    async fn closed_port_is_a_transport_failure() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let client = TargetClient::new(&format!("http://{addr}"))?;
        let rankings = client.rankings(TIMEOUT).await;
        assert!(!rankings.outcome.success());
        assert!(matches!(rankings.outcome.status(), ResponseStatus::Transport(_)));
        Ok(())
    }

    #[tokio::test]
    async fn public_endpoints_answer() -> anyhow::Result<()> {
        let client = mock(MockState::new()).await?;
        assert!(client.health(TIMEOUT).await.outcome.success());
        assert!(client.public_videos(TIMEOUT).await.outcome.success());
        assert!(client.rankings(TIMEOUT).await.outcome.success());
        Ok(())
    }
}
