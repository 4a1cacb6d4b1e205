use super::{settle, sign_in, ActionTable, Exchange, TargetClient, WorkloadError};
use crate::metrics::{Counter, Metrics, Rate, Trend};
use crate::workload::{VirtualUser, Workload};
use vidload_core::{CredentialPool, HEALTH_TIMEOUT, REQUEST_TIMEOUT};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const ERRORS: &str = "errors";
pub const LATENCY: &str = "latency";
pub const SUCCESSFUL_REQUESTS: &str = "successful_requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebAction {
    Health,
    PublicVideos,
    Rankings,
    /// Log in, then list the caller's videos.
    MyVideos,
}

/// Read-heavy web traffic: one weighted action per iteration, then think time.
///
/// Besides the built-in HTTP series it records `errors` (rate of failed calls, logins
/// included), `latency` (trend of the action call) and `successful_requests` (counter).
pub struct WebCapacity {
    client: TargetClient,
    users: CredentialPool,
    actions: ActionTable<WebAction>,
    errors: Rate,
    latency: Trend,
    successful: Counter,
}

impl WebCapacity {
    pub fn new(
        client: TargetClient,
        users: CredentialPool,
        metrics: &Metrics,
    ) -> Result<Self, WorkloadError> {
        Ok(Self {
            client,
            users,
            actions: Self::default_actions()?,
            errors: metrics.rate(ERRORS)?,
            latency: metrics.trend(LATENCY)?,
            successful: metrics.counter(SUCCESSFUL_REQUESTS)?,
        })
    }

    /// 10% health, 30% public videos, 30% rankings, 30% login + own videos.
    pub fn default_actions() -> Result<ActionTable<WebAction>, WorkloadError> {
        Ok(ActionTable::cumulative(vec![
            (0.1, WebAction::Health),
            (0.4, WebAction::PublicVideos),
            (0.7, WebAction::Rankings),
            (1.0, WebAction::MyVideos),
        ])?)
    }

    pub fn with_actions(mut self, actions: ActionTable<WebAction>) -> Self {
        self.actions = actions;
        self
    }

    fn observe<T>(&self, user: &VirtualUser, exchange: Exchange<T>) -> Option<T> {
        let success = exchange.outcome.success();
        self.errors.add(!success);
        self.latency.add_duration(exchange.outcome.latency());
        if success {
            self.successful.increment(1);
        }
        settle(user, exchange)
    }
}

impl Workload for WebCapacity {
    async fn iteration(&self, user: &mut VirtualUser) {
        let action = *self.actions.pick(user.draw());
        trace!("{} user {} -> {action:?}", user.scenario(), user.id());

        match action {
            WebAction::Health => {
                let exchange = self.client.health(HEALTH_TIMEOUT).await;
                self.observe(user, exchange);
            }
            WebAction::PublicVideos => {
                let exchange = self.client.public_videos(REQUEST_TIMEOUT).await;
                self.observe(user, exchange);
            }
            WebAction::Rankings => {
                let exchange = self.client.rankings(REQUEST_TIMEOUT).await;
                self.observe(user, exchange);
            }
            WebAction::MyVideos => {
                let login = sign_in(&self.client, &self.users, user, REQUEST_TIMEOUT).await;
                self.errors.add(!login.outcome.success());
                if let Some(token) = settle(user, login) {
                    let exchange = self.client.my_videos(&token, REQUEST_TIMEOUT).await;
                    self.observe(user, exchange);
                }
            }
        }

        user.think().await;
    }
}
