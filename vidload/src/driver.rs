//! Request driver: the HTTP client for the service under test and the two workloads built on
//! it.
mod actions;
mod client;
mod error;
mod upload;
mod web;

pub use actions::{ActionTable, ActionTableError};
pub use client::{Exchange, TargetClient};
pub use error::DriverError;
pub use upload::UploadCapacity;
pub use web::{WebAction, WebCapacity};

use crate::metrics::MetricsError;
use crate::workload::VirtualUser;
use std::time::Duration;
use thiserror::Error;
use vidload_core::CredentialPool;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Actions(#[from] ActionTableError),
}

/// Record the exchange on the user's session and narrate a failure, returning the payload.
pub(crate) fn settle<T>(user: &VirtualUser, exchange: Exchange<T>) -> Option<T> {
    let Exchange { outcome, result } = exchange;
    if let Err(err) = &result {
        warn!(
            "{} user {}: {} failed ({}): {err}",
            user.scenario(),
            user.id(),
            outcome.action(),
            outcome.status()
        );
    }
    user.record(outcome);
    result.ok()
}

/// Log in with a credential drawn from `users`. The user's session token is replaced on success
/// and cleared on failure.
pub(crate) async fn sign_in(
    client: &TargetClient,
    users: &CredentialPool,
    user: &mut VirtualUser,
    timeout: Duration,
) -> Exchange<String> {
    let credentials = users.choose(user.rng());
    let exchange = client.login(credentials, timeout).await;
    match &exchange.result {
        Ok(token) => user.set_token(token.clone()),
        Err(_) => user.clear_token(),
    }
    exchange
}
