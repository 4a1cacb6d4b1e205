use serde::Serialize;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// The kind of HTTP exchange an outcome describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Health,
    PublicVideos,
    Rankings,
    Login,
    MyVideos,
    Upload,
    ReadBack,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Health => "health",
            ActionKind::PublicVideos => "public_videos",
            ActionKind::Rankings => "rankings",
            ActionKind::Login => "login",
            ActionKind::MyVideos => "my_videos",
            ActionKind::Upload => "upload",
            ActionKind::ReadBack => "read_back",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What came back from the wire: a status code, or nothing because the transport failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Http(u16),
    Transport(String),
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Http(code) => write!(f, "HTTP {code}"),
            ResponseStatus::Transport(reason) => write!(f, "transport error: {reason}"),
        }
    }
}

/// Immutable record of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    action: ActionKind,
    status: ResponseStatus,
    latency: Duration,
    timestamp: OffsetDateTime,
    success: bool,
}

impl RequestOutcome {
    pub fn new(action: ActionKind, status: ResponseStatus, latency: Duration, success: bool) -> Self {
        Self {
            action,
            status,
            latency,
            timestamp: OffsetDateTime::now_utc(),
            success,
        }
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn status(&self) -> &ResponseStatus {
        &self.status
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {:?} ({})",
            self.action,
            if self.success { "ok" } else { "failed" },
            self.latency,
            self.status,
        )
    }
}
