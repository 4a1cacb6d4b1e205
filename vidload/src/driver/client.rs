use super::DriverError;
use crate::multipart::MultipartBody;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;
use vidload_core::{ActionKind, Credentials, RequestOutcome, ResponseStatus};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One HTTP exchange: the outcome to record plus the decoded payload, if any.
#[derive(Debug)]
pub struct Exchange<T> {
    pub outcome: RequestOutcome,
    pub result: Result<T, DriverError>,
}

/// HTTP client bound to the service under test.
///
/// Every call carries its own timeout. Transport errors, timeouts, unexpected statuses and
/// malformed bodies all come back as a failed [`Exchange`]; none of them is returned as an
/// `Err` to the caller.
#[derive(Debug, Clone)]
pub struct TargetClient {
    http: reqwest::Client,
    base: Url,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedVideo {
    video_id: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct VideoView {
    status: Option<String>,
}

impl TargetClient {
    pub fn new(base_url: &str) -> Result<Self, DriverError> {
        let mut base = Url::parse(base_url).map_err(|source| DriverError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(DriverError::UnsupportedScheme(base_url.to_string()));
        }
        base.set_fragment(None);

        let http = reqwest::Client::builder()
            .build()
            .map_err(DriverError::Client)?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Endpoint under the base path. Each segment is percent-encoded on its own, and the base
    /// query string is kept.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn health(&self, timeout: Duration) -> Exchange<()> {
        let request = self.http.get(self.url(&["health"]));
        self.exchange(ActionKind::Health, request, timeout, StatusCode::OK, ignore_body)
            .await
    }

    pub async fn public_videos(&self, timeout: Duration) -> Exchange<()> {
        let request = self.http.get(self.url(&["api", "public", "videos"]));
        self.exchange(ActionKind::PublicVideos, request, timeout, StatusCode::OK, ignore_body)
            .await
    }

    pub async fn rankings(&self, timeout: Duration) -> Exchange<()> {
        let request = self.http.get(self.url(&["api", "public", "rankings"]));
        self.exchange(ActionKind::Rankings, request, timeout, StatusCode::OK, ignore_body)
            .await
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, credentials: &Credentials, timeout: Duration) -> Exchange<String> {
        let request = self.http.post(self.url(&["api", "auth", "login"])).json(&LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        });
        self.exchange(ActionKind::Login, request, timeout, StatusCode::OK, |body| {
            let response: TokenResponse = serde_json::from_slice(body)?;
            response
                .access_token
                .filter(|token| !token.is_empty())
                .ok_or(DriverError::MissingField("access_token"))
        })
        .await
    }

    pub async fn my_videos(&self, token: &str, timeout: Duration) -> Exchange<()> {
        let request = self.http.get(self.url(&["api", "videos"])).bearer_auth(token);
        self.exchange(ActionKind::MyVideos, request, timeout, StatusCode::OK, ignore_body)
            .await
    }

    /// Post a multipart upload and return the id the service assigned to it.
    pub async fn upload(
        &self,
        token: &str,
        body: MultipartBody,
        timeout: Duration,
    ) -> Exchange<String> {
        let request = self
            .http
            .post(self.url(&["api", "videos", "upload"]))
            .bearer_auth(token)
            .header(CONTENT_TYPE, body.content_type())
            .body(body.into_bytes());
        self.exchange(ActionKind::Upload, request, timeout, StatusCode::CREATED, |body| {
            let created: CreatedVideo = serde_json::from_slice(body)?;
            match created.video_id {
                Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(id),
                Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
                _ => Err(DriverError::MissingField("video_id")),
            }
        })
        .await
    }

    /// Fetch one video and return its processing status.
    pub async fn video(&self, token: &str, video_id: &str, timeout: Duration) -> Exchange<String> {
        let request = self
            .http
            .get(self.url(&["api", "videos", video_id]))
            .bearer_auth(token);
        self.exchange(ActionKind::ReadBack, request, timeout, StatusCode::OK, |body| {
            let view: VideoView = serde_json::from_slice(body)?;
            view.status.ok_or(DriverError::MissingField("status"))
        })
        .await
    }

    /// Send `request` and time it through the end of the response body.
    async fn exchange<T>(
        &self,
        action: ActionKind,
        request: RequestBuilder,
        timeout: Duration,
        expected: StatusCode,
        decode: impl FnOnce(&[u8]) -> Result<T, DriverError>,
    ) -> Exchange<T> {
        let start = Instant::now();
        let (status, result) = match request.timeout(timeout).send().await {
            Ok(response) => {
                let code = response.status();
                match response.bytes().await {
                    Ok(body) if code == expected => {
                        (ResponseStatus::Http(code.as_u16()), decode(&body[..]))
                    }
                    Ok(_) => (
                        ResponseStatus::Http(code.as_u16()),
                        Err(DriverError::UnexpectedStatus {
                            expected: expected.as_u16(),
                            actual: code.as_u16(),
                        }),
                    ),
                    Err(err) => (ResponseStatus::Transport(err.to_string()), Err(err.into())),
                }
            }
            Err(err) => (ResponseStatus::Transport(err.to_string()), Err(err.into())),
        };

        let outcome = RequestOutcome::new(action, status, start.elapsed(), result.is_ok());
        Exchange { outcome, result }
    }
}

fn ignore_body(_: &[u8]) -> Result<(), DriverError> {
    Ok(())
}
