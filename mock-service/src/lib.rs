//! In-process stand-in for the video service, used by the integration tests and for local
//! dry runs of a plan.
use axum::{
    debug_handler,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// A stored upload, as the service received it.
#[derive(Debug, Clone)]
pub struct StoredVideo {
    pub id: u64,
    pub owner: String,
    pub title: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    reads: u32,
}

impl StoredVideo {
    /// `pending` on the first read-back, `processing` afterwards.
    fn status(&self) -> &'static str {
        if self.reads <= 1 {
            "pending"
        } else {
            "processing"
        }
    }
}

#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

struct Inner {
    users: HashMap<String, String>,
    tokens: RwLock<HashMap<String, String>>,
    videos: RwLock<HashMap<u64, StoredVideo>>,
    next_id: AtomicU64,
    delay: Duration,
    limiter: Option<DefaultDirectRateLimiter>,
    requests: AtomicU64,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    /// Accounts `test1@anb.com` through `test5@anb.com`, password `Test123!`.
    pub fn new() -> Self {
        let users = (1..=5)
            .map(|n| (format!("test{n}@anb.com"), "Test123!".to_string()))
            .collect();
        Self::build(users, Duration::ZERO)
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.delay = delay,
            None => error!("Mock state is already shared; delay not applied."),
        }
        self
    }

    /// Reject requests beyond `tps` per second with `503`.
    pub fn with_rate_limit(mut self, tps: u32) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.limiter = NonZeroU32::new(tps).map(rate_limiter),
            None => error!("Mock state is already shared; rate limit not applied."),
        }
        self
    }

    pub fn with_user(mut self, email: &str, password: &str) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.users.insert(email.to_string(), password.to_string());
            }
            None => error!("Mock state is already shared; user {email} not added."),
        }
        self
    }

    fn build(users: HashMap<String, String>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                users,
                tokens: RwLock::new(HashMap::new()),
                videos: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                delay,
                limiter: None,
                requests: AtomicU64::new(0),
            }),
        }
    }

    pub fn video(&self, id: u64) -> Option<StoredVideo> {
        self.inner.videos.read().ok()?.get(&id).cloned()
    }

    pub fn video_count(&self) -> usize {
        self.inner.videos.read().map(|v| v.len()).unwrap_or_default()
    }

    /// Requests served since start.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    async fn gate(&self) -> Result<(), StatusCode> {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
        if !self.inner.delay.is_zero() {
            tokio::time::sleep(self.inner.delay).await;
        }
        match &self.inner.limiter {
            Some(limiter) if limiter.check().is_err() => {
                debug!("MOCK SERVER ___ LIMITED");
                Err(StatusCode::SERVICE_UNAVAILABLE)
            }
            _ => Ok(()),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<String, StatusCode> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        self.inner
            .tokens
            .read()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .get(token)
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/public/videos", get(public_videos))
        .route("/api/public/rankings", get(rankings))
        .route("/api/auth/login", post(login))
        .route("/api/videos", get(my_videos))
        .route("/api/videos/upload", post(upload))
        .route("/api/videos/:video_id", get(video))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, state: MockState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Serve `state` on an ephemeral localhost port in the background.
pub async fn spawn(state: MockState) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router(state)).await {
            error!("Mock service stopped: {err}");
        }
    });
    Ok(addr)
}

#[debug_handler]
async fn health(State(state): State<MockState>) -> Result<Json<Value>, StatusCode> {
    state.gate().await?;
    Ok(Json(json!({ "status": "ok" })))
}

#[debug_handler]
async fn public_videos(State(state): State<MockState>) -> Result<Json<Value>, StatusCode> {
    state.gate().await?;
    let videos = state
        .inner
        .videos
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let listed: Vec<Value> = videos
        .values()
        .map(|v| json!({ "video_id": v.id, "title": v.title }))
        .collect();
    Ok(Json(Value::Array(listed)))
}

#[debug_handler]
async fn rankings(State(state): State<MockState>) -> Result<Json<Value>, StatusCode> {
    state.gate().await?;
    Ok(Json(json!([
        { "position": 1, "username": "test1", "votes": 12 },
        { "position": 2, "username": "test2", "votes": 7 },
    ])))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[debug_handler]
async fn login(
    State(state): State<MockState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, StatusCode> {
    state.gate().await?;
    match state.inner.users.get(&request.email) {
        Some(password) if *password == request.password => {
            let token = uuid::Uuid::new_v4().to_string();
            state
                .inner
                .tokens
                .write()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .insert(token.clone(), request.email);
            Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[debug_handler]
async fn my_videos(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    state.gate().await?;
    let owner = state.authorize(&headers)?;
    let videos = state
        .inner
        .videos
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let listed: Vec<Value> = videos
        .values()
        .filter(|v| v.owner == owner)
        .map(|v| json!({ "video_id": v.id, "title": v.title, "status": v.status() }))
        .collect();
    Ok(Json(Value::Array(listed)))
}

#[debug_handler]
async fn upload(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    state.gate().await?;
    let owner = state.authorize(&headers)?;

    let mut title = None;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (Some(title), Some((file_name, content_type, bytes))) = (title, file) else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let id = state.inner.next_id.fetch_add(1, Ordering::Relaxed);
    debug!("Stored video {id} ({} bytes) for {owner}", bytes.len());
    state
        .inner
        .videos
        .write()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .insert(
            id,
            StoredVideo {
                id,
                owner,
                title,
                file_name,
                content_type,
                bytes,
                reads: 0,
            },
        );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "video_id": id, "message": "Video uploaded, processing queued" })),
    ))
}

#[debug_handler]
async fn video(
    State(state): State<MockState>,
    Path(video_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    state.gate().await?;
    let owner = state.authorize(&headers)?;

    let mut videos = state
        .inner
        .videos
        .write()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let video = videos
        .get_mut(&video_id)
        .filter(|v| v.owner == owner)
        .ok_or(StatusCode::NOT_FOUND)?;
    video.reads += 1;

    Ok(Json(json!({
        "video_id": video.id,
        "title": video.title,
        "status": video.status(),
    })))
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        println!("{transactions} TPS");
    }
}
