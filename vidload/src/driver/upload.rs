use super::{settle, sign_in, TargetClient, WorkloadError};
use crate::metrics::{Counter, Metrics, Rate, Trend};
use crate::multipart::{test_video, FilePart, MultipartBody};
use crate::workload::{VirtualUser, Workload};
use rand::Rng;
use time::OffsetDateTime;
use vidload_core::{
    CredentialPool, FAILURE_BACKOFF, READ_BACK_DELAY, READ_BACK_TIMEOUT, UPLOAD_LOGIN_TIMEOUT,
    UPLOAD_TIMEOUT,
};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const UPLOAD_SUCCESS: &str = "upload_success";
pub const UPLOAD_TIME_MS: &str = "upload_time_ms";
pub const VIDEOS_UPLOADED: &str = "videos_uploaded";
pub const VIDEOS_PENDING: &str = "videos_pending";

/// Login, upload one synthetic video, then check that it entered the processing queue.
///
/// A failed login or upload backs off for a few seconds and ends the iteration. The read-back
/// only feeds `videos_pending`; its failure never fails the iteration.
pub struct UploadCapacity {
    client: TargetClient,
    users: CredentialPool,
    payload: &'static [u8],
    success: Rate,
    upload_time: Trend,
    uploaded: Counter,
    pending: Counter,
}

impl UploadCapacity {
    pub fn new(
        client: TargetClient,
        users: CredentialPool,
        metrics: &Metrics,
    ) -> Result<Self, WorkloadError> {
        Ok(Self {
            client,
            users,
            payload: test_video(),
            success: metrics.rate(UPLOAD_SUCCESS)?,
            upload_time: metrics.trend(UPLOAD_TIME_MS)?,
            uploaded: metrics.counter(VIDEOS_UPLOADED)?,
            pending: metrics.counter(VIDEOS_PENDING)?,
        })
    }

    pub fn with_payload(mut self, payload: &'static [u8]) -> Self {
        self.payload = payload;
        self
    }

    async fn upload(&self, user: &mut VirtualUser, token: &str) -> Option<String> {
        let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let suffix: u32 = user.rng().gen_range(0..10_000);
        let file_name = format!("test-video-{stamp}-{suffix}.mp4");
        let title = format!("Load Test Video {stamp}");

        let body = MultipartBody::with_random_boundary(
            user.rng(),
            &title,
            FilePart {
                field: "file",
                file_name: &file_name,
                content_type: "video/mp4",
                content: self.payload,
            },
        );

        let exchange = self.client.upload(token, body, UPLOAD_TIMEOUT).await;
        let latency = exchange.outcome.latency();
        self.success.add(exchange.outcome.success());
        self.upload_time.add_duration(latency);

        let video_id = settle(user, exchange)?;
        self.uploaded.increment(1);
        info!(
            "{} user {}: uploaded video {video_id} in {}ms",
            user.scenario(),
            user.id(),
            latency.as_millis()
        );
        Some(video_id)
    }

    async fn read_back(&self, user: &VirtualUser, token: &str, video_id: &str) {
        let exchange = self.client.video(token, video_id, READ_BACK_TIMEOUT).await;
        let result = exchange.result;
        user.record(exchange.outcome);

        match result {
            Ok(status) if matches!(status.as_str(), "pending" | "processing") => {
                self.pending.increment(1);
                info!("Video {video_id} queued: {status}");
            }
            Ok(status) => debug!("Video {video_id} is {status}"),
            Err(err) => debug!("Read-back of video {video_id} failed: {err}"),
        }
    }
}

impl Workload for UploadCapacity {
    async fn iteration(&self, user: &mut VirtualUser) {
        let login = sign_in(&self.client, &self.users, user, UPLOAD_LOGIN_TIMEOUT).await;
        let Some(token) = settle(user, login) else {
            user.pause(FAILURE_BACKOFF).await;
            return;
        };

        let Some(video_id) = self.upload(user, &token).await else {
            user.pause(FAILURE_BACKOFF).await;
            return;
        };

        if user.pause(READ_BACK_DELAY).await {
            self.read_back(user, &token, &video_id).await;
        }

        user.think().await;
    }
}
