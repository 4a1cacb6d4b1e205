mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use mock_service::MockState;
    use rand::{rngs::SmallRng, SeedableRng};
    use std::time::Duration;
    use vidload::driver::UploadCapacity;
    use vidload::metrics::Metrics;
    use vidload::multipart::{test_video, FilePart, MultipartBody};
    use vidload::{VirtualUser, Workload};
    use vidload_core::{Aggregation, CredentialPool, Credentials, ThinkTime};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn video_part(file_name: &str) -> FilePart<'_> {
        FilePart {
            field: "file",
            file_name,
            content_type: "video/mp4",
            content: test_video(),
        }
    }

    #[tokio::test]
    async fn multipart_body_parses_back() {
        let state = MockState::new();
        let client = mock(state.clone()).await.unwrap();
        let token = client
            .login(&Credentials::new("test1@anb.com", "Test123!"), TIMEOUT)
            .await
            .result
            .unwrap();

        let mut rng = SmallRng::seed_from_u64(17);
        let title = "Load Test Video 1700000000000";
        let body = MultipartBody::with_random_boundary(
            &mut rng,
            title,
            video_part("test-video-1700000000000-42.mp4"),
        );

        let upload = client.upload(&token, body, TIMEOUT).await;
        assert!(upload.outcome.success());
        let video_id: u64 = upload.result.unwrap().parse().unwrap();

        let stored = state.video(video_id).unwrap();
        assert_eq!(stored.title, title);
        assert_eq!(stored.file_name, "test-video-1700000000000-42.mp4");
        assert_eq!(stored.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(stored.bytes.len(), test_video().len());
        assert!(stored.bytes == test_video());
    }

    #[tokio::test]
    async fn read_back_reports_queue_status() {
        let client = mock(MockState::new()).await.unwrap();
        let token = client
            .login(&Credentials::new("test2@anb.com", "Test123!"), TIMEOUT)
            .await
            .result
            .unwrap();

        let body = MultipartBody::new("----WebKitFormBoundary1", "clip", video_part("clip.mp4"));
        let video_id = client.upload(&token, body, TIMEOUT).await.result.unwrap();

        let first = client.video(&token, &video_id, TIMEOUT).await.result.unwrap();
        let second = client.video(&token, &video_id, TIMEOUT).await.result.unwrap();
        assert_eq!(first, "pending");
        assert_eq!(second, "processing");

        let missing = client.video(&token, "999999", TIMEOUT).await;
        assert!(!missing.outcome.success());
    }

    #[tokio::test]
    async fn upload_without_token_fails() {
        let client = mock(MockState::new()).await.unwrap();
        let body = MultipartBody::new("b0undary", "clip", video_part("clip.mp4"));
        let upload = client.upload("", body, TIMEOUT).await;
        assert!(!upload.outcome.success());
        assert!(upload.result.is_err());
    }

    #[tokio::test]
    #[ntest::timeout(15_000)]
    async fn upload_iteration_feeds_series() {
        let state = MockState::new();
        let client = mock(state.clone()).await.unwrap();
        let metrics = Metrics::new();
        let workload = UploadCapacity::new(client, CredentialPool::default(), &metrics).unwrap();

        let mut user = VirtualUser::detached("upload_only", &metrics)
            .unwrap()
            .with_think_time(ThinkTime::new(Duration::ZERO, Duration::ZERO));
        workload.iteration(&mut user).await;
        assert!(user.token().is_some());
        assert_eq!(state.video_count(), 1);

        let snapshot = metrics.finalize(Duration::from_secs(3));
        let get = |name: &str, agg| snapshot.get(name).unwrap().aggregate(agg).unwrap();
        assert_eq!(get("upload_success", Aggregation::Rate), 1.);
        assert_eq!(get("videos_uploaded", Aggregation::Count), 1.);
        assert_eq!(get("videos_pending", Aggregation::Count), 1.);
        assert_eq!(get("upload_time_ms", Aggregation::Count), 1.);
        // login, upload, read-back
        assert_eq!(get("http_reqs", Aggregation::Count), 3.);
        assert_eq!(get("http_req_failed", Aggregation::Rate), 0.);
    }

    #[tokio::test]
    #[ntest::timeout(15_000)]
    async fn failed_login_backs_off_without_uploading() {
        let state = MockState::new();
        let client = mock(state.clone()).await.unwrap();
        let metrics = Metrics::new();
        let users = CredentialPool::new(vec![Credentials::new("nobody@anb.com", "nope")]).unwrap();
        let workload = UploadCapacity::new(client, users, &metrics).unwrap();

        let mut user = VirtualUser::detached("upload_only", &metrics).unwrap();
        let start = std::time::Instant::now();
        workload.iteration(&mut user).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(state.video_count(), 0);

        let snapshot = metrics.finalize(Duration::from_secs(3));
        let values = snapshot.get("upload_success").unwrap();
        assert!(values.aggregate(Aggregation::Rate).is_err());
        assert_eq!(
            snapshot
                .get("http_req_failed")
                .unwrap()
                .aggregate(Aggregation::Rate),
            Ok(1.)
        );
    }
}
