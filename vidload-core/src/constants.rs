use std::time::Duration;

/// Base URL used when neither `--base-url` nor `BASE_URL` is supplied.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// How often the scheduler re-evaluates the desired concurrency of every scenario.
pub const SCHEDULER_TICK: Duration = Duration::from_millis(100);

/// Think time used by light, read-mostly scenarios.
pub const DEFAULT_THINK_MIN: Duration = Duration::from_secs(1);
pub const DEFAULT_THINK_MAX: Duration = Duration::from_secs(3);

/// Think time used by upload-heavy scenarios.
pub const UPLOAD_THINK_MIN: Duration = Duration::from_secs(5);
pub const UPLOAD_THINK_MAX: Duration = Duration::from_secs(10);

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const UPLOAD_LOGIN_TIMEOUT: Duration = Duration::from_secs(20);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const READ_BACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between a successful upload and the status read-back.
pub const READ_BACK_DELAY: Duration = Duration::from_secs(2);

/// Pause taken instead of the normal think time after a failed login or upload.
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(3);

/// Size of the synthetic video uploaded by the upload scenario.
pub const TEST_VIDEO_SIZE: usize = 500 * 1024;

pub const BOUNDARY_PREFIX: &str = "----WebKitFormBoundary";

pub const DEFAULT_RESULTS_DIR: &str = "results";
