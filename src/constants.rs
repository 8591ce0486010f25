//! Constants used throughout the application

/// Processing resolution every frame is normalized to before analysis
pub const PROCESSING_WIDTH: u32 = 640;
pub const PROCESSING_HEIGHT: u32 = 480;

/// Default capture resolution requested from the camera
pub const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 720;

/// Default frames per second requested from the camera
pub const DEFAULT_FPS: u32 = 30;

/// Frame rates the capture surface accepts
pub const SUPPORTED_FPS: [u32; 3] = [15, 30, 60];

/// Resolutions offered to the operator
pub const RESOLUTION_PRESETS: [(u32, u32); 4] = [(1280, 720), (1920, 1080), (800, 600), (640, 480)];

/// Default linear pixel adjustment: `out = in * contrast + brightness`
pub const DEFAULT_BRIGHTNESS: f64 = 10.0;
pub const DEFAULT_CONTRAST: f64 = 1.2;

/// Classification thresholds in degrees
pub const SPINE_CURVED_BELOW_DEG: f64 = 70.0;
pub const SPINE_STRAIGHT_ABOVE_DEG: f64 = 110.0;
pub const NECK_TILTED_BELOW_DEG: f64 = 60.0;

/// Consecutive bad-posture verdicts needed before the alert fires
pub const DEFAULT_ALERT_THRESHOLD: u32 = 10;

/// Frames skipped between two analyzed frames
pub const DEFAULT_SKIP_FRAMES: u32 = 2;

/// Landmark cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 5;

/// Consecutive no-body analyses after which an active alert is cleared
pub const DEFAULT_ABSENCE_RESET_FRAMES: u32 = 30;

/// Minimum delay between two scheduled frames
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 10;

/// Latency budget for one capture read or one estimator call
pub const DEFAULT_STALL_TIMEOUT_MS: u64 = 2_000;

/// Lower bound of the deadline for opening and configuring the capture device
pub const DEVICE_CONTROL_TIMEOUT_MS: u64 = 5_000;

/// Audible alert repeat period
pub const DEFAULT_SOUND_PERIOD_MS: u64 = 2_000;
pub const MIN_SOUND_PERIOD_MS: u64 = 100;

/// Days of history returned when no range is given
pub const DEFAULT_HISTORY_DAYS: i64 = 7;

/// Age after which recorded events are discarded
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Upper bound on events held in memory
pub const DEFAULT_MAX_STORED_EVENTS: usize = 500_000;

/// Directory exports are written to
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// Camera indices probed when enumerating devices
pub const MAX_PROBED_CAMERAS: i32 = 10;
