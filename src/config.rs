//! Build-time configuration for the wake cycle
//!
//! Secrets (WiFi credentials, API key, endpoints) are injected by the binary
//! through `env!`; everything here is plain tunables and panel geometry.

/// Logical display width in pixels (landscape)
pub const WIDTH: u32 = 250;
/// Logical display height in pixels (landscape)
pub const HEIGHT: u32 = 122;

/// Size of a tightly packed 1bpp frame
pub const BITMAP_SIZE: usize = (WIDTH as usize * HEIGHT as usize).div_ceil(8);

/// Remote image buffer capacity: one frame plus decode margin
pub const IMAGE_CAPACITY: usize = BITMAP_SIZE + 100;

/// Scratch buffer for HTTP bodies (remote status and weather forecast share it)
pub const BODY_BUF_SIZE: usize = 24 * 1024;

/// NTP pool used for time sync
pub const NTP_SERVER: &str = "0.pt.pool.ntp.org";

/// Timeout applied to every HTTP exchange
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Shortest and longest suspension we are willing to request
pub const MIN_SLEEP_SECS: u32 = 10;
pub const MAX_SLEEP_SECS: u32 = 24 * 60 * 60;

/// Tunables for one wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    /// Sleep between cycles in local (weather/time) mode
    pub normal_sleep_secs: u32,
    /// Poll the remote-status endpoint every N cycles while in normal mode
    pub remote_check_period: u32,
    /// Minimum minutes between weather fetches
    pub weather_interval_min: u16,
    /// Force a full redraw at least every N cycles
    pub full_refresh_period: u16,
    /// Re-sync the clock over SNTP every N cycles
    pub time_sync_period: u32,
    /// Remote-mode sleep when the server does not send one
    pub default_remote_refresh_secs: u32,
    /// Fixed offset from UTC for the displayed clock
    pub utc_offset_secs: i32,
}

impl CycleConfig {
    pub const DEFAULT: Self = Self {
        normal_sleep_secs: 60,
        remote_check_period: 5,
        weather_interval_min: 30,
        full_refresh_period: 60,
        time_sync_period: 15,
        default_remote_refresh_secs: 300,
        utc_offset_secs: 0,
    };
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
