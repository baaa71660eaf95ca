//! State carried across deep sleep
//!
//! The binary keeps one `PersistentState` in RTC fast memory. Every field is
//! fixed size; strings and the remote image are bounded buffers so the record
//! never allocates.

use crate::base64::{self, Base64Error};
use crate::config::{CycleConfig, IMAGE_CAPACITY};
use crate::weather::WeatherSnapshot;

/// Magic number to validate RTC memory state
pub const STATE_MAGIC: u32 = 0x5EED_F00D;

/// Sentinel for "never" in minute/day fields
pub const NEVER: i16 = -1;

/// Fixed-capacity byte buffer with an explicit length
#[repr(C)]
pub struct ImageBuffer<const N: usize> {
    len: usize,
    bytes: [u8; N],
}

impl<const N: usize> ImageBuffer<N> {
    pub const fn new() -> Self {
        Self { len: 0, bytes: [0; N] }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len.min(N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Replace the contents with the decoded form of `encoded`
    ///
    /// The decoded size is checked against capacity before any byte is
    /// written; on error the previous image is left intact.
    pub fn load_base64(&mut self, encoded: &[u8]) -> Result<usize, Base64Error> {
        let needed = base64::decoded_len(encoded)?;
        if needed > N {
            return Err(Base64Error::TooLarge {
                needed,
                capacity: N,
            });
        }

        // Invalidate first so a torn write can never be read back as an image
        self.len = 0;
        let written = base64::decode_into(encoded, &mut self.bytes[..needed])?;
        self.len = written;
        Ok(written)
    }
}

impl<const N: usize> Default for ImageBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the next wake needs to know
#[repr(C)]
pub struct PersistentState {
    /// Magic number to validate state
    magic: u32,
    /// Wakes since first boot, wrapping
    pub cycle_count: u32,
    /// Minute of day of the last successful weather fetch, or `NEVER`
    pub last_weather_minute: i16,
    /// Cycles since the panel last got a full redraw
    pub cycles_since_full_refresh: u16,
    /// Alternates the morning message strip between greeting and suggestion
    pub morning_message_toggle: bool,
    pub weather: WeatherSnapshot,
    pub remote_mode: bool,
    pub remote_refresh_secs: u32,
    pub remote_image: ImageBuffer<IMAGE_CAPACITY>,
    /// Zero-based day of year of the last local frame, or `NEVER`
    pub last_rendered_day: i16,
    /// Minute of day of the last local frame, or `NEVER`
    pub last_rendered_minute: i16,
    /// The panel currently shows a remote image
    pub last_frame_remote: bool,
    /// Predicted unix time of the next wake, 0 when unknown
    pub expected_wake_unix: u64,
}

impl PersistentState {
    pub const fn new() -> Self {
        Self {
            magic: 0,
            cycle_count: 0,
            last_weather_minute: NEVER,
            cycles_since_full_refresh: 0,
            morning_message_toggle: false,
            weather: WeatherSnapshot::new(),
            remote_mode: false,
            remote_refresh_secs: CycleConfig::DEFAULT.default_remote_refresh_secs,
            remote_image: ImageBuffer::new(),
            last_rendered_day: NEVER,
            last_rendered_minute: NEVER,
            last_frame_remote: false,
            expected_wake_unix: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == STATE_MAGIC
    }

    /// Reset to first-boot values unless the record survived sleep intact
    ///
    /// Returns whether the previous state was kept.
    pub fn restore_or_reset(&mut self, config: &CycleConfig) -> bool {
        if self.is_valid() {
            self.clamp(config);
            return true;
        }

        self.cycle_count = 0;
        self.last_weather_minute = NEVER;
        self.cycles_since_full_refresh = 0;
        self.morning_message_toggle = false;
        self.weather = WeatherSnapshot::new();
        self.remote_mode = false;
        self.remote_refresh_secs = config.default_remote_refresh_secs;
        self.remote_image.clear();
        self.last_rendered_day = NEVER;
        self.last_rendered_minute = NEVER;
        self.last_frame_remote = false;
        self.expected_wake_unix = 0;
        self.magic = STATE_MAGIC;
        false
    }

    /// Pull any out-of-range field back inside its documented range
    fn clamp(&mut self, config: &CycleConfig) {
        let period = config.full_refresh_period.max(1);
        if self.cycles_since_full_refresh >= period {
            self.cycles_since_full_refresh = period - 1;
        }
        if !(NEVER..1440).contains(&self.last_weather_minute) {
            self.last_weather_minute = NEVER;
        }
        if self.remote_refresh_secs == 0 {
            self.remote_refresh_secs = config.default_remote_refresh_secs;
        }
    }

    pub fn weather_never_fetched(&self) -> bool {
        self.last_weather_minute < 0
    }
}

impl Default for PersistentState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_reset() {
        let config = CycleConfig::DEFAULT;
        let mut state = PersistentState::new();
        assert!(!state.is_valid());
        assert!(!state.restore_or_reset(&config));
        assert!(state.is_valid());
        assert!(state.weather_never_fetched());
        assert_eq!(state.cycles_since_full_refresh, 0);
        assert_eq!(state.remote_refresh_secs, 300);
        assert!(!state.weather.valid);
    }

    #[test]
    fn test_valid_state_is_kept() {
        let config = CycleConfig::DEFAULT;
        let mut state = PersistentState::new();
        state.restore_or_reset(&config);
        state.cycle_count = 41;
        state.remote_mode = true;
        assert!(state.restore_or_reset(&config));
        assert_eq!(state.cycle_count, 41);
        assert!(state.remote_mode);
    }

    #[test]
    fn test_corrupt_counter_clamped() {
        let config = CycleConfig::DEFAULT;
        let mut state = PersistentState::new();
        state.restore_or_reset(&config);
        state.cycles_since_full_refresh = 500;
        state.last_weather_minute = 2000;
        state.restore_or_reset(&config);
        assert_eq!(state.cycles_since_full_refresh, config.full_refresh_period - 1);
        assert_eq!(state.last_weather_minute, NEVER);
    }

    #[test]
    fn test_image_buffer_load() {
        let mut image: ImageBuffer<4> = ImageBuffer::new();
        assert_eq!(image.load_base64(b"TWFu"), Ok(3));
        assert_eq!(image.as_slice(), b"Man");
        image.clear();
        assert!(image.is_empty());
    }

    #[test]
    fn test_image_buffer_rejects_oversize_without_writing() {
        let mut image: ImageBuffer<4> = ImageBuffer::new();
        image.load_base64(b"TWFu").unwrap();
        assert_eq!(
            image.load_base64(b"TWFueSBtb3Jl"),
            Err(Base64Error::TooLarge {
                needed: 9,
                capacity: 4
            })
        );
        // Previous image still intact
        assert_eq!(image.as_slice(), b"Man");
    }

    #[test]
    fn test_image_buffer_rejects_malformed_without_writing() {
        let mut image: ImageBuffer<8> = ImageBuffer::new();
        image.load_base64(b"TWFu").unwrap();
        assert!(image.load_base64(b"!!!!").is_err());
        assert_eq!(image.as_slice(), b"Man");
    }
}
