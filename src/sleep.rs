//! Next-sleep scheduling and the wake-source seam
//!
//! Deep sleep powers down everything but the RTC domain, so "suspend" is a
//! one-way call: the next cycle starts from reset.

use core::fmt;

use crate::config::{CycleConfig, MAX_SLEEP_SECS, MIN_SLEEP_SECS};

/// Why this cycle started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// Sleep timer elapsed
    Timer,
    /// Button press
    Button,
    /// Power-on, reset or anything else
    Reset,
}

impl WakeCause {
    /// A button wake forces fresh checks this cycle
    pub fn is_manual(self) -> bool {
        self == WakeCause::Button
    }
}

impl fmt::Display for WakeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeCause::Timer => write!(f, "timer"),
            WakeCause::Button => write!(f, "button"),
            WakeCause::Reset => write!(f, "first boot or reset"),
        }
    }
}

/// How long to stay suspended; the button always stays armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    pub duration_secs: u32,
}

impl SleepRequest {
    /// Remote mode sleeps for the server's interval; normal mode uses the fixed one
    pub fn for_mode(remote_mode: bool, remote_refresh_secs: u32, config: &CycleConfig) -> Self {
        let secs = if remote_mode {
            remote_refresh_secs
        } else {
            config.normal_sleep_secs
        };
        Self {
            duration_secs: secs.clamp(MIN_SLEEP_SECS, MAX_SLEEP_SECS),
        }
    }

    pub fn duration_us(&self) -> u64 {
        self.duration_secs as u64 * 1_000_000
    }
}

/// Hardware sleep primitive
pub trait WakeSource {
    fn wake_cause(&self) -> WakeCause;

    /// Arm the timer and button, then power down. Never returns.
    fn suspend(&mut self, request: SleepRequest) -> !;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_mode_uses_fixed_interval() {
        let config = CycleConfig::DEFAULT;
        let req = SleepRequest::for_mode(false, 900, &config);
        assert_eq!(req.duration_secs, 60);
        assert_eq!(req.duration_us(), 60_000_000);
    }

    #[test]
    fn test_remote_mode_uses_server_interval() {
        let config = CycleConfig::DEFAULT;
        assert_eq!(SleepRequest::for_mode(true, 900, &config).duration_secs, 900);
    }

    #[test]
    fn test_interval_is_clamped() {
        let config = CycleConfig::DEFAULT;
        assert_eq!(SleepRequest::for_mode(true, 1, &config).duration_secs, MIN_SLEEP_SECS);
        assert_eq!(
            SleepRequest::for_mode(true, u32::MAX, &config).duration_secs,
            MAX_SLEEP_SECS
        );
    }

    #[test]
    fn test_only_button_is_manual() {
        assert!(WakeCause::Button.is_manual());
        assert!(!WakeCause::Timer.is_manual());
        assert!(!WakeCause::Reset.is_manual());
    }
}
