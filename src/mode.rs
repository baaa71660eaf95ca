//! Remote vs normal mode decision
//!
//! A missing or garbled answer never flips the mode: only a successful status
//! response can move the device in or out of remote mode, so a flaky network
//! cannot make it flap between layouts.

use log::{debug, info, warn};

use crate::base64::Base64Error;
use crate::cycle::CycleFault;
use crate::remote;
use crate::state::ImageBuffer;

/// Result of this cycle's status check, if one was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCheck<'a> {
    /// Not due this cycle, or no connectivity
    Skipped,
    /// Attempted, but no usable response came back
    Failed,
    /// Response body as received
    Received(&'a [u8]),
}

/// What happened to the persisted remote image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageUpdate {
    /// Left as it was
    Unchanged,
    /// Replaced with a freshly decoded image of this many bytes
    Decoded(usize),
    /// Rejected for size; the buffer was not touched
    Rejected,
    /// Dropped because the device left remote mode
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDecision {
    pub next_mode: bool,
    pub next_refresh_secs: u32,
    pub image: ImageUpdate,
    pub fault: Option<CycleFault>,
}

impl ModeDecision {
    fn retain(mode: bool, refresh_secs: u32, fault: Option<CycleFault>) -> Self {
        Self {
            next_mode: mode,
            next_refresh_secs: refresh_secs,
            image: ImageUpdate::Unchanged,
            fault,
        }
    }

    /// Whether a remote frame can be drawn this cycle
    pub fn has_remote_frame<const N: usize>(&self, image: &ImageBuffer<N>) -> bool {
        self.next_mode && self.image != ImageUpdate::Rejected && !image.is_empty()
    }
}

/// A status check is due while remote, on manual wake, or every `check_period` cycles
pub fn wants_check(current_mode: bool, manual_wake: bool, cycle_count: u32, check_period: u32) -> bool {
    current_mode || manual_wake || cycle_count % check_period.max(1) == 0
}

/// Fold this cycle's status check into the persisted mode
///
/// The image bound check runs before the persisted buffer is written.
pub fn decide<const N: usize>(
    current_mode: bool,
    current_refresh_secs: u32,
    default_refresh_secs: u32,
    check: StatusCheck<'_>,
    image: &mut ImageBuffer<N>,
) -> ModeDecision {
    let body = match check {
        StatusCheck::Skipped => {
            debug!("Remote status check skipped, keeping mode={}", current_mode);
            return ModeDecision::retain(current_mode, current_refresh_secs, None);
        }
        StatusCheck::Failed => {
            warn!("Remote status check failed, keeping mode={}", current_mode);
            return ModeDecision::retain(
                current_mode,
                current_refresh_secs,
                Some(CycleFault::RemoteStatusCheckFailed),
            );
        }
        StatusCheck::Received(body) => body,
    };

    let status = match remote::parse_status(body) {
        Ok(status) => status,
        Err(e) => {
            warn!("Remote status malformed ({}), keeping mode={}", e, current_mode);
            return ModeDecision::retain(
                current_mode,
                current_refresh_secs,
                Some(CycleFault::RemoteStatusCheckFailed),
            );
        }
    };

    if !status.is_remote {
        if current_mode {
            info!("Server switched device back to normal mode");
        }
        image.clear();
        return ModeDecision {
            next_mode: false,
            next_refresh_secs: current_refresh_secs,
            image: ImageUpdate::Cleared,
            fault: None,
        };
    }

    let refresh = status.refresh_seconds.unwrap_or(default_refresh_secs);

    let Some(encoded) = status.image else {
        info!("Remote mode, no new image, refresh {}s", refresh);
        return ModeDecision {
            next_mode: true,
            next_refresh_secs: refresh,
            image: ImageUpdate::Unchanged,
            fault: None,
        };
    };

    match image.load_base64(encoded.as_bytes()) {
        Ok(len) => {
            info!("Remote image decoded: {} bytes, refresh {}s", len, refresh);
            ModeDecision {
                next_mode: true,
                next_refresh_secs: refresh,
                image: ImageUpdate::Decoded(len),
                fault: None,
            }
        }
        Err(Base64Error::TooLarge { needed, capacity }) => {
            warn!("Remote image too large: {} bytes (max {})", needed, capacity);
            ModeDecision {
                next_mode: true,
                next_refresh_secs: refresh,
                image: ImageUpdate::Rejected,
                fault: Some(CycleFault::ImageTooLarge),
            }
        }
        Err(e) => {
            warn!("Remote image undecodable ({}), keeping mode={}", e, current_mode);
            ModeDecision::retain(
                current_mode,
                current_refresh_secs,
                Some(CycleFault::RemoteStatusCheckFailed),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: u32 = 300;

    #[test]
    fn test_wants_check() {
        assert!(wants_check(true, false, 7, 5));
        assert!(wants_check(false, true, 7, 5));
        assert!(wants_check(false, false, 10, 5));
        assert!(wants_check(false, false, 0, 5));
        assert!(!wants_check(false, false, 7, 5));
        // A zero period degrades to checking every cycle
        assert!(wants_check(false, false, 7, 0));
    }

    #[test]
    fn test_skipped_or_failed_retains_mode() {
        for check in [StatusCheck::Skipped, StatusCheck::Failed, StatusCheck::Received(b"{oops")] {
            for mode in [true, false] {
                let mut image: ImageBuffer<8> = ImageBuffer::new();
                image.load_base64(b"TWFu").unwrap();
                let decision = decide(mode, 900, DEFAULT, check, &mut image);
                assert_eq!(decision.next_mode, mode);
                assert_eq!(decision.next_refresh_secs, 900);
                assert_eq!(decision.image, ImageUpdate::Unchanged);
                assert_eq!(image.as_slice(), b"Man");
            }
        }
    }

    #[test]
    fn test_failure_reports_fault() {
        let mut image: ImageBuffer<8> = ImageBuffer::new();
        let decision = decide(true, 900, DEFAULT, StatusCheck::Failed, &mut image);
        assert_eq!(decision.fault, Some(CycleFault::RemoteStatusCheckFailed));
        let decision = decide(true, 900, DEFAULT, StatusCheck::Skipped, &mut image);
        assert_eq!(decision.fault, None);
    }

    #[test]
    fn test_remote_with_image() {
        let mut image: ImageBuffer<8> = ImageBuffer::new();
        let body = br#"{"mode":"remote","refresh_seconds":120,"image":"TWFu"}"#;
        let decision = decide(false, DEFAULT, DEFAULT, StatusCheck::Received(body), &mut image);
        assert!(decision.next_mode);
        assert_eq!(decision.next_refresh_secs, 120);
        assert_eq!(decision.image, ImageUpdate::Decoded(3));
        assert!(decision.has_remote_frame(&image));
    }

    #[test]
    fn test_remote_default_refresh() {
        let mut image: ImageBuffer<8> = ImageBuffer::new();
        let decision = decide(false, 900, DEFAULT, StatusCheck::Received(br#"{"mode":"remote"}"#), &mut image);
        assert!(decision.next_mode);
        assert_eq!(decision.next_refresh_secs, DEFAULT);
        assert_eq!(decision.image, ImageUpdate::Unchanged);
        assert!(!decision.has_remote_frame(&image));
    }

    #[test]
    fn test_oversized_image_honours_verdict() {
        let mut image: ImageBuffer<2> = ImageBuffer::new();
        let body = br#"{"mode":"remote","image":"TWFueSBtb3Jl"}"#;
        let decision = decide(false, DEFAULT, DEFAULT, StatusCheck::Received(body), &mut image);
        assert!(decision.next_mode);
        assert_eq!(decision.image, ImageUpdate::Rejected);
        assert_eq!(decision.fault, Some(CycleFault::ImageTooLarge));
        assert!(image.is_empty());
        assert!(!decision.has_remote_frame(&image));
    }

    #[test]
    fn test_bad_base64_is_a_failed_check() {
        let mut image: ImageBuffer<8> = ImageBuffer::new();
        let body = br#"{"mode":"remote","image":"T*Fu"}"#;
        let decision = decide(false, 60, DEFAULT, StatusCheck::Received(body), &mut image);
        assert!(!decision.next_mode);
        assert_eq!(decision.next_refresh_secs, 60);
        assert_eq!(decision.fault, Some(CycleFault::RemoteStatusCheckFailed));
    }

    #[test]
    fn test_normal_verdict_clears_image() {
        let mut image: ImageBuffer<8> = ImageBuffer::new();
        image.load_base64(b"TWFu").unwrap();
        let decision = decide(true, 120, DEFAULT, StatusCheck::Received(br#"{"mode":"normal"}"#), &mut image);
        assert!(!decision.next_mode);
        assert_eq!(decision.image, ImageUpdate::Cleared);
        assert!(image.is_empty());
    }
}
