//! Remote-status endpoint payload
//!
//! JSON format from the status endpoint:
//! ```json
//! {"mode": "remote", "refresh_seconds": 600, "image": "<base64 1bpp bitmap>"}
//! ```
//! Any `mode` other than `"remote"` means normal operation.

use core::fmt;

use serde::Deserialize;

use crate::base64::Base64Error;

#[derive(Debug)]
pub enum RemoteStatusError {
    /// Body is not the JSON object we expect
    Json(serde_json_core::de::Error),
    /// Body is not UTF-8
    Utf8,
    /// Image payload is not valid base64
    Image(Base64Error),
}

impl fmt::Display for RemoteStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStatusError::Json(e) => write!(f, "status json: {}", e),
            RemoteStatusError::Utf8 => write!(f, "status body not utf-8"),
            RemoteStatusError::Image(e) => write!(f, "status image: {}", e),
        }
    }
}

impl From<serde_json_core::de::Error> for RemoteStatusError {
    fn from(e: serde_json_core::de::Error) -> Self {
        RemoteStatusError::Json(e)
    }
}

impl From<Base64Error> for RemoteStatusError {
    fn from(e: Base64Error) -> Self {
        RemoteStatusError::Image(e)
    }
}

#[derive(Deserialize)]
struct StatusPayload<'a> {
    #[serde(borrow)]
    mode: Option<&'a str>,
    refresh_seconds: Option<u32>,
    #[serde(borrow)]
    image: Option<&'a str>,
}

/// Parsed status verdict; the image stays encoded until it is bound-checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStatus<'a> {
    pub is_remote: bool,
    /// Positive refresh interval, if the server sent one
    pub refresh_seconds: Option<u32>,
    /// Base64 image, if present and non-empty
    pub image: Option<&'a str>,
}

/// Parse a status response body
pub fn parse_status(body: &[u8]) -> Result<RemoteStatus<'_>, RemoteStatusError> {
    core::str::from_utf8(body).map_err(|_| RemoteStatusError::Utf8)?;
    let (payload, _): (StatusPayload, usize) = serde_json_core::from_slice(body)?;

    Ok(RemoteStatus {
        is_remote: payload.mode == Some("remote"),
        refresh_seconds: payload.refresh_seconds.filter(|&s| s > 0),
        image: payload.image.filter(|s| !s.trim().is_empty()),
    })
}
