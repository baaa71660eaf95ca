//! Minimal SNTP (RFC 4330) client packet handling

use core::fmt;

pub const NTP_PORT: u16 = 123;
pub const NTP_PACKET_SIZE: usize = 48;
/// Seconds between 1900-01-01 and 1970-01-01
pub const NTP_TO_UNIX_OFFSET: u64 = 2_208_988_800;

const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const VERSION: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SntpError {
    /// Reply shorter than an NTP header
    ShortPacket,
    /// Reply is not from a server
    BadMode(u8),
    /// Kiss-o'-death or zero transmit time
    Unsynchronized,
    /// Server name did not resolve
    Dns,
    /// Socket bind or send failed
    Network,
    /// No reply within the timeout
    Timeout,
}

impl fmt::Display for SntpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SntpError::ShortPacket => write!(f, "short sntp packet"),
            SntpError::BadMode(m) => write!(f, "unexpected sntp mode {}", m),
            SntpError::Unsynchronized => write!(f, "server unsynchronized"),
            SntpError::Dns => write!(f, "ntp server lookup failed"),
            SntpError::Network => write!(f, "ntp socket error"),
            SntpError::Timeout => write!(f, "ntp reply timed out"),
        }
    }
}

/// Client request: LI=0, VN=4, Mode=3, everything else zero
pub fn request_packet() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    packet[0] = (VERSION << 3) | MODE_CLIENT;
    packet
}

/// Extract unix seconds from the server's transmit timestamp
pub fn parse_reply(reply: &[u8]) -> Result<u64, SntpError> {
    if reply.len() < NTP_PACKET_SIZE {
        return Err(SntpError::ShortPacket);
    }

    let mode = reply[0] & 0x07;
    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(SntpError::BadMode(mode));
    }

    // Stratum 0 is a kiss-o'-death message
    if reply[1] == 0 {
        return Err(SntpError::Unsynchronized);
    }

    let seconds = u32::from_be_bytes([reply[40], reply[41], reply[42], reply[43]]) as u64;
    seconds
        .checked_sub(NTP_TO_UNIX_OFFSET)
        .ok_or(SntpError::Unsynchronized)
}
