#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod base64;
pub mod battery;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod display;
pub mod epd;
pub mod framebuffer;
pub mod http;
pub mod messages;
pub mod mode;
#[cfg(feature = "hardware")]
pub mod net;
pub mod refresh;
pub mod remote;
pub mod screen;
pub mod sleep;
pub mod sntp;
pub mod state;
pub mod weather;
