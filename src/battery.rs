//! Battery gauge and status bar icon
//!
//! The cell sits behind a 1:2 divider on an ADC pin; readings are converted
//! to a percentage over the usable LiPo range. Above that range the board is
//! on USB power and we report charging.

use embedded_graphics_core::pixelcolor::BinaryColor;

use crate::framebuffer::Framebuffer;

/// Full-scale ADC count (12-bit)
const ADC_MAX: f32 = 4095.0;
/// ADC reference voltage
const ADC_REF_V: f32 = 3.3;
/// Divider between the cell and the ADC pin
const DIVIDER: f32 = 2.0;

/// Fully charged cell
pub const BATTERY_MAX_V: f32 = 4.2;
/// Empty cell
pub const BATTERY_MIN_V: f32 = 3.0;
/// Above this we are on external power
const CHARGING_V: f32 = BATTERY_MAX_V + 0.1;

/// Battery icon dimensions, tip included
pub const BATTERY_WIDTH: u32 = 20;
pub const BATTERY_HEIGHT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub volts: f32,
    /// 0-100
    pub percent: u8,
    pub charging: bool,
}

impl BatteryReading {
    /// Convert a raw 12-bit ADC sample
    pub fn from_raw(raw: u16) -> Self {
        Self::from_volts(raw as f32 / ADC_MAX * ADC_REF_V * DIVIDER)
    }

    pub fn from_volts(volts: f32) -> Self {
        let fraction = (volts - BATTERY_MIN_V) / (BATTERY_MAX_V - BATTERY_MIN_V);
        let percent = (fraction * 100.0).clamp(0.0, 100.0) as u8;
        Self {
            volts,
            percent,
            charging: volts > CHARGING_V,
        }
    }

    /// Placeholder for hosts without a gauge
    pub const fn unknown() -> Self {
        Self {
            volts: 0.0,
            percent: 0,
            charging: false,
        }
    }
}

/// Draw battery icon directly into framebuffer
///
/// - `x`, `y`: top-left corner of the icon
/// - `percentage`: Battery level 0-100
/// - `charging`: Draws a full cell with a notch instead of the level
pub fn draw_battery(fb: &mut Framebuffer, x: u32, y: u32, percentage: u8, charging: bool) {
    // Horizontal battery: tip on right, fill goes left to right
    let body_width: u32 = BATTERY_WIDTH - 2;
    let body_height: u32 = BATTERY_HEIGHT;

    // Outline with white interior
    for dx in 0..body_width {
        for dy in 0..body_height {
            let is_border = dy == 0 || dy == body_height - 1 || dx == 0 || dx == body_width - 1;
            let color = if is_border { BinaryColor::On } else { BinaryColor::Off };
            fb.set_pixel(x + dx, y + dy, color);
        }
    }

    // Tip on right
    let tip_height: u32 = 4;
    let tip_y = y + (body_height - tip_height) / 2;
    fb.fill_rect(x + body_width, tip_y, 2, tip_height, BinaryColor::On);

    // Fill area
    let fill_max_width = body_width - 4;
    let fill_height = body_height - 4;
    let level = if charging { 100 } else { percentage.min(100) };
    let fill_width = fill_max_width * level as u32 / 100;
    fb.fill_rect(x + 2, y + 2, fill_width, fill_height, BinaryColor::On);

    if charging {
        // Notch through the middle marks external power
        let mid = x + body_width / 2;
        fb.fill_rect(mid - 1, y + 2, 2, fill_height, BinaryColor::Off);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_full_scale() {
        // 4095 → 6.6V, which can only be USB power
        let r = BatteryReading::from_raw(4095);
        assert!(r.charging);
        assert_eq!(r.percent, 100);
    }

    #[test]
    fn test_from_volts_range() {
        assert_eq!(BatteryReading::from_volts(3.0).percent, 0);
        assert_eq!(BatteryReading::from_volts(2.5).percent, 0);
        assert!((49..=50).contains(&BatteryReading::from_volts(3.6).percent));
        assert_eq!(BatteryReading::from_volts(4.2).percent, 100);
        assert!(!BatteryReading::from_volts(4.2).charging);
        assert!(BatteryReading::from_volts(4.4).charging);
    }

    #[test]
    fn test_from_raw_midrange() {
        // ~3.6V at the cell reads as ~1.8V on the pin
        let raw = (1.8 / 3.3 * 4095.0) as u16;
        let r = BatteryReading::from_raw(raw);
        assert!((48..=51).contains(&r.percent), "got {}", r.percent);
        assert!(!r.charging);
    }

    #[test]
    fn test_draw_battery_fill_level() {
        let mut fb = Framebuffer::new();
        draw_battery(&mut fb, 100, 8, 50, false);
        // Outline
        assert_eq!(fb.pixel(100, 8), BinaryColor::On);
        // Start of fill
        assert_eq!(fb.pixel(102, 10), BinaryColor::On);
        // Past 50% of the 14px fill area
        assert_eq!(fb.pixel(102 + 10, 10), BinaryColor::Off);
        // Tip
        assert_eq!(fb.pixel(100 + 18, 8 + 4), BinaryColor::On);
    }

    #[test]
    fn test_draw_battery_empty_and_charging() {
        let mut fb = Framebuffer::new();
        draw_battery(&mut fb, 0, 0, 0, false);
        assert_eq!(fb.pixel(2, 2), BinaryColor::Off);

        let mut fb = Framebuffer::new();
        draw_battery(&mut fb, 0, 0, 0, true);
        assert_eq!(fb.pixel(2, 2), BinaryColor::On);
        assert_eq!(fb.pixel(9, 4), BinaryColor::Off);
    }
}
