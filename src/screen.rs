//! Local weather/time layout
//!
//! ```text
//!  y 0..57   icon | temperature | min/max     [wifi][batt]
//!                 | condition   | rain chance
//!  y 58..73  ------------ rotating message ------------
//!  y 77      ---------------- separator ----------------
//!  y 82..121              HH:MM
//!                     Sat, 17 Oct 2026
//! ```
//!
//! The message and clock blocks are drawn relative to the rectangle they are
//! given, so a partial redraw paints exactly what a full one would.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_1::{FONT_6X10, FONT_7X13_BOLD, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

use crate::battery::{self, BATTERY_WIDTH};
use crate::clock::WallClock;
use crate::config::WIDTH;
use crate::framebuffer::Framebuffer;
use crate::refresh::{CLOCK_REGION, MESSAGE_REGION};
use crate::weather::WeatherSnapshot;

/// Weather icon box at the top left
pub const ICON_SIZE: u32 = 44;
const ICON_ORIGIN: Point = Point::new(2, 2);

const SEPARATOR_Y: i32 = 77;
const STATUS_Y: u32 = 8;
const WIFI_WIDTH: u32 = 12;

/// Messages longer than this use the narrow font
const LONG_MESSAGE: usize = 25;
/// Condition text is cut to fit beside the icon
const CONDITION_CHARS: usize = 10;

/// Everything the local layout shows
pub struct LocalScene<'a> {
    pub weather: &'a WeatherSnapshot,
    pub clock: Option<WallClock>,
    pub message: &'a str,
    pub status: StatusBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBar {
    pub battery_percent: u8,
    pub charging: bool,
    pub wifi_connected: bool,
}

/// Coarse sky condition, picked from the provider's condition text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sky {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Rain,
    Snow,
    Storm,
}

impl Sky {
    pub fn from_condition(condition: &str) -> Self {
        let has = |needle: &str| contains_ignore_case(condition, needle);
        if has("thunder") {
            Sky::Storm
        } else if has("snow") || has("sleet") || has("blizzard") || has("ice") {
            Sky::Snow
        } else if has("rain") || has("drizzle") || has("shower") {
            Sky::Rain
        } else if has("fog") || has("mist") {
            Sky::Fog
        } else if has("partly") {
            Sky::PartlyCloudy
        } else if has("cloud") || has("overcast") {
            Sky::Cloudy
        } else {
            Sky::Clear
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    n.is_empty() || h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

/// Draw the complete local layout into a cleared framebuffer
pub fn draw_local(fb: &mut Framebuffer, scene: &LocalScene<'_>) {
    fb.clear();
    draw_status_bar(fb, &scene.status);
    draw_weather(fb, scene.weather);
    draw_message(fb, MESSAGE_REGION, scene.message);

    let _ = Line::new(Point::new(0, SEPARATOR_Y), Point::new(WIDTH as i32 - 1, SEPARATOR_Y))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(fb);

    draw_clock(fb, CLOCK_REGION, scene.clock.as_ref());
}

/// WiFi and battery icons in the top right corner
fn draw_status_bar(fb: &mut Framebuffer, status: &StatusBar) {
    let mut x = WIDTH - 2 - BATTERY_WIDTH;
    battery::draw_battery(fb, x, STATUS_Y, status.battery_percent, status.charging);

    x -= 4 + WIFI_WIDTH;
    // Signal bars, struck through when offline
    for bar in 0..3u32 {
        let height = 4 + bar * 3;
        let bar_x = x + bar * 4;
        fb.fill_rect(bar_x, STATUS_Y + 10 - height, 3, height, BinaryColor::On);
    }
    if !status.wifi_connected {
        let _ = Line::new(
            Point::new(x as i32, STATUS_Y as i32),
            Point::new((x + WIFI_WIDTH - 1) as i32, STATUS_Y as i32 + 9),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::Off, 2))
        .draw(fb);
    }
}

fn draw_weather(fb: &mut Framebuffer, weather: &WeatherSnapshot) {
    let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

    if !weather.valid {
        let _ = Rectangle::new(ICON_ORIGIN, Size::new(ICON_SIZE, ICON_SIZE))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(fb);
        let _ = Text::new("Weather: --", Point::new(48, 30), small).draw(fb);
        return;
    }

    draw_sky(fb, Sky::from_condition(&weather.condition), weather.is_day);

    let big = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let _ = Text::new(&weather.temperature_text(), Point::new(48, 30), big).draw(fb);

    let condition = match weather.condition.char_indices().nth(CONDITION_CHARS) {
        Some((cut, _)) => &weather.condition[..cut],
        None => &weather.condition[..],
    };
    let _ = Text::new(condition, Point::new(48, 48), small).draw(fb);

    let _ = Text::new(&weather.min_max_text(), Point::new(150, 30), small).draw(fb);
    let _ = Text::new(&weather.rain_text(), Point::new(150, 48), small).draw(fb);
}

/// Weather glyph drawn from primitives inside the icon box
fn draw_sky(fb: &mut Framebuffer, sky: Sky, is_day: bool) {
    let ink = PrimitiveStyle::with_fill(BinaryColor::On);
    let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 2);
    let o = ICON_ORIGIN;

    let cloud = |fb: &mut Framebuffer, top_left: Point| {
        let _ = Circle::new(top_left + Point::new(0, 8), 16).into_styled(ink).draw(fb);
        let _ = Circle::new(top_left + Point::new(9, 0), 22).into_styled(ink).draw(fb);
        let _ = Circle::new(top_left + Point::new(22, 6), 18).into_styled(ink).draw(fb);
        let _ = Rectangle::new(top_left + Point::new(8, 14), Size::new(24, 10))
            .into_styled(ink)
            .draw(fb);
    };

    match sky {
        Sky::Clear if is_day => {
            let _ = Circle::new(o + Point::new(12, 12), 20).into_styled(ink).draw(fb);
            // Rays
            for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0), (1, 1), (-1, -1), (1, -1), (-1, 1)] {
                let center = o + Point::new(22, 22);
                let _ = Line::new(center + Point::new(dx * 14, dy * 14), center + Point::new(dx * 19, dy * 19))
                    .into_styled(outline)
                    .draw(fb);
            }
        }
        Sky::Clear => {
            // Crescent: full disc with an offset bite taken out
            let _ = Circle::new(o + Point::new(8, 8), 28).into_styled(ink).draw(fb);
            let _ = Circle::new(o + Point::new(18, 2), 26)
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
                .draw(fb);
        }
        Sky::PartlyCloudy => {
            let _ = Circle::new(o + Point::new(20, 2), 20).into_styled(outline).draw(fb);
            cloud(fb, o + Point::new(2, 16));
        }
        Sky::Cloudy => cloud(fb, o + Point::new(2, 8)),
        Sky::Fog => {
            for row in 0..5 {
                let y = 8 + row * 7;
                let _ = Line::new(o + Point::new(4, y), o + Point::new(40, y))
                    .into_styled(outline)
                    .draw(fb);
            }
        }
        Sky::Rain | Sky::Snow | Sky::Storm => {
            cloud(fb, o + Point::new(2, 0));
            for i in 0..4 {
                let base = o + Point::new(8 + i * 9, 30);
                match sky {
                    Sky::Snow => {
                        let _ = Circle::new(base, 4).into_styled(ink).draw(fb);
                    }
                    _ => {
                        let _ = Line::new(base, base + Point::new(-3, 9)).into_styled(outline).draw(fb);
                    }
                }
            }
            if sky == Sky::Storm {
                let bolt = o + Point::new(22, 26);
                let _ = Line::new(bolt, bolt + Point::new(-5, 9)).into_styled(outline).draw(fb);
                let _ = Line::new(bolt + Point::new(-5, 9), bolt + Point::new(2, 9))
                    .into_styled(outline)
                    .draw(fb);
                let _ = Line::new(bolt + Point::new(2, 9), bolt + Point::new(-3, 17))
                    .into_styled(outline)
                    .draw(fb);
            }
        }
    }
}

fn blank(fb: &mut Framebuffer, region: Rectangle) {
    let _ = region
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(fb);
}

/// Rotating message, centered in `region`
pub fn draw_message(fb: &mut Framebuffer, region: Rectangle, message: &str) {
    blank(fb, region);
    if message.is_empty() {
        return;
    }

    let font = if message.chars().count() > LONG_MESSAGE {
        &FONT_6X10
    } else {
        &FONT_7X13_BOLD
    };
    let baseline = Point::new(region.center().x, region.top_left.y + 12);
    let _ = Text::with_alignment(
        message,
        baseline,
        MonoTextStyle::new(font, BinaryColor::On),
        Alignment::Center,
    )
    .draw(fb);
}

/// Time and date, centered in `region`; dashes when the clock is unknown
pub fn draw_clock(fb: &mut Framebuffer, region: Rectangle, clock: Option<&WallClock>) {
    blank(fb, region);
    let center = region.center().x;
    let top = region.top_left.y;

    let time = clock.map(WallClock::time_text);
    let time = time.as_deref().unwrap_or("--:--");
    let _ = Text::with_alignment(
        time,
        Point::new(center, top + 22),
        MonoTextStyle::new(&FONT_10X20, BinaryColor::On),
        Alignment::Center,
    )
    .draw(fb);

    if let Some(clock) = clock {
        let _ = Text::with_alignment(
            &clock.date_text(),
            Point::new(center, top + 37),
            MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
            Alignment::Center,
        )
        .draw(fb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HEIGHT;
    use crate::weather;
    use embedded_graphics::primitives::PointsIter;

    fn ink_in(fb: &Framebuffer, area: Rectangle) -> usize {
        area.points()
            .filter(|p| fb.pixel(p.x as u32, p.y as u32) == BinaryColor::On)
            .count()
    }

    fn weather() -> WeatherSnapshot {
        WeatherSnapshot {
            valid: true,
            temperature: 17.0,
            min_temp: 12.0,
            max_temp: 21.0,
            chance_of_rain: 30,
            condition: weather::truncated("Partly cloudy"),
            ..WeatherSnapshot::new()
        }
    }

    fn scene<'a>(weather: &'a WeatherSnapshot, message: &'a str) -> LocalScene<'a> {
        LocalScene {
            weather,
            clock: WallClock::from_unix(1_792_224_900, 0).ok(),
            message,
            status: StatusBar {
                battery_percent: 80,
                charging: false,
                wifi_connected: true,
            },
        }
    }

    #[test]
    fn test_sky_from_condition() {
        assert_eq!(Sky::from_condition("Sunny"), Sky::Clear);
        assert_eq!(Sky::from_condition("Partly cloudy"), Sky::PartlyCloudy);
        assert_eq!(Sky::from_condition("Overcast"), Sky::Cloudy);
        assert_eq!(Sky::from_condition("Patchy light drizzle"), Sky::Rain);
        assert_eq!(Sky::from_condition("Moderate snow"), Sky::Snow);
        assert_eq!(Sky::from_condition("Thundery outbreaks possible"), Sky::Storm);
        assert_eq!(Sky::from_condition("Freezing fog"), Sky::Fog);
    }

    #[test]
    fn test_full_layout_draws_every_block() {
        let w = weather();
        let mut fb = Framebuffer::new();
        draw_local(&mut fb, &scene(&w, "Lovely day, just like you"));

        let weather_block = Rectangle::new(Point::zero(), Size::new(WIDTH, 58));
        assert!(ink_in(&fb, weather_block) > 0);
        assert!(ink_in(&fb, MESSAGE_REGION) > 0);
        assert!(ink_in(&fb, CLOCK_REGION) > 0);
        assert_eq!(fb.pixel(10, SEPARATOR_Y as u32), BinaryColor::On);
    }

    #[test]
    fn test_partial_blocks_stay_inside_region() {
        let mut fb = Framebuffer::new();
        let clock = WallClock::from_unix(1_792_224_900, 0).ok();
        draw_message(&mut fb, MESSAGE_REGION, "Good morning, sunshine!");
        draw_clock(&mut fb, CLOCK_REGION, clock.as_ref());

        let everything = Rectangle::new(Point::zero(), Size::new(WIDTH, HEIGHT));
        let total = ink_in(&fb, everything);
        assert!(total > 0);
        assert_eq!(total, ink_in(&fb, MESSAGE_REGION) + ink_in(&fb, CLOCK_REGION));
    }

    #[test]
    fn test_partial_matches_full_layout() {
        let w = weather();
        let mut full = Framebuffer::new();
        let s = scene(&w, "Bring a light jacket");
        draw_local(&mut full, &s);

        // Start from a stale frame and repaint only the two regions
        let mut partial = Framebuffer::new();
        draw_local(&mut partial, &scene(&w, "Have a wonderful day!"));
        draw_message(&mut partial, MESSAGE_REGION, s.message);
        draw_clock(&mut partial, CLOCK_REGION, s.clock.as_ref());

        assert_eq!(full.as_slice(), partial.as_slice());
    }

    #[test]
    fn test_unknown_clock_shows_dashes_only() {
        let mut fb = Framebuffer::new();
        draw_clock(&mut fb, CLOCK_REGION, None);
        let date_rows = Rectangle::new(Point::new(0, 110), Size::new(WIDTH, 12));
        assert!(ink_in(&fb, CLOCK_REGION) > 0);
        assert_eq!(ink_in(&fb, date_rows), 0);
    }

    #[test]
    fn test_invalid_weather_placeholder() {
        let w = WeatherSnapshot::new();
        let mut fb = Framebuffer::new();
        draw_local(&mut fb, &scene(&w, ""));
        // Icon placeholder outline
        assert_eq!(fb.pixel(2, 2), BinaryColor::On);
        assert_eq!(ink_in(&fb, MESSAGE_REGION), 0);
    }
}
