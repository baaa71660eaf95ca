//! Weather snapshot, forecast parsing and fetch cadence
//!
//! JSON format from the forecast endpoint (only the fields we read):
//! ```json
//! {
//!   "current": {"temp_c": 17.0, "feelslike_c": 16.2, "humidity": 72, "is_day": 1,
//!               "condition": {"text": "Partly cloudy", "icon": "//cdn.../116.png"}},
//!   "forecast": {"forecastday": [{"day": {"maxtemp_c": 21.3, "mintemp_c": 12.1,
//!               "daily_chance_of_rain": 30, "condition": {"text": "Sunny"}}}]}
//! }
//! ```

use core::fmt::{self, Write as FmtWrite};

use heapless::{String, Vec};
use serde::Deserialize;

/// Minutes in a day; minute-of-day values live on this circle
pub const MINUTES_PER_DAY: i32 = 1440;

pub const CONDITION_LEN: usize = 15;
pub const ICON_LEN: usize = 63;

#[derive(Debug)]
pub enum WeatherError {
    /// Body is not the JSON we expect
    Json(serde_json_core::de::Error),
    /// The forecast carries no day entry
    Missing,
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::Json(e) => write!(f, "weather json: {}", e),
            WeatherError::Missing => write!(f, "weather forecast missing"),
        }
    }
}

impl From<serde_json_core::de::Error> for WeatherError {
    fn from(e: serde_json_core::de::Error) -> Self {
        WeatherError::Json(e)
    }
}

/// Last successfully fetched weather, kept across deep sleep
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub valid: bool,
    pub temperature: f32,
    pub feels_like: f32,
    pub humidity: u8,
    pub condition: String<CONDITION_LEN>,
    pub icon: String<ICON_LEN>,
    pub is_day: bool,
    pub chance_of_rain: u8,
    pub max_temp: f32,
    pub min_temp: f32,
    pub forecast_condition: String<CONDITION_LEN>,
}

impl WeatherSnapshot {
    pub const fn new() -> Self {
        Self {
            valid: false,
            temperature: 0.0,
            feels_like: 0.0,
            humidity: 0,
            condition: String::new(),
            icon: String::new(),
            is_day: true,
            chance_of_rain: 0,
            max_temp: 0.0,
            min_temp: 0.0,
            forecast_condition: String::new(),
        }
    }

    /// Current temperature, e.g. "18°C"
    pub fn temperature_text(&self) -> String<12> {
        let mut s = String::new();
        if self.valid {
            let _ = write!(s, "{:.0}°C", self.temperature);
        } else {
            let _ = s.push_str("--°C");
        }
        s
    }

    /// Today's range, e.g. "12° / 21°"
    pub fn min_max_text(&self) -> String<20> {
        let mut s = String::new();
        if self.valid {
            let _ = write!(s, "{:.0}° / {:.0}°", self.min_temp, self.max_temp);
        } else {
            let _ = s.push_str("--° / --°");
        }
        s
    }

    pub fn rain_text(&self) -> String<16> {
        let mut s = String::new();
        if self.valid {
            let _ = write!(s, "Rain: {}%", self.chance_of_rain);
        } else {
            let _ = s.push_str("Rain: --");
        }
        s
    }

    /// One-line suggestion for the day; empty until the first fetch
    pub fn day_suggestion(&self) -> &'static str {
        if !self.valid {
            return "";
        }

        // Rain takes priority
        if self.chance_of_rain >= 70 {
            return "Take an umbrella!";
        }
        if self.chance_of_rain >= 40 {
            return "Careful, it might rain";
        }

        if self.temperature <= 10.0 || self.min_temp <= 8.0 {
            return "Freezing out there, bundle up!";
        }
        if self.temperature <= 15.0 || self.min_temp <= 12.0 {
            return "Bring a light jacket";
        }

        if self.max_temp >= 30.0 {
            return "Hot one today, stay hydrated";
        }

        if self.chance_of_rain < 20 && self.max_temp >= 18.0 && self.max_temp <= 28.0 {
            return "Lovely day, just like you";
        }

        "Have a wonderful day!"
    }
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ForecastPayload<'a> {
    #[serde(borrow)]
    current: CurrentPayload<'a>,
    #[serde(borrow)]
    forecast: ForecastBlock<'a>,
}

#[derive(Deserialize)]
struct CurrentPayload<'a> {
    temp_c: f32,
    feelslike_c: f32,
    humidity: u8,
    is_day: u8,
    #[serde(borrow)]
    condition: ConditionPayload<'a>,
}

#[derive(Deserialize)]
struct ConditionPayload<'a> {
    text: &'a str,
    #[serde(default)]
    icon: &'a str,
}

#[derive(Deserialize)]
struct ForecastBlock<'a> {
    #[serde(borrow)]
    forecastday: Vec<ForecastDay<'a>, 1>,
}

#[derive(Deserialize)]
struct ForecastDay<'a> {
    #[serde(borrow)]
    day: DayPayload<'a>,
}

#[derive(Deserialize)]
struct DayPayload<'a> {
    maxtemp_c: f32,
    mintemp_c: f32,
    daily_chance_of_rain: u8,
    #[serde(borrow)]
    condition: ConditionPayload<'a>,
}

/// Copy `src` into a bounded string, cutting at a char boundary
pub fn truncated<const N: usize>(src: &str) -> String<N> {
    let mut out = String::new();
    for c in src.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Parse a forecast body into a fresh snapshot
pub fn parse_forecast(body: &[u8]) -> Result<WeatherSnapshot, WeatherError> {
    let (payload, _): (ForecastPayload, usize) = serde_json_core::from_slice(body)?;
    let today = payload.forecast.forecastday.first().ok_or(WeatherError::Missing)?;
    let current = &payload.current;

    Ok(WeatherSnapshot {
        valid: true,
        temperature: current.temp_c,
        feels_like: current.feelslike_c,
        humidity: current.humidity,
        condition: truncated(current.condition.text),
        icon: truncated(current.condition.icon),
        is_day: current.is_day != 0,
        chance_of_rain: today.day.daily_chance_of_rain.min(100),
        max_temp: today.day.maxtemp_c,
        min_temp: today.day.mintemp_c,
        forecast_condition: truncated(today.day.condition.text),
    })
}

/// Build the forecast request path for `api.weatherapi.com`
///
/// Only one hour of hourly data is requested to keep the body small.
pub fn request_path(api_key: &str, location: &str) -> Result<String<192>, fmt::Error> {
    let mut path: String<192> = String::new();
    path.push_str("/v1/forecast.json?key=").map_err(|_| fmt::Error)?;
    push_query_escaped(&mut path, api_key)?;
    path.push_str("&q=").map_err(|_| fmt::Error)?;
    push_query_escaped(&mut path, location)?;
    path.push_str("&days=1&hour=12&aqi=no&alerts=no")
        .map_err(|_| fmt::Error)?;
    Ok(path)
}

fn push_query_escaped<const N: usize>(out: &mut String<N>, value: &str) -> fmt::Result {
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~' | b',') {
            out.push(b as char).map_err(|_| fmt::Error)?;
        } else {
            write!(out, "%{:02X}", b)?;
        }
    }
    Ok(())
}

/// Minutes elapsed from `from` to `to`, going forward around the clock
pub fn minute_distance(from: i16, to: u16) -> u16 {
    (to as i32 - from as i32).rem_euclid(MINUTES_PER_DAY) as u16
}

/// Decide whether cached weather is stale enough to refetch
///
/// Minute-of-day has no continuity across sleep, so the gap is measured on
/// the 1440-minute circle and the interval boundary is inclusive.
pub fn needs_refresh(
    last_fetch_minute: i16,
    now_minute: u16,
    manual_trigger: bool,
    never_fetched: bool,
    min_interval_minutes: u16,
) -> bool {
    manual_trigger
        || never_fetched
        || last_fetch_minute < 0
        || minute_distance(last_fetch_minute, now_minute) >= min_interval_minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "location": {"name": "Porto", "localtime_epoch": 1792229400},
        "current": {
            "last_updated": "2026-10-17 09:30",
            "temp_c": 17.4, "feelslike_c": 16.9, "humidity": 72, "is_day": 1,
            "condition": {"text": "Partly cloudy", "icon": "//cdn.weatherapi.com/weather/64x64/day/116.png", "code": 1003},
            "wind_kph": 11.2
        },
        "forecast": {"forecastday": [{
            "date": "2026-10-17",
            "day": {
                "maxtemp_c": 21.3, "mintemp_c": 12.6, "daily_chance_of_rain": 30,
                "condition": {"text": "Patchy rain nearby", "icon": "//cdn/176.png", "code": 1063}
            },
            "hour": [{"time": "2026-10-17 12:00", "temp_c": 19.9}]
        }]}
    }"#;

    #[test]
    fn test_parse_forecast() {
        let w = parse_forecast(SAMPLE.as_bytes()).unwrap();
        assert!(w.valid);
        assert_eq!(w.humidity, 72);
        assert!(w.is_day);
        assert_eq!(w.chance_of_rain, 30);
        assert_eq!(w.condition.as_str(), "Partly cloudy");
        // 18 chars truncated to 15
        assert_eq!(w.forecast_condition.as_str(), "Patchy rain nea");
        assert_eq!(w.icon.len(), 46);
        assert!((w.max_temp - 21.3).abs() < 0.01);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_forecast(b"<html>502</html>").is_err());
        assert!(parse_forecast(br#"{"current": {}}"#).is_err());
    }

    #[test]
    fn test_truncated_respects_char_boundaries() {
        let s: String<4> = truncated("abé!x");
        // 'é' is two bytes: "abé" fills 4 bytes exactly
        assert_eq!(s.as_str(), "abé");
        let s: String<3> = truncated("abé");
        assert_eq!(s.as_str(), "ab");
    }

    #[test]
    fn test_placeholders_when_invalid() {
        let w = WeatherSnapshot::new();
        assert_eq!(w.temperature_text().as_str(), "--°C");
        assert_eq!(w.min_max_text().as_str(), "--° / --°");
        assert_eq!(w.day_suggestion(), "");
    }

    #[test]
    fn test_text_when_valid() {
        let w = parse_forecast(SAMPLE.as_bytes()).unwrap();
        assert_eq!(w.temperature_text().as_str(), "17°C");
        assert_eq!(w.min_max_text().as_str(), "13° / 21°");
        assert_eq!(w.rain_text().as_str(), "Rain: 30%");
    }

    fn snapshot(temp: f32, min: f32, max: f32, rain: u8) -> WeatherSnapshot {
        WeatherSnapshot {
            valid: true,
            temperature: temp,
            min_temp: min,
            max_temp: max,
            chance_of_rain: rain,
            ..WeatherSnapshot::new()
        }
    }

    #[test]
    fn test_day_suggestion_priority() {
        assert_eq!(snapshot(5.0, 2.0, 9.0, 80).day_suggestion(), "Take an umbrella!");
        assert_eq!(snapshot(20.0, 15.0, 24.0, 40).day_suggestion(), "Careful, it might rain");
        assert_eq!(snapshot(9.0, 13.0, 16.0, 0).day_suggestion(), "Freezing out there, bundle up!");
        assert_eq!(snapshot(16.0, 12.0, 20.0, 0).day_suggestion(), "Bring a light jacket");
        assert_eq!(snapshot(26.0, 20.0, 33.0, 0).day_suggestion(), "Hot one today, stay hydrated");
        assert_eq!(snapshot(20.0, 14.0, 24.0, 10).day_suggestion(), "Lovely day, just like you");
        assert_eq!(snapshot(20.0, 14.0, 24.0, 25).day_suggestion(), "Have a wonderful day!");
    }

    #[test]
    fn test_request_path_escapes_location() {
        let path = request_path("abc123", "New York,US").unwrap();
        assert_eq!(
            path.as_str(),
            "/v1/forecast.json?key=abc123&q=New%20York,US&days=1&hour=12&aqi=no&alerts=no"
        );
    }

    #[test]
    fn test_circular_distance_across_midnight() {
        // (10 - 1430) mod 1440 = 20
        assert_eq!(minute_distance(1430, 10), 20);
        assert!(!needs_refresh(1430, 10, false, false, 30));
        assert!(needs_refresh(1430, 10, false, false, 15));
    }

    #[test]
    fn test_interval_boundary_is_inclusive() {
        assert!(needs_refresh(600, 630, false, false, 30));
        assert!(!needs_refresh(600, 629, false, false, 30));
        assert!(needs_refresh(1420, 10, false, false, 30));
    }

    #[test]
    fn test_manual_and_never_fetched_force_refresh() {
        assert!(needs_refresh(600, 601, true, false, 30));
        assert!(needs_refresh(-1, 601, false, true, 30));
        assert!(needs_refresh(-1, 601, false, false, 30));
    }

    #[test]
    fn test_same_minute_is_not_stale() {
        assert!(!needs_refresh(100, 100, false, false, 1));
    }
}
