//! Rotating morning greetings

use crate::clock::WallClock;
use crate::weather::WeatherSnapshot;

/// One greeting per day, cycled by day of year
pub const MORNING_MESSAGES: &[&str] = &[
    "Good morning, sunshine!",
    "Morning, sweet pea!",
    "Rise and shine, little star!",
    "Good morning, my favourite!",
    "Morning, cupcake!",
    "Hello, flower of the day!",
    "Good morning, honeybun!",
    "Morning, my little rocket!",
    "Up we go, sleepyhead!",
    "Good morning, cinnamon roll!",
    "Morning, you lovely human!",
    "Good morning, treasure!",
    "Coffee time, sweetheart!",
    "Morning, my ray of light!",
    "Good morning, pancake!",
    "Hello, brightest smile!",
    "Morning, my little cloud!",
    "Good morning, jellybean!",
];

/// Greeting for a zero-based day of year
pub fn morning_message(day_of_year: u16) -> &'static str {
    MORNING_MESSAGES[day_of_year as usize % MORNING_MESSAGES.len()]
}

/// Text for the message strip
///
/// Mornings alternate between the greeting and the weather suggestion on
/// each wake; the rest of the day shows the suggestion only.
pub fn pick(weather: &WeatherSnapshot, clock: Option<&WallClock>, toggle: bool) -> &'static str {
    if !weather.valid {
        return "";
    }
    match clock {
        Some(clock) if clock.is_morning() && toggle => morning_message(clock.day_of_year()),
        _ => weather.day_suggestion(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_weather() -> WeatherSnapshot {
        WeatherSnapshot {
            valid: true,
            temperature: 20.0,
            min_temp: 14.0,
            max_temp: 24.0,
            chance_of_rain: 10,
            ..WeatherSnapshot::new()
        }
    }

    #[test]
    fn test_morning_message_wraps() {
        assert_eq!(morning_message(0), MORNING_MESSAGES[0]);
        assert_eq!(morning_message(MORNING_MESSAGES.len() as u16), MORNING_MESSAGES[0]);
        assert_eq!(morning_message(365), MORNING_MESSAGES[365 % MORNING_MESSAGES.len()]);
    }

    #[test]
    fn test_pick_alternates_in_the_morning() {
        let weather = valid_weather();
        // 2026-10-17 08:15 UTC
        let clock = WallClock::from_unix(1_792_224_900, 0).unwrap();
        assert!(clock.is_morning());
        assert_eq!(pick(&weather, Some(&clock), true), morning_message(clock.day_of_year()));
        assert_eq!(pick(&weather, Some(&clock), false), weather.day_suggestion());
    }

    #[test]
    fn test_pick_afternoon_shows_suggestion() {
        let weather = valid_weather();
        // 2026-10-17 15:00 UTC
        let clock = WallClock::from_unix(1_792_249_200, 0).unwrap();
        assert!(!clock.is_morning());
        assert_eq!(pick(&weather, Some(&clock), true), weather.day_suggestion());
    }

    #[test]
    fn test_pick_without_weather_is_empty() {
        assert_eq!(pick(&WeatherSnapshot::new(), None, true), "");
    }
}
