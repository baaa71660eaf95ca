//! Full vs partial redraw policy
//!
//! Partial updates leave residual ghosting on this panel, so a full redraw is
//! forced at least once per refresh period. Weather changes also get a full
//! redraw; the weather block has variable-width text and an icon, and is not
//! worth tracking incrementally.

use embedded_graphics_core::geometry::{Point, Size};
use embedded_graphics_core::primitives::Rectangle;

/// Rotating message strip
pub const MESSAGE_REGION: Rectangle = Rectangle::new(Point::new(0, 58), Size::new(250, 16));
/// Time and date block
pub const CLOCK_REGION: Rectangle = Rectangle::new(Point::new(0, 82), Size::new(250, 40));

/// How the panel is redrawn this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Full,
    /// Only `MESSAGE_REGION` and `CLOCK_REGION`
    PartialTimeAndMessage,
    None,
}

impl RefreshKind {
    /// Screen regions a redraw of this kind may touch
    pub fn regions(self) -> &'static [Rectangle] {
        match self {
            RefreshKind::Full => &[],
            RefreshKind::PartialTimeAndMessage => &[MESSAGE_REGION, CLOCK_REGION],
            RefreshKind::None => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshInputs {
    /// Calendar day differs from the last local frame (or there was none)
    pub day_changed: bool,
    /// The panel shows something other than our local layout
    pub foreign_frame: bool,
    pub cycles_since_full_refresh: u16,
    pub refresh_period: u16,
    pub weather_just_changed: bool,
    /// Displayed time or message text differs from the last frame
    pub content_changed: bool,
}

/// Pick the redraw kind, in priority order
pub fn decide(inputs: &RefreshInputs) -> RefreshKind {
    let period = inputs.refresh_period.max(1);

    if inputs.day_changed
        || inputs.foreign_frame
        || inputs.cycles_since_full_refresh >= period - 1
    {
        return RefreshKind::Full;
    }

    if inputs.weather_just_changed {
        return RefreshKind::Full;
    }

    if inputs.content_changed {
        return RefreshKind::PartialTimeAndMessage;
    }

    RefreshKind::None
}

/// Counter value to persist after a redraw of `kind`
///
/// Stays below `refresh_period`: a non-full redraw only happens while the
/// counter is under `period - 1`.
pub fn next_counter(kind: RefreshKind, cycles_since_full_refresh: u16, refresh_period: u16) -> u16 {
    match kind {
        RefreshKind::Full => 0,
        _ => cycles_since_full_refresh
            .saturating_add(1)
            .min(refresh_period.max(1) - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> RefreshInputs {
        RefreshInputs {
            day_changed: false,
            foreign_frame: false,
            cycles_since_full_refresh: 3,
            refresh_period: 60,
            weather_just_changed: false,
            content_changed: true,
        }
    }

    #[test]
    fn test_minute_tick_is_partial() {
        assert_eq!(decide(&inputs()), RefreshKind::PartialTimeAndMessage);
    }

    #[test]
    fn test_nothing_changed() {
        let i = RefreshInputs {
            content_changed: false,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::None);
    }

    #[test]
    fn test_period_boundary_forces_full() {
        let i = RefreshInputs {
            cycles_since_full_refresh: 59,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::Full);
        let i = RefreshInputs {
            cycles_since_full_refresh: 58,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::PartialTimeAndMessage);
    }

    #[test]
    fn test_day_change_and_weather_force_full() {
        let i = RefreshInputs {
            day_changed: true,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::Full);
        let i = RefreshInputs {
            weather_just_changed: true,
            content_changed: false,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::Full);
        let i = RefreshInputs {
            foreign_frame: true,
            content_changed: false,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::Full);
    }

    #[test]
    fn test_counter_resets_on_full_and_stays_below_period() {
        assert_eq!(next_counter(RefreshKind::Full, 59, 60), 0);
        assert_eq!(next_counter(RefreshKind::PartialTimeAndMessage, 3, 60), 4);
        assert_eq!(next_counter(RefreshKind::None, 3, 60), 4);
        assert_eq!(next_counter(RefreshKind::None, 58, 60), 59);
        assert_eq!(next_counter(RefreshKind::None, 59, 60), 59);
    }

    #[test]
    fn test_degenerate_period_is_always_full() {
        let i = RefreshInputs {
            refresh_period: 1,
            cycles_since_full_refresh: 0,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::Full);
        let i = RefreshInputs {
            refresh_period: 0,
            cycles_since_full_refresh: 0,
            ..inputs()
        };
        assert_eq!(decide(&i), RefreshKind::Full);
    }

    #[test]
    fn test_partial_regions_stay_clear_of_weather_block() {
        let regions = RefreshKind::PartialTimeAndMessage.regions();
        assert_eq!(regions.len(), 2);
        for r in regions {
            assert!(r.top_left.y >= 58, "region {:?} overlaps weather block", r);
        }
        assert!(RefreshKind::None.regions().is_empty());
    }
}
