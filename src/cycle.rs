//! One wake cycle, from reset to deep sleep
//!
//! ```text
//! Booting -> DecidingMode -> RemoteRender -> Suspending
//!                         \-> LocalRender  -/
//! ```
//!
//! Nothing survives a cycle except [`PersistentState`]. Every failure is
//! recorded as a [`CycleFault`] and the cycle carries on; it always ends with
//! a sleep request.

use core::fmt;

use heapless::Vec;
use log::{debug, info, warn};

use crate::battery::BatteryReading;
use crate::clock::{MIN_PLAUSIBLE_UNIX, WallClock};
use crate::config::CycleConfig;
use crate::display::{CommitKind, FullFrame, RegionContent, Renderer};
use crate::http::HttpError;
use crate::messages;
use crate::mode::{self, StatusCheck};
use crate::refresh::{self, CLOCK_REGION, MESSAGE_REGION, RefreshInputs, RefreshKind};
use crate::screen::{LocalScene, StatusBar};
use crate::sleep::{SleepRequest, WakeCause, WakeSource};
use crate::sntp::SntpError;
use crate::state::{NEVER, PersistentState};
use crate::weather;

/// `last_rendered_day` after a local frame drawn without a known clock
pub const UNKNOWN_DAY: i16 = -2;

/// Recoverable problems seen during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleFault {
    /// No network this cycle; network-dependent steps were skipped
    ConnectivityUnavailable,
    /// Status check timed out, failed, or returned garbage
    RemoteStatusCheckFailed,
    /// Remote image would not fit the persisted buffer
    ImageTooLarge,
    /// Weather fetch failed; cached weather kept
    WeatherFetchFailed,
    /// Clock sync failed; running on the estimated clock
    TimeSyncFailed,
}

impl fmt::Display for CycleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleFault::ConnectivityUnavailable => write!(f, "connectivity unavailable"),
            CycleFault::RemoteStatusCheckFailed => write!(f, "remote status check failed"),
            CycleFault::ImageTooLarge => write!(f, "remote image too large"),
            CycleFault::WeatherFetchFailed => write!(f, "weather fetch failed"),
            CycleFault::TimeSyncFailed => write!(f, "time sync failed"),
        }
    }
}

/// Why the network could not be brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Radio failed to initialize
    Radio,
    /// Could not associate with the access point
    Association,
    /// Associated, but no address was assigned in time
    NoAddress,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Radio => write!(f, "radio init failed"),
            LinkError::Association => write!(f, "could not join network"),
            LinkError::NoAddress => write!(f, "no address assigned"),
        }
    }
}

/// Network collaborator: link management plus the three upstream services
#[allow(async_fn_in_trait)]
pub trait Upstream {
    /// Bring the link up; called at most once per cycle, and only when needed
    async fn connect(&mut self) -> Result<(), LinkError>;

    /// Fetch the remote-status body into `body`, returning its length
    async fn fetch_remote_status(&mut self, body: &mut [u8]) -> Result<usize, HttpError>;

    /// Fetch the weather forecast body into `body`, returning its length
    async fn fetch_weather(&mut self, body: &mut [u8]) -> Result<usize, HttpError>;

    /// Current unix time from the network
    async fn sync_time(&mut self) -> Result<u64, SntpError>;

    /// Drop the link before sleeping
    async fn disconnect(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Booting,
    DecidingMode,
    RemoteRender,
    LocalRender,
    Suspending,
}

/// Which render path the cycle took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    Remote,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Untried,
    Up,
    Down,
}

/// What a cycle did, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub path: RenderPath,
    pub refresh: RefreshKind,
    pub faults: Vec<CycleFault, 5>,
    pub sleep: SleepRequest,
    pub connected: bool,
    pub status_checked: bool,
    pub weather_fetched: bool,
    pub time_synced: bool,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            path: RenderPath::Local,
            refresh: RefreshKind::None,
            faults: Vec::new(),
            sleep: SleepRequest { duration_secs: 0 },
            connected: false,
            status_checked: false,
            weather_fetched: false,
            time_synced: false,
        }
    }

    fn fault(&mut self, fault: CycleFault) {
        // One slot per variant, so this never overflows
        if !self.faults.contains(&fault) {
            let _ = self.faults.push(fault);
        }
    }

    pub fn has_fault(&self, fault: CycleFault) -> bool {
        self.faults.contains(&fault)
    }
}

/// Everything a single wake cycle needs
pub struct WakeCycle<'a, U, R> {
    config: CycleConfig,
    upstream: U,
    renderer: R,
    battery: BatteryReading,
    /// Shared scratch for HTTP bodies
    body: &'a mut [u8],
    link: Link,
}

impl<'a, U: Upstream, R: Renderer> WakeCycle<'a, U, R> {
    pub fn new(
        config: CycleConfig,
        upstream: U,
        renderer: R,
        battery: BatteryReading,
        body: &'a mut [u8],
    ) -> Self {
        Self {
            config,
            upstream,
            renderer,
            battery,
            body,
            link: Link::Untried,
        }
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn enter(&self, phase: Phase) {
        debug!("Phase -> {:?}", phase);
    }

    /// Run the cycle and hand the result to the sleep primitive
    pub async fn run_to_sleep<W: WakeSource>(mut self, state: &mut PersistentState, wake: &mut W) -> ! {
        let cause = wake.wake_cause();
        let report = self.run(state, cause).await;
        wake.suspend(report.sleep)
    }

    /// Run one cycle against `state`; returns once everything is persisted
    pub async fn run(&mut self, state: &mut PersistentState, wake: WakeCause) -> CycleReport {
        let mut report = CycleReport::new();

        // ---- Booting ----
        self.enter(Phase::Booting);
        let restored = state.restore_or_reset(&self.config);
        let manual = wake.is_manual();
        info!(
            "Wake #{} ({}), state {}",
            state.cycle_count,
            wake,
            if restored { "restored" } else { "reset" }
        );

        // Best guess until synced: where the last cycle said we would wake
        let mut now_unix = (state.expected_wake_unix >= MIN_PLAUSIBLE_UNIX).then_some(state.expected_wake_unix);

        // ---- DecidingMode ----
        self.enter(Phase::DecidingMode);
        let sync_due = now_unix.is_none()
            || manual
            || state.cycle_count % self.config.time_sync_period.max(1) == 0;
        if sync_due && self.ensure_connected(&mut report).await {
            match self.upstream.sync_time().await {
                Ok(unix) if unix >= MIN_PLAUSIBLE_UNIX => {
                    info!("Clock synced: {}", unix);
                    now_unix = Some(unix);
                    report.time_synced = true;
                }
                Ok(unix) => {
                    warn!("Time source returned implausible time {}", unix);
                    report.fault(CycleFault::TimeSyncFailed);
                }
                Err(e) => {
                    warn!("Time sync failed: {}", e);
                    report.fault(CycleFault::TimeSyncFailed);
                }
            }
        }

        let check_due = mode::wants_check(
            state.remote_mode,
            manual,
            state.cycle_count,
            self.config.remote_check_period,
        );
        let check = if check_due && self.ensure_connected(&mut report).await {
            report.status_checked = true;
            match self.upstream.fetch_remote_status(self.body).await {
                Ok(len) => StatusCheck::Received(&self.body[..len]),
                Err(e) => {
                    warn!("Remote status request failed: {}", e);
                    StatusCheck::Failed
                }
            }
        } else {
            StatusCheck::Skipped
        };

        let decision = mode::decide(
            state.remote_mode,
            state.remote_refresh_secs,
            self.config.default_remote_refresh_secs,
            check,
            &mut state.remote_image,
        );
        if let Some(fault) = decision.fault {
            report.fault(fault);
        }
        state.remote_mode = decision.next_mode;
        state.remote_refresh_secs = decision.next_refresh_secs;

        let clock = now_unix.and_then(|unix| match WallClock::from_unix(unix, self.config.utc_offset_secs) {
            Ok(clock) => Some(clock),
            Err(e) => {
                warn!("Clock unusable: {}", e);
                None
            }
        });

        if decision.has_remote_frame(&state.remote_image) {
            self.enter(Phase::RemoteRender);
            self.render_remote(state, &mut report);
        } else {
            self.enter(Phase::LocalRender);
            self.render_local(state, clock, manual, &mut report).await;
        }

        // ---- Suspending ----
        self.enter(Phase::Suspending);
        report.sleep = SleepRequest::for_mode(state.remote_mode, state.remote_refresh_secs, &self.config);
        state.expected_wake_unix = now_unix
            .map(|unix| unix + report.sleep.duration_secs as u64)
            .unwrap_or(0);
        state.cycle_count = state.cycle_count.wrapping_add(1);

        if let Err(e) = self.renderer.sleep() {
            warn!("Display sleep failed: {:?}", e);
        }
        if self.link == Link::Up {
            self.upstream.disconnect().await;
        }

        info!(
            "Cycle done: {:?} {:?}, sleeping {}s, faults {:?}",
            report.path, report.refresh, report.sleep.duration_secs, report.faults
        );
        report
    }

    /// Bring the link up on first use; a failure sticks for the rest of the cycle
    async fn ensure_connected(&mut self, report: &mut CycleReport) -> bool {
        match self.link {
            Link::Up => true,
            Link::Down => false,
            Link::Untried => match self.upstream.connect().await {
                Ok(()) => {
                    self.link = Link::Up;
                    report.connected = true;
                    true
                }
                Err(e) => {
                    warn!("Network unavailable: {}", e);
                    self.link = Link::Down;
                    report.fault(CycleFault::ConnectivityUnavailable);
                    false
                }
            },
        }
    }

    fn render_remote(&mut self, state: &mut PersistentState, report: &mut CycleReport) {
        info!("Rendering remote image ({} bytes)", state.remote_image.len());
        self.renderer.clear();
        self.renderer
            .draw_full_frame(FullFrame::Remote(state.remote_image.as_slice()));
        if let Err(e) = self.renderer.commit(CommitKind::Full) {
            warn!("Display update failed: {:?}", e);
        }

        state.cycles_since_full_refresh = 0;
        state.last_frame_remote = true;
        state.last_rendered_day = NEVER;
        state.last_rendered_minute = NEVER;

        report.path = RenderPath::Remote;
        report.refresh = RefreshKind::Full;
    }

    async fn render_local(
        &mut self,
        state: &mut PersistentState,
        clock: Option<WallClock>,
        manual: bool,
        report: &mut CycleReport,
    ) {
        // Without a clock there is no minute to measure from, so only the
        // unconditional triggers apply
        let weather_due = match clock {
            Some(clock) => weather::needs_refresh(
                state.last_weather_minute,
                clock.minute_of_day(),
                manual,
                state.weather_never_fetched(),
                self.config.weather_interval_min,
            ),
            None => manual || state.weather_never_fetched(),
        };

        let mut weather_changed = false;
        if weather_due && self.ensure_connected(report).await {
            match self.fetch_weather().await {
                Ok(snapshot) => {
                    info!(
                        "Weather: {} {:.1}°C, rain {}%",
                        snapshot.condition, snapshot.temperature, snapshot.chance_of_rain
                    );
                    weather_changed = snapshot != state.weather;
                    state.weather = snapshot;
                    if let Some(clock) = clock {
                        state.last_weather_minute = clock.minute_of_day() as i16;
                    }
                    report.weather_fetched = true;
                }
                Err(()) => report.fault(CycleFault::WeatherFetchFailed),
            }
        }

        state.morning_message_toggle = !state.morning_message_toggle;
        let message = messages::pick(&state.weather, clock.as_ref(), state.morning_message_toggle);

        let (day_changed, minute_changed) = match clock {
            Some(clock) => (
                state.last_rendered_day != clock.day_of_year() as i16,
                state.last_rendered_minute != clock.minute_of_day() as i16,
            ),
            None => (state.last_rendered_day == NEVER, false),
        };
        // The morning strip alternates every wake
        let message_alternates = state.weather.valid && clock.is_some_and(|c| c.is_morning());

        let inputs = RefreshInputs {
            day_changed,
            foreign_frame: state.last_frame_remote,
            cycles_since_full_refresh: state.cycles_since_full_refresh,
            refresh_period: self.config.full_refresh_period,
            weather_just_changed: weather_changed,
            content_changed: minute_changed || message_alternates,
        };
        let kind = refresh::decide(&inputs);
        debug!("Refresh inputs {:?} -> {:?}", inputs, kind);

        match kind {
            RefreshKind::Full => {
                let scene = LocalScene {
                    weather: &state.weather,
                    clock,
                    message,
                    status: StatusBar {
                        battery_percent: self.battery.percent,
                        charging: self.battery.charging,
                        wifi_connected: self.link == Link::Up,
                    },
                };
                self.renderer.clear();
                self.renderer.draw_full_frame(FullFrame::Local(&scene));
                if let Err(e) = self.renderer.commit(CommitKind::Full) {
                    warn!("Display update failed: {:?}", e);
                }
            }
            RefreshKind::PartialTimeAndMessage => {
                self.renderer
                    .draw_partial_region(MESSAGE_REGION, RegionContent::Message(message));
                self.renderer
                    .draw_partial_region(CLOCK_REGION, RegionContent::Clock(clock));
                if let Err(e) = self.renderer.commit(CommitKind::Partial) {
                    warn!("Display update failed: {:?}", e);
                }
            }
            RefreshKind::None => debug!("Display unchanged"),
        }

        state.cycles_since_full_refresh = refresh::next_counter(
            kind,
            state.cycles_since_full_refresh,
            self.config.full_refresh_period,
        );
        if kind != RefreshKind::None {
            state.last_frame_remote = false;
            state.last_rendered_day = clock.map_or(UNKNOWN_DAY, |c| c.day_of_year() as i16);
            state.last_rendered_minute = clock.map_or(NEVER, |c| c.minute_of_day() as i16);
        }

        report.path = RenderPath::Local;
        report.refresh = kind;
    }

    /// Fetch and parse the forecast; failures are logged here
    async fn fetch_weather(&mut self) -> Result<weather::WeatherSnapshot, ()> {
        let len = self.upstream.fetch_weather(self.body).await.map_err(|e| {
            warn!("Weather request failed: {}", e);
        })?;
        weather::parse_forecast(&self.body[..len]).map_err(|e| {
            warn!("Weather response unusable: {}", e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_dedupes_faults() {
        let mut report = CycleReport::new();
        report.fault(CycleFault::TimeSyncFailed);
        report.fault(CycleFault::TimeSyncFailed);
        report.fault(CycleFault::ConnectivityUnavailable);
        assert_eq!(report.faults.len(), 2);
        assert!(report.has_fault(CycleFault::TimeSyncFailed));
        assert!(!report.has_fault(CycleFault::ImageTooLarge));
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(
            alloc::format!("{}", CycleFault::ImageTooLarge),
            "remote image too large"
        );
    }
}
