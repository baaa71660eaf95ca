//! Morning Frame Firmware - ESP32 2.13" E-Paper Weather Clock (LilyGo T5)
//!
//! Environment variables required:
//! - WIFI_SSID: WiFi network name
//! - WIFI_PASS: WiFi password
//! - WEATHER_API_KEY: weatherapi.com key
//! - WEATHER_LOCATION: City name, coordinates or IP (e.g., Porto,PT)
//! - REMOTE_URL: Remote-status endpoint (e.g., http://192.168.1.100:8080/status)
//!
//! Optional:
//! - UTC_OFFSET_SECS: Fixed offset for the displayed clock (default 0)

#![no_std]
#![no_main]

extern crate alloc;

use core::time::Duration as CoreDuration;

use embassy_executor::Spawner;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    analog::adc::{Adc, AdcConfig, Attenuation},
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig},
    peripherals::{ADC1, GPIO35, GPIO39},
    ram,
    rng::Rng,
    rtc_cntl::{
        Rtc, wakeup_cause,
        sleep::{Ext0WakeupSource, TimerWakeupSource, WakeupLevel},
    },
    spi::{
        Mode,
        master::{Config as SpiConfig, Spi},
    },
    system::SleepSource,
    time::Rate,
    timer::timg::TimerGroup,
};
use log::{info, warn};
use morning_frame_firmware::battery::BatteryReading;
use morning_frame_firmware::config::{BODY_BUF_SIZE, CycleConfig};
use morning_frame_firmware::cycle::WakeCycle;
use morning_frame_firmware::display::Display;
use morning_frame_firmware::epd::Epd2in13;
use morning_frame_firmware::net::{NetConfig, NetUpstream};
use morning_frame_firmware::sleep::{SleepRequest, WakeCause, WakeSource};
use morning_frame_firmware::state::PersistentState;

esp_bootloader_esp_idf::esp_app_desc!();

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");
const WEATHER_API_KEY: &str = env!("WEATHER_API_KEY");
const WEATHER_LOCATION: &str = env!("WEATHER_LOCATION");
const REMOTE_URL: &str = env!("REMOTE_URL");
const UTC_OFFSET_SECS: Option<&str> = option_env!("UTC_OFFSET_SECS");

/// Samples averaged per battery reading
const BATTERY_SAMPLES: u32 = 8;

/// Survives deep sleep; validated by its magic on every boot
#[ram(unstable(rtc_fast))]
static mut STATE: PersistentState = PersistentState::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // Init logger first so we can see any early crashes
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Check wake reason immediately
    let wake_reason = wakeup_cause();
    let cause = match wake_reason {
        SleepSource::Ext0 => WakeCause::Button,
        SleepSource::Timer => WakeCause::Timer,
        _ => WakeCause::Reset,
    };
    info!("Boot! Wake reason: {:?}", wake_reason);

    esp_alloc::heap_allocator!(#[ram(reclaimed)] size: 64 * 1024);
    esp_alloc::heap_allocator!(size: 36 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let battery = read_battery(peripherals.ADC1, peripherals.GPIO35);
    info!(
        "Battery: {:.2}V ({}%){}",
        battery.volts,
        battery.percent,
        if battery.charging { ", charging" } else { "" }
    );

    // ==================== E-Paper Display Setup ====================
    // LilyGo T5 2.13": MOSI=GPIO23, SCK=GPIO18, CS=GPIO5, DC=GPIO17, RST=GPIO16, BUSY=GPIO4
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(4))
            .with_mode(Mode::_0),
    )
    .expect("SPI init failed")
    .with_sck(peripherals.GPIO18)
    .with_mosi(peripherals.GPIO23);

    let cs = Output::new(peripherals.GPIO5, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new_no_delay(spi, cs).expect("SPI device init failed");

    let busy = Input::new(peripherals.GPIO4, InputConfig::default());
    let dc = Output::new(peripherals.GPIO17, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO16, Level::High, OutputConfig::default());

    let epd = Epd2in13::new(spi_device, busy, dc, rst, Delay).expect("EPD init failed");
    let display = Display::new(epd);

    // ==================== Network (deferred) ====================
    let upstream = NetUpstream::new(
        spawner,
        peripherals.WIFI,
        Rng::new(),
        NetConfig {
            ssid: SSID,
            password: PASSWORD,
            remote_status_url: REMOTE_URL,
            weather_api_key: WEATHER_API_KEY,
            weather_location: WEATHER_LOCATION,
        },
    );

    let cycle_config = CycleConfig {
        utc_offset_secs: utc_offset(),
        ..CycleConfig::DEFAULT
    };

    // Response bodies live on the heap to keep them off the task stack
    let mut body = alloc::vec![0u8; BODY_BUF_SIZE];

    // SAFETY: single task, and nothing else touches STATE
    let state = unsafe { &mut *(&raw mut STATE) };

    let mut sleep = DeepSleep {
        rtc: Rtc::new(peripherals.LPWR),
        cause,
    };

    WakeCycle::new(cycle_config, upstream, display, battery, &mut body)
        .run_to_sleep(state, &mut sleep)
        .await
}

fn utc_offset() -> i32 {
    match UTC_OFFSET_SECS.map(str::parse::<i32>) {
        None => 0,
        Some(Ok(secs)) => secs,
        Some(Err(_)) => {
            warn!("UTC_OFFSET_SECS is not a number, using UTC");
            0
        }
    }
}

/// Averaged battery reading from the divider on GPIO35
fn read_battery(adc1: ADC1<'static>, pin: GPIO35<'static>) -> BatteryReading {
    let mut adc_config = AdcConfig::new();
    let mut adc_pin = adc_config.enable_pin(pin, Attenuation::_11dB);
    let mut adc = Adc::new(adc1, adc_config);

    let mut total: u32 = 0;
    let mut samples: u32 = 0;
    for _ in 0..BATTERY_SAMPLES {
        if let Ok(raw) = nb::block!(adc.read_oneshot(&mut adc_pin)) {
            total += raw as u32;
            samples += 1;
        }
    }
    if samples == 0 {
        warn!("Battery ADC unreadable");
        return BatteryReading::unknown();
    }
    BatteryReading::from_raw((total / samples) as u16)
}

/// Deep sleep with timer and button (GPIO39) wake sources
struct DeepSleep {
    rtc: Rtc<'static>,
    cause: WakeCause,
}

impl WakeSource for DeepSleep {
    fn wake_cause(&self) -> WakeCause {
        self.cause
    }

    fn suspend(&mut self, request: SleepRequest) -> ! {
        let timer = TimerWakeupSource::new(CoreDuration::from_secs(request.duration_secs as u64));

        // GPIO39 is input-only with an external pull-up; the button pulls it low
        let button = unsafe { GPIO39::steal() };
        let ext0 = Ext0WakeupSource::new(button, WakeupLevel::Low);

        info!(
            "Entering deep sleep for {} seconds (press button to wake early)...",
            request.duration_secs
        );
        // Small delay to let serial output flush
        esp_hal::delay::Delay::new().delay_millis(100);

        // Enter deep sleep (never returns - device reboots on wake)
        self.rtc.sleep_deep(&[&timer, &ext0])
    }
}
