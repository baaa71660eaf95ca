//! Driver for 2.13" monochrome e-paper panels on the SSD1680 controller
//! (Waveshare 2.13" V4, Good Display GDEY0213B74).
//!
//! The panel is 122 sources x 250 gates. RAM is written one gate line at a
//! time, 16 bytes per line, MSB first, bit set = white.

mod command;

use command::{BORDER_FULL, BORDER_PARTIAL, Command, SEQUENCE_FULL, SEQUENCE_PARTIAL};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use log::warn;

/// Source pixels per gate line
pub const SOURCE_PIXELS: u32 = 122;
/// Gate lines
pub const GATE_LINES: u32 = 250;
/// RAM bytes per gate line (sources padded to a whole byte)
pub const ROW_BYTES: usize = (SOURCE_PIXELS as usize).div_ceil(8);
/// Buffer size: 1 bit per pixel
pub const BUFFER_SIZE: usize = ROW_BYTES * GATE_LINES as usize;

/// Give up on BUSY after this long; a full update takes about 2s
const BUSY_TIMEOUT_MS: u32 = 5_000;
const BUSY_POLL_MS: u32 = 10;

/// RAM window for a partial update, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First source byte
    pub x_start: u8,
    /// Last source byte
    pub x_end: u8,
    /// First gate line
    pub y_start: u16,
    /// Last gate line
    pub y_end: u16,
}

impl Window {
    /// The whole panel
    pub const FULL: Window = Window {
        x_start: 0,
        x_end: (ROW_BYTES - 1) as u8,
        y_start: 0,
        y_end: (GATE_LINES - 1) as u16,
    };
}

/// Driver for the 2.13" SSD1680 panel
pub struct Epd2in13<SPI, BUSY, DC, RST, DELAY> {
    spi: SPI,
    busy: BUSY,
    dc: DC,
    rst: RST,
    delay: DELAY,
}

impl<SPI, BUSY, DC, RST, DELAY> Epd2in13<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create a new display driver instance.
    ///
    /// Performs hardware reset and initialization.
    pub fn new(spi: SPI, busy: BUSY, dc: DC, rst: RST, delay: DELAY) -> Result<Self, SPI::Error> {
        let mut epd = Self {
            spi,
            busy,
            dc,
            rst,
            delay,
        };

        epd.hardware_reset();
        epd.init()?;

        Ok(epd)
    }

    /// Hardware reset sequence
    fn hardware_reset(&mut self) {
        let _ = self.rst.set_high();
        self.delay.delay_ms(10);
        let _ = self.rst.set_low();
        self.delay.delay_ms(2);
        let _ = self.rst.set_high();
        self.delay.delay_ms(10);
    }

    /// Wait for the display to become idle (BUSY pin low)
    pub fn wait_until_idle(&mut self) {
        // BUSY is active high on this controller
        let mut waited = 0;
        while self.busy.is_high().unwrap_or(false) {
            if waited >= BUSY_TIMEOUT_MS {
                warn!("EPD busy for over {}ms, continuing", BUSY_TIMEOUT_MS);
                return;
            }
            self.delay.delay_ms(BUSY_POLL_MS);
            waited += BUSY_POLL_MS;
        }
    }

    /// Send a command to the display
    fn send_command(&mut self, command: Command) -> Result<(), SPI::Error> {
        let _ = self.dc.set_low();
        self.spi.write(&[command.addr()])
    }

    /// Send data to the display
    fn send_data(&mut self, data: &[u8]) -> Result<(), SPI::Error> {
        let _ = self.dc.set_high();
        self.spi.write(data)
    }

    /// Send command followed by data
    fn cmd_with_data(&mut self, command: Command, data: &[u8]) -> Result<(), SPI::Error> {
        self.send_command(command)?;
        self.send_data(data)
    }

    fn init(&mut self) -> Result<(), SPI::Error> {
        self.wait_until_idle();
        self.send_command(Command::SwReset)?;
        self.wait_until_idle();

        // 250 gate lines, default scan
        self.cmd_with_data(Command::DriverOutput, &[0xF9, 0x00, 0x00])?;
        // X increment, Y increment, counter advances along X
        self.cmd_with_data(Command::DataEntry, &[0x03])?;
        self.set_window(Window::FULL)?;
        self.cmd_with_data(Command::Border, &[BORDER_FULL])?;
        self.cmd_with_data(Command::UpdateControl1, &[0x00, 0x80])?;
        // Internal temperature sensor
        self.cmd_with_data(Command::TempSensor, &[0x80])?;
        self.set_cursor(0, 0)?;
        self.wait_until_idle();

        Ok(())
    }

    fn set_window(&mut self, window: Window) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::RamXRange, &[window.x_start, window.x_end])?;
        let [ys_lo, ys_hi] = window.y_start.to_le_bytes();
        let [ye_lo, ye_hi] = window.y_end.to_le_bytes();
        self.cmd_with_data(Command::RamYRange, &[ys_lo, ys_hi, ye_lo, ye_hi])
    }

    fn set_cursor(&mut self, x: u8, y: u16) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::RamXCounter, &[x])?;
        let [lo, hi] = y.to_le_bytes();
        self.cmd_with_data(Command::RamYCounter, &[lo, hi])
    }

    /// Stream the window's bytes from a full-panel buffer into `ram`
    fn write_window(&mut self, ram: Command, buffer: &[u8], window: Window) -> Result<(), SPI::Error> {
        self.set_window(window)?;
        self.set_cursor(window.x_start, window.y_start)?;
        self.send_command(ram)?;
        let _ = self.dc.set_high();
        for gate in window.y_start as usize..=window.y_end as usize {
            let row = gate * ROW_BYTES;
            let start = row + window.x_start as usize;
            let end = row + window.x_end as usize + 1;
            match buffer.get(start..end) {
                Some(bytes) => self.spi.write(bytes)?,
                None => break,
            }
        }
        Ok(())
    }

    fn activate(&mut self, sequence: u8) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::UpdateControl2, &[sequence])?;
        self.send_command(Command::MasterActivation)?;
        self.wait_until_idle();
        Ok(())
    }

    /// Display a full frame (must be BUFFER_SIZE bytes)
    ///
    /// Both RAM banks get the frame so the next partial update has a correct
    /// base to diff against.
    pub fn display_full(&mut self, buffer: &[u8]) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::Border, &[BORDER_FULL])?;
        self.write_window(Command::WriteBw, buffer, Window::FULL)?;
        self.write_window(Command::WriteRed, buffer, Window::FULL)?;
        self.activate(SEQUENCE_FULL)
    }

    /// Redraw only `window`, taking its bytes from a full-panel buffer
    pub fn display_partial(&mut self, buffer: &[u8], window: Window) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::Border, &[BORDER_PARTIAL])?;
        self.write_window(Command::WriteBw, buffer, window)?;
        self.activate(SEQUENCE_PARTIAL)?;
        // Keep the previous-frame bank in step for the next diff
        self.write_window(Command::WriteRed, buffer, window)?;
        self.set_window(Window::FULL)
    }

    /// Put the display into deep sleep; RAM is retained
    pub fn sleep(&mut self) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::DeepSleep, &[0x01])?;
        self.delay.delay_ms(100);
        Ok(())
    }
}
