//! Command definitions for the SSD1680 controller (2.13" 122x250 panels)

/// Display commands
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
#[allow(clippy::upper_case_acronyms)]
pub enum Command {
    /// Driver Output Control (gate lines, scan direction)
    DriverOutput = 0x01,
    /// Deep Sleep Mode
    DeepSleep = 0x10,
    /// Data Entry Mode
    DataEntry = 0x11,
    /// Software Reset
    SwReset = 0x12,
    /// Temperature Sensor Control
    TempSensor = 0x18,
    /// Master Activation (run the update sequence)
    MasterActivation = 0x20,
    /// Display Update Control 1
    UpdateControl1 = 0x21,
    /// Display Update Control 2 (update sequence option)
    UpdateControl2 = 0x22,
    /// Write RAM (black/white, the new frame)
    WriteBw = 0x24,
    /// Write RAM (red, used as the previous frame for partial updates)
    WriteRed = 0x26,
    /// Border Waveform Control
    Border = 0x3C,
    /// RAM X address start/end (in bytes)
    RamXRange = 0x44,
    /// RAM Y address start/end (in gate lines)
    RamYRange = 0x45,
    /// RAM X address counter
    RamXCounter = 0x4E,
    /// RAM Y address counter
    RamYCounter = 0x4F,
}

impl Command {
    /// Get the command address byte
    #[inline]
    pub fn addr(self) -> u8 {
        self as u8
    }
}

/// Update sequence: clock, analog, temperature, full waveform, power off
pub const SEQUENCE_FULL: u8 = 0xF7;
/// Update sequence for a partial (differential) waveform
pub const SEQUENCE_PARTIAL: u8 = 0xFC;
/// Border setting while doing partial updates (follow LUT, no flashing)
pub const BORDER_PARTIAL: u8 = 0x80;
/// Border setting for full updates
pub const BORDER_FULL: u8 = 0x05;
