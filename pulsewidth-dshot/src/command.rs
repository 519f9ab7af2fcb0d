//! Reserved DShot command values (0-47)
//!
//! Most commands are only honored while the motors are stopped, and ESCs
//! usually expect them repeated for several consecutive frames.

/// DShot special command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Command {
    MotorStop = 0,
    Beacon1 = 1,
    Beacon2 = 2,
    Beacon3 = 3,
    Beacon4 = 4,
    Beacon5 = 5,
    /// Request ESC information (settings in V2)
    EscInfo = 6,
    SpinDirection1 = 7,
    SpinDirection2 = 8,
    ThreeDModeOff = 9,
    ThreeDModeOn = 10,
    SettingsRequest = 11,
    SaveSettings = 12,
    ExtendedTelemetryEnable = 13,
    ExtendedTelemetryDisable = 14,
    SpinDirectionNormal = 20,
    SpinDirectionReversed = 21,
    Led0On = 22,
    Led1On = 23,
    Led2On = 24,
    Led3On = 25,
    Led0Off = 26,
    Led1Off = 27,
    Led2Off = 28,
    Led3Off = 29,
    /// KISS audio stream mode toggle
    AudioStreamModeToggle = 30,
    /// KISS silent mode toggle
    SilentModeToggle = 31,
    SignalLineTelemetryDisable = 32,
    SignalLineTelemetryEnable = 33,
    SignalLineContinuousErpmTelemetry = 34,
    SignalLineContinuousErpmPeriodTelemetry = 35,
    SignalLineTemperatureTelemetry = 42,
    SignalLineVoltageTelemetry = 43,
    SignalLineCurrentTelemetry = 44,
    SignalLineConsumptionTelemetry = 45,
    SignalLineErpmTelemetry = 46,
    SignalLineErpmPeriodTelemetry = 47,
}

/// Highest reserved command value
pub const MAX_COMMAND: u16 = 47;

impl Command {
    /// Look up a raw command value
    ///
    /// Returns `None` above 47 and for the unassigned values 15-19 and 36-41.
    pub fn from_raw(raw: u16) -> Option<Self> {
        use Command::*;
        let command = match raw {
            0 => MotorStop,
            1 => Beacon1,
            2 => Beacon2,
            3 => Beacon3,
            4 => Beacon4,
            5 => Beacon5,
            6 => EscInfo,
            7 => SpinDirection1,
            8 => SpinDirection2,
            9 => ThreeDModeOff,
            10 => ThreeDModeOn,
            11 => SettingsRequest,
            12 => SaveSettings,
            13 => ExtendedTelemetryEnable,
            14 => ExtendedTelemetryDisable,
            20 => SpinDirectionNormal,
            21 => SpinDirectionReversed,
            22 => Led0On,
            23 => Led1On,
            24 => Led2On,
            25 => Led3On,
            26 => Led0Off,
            27 => Led1Off,
            28 => Led2Off,
            29 => Led3Off,
            30 => AudioStreamModeToggle,
            31 => SilentModeToggle,
            32 => SignalLineTelemetryDisable,
            33 => SignalLineTelemetryEnable,
            34 => SignalLineContinuousErpmTelemetry,
            35 => SignalLineContinuousErpmPeriodTelemetry,
            42 => SignalLineTemperatureTelemetry,
            43 => SignalLineVoltageTelemetry,
            44 => SignalLineCurrentTelemetry,
            45 => SignalLineConsumptionTelemetry,
            46 => SignalLineErpmTelemetry,
            47 => SignalLineErpmPeriodTelemetry,
            _ => return None,
        };
        Some(command)
    }

    /// Raw value placed in the packet's value field
    pub const fn raw(self) -> u16 {
        self as u16
    }
}
