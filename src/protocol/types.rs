use log::warn;

use super::encoding::{CodeTable, OneByteEncodable};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0x30 { Power::On } else { Power::Off }
    }
}

impl OneByteEncodable for Power {
    fn encoded_as_byte(&self) -> u8 {
        match self {
            Power::On => 0x30,
            Power::Off => 0x31,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    Off,
    HeatCool,
    Cool,
    Heat,
    Dry,
    FanOnly,
}

impl CodeTable for Mode {
    const CODES: &'static [(Self, u8)] = &[
        (Mode::HeatCool, 0x41),
        (Mode::Cool, 0x42),
        (Mode::Heat, 0x43),
        (Mode::Dry, 0x44),
        (Mode::FanOnly, 0x45),
    ];
    const FALLBACK: Self = Mode::Off;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FanSpeed {
    Auto,
    Level1,
    Level2,
    Level3,
    Level4,
    Level5,
    Unknown,
}

impl CodeTable for FanSpeed {
    const CODES: &'static [(Self, u8)] = &[
        (FanSpeed::Auto, 0x41),
        (FanSpeed::Level1, 0x31),
        (FanSpeed::Level2, 0x32),
        (FanSpeed::Level3, 0x33),
        (FanSpeed::Level4, 0x34),
        (FanSpeed::Level5, 0x35),
    ];
    const FALLBACK: Self = FanSpeed::Unknown;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Preset {
    Normal,
    Powerful,
    Quiet,
    Unknown,
}

impl CodeTable for Preset {
    const CODES: &'static [(Self, u8)] = &[
        (Preset::Normal, 0x41),
        (Preset::Powerful, 0x42),
        (Preset::Quiet, 0x43),
    ];
    const FALLBACK: Self = Preset::Unknown;
}

/// Vertical vane position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VerticalSwing {
    Swing,
    Auto,
    Up,
    MidUp,
    Mid,
    MidDown,
    Down,
    Unknown,
}

impl CodeTable for VerticalSwing {
    const CODES: &'static [(Self, u8)] = &[
        (VerticalSwing::Swing, 0x41),
        (VerticalSwing::Auto, 0x42),
        (VerticalSwing::Up, 0x43),
        (VerticalSwing::MidUp, 0x44),
        (VerticalSwing::Mid, 0x45),
        (VerticalSwing::MidDown, 0x46),
        (VerticalSwing::Down, 0x47),
    ];
    const FALLBACK: Self = VerticalSwing::Unknown;
}

/// Horizontal vane position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HorizontalSwing {
    Auto,
    Left,
    CentreLeft,
    Centre,
    CentreRight,
    Right,
    Unknown,
}

impl CodeTable for HorizontalSwing {
    const CODES: &'static [(Self, u8)] = &[
        (HorizontalSwing::Auto, 0x41),
        (HorizontalSwing::Left, 0x42),
        (HorizontalSwing::CentreLeft, 0x43),
        (HorizontalSwing::Centre, 0x44),
        (HorizontalSwing::CentreRight, 0x45),
        (HorizontalSwing::Right, 0x46),
    ];
    const FALLBACK: Self = HorizontalSwing::Unknown;
}

/// Which vanes are sweeping, as a climate entity shows it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwingMode {
    Off,
    Both,
    Vertical,
    Horizontal,
}

impl CodeTable for SwingMode {
    const CODES: &'static [(Self, u8)] = &[
        (SwingMode::Both, 0x41),
        (SwingMode::Off, 0x42),
        (SwingMode::Vertical, 0x43),
        (SwingMode::Horizontal, 0x44),
    ];
    const FALLBACK: Self = SwingMode::Off;
}

code_table_encodable!(Mode, FanSpeed, Preset, VerticalSwing, HorizontalSwing, SwingMode);

const NANOEX_ON: u8 = 0x41;
const NANOEX_OFF: u8 = 0x42;

pub fn encode_nanoex(on: bool) -> u8 {
    if on { NANOEX_ON } else { NANOEX_OFF }
}

/// Target temperature, in half degrees Celsius as the unit sends it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct HalfDegreesC(pub u8);

impl HalfDegreesC {
    /// Rounds to the nearest half degree. Out of range values saturate.
    pub fn from_celsius(celsius: f32) -> Self {
        let halves = celsius * 2.0 + 0.5;
        if halves <= 0.0 {
            HalfDegreesC(0)
        } else if halves >= 255.0 {
            HalfDegreesC(255)
        } else {
            HalfDegreesC(halves as u8)
        }
    }

    pub fn celsius(&self) -> f32 {
        f32::from(self.0) / 2.0
    }
}

impl OneByteEncodable for HalfDegreesC {
    fn encoded_as_byte(&self) -> u8 {
        self.0
    }
}

/// Room and outside temperatures: signed whole degrees, with two codes
/// reserved for "can't measure".
pub fn determine_temperature(byte: u8) -> Option<i8> {
    match byte {
        0x7e | 0x7f => None,
        _ => Some(byte as i8),
    }
}

pub fn determine_mode(mode: u8) -> Mode {
    decode_or_warn(mode, "mode")
}

pub fn determine_fan_speed(speed: u8) -> FanSpeed {
    decode_or_warn(speed, "fan speed")
}

pub fn determine_preset(preset: u8) -> Preset {
    decode_or_warn(preset, "preset")
}

pub fn determine_swing_vertical(swing: u8) -> VerticalSwing {
    decode_or_warn(swing, "vertical swing")
}

pub fn determine_swing_horizontal(swing: u8) -> HorizontalSwing {
    decode_or_warn(swing, "horizontal swing")
}

pub fn determine_swing(swing: u8) -> SwingMode {
    decode_or_warn(swing, "swing mode")
}

pub fn determine_nanoex(nanoex: u8) -> bool {
    match nanoex {
        NANOEX_ON => true,
        NANOEX_OFF => false,
        _ => {
            warn!("Received unknown nanoe-X state {:#04x}", nanoex);
            false
        }
    }
}

fn decode_or_warn<T: CodeTable>(code: u8, what: &str) -> T {
    let value = T::from_code(code);
    if value == T::FALLBACK && !T::CODES.iter().any(|(_, c)| *c == code) {
        warn!("Received unknown {} {:#04x}", what, code);
    }
    value
}
