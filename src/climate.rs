//! What the host sees: the unit's current attributes, and requests to change them.

use heapless::Vec;
use log::warn;

use crate::protocol::{
    determine_fan_speed, determine_mode, determine_nanoex, determine_preset,
    determine_swing, determine_swing_horizontal, determine_swing_vertical, determine_temperature,
    encode_nanoex, CodeTable, FanSpeed, HalfDegreesC, HorizontalSwing, Mode, OneByteEncodable,
    Power, Preset, Properties, PropertyId, SwingMode, VerticalSwing,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClimateAttributes {
    pub power: Power,
    /// Operating mode as last reported, regardless of power.
    pub mode: Mode,
    pub target_temperature: Option<HalfDegreesC>,
    pub fan_speed: FanSpeed,
    pub preset: Preset,
    pub swing_vertical: VerticalSwing,
    pub swing_horizontal: HorizontalSwing,
    /// Sweep setting as last reported, regardless of power.
    pub swing: SwingMode,
    pub nanoex: bool,
    pub current_temperature: Option<i8>,
    pub outside_temperature: Option<i8>,
}

impl Default for ClimateAttributes {
    fn default() -> Self {
        Self {
            power: Power::Off,
            mode: Mode::Off,
            target_temperature: None,
            fan_speed: FanSpeed::Unknown,
            preset: Preset::Unknown,
            swing_vertical: VerticalSwing::Unknown,
            swing_horizontal: HorizontalSwing::Unknown,
            swing: SwingMode::Off,
            nanoex: false,
            current_temperature: None,
            outside_temperature: None,
        }
    }
}

impl ClimateAttributes {
    /// The mode a climate entity should show: `Off` whenever the unit is off.
    pub fn climate_mode(&self) -> Mode {
        match self.power {
            Power::On => self.mode,
            Power::Off => Mode::Off,
        }
    }

    /// The swing mode a climate entity should show: `Off` whenever the unit
    /// is off.
    pub fn swing_mode(&self) -> SwingMode {
        match self.power {
            Power::On => self.swing,
            Power::Off => SwingMode::Off,
        }
    }

    /// A new snapshot with every recognised property in `properties` applied.
    /// Anything not mentioned keeps its current value.
    pub fn merged(&self, properties: &Properties<'_>) -> Self {
        let mut next = *self;
        for property in properties.iter() {
            let byte = match property.byte() {
                Some(byte) => byte,
                None => continue,
            };
            match property.id {
                PropertyId::POWER => next.power = Power::from_byte(byte),
                PropertyId::MODE => next.mode = determine_mode(byte),
                PropertyId::TARGET_TEMPERATURE => {
                    next.target_temperature = Some(HalfDegreesC(byte))
                }
                PropertyId::FAN_SPEED => next.fan_speed = determine_fan_speed(byte),
                PropertyId::PRESET => next.preset = determine_preset(byte),
                PropertyId::SWING_VERTICAL => next.swing_vertical = determine_swing_vertical(byte),
                PropertyId::SWING_HORIZONTAL => {
                    next.swing_horizontal = determine_swing_horizontal(byte)
                }
                PropertyId::SWING_MODE => next.swing = determine_swing(byte),
                PropertyId::NANOEX => next.nanoex = determine_nanoex(byte),
                PropertyId::ROOM_TEMPERATURE => {
                    next.current_temperature = determine_temperature(byte)
                }
                PropertyId::OUTSIDE_TEMPERATURE => {
                    next.outside_temperature = determine_temperature(byte)
                }
                _ => {}
            }
        }
        next
    }
}

/// Most key/value writes one request can produce.
pub const MAX_CALL_WRITES: usize = 9;

/// A request to change some attributes. Fields left `None` are untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ClimateCall {
    pub mode: Option<Mode>,
    /// Degrees Celsius, rounded to the nearest half degree.
    pub target_temperature: Option<f32>,
    pub fan_speed: Option<FanSpeed>,
    pub preset: Option<Preset>,
    pub swing_vertical: Option<VerticalSwing>,
    pub swing_horizontal: Option<HorizontalSwing>,
    pub swing_mode: Option<SwingMode>,
    pub nanoex: Option<bool>,
}

impl ClimateCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn target_temperature(mut self, celsius: f32) -> Self {
        self.target_temperature = Some(celsius);
        self
    }

    pub fn fan_speed(mut self, speed: FanSpeed) -> Self {
        self.fan_speed = Some(speed);
        self
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn swing_vertical(mut self, swing: VerticalSwing) -> Self {
        self.swing_vertical = Some(swing);
        self
    }

    pub fn swing_horizontal(mut self, swing: HorizontalSwing) -> Self {
        self.swing_horizontal = Some(swing);
        self
    }

    pub fn swing_mode(mut self, mode: SwingMode) -> Self {
        self.swing_mode = Some(mode);
        self
    }

    pub fn nanoex(mut self, on: bool) -> Self {
        self.nanoex = Some(on);
        self
    }

    /// The `(key, value)` writes this request turns into.
    ///
    /// Switching to `Off` only powers the unit down. Any other mode is
    /// written first and then the unit is powered on. Values the unit has
    /// no code for are skipped.
    pub fn writes(&self) -> Vec<(u8, u8), MAX_CALL_WRITES> {
        let mut writes = Vec::new();
        let mut push = |id: PropertyId, value: u8| {
            let pushed = writes.push((id.key, value));
            debug_assert!(pushed.is_ok(), "MAX_CALL_WRITES too small");
        };

        match self.mode {
            Some(Mode::Off) => push(PropertyId::POWER, Power::Off.encoded_as_byte()),
            Some(mode) => {
                push(PropertyId::MODE, mode.encoded_as_byte());
                push(PropertyId::POWER, Power::On.encoded_as_byte());
            }
            None => {}
        }
        if let Some(celsius) = self.target_temperature {
            push(
                PropertyId::TARGET_TEMPERATURE,
                HalfDegreesC::from_celsius(celsius).encoded_as_byte(),
            );
        }
        if let Some(code) = coded(self.fan_speed, "fan speed") {
            push(PropertyId::FAN_SPEED, code);
        }
        if let Some(code) = coded(self.preset, "preset") {
            push(PropertyId::PRESET, code);
        }
        if let Some(code) = coded(self.swing_vertical, "vertical swing") {
            push(PropertyId::SWING_VERTICAL, code);
        }
        if let Some(code) = coded(self.swing_horizontal, "horizontal swing") {
            push(PropertyId::SWING_HORIZONTAL, code);
        }
        if let Some(code) = coded(self.swing_mode, "swing mode") {
            push(PropertyId::SWING_MODE, code);
        }
        if let Some(on) = self.nanoex {
            push(PropertyId::NANOEX, encode_nanoex(on));
        }
        writes
    }
}

fn coded<T: CodeTable + core::fmt::Debug>(value: Option<T>, what: &str) -> Option<u8> {
    let value = value?;
    let code = value.code();
    if code.is_none() {
        warn!("Ignoring request for {} {:?}, the unit has no code for it", what, value);
    }
    code
}
