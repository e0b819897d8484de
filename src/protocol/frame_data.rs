use log::warn;
use nom::bytes::complete::take;
use nom::multi::length_data;
use nom::number::complete::be_u8;
use nom::sequence::pair;
use nom::IResult;

use super::catalog::CommandId;
use super::encoding::page_of;
use super::frame::Frame;
use crate::error::FrameError;

/// A property code: page byte and key byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PropertyId {
    pub page: u8,
    pub key: u8,
}

impl PropertyId {
    pub const fn new(key: u8) -> Self {
        Self { page: page_of(key), key }
    }

    pub const POWER: PropertyId = PropertyId::new(0x80);
    pub const MODE: PropertyId = PropertyId::new(0xB0);
    pub const TARGET_TEMPERATURE: PropertyId = PropertyId::new(0x31);
    pub const FAN_SPEED: PropertyId = PropertyId::new(0xA0);
    pub const PRESET: PropertyId = PropertyId::new(0xB2);
    pub const SWING_VERTICAL: PropertyId = PropertyId::new(0xA4);
    pub const SWING_HORIZONTAL: PropertyId = PropertyId::new(0xA5);
    /// Combined sweep setting, see [`SwingMode`](super::SwingMode).
    pub const SWING_MODE: PropertyId = PropertyId::new(0xA1);
    pub const NANOEX: PropertyId = PropertyId::new(0x33);
    pub const ROOM_TEMPERATURE: PropertyId = PropertyId::new(0xBB);
    pub const OUTSIDE_TEMPERATURE: PropertyId = PropertyId::new(0xBE);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Property<'a> {
    pub id: PropertyId,
    pub value: &'a [u8],
}

impl<'a> Property<'a> {
    /// First value byte, which is all the properties we use carry.
    pub fn byte(&self) -> Option<u8> {
        self.value.first().copied()
    }
}

/// Property list carried by poll responses and reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Properties<'a> {
    count: u8,
    entries: &'a [u8],
}

/// Object header ahead of the property count.
const OBJECT_HEADER_LEN: usize = 4;

impl<'a> Properties<'a> {
    /// Check the whole list up front so that iterating can't fail halfway.
    pub fn parse(data: &'a [u8]) -> Result<Self, FrameError> {
        let (entries, count) = match header(data) {
            Ok(parsed) => parsed,
            Err(_) => return Err(FrameError::Corrupt),
        };
        let properties = Self { count, entries };
        if properties.iter().count() != usize::from(count) {
            return Err(FrameError::Corrupt);
        }
        Ok(properties)
    }

    pub fn len(&self) -> usize {
        usize::from(self.count)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> PropertyIter<'a> {
        PropertyIter { input: self.entries, remaining: self.count }
    }
}

pub struct PropertyIter<'a> {
    input: &'a [u8],
    remaining: u8,
}

impl<'a> Iterator for PropertyIter<'a> {
    type Item = Property<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (rest, property) = property(self.input).ok()?;
        self.input = rest;
        self.remaining -= 1;
        Some(property)
    }
}

fn header(input: &[u8]) -> IResult<&[u8], u8> {
    let (input, _) = take(OBJECT_HEADER_LEN)(input)?;
    be_u8(input)
}

fn property(input: &[u8]) -> IResult<&[u8], Property<'_>> {
    let (input, (page, key)) = pair(be_u8, be_u8)(input)?;
    let (input, value) = length_data(be_u8)(input)?;
    Ok((input, Property { id: PropertyId { page, key }, value }))
}

/// What a received frame means to us.
#[derive(Debug, Eq, PartialEq)]
pub enum FrameData<'a> {
    Ping,
    PollResponse(Properties<'a>),
    Report(Properties<'a>),
    SetResponse,
    /// Anything else, typically a handshake response.
    Other(CommandId),
}

impl<'a> FrameData<'a> {
    pub fn parse(frame: &Frame<'a>) -> Result<Self, FrameError> {
        let command = frame.command();
        let data = match command {
            CommandId::PING => FrameData::Ping,
            c if c == CommandId::POLL.response() => {
                FrameData::PollResponse(Properties::parse(frame.data())?)
            }
            CommandId::REPORT => FrameData::Report(Properties::parse(frame.data())?),
            c if c == CommandId::SET.response() => FrameData::SetResponse,
            other => FrameData::Other(other),
        };
        Ok(data)
    }
}

/// Parse, logging and dropping malformed messages.
pub fn parse_or_warn<'a>(frame: &Frame<'a>) -> Option<FrameData<'a>> {
    match FrameData::parse(frame) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("Dropping malformed {} message: {}", frame.command(), e);
            None
        }
    }
}
