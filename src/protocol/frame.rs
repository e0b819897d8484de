use nom::bytes::streaming::{tag, take};
use nom::combinator::{peek, verify};
use nom::number::streaming::{be_u16, be_u8};
use nom::sequence::pair;
use nom::IResult;

use super::catalog::CommandId;
use crate::error::{EncodingError, FrameError};

pub const MARKER: u8 = 0x5A;

/// Command id and data length that open every payload.
pub const MESSAGE_HEADER_LEN: usize = 4;

/// Largest payload this family exchanges. The unit's poll responses are the
/// longest messages on the line.
pub const MAX_PAYLOAD_LEN: usize = 128;

/// Marker, counter, payload, checksum.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + 3;

/// An encoded frame, ready for the wire.
pub type Packet = heapless::Vec<u8, MAX_FRAME_LEN>;

/// A received frame. Borrows the bytes it was parsed from.
#[derive(Debug, Eq, PartialEq)]
pub struct Frame<'a> {
    pub counter: u8,
    pub payload: &'a [u8],
    checksum: u8,
}

impl<'a> Frame<'a> {
    /// Two's complement of the counter and payload bytes, so that the whole
    /// frame minus the marker sums to zero.
    fn checksum(counter: u8, payload: &[u8]) -> u8 {
        let sum = payload.iter().fold(counter, |acc, b| acc.wrapping_add(*b));
        sum.wrapping_neg()
    }

    fn validate_checksum(&self) -> bool {
        Self::checksum(self.counter, self.payload) == self.checksum
    }

    pub fn command(&self) -> CommandId {
        CommandId(u16::from_be_bytes([self.payload[0], self.payload[1]]))
    }

    /// The message data, after the command id and length.
    pub fn data(&self) -> &'a [u8] {
        &self.payload[MESSAGE_HEADER_LEN..]
    }

    /// Wrap `payload` for transmission with the given counter.
    pub fn encode(payload: &[u8], counter: u8) -> Result<Packet, EncodingError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodingError);
        }

        let mut packet = Packet::new();
        packet.push(MARKER).map_err(|_| EncodingError)?;
        packet.push(counter).map_err(|_| EncodingError)?;
        packet.extend_from_slice(payload).map_err(|_| EncodingError)?;
        packet
            .push(Self::checksum(counter, payload))
            .map_err(|_| EncodingError)?;
        Ok(packet)
    }

    /// Read one frame from the start of `data`.
    ///
    /// Returns the frame and the number of bytes it occupied. `Incomplete`
    /// means the declared length hasn't fully arrived yet.
    pub fn parse(data: &'a [u8]) -> Result<(Self, usize), FrameError> {
        match frame(data) {
            Ok((remaining, frame)) => {
                if frame.validate_checksum() {
                    Ok((frame, data.len() - remaining.len()))
                } else {
                    Err(FrameError::Corrupt)
                }
            }
            Err(nom::Err::Incomplete(_)) => Err(FrameError::Incomplete),
            Err(_) => Err(FrameError::Corrupt),
        }
    }

    /// Decode `data` as exactly one frame, skipping stray bytes before the
    /// marker. Anything short, long or badly checksummed is `Corrupt`.
    pub fn decode(data: &'a [u8]) -> Result<Self, FrameError> {
        let data = &data[resync(data)..];
        match Self::parse(data) {
            Ok((frame, used)) if used == data.len() => Ok(frame),
            _ => Err(FrameError::Corrupt),
        }
    }
}

/// Offset of the first marker byte, or `data.len()` if there is none.
pub fn resync(data: &[u8]) -> usize {
    data.iter().position(|b| *b == MARKER).unwrap_or(data.len())
}

fn frame(input: &[u8]) -> IResult<&[u8], Frame<'_>> {
    let (input, _) = tag(&[MARKER][..])(input)?;
    let (input, counter) = be_u8(input)?;
    let (_, (_, length)) = peek(pair(
        be_u16,
        verify(be_u16, |len: &u16| {
            usize::from(*len) <= MAX_PAYLOAD_LEN - MESSAGE_HEADER_LEN
        }),
    ))(input)?;
    let (input, payload) = take(MESSAGE_HEADER_LEN + usize::from(length))(input)?;
    let (input, checksum) = be_u8(input)?;

    Ok((input, Frame { counter, payload, checksum }))
}
