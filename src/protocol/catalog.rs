use core::fmt;

// Every payload below is a message: command id (2 bytes), data length
// (2 bytes, big endian), then the data.

const HANDSHAKE_1: &[u8] = &[0x00, 0x06, 0x00, 0x00];
const HANDSHAKE_2: &[u8] = &[0x00, 0x09, 0x00, 0x00];
const HANDSHAKE_3: &[u8] = &[0x00, 0x0C, 0x00, 0x00];
const HANDSHAKE_4: &[u8] = &[0x00, 0x10, 0x00, 0x01, 0x20];
const HANDSHAKE_5: &[u8] = &[0x00, 0x11, 0x00, 0x02, 0x00, 0x01];
const HANDSHAKE_6: &[u8] = &[0x00, 0x12, 0x00, 0x04, 0x01, 0x10, 0x11, 0x12];
const HANDSHAKE_7: &[u8] = &[0x00, 0x41, 0x00, 0x00];
const HANDSHAKE_8: &[u8] = &[0x01, 0x4C, 0x00, 0x00];
const HANDSHAKE_9: &[u8] = &[0x10, 0x00, 0x00, 0x00];
const HANDSHAKE_10: &[u8] = &[0x10, 0x01, 0x00, 0x05, 0x01, 0x30, 0x01, 0x00, 0x01];
const HANDSHAKE_11: &[u8] = &[0x00, 0x18, 0x00, 0x00];
const HANDSHAKE_12: &[u8] = &[0x01, 0x00, 0x00, 0x01, 0x10];
const HANDSHAKE_13: &[u8] = &[
    0x10, 0x08, 0x00, 0x09, 0x01, 0x01, 0x30, 0x01, 0x01, 0x02, 0x42, 0x01, 0x42,
];
const HANDSHAKE_14: &[u8] = &[
    0x01, 0x89, 0x00, 0x07, 0x00, 0xB8, 0xB7, 0xF1, 0x9B, 0x4F, 0xA6,
];
const HANDSHAKE_15: &[u8] = &[
    0x00, 0xA0, 0x00, 0x13, 0x00, 0x08, 0x30, 0x32, 0x2E, 0x30, 0x33, 0x2E,
    0x30, 0x30, 0x08, 0x30, 0x31, 0x30, 0x31, 0x30, 0x31, 0x30, 0x33,
];
const HANDSHAKE_16: &[u8] = &[0x01, 0x00, 0x00, 0x01, 0x11];

pub(crate) static HANDSHAKE: [&[u8]; HANDSHAKE_STEPS] = [
    HANDSHAKE_1, HANDSHAKE_2, HANDSHAKE_3, HANDSHAKE_4,
    HANDSHAKE_5, HANDSHAKE_6, HANDSHAKE_7, HANDSHAKE_8,
    HANDSHAKE_9, HANDSHAKE_10, HANDSHAKE_11, HANDSHAKE_12,
    HANDSHAKE_13, HANDSHAKE_14, HANDSHAKE_15, HANDSHAKE_16,
];

pub const HANDSHAKE_STEPS: usize = 16;

/// Steps preceded by a settling pause. The unit needs a moment after the
/// link-layer part of the handshake before it accepts appliance commands.
pub(crate) const HANDSHAKE_DELAY_BEFORE: &[usize] = &[8];

const PING_REPLY: &[u8] = &[0x01, 0x81, 0x00, 0x03, 0x00, 0x11, 0x12];

const POLL: &[u8] = &[
    0x10, 0x09, 0x00, 0x38, 0x01, 0x01, 0x30, 0x01, 0x11, 0x00, 0x80, 0x00,
    0x00, 0xB0, 0x00, 0x02, 0x31, 0x00, 0x00, 0xA0, 0x00, 0x00, 0xA1, 0x00,
    0x00, 0xA5, 0x00, 0x00, 0xA4, 0x00, 0x00, 0xB2, 0x00, 0x02, 0x35, 0x00,
    0x02, 0x33, 0x00, 0x02, 0x34, 0x00, 0x02, 0x32, 0x00, 0x00, 0xBB, 0x00,
    0x00, 0xBE, 0x00, 0x02, 0x20, 0x00, 0x02, 0x21, 0x00, 0x00, 0x86, 0x00,
];

const REPORT_ACK: &[u8] = &[0x10, 0x8A, 0x00, 0x04, 0x00, 0x01, 0x30, 0x01];

/// The two leading bytes of every message.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CommandId(pub u16);

impl CommandId {
    /// Unit -> us: keep-alive.
    pub const PING: CommandId = CommandId(0x0180);
    /// Us -> unit: apply queued property writes.
    pub const SET: CommandId = CommandId(0x1008);
    /// Us -> unit: read the full property set.
    pub const POLL: CommandId = CommandId(0x1009);
    /// Unit -> us: unsolicited property change.
    pub const REPORT: CommandId = CommandId(0x100A);

    /// The id the unit (or we) answer this command with.
    ///
    /// Appliance-layer commands (`0x10xx`) set the high bit of the low byte,
    /// link-layer commands answer with the following id.
    pub fn response(self) -> CommandId {
        if self.0 & 0xff00 == 0x1000 {
            CommandId(self.0 | 0x0080)
        } else {
            CommandId(self.0.wrapping_add(1))
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Named entries of the fixed command catalog.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Handshake step, zero based.
    Handshake(usize),
    PingReply,
    Poll,
    ReportAck,
}

impl Command {
    /// The catalog bytes. Handshake indexes past the last step yield `None`.
    pub fn payload(self) -> Option<&'static [u8]> {
        match self {
            Command::Handshake(step) => HANDSHAKE.get(step).copied(),
            Command::PingReply => Some(PING_REPLY),
            Command::Poll => Some(POLL),
            Command::ReportAck => Some(REPORT_ACK),
        }
    }

    /// Replies to something the unit initiated. These aren't awaited or resent.
    pub fn is_reply(self) -> bool {
        matches!(self, Command::PingReply | Command::ReportAck)
    }
}

/// Command id of a message, if it is long enough to have one.
pub fn command_id(payload: &[u8]) -> Option<CommandId> {
    match payload {
        [hi, lo, ..] => Some(CommandId(u16::from_be_bytes([*hi, *lo]))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_declares_its_own_length() {
        let others = [PING_REPLY, POLL, REPORT_ACK];
        for payload in HANDSHAKE.iter().chain(others.iter()) {
            let declared = u16::from_be_bytes([payload[2], payload[3]]) as usize;
            assert_eq!(declared, payload.len() - 4, "{:02x?}", payload);
        }
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(HANDSHAKE.iter().map(|p| p.len()).min(), Some(4));
        assert_eq!(HANDSHAKE.iter().map(|p| p.len()).max(), Some(23));
        assert_eq!(PING_REPLY.len(), 7);
        assert_eq!(POLL.len(), 60);
        assert_eq!(REPORT_ACK.len(), 8);
    }

    #[test]
    fn response_ids() {
        assert_eq!(CommandId::POLL.response(), CommandId(0x1089));
        assert_eq!(CommandId::SET.response(), CommandId(0x1088));
        assert_eq!(CommandId::REPORT.response(), command_id(REPORT_ACK).unwrap());
        assert_eq!(CommandId::PING.response(), command_id(PING_REPLY).unwrap());
        assert_eq!(CommandId(0x0006).response(), CommandId(0x0007));
    }

    #[test]
    fn handshake_lookup_is_bounded() {
        assert_eq!(Command::Handshake(0).payload(), Some(HANDSHAKE_1));
        assert_eq!(Command::Handshake(15).payload(), Some(HANDSHAKE_16));
        assert_eq!(Command::Handshake(16).payload(), None);
    }

    #[test]
    fn display_is_hex() {
        use core::fmt::Write;
        let mut s: heapless::String<8> = heapless::String::new();
        write!(s, "{}", CommandId::REPORT).unwrap();
        assert_eq!(s.as_str(), "0x100a");
    }
}
