use heapless::Vec;
use log::warn;

use crate::config::elapsed;
use crate::error::{EncodingError, ProtocolError};
use crate::protocol::catalog::command_id;
use crate::protocol::{CommandId, Frame, Packet, MAX_PAYLOAD_LEN};

/// The one command we're waiting on an answer for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingCommand {
    payload: Vec<u8, MAX_PAYLOAD_LEN>,
    counter: u8,
    expects: CommandId,
    sent_at: u32,
}

impl PendingCommand {
    pub fn command(&self) -> Option<CommandId> {
        command_id(&self.payload)
    }

    pub fn expects(&self) -> CommandId {
        self.expects
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    fn packet(&self) -> Result<Packet, EncodingError> {
        Frame::encode(&self.payload, self.counter)
    }
}

/// Keeps at most one command outstanding and resends it until answered.
#[derive(Debug)]
pub struct Supervisor {
    pending: Option<PendingCommand>,
    response_timeout: u32,
}

impl Supervisor {
    pub fn new(response_timeout: u32) -> Self {
        Self { pending: None, response_timeout }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// Encode `payload` and remember it as the outstanding command.
    pub fn track(&mut self, payload: &[u8], counter: u8, now: u32) -> Result<Packet, EncodingError> {
        let expects = command_id(payload).ok_or(EncodingError)?.response();
        let pending = PendingCommand {
            payload: Vec::from_slice(payload).map_err(|_| EncodingError)?,
            counter,
            expects,
            sent_at: now,
        };
        let packet = pending.packet()?;
        self.pending = Some(pending);
        Ok(packet)
    }

    /// The frame to send again if the outstanding command has timed out.
    pub fn resend_due(&mut self, now: u32) -> Option<Packet> {
        let timeout = self.response_timeout;
        let pending = self.pending.as_mut()?;
        if elapsed(now, pending.sent_at) < timeout {
            return None;
        }
        warn!(
            "No response to {:?} within {}ms, resending",
            pending.command(),
            timeout
        );
        pending.sent_at = now;
        pending.packet().ok()
    }

    /// Match a received response against the outstanding command.
    ///
    /// `Ok(Some(id))` clears the command `id`. `Ok(None)` means nothing was
    /// outstanding. A mismatch leaves the command outstanding.
    pub fn answer(&mut self, received: CommandId) -> Result<Option<CommandId>, ProtocolError> {
        let expected = match &self.pending {
            Some(pending) => pending.expects,
            None => return Ok(None),
        };
        if received != expected {
            return Err(ProtocolError::UnexpectedResponse { expected, received });
        }
        Ok(self.pending.take().and_then(|p| p.command()))
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
