//! Drives a [`Session`] over an `embedded-hal` serial port.

use embedded_hal::serial;
use heapless::Vec;
use thiserror::Error;

use crate::climate::{ClimateAttributes, ClimateCall};
use crate::config::Config;
use crate::error::{CommandQueueFull, InitializationError};
use crate::session::{Effect, Session};

/// Bytes read from the port per call to [`PanasonicDevice::poll`].
const READ_CHUNK: usize = 64;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error<R, W> {
    #[error("serial read failed")]
    Read(R),
    #[error("serial write failed")]
    Write(W),
}

pub type DeviceError<S> =
    Error<<S as serial::Read<u8>>::Error, <S as serial::Write<u8>>::Error>;

pub struct PanasonicDevice<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    serial: S,
    session: Session,
}

impl<S> PanasonicDevice<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    pub fn new(serial: S, config: Config, now: u32) -> Self {
        PanasonicDevice { serial, session: Session::new(config, now) }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn control(&mut self, call: &ClimateCall) -> Result<(), CommandQueueFull> {
        self.session.control(call)
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn release(self) -> S {
        self.serial
    }

    /// Read what's waiting on the port, run the session and write whatever it
    /// wants sent. `on_change` sees every attribute update.
    ///
    /// Once the session has failed this does nothing and returns `Ok`; check
    /// [`Session::fault`].
    pub fn poll<F>(&mut self, now: u32, mut on_change: F) -> Result<(), DeviceError<S>>
    where
        F: FnMut(&ClimateAttributes),
    {
        let mut incoming: Vec<u8, READ_CHUNK> = Vec::new();
        while !incoming.is_full() {
            match self.serial.read() {
                Ok(byte) => {
                    let pushed = incoming.push(byte);
                    debug_assert!(pushed.is_ok(), "read past the chunk");
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(Error::Read(e)),
            }
        }

        let serial = &mut self.serial;
        let mut result = Ok(());
        self.session.tick(now, &incoming, |effect| match effect {
            Effect::Transmit(bytes) => {
                if result.is_ok() {
                    result = write_all(serial, bytes).map_err(Error::Write);
                }
            }
            Effect::AttributesChanged(attributes) => on_change(attributes),
            Effect::Failed(InitializationError::Timeout) => {}
        });
        result
    }
}

fn write_all<S: serial::Write<u8>>(serial: &mut S, bytes: &[u8]) -> Result<(), S::Error> {
    for byte in bytes {
        nb::block!(serial.write(*byte))?;
    }
    nb::block!(serial.flush())
}
