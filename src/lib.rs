#![no_std]

//! panasonic_ac
//!
//! Reverse-engineered protocol driver for Panasonic air conditioners that
//! expose a WLAN adapter port (the connector normally used by the vendor's
//! wireless module).
//!
//! It is intended for use on embedded hardware, and as such is `no_std` and
//! never allocates.
//!
//! The library does not own a clock. Every entry point takes `now`, a
//! millisecond timestamp that may wrap. Serial line settings are left to
//! whoever sets up the peripheral.
//!
//! ## General Usage
//!
//! Drive a [`Session`] yourself, feeding it bytes and writing out what it
//! hands back:
//!
//! ```
//! use panasonic_ac::{Config, Effect, Session};
//!
//! let mut session = Session::new(Config::default(), 0);
//! let mut written = 0;
//!
//! // The unit is left alone for `init_timeout` after boot, then the
//! // handshake starts.
//! session.tick(10_000, &[], |effect| match effect {
//!     Effect::Transmit(bytes) => written += bytes.len(),
//!     Effect::AttributesChanged(attributes) => {
//!         let _ = attributes.climate_mode();
//!     }
//!     Effect::Failed(e) => panic!("{}", e),
//! });
//!
//! assert_eq!(written, 7);
//! ```
//!
//! Or hand it an `embedded-hal` serial port with [`PanasonicDevice`] and call
//! [`PanasonicDevice::poll`] from your main loop.
//!
//! Changes are queued and sent together in the next set command once the
//! handshake is done:
//!
//! ```
//! use panasonic_ac::{ClimateCall, Config, FanSpeed, Mode, Session};
//!
//! let mut session = Session::new(Config::default(), 0);
//! session
//!     .control(&ClimateCall::new().mode(Mode::Heat).target_temperature(21.5).fan_speed(FanSpeed::Auto))
//!     .unwrap();
//!
//! // Mode, power, temperature and fan speed.
//! assert_eq!(session.queued().len(), 4);
//! ```
//!
//! Frames can also be built and taken apart directly:
//!
//! ```
//! use panasonic_ac::protocol::{CommandId, Frame, FrameData};
//!
//! let packet = Frame::encode(&[0x01, 0x80, 0x00, 0x00], 0x07).unwrap();
//! //                   marker counter  command    length   checksum
//! assert_eq!(&packet[..], &[0x5a, 0x07, 0x01, 0x80, 0x00, 0x00, 0x78]);
//!
//! let frame = Frame::decode(&packet).unwrap();
//! assert_eq!(frame.command(), CommandId::PING);
//! assert_eq!(FrameData::parse(&frame), Ok(FrameData::Ping));
//! ```

#[cfg(test)]
extern crate std;

pub mod climate;
pub mod config;
pub mod error;
pub mod interface;
pub mod protocol;
pub mod session;

pub use climate::{ClimateAttributes, ClimateCall};
pub use config::Config;
pub use error::{CommandQueueFull, EncodingError, FrameError, InitializationError, ProtocolError};
pub use interface::PanasonicDevice;
pub use protocol::{FanSpeed, HorizontalSwing, Mode, Power, Preset, SwingMode, VerticalSwing};
pub use session::{Effect, ProtocolState, Session};
