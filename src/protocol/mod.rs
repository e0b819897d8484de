mod frame;
mod frame_data;

#[macro_use]
pub mod encoding;
pub mod catalog;
pub mod types;

pub use catalog::{Command, CommandId, HANDSHAKE_STEPS};
pub use encoding::{CodeTable, OneByteEncodable};
pub use frame::{resync, Frame, Packet, MARKER, MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
pub use frame_data::{FrameData, Properties, Property, PropertyId};
pub(crate) use frame_data::parse_or_warn;
pub use types::*;
