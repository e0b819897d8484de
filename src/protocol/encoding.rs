use heapless::Vec;

use crate::error::EncodingError;

/// Values that go on the wire as a single property byte.
pub trait OneByteEncodable {
    fn encoded_as_byte(&self) -> u8;
}

/// Types whose byte codes are given by a `(variant, code)` table. Decoding is
/// total: codes missing from the table map to the fallback.
pub trait CodeTable: Copy + PartialEq + Sized + 'static {
    const CODES: &'static [(Self, u8)];
    const FALLBACK: Self;

    fn from_code(code: u8) -> Self {
        Self::CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(v, _)| *v)
            .unwrap_or(Self::FALLBACK)
    }

    /// `None` for variants that only exist on the decoding side.
    fn code(&self) -> Option<u8> {
        Self::CODES.iter().find(|(v, _)| v == self).map(|(_, c)| *c)
    }
}

#[macro_export]
macro_rules! code_table_encodable {
    ( $( $enum:ty ),* ) => {
        $(
            impl $crate::protocol::encoding::OneByteEncodable for $enum {
                fn encoded_as_byte(&self) -> u8 {
                    <$enum as $crate::protocol::encoding::CodeTable>::code(self).unwrap_or(0)
                }
            }
        )*
    }
}

/// Page byte for a property key. Standard properties start at 0x80, vendor
/// properties live below that in their own page.
pub const fn page_of(key: u8) -> u8 {
    if key >= 0x80 { 0x00 } else { 0x02 }
}

pub const SET_HEADER: [u8; 4] = [0x01, 0x01, 0x30, 0x01];

/// Bytes per property write: page, key, value length, value.
const SET_ENTRY_LEN: usize = 4;

/// Build a set command payload carrying `entries` as `(key, value)` writes.
pub fn encode_set_command<const N: usize>(
    entries: impl ExactSizeIterator<Item = (u8, u8)>,
) -> Result<Vec<u8, N>, EncodingError> {
    let count = entries.len();
    let data_len = SET_HEADER.len() + 1 + SET_ENTRY_LEN * count;
    let count = u8::try_from(count).map_err(|_| EncodingError)?;
    let data_len = u16::try_from(data_len).map_err(|_| EncodingError)?;

    let mut out = Vec::new();
    out.extend_from_slice(&[0x10, 0x08]).map_err(|_| EncodingError)?;
    out.extend_from_slice(&data_len.to_be_bytes()).map_err(|_| EncodingError)?;
    out.extend_from_slice(&SET_HEADER).map_err(|_| EncodingError)?;
    out.push(count).map_err(|_| EncodingError)?;
    for (key, value) in entries {
        out.extend_from_slice(&[page_of(key), key, 0x01, value])
            .map_err(|_| EncodingError)?;
    }
    Ok(out)
}
