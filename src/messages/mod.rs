//! PLDM wire types: headers and command-specific request/response bodies,
//! byte-exact per the PLDM specification (spec §6). Every type here is
//! serialized little-endian, regardless of host endianness, via explicit
//! `speedy::LittleEndian` contexts — PLDM (unlike RTPS/CDR) does not
//! negotiate endianness per message.

pub mod completion_code;
pub mod event_message;
pub mod get_pdr;
pub mod header;
pub mod poll_event;
pub mod repository_chg_event;
pub mod sensor_event;
pub mod transfer;

pub use completion_code::CompletionCode;
pub use header::{PldmHeader, PldmType};
pub use transfer::{TransferFlag, TransferOpFlag};

use speedy::{LittleEndian, Readable, Writable};

use crate::error::PldmError;

/// Encodes a wire type to its little-endian byte representation.
pub fn encode<T: Writable<LittleEndian>>(value: &T) -> Result<Vec<u8>, PldmError> {
    value
        .write_to_vec_with_ctx(LittleEndian {})
        .map_err(|e| PldmError::invalid_data(format!("encode failed: {e}")))
}

/// Decodes a wire type from a little-endian byte slice.
pub fn decode<'a, T: Readable<'a, LittleEndian>>(bytes: &'a [u8]) -> Result<T, PldmError> {
    T::read_from_buffer_with_ctx(LittleEndian {}, bytes)
        .map_err(|e| PldmError::decode_failed(format!("{e}")))
}

/// Local test helper mirroring the teacher's `serialization_test!` macro:
/// asserts that a value encodes to the given little-endian byte array and
/// that decoding those bytes reproduces the value.
#[cfg(test)]
macro_rules! wire_roundtrip_test {
    ($name:ident, $ty:ty, $value:expr, $bytes:expr) => {
        #[test]
        fn $name() {
            let value: $ty = $value;
            let bytes: &[u8] = &$bytes;
            let encoded = crate::messages::encode(&value).expect("encode");
            assert_eq!(encoded, bytes);
            let decoded: $ty = crate::messages::decode(bytes).expect("decode");
            assert_eq!(decoded, value);
        }
    };
}

#[cfg(test)]
pub(crate) use wire_roundtrip_test;
