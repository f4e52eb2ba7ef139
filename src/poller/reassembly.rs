//! Receive buffer and positional multi-part reassembly (spec §3 "Receive
//! Buffer", §4.2 "Reassembly").
//!
//! `START` inserts at offset 0; `MIDDLE`/`END` insert at the offset given
//! by the *previous* response's `next_data_transfer_handle` (tracked by the
//! caller and passed in here as `offset`). This is a positional insert, not
//! an append — a terminus that returns a non-monotonic handle is a protocol
//! error (spec §9 Open Question, decided in DESIGN.md): `insert` rejects
//! any offset that does not equal the buffer's current length.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::{PldmError, PldmResult};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// `{ event_class, total_size, data }` (spec §3), cleared on reset and on
/// each completed/aborted event.
#[derive(Debug, Default, Clone)]
pub struct ReceiveBuffer {
    pub event_class: u8,
    pub total_size: u32,
    pub data: Vec<u8>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        ReceiveBuffer::default()
    }

    pub fn clear(&mut self) {
        self.event_class = 0;
        self.total_size = 0;
        self.data.clear();
    }

    /// Inserts `part` at `offset`, starting a fresh buffer if `offset == 0`
    /// and the buffer is empty. `offset` must equal `self.data.len()` —
    /// anything else is a non-monotonic handle and an `InvalidData` error
    /// (spec §9).
    pub fn insert(&mut self, event_class: u8, offset: u32, part: &[u8]) -> PldmResult<()> {
        if offset as usize != self.data.len() {
            return Err(PldmError::invalid_data(format!(
                "non-monotonic data_transfer_handle: expected offset {}, got {offset}",
                self.data.len()
            )));
        }
        if self.data.is_empty() {
            self.event_class = event_class;
        }
        self.data.extend_from_slice(part);
        self.total_size = self.data.len() as u32;
        Ok(())
    }

    /// CRC-32 over the concatenated payload bytes, compared against the
    /// trailing checksum field of an `END`-terminated transfer (spec §3
    /// invariant; only enforced for multi-part transfers ending with
    /// `PLDM_END`, never for `START_AND_END`).
    pub fn checksum_matches(&self, expected: u32) -> bool {
        CRC32.checksum(&self.data) == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_end_concatenates_in_cursor_order() {
        let mut buf = ReceiveBuffer::new();
        buf.insert(5, 0, &[0xAA, 0xBB]).unwrap();
        buf.insert(5, 2, &[0xCC, 0xDD]).unwrap();
        assert_eq!(buf.data, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(buf.total_size, 4);
    }

    #[test]
    fn non_monotonic_offset_is_rejected() {
        let mut buf = ReceiveBuffer::new();
        buf.insert(5, 0, &[0xAA, 0xBB]).unwrap();
        assert!(matches!(
            buf.insert(5, 99, &[0xCC]),
            Err(PldmError::InvalidData(_))
        ));
    }

    #[test]
    fn checksum_matches_known_crc32() {
        let mut buf = ReceiveBuffer::new();
        buf.insert(5, 0, &[0xAA, 0xBB]).unwrap();
        buf.insert(5, 2, &[0xCC, 0xDD]).unwrap();
        let expected = CRC32.checksum(&[0xAA, 0xBB, 0xCC, 0xDD]);
        assert!(buf.checksum_matches(expected));
        assert!(!buf.checksum_matches(expected ^ 1));
    }
}
