//! Transfer flags and operation flags for multi-part event transfer (spec
//! §3 "Request State", §4.2 state machine transitions).

use speedy::{Readable, Writable};

/// Delimits a multi-part payload (spec §3, Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Readable, Writable)]
#[speedy(tag_type = u8)]
pub enum TransferFlag {
    Start = 0x01,
    Middle = 0x02,
    End = 0x04,
    StartAndEnd = 0x05,
}

impl TransferFlag {
    /// True for `START` or `MIDDLE`: more parts follow.
    pub fn continues(self) -> bool {
        matches!(self, TransferFlag::Start | TransferFlag::Middle)
    }

    /// True for `END` or `START_AND_END`: this part completes the event.
    pub fn completes(self) -> bool {
        matches!(self, TransferFlag::End | TransferFlag::StartAndEnd)
    }

    /// CRC is only checked for a multi-part transfer ending in `END`; a
    /// single-part `START_AND_END` transfer carries no trailing checksum
    /// (spec §3 invariant).
    pub fn requires_checksum(self) -> bool {
        matches!(self, TransferFlag::End)
    }
}

/// The operation requested in the next `pollForPlatformEventMessage`
/// (spec §3 "Request State").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Readable, Writable)]
#[speedy(tag_type = u8)]
pub enum TransferOpFlag {
    GetFirstPart = 0x01,
    GetNextPart = 0x02,
    AcknowledgementOnly = 0x03,
}
