//! `PollForPlatformEventMessage` request/response (spec §4.2). The
//! response's layout is conditional on `transfer_flag` (the trailing
//! CRC-32 is only present for `END`), which `speedy`'s struct derive
//! cannot express, so both directions are hand-written here the same way
//! [`crate::messages::header`] hand-packs the PLDM header's bitfields.

use crate::eid::{EventId, Tid};
use crate::error::PldmError;
use crate::messages::transfer::{TransferFlag, TransferOpFlag};

/// `PollForPlatformEventMessage` command code (DSP0248 Platform Monitoring
/// and Control command set).
pub const CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE: u8 = 0x0B;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollForPlatformEventMessageRequest {
    pub format_version: u8,
    pub transfer_operation_flag: TransferOpFlag,
    pub data_transfer_handle: u32,
    pub event_id_to_ack: EventId,
}

impl PollForPlatformEventMessageRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        out.push(self.format_version);
        out.push(transfer_op_flag_to_u8(self.transfer_operation_flag));
        out.extend_from_slice(&self.data_transfer_handle.to_le_bytes());
        out.extend_from_slice(&self.event_id_to_ack.0.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PldmError> {
        if bytes.len() < 8 {
            return Err(PldmError::InvalidLength);
        }
        Ok(PollForPlatformEventMessageRequest {
            format_version: bytes[0],
            transfer_operation_flag: transfer_op_flag_from_u8(bytes[1])?,
            data_transfer_handle: u32::from_le_bytes(bytes[2..6].try_into().unwrap()),
            event_id_to_ack: EventId(u16::from_le_bytes(bytes[6..8].try_into().unwrap())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollForPlatformEventMessageResponse {
    pub tid: Tid,
    pub event_id: EventId,
    pub next_data_transfer_handle: u32,
    pub transfer_flag: TransferFlag,
    pub event_class: u8,
    pub event_data: Vec<u8>,
    /// Present only when `transfer_flag == End` (spec §3 invariant).
    pub checksum: Option<u32>,
}

impl PollForPlatformEventMessageResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.event_data.len() + 4);
        out.push(self.tid.0);
        out.extend_from_slice(&self.event_id.0.to_le_bytes());
        out.extend_from_slice(&self.next_data_transfer_handle.to_le_bytes());
        out.push(transfer_flag_to_u8(self.transfer_flag));
        out.push(self.event_class);
        out.extend_from_slice(&(self.event_data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.event_data);
        if let Some(crc) = self.checksum {
            out.extend_from_slice(&crc.to_le_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PldmError> {
        if bytes.len() < 11 {
            return Err(PldmError::InvalidLength);
        }
        let tid = Tid(bytes[0]);
        let event_id = EventId(u16::from_le_bytes(bytes[1..3].try_into().unwrap()));
        let next_data_transfer_handle = u32::from_le_bytes(bytes[3..7].try_into().unwrap());
        let transfer_flag = transfer_flag_from_u8(bytes[7])?;
        let event_class = bytes[8];
        let event_data_size = u32::from_le_bytes(bytes[9..13].try_into().unwrap()) as usize;
        let data_start = 13;
        let data_end = data_start
            .checked_add(event_data_size)
            .ok_or(PldmError::InvalidLength)?;
        if bytes.len() < data_end {
            return Err(PldmError::InvalidLength);
        }
        let event_data = bytes[data_start..data_end].to_vec();
        let checksum = if transfer_flag.requires_checksum() {
            if bytes.len() < data_end + 4 {
                return Err(PldmError::InvalidLength);
            }
            Some(u32::from_le_bytes(
                bytes[data_end..data_end + 4].try_into().unwrap(),
            ))
        } else {
            None
        };
        Ok(PollForPlatformEventMessageResponse {
            tid,
            event_id,
            next_data_transfer_handle,
            transfer_flag,
            event_class,
            event_data,
            checksum,
        })
    }
}

fn transfer_flag_to_u8(flag: TransferFlag) -> u8 {
    flag as u8
}

fn transfer_flag_from_u8(v: u8) -> Result<TransferFlag, PldmError> {
    match v {
        0x01 => Ok(TransferFlag::Start),
        0x02 => Ok(TransferFlag::Middle),
        0x04 => Ok(TransferFlag::End),
        0x05 => Ok(TransferFlag::StartAndEnd),
        other => Err(PldmError::decode_failed(format!(
            "unknown transfer flag 0x{other:02x}"
        ))),
    }
}

fn transfer_op_flag_to_u8(flag: TransferOpFlag) -> u8 {
    flag as u8
}

fn transfer_op_flag_from_u8(v: u8) -> Result<TransferOpFlag, PldmError> {
    match v {
        0x01 => Ok(TransferOpFlag::GetFirstPart),
        0x02 => Ok(TransferOpFlag::GetNextPart),
        0x03 => Ok(TransferOpFlag::AcknowledgementOnly),
        other => Err(PldmError::decode_failed(format!(
            "unknown transfer operation flag 0x{other:02x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let req = PollForPlatformEventMessageRequest {
            format_version: 1,
            transfer_operation_flag: TransferOpFlag::GetFirstPart,
            data_transfer_handle: 0,
            event_id_to_ack: EventId(0),
        };
        let bytes = req.encode();
        assert_eq!(PollForPlatformEventMessageRequest::decode(&bytes).unwrap(), req);
    }

    #[test]
    fn start_and_end_response_has_no_checksum() {
        let resp = PollForPlatformEventMessageResponse {
            tid: Tid(1),
            event_id: EventId(5),
            next_data_transfer_handle: 0,
            transfer_flag: TransferFlag::StartAndEnd,
            event_class: 5,
            event_data: vec![0x01, 0x02, 0x03],
            checksum: None,
        };
        let bytes = resp.encode();
        let decoded = PollForPlatformEventMessageResponse::decode(&bytes).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn end_response_carries_checksum() {
        let resp = PollForPlatformEventMessageResponse {
            tid: Tid(1),
            event_id: EventId(5),
            next_data_transfer_handle: 4,
            transfer_flag: TransferFlag::End,
            event_class: 5,
            event_data: vec![0xCC, 0xDD],
            checksum: Some(0xdeadbeef),
        };
        let bytes = resp.encode();
        let decoded = PollForPlatformEventMessageResponse::decode(&bytes).unwrap();
        assert_eq!(decoded.checksum, Some(0xdeadbeef));
        assert_eq!(decoded, resp);
    }

    #[test]
    fn truncated_response_is_rejected() {
        assert!(matches!(
            PollForPlatformEventMessageResponse::decode(&[0u8; 4]),
            Err(PldmError::InvalidLength)
        ));
    }
}
