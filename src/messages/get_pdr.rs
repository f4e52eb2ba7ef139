//! `GetPDR` request/response (spec §4.3, §8 scenario 7: "GetPDR with handle
//! 0xFFFF when no such record. Expected: completion code
//! InvalidRecordHandle, no payload beyond header"). Like
//! [`crate::messages::poll_event`], the response's layout is conditional —
//! here on the completion code rather than the transfer flag — so both
//! directions are hand-written instead of derived.

use crate::eid::PdrHandle;
use crate::error::PldmError;
use crate::messages::transfer::TransferFlag;
use crate::messages::CompletionCode;

/// `GetPDR` command code (DSP0248 Platform Monitoring and Control command
/// set).
pub const CMD_GET_PDR: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPdrRequest {
    pub record_handle: PdrHandle,
    pub data_transfer_handle: u32,
    pub transfer_operation_flag: u8,
    pub request_count: u16,
    pub record_change_number: u16,
}

impl GetPdrRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13);
        out.extend_from_slice(&self.record_handle.0.to_le_bytes());
        out.extend_from_slice(&self.data_transfer_handle.to_le_bytes());
        out.push(self.transfer_operation_flag);
        out.extend_from_slice(&self.request_count.to_le_bytes());
        out.extend_from_slice(&self.record_change_number.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PldmError> {
        if bytes.len() < 13 {
            return Err(PldmError::InvalidLength);
        }
        Ok(GetPdrRequest {
            record_handle: PdrHandle(u32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            data_transfer_handle: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            transfer_operation_flag: bytes[8],
            request_count: u16::from_le_bytes(bytes[9..11].try_into().unwrap()),
            record_change_number: u16::from_le_bytes(bytes[11..13].try_into().unwrap()),
        })
    }
}

/// On success carries the requested record's traversal pointer and bytes;
/// on failure (spec §7) nothing beyond `completion_code` is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPdrResponse {
    pub completion_code: u8,
    pub success: Option<GetPdrSuccess>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPdrSuccess {
    pub next_record_handle: PdrHandle,
    pub next_data_transfer_handle: u32,
    pub transfer_flag: TransferFlag,
    pub record_data: Vec<u8>,
}

impl GetPdrResponse {
    pub fn success(
        next_record_handle: PdrHandle,
        next_data_transfer_handle: u32,
        transfer_flag: TransferFlag,
        record_data: Vec<u8>,
    ) -> Self {
        GetPdrResponse {
            completion_code: CompletionCode::Success.as_u8(),
            success: Some(GetPdrSuccess {
                next_record_handle,
                next_data_transfer_handle,
                transfer_flag,
                record_data,
            }),
        }
    }

    pub fn failure(code: CompletionCode) -> Self {
        GetPdrResponse {
            completion_code: code.as_u8(),
            success: None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.completion_code];
        if let Some(s) = &self.success {
            out.extend_from_slice(&s.next_record_handle.0.to_le_bytes());
            out.extend_from_slice(&s.next_data_transfer_handle.to_le_bytes());
            out.push(s.transfer_flag as u8);
            out.extend_from_slice(&(s.record_data.len() as u32).to_le_bytes());
            out.extend_from_slice(&s.record_data);
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PldmError> {
        if bytes.is_empty() {
            return Err(PldmError::InvalidLength);
        }
        let completion_code = bytes[0];
        if completion_code != CompletionCode::Success.as_u8() {
            return Ok(GetPdrResponse {
                completion_code,
                success: None,
            });
        }
        let rest = &bytes[1..];
        if rest.len() < 13 {
            return Err(PldmError::InvalidLength);
        }
        let next_record_handle = PdrHandle(u32::from_le_bytes(rest[0..4].try_into().unwrap()));
        let next_data_transfer_handle = u32::from_le_bytes(rest[4..8].try_into().unwrap());
        let transfer_flag = match rest[8] {
            0x01 => TransferFlag::Start,
            0x02 => TransferFlag::Middle,
            0x04 => TransferFlag::End,
            0x05 => TransferFlag::StartAndEnd,
            other => {
                return Err(PldmError::decode_failed(format!(
                    "unknown transfer flag 0x{other:02x}"
                )))
            }
        };
        let data_size = u32::from_le_bytes(rest[9..13].try_into().unwrap()) as usize;
        let data_start = 13;
        let data_end = data_start.checked_add(data_size).ok_or(PldmError::InvalidLength)?;
        if rest.len() < data_end {
            return Err(PldmError::InvalidLength);
        }
        Ok(GetPdrResponse {
            completion_code,
            success: Some(GetPdrSuccess {
                next_record_handle,
                next_data_transfer_handle,
                transfer_flag,
                record_data: rest[data_start..data_end].to_vec(),
            }),
        })
    }
}
