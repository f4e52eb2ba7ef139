//! `PdrRepositoryChgEvent` class payload (spec §4.4 table).

use crate::error::PldmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDataFormat {
    FormatIsPdrHandles,
    /// Rejected as invalid per spec §4.4.
    FormatIsPdrTypes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOperation {
    RecordsAdded,
    RecordsModified,
    RecordsDeleted,
    RefreshEntireRepository,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub operation: ChangeOperation,
    /// PDR handles affected; empty for `RefreshEntireRepository`.
    pub change_entries: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdrRepositoryChgEventData {
    pub event_data_format: EventDataFormat,
    pub change_records: Vec<ChangeRecord>,
}

impl PdrRepositoryChgEventData {
    pub fn decode(bytes: &[u8]) -> Result<Self, PldmError> {
        if bytes.len() < 2 {
            return Err(PldmError::InvalidLength);
        }
        let event_data_format = match bytes[0] {
            0x00 => EventDataFormat::FormatIsPdrHandles,
            0x01 => EventDataFormat::FormatIsPdrTypes,
            other => {
                return Err(PldmError::decode_failed(format!(
                    "unknown PDR repository change event data format 0x{other:02x}"
                )))
            }
        };
        let number_of_change_records = bytes[1] as usize;
        let mut cursor = 2usize;
        let mut change_records = Vec::with_capacity(number_of_change_records);
        for _ in 0..number_of_change_records {
            if bytes.len() < cursor + 2 {
                return Err(PldmError::InvalidLength);
            }
            let operation = match bytes[cursor] {
                0x00 => ChangeOperation::RecordsAdded,
                0x01 => ChangeOperation::RecordsModified,
                0x02 => ChangeOperation::RecordsDeleted,
                0x03 => ChangeOperation::RefreshEntireRepository,
                other => {
                    return Err(PldmError::decode_failed(format!(
                        "unknown change operation 0x{other:02x}"
                    )))
                }
            };
            let number_of_change_entries = bytes[cursor + 1] as usize;
            cursor += 2;
            let entries_len = number_of_change_entries
                .checked_mul(4)
                .ok_or(PldmError::InvalidLength)?;
            if bytes.len() < cursor + entries_len {
                return Err(PldmError::InvalidLength);
            }
            let mut change_entries = Vec::with_capacity(number_of_change_entries);
            for i in 0..number_of_change_entries {
                let start = cursor + i * 4;
                change_entries.push(u32::from_le_bytes(
                    bytes[start..start + 4].try_into().unwrap(),
                ));
            }
            cursor += entries_len;
            change_records.push(ChangeRecord {
                operation,
                change_entries,
            });
        }
        Ok(PdrRepositoryChgEventData {
            event_data_format,
            change_records,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(match self.event_data_format {
            EventDataFormat::FormatIsPdrHandles => 0x00,
            EventDataFormat::FormatIsPdrTypes => 0x01,
        });
        out.push(self.change_records.len() as u8);
        for record in &self.change_records {
            out.push(match record.operation {
                ChangeOperation::RecordsAdded => 0x00,
                ChangeOperation::RecordsModified => 0x01,
                ChangeOperation::RecordsDeleted => 0x02,
                ChangeOperation::RefreshEntireRepository => 0x03,
            });
            out.push(record.change_entries.len() as u8);
            for handle in &record.change_entries {
                out.extend_from_slice(&handle.to_le_bytes());
            }
        }
        out
    }
}
