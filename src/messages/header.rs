//! The 3-byte PLDM message header (DMTF DSP0240), plus the completion-code
//! byte that follows it in every response.
//!
//! The header packs `request`/`datagram`/reserved flags and a 5-bit
//! instance id into byte 0, a 2-bit header version and 6-bit PLDM type
//! into byte 1, and the command code into byte 2. `speedy`'s derive works
//! on whole-byte fields; these are sub-byte, so encode/decode are written
//! by hand here, the way the teacher hand-writes bit-packing for its RTPS
//! submessage flags rather than deriving them.

use crate::eid::InstanceId;
use crate::error::PldmError;

const HEADER_VERSION: u8 = 0;

/// The PLDM message type byte (spec §1: PLDM is the transported protocol;
/// the type selects which PLDM "profile" a message belongs to).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PldmType(pub u8);

impl PldmType {
    /// Platform Monitoring and Control, the only profile this crate speaks.
    pub const PLATFORM: PldmType = PldmType(0x02);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PldmHeader {
    pub request: bool,
    pub datagram: bool,
    pub instance_id: InstanceId,
    pub pldm_type: PldmType,
    pub command: u8,
}

impl PldmHeader {
    pub fn request(instance_id: InstanceId, pldm_type: PldmType, command: u8) -> Self {
        PldmHeader {
            request: true,
            datagram: false,
            instance_id,
            pldm_type,
            command,
        }
    }

    pub fn response(instance_id: InstanceId, pldm_type: PldmType, command: u8) -> Self {
        PldmHeader {
            request: false,
            datagram: false,
            instance_id,
            pldm_type,
            command,
        }
    }

    pub fn encode(&self) -> [u8; 3] {
        let byte0 = ((self.request as u8) << 7)
            | ((self.datagram as u8) << 6)
            | (self.instance_id.0 & 0x1f);
        let byte1 = (HEADER_VERSION << 6) | (self.pldm_type.0 & 0x3f);
        [byte0, byte1, self.command]
    }

    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), PldmError> {
        if bytes.len() < 3 {
            return Err(PldmError::InvalidLength);
        }
        let byte0 = bytes[0];
        let byte1 = bytes[1];
        let command = bytes[2];
        let header = PldmHeader {
            request: byte0 & 0x80 != 0,
            datagram: byte0 & 0x40 != 0,
            instance_id: InstanceId(byte0 & 0x1f),
            pldm_type: PldmType(byte1 & 0x3f),
            command,
        };
        Ok((header, &bytes[3..]))
    }
}
