//! PDR record model (spec §3, §9 "Polymorphism over PDR types is not
//! inheritance"): a PDR is a tagged record whose `type` selects a parser.
//! `PdrType` is the sum type; `PdrRecord` carries the common header prefix
//! plus the still-packed payload bytes.

use crate::eid::PdrHandle;
use crate::error::PldmError;

/// Closed sum type over the PDR kinds this crate parses (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdrType {
    StateSensor,
    StateEffecter,
    NumericEffecter,
    TerminusLocator,
    EntityAssociation,
    /// Vendor-specific records this crate stores but does not interpret.
    Oem(u8),
}

impl PdrType {
    pub fn wire_code(self) -> u8 {
        match self {
            PdrType::TerminusLocator => 1,
            PdrType::StateSensor => 4,
            PdrType::NumericEffecter => 9,
            PdrType::StateEffecter => 11,
            PdrType::EntityAssociation => 15,
            PdrType::Oem(code) => code,
        }
    }

    pub fn from_wire_code(code: u8) -> Self {
        match code {
            1 => PdrType::TerminusLocator,
            4 => PdrType::StateSensor,
            9 => PdrType::NumericEffecter,
            11 => PdrType::StateEffecter,
            15 => PdrType::EntityAssociation,
            other => PdrType::Oem(other),
        }
    }
}

/// `{ handle, next_handle, type, version, change_num, payload }` (spec
/// §3). `next_handle` forms the singly-linked traversal order used for
/// enumeration; it is maintained by [`crate::pdr::repository::PdrRepository`],
/// not by the record's constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdrRecord {
    pub handle: PdrHandle,
    pub next_handle: PdrHandle,
    pub pdr_type: PdrType,
    pub version: u8,
    pub change_num: u16,
    pub payload: Vec<u8>,
}

/// A read-only view into a stored record, the shape
/// `get_by_handle`/`get_first`/`get_next` return (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub handle: PdrHandle,
    pub next_handle: PdrHandle,
    pub size: usize,
    pub data: &'a [u8],
}

impl PdrRecord {
    pub fn entry(&self) -> Entry<'_> {
        Entry {
            handle: self.handle,
            next_handle: self.next_handle,
            size: self.payload.len(),
            data: &self.payload,
        }
    }

    /// Parses the terminus handle embedded in this record's payload, used
    /// by `remove_by_terminus_handle` (spec §4.3). Every payload kind this
    /// crate defines stamps the owning terminus handle as the first two
    /// (little-endian) payload bytes.
    pub fn embedded_terminus_handle(&self) -> Option<u16> {
        if self.payload.len() < 2 {
            return None;
        }
        Some(u16::from_le_bytes(self.payload[0..2].try_into().unwrap()))
    }
}

/// Common header every typed PDR payload parser expects at the front of
/// its bytes: the owning terminus handle. Concrete payload kinds below
/// embed this as their first two bytes.
pub(crate) fn read_terminus_handle(bytes: &[u8]) -> Result<(u16, &[u8]), PldmError> {
    if bytes.len() < 2 {
        return Err(PldmError::InvalidLength);
    }
    Ok((u16::from_le_bytes(bytes[0..2].try_into().unwrap()), &bytes[2..]))
}
