//! Small newtypes for the identifiers in the data model (spec §3).

use std::fmt;

use speedy::{Readable, Writable};

/// MCTP Endpoint Identifier. Each EID may carry at most one outstanding
/// PLDM request at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Readable, Writable)]
pub struct Eid(pub u8);

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eid:{}", self.0)
    }
}

impl From<u8> for Eid {
    fn from(v: u8) -> Self {
        Eid(v)
    }
}

/// PLDM Terminus Identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Readable, Writable)]
pub struct Tid(pub u8);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

impl From<u8> for Tid {
    fn from(v: u8) -> Self {
        Tid(v)
    }
}

/// A value of the reserved TID, meaning "no terminus assigned yet".
pub const TID_RESERVED: Tid = Tid(0);

/// 16-bit identifier of a single platform event instance.
///
/// `0x0000` and `0xFFFF` are reserved sentinels (spec §3): "no event" and
/// "terminate polling" respectively. They must never be reassembled or
/// dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Readable, Writable)]
pub struct EventId(pub u16);

impl EventId {
    pub const NONE: EventId = EventId(0x0000);
    pub const TERMINATE: EventId = EventId(0xFFFF);

    /// True for either reserved sentinel value.
    pub fn is_sentinel(self) -> bool {
        self == Self::NONE || self == Self::TERMINATE
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl From<u16> for EventId {
    fn from(v: u16) -> Self {
        EventId(v)
    }
}

/// Small integer (0..31) issued by the correlator per EID, embedded in
/// every request header, matched on response, and released on response or
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Readable, Writable)]
pub struct InstanceId(pub u8);

impl InstanceId {
    pub const MAX: u8 = 31;
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iid:{}", self.0)
    }
}

/// PDR record handle. Handle `0` is reserved and never returned by lookup
/// (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Readable, Writable)]
pub struct PdrHandle(pub u32);

impl PdrHandle {
    pub const RESERVED: PdrHandle = PdrHandle(0);

    pub fn is_reserved(self) -> bool {
        self == Self::RESERVED
    }
}

impl fmt::Display for PdrHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_sentinels() {
        assert!(EventId::NONE.is_sentinel());
        assert!(EventId::TERMINATE.is_sentinel());
        assert!(!EventId(0x1234).is_sentinel());
    }

    #[test]
    fn pdr_handle_reserved() {
        assert!(PdrHandle::RESERVED.is_reserved());
        assert!(!PdrHandle(1).is_reserved());
    }
}
