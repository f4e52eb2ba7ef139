//! Per-EID poller state (spec §3 "Request State", "Flags"; §4.2 state
//! machine).

use crate::eid::{EventId, InstanceId};
use crate::messages::transfer::TransferOpFlag;

/// States of the per-EID poll state machine (spec §4.2). `Terminated` is
/// soft: reaching it always runs [`super::endpoint::EndpointPoller::reset`]
/// in the same step, which leaves the machine in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Reassembling,
    Terminated,
}

/// `{ operation_flag, data_transfer_handle, event_id_to_ack, instance_id }`
/// (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct RequestState {
    pub operation_flag: TransferOpFlag,
    pub data_transfer_handle: u32,
    pub event_id_to_ack: EventId,
    /// Only meaningful while `Flags::is_polling` is true.
    pub instance_id: Option<InstanceId>,
}

impl Default for RequestState {
    fn default() -> Self {
        RequestState {
            operation_flag: TransferOpFlag::GetFirstPart,
            data_transfer_handle: 0,
            event_id_to_ack: EventId::NONE,
            instance_id: None,
        }
    }
}

/// `is_process_polling`, `is_polling`, `response_received`, `is_critical`
/// (spec §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub is_process_polling: bool,
    pub is_polling: bool,
    pub response_received: bool,
    pub is_critical: bool,
}

/// Bytes to hand to the transport, plus the instance id they carry (so the
/// caller can correlate the eventual response or timeout back to this
/// request without re-decoding the header).
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub instance_id: InstanceId,
    pub bytes: Vec<u8>,
}
