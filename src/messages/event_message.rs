//! `PlatformEventMessage` request/response (spec §4.4). The event class
//! byte is kept raw here (not an enum) because an unrecognized class is a
//! *dispatch-time* `InvalidData` error (spec §4.4), not a decode failure —
//! see [`crate::dispatch::EventClass`] for the classified form.

use speedy::{Readable, Writable};

use crate::eid::Tid;
use crate::messages::CompletionCode;

/// `PlatformEventMessage` command code (DSP0248 Platform Monitoring and
/// Control command set).
pub const CMD_PLATFORM_EVENT_MESSAGE: u8 = 0x0A;

#[derive(Debug, Clone, PartialEq, Eq, Readable, Writable)]
pub struct PlatformEventMessageRequest {
    pub format_version: u8,
    pub tid: Tid,
    pub event_class: u8,
    pub event_data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Readable, Writable)]
pub struct PlatformEventMessageResponse {
    pub completion_code: u8,
    /// Per-class status; `0` ("no logging") unless a handler says otherwise.
    pub platform_event_status: u8,
}

impl PlatformEventMessageResponse {
    pub fn success() -> Self {
        PlatformEventMessageResponse {
            completion_code: CompletionCode::Success.as_u8(),
            platform_event_status: 0,
        }
    }

    pub fn failure(code: CompletionCode) -> Self {
        PlatformEventMessageResponse {
            completion_code: code.as_u8(),
            platform_event_status: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{decode, encode};

    #[test]
    fn request_round_trips() {
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(7),
            event_class: 0xFE, // HeartbeatTimerElapsed
            event_data: vec![],
        };
        let bytes = encode(&req).unwrap();
        let decoded: PlatformEventMessageRequest = decode(&bytes).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn response_round_trips() {
        let resp = PlatformEventMessageResponse::success();
        let bytes = encode(&resp).unwrap();
        let decoded: PlatformEventMessageResponse = decode(&bytes).unwrap();
        assert_eq!(decoded, resp);
    }
}
