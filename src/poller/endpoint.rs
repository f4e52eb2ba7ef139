//! Per-EID event poller state machine (spec §4.2): runs the two periodic
//! triggers, issues `pollForPlatformEventMessage` requests, reassembles
//! multi-part replies, and reports completed events for dispatch.
//!
//! This crate owns no thread or reactor (spec §5): the enclosing
//! application calls [`EndpointPoller::on_timer`]/[`EndpointPoller::on_response`]
//! from its own run loop, in response to a fired [`crate::timer::TimerWheel`]
//! token or a transport delivery. `poll_request_timer` is the pacing knob
//! spec §4.2 calls for: a response never triggers the next part
//! synchronously — it stages the next request and lets the timer fire it,
//! the same way `normal_timer`/`critical_timer` gate the *first* request.

use std::time::Instant;

use log::warn;

use crate::config::PlatformConfig;
use crate::correlator::Correlator;
use crate::eid::{Eid, EventId, InstanceId};
use crate::error::{PldmError, PldmResult};
use crate::messages::header::{PldmHeader, PldmType};
use crate::messages::poll_event::{
    PollForPlatformEventMessageRequest, PollForPlatformEventMessageResponse,
    CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE,
};
use crate::messages::transfer::{TransferFlag, TransferOpFlag};
use crate::timer::{TimerToken, TimerWheel};

use super::queue::{CriticalQueue, NormalQueue};
use super::reassembly::ReceiveBuffer;
use super::state::{Flags, OutgoingRequest, PollState, RequestState};

/// Outcome of feeding a response into [`EndpointPoller::on_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEffect {
    /// Mid-transfer: another part (or the closing ack) has been staged.
    Continue,
    /// A reassembled event is ready for the class dispatch table.
    Deliver { event_class: u8, data: Vec<u8> },
    /// `END` arrived but the trailing CRC did not match; the buffer was
    /// dropped, the ack is still staged (spec §4.2 "drop and continue").
    ChecksumMismatch,
    /// The transfer was abandoned (sentinel event id, event id mismatch, or
    /// a decode/reassembly error); `reset()` already ran.
    Terminated,
    /// A response arrived for an (eid, iid) this endpoint is no longer
    /// tracking (already timed out and freed); ignored per spec §5.
    Discarded,
}

pub struct EndpointPoller {
    eid: Eid,
    config: PlatformConfig,
    state: PollState,
    request: RequestState,
    flags: Flags,
    recv: ReceiveBuffer,
    normal_queue: NormalQueue,
    critical_queue: CriticalQueue,
    normal_timer: TimerToken,
    critical_timer: TimerToken,
    poll_request_timer: Option<TimerToken>,
    poll_timeout_timer: Option<TimerToken>,
    /// Staged `(operation_flag, data_transfer_handle, event_id_to_ack)` to
    /// send when `poll_request_timer` fires.
    pending_next: Option<(TransferOpFlag, u32, EventId)>,
}

impl EndpointPoller {
    pub fn new(eid: Eid, config: PlatformConfig, now: Instant, wheel: &mut TimerWheel) -> Self {
        EndpointPoller {
            eid,
            normal_timer: wheel.schedule_periodic(now, config.normal_ras_event_timer),
            critical_timer: wheel.schedule_periodic(now, config.critical_ras_event_timer),
            normal_queue: NormalQueue::new(),
            critical_queue: CriticalQueue::new(config.max_queue_size),
            config,
            state: PollState::Idle,
            request: RequestState::default(),
            flags: Flags::default(),
            recv: ReceiveBuffer::new(),
            poll_request_timer: None,
            poll_timeout_timer: None,
            pending_next: None,
        }
    }

    pub fn eid(&self) -> Eid {
        self.eid
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_process_polling(&self) -> bool {
        self.flags.is_process_polling
    }

    /// `enqueue_critical` (spec §4.2).
    pub fn enqueue_critical(&mut self, event_id: EventId) -> PldmResult<()> {
        self.critical_queue.enqueue(event_id)
    }

    /// `enqueue_normal` (spec §3 "Queues"): the normal queue has no
    /// capacity bound or duplicate check, unlike the critical queue.
    /// Recorded for callers that want to track pending normal-priority
    /// work, but per spec §4.2 the normal timer always probes with the
    /// `0x0000` sentinel and never drains this queue — unlike the
    /// critical timer, there is no "pop the head" transition defined for
    /// it in spec.md.
    pub fn enqueue_normal(&mut self, event_id: EventId) {
        self.normal_queue.push(event_id)
    }

    /// Clears all per-EID state and returns to `Idle` (spec §3 "Lifecycle";
    /// §4.2 "Any state → Terminated"). Cancels any timers this endpoint
    /// still owns.
    pub fn reset(&mut self, wheel: &mut TimerWheel) {
        if let Some(t) = self.poll_timeout_timer.take() {
            wheel.cancel(t);
        }
        if let Some(t) = self.poll_request_timer.take() {
            wheel.cancel(t);
        }
        self.pending_next = None;
        self.request = RequestState::default();
        self.flags = Flags::default();
        self.state = PollState::Idle;
        self.recv.clear();
    }

    /// Drives whichever of this endpoint's timers `token` names. Returns a
    /// request to transmit, if this firing started or continued a poll.
    pub fn on_timer(
        &mut self,
        token: TimerToken,
        now: Instant,
        wheel: &mut TimerWheel,
        correlator: &mut Correlator,
    ) -> PldmResult<Option<OutgoingRequest>> {
        if token == self.normal_timer {
            if !self.flags.is_process_polling && !self.flags.is_critical {
                // spec §4.2: the normal timer always probes with the
                // sentinel event id 0x0000, unconditionally — it does not
                // drain `normal_queue`.
                return self
                    .start_poll(EventId::NONE, false, now, wheel, correlator)
                    .map(Some);
            }
            return Ok(None);
        }

        if token == self.critical_timer {
            // Critical only defers while a transfer is actually in flight
            // (spec §4.2 "Ordering guarantees"); it does not wait for the
            // normal queue.
            if !self.flags.is_process_polling {
                if let Some(head) = self.critical_queue.peek() {
                    self.critical_queue.pop();
                    return self.start_poll(head, true, now, wheel, correlator).map(Some);
                }
            }
            return Ok(None);
        }

        if Some(token) == self.poll_timeout_timer {
            if !self.flags.response_received {
                if let Some(iid) = self.request.instance_id {
                    correlator.mark_free(self.eid, iid);
                }
                self.reset(wheel);
            }
            return Ok(None);
        }

        if Some(token) == self.poll_request_timer {
            self.poll_request_timer = None;
            if let Some((op, handle, event_id)) = self.pending_next.take() {
                let iid = correlator.get_instance_id(self.eid)?;
                self.request = RequestState {
                    operation_flag: op,
                    data_transfer_handle: handle,
                    event_id_to_ack: event_id,
                    instance_id: Some(iid),
                };
                self.flags.is_polling = true;
                self.flags.response_received = false;
                self.poll_timeout_timer = Some(wheel.schedule_once(now, self.config.poll_timeout()));
                let bytes = self.build_request(op, handle, event_id, iid);
                return Ok(Some(OutgoingRequest {
                    instance_id: iid,
                    bytes,
                }));
            }
            return Ok(None);
        }

        Ok(None)
    }

    /// Feeds a decoded `pollForPlatformEventMessage` response for
    /// instance id `iid` into the state machine.
    pub fn on_response(
        &mut self,
        iid: InstanceId,
        response: &PollForPlatformEventMessageResponse,
        now: Instant,
        wheel: &mut TimerWheel,
        correlator: &mut Correlator,
    ) -> PldmResult<PollEffect> {
        if self.request.instance_id != Some(iid) {
            return Ok(PollEffect::Discarded);
        }
        correlator.mark_free(self.eid, iid);
        self.flags.response_received = true;
        if let Some(t) = self.poll_timeout_timer.take() {
            wheel.cancel(t);
        }

        if self.request.operation_flag == TransferOpFlag::AcknowledgementOnly {
            // The closing ack's own response; its content carries no
            // further protocol meaning.
            self.request.instance_id = None;
            self.flags.is_polling = false;
            return Ok(PollEffect::Continue);
        }

        let sentinel_or_mismatch = response.event_id.is_sentinel()
            || (self.request.event_id_to_ack != EventId::NONE
                && response.event_id != self.request.event_id_to_ack);
        if sentinel_or_mismatch {
            self.reset(wheel);
            return Ok(PollEffect::Terminated);
        }

        match response.transfer_flag {
            TransferFlag::Start => {
                self.recv.clear();
                if let Err(e) = self.recv.insert(response.event_class, 0, &response.event_data) {
                    self.reset(wheel);
                    return Err(e);
                }
                self.state = PollState::Reassembling;
                self.stage_next_part(
                    response.next_data_transfer_handle,
                    response.event_id,
                    now,
                    wheel,
                );
                Ok(PollEffect::Continue)
            }
            TransferFlag::Middle => {
                if let Err(e) = self.recv.insert(
                    response.event_class,
                    self.request.data_transfer_handle,
                    &response.event_data,
                ) {
                    self.reset(wheel);
                    return Err(e);
                }
                self.stage_next_part(
                    response.next_data_transfer_handle,
                    response.event_id,
                    now,
                    wheel,
                );
                Ok(PollEffect::Continue)
            }
            TransferFlag::End => {
                if let Err(e) = self.recv.insert(
                    response.event_class,
                    self.request.data_transfer_handle,
                    &response.event_data,
                ) {
                    self.reset(wheel);
                    return Err(e);
                }
                let effect = match response.checksum {
                    Some(crc) if self.recv.checksum_matches(crc) => PollEffect::Deliver {
                        event_class: self.recv.event_class,
                        data: self.recv.data.clone(),
                    },
                    Some(_) => {
                        warn!(
                            "eid {}: CRC mismatch on reassembled event 0x{:04x}, dropping",
                            self.eid, response.event_id.0
                        );
                        PollEffect::ChecksumMismatch
                    }
                    None => PollEffect::Deliver {
                        event_class: self.recv.event_class,
                        data: self.recv.data.clone(),
                    },
                };
                self.finish_transfer(response.event_id, now, wheel);
                Ok(effect)
            }
            TransferFlag::StartAndEnd => {
                self.recv.clear();
                if let Err(e) = self.recv.insert(response.event_class, 0, &response.event_data) {
                    self.reset(wheel);
                    return Err(e);
                }
                let effect = PollEffect::Deliver {
                    event_class: self.recv.event_class,
                    data: self.recv.data.clone(),
                };
                self.finish_transfer(response.event_id, now, wheel);
                Ok(effect)
            }
        }
    }

    fn stage_next_part(
        &mut self,
        next_handle: u32,
        event_id: EventId,
        now: Instant,
        wheel: &mut TimerWheel,
    ) {
        self.pending_next = Some((TransferOpFlag::GetNextPart, next_handle, event_id));
        self.request.instance_id = None;
        self.flags.is_polling = false;
        self.poll_request_timer = Some(wheel.schedule_once(now, self.config.poll_req_event_timer));
    }

    /// Transitions `Polling`/`Reassembling → Idle` and stages the single
    /// closing `AcknowledgementOnly` request (spec §4.2).
    fn finish_transfer(&mut self, acked_event_id: EventId, now: Instant, wheel: &mut TimerWheel) {
        self.flags.is_process_polling = false;
        self.flags.is_critical = false;
        self.flags.is_polling = false;
        self.state = PollState::Idle;
        self.recv.clear();
        self.request.instance_id = None;
        self.pending_next = Some((TransferOpFlag::AcknowledgementOnly, 0, acked_event_id));
        self.poll_request_timer = Some(wheel.schedule_once(now, self.config.poll_req_event_timer));
    }

    fn start_poll(
        &mut self,
        event_id: EventId,
        is_critical: bool,
        now: Instant,
        wheel: &mut TimerWheel,
        correlator: &mut Correlator,
    ) -> PldmResult<OutgoingRequest> {
        let iid = correlator.get_instance_id(self.eid)?;
        self.request = RequestState {
            operation_flag: TransferOpFlag::GetFirstPart,
            data_transfer_handle: 0,
            event_id_to_ack: event_id,
            instance_id: Some(iid),
        };
        self.flags = Flags {
            is_process_polling: true,
            is_polling: true,
            response_received: false,
            is_critical,
        };
        self.state = PollState::Polling;
        self.recv.clear();
        self.poll_timeout_timer = Some(wheel.schedule_once(now, self.config.poll_timeout()));
        let bytes = self.build_request(TransferOpFlag::GetFirstPart, 0, event_id, iid);
        Ok(OutgoingRequest {
            instance_id: iid,
            bytes,
        })
    }

    fn build_request(
        &self,
        op: TransferOpFlag,
        handle: u32,
        event_id: EventId,
        iid: InstanceId,
    ) -> Vec<u8> {
        let header = PldmHeader::request(iid, PldmType::PLATFORM, CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE);
        let body = PollForPlatformEventMessageRequest {
            format_version: 1,
            transfer_operation_flag: op,
            data_transfer_handle: handle,
            event_id_to_ack: event_id,
        };
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&body.encode());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;

    fn fresh() -> (EndpointPoller, TimerWheel, Correlator, Instant) {
        let mut wheel = TimerWheel::new();
        let correlator = Correlator::new();
        let now = Instant::now();
        let poller = EndpointPoller::new(Eid(8), PlatformConfig::default(), now, &mut wheel);
        (poller, wheel, correlator, now)
    }

    fn response(
        event_id: u16,
        flag: TransferFlag,
        next_handle: u32,
        data: &[u8],
        checksum: Option<u32>,
    ) -> PollForPlatformEventMessageResponse {
        PollForPlatformEventMessageResponse {
            tid: crate::eid::Tid(1),
            event_id: EventId(event_id),
            next_data_transfer_handle: next_handle,
            transfer_flag: flag,
            event_class: 5,
            event_data: data.to_vec(),
            checksum,
        }
    }

    #[test]
    fn single_part_event_delivers_and_stages_ack() {
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        let req = poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .expect("normal timer starts a poll");
        assert_eq!(poller.state(), PollState::Polling);

        let resp = response(0x0042, TransferFlag::StartAndEnd, 0, &[0x01, 0x02, 0x03], None);
        let effect = poller
            .on_response(req.instance_id, &resp, now, &mut wheel, &mut correlator)
            .unwrap();
        assert_eq!(
            effect,
            PollEffect::Deliver {
                event_class: 5,
                data: vec![0x01, 0x02, 0x03]
            }
        );
        assert_eq!(poller.state(), PollState::Idle);
        assert!(!poller.is_process_polling());
        assert!(poller.pending_next.is_some());
    }

    #[test]
    fn two_part_event_with_correct_crc_concatenates() {
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        let req1 = poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .unwrap();
        let start = response(0x0099, TransferFlag::Start, 2, &[0xAA, 0xBB], None);
        let effect = poller
            .on_response(req1.instance_id, &start, now, &mut wheel, &mut correlator)
            .unwrap();
        assert_eq!(effect, PollEffect::Continue);
        assert_eq!(poller.state(), PollState::Reassembling);

        let req2 = poller
            .on_timer(
                poller.poll_request_timer.unwrap(),
                now,
                &mut wheel,
                &mut correlator,
            )
            .unwrap()
            .expect("poll_request_timer sends GetNextPart");

        let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(&[0xAA, 0xBB, 0xCC, 0xDD]);
        let end = response(0x0099, TransferFlag::End, 4, &[0xCC, 0xDD], Some(crc));
        let effect = poller
            .on_response(req2.instance_id, &end, now, &mut wheel, &mut correlator)
            .unwrap();
        assert_eq!(
            effect,
            PollEffect::Deliver {
                event_class: 5,
                data: vec![0xAA, 0xBB, 0xCC, 0xDD]
            }
        );
    }

    #[test]
    fn two_part_event_with_bad_crc_is_dropped_but_acked() {
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        let req1 = poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .unwrap();
        let start = response(0x0099, TransferFlag::Start, 2, &[0xAA, 0xBB], None);
        poller
            .on_response(req1.instance_id, &start, now, &mut wheel, &mut correlator)
            .unwrap();

        let req2 = poller
            .on_timer(
                poller.poll_request_timer.unwrap(),
                now,
                &mut wheel,
                &mut correlator,
            )
            .unwrap()
            .unwrap();
        let end = response(0x0099, TransferFlag::End, 4, &[0xCC, 0xDD], Some(0xdead_beef));
        let effect = poller
            .on_response(req2.instance_id, &end, now, &mut wheel, &mut correlator)
            .unwrap();
        assert_eq!(effect, PollEffect::ChecksumMismatch);
        // The transfer still ends cleanly: state is Idle and an ack is staged.
        assert_eq!(poller.state(), PollState::Idle);
        assert!(poller.pending_next.is_some());
    }

    #[test]
    fn critical_timer_defers_while_a_transfer_is_in_flight() {
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        poller.enqueue_critical(EventId(0x1234)).unwrap();

        // Normal timer starts a (probe) transfer.
        poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap();
        assert!(poller.is_process_polling());

        // Critical timer fires mid-transfer: must defer.
        let effect = poller
            .on_timer(poller.critical_timer, now, &mut wheel, &mut correlator)
            .unwrap();
        assert!(effect.is_none());
        // The queued event is still there, untouched.
        assert_eq!(poller.critical_queue.peek(), Some(EventId(0x1234)));
    }

    #[test]
    fn normal_timer_always_probes_with_sentinel_regardless_of_normal_queue() {
        // spec §4.2: "Idle → Polling: normal_timer fires... uses Event ID
        // 0x0000 (a 'probe' value...)" — unconditionally, never draining
        // `normal_queue`.
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        poller.enqueue_normal(EventId(0x0055));
        poller.enqueue_normal(EventId(0x0066));

        let req1 = poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .unwrap();
        assert_eq!(poller.request.event_id_to_ack, EventId::NONE);

        let resp1 = response(0x0000, TransferFlag::StartAndEnd, 0, &[], None);
        poller
            .on_response(req1.instance_id, &resp1, now, &mut wheel, &mut correlator)
            .unwrap();

        // The reassembly finished; drive the staged closing ack so the
        // endpoint is idle and free to start another poll.
        let ack_req = poller
            .on_timer(
                poller.poll_request_timer.unwrap(),
                now,
                &mut wheel,
                &mut correlator,
            )
            .unwrap()
            .unwrap();
        let ack_resp = response(0x0000, TransferFlag::StartAndEnd, 0, &[], None);
        poller
            .on_response(ack_req.instance_id, &ack_resp, now, &mut wheel, &mut correlator)
            .unwrap();
        assert!(!poller.is_process_polling());

        // Next normal tick still probes with the sentinel, even though
        // `normal_queue` still holds both enqueued ids.
        poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .unwrap();
        assert_eq!(poller.request.event_id_to_ack, EventId::NONE);
    }

    #[test]
    fn duplicate_critical_enqueue_is_rejected() {
        let (mut poller, _wheel, _correlator, _now) = fresh();
        poller.enqueue_critical(EventId(0x1234)).unwrap();
        assert!(matches!(
            poller.enqueue_critical(EventId(0x1234)),
            Err(PldmError::Duplicate)
        ));
    }

    #[test]
    fn timeout_before_response_resets_and_frees_instance_id() {
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        let req = poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .unwrap();
        let later = now + crate::config::PlatformConfig::default().poll_timeout();
        let fired = wheel.expired(later);
        assert!(fired.contains(&poller.poll_timeout_timer.unwrap()));
        for token in fired {
            poller.on_timer(token, later, &mut wheel, &mut correlator).unwrap();
        }
        assert_eq!(poller.state(), PollState::Idle);
        assert!(!poller.is_process_polling());
        // The freed instance id is immediately reusable.
        assert!(correlator.get_instance_id(poller.eid()).is_ok());
        let _ = req;
    }

    #[test]
    fn sentinel_event_id_terminates_the_poll() {
        let (mut poller, mut wheel, mut correlator, now) = fresh();
        let req = poller
            .on_timer(poller.normal_timer, now, &mut wheel, &mut correlator)
            .unwrap()
            .unwrap();
        let resp = response(0xFFFF, TransferFlag::StartAndEnd, 0, &[], None);
        let effect = poller
            .on_response(req.instance_id, &resp, now, &mut wheel, &mut correlator)
            .unwrap();
        assert_eq!(effect, PollEffect::Terminated);
        assert_eq!(poller.state(), PollState::Idle);
    }
}
