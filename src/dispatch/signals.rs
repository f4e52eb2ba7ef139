//! Emitted object-bus signals (spec §6 "External interfaces") and the
//! `EventSink` seam an outer D-Bus binding implements to receive them —
//! modelled after the teacher's `StatusEvented` trait plus plain enum
//! payloads in `dds/statusevents.rs`, minus the mio/async plumbing this
//! crate has no use for (spec §5: synchronous dispatch, no owned reactor).

use crate::eid::Tid;
use crate::messages::sensor_event::SensorDataSize;

/// `StateSensorEvent(tid, sensor_id, sensor_offset, event_state,
/// prev_event_state)` (spec §6), carrying the composite-sensor addressing
/// fields the dispatcher resolved from the PDR (spec §4.4: "invoke the
/// state-sensor handler with the `(container_id, entity_type,
/// entity_instance, sensor_offset, event_state)` tuple").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSensorEvent {
    pub tid: Tid,
    pub sensor_id: u16,
    pub container_id: u16,
    pub entity_type: u16,
    pub entity_instance: u16,
    pub sensor_offset: u8,
    pub event_state: u8,
    pub previous_event_state: u8,
}

/// `NumericSensorEvent(tid, sensor_id, event_state, prev_event_state,
/// data_size, present_reading)` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSensorEvent {
    pub tid: Tid,
    pub sensor_id: u16,
    pub event_state: u8,
    pub previous_event_state: u8,
    pub data_size: SensorDataSize,
    pub present_reading: i64,
}

/// `PldmMessagePollEvent(tid, format_version, event_id,
/// data_transfer_handle)` (spec §6): the signal the Event Poller observes
/// to enqueue a poll (spec §4.4 table, `PldmMessagePoll` row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PldmMessagePollEvent {
    pub tid: Tid,
    pub format_version: u8,
    pub event_id: crate::eid::EventId,
    pub data_transfer_handle: u32,
}

/// The seam an outer object-bus binding implements to receive emitted
/// signals (spec §6; out of scope per spec §1, modelled at its boundary
/// only).
pub trait EventSink {
    fn state_sensor_event(&mut self, ev: StateSensorEvent);
    fn numeric_sensor_event(&mut self, ev: NumericSensorEvent);
    fn poll_event(&mut self, ev: PldmMessagePollEvent);
}

/// An [`EventSink`] that records every signal, for tests and for callers
/// that want to inspect emitted signals without a live bus connection.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    pub state_sensor_events: Vec<StateSensorEvent>,
    pub numeric_sensor_events: Vec<NumericSensorEvent>,
    pub poll_events: Vec<PldmMessagePollEvent>,
}

impl EventSink for RecordingEventSink {
    fn state_sensor_event(&mut self, ev: StateSensorEvent) {
        self.state_sensor_events.push(ev);
    }

    fn numeric_sensor_event(&mut self, ev: NumericSensorEvent) {
        self.numeric_sensor_events.push(ev);
    }

    fn poll_event(&mut self, ev: PldmMessagePollEvent) {
        self.poll_events.push(ev);
    }
}
