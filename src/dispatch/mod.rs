//! Platform Event Dispatcher (spec §4.4): decodes `PlatformEventMessage`,
//! classifies by `event_class`, and runs an ordered per-class handler
//! chain. The first non-success handler aborts the chain with that code
//! returned to the caller.
//!
//! The class → handler-chain map is an [`IndexMap`] (spec §9 "Dispatch
//! tables": "a mapping by small-integer or short-string key; order
//! matters"), the same ordered-map crate the retrieval pack's
//! `danclive-queen-io` pulls in for its own ordered maps.

pub mod signals;

use indexmap::IndexMap;
use log::warn;
use std::collections::HashMap;

use crate::eid::{Tid, TID_RESERVED};
use crate::error::{PldmError, PldmResult};
use crate::messages::event_message::{PlatformEventMessageRequest, PlatformEventMessageResponse};
use crate::messages::repository_chg_event::{ChangeOperation, EventDataFormat, PdrRepositoryChgEventData};
use crate::messages::sensor_event::{SensorEventData, SensorEventPayload};
use crate::messages::CompletionCode;
use crate::pdr::record::PdrType;
use crate::pdr::repository::PdrRepository;
use crate::pdr::types::{StateSensorPdr, TerminusLocatorPdr};

pub use signals::{EventSink, NumericSensorEvent, PldmMessagePollEvent, StateSensorEvent};

/// Built-in event classes (spec §4.4 table). `Unknown` classes fail with
/// `InvalidData` at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    SensorEvent,
    PdrRepositoryChg,
    PldmMessagePoll,
    HeartbeatTimerElapsed,
    Unknown(u8),
}

impl EventClass {
    pub fn from_wire(code: u8) -> Self {
        match code {
            0x00 => EventClass::SensorEvent,
            0x02 => EventClass::PdrRepositoryChg,
            0x0A => EventClass::PldmMessagePoll,
            0xFE => EventClass::HeartbeatTimerElapsed,
            other => EventClass::Unknown(other),
        }
    }
}

/// Invokes the BMC's watchdog-reset hook for `HeartbeatTimerElapsed` (spec
/// §1 "OEM-specific script-invocation hooks", out of scope beyond this
/// seam).
pub trait OemHooks {
    fn reset_watchdog(&mut self);
}

/// Schedules a host PDR (re)fetch in response to a `PdrRepositoryChg`
/// event (spec §4.4 table); out of scope beyond this seam.
pub trait PdrFetchScheduler {
    fn schedule_fetch(&mut self, handles: Vec<u32>);
    fn schedule_full_refetch(&mut self);
}

/// The collaborators a per-class handler needs, borrowed for the duration
/// of one `dispatch` call.
pub struct DispatchContext<'a> {
    pub pdr_repo: &'a mut PdrRepository,
    pub state_sensor_index: &'a HashMap<(Tid, u16), StateSensorPdr>,
    pub tid_to_terminus_handle: &'a HashMap<Tid, u16>,
    pub sink: &'a mut dyn EventSink,
    pub scheduler: &'a mut dyn PdrFetchScheduler,
    pub oem: &'a mut dyn OemHooks,
}

/// One link in an event class's handler chain (spec §4.4).
pub trait EventHandler {
    fn handle(&mut self, tid: Tid, event_data: &[u8], ctx: &mut DispatchContext<'_>) -> PldmResult<()>;
}

struct HeartbeatHandler;
impl EventHandler for HeartbeatHandler {
    fn handle(&mut self, _tid: Tid, _event_data: &[u8], ctx: &mut DispatchContext<'_>) -> PldmResult<()> {
        ctx.oem.reset_watchdog();
        Ok(())
    }
}

struct SensorEventHandler;
impl EventHandler for SensorEventHandler {
    fn handle(&mut self, tid: Tid, event_data: &[u8], ctx: &mut DispatchContext<'_>) -> PldmResult<()> {
        let decoded = SensorEventData::decode(event_data)?;
        match decoded.payload {
            SensorEventPayload::StateSensorState(state) => {
                let pdr = ctx
                    .state_sensor_index
                    .get(&(tid, decoded.sensor_id))
                    .or_else(|| ctx.state_sensor_index.get(&(TID_RESERVED, decoded.sensor_id)))
                    .ok_or_else(|| {
                        PldmError::invalid_data(format!(
                            "no state sensor PDR for sensor {}",
                            decoded.sensor_id
                        ))
                    })?;
                let offset = state.sensor_offset as usize;
                if offset >= pdr.composite_count() {
                    return Err(PldmError::invalid_data(format!(
                        "sensor_offset {offset} out of range for sensor {} ({} composite states)",
                        decoded.sensor_id,
                        pdr.composite_count()
                    )));
                }
                if !pdr.possible_states[offset].contains(&state.event_state) {
                    return Err(PldmError::invalid_data(format!(
                        "event_state {} not in possible_states[{offset}] for sensor {}",
                        state.event_state, decoded.sensor_id
                    )));
                }
                ctx.sink.state_sensor_event(StateSensorEvent {
                    tid,
                    sensor_id: decoded.sensor_id,
                    container_id: pdr.container_id,
                    entity_type: pdr.entity_type,
                    entity_instance: pdr.entity_instance,
                    sensor_offset: state.sensor_offset,
                    event_state: state.event_state,
                    previous_event_state: state.previous_event_state,
                });
                Ok(())
            }
            SensorEventPayload::NumericSensorState(numeric) => {
                ctx.sink.numeric_sensor_event(NumericSensorEvent {
                    tid,
                    sensor_id: decoded.sensor_id,
                    event_state: numeric.event_state,
                    previous_event_state: numeric.previous_event_state,
                    data_size: numeric.sensor_data_size,
                    present_reading: numeric.present_reading,
                });
                Ok(())
            }
            SensorEventPayload::Other { sub_class, .. } => {
                warn!("sensor event sub-class 0x{sub_class:02x} not interpreted, ignoring");
                Ok(())
            }
        }
    }
}

struct PollEventHandler;
impl EventHandler for PollEventHandler {
    fn handle(&mut self, tid: Tid, event_data: &[u8], ctx: &mut DispatchContext<'_>) -> PldmResult<()> {
        if event_data.len() < 7 {
            return Err(PldmError::InvalidLength);
        }
        let format_version = event_data[0];
        let event_id = crate::eid::EventId(u16::from_le_bytes(event_data[1..3].try_into().unwrap()));
        let data_transfer_handle = u32::from_le_bytes(event_data[3..7].try_into().unwrap());
        ctx.sink.poll_event(PldmMessagePollEvent {
            tid,
            format_version,
            event_id,
            data_transfer_handle,
        });
        Ok(())
    }
}

struct RepositoryChgHandler;
impl EventHandler for RepositoryChgHandler {
    fn handle(&mut self, tid: Tid, event_data: &[u8], ctx: &mut DispatchContext<'_>) -> PldmResult<()> {
        let decoded = PdrRepositoryChgEventData::decode(event_data)?;
        if decoded.event_data_format == EventDataFormat::FormatIsPdrTypes {
            return Err(PldmError::invalid_data(
                "FormatIsPdrTypes is not a supported PDR repository change event format",
            ));
        }
        let mut fetch_handles = Vec::new();
        let mut refresh = false;
        for record in &decoded.change_records {
            match record.operation {
                ChangeOperation::RecordsAdded
                | ChangeOperation::RecordsModified
                | ChangeOperation::RecordsDeleted => {
                    fetch_handles.extend(record.change_entries.iter().copied());
                }
                ChangeOperation::RefreshEntireRepository => refresh = true,
            }
        }
        if refresh {
            let terminus_handle = ctx
                .tid_to_terminus_handle
                .get(&tid)
                .copied()
                .unwrap_or(tid.0 as u16);
            ctx.pdr_repo.remove_by_terminus_handle(terminus_handle);
            ctx.scheduler.schedule_full_refetch();
        } else if !fetch_handles.is_empty() {
            ctx.scheduler.schedule_fetch(fetch_handles);
        }
        Ok(())
    }
}

/// Holds the ordered per-class handler chains and the PDR-derived lookup
/// tables (`(tid, sensor_id) → StateSensorPdr`, `tid → terminus_handle`)
/// the built-in handlers need. Call [`PlatformEventDispatcher::reindex`]
/// after any repository mutation.
pub struct PlatformEventDispatcher {
    handlers: IndexMap<EventClass, Vec<Box<dyn EventHandler>>>,
    state_sensor_index: HashMap<(Tid, u16), StateSensorPdr>,
    tid_to_terminus_handle: HashMap<Tid, u16>,
}

impl Default for PlatformEventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformEventDispatcher {
    pub fn new() -> Self {
        let mut handlers: IndexMap<EventClass, Vec<Box<dyn EventHandler>>> = IndexMap::new();
        handlers.insert(EventClass::HeartbeatTimerElapsed, vec![Box::new(HeartbeatHandler)]);
        handlers.insert(EventClass::SensorEvent, vec![Box::new(SensorEventHandler)]);
        handlers.insert(EventClass::PldmMessagePoll, vec![Box::new(PollEventHandler)]);
        handlers.insert(EventClass::PdrRepositoryChg, vec![Box::new(RepositoryChgHandler)]);
        PlatformEventDispatcher {
            handlers,
            state_sensor_index: HashMap::new(),
            tid_to_terminus_handle: HashMap::new(),
        }
    }

    /// Appends `handler` to the end of `class`'s chain (spec §4.4: handlers
    /// run in registration order).
    pub fn register_handler(&mut self, class: EventClass, handler: Box<dyn EventHandler>) {
        self.handlers.entry(class).or_default().push(handler);
    }

    /// Rebuilds the lookup tables `SensorEventHandler`/`RepositoryChgHandler`
    /// read from the current contents of `repo`.
    pub fn reindex(&mut self, repo: &PdrRepository) {
        self.tid_to_terminus_handle.clear();
        self.state_sensor_index.clear();

        let mut locators = PdrRepository::new();
        repo.filter_by_type(&mut locators, PdrType::TerminusLocator);
        let mut cursor = locators.get_first();
        while let Some((handle, entry)) = cursor {
            if let Ok(locator) = TerminusLocatorPdr::parse(entry.data) {
                self.tid_to_terminus_handle
                    .insert(Tid(locator.tid), locator.terminus_handle);
            }
            cursor = locators.get_next(handle);
        }

        let mut sensors = PdrRepository::new();
        repo.filter_by_type(&mut sensors, PdrType::StateSensor);
        let mut cursor = sensors.get_first();
        while let Some((handle, entry)) = cursor {
            if let Ok(sensor) = StateSensorPdr::parse(entry.data) {
                if let Some((&tid, _)) = self
                    .tid_to_terminus_handle
                    .iter()
                    .find(|(_, &th)| th == sensor.terminus_handle)
                {
                    self.state_sensor_index.insert((tid, sensor.sensor_id), sensor.clone());
                }
                self.state_sensor_index.insert((TID_RESERVED, sensor.sensor_id), sensor);
            }
            cursor = sensors.get_next(handle);
        }
    }

    /// Decodes and dispatches a `PlatformEventMessage` request, running the
    /// matched class's handler chain to completion or first failure (spec
    /// §4.4, §7 "every error into a completion-code-only response").
    pub fn dispatch(
        &mut self,
        request: &PlatformEventMessageRequest,
        repo: &mut PdrRepository,
        sink: &mut dyn EventSink,
        scheduler: &mut dyn PdrFetchScheduler,
        oem: &mut dyn OemHooks,
    ) -> PlatformEventMessageResponse {
        let class = EventClass::from_wire(request.event_class);
        let Some(chain) = self.handlers.get_mut(&class) else {
            warn!("unknown event class 0x{:02x}, rejecting", request.event_class);
            return PlatformEventMessageResponse::failure(CompletionCode::ErrorInvalidData);
        };
        let mut ctx = DispatchContext {
            pdr_repo: repo,
            state_sensor_index: &self.state_sensor_index,
            tid_to_terminus_handle: &self.tid_to_terminus_handle,
            sink,
            scheduler,
            oem,
        };
        for handler in chain.iter_mut() {
            if let Err(e) = handler.handle(request.tid, &request.event_data, &mut ctx) {
                return PlatformEventMessageResponse::failure(e.completion_code());
            }
        }
        PlatformEventMessageResponse::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eid::PdrHandle;
    use crate::pdr::record::PdrRecord;
    use crate::pdr::types::StateSensorPdr;

    struct NoopScheduler {
        fetched: Vec<u32>,
        full_refetch: bool,
    }
    impl PdrFetchScheduler for NoopScheduler {
        fn schedule_fetch(&mut self, handles: Vec<u32>) {
            self.fetched.extend(handles);
        }
        fn schedule_full_refetch(&mut self) {
            self.full_refetch = true;
        }
    }

    struct NoopOem {
        reset_count: u32,
    }
    impl OemHooks for NoopOem {
        fn reset_watchdog(&mut self) {
            self.reset_count += 1;
        }
    }

    fn sensor_repo() -> PdrRepository {
        let mut repo = PdrRepository::new();
        let locator = TerminusLocatorPdr::for_mctp_eid(7, 7, 8);
        repo.add(PdrRecord {
            handle: PdrHandle(0),
            next_handle: PdrHandle(0),
            pdr_type: PdrType::TerminusLocator,
            version: 1,
            change_num: 0,
            payload: locator.encode(),
        });
        let sensor = StateSensorPdr {
            terminus_handle: 7,
            sensor_id: 42,
            container_id: 4,
            entity_type: 100,
            entity_instance: 1,
            possible_states: vec![vec![0, 1, 2]],
        };
        repo.add(PdrRecord {
            handle: PdrHandle(0),
            next_handle: PdrHandle(0),
            pdr_type: PdrType::StateSensor,
            version: 1,
            change_num: 0,
            payload: sensor.encode(),
        });
        repo
    }

    #[test]
    fn heartbeat_event_resets_watchdog() {
        let mut dispatcher = PlatformEventDispatcher::new();
        let mut repo = PdrRepository::new();
        let mut sink = signals::RecordingEventSink::default();
        let mut scheduler = NoopScheduler {
            fetched: vec![],
            full_refetch: false,
        };
        let mut oem = NoopOem { reset_count: 0 };
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(7),
            event_class: 0xFE,
            event_data: vec![],
        };
        let resp = dispatcher.dispatch(&req, &mut repo, &mut sink, &mut scheduler, &mut oem);
        assert_eq!(resp.completion_code, CompletionCode::Success.as_u8());
        assert_eq!(oem.reset_count, 1);
    }

    #[test]
    fn state_sensor_event_resolves_pdr_and_emits_signal() {
        let mut dispatcher = PlatformEventDispatcher::new();
        let mut repo = sensor_repo();
        dispatcher.reindex(&repo);
        let mut sink = signals::RecordingEventSink::default();
        let mut scheduler = NoopScheduler {
            fetched: vec![],
            full_refetch: false,
        };
        let mut oem = NoopOem { reset_count: 0 };

        let event = SensorEventData {
            sensor_id: 42,
            payload: SensorEventPayload::StateSensorState(crate::messages::sensor_event::StateSensorState {
                sensor_offset: 0,
                event_state: 2,
                previous_event_state: 0,
            }),
        };
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(7),
            event_class: 0x00,
            event_data: event.encode(),
        };
        let resp = dispatcher.dispatch(&req, &mut repo, &mut sink, &mut scheduler, &mut oem);
        assert_eq!(resp.completion_code, CompletionCode::Success.as_u8());
        assert_eq!(sink.state_sensor_events.len(), 1);
        let ev = sink.state_sensor_events[0];
        assert_eq!(ev.container_id, 4);
        assert_eq!(ev.entity_type, 100);
        assert_eq!(ev.event_state, 2);
    }

    #[test]
    fn state_sensor_offset_out_of_range_is_rejected() {
        let mut dispatcher = PlatformEventDispatcher::new();
        let mut repo = sensor_repo();
        dispatcher.reindex(&repo);
        let mut sink = signals::RecordingEventSink::default();
        let mut scheduler = NoopScheduler {
            fetched: vec![],
            full_refetch: false,
        };
        let mut oem = NoopOem { reset_count: 0 };
        let event = SensorEventData {
            sensor_id: 42,
            payload: SensorEventPayload::StateSensorState(crate::messages::sensor_event::StateSensorState {
                sensor_offset: 9,
                event_state: 2,
                previous_event_state: 0,
            }),
        };
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(7),
            event_class: 0x00,
            event_data: event.encode(),
        };
        let resp = dispatcher.dispatch(&req, &mut repo, &mut sink, &mut scheduler, &mut oem);
        assert_eq!(resp.completion_code, CompletionCode::ErrorInvalidData.as_u8());
        assert!(sink.state_sensor_events.is_empty());
    }

    #[test]
    fn refresh_entire_repository_removes_records_and_triggers_full_refetch() {
        let mut dispatcher = PlatformEventDispatcher::new();
        let mut repo = sensor_repo();
        dispatcher.reindex(&repo);
        let mut sink = signals::RecordingEventSink::default();
        let mut scheduler = NoopScheduler {
            fetched: vec![],
            full_refetch: false,
        };
        let mut oem = NoopOem { reset_count: 0 };

        let change = PdrRepositoryChgEventData {
            event_data_format: EventDataFormat::FormatIsPdrHandles,
            change_records: vec![crate::messages::repository_chg_event::ChangeRecord {
                operation: ChangeOperation::RefreshEntireRepository,
                change_entries: vec![],
            }],
        };
        let before = repo.len();
        assert!(before > 0);
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(7),
            event_class: 0x02,
            event_data: change.encode(),
        };
        let resp = dispatcher.dispatch(&req, &mut repo, &mut sink, &mut scheduler, &mut oem);
        assert_eq!(resp.completion_code, CompletionCode::Success.as_u8());
        assert!(repo.empty());
        assert!(scheduler.full_refetch);
    }

    #[test]
    fn pdr_types_format_is_rejected() {
        let mut dispatcher = PlatformEventDispatcher::new();
        let mut repo = PdrRepository::new();
        let mut sink = signals::RecordingEventSink::default();
        let mut scheduler = NoopScheduler {
            fetched: vec![],
            full_refetch: false,
        };
        let mut oem = NoopOem { reset_count: 0 };
        let change = PdrRepositoryChgEventData {
            event_data_format: EventDataFormat::FormatIsPdrTypes,
            change_records: vec![],
        };
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(1),
            event_class: 0x02,
            event_data: change.encode(),
        };
        let resp = dispatcher.dispatch(&req, &mut repo, &mut sink, &mut scheduler, &mut oem);
        assert_eq!(resp.completion_code, CompletionCode::ErrorInvalidData.as_u8());
    }

    #[test]
    fn unknown_event_class_is_rejected() {
        let mut dispatcher = PlatformEventDispatcher::new();
        let mut repo = PdrRepository::new();
        let mut sink = signals::RecordingEventSink::default();
        let mut scheduler = NoopScheduler {
            fetched: vec![],
            full_refetch: false,
        };
        let mut oem = NoopOem { reset_count: 0 };
        let req = PlatformEventMessageRequest {
            format_version: 1,
            tid: Tid(1),
            event_class: 0x77,
            event_data: vec![],
        };
        let resp = dispatcher.dispatch(&req, &mut repo, &mut sink, &mut scheduler, &mut oem);
        assert_eq!(resp.completion_code, CompletionCode::ErrorInvalidData.as_u8());
    }
}
