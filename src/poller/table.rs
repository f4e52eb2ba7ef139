//! Top-level poller owning one [`EndpointPoller`] per discovered EID (spec
//! §3 "Lifecycle": endpoints are created on discovery, held until removal).

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, info};

use crate::config::PlatformConfig;
use crate::correlator::Correlator;
use crate::eid::{Eid, EventId, InstanceId};
use crate::error::PldmResult;
use crate::messages::poll_event::PollForPlatformEventMessageResponse;
use crate::timer::{TimerToken, TimerWheel};
use crate::transport::{MctpEndpointEvent, Transport};

use super::endpoint::{EndpointPoller, PollEffect};
use super::state::OutgoingRequest;

/// Owns every `EndpointPoller` the discovery daemon has told us about, plus
/// the shared [`Correlator`] and [`TimerWheel`] they all drive through.
pub struct PollerTable {
    config: PlatformConfig,
    endpoints: HashMap<Eid, EndpointPoller>,
}

impl PollerTable {
    pub fn new(config: PlatformConfig) -> Self {
        PollerTable {
            config,
            endpoints: HashMap::new(),
        }
    }

    /// Consumes an `MCTP.Endpoint` added/removed signal (spec §6), filtered
    /// to PLDM-capable endpoints by [`MctpEndpointEvent::supports_pldm`].
    pub fn on_mctp_event(&mut self, event: MctpEndpointEvent, now: Instant, wheel: &mut TimerWheel) {
        match event {
            MctpEndpointEvent::Added { eid, .. } if event.supports_pldm() => {
                info!("pldm: materializing poller state for {eid}");
                self.endpoints
                    .entry(eid)
                    .or_insert_with(|| EndpointPoller::new(eid, self.config, now, wheel));
            }
            MctpEndpointEvent::Added { eid, .. } => {
                debug!("mctp endpoint {eid} does not advertise PLDM, ignoring");
            }
            MctpEndpointEvent::Removed { eid } => {
                info!("pldm: destroying poller state for {eid}");
                if let Some(mut endpoint) = self.endpoints.remove(&eid) {
                    endpoint.reset(wheel);
                }
            }
        }
    }

    pub fn enqueue_critical(&mut self, eid: Eid, event_id: EventId) -> PldmResult<()> {
        match self.endpoints.get_mut(&eid) {
            Some(endpoint) => endpoint.enqueue_critical(event_id),
            None => Err(crate::error::PldmError::NotReady),
        }
    }

    pub fn enqueue_normal(&mut self, eid: Eid, event_id: EventId) -> PldmResult<()> {
        match self.endpoints.get_mut(&eid) {
            Some(endpoint) => {
                endpoint.enqueue_normal(event_id);
                Ok(())
            }
            None => Err(crate::error::PldmError::NotReady),
        }
    }

    /// Routes every timer token that fired at `now` to its owning
    /// endpoint, sending any resulting request over `transport`.
    pub fn drive_timers<T: Transport>(
        &mut self,
        now: Instant,
        wheel: &mut TimerWheel,
        correlator: &mut Correlator,
        transport: &mut T,
    ) {
        let fired = wheel.expired(now);
        for token in fired {
            self.dispatch_timer(token, now, wheel, correlator, transport);
        }
    }

    fn dispatch_timer<T: Transport>(
        &mut self,
        token: TimerToken,
        now: Instant,
        wheel: &mut TimerWheel,
        correlator: &mut Correlator,
        transport: &mut T,
    ) {
        for endpoint in self.endpoints.values_mut() {
            match endpoint.on_timer(token, now, wheel, correlator) {
                Ok(Some(req)) => {
                    Self::send_or_release(endpoint, req, correlator, transport);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("pldm poller {}: timer error: {e}", endpoint.eid());
                }
            }
        }
    }

    fn send_or_release<T: Transport>(
        endpoint: &mut EndpointPoller,
        req: OutgoingRequest,
        correlator: &mut Correlator,
        transport: &mut T,
    ) {
        if transport.send(endpoint.eid(), &req.bytes).is_err() {
            correlator.mark_free(endpoint.eid(), req.instance_id);
        }
    }

    /// Feeds a decoded `pollForPlatformEventMessage` response into the
    /// owning endpoint's state machine. Returns `None` if `eid` is not (or
    /// no longer) a known endpoint.
    pub fn on_response(
        &mut self,
        eid: Eid,
        iid: InstanceId,
        response: &PollForPlatformEventMessageResponse,
        now: Instant,
        wheel: &mut TimerWheel,
        correlator: &mut Correlator,
    ) -> Option<PldmResult<PollEffect>> {
        self.endpoints
            .get_mut(&eid)
            .map(|endpoint| endpoint.on_response(iid, response, now, wheel, correlator))
    }

    pub fn endpoint(&self, eid: Eid) -> Option<&EndpointPoller> {
        self.endpoints.get(&eid)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
